// Базовые модули
pub mod consts;
pub mod event;

// Модульная раскладка (папки с mod.rs)
pub mod ingest; // src/ingest/mod.rs — разбор текстового лога
pub mod dat;    // src/dat/{mod,header,layout}.rs — запись контейнера

// Утилиты (read_at/write_at)
pub mod util;

// Удобные реэкспорты
pub use dat::{write_dat, CpuLayout, DatSummary};
pub use event::{Event, EventKind};
pub use ingest::{load_log, parse_log, TraceLog};
