//! Общие константы формата trace.dat (preamble, pages, records).

// -------- Container preamble (v6) --------
pub const DAT_FILE: &str = "trace.dat";
pub const DAT_MAGIC: &[u8; 3] = b"\x17\x08\x44";
pub const DAT_TAG: &[u8; 7] = b"tracing";
pub const DAT_VERSION: &[u8; 2] = b"6\0";

// 1 байт endianness + 1 байт word size, сразу после версии.
pub const DAT_ENDIAN_LITTLE: u8 = 0;
pub const DAT_WORD_SIZE: u8 = 8;

// Имена текстовых блоков preamble пишутся с NUL и фиксированной длиной.
pub const HEADER_PAGE_NAME: &[u8; 12] = b"header_page\0";
pub const HEADER_EVENT_NAME: &[u8; 13] = b"header_event\0";
pub const OPTIONS_MARKER: &[u8; 10] = b"options  \0";

// -------- Pages --------
// Страница: [base_ts u64][commit u64][records...], выравнивание по 4096.
pub const PAGE_SIZE: u64 = 4096;
pub const PAGE_HDR_SIZE: usize = 16;

// Запись: [packed u32 = (delta << 5) | payload_len][payload 28 B].
// Payload (LE, без паддинга):
// [common_type u16][common_flags u8][common_preempt_count u8][common_pid i32]
// [cpu u32][pcpu u32][id u32][ts u64]
pub const REC_HDR_SIZE: usize = 4;
pub const EVENT_PAYLOAD_SIZE: usize = 28;
pub const REC_SIZE: usize = REC_HDR_SIZE + EVENT_PAYLOAD_SIZE;

/// Records per page: (4096 - 16) / 32 = 127.
pub const PAGE_CAPACITY: usize = (PAGE_SIZE as usize - PAGE_HDR_SIZE) / REC_SIZE;

// В packed-заголовке на длину отведено 5 бит, на дельту — 27.
pub const REC_LEN_BITS: u32 = 5;
pub const MAX_TIME_DELTA: u64 = (1 << 27) - 1;

// -------- Offset table --------
// Одна строка на CPU: [first_page_offset u64][last_page_len u64].
pub const CPU_SLOT_SIZE: usize = 16;

// -------- Events --------
pub const EVENT_NAME_RESUME: &str = "HV_Resume";
pub const EVENT_NAME_EXIT: &str = "HV_Exit";
pub const EVENT_ID_RESUME: u32 = 3;
pub const EVENT_ID_EXIT: u32 = 4;
