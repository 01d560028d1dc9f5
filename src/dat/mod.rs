// src/dat/mod.rs — сборка контейнера trace.dat.
//
// Порядок: preamble + зарезервированная offset-таблица → страницы каждого
// CPU по порядку id → back-patch таблицы (seek назад, пары offset/len).
//
// Политика записи — как у meta: tmp + rename + fsync, чтобы при любой
// ошибке на диске не оставался файл, похожий на готовый контейнер.

pub mod header;
pub mod layout;

use anyhow::{Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::info;
use serde::Serialize;
use std::fs::{self, OpenOptions};
#[cfg(unix)]
use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};

use crate::consts::CPU_SLOT_SIZE;
use crate::ingest::TraceLog;
use crate::util::write_at;

pub use layout::CpuLayout;

/// What a finished conversion produced.
#[derive(Debug, Clone, Serialize)]
pub struct DatSummary {
    pub cpus: u32,
    pub events: u64,
    pub pages: u64,
    pub bytes: u64,
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the whole container to `path` (atomically, via tmp + rename).
pub fn write_dat(path: &Path, log: &TraceLog) -> Result<DatSummary> {
    let tmp = tmp_path(path);
    let _ = fs::remove_file(&tmp); // best-effort

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .with_context(|| format!("open output tmp {}", tmp.display()))?;

    let num_cpus = log.num_cpus() as u32;
    let table_pos = header::write_preamble(&mut f, num_cpus)?;

    let mut slots = Vec::with_capacity(log.num_cpus());
    for (cpu, events) in log.cpus.iter().enumerate() {
        slots.push(layout::write_cpu_pages(&mut f, cpu as u32, events)?);
    }
    let bytes = f.stream_position()?;

    // Back-patch: заполняем зарезервированные пары (offset, len).
    let mut table = vec![0u8; CPU_SLOT_SIZE * slots.len()];
    for (i, s) in slots.iter().enumerate() {
        LittleEndian::write_u64(&mut table[i * CPU_SLOT_SIZE..], s.offset);
        LittleEndian::write_u64(&mut table[i * CPU_SLOT_SIZE + 8..], s.len);
    }
    write_at(&mut f, table_pos, &table)?;

    f.sync_all()?;
    drop(f);
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    let _ = fsync_dir(path);

    let summary = DatSummary {
        cpus: num_cpus,
        events: log.total_events(),
        pages: slots.iter().map(|s| s.pages).sum(),
        bytes,
    };
    info!(
        "write_dat: {} — {} cpus, {} events, {} pages, {} bytes",
        path.display(),
        summary.cpus,
        summary.events,
        summary.pages,
        summary.bytes
    );
    Ok(summary)
}
