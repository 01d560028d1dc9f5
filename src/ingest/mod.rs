// src/ingest/mod.rs — разбор текстового лога в пер-CPU последовательности.
//
// Формат входа: первая строка — заголовок (пропускается), далее строки вида
//   <ts>\t<name>\t<id>\t<vcpu>\t<pcpu>
// Каждое поле — \w+ (намеренно только ASCII [0-9A-Za-z_], без
// locale-зависимых классов) с опциональным хвостовым whitespace. Строки, не
// подходящие под шаблон структурно, молча пропускаются (шум). Строки,
// подходящие структурно, но с неизвестным именем события или с нечисловым
// числовым полем — фатальная ошибка (весь конверт прерывается).

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::event::{Event, EventKind};

/// Parsed input, bucketed by virtual CPU (dense ids, 0..=max observed).
#[derive(Debug, Default)]
pub struct TraceLog {
    pub cpus: Vec<Vec<Event>>,
}

impl TraceLog {
    pub fn num_cpus(&self) -> usize {
        self.cpus.len()
    }

    pub fn total_events(&self) -> u64 {
        self.cpus.iter().map(|b| b.len() as u64).sum()
    }
}

/// One structurally matched line, before bucketing.
#[derive(Debug, Clone, Copy)]
struct RawRecord {
    ts: u64,
    kind: EventKind,
    cpu: u32,
    pcpu: u32,
}

/// Split a line into exactly five `\w+` fields separated by tabs.
/// Trailing whitespace after a field is tolerated; anything else
/// (wrong arity, empty field, non-word chars, leading spaces) is a
/// structural non-match.
fn split_fields(line: &str) -> Option<[&str; 5]> {
    let mut parts = line.split('\t');
    let mut out = [""; 5];
    for slot in out.iter_mut() {
        let raw = parts.next()?;
        let field = raw.trim_end();
        if field.is_empty() {
            return None;
        }
        if !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        *slot = field;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Ok(None) — структурный не-матч (пропустить), Err — фатальная ошибка.
fn parse_line(line: &str) -> Result<Option<RawRecord>> {
    let Some([ts, name, id, vcpu, pcpu]) = split_fields(line) else {
        return Ok(None);
    };

    let kind = EventKind::from_name(name).ok_or_else(|| {
        anyhow!(
            "unrecognized event name {:?} (expected {:?} or {:?})",
            name,
            crate::consts::EVENT_NAME_RESUME,
            crate::consts::EVENT_NAME_EXIT
        )
    })?;

    let ts: u64 = ts
        .parse()
        .with_context(|| format!("bad timestamp field {:?}", ts))?;
    let id_col: u32 = id
        .parse()
        .with_context(|| format!("bad event id field {:?}", id))?;
    let cpu: u32 = vcpu
        .parse()
        .with_context(|| format!("bad vcpu field {:?}", vcpu))?;
    let pcpu: u32 = pcpu
        .parse()
        .with_context(|| format!("bad pcpu field {:?}", pcpu))?;

    // Имя — источник истины для id; колонка проверяется только на числовость.
    if id_col != kind.id() {
        debug!(
            "parse_line: id column {} disagrees with {} (id {}), using the name",
            id_col,
            kind.name(),
            kind.id()
        );
    }

    Ok(Some(RawRecord { ts, kind, cpu, pcpu }))
}

/// Parse a whole log from a buffered reader. Single pass: buckets grow on
/// demand (amortized growth), the dense CPU range is 0..=max observed id.
pub fn parse_log<R: BufRead>(reader: R) -> Result<TraceLog> {
    let mut cpus: Vec<Vec<Event>> = Vec::new();
    let mut matched: u64 = 0;
    let mut skipped: u64 = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read input line {}", idx + 1))?;
        // Первая строка — заголовок таблицы, всегда пропускается.
        if idx == 0 {
            continue;
        }

        let rec = match parse_line(&line).with_context(|| format!("input line {}", idx + 1))? {
            Some(rec) => rec,
            None => {
                skipped += 1;
                continue;
            }
        };

        let cpu = rec.cpu as usize;
        if cpu >= cpus.len() {
            cpus.resize_with(cpu + 1, Vec::new);
        }

        // Дельта-кодирование в страницах корректно только для неубывающих ts.
        if let Some(last) = cpus[cpu].last() {
            if rec.ts < last.ts {
                bail!(
                    "input line {}: timestamp {} for cpu {} is lower than previous {} \
                     (per-cpu timestamps must be non-decreasing)",
                    idx + 1,
                    rec.ts,
                    rec.cpu,
                    last.ts
                );
            }
        }

        cpus[cpu].push(Event::new(rec.kind, rec.cpu, rec.pcpu, rec.ts));
        matched += 1;
    }

    debug!(
        "parse_log: {} events across {} cpus ({} noise lines skipped)",
        matched,
        cpus.len(),
        skipped
    );
    Ok(TraceLog { cpus })
}

/// Open and parse an input log file.
pub fn load_log(path: &Path) -> Result<TraceLog> {
    let f = File::open(path).with_context(|| format!("open input {}", path.display()))?;
    parse_log(BufReader::new(f))
}
