// src/dat/layout.rs — пагинация пер-CPU последовательности в страницы 4096.
//
// Страница: [base_ts u64][commit u64][records...]. commit — число валидных
// байт записей (без 16-байтового заголовка страницы). Начало каждой страницы
// выравнивается вверх до границы 4096; пропущенный зазор остаётся дыркой в
// файле (не зануляется явно).

use anyhow::{anyhow, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use std::fs::File;
use std::io::{Seek, SeekFrom};

use crate::consts::{MAX_TIME_DELTA, PAGE_CAPACITY, PAGE_SIZE, REC_LEN_BITS, REC_SIZE};
use crate::event::Event;

/// Layout result for one CPU: what goes into its offset-table row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuLayout {
    /// File offset of the CPU's first page (0 when the CPU has no events).
    pub offset: u64,
    /// Byte length of the CPU's last page, page header included.
    pub len: u64,
    pub pages: u64,
}

#[inline]
pub fn align_up(pos: u64, align: u64) -> u64 {
    (pos + align - 1) & !(align - 1)
}

/// Pack a record header: [time_delta 27 bits][payload_len 5 bits].
pub fn pack_rec_header(delta: u64) -> Result<u32> {
    if delta > MAX_TIME_DELTA {
        return Err(anyhow!(
            "timestamp delta {} does not fit in 27 bits (max {})",
            delta,
            MAX_TIME_DELTA
        ));
    }
    Ok(((delta as u32) << REC_LEN_BITS) | crate::consts::EVENT_PAYLOAD_SIZE as u32)
}

/// Lay out one CPU's events into aligned pages starting at the current
/// write cursor. Returns the offset-table row for that CPU.
pub fn write_cpu_pages(f: &mut File, cpu: u32, events: &[Event]) -> Result<CpuLayout> {
    if events.is_empty() {
        // Пустой CPU: осмысленная строка (0,0) вместо мусора.
        return Ok(CpuLayout::default());
    }

    let mut out = CpuLayout::default();
    let mut first = true;
    let mut consumed = 0usize;

    while consumed < events.len() {
        // Батч всегда зажат реальным остатком, не ёмкостью страницы.
        let take = PAGE_CAPACITY.min(events.len() - consumed);
        let batch = &events[consumed..consumed + take];
        let base_ts = batch[0].ts;

        let pos = f.stream_position()?;
        let page_start = align_up(pos, PAGE_SIZE);
        if page_start != pos {
            f.seek(SeekFrom::Start(page_start))?;
        }
        if first {
            out.offset = page_start;
            first = false;
        }

        f.write_u64::<LittleEndian>(base_ts)?;
        f.write_u64::<LittleEndian>((batch.len() * REC_SIZE) as u64)?;
        for ev in batch {
            let delta = ev.ts.checked_sub(base_ts).ok_or_else(|| {
                anyhow!(
                    "cpu {}: timestamp {} below page base {} (non-monotonic input)",
                    cpu,
                    ev.ts,
                    base_ts
                )
            })?;
            f.write_u32::<LittleEndian>(pack_rec_header(delta)?)?;
            ev.write_payload(f)?;
        }

        out.len = f.stream_position()? - page_start;
        out.pages += 1;
        consumed += take;
    }

    debug!(
        "write_cpu_pages: cpu={} events={} pages={} first_off={} last_len={}",
        cpu,
        events.len(),
        out.pages,
        out.offset,
        out.len
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{EVENT_PAYLOAD_SIZE, PAGE_HDR_SIZE};

    #[test]
    fn capacity_math() {
        assert_eq!(REC_SIZE, 32);
        assert_eq!(PAGE_CAPACITY, 127);
        // 127 записей + заголовок умещаются в страницу
        assert!(PAGE_HDR_SIZE + PAGE_CAPACITY * REC_SIZE <= PAGE_SIZE as usize);
        // 128-я запись уже не влезла бы
        assert!(PAGE_HDR_SIZE + (PAGE_CAPACITY + 1) * REC_SIZE > PAGE_SIZE as usize);
    }

    #[test]
    fn align_up_boundaries() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4095, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(4097, 4096), 8192);
    }

    #[test]
    fn rec_header_packing() {
        assert_eq!(pack_rec_header(0).unwrap(), EVENT_PAYLOAD_SIZE as u32);
        assert_eq!(
            pack_rec_header(150).unwrap(),
            (150 << 5) | EVENT_PAYLOAD_SIZE as u32
        );
        assert_eq!(pack_rec_header(150).unwrap() >> 5, 150);
        assert_eq!(pack_rec_header(150).unwrap() & 0x1f, 28);
        // Граница 27 бит
        assert!(pack_rec_header(MAX_TIME_DELTA).is_ok());
        assert!(pack_rec_header(MAX_TIME_DELTA + 1).is_err());
    }
}
