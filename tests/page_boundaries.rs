use anyhow::Result;
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

use hvtrace::consts::{PAGE_CAPACITY, PAGE_HDR_SIZE, PAGE_SIZE, REC_SIZE};
use hvtrace::dat::write_dat;
use hvtrace::ingest::parse_log;

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("hvtrace-{}-{}-{}", prefix, pid, t))
}

fn input_for_one_cpu(count: usize) -> String {
    let mut s = String::from("ts\tname\tid\tvcpu\tpcpu\n");
    for i in 0..count {
        s.push_str(&format!("{}\tHV_Exit\t4\t0\t2\n", 5000 + i as u64));
    }
    s
}

/// Пропустить preamble (длины блоков читаются из самого файла) и вернуть
/// пару (offset, len) для CPU 0 из offset-таблицы.
fn cpu0_slot(f: &mut File) -> Result<(u64, u64)> {
    // magic + "tracing" + "6\0" + endian + word size + page size
    f.seek(SeekFrom::Start((3 + 7 + 2 + 1 + 1 + 4) as u64))?;

    // header_page / header_event: имя фиксированной длины + len + blob
    for name_len in [12i64, 13] {
        f.seek(SeekFrom::Current(name_len))?;
        let len = f.read_u64::<LittleEndian>()?;
        f.seek(SeekFrom::Current(len as i64))?;
    }

    // ftrace formats (0), затем счётчик event formats и сами блоки
    assert_eq!(f.read_u32::<LittleEndian>()?, 0);
    let formats = f.read_u32::<LittleEndian>()?;
    for _ in 0..formats {
        let len = f.read_u64::<LittleEndian>()?;
        f.seek(SeekFrom::Current(len as i64))?;
    }

    // kallsyms + printk + process
    f.seek(SeekFrom::Current(4 + 4 + 8))?;

    let num_cpus = f.read_u32::<LittleEndian>()?;
    assert!(num_cpus >= 1);
    let mut opts = [0u8; 10];
    f.read_exact(&mut opts)?;
    assert_eq!(&opts, b"options  \0");
    f.seek(SeekFrom::Current(2))?;

    let off = f.read_u64::<LittleEndian>()?;
    let len = f.read_u64::<LittleEndian>()?;
    Ok((off, len))
}

#[test]
fn exact_multiple_of_capacity_fills_pages() -> Result<()> {
    let root = unique_root("full-pages");
    fs::create_dir_all(&root)?;

    let count = 2 * PAGE_CAPACITY;
    let log = parse_log(Cursor::new(input_for_one_cpu(count)))?;
    let out = root.join("trace.dat");
    let summary = write_dat(&out, &log)?;
    assert_eq!(summary.pages, 2);

    let mut f = File::open(&out)?;
    let (off, last_len) = cpu0_slot(&mut f)?;
    // обе страницы полные
    assert_eq!(last_len, (PAGE_HDR_SIZE + PAGE_CAPACITY * REC_SIZE) as u64);

    for page in 0..2u64 {
        f.seek(SeekFrom::Start(off + page * PAGE_SIZE))?;
        let base_ts = f.read_u64::<LittleEndian>()?;
        let commit = f.read_u64::<LittleEndian>()?;
        assert_eq!(commit, (PAGE_CAPACITY * REC_SIZE) as u64);
        // base_ts каждой страницы = ts её первого события
        assert_eq!(base_ts, 5000 + page * PAGE_CAPACITY as u64);
    }
    Ok(())
}

#[test]
fn partial_last_page_is_clamped() -> Result<()> {
    let root = unique_root("clamp");
    fs::create_dir_all(&root)?;

    // 2 * capacity + 1: ровно 3 страницы, последняя — с одной записью.
    let count = 2 * PAGE_CAPACITY + 1;
    let log = parse_log(Cursor::new(input_for_one_cpu(count)))?;
    let out = root.join("trace.dat");
    let summary = write_dat(&out, &log)?;
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.events, count as u64);

    let mut f = File::open(&out)?;
    let (off, last_len) = cpu0_slot(&mut f)?;

    // Таблица хранит offset ПЕРВОЙ страницы и длину ПОСЛЕДНЕЙ.
    assert_eq!(off % PAGE_SIZE, 0);
    assert_eq!(last_len, (PAGE_HDR_SIZE + REC_SIZE) as u64);

    // страницы лежат подряд с шагом 4096
    let commits: Vec<u64> = (0..3u64)
        .map(|p| {
            f.seek(SeekFrom::Start(off + p * PAGE_SIZE + 8)).unwrap();
            f.read_u64::<LittleEndian>().unwrap()
        })
        .collect();
    assert_eq!(commits[0], (PAGE_CAPACITY * REC_SIZE) as u64);
    assert_eq!(commits[1], (PAGE_CAPACITY * REC_SIZE) as u64);
    assert_eq!(commits[2], REC_SIZE as u64, "last page commit must be clamped");

    // base_ts последней страницы = ts последнего события
    f.seek(SeekFrom::Start(off + 2 * PAGE_SIZE))?;
    let base_ts = f.read_u64::<LittleEndian>()?;
    assert_eq!(base_ts, 5000 + (count as u64 - 1));

    // за committed-границей последней страницы данных нет
    let file_len = f.metadata()?.len();
    assert_eq!(
        file_len,
        off + 2 * PAGE_SIZE + (PAGE_HDR_SIZE + REC_SIZE) as u64
    );
    Ok(())
}

#[test]
fn first_page_is_aligned_even_below_4096() -> Result<()> {
    let root = unique_root("align");
    fs::create_dir_all(&root)?;

    // preamble с одним CPU занимает меньше 4096 — страница всё равно на 4096.
    let log = parse_log(Cursor::new(input_for_one_cpu(1)))?;
    let out = root.join("trace.dat");
    write_dat(&out, &log)?;

    let mut f = File::open(&out)?;
    let (off, _) = cpu0_slot(&mut f)?;
    assert_eq!(off, PAGE_SIZE, "first page must land on the first 4096 boundary");
    Ok(())
}
