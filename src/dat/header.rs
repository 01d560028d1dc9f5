// src/dat/header.rs — фиксированный preamble контейнера trace.dat (v6).
//
// Раскладка (всё LE):
// [magic 17 08 44]["tracing"]["6\0"]
// [endian u8=0][word_size u8=8][page_size u32=4096]
// ["header_page\0" 12B][len u64][blob]
// ["header_event\0" 13B][len u64][blob]
// [ftrace formats u32=0]
// [event formats u32=2] ([len u64][blob]) x2
// [kallsyms u32=0][printk u32=0][process u64=0]
// [num_cpus u32]["options  \0" 10B][option count u16=0]
// [offset table: num_cpus x (offset u64, len u64)] — резервируется нулями,
// позиция возвращается для back-patch.

use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{Seek, Write};

use crate::consts::{
    CPU_SLOT_SIZE, DAT_ENDIAN_LITTLE, DAT_MAGIC, DAT_TAG, DAT_VERSION, DAT_WORD_SIZE,
    HEADER_EVENT_NAME, HEADER_PAGE_NAME, OPTIONS_MARKER, PAGE_SIZE,
};

/// Describes the 16-byte page header plus the data area, for consumers.
static HEADER_PAGE_DESC: &str = "\tfield: u64 timestamp;\toffset:0;\tsize:8;\tsigned:0;\n\
\tfield: local_t commit;\toffset:8;\tsize:8;\tsigned:1;\n\
\tfield: int overwrite;\toffset:8;\tsize:1;\tsigned:1;\n\
\tfield: char data;\toffset:16;\tsize:4080;\tsigned:1;\n";

/// Describes the packed record header bit layout.
static HEADER_EVENT_DESC: &str = "\t# compressed entry header\n\
\ttype_len    :    5 bits\n\
\ttime_delta  :   27 bits\n\
\tarray       :   32 bits\n\
\n\
\tpadding     : type == 29\n\
\ttime_extend : type == 30\n\
\ttime_stamp : type == 31\n\
\tdata max type_len  == 28\n";

// Дескрипторы двух фиксированных схем. Offsets соответствуют реальному
// 28-байтовому payload (cpu@8, pcpu@12, id@16, ts@20).
static EVENT_FORMAT_RESUME: &str = "name: HV_Resume\n\
ID: 3\n\
format:\n\
\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\
\tfield:unsigned char common_flags;\toffset:2;\tsize:1;\tsigned:0;\n\
\tfield:unsigned char common_preempt_count;\toffset:3;\tsize:1;\tsigned:0;\n\
\tfield:int common_pid;\toffset:4;\tsize:4;\tsigned:1;\n\
\n\
\tfield:unsigned int cpu;\toffset:8;\tsize:4;\tsigned:0;\n\
\tfield:unsigned int pcpu;\toffset:12;\tsize:4;\tsigned:0;\n\
\tfield:unsigned int id;\toffset:16;\tsize:4;\tsigned:0;\n\
\tfield:unsigned long long ts;\toffset:20;\tsize:8;\tsigned:0;\n\
print fmt: \"%u:%u\", REC->ts, REC->pcpu\n";

static EVENT_FORMAT_EXIT: &str = "name: HV_Exit\n\
ID: 4\n\
format:\n\
\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\
\tfield:unsigned char common_flags;\toffset:2;\tsize:1;\tsigned:0;\n\
\tfield:unsigned char common_preempt_count;\toffset:3;\tsize:1;\tsigned:0;\n\
\tfield:int common_pid;\toffset:4;\tsize:4;\tsigned:1;\n\
\n\
\tfield:unsigned int cpu;\toffset:8;\tsize:4;\tsigned:0;\n\
\tfield:unsigned int pcpu;\toffset:12;\tsize:4;\tsigned:0;\n\
\tfield:unsigned int id;\toffset:16;\tsize:4;\tsigned:0;\n\
\tfield:unsigned long long ts;\toffset:20;\tsize:8;\tsigned:0;\n\
print fmt: \"%u:%u\", REC->ts, REC->pcpu\n";

/// Блок вида [len u64][raw bytes] (длина без завершающего NUL).
fn write_sized_blob(f: &mut File, blob: &str) -> Result<()> {
    f.write_u64::<LittleEndian>(blob.len() as u64)?;
    f.write_all(blob.as_bytes())?;
    Ok(())
}

/// Write the fixed preamble and reserve the zeroed offset-table region.
/// Returns the file position of the reserved region for back-patching.
pub fn write_preamble(f: &mut File, num_cpus: u32) -> Result<u64> {
    f.write_all(DAT_MAGIC)?;
    f.write_all(DAT_TAG)?;
    f.write_all(DAT_VERSION)?;
    f.write_u8(DAT_ENDIAN_LITTLE)?;
    f.write_u8(DAT_WORD_SIZE)?;
    f.write_u32::<LittleEndian>(PAGE_SIZE as u32)?;

    f.write_all(HEADER_PAGE_NAME)?;
    write_sized_blob(f, HEADER_PAGE_DESC)?;
    f.write_all(HEADER_EVENT_NAME)?;
    write_sized_blob(f, HEADER_EVENT_DESC)?;

    // ftrace event formats: нет
    f.write_u32::<LittleEndian>(0)?;

    // event formats: две фиксированные схемы
    f.write_u32::<LittleEndian>(2)?;
    write_sized_blob(f, EVENT_FORMAT_RESUME)?;
    write_sized_blob(f, EVENT_FORMAT_EXIT)?;

    // kallsyms / trace_printk / process info: пустые секции
    f.write_u32::<LittleEndian>(0)?;
    f.write_u32::<LittleEndian>(0)?;
    f.write_u64::<LittleEndian>(0)?;

    f.write_u32::<LittleEndian>(num_cpus)?;
    f.write_all(OPTIONS_MARKER)?;
    f.write_u16::<LittleEndian>(0)?;

    let table_pos = f.stream_position()?;
    let zeros = vec![0u8; CPU_SLOT_SIZE * num_cpus as usize];
    f.write_all(&zeros)?;
    Ok(table_pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_sizes_fit_one_page() {
        // data-область страницы в header_page описана как 4080 байт —
        // ровно PAGE_SIZE - PAGE_HDR_SIZE.
        assert!(HEADER_PAGE_DESC.contains("size:4080"));
        assert_eq!(
            crate::consts::PAGE_SIZE as usize - crate::consts::PAGE_HDR_SIZE,
            4080
        );
    }

    #[test]
    fn descriptor_offsets_match_payload() {
        // ts@20 size:8 — конец payload = 28 байт.
        for fmt in [EVENT_FORMAT_RESUME, EVENT_FORMAT_EXIT] {
            assert!(fmt.contains("offset:20;\tsize:8"));
        }
        assert_eq!(crate::consts::EVENT_PAYLOAD_SIZE, 28);
    }
}
