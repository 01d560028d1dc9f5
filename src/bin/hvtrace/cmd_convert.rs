use anyhow::Result;
use std::path::PathBuf;

use hvtrace::consts::DAT_FILE;
use hvtrace::dat::write_dat;
use hvtrace::ingest::load_log;

pub fn exec(input: PathBuf, json: bool) -> Result<()> {
    let log = load_log(&input)?;
    // Имя выхода фиксировано, пишем в текущий каталог.
    let out = PathBuf::from(DAT_FILE);
    let summary = write_dat(&out, &log)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "wrote {} ({} cpus, {} events, {} pages, {} bytes)",
            out.display(),
            summary.cpus,
            summary.events,
            summary.pages,
            summary.bytes
        );
    }
    Ok(())
}
