use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use bulkcopy::bcp::{ExportOptions, FileEncoding, FormatDescriptor, InsertOptions};
use bulkcopy::{BcpOptions, BulkCopy};

const USAGE: &str = "usage:
  bulkcopy <options.json> export <table> [--keep]
  bulkcopy <options.json> insert <table> <data-file> <format-file> [--keep]";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let keep_files = args.iter().any(|arg| arg == "--keep");
    let args: Vec<&str> = args.iter().map(String::as_str).filter(|arg| *arg != "--keep").collect();

    let [options_path, command, rest @ ..] = args.as_slice() else {
        bail!("{USAGE}");
    };

    let options = BcpOptions::from_json_file(Path::new(options_path))
        .with_context(|| format!("Failed to load options from {options_path}"))?;
    let unicode = options.unicode;
    let bulk = BulkCopy::new(options).context("Failed to start bulk copy runtime")?;

    match (*command, rest) {
        ("export", [table]) => {
            let (rows, details) = bulk
                .export(table, ExportOptions { keep_files, ..Default::default() })
                .with_context(|| format!("Export of {table} failed"))?;

            let mut stdout = std::io::stdout().lock();
            for row in &rows {
                serde_json::to_writer(&mut stdout, row)?;
                writeln!(stdout)?;
            }
            match details.row_count {
                Some(count) => eprintln!("{count} rows copied from {table}"),
                None => log::warn!("bcp did not report a row count"),
            }
        }
        ("insert", [table, data_file, format_file]) => {
            let encoding = FileEncoding::from_unicode_flag(unicode);
            let format = bulk
                .runtime_handle()
                .block_on(FormatDescriptor::load_from_file(Path::new(format_file), encoding))
                .with_context(|| format!("Failed to read format file {format_file}"))?;

            bulk.insert(Path::new(data_file), &format, table, InsertOptions { keep_files })
                .with_context(|| format!("Insert into {table} failed"))?;
            eprintln!("Loaded {data_file} into {table}");
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}
