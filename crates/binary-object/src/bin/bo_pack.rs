//! `bo-pack`: encode JSON (stdin) to binary-object bytes (stdout).
//!
//! Usage:
//!   bo-pack [--verbose]

use binary_object::cli::{init_logging, pack, CliError, CliFlags};
use std::io::{self, Read, Write};

fn run() -> Result<(), CliError> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    let bytes = pack(buf.trim())?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.flush()?;
    Ok(())
}

fn main() {
    let flags = CliFlags::parse(std::env::args().skip(1));
    init_logging(flags.verbose);

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
