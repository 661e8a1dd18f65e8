//! `bo-unpack`: decode binary-object bytes (stdin) to JSON (stdout).
//!
//! Usage:
//!   bo-unpack [--pretty] [--verbose]

use binary_object::cli::{init_logging, unpack, CliError, CliFlags};
use std::io::{self, Read, Write};

fn run(pretty: bool) -> Result<(), CliError> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    let json = unpack(&buf, pretty)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

fn main() {
    let flags = CliFlags::parse(std::env::args().skip(1));
    init_logging(flags.verbose);

    if let Err(e) = run(flags.pretty) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
