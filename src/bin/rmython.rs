//! Mython interpreter command-line.
//!
//! When called with arguments, it interprets the corresponding files in a
//! single interpreter session (so code and data sharing is possible).
//!
//! When called without arguments it interprets a complete program read from
//! standard input; Mython's block structure lives in the indentation, so
//! there is no line-by-line prompt.

use std::env;
use std::fs::File;
use std::io;
use std::io::BufReader;

use anyhow::{self, Context};

use rmython::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if !args.is_empty() {
        run_all_files(args)?;
    } else {
        run_stdin()?;
    }
    Ok(())
}

fn run_all_files(paths: Vec<String>) -> Result<(), anyhow::Error> {
    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);

    for p in &paths {
        let reader =
            BufReader::new(File::open(p).with_context(|| format!("failed to open {}", p))?);
        interp.eval(reader)?;
    }

    Ok(())
}

fn run_stdin() -> Result<(), anyhow::Error> {
    let stdin = io::stdin();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);
    interp.eval(stdin.lock())?;

    Ok(())
}
