//! Evaluate fenced shell blocks in notebook files and record their output.
//!
//! Notebooks are processed in the order given; each file is parsed, its
//! selected code blocks are run front to back, and the file is rewritten in
//! place (previous contents kept as `<file>.orig`) when anything changed. A
//! failing file is reported and the remaining files still get their turn.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use runbook::core::strategy::Strategy;
use runbook::io::interrupt::{self, Interrupted};
use runbook::run::{self, Mode, Options};
use runbook::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "runbook",
    version,
    about = "Evaluate fenced shell blocks in notebook files and record their output",
    after_help = "Files are rewritten in place; the previous contents are kept at FILE.orig, \
                  and an existing FILE.orig is overwritten. The backup is a last resort \
                  against data loss, not a substitute for keeping notebooks under version \
                  control."
)]
struct Cli {
    /// Notebook files to process, in order.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Give each code block at most this many seconds to finish.
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// Remove all recorded output from code blocks, like 'make clean' before
    /// a rebuild from scratch.
    #[arg(short, long, conflicts_with = "evaluate")]
    clean: bool,

    /// Which blocks to evaluate: 'all', 'non-zero' (recorded failures only)
    /// or 'empty' (no recorded output yet; the default).
    #[arg(short, long, value_name = "STRATEGY")]
    evaluate: Option<Strategy>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.clean {
            Mode::Clean
        } else {
            Mode::Evaluate(self.evaluate.unwrap_or_default())
        }
    }
}

fn main() {
    if let Err(err) = run() {
        if err.downcast_ref::<Interrupted>().is_some() {
            std::process::exit(exit_codes::OK);
        }
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init();
    interrupt::install()?;

    let options = Options {
        mode: cli.mode(),
        timeout: Duration::from_secs(cli.timeout),
    };

    let total = cli.files.len();
    let mut failed = 0usize;
    for (index, path) in cli.files.iter().enumerate() {
        if interrupt::requested() {
            return Err(Interrupted.into());
        }
        let prefix = if total > 1 {
            format!("[File {}/{}]  ", index + 1, total)
        } else {
            String::new()
        };
        if let Err(err) = process_one(path, &options, &prefix) {
            if err.downcast_ref::<Interrupted>().is_some() {
                return Err(err);
            }
            eprintln!("runbook: {err:#}");
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} of {total} files failed");
    }
    Ok(())
}

/// Process one file, drawing the carriage-return progress counter on stderr
/// while blocks run. The line is only opened when at least one block is
/// selected, and always closed before returning.
fn process_one(path: &Path, options: &Options, prefix: &str) -> Result<()> {
    let mut progressed = false;
    let result = run::process_file(path, options, |ordinal, total| {
        progressed = true;
        eprint!("\r{prefix}Evaluating code blocks {ordinal}/{total}");
    });
    match result {
        Ok(report) => {
            if progressed {
                if report.eval.failures > 0 {
                    let plural = if report.eval.failures > 1 { "s" } else { "" };
                    eprint!("  ({} error{plural})", report.eval.failures);
                }
                eprintln!();
            }
            Ok(())
        }
        Err(err) => {
            if progressed {
                eprintln!();
            }
            Err(err)
        }
    }
}
