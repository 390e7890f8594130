//! Orchestration: applying one operation to one notebook file.
//!
//! The functions here connect the pure core (parse, select, render) to the
//! I/O layer (evaluate, rewrite). Rewrites are strictly gated: a file is only
//! touched after its whole operation succeeded and actually changed the
//! document.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::document::Document;
use crate::core::strategy::Strategy;
use crate::io::evaluate::evaluate_block;
use crate::io::interrupt::{self, Interrupted};
use crate::io::store::{read_document, write_with_backup};

/// What to do to each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Evaluate(Strategy),
    Clean,
}

/// Per-run options shared by every file.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub mode: Mode,
    pub timeout: Duration,
}

/// What evaluating one document amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalReport {
    /// How many blocks the strategy selected.
    pub selected: usize,
    /// How many of those finished with a non-zero exit code.
    pub failures: usize,
}

/// Evaluate the blocks a strategy selects, strictly in document order.
///
/// An empty selection is a no-op that leaves the document clean. The
/// `on_block` callback fires before each block with (1-based ordinal, total),
/// which is where the CLI hangs its progress line.
pub fn evaluate_document(
    doc: &mut Document,
    strategy: Strategy,
    timeout: Duration,
    mut on_block: impl FnMut(usize, usize),
) -> Result<EvalReport> {
    let selected = strategy.select(doc);
    if selected.is_empty() {
        debug!(%strategy, "no blocks selected");
        return Ok(EvalReport::default());
    }

    doc.mark_dirty();
    let total = selected.len();
    let mut failures = 0;
    for (ordinal, index) in selected.into_iter().enumerate() {
        if interrupt::requested() {
            return Err(Interrupted.into());
        }
        on_block(ordinal + 1, total);
        let block = doc
            .code_block_mut(index)
            .context("strategy selected a non-code block")?;
        if evaluate_block(block, timeout)? != 0 {
            failures += 1;
        }
    }
    Ok(EvalReport {
        selected: total,
        failures,
    })
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReport {
    pub eval: EvalReport,
    /// Whether the file was rewritten (and therefore backed up).
    pub rewritten: bool,
}

/// Load, process and, when anything changed, back up and rewrite one
/// notebook file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn process_file(
    path: &Path,
    options: &Options,
    on_block: impl FnMut(usize, usize),
) -> Result<FileReport> {
    let text = read_document(path)?;
    let mut doc =
        Document::parse(&text).with_context(|| format!("parse notebook {}", path.display()))?;

    let eval = match options.mode {
        Mode::Evaluate(strategy) => {
            evaluate_document(&mut doc, strategy, options.timeout, on_block)?
        }
        Mode::Clean => {
            let cleared = doc.clean();
            debug!(cleared, "cleaned document");
            EvalReport::default()
        }
    };

    if !doc.is_dirty() {
        debug!("document unchanged, leaving file alone");
        return Ok(FileReport {
            eval,
            rewritten: false,
        });
    }
    write_with_backup(path, &doc.to_string())?;
    info!(
        selected = eval.selected,
        failures = eval.failures,
        "rewrote notebook"
    );
    Ok(FileReport {
        eval,
        rewritten: true,
    })
}
