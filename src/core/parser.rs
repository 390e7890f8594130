//! Single-pass notebook parser.
//!
//! The scanner walks the raw text line by line (newlines kept attached) and
//! switches between two states: collecting prose, or collecting a fenced code
//! region. Every byte of input lands in exactly one block's stored text,
//! which is what makes the parse/serialize round trip exact.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::block::{Block, CodeBlock, OutputBlock, ProseBlock};
use crate::core::document::Document;

/// A fence is any line starting with three backticks. Longer runs also open
/// or close a fence; the extra backticks are not part of the command.
pub const FENCE: &str = "```";

const OUTPUT_OPEN: &str = "::: {.output";
const OUTPUT_CLOSE: &str = ":::";

/// Why a document was rejected. Line numbers are 1-based positions in the
/// input text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("code fence opened on line {line} is never closed")]
    UnclosedFence { line: usize },
    #[error("code fence on line {line} has no command")]
    EmptyCommand { line: usize },
    #[error("output block opened on line {line} is never closed")]
    UnclosedOutput { line: usize },
    #[error("output block on line {line} has a missing or invalid exit_code attribute")]
    BadExitCode { line: usize },
}

/// Parse raw notebook text into a document.
///
/// Any text is accepted as prose; errors only arise from malformed code
/// fences and output annotations. The returned document is not dirty.
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut blocks = Vec::new();
    let mut acc = String::new();
    let mut in_code = false;
    let mut fence_line = 0;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if !in_code {
            if line.starts_with(FENCE) {
                blocks.push(Block::Prose(ProseBlock {
                    text: std::mem::take(&mut acc),
                }));
                acc.push_str(line);
                fence_line = i + 1;
                in_code = true;
            } else {
                acc.push_str(line);
            }
        } else if line.starts_with(FENCE) {
            acc.push_str(line);
            let mut output = None;
            if i + 1 < lines.len() && lines[i + 1].starts_with(OUTPUT_OPEN) {
                i += 1;
                let opened_on = i + 1;
                let mut raw = String::new();
                let mut closed = false;
                while i < lines.len() {
                    let annotation_line = lines[i];
                    raw.push_str(annotation_line);
                    if line_content(annotation_line) == OUTPUT_CLOSE {
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    return Err(ParseError::UnclosedOutput { line: opened_on });
                }
                output = Some(parse_output(&raw, opened_on)?);
            }
            blocks.push(Block::Code(code_block(
                std::mem::take(&mut acc),
                output,
                fence_line,
            )?));
            in_code = false;
        } else {
            acc.push_str(line);
        }
        i += 1;
    }

    if in_code {
        return Err(ParseError::UnclosedFence { line: fence_line });
    }
    // The trailing prose block is kept even when empty so that documents
    // ending in a code block still alternate prose/code/prose.
    blocks.push(Block::Prose(ProseBlock { text: acc }));
    Ok(Document::new(blocks))
}

/// A line with its terminator stripped, tolerating CRLF input.
fn line_content(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn code_block(
    text: String,
    output: Option<OutputBlock>,
    fence_line: usize,
) -> Result<CodeBlock, ParseError> {
    let first = text.lines().next().unwrap_or("");
    let command = first.trim_start_matches('`').trim().to_string();
    if command.is_empty() {
        return Err(ParseError::EmptyCommand { line: fence_line });
    }
    let body: Vec<&str> = text.lines().collect();
    let input = body[1..body.len() - 1].join("\n");
    Ok(CodeBlock::new(text, command, input, output))
}

fn parse_output(raw: &str, line: usize) -> Result<OutputBlock, ParseError> {
    static EXIT_CODE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#" exit_code="(-?\d+)""#).unwrap());

    let opener = raw.lines().next().unwrap_or("");
    let exit_code = EXIT_CODE_RE
        .captures(opener)
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .ok_or(ParseError::BadExitCode { line })?;
    Ok(OutputBlock::new(exit_code, raw.to_string()))
}
