//! Block model: the units a notebook document is made of.
//!
//! A document is an alternating sequence of [`ProseBlock`] and [`CodeBlock`].
//! A code block may carry one [`OutputBlock`], the recorded result of its
//! last evaluation. Every block renders back to text via `Display`, and the
//! concatenation of those renderings reproduces the source document exactly
//! when nothing was changed.

use std::fmt;

/// Marker prepended to every non-blank captured output line inside an
/// annotation.
pub const OUTPUT_INDENT: &str = "    ";

/// An opaque run of document text. Never interpreted, only re-emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProseBlock {
    pub text: String,
}

/// One fenced executable unit.
///
/// `text` is the exact original fenced region including both fence lines, so
/// an unevaluated block round-trips byte for byte. `command` and `input` are
/// derived from it at parse time and never change afterwards; only `output`
/// is replaced when the block is (re-)evaluated or cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    text: String,
    command: String,
    input: String,
    output: Option<OutputBlock>,
}

impl CodeBlock {
    pub(crate) fn new(
        text: String,
        command: String,
        input: String,
        output: Option<OutputBlock>,
    ) -> Self {
        Self {
            text,
            command,
            input,
            output,
        }
    }

    /// The shell command line from the opening fence's info string.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The fenced body, fed to the command as stdin.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> Option<&OutputBlock> {
        self.output.as_ref()
    }

    /// Exit code of the recorded output, `None` while never evaluated.
    pub fn exit_code(&self) -> Option<i32> {
        self.output.as_ref().map(OutputBlock::exit_code)
    }

    /// Replace the recorded output wholesale.
    pub(crate) fn set_output(&mut self, output: OutputBlock) {
        self.output = Some(output);
    }

    /// Drop the recorded output. Returns whether there was one.
    pub(crate) fn clear_output(&mut self) -> bool {
        self.output.take().is_some()
    }
}

/// The captured result of one execution, as a self-contained annotated
/// sub-block: an opener line carrying the exit code, the captured stdout
/// indented by [`OUTPUT_INDENT`], and a `:::` terminator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBlock {
    exit_code: i32,
    text: String,
}

impl OutputBlock {
    /// Wrap a raw annotation span read from an existing document. The caller
    /// is responsible for having extracted `exit_code` from its opener line.
    pub(crate) fn new(exit_code: i32, text: String) -> Self {
        Self { exit_code, text }
    }

    /// Build the canonical annotation for freshly captured stdout.
    ///
    /// Non-blank output lines are indented; a single newline is appended when
    /// the capture is non-empty but does not end in one, so the terminator
    /// always sits on its own line.
    pub fn from_captured(exit_code: i32, stdout: &str) -> Self {
        let mut text = format!("::: {{.output exit_code=\"{exit_code}\"}}\n");
        text.push_str(&indent(stdout));
        if !stdout.is_empty() && !stdout.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(":::\n");
        Self { exit_code, text }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// The captured stdout with the annotation framing stripped back off.
    pub fn captured(&self) -> String {
        let lines: Vec<&str> = self.text.split_inclusive('\n').collect();
        if lines.len() < 2 {
            return String::new();
        }
        lines[1..lines.len() - 1]
            .iter()
            .map(|line| line.strip_prefix(OUTPUT_INDENT).unwrap_or(line))
            .collect()
    }
}

/// Indent every non-blank line. Blank lines stay untouched so trailing
/// whitespace is never invented.
fn indent(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{OUTPUT_INDENT}{line}")
            }
        })
        .collect()
}

/// A unit of the document sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Prose(ProseBlock),
    Code(CodeBlock),
}

impl fmt::Display for ProseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for OutputBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        if let Some(output) = &self.output {
            write!(f, "{output}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Prose(prose) => write!(f, "{prose}"),
            Block::Code(code) => write!(f, "{code}"),
        }
    }
}
