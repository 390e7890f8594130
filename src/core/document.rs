//! A parsed notebook and its pending-change state.

use std::fmt;

use crate::core::block::{Block, CodeBlock};
use crate::core::parser::{self, ParseError};

/// An ordered sequence of blocks plus a dirty flag.
///
/// The flag tracks whether anything changed since parsing; callers use it to
/// decide whether rewriting the file is warranted at all. A freshly parsed
/// document is clean, and rendering a clean document reproduces the source
/// text byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    dirty: bool,
}

impl Document {
    pub(crate) fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            dirty: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The code block at `index` into [`Self::blocks`], if that position
    /// holds one.
    pub(crate) fn code_block_mut(&mut self, index: usize) -> Option<&mut CodeBlock> {
        match self.blocks.get_mut(index) {
            Some(Block::Code(code)) => Some(code),
            _ => None,
        }
    }

    /// Drop all recorded outputs. Returns how many blocks were cleared; the
    /// document only becomes dirty when that count is non-zero.
    pub fn clean(&mut self) -> usize {
        let mut cleared = 0;
        for block in &mut self.blocks {
            if let Block::Code(code) = block
                && code.clear_output()
            {
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.dirty = true;
        }
        cleared
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVALUATED: &str = "\
Intro.

```echo one
```
::: {.output exit_code=\"0\"}
    one
:::

```false
```
::: {.output exit_code=\"1\"}
:::
";

    #[test]
    fn fresh_documents_are_clean() {
        let doc = Document::parse(EVALUATED).expect("parse");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn clean_strips_every_annotation_and_dirties() {
        let mut doc = Document::parse(EVALUATED).expect("parse");
        assert_eq!(doc.clean(), 2);
        assert!(doc.is_dirty());
        assert_eq!(
            doc.to_string(),
            "Intro.\n\n```echo one\n```\n\n```false\n```\n"
        );
    }

    #[test]
    fn clean_is_a_noop_without_outputs() {
        let mut doc = Document::parse("```true\n```\n").expect("parse");
        assert_eq!(doc.clean(), 0);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn clean_is_idempotent() {
        let mut doc = Document::parse(EVALUATED).expect("parse");
        doc.clean();
        let once = doc.to_string();
        assert_eq!(doc.clean(), 0);
        assert_eq!(doc.to_string(), once);
    }
}
