//! Selection strategies: which code blocks an evaluation pass touches.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::core::block::{Block, CodeBlock};
use crate::core::document::Document;

/// Decides which code blocks to (re-)evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Every code block, regardless of previous results.
    All,
    /// Blocks whose recorded exit code is non-zero. Never-evaluated blocks
    /// are not failures and are left alone.
    NonZero,
    /// Blocks with no recorded output yet.
    #[default]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown evaluation strategy '{0}' (expected 'all', 'non-zero' or 'empty')")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "non-zero" => Ok(Self::NonZero),
            "empty" => Ok(Self::Empty),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NonZero => "non-zero",
            Self::Empty => "empty",
        }
    }

    /// Indices into [`Document::blocks`] of the selected code blocks, in
    /// document order.
    pub fn select(self, doc: &Document) -> Vec<usize> {
        doc.blocks()
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match block {
                Block::Code(code) if self.wants(code) => Some(index),
                _ => None,
            })
            .collect()
    }

    fn wants(self, code: &CodeBlock) -> bool {
        match self {
            Self::All => true,
            Self::NonZero => code.exit_code().is_some_and(|code| code != 0),
            Self::Empty => code.output().is_none(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
