//! Deterministic, pure logic: the block model, parser and strategies.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod block;
pub mod document;
pub mod parser;
pub mod strategy;
