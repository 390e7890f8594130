//! Side-effecting operations: child processes, file rewrites, interrupts.

pub mod evaluate;
pub mod interrupt;
pub mod process;
pub mod store;
