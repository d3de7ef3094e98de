//! Side-effecting operations: configuration, process execution, the
//! generation backend and its prompt/response codecs.

pub mod config;
pub mod generator;
pub mod parse;
pub mod process;
pub mod prompt;
