//! Deterministic, pure logic of the comparison engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod model;
pub mod playbook;
pub mod sanitize;
pub mod types;
pub mod validate;
