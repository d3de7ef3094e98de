//! Tax regime comparison engine for the Brazilian consumption-tax reform.
//!
//! Compares a simplified flat-rate regime (Simples Nacional) against the
//! credit-based IBS/CBS model for one month of figures, using a generative
//! text backend for the narrative analysis with a deterministic arithmetic
//! fallback. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (arithmetic model, validation,
//!   sanitization, canned content). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (configuration, process
//!   execution, the generation backend). Isolated to enable scripted
//!   backends in tests.
//!
//! [`orchestrator::compute_comparison`] coordinates both: it retries the
//! backend a bounded number of times and is guaranteed to return a
//! fully-specified [`core::types::ComparisonResult`], never an error.

pub mod core;
pub mod io;
pub mod logging;
pub mod orchestrator;
