//! Guard policy evaluation for the Payguard engine.
//!
//! The evaluator is a pure function over the payment's facts and a
//! precomputed spend snapshot: same inputs, same ordered results. That
//! determinism is what makes incident replay diffs reproducible.

pub mod diff;
pub mod evaluator;

pub use diff::{diff_results, GuardDiff};
pub use evaluator::{auto_approve_eligible, evaluate, GuardContext};
