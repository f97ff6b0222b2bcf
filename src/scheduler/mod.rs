//! Automatic check scheduling
//!
//! A single recurring timer that triggers fetch cycles at a configurable
//! interval and re-arms itself after each cycle regardless of outcome.

mod core;

pub use core::{CheckRunner, Scheduler};
