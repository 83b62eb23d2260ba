//! Utility modules: retry, timeout, text helpers.

pub mod retry;
pub mod text;
pub mod timeout;
