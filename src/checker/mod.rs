// src/checker/mod.rs

pub mod check;
pub mod diagnostics;
pub mod env;
pub mod report;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use check::check;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use env::Environment;
pub use report::report_diagnostic;
