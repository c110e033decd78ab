//! Postcondition-to-imperative synthesis.
//!
//! Turns a declarative postcondition into an ordered statement tree that
//! establishes it under the operation's precondition. Submodules: the
//! engine (shape-directed translation), write-frame inference, the
//! aggregate-update translator, quantifier extraction, and deterministic
//! fresh-name generation.

pub mod engine;
pub mod frame;
pub mod names;
pub mod quantifier;
pub mod update;

#[cfg(test)]
mod tests;

pub use engine::synthesize_operation;
pub use frame::{FrameCache, write_frame};
pub use names::NameGenerator;
pub use quantifier::{GuardSplit, split_guard};
pub use update::translate_update;
