use crate::common::types::Type;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostics surfaced to the caller.
///
/// All of these are advisory: checking and synthesis continue past every one
/// of them, degrading to a conservative output. A caller may still treat any
/// diagnostic as fatal for its own purposes.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// A bare name resolved to nothing: not a bound variable, not a feature
    /// of any enclosing context, not a constant, not an entity.
    UnresolvedName {
        name: String,
        scope: String,
    },

    TypeMismatch {
        expected: String,
        found: Option<Type>,
        at: String,
    },

    /// A query operation with no declared result type.
    MissingResultType {
        operation: String,
    },

    /// The inferred write frame of an update operation is empty: the
    /// postcondition constrains nothing the operation could assign.
    EmptyWriteFrame {
        operation: String,
    },

    /// An assignment to an unbound name auto-declared a local.
    ImplicitLocal {
        name: String,
    },

    /// A postcondition shape with no synthesis rule; an opaque placeholder
    /// statement was emitted instead.
    SynthesisGap {
        constraint: String,
    },

    /// Two same-named operations from different branches cannot be merged.
    AmbiguousMerge {
        operation: String,
        reason: String,
    },

    /// A query's stated precondition does not cover the definedness
    /// conditions of its postcondition.
    NonTotalPrecondition {
        operation: String,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnresolvedName { .. }
            | Diagnostic::TypeMismatch { .. }
            | Diagnostic::MissingResultType { .. }
            | Diagnostic::AmbiguousMerge { .. } => Severity::Error,
            Diagnostic::EmptyWriteFrame { .. }
            | Diagnostic::ImplicitLocal { .. }
            | Diagnostic::SynthesisGap { .. }
            | Diagnostic::NonTotalPrecondition { .. } => Severity::Warning,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::UnresolvedName { .. } => "E001",
            Diagnostic::TypeMismatch { .. } => "E002",
            Diagnostic::MissingResultType { .. } => "E003",
            Diagnostic::AmbiguousMerge { .. } => "E004",
            Diagnostic::EmptyWriteFrame { .. } => "W001",
            Diagnostic::ImplicitLocal { .. } => "W002",
            Diagnostic::SynthesisGap { .. } => "W003",
            Diagnostic::NonTotalPrecondition { .. } => "W004",
        }
    }

    /// The constraint fragment this diagnostic is about, when one exists.
    /// The reporter uses it to place a source label.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Diagnostic::UnresolvedName { name, .. } => Some(name),
            Diagnostic::TypeMismatch { at, .. } => Some(at),
            Diagnostic::ImplicitLocal { name } => Some(name),
            Diagnostic::SynthesisGap { constraint } => Some(constraint),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedName { name, scope } => {
                write!(f, "Cannot resolve `{}` in {}", name, scope)
            }
            Diagnostic::TypeMismatch {
                expected,
                found,
                at,
            } => match found {
                Some(found) => write!(
                    f,
                    "Type mismatch at `{}`: expected {}, found `{}`",
                    at, expected, found
                ),
                None => write!(
                    f,
                    "Type mismatch at `{}`: expected {}, found an ill-typed operand",
                    at, expected
                ),
            },
            Diagnostic::MissingResultType { operation } => {
                write!(f, "Query operation `{}` has no result type", operation)
            }
            Diagnostic::EmptyWriteFrame { operation } => {
                write!(
                    f,
                    "Operation `{}` has an empty write frame: its postcondition assigns nothing",
                    operation
                )
            }
            Diagnostic::ImplicitLocal { name } => {
                write!(
                    f,
                    "Assignment to unbound name `{}` implicitly declares a local",
                    name
                )
            }
            Diagnostic::SynthesisGap { constraint } => {
                write!(f, "No synthesis rule for `{}`", constraint)
            }
            Diagnostic::AmbiguousMerge { operation, reason } => {
                write!(f, "Cannot merge operations named `{}`: {}", operation, reason)
            }
            Diagnostic::NonTotalPrecondition { operation } => {
                write!(
                    f,
                    "Precondition of `{}` does not cover all partial operations in its postcondition",
                    operation
                )
            }
        }
    }
}

/// An accumulated list of diagnostics, threaded through checking and
/// synthesis. Never used for control flow across component boundaries.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.items.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
