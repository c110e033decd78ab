//! Praxis: a model-driven code synthesizer.
//!
//! Given a typed object-oriented data model (entities, attributes,
//! associations) and declarative operation specifications written as
//! precondition/postcondition pairs in an OCL-like constraint language,
//! praxis produces deterministic imperative routines (a `Statement` tree)
//! implementing each operation's effect.
//!
//! # Pipeline stages
//!
//! ```text
//! Constraint text (&str)
//!     │
//!     ▼ frontend (lexer + parser)
//! Expression AST (Expr)
//!     │
//!     ▼ checker
//! Annotated AST (types + reference kinds)
//!     │
//!     ▼ simplify
//! Normalized constraint
//!     │
//!     ▼ synth
//! Statement tree (Statement)
//! ```
//!
//! Target-language emitters consume the `Statement` tree; they own surface
//! syntax and are not part of this crate.

pub mod checker;
pub mod common;
pub mod frontend;
pub mod pipeline;
pub mod simplify;
pub mod synth;

pub use common::expr::{BinOp, Expr, ExprNode, Literal, QuantifierKind, RefKind, UnaryOp};
pub use common::model::{Association, Attribute, BehaviouralFeature, Entity, Model};
pub use common::stmt::Statement;
pub use common::types::{CollectionKind, Primitive, Type};
