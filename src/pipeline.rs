//! End-to-end synthesis pipeline.
//!
//! Drives every operation of a model (or of a parsed specification file)
//! through checking, simplification and synthesis. Operations are isolated
//! from each other: each one gets its own diagnostics, and a failure in one
//! never aborts the run. The write-frame cache is shared across the whole
//! run.
//!
//! # Pipeline stages
//!
//! ```text
//! Specification text (&str)
//!     │
//!     ▼ frontend
//! Operation specs (Vec<BehaviouralFeature>)
//!     │
//!     ▼ checker + simplify + synth   (per operation)
//! Outcomes (Vec<OperationOutcome>)
//! ```

use crate::checker::{Diagnostic, Diagnostics};
use crate::common::expr::Expr;
use crate::common::model::{BehaviouralFeature, Model};
use crate::common::stmt::Statement;
use crate::frontend::{self, SyntaxError};
use crate::synth::{FrameCache, synthesize_operation};
use std::fmt;

/// The result of synthesizing a single operation.
///
/// Always carries a statement tree: when synthesis could not honor part of
/// the postcondition the tree contains placeholders and the diagnostics say
/// why.
#[derive(Clone, Debug)]
pub struct OperationOutcome {
    /// Owning entity, `None` for a free operation.
    pub entity: Option<String>,
    pub operation: String,
    pub statement: Statement,
    pub diagnostics: Diagnostics,
}

impl OperationOutcome {
    /// True when synthesis finished without errors. Warnings are allowed.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Errors raised before per-operation isolation kicks in.
#[derive(Clone, Debug)]
pub enum PipelineError {
    /// The specification text did not lex or parse.
    Syntax(Vec<SyntaxError>),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Syntax(errors) => {
                write!(f, "Syntax errors in specification:")?;
                for e in errors {
                    write!(f, "\n  {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Synthesize every operation declared on the model's entities.
pub fn synthesize_model(model: &Model) -> Vec<OperationOutcome> {
    let mut frames = FrameCache::new();
    let mut outcomes = Vec::new();
    for entity in &model.entities {
        for op in &entity.operations {
            outcomes.push(run_operation(op, model, &mut frames));
        }
    }
    outcomes
}

/// Parse a specification file and synthesize each operation it declares
/// against the given model.
///
/// The parsed operations are synthesized with their declared context entity
/// but are not installed into the model.
pub fn synthesize_source(
    src: &str,
    model: &Model,
) -> Result<Vec<OperationOutcome>, PipelineError> {
    let ops = frontend::parse_spec(src).map_err(PipelineError::Syntax)?;
    let mut frames = FrameCache::new();
    Ok(ops
        .iter()
        .map(|op| run_operation(op, model, &mut frames))
        .collect())
}

fn run_operation(
    op: &BehaviouralFeature,
    model: &Model,
    frames: &mut FrameCache,
) -> OperationOutcome {
    let mut diagnostics = Diagnostics::new();
    let statement = synthesize_operation(op, model, frames, &mut diagnostics);
    OperationOutcome {
        entity: op.owner.clone(),
        operation: op.name.clone(),
        statement,
        diagnostics,
    }
}

/// Signature similarity below which two same-named operations are treated
/// as distinct rather than mergeable.
const MERGE_THRESHOLD: f64 = 0.5;

/// Decide whether two same-named operations from different model branches
/// specify the same feature, using the structural type similarity metric.
pub fn merge_compatible(
    a: &BehaviouralFeature,
    b: &BehaviouralFeature,
    model: &Model,
) -> Result<(), String> {
    if a.name != b.name {
        return Err(format!("`{}` and `{}` are different names", a.name, b.name));
    }
    if a.is_query != b.is_query {
        return Err("one side is a query, the other an update".to_string());
    }
    if a.parameters.len() != b.parameters.len() {
        return Err(format!(
            "parameter counts differ ({} vs {})",
            a.parameters.len(),
            b.parameters.len()
        ));
    }
    for (pa, pb) in a.parameters.iter().zip(&b.parameters) {
        if model.similarity(&pa.ty, &pb.ty) < MERGE_THRESHOLD {
            return Err(format!(
                "parameter `{}` has unrelated types `{}` and `{}`",
                pa.name, pa.ty, pb.ty
            ));
        }
    }
    match (&a.result_type, &b.result_type) {
        (None, None) => Ok(()),
        (Some(ra), Some(rb)) => {
            if model.similarity(ra, rb) < MERGE_THRESHOLD {
                Err(format!("unrelated result types `{}` and `{}`", ra, rb))
            } else {
                Ok(())
            }
        }
        _ => Err("only one side declares a result type".to_string()),
    }
}

/// Merge two compatible same-named operation specifications into one.
///
/// Preconditions are disjoined (either applicability condition suffices; a
/// missing precondition means the operation is always applicable, so the
/// merge has none either). Postconditions are conjoined: both effects must
/// hold. On an incompatible pair an `AmbiguousMerge` diagnostic is pushed
/// and `None` returned.
pub fn merge_features(
    a: &BehaviouralFeature,
    b: &BehaviouralFeature,
    model: &Model,
    diags: &mut Diagnostics,
) -> Option<BehaviouralFeature> {
    if let Err(reason) = merge_compatible(a, b, model) {
        diags.push(Diagnostic::AmbiguousMerge {
            operation: a.name.clone(),
            reason,
        });
        return None;
    }

    let mut merged = a.clone();
    merged.precondition = match (&a.precondition, &b.precondition) {
        (Some(pa), Some(pb)) => Some(Expr::or(pa, pb)),
        _ => None,
    };
    merged.postcondition = match (&a.postcondition, &b.postcondition) {
        (Some(qa), Some(qb)) => Some(Expr::and(qa, qb)),
        (Some(q), None) | (None, Some(q)) => Some(q.clone()),
        (None, None) => None,
    };
    Some(merged)
}
