//! Write-frame inference.
//!
//! The write frame of an update operation is the set of attributes its
//! postcondition may assign. It is derived from assignment-shaped conjuncts
//! and membership-update idioms, plus every attribute read in its `@pre`
//! form (those need a snapshot local, which counts as touching the
//! attribute). Frames are memoized per operation.

use crate::checker::{Diagnostic, Diagnostics};
use crate::common::expr::{BinOp, Expr, ExprNode};
use crate::common::model::{BehaviouralFeature, Model};
use std::collections::{BTreeSet, HashMap};

/// Attribute names the postcondition assigns, directly or through a
/// collection-update idiom.
pub fn write_frame(post: &Expr, model: &Model, owner: Option<&str>) -> BTreeSet<String> {
    let mut frame = BTreeSet::new();
    collect_writes(post, model, owner, &mut frame);
    for name in pre_state_reads(post) {
        if is_attribute(model, owner, &name) {
            frame.insert(name);
        }
    }
    frame
}

fn collect_writes(expr: &Expr, model: &Model, owner: Option<&str>, out: &mut BTreeSet<String>) {
    match &expr.node {
        ExprNode::Binary { op, lhs, rhs } => match op {
            BinOp::And | BinOp::Or => {
                collect_writes(lhs, model, owner, out);
                collect_writes(rhs, model, owner, out);
            }
            // Guard equalities are conditions, not writes.
            BinOp::Implies => collect_writes(rhs, model, owner, out),
            BinOp::Eq => {
                if let Some(name) = written_name(lhs)
                    && is_attribute(model, owner, &name)
                {
                    out.insert(name);
                }
            }
            BinOp::In | BinOp::NotIn | BinOp::Subset | BinOp::NotSubset => {
                if let Some(name) = written_name(rhs)
                    && is_attribute(model, owner, &name)
                {
                    out.insert(name);
                }
            }
            _ => {}
        },
        ExprNode::Unary { operand, .. } => collect_writes(operand, model, owner, out),
        _ => {}
    }
}

fn written_name(target: &Expr) -> Option<String> {
    match &target.node {
        ExprNode::Var(name) => Some(name.clone()),
        ExprNode::Feature { name, at_pre, .. } if !at_pre => Some(name.clone()),
        _ => None,
    }
}

fn is_attribute(model: &Model, owner: Option<&str>, name: &str) -> bool {
    owner.is_some_and(|e| model.attribute_of(e, name).is_some())
}

/// Feature names read in their before-state (`@pre`) form, anywhere in the
/// expression. Each one needs a snapshot local taken before the first write.
pub fn pre_state_reads(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_pre_reads(expr, &mut out);
    out
}

fn collect_pre_reads(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.node {
        ExprNode::Feature {
            object,
            name,
            at_pre,
        } => {
            if *at_pre {
                out.insert(name.clone());
            }
            if let Some(obj) = object {
                collect_pre_reads(obj, out);
            }
        }
        ExprNode::Unary { operand, .. } => collect_pre_reads(operand, out),
        ExprNode::Binary { lhs, rhs, .. } => {
            collect_pre_reads(lhs, out);
            collect_pre_reads(rhs, out);
        }
        ExprNode::SetLiteral { elements, .. } => {
            for e in elements {
                collect_pre_reads(e, out);
            }
        }
        ExprNode::Quantified { range, body, .. } => {
            collect_pre_reads(range, out);
            collect_pre_reads(body, out);
        }
        ExprNode::Literal(_) | ExprNode::Var(_) => {}
    }
}

/// Every attribute of the owner textually mentioned in the expression. The
/// degraded fallback frame when inference finds nothing.
pub fn mentioned_attributes(expr: &Expr, model: &Model, owner: Option<&str>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_mentions(expr, model, owner, &mut out);
    out
}

fn collect_mentions(expr: &Expr, model: &Model, owner: Option<&str>, out: &mut BTreeSet<String>) {
    match &expr.node {
        ExprNode::Var(name) => {
            if is_attribute(model, owner, name) {
                out.insert(name.clone());
            }
        }
        ExprNode::Feature { object, name, .. } => {
            if is_attribute(model, owner, name) {
                out.insert(name.clone());
            }
            if let Some(obj) = object {
                collect_mentions(obj, model, owner, out);
            }
        }
        ExprNode::Unary { operand, .. } => collect_mentions(operand, model, owner, out),
        ExprNode::Binary { lhs, rhs, .. } => {
            collect_mentions(lhs, model, owner, out);
            collect_mentions(rhs, model, owner, out);
        }
        ExprNode::SetLiteral { elements, .. } => {
            for e in elements {
                collect_mentions(e, model, owner, out);
            }
        }
        ExprNode::Quantified { range, body, .. } => {
            collect_mentions(range, model, owner, out);
            collect_mentions(body, model, owner, out);
        }
        ExprNode::Literal(_) => {}
    }
}

/// Memoized per-operation write frames, keyed by operation identity.
///
/// The same operation's frame is queried from several call sites during a
/// run; recomputing it each time would re-walk the postcondition.
#[derive(Debug, Default)]
pub struct FrameCache {
    frames: HashMap<String, BTreeSet<String>>,
}

impl FrameCache {
    pub fn new() -> Self {
        FrameCache::default()
    }

    /// The write frame of `op`, computed on first request. An empty inferred
    /// frame on an update operation is reported once and degrades to every
    /// attribute the postcondition mentions.
    pub fn frame_of(
        &mut self,
        op: &BehaviouralFeature,
        model: &Model,
        diags: &mut Diagnostics,
    ) -> BTreeSet<String> {
        if let Some(frame) = self.frames.get(&op.key()) {
            return frame.clone();
        }
        let owner = op.owner.as_deref();
        let mut frame = match &op.postcondition {
            Some(post) => write_frame(post, model, owner),
            None => BTreeSet::new(),
        };
        if frame.is_empty() && !op.is_query {
            diags.push(Diagnostic::EmptyWriteFrame {
                operation: op.key(),
            });
            if let Some(post) = &op.postcondition {
                frame = mentioned_attributes(post, model, owner);
            }
        }
        self.frames.insert(op.key(), frame.clone());
        frame
    }
}
