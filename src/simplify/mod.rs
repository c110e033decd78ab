//! Boolean and algebraic simplification of constraint expressions.
//!
//! Every function here takes immutable trees and returns a new tree that is
//! equivalent but no larger. When no rule applies the input shape is kept
//! unchanged, so `simplify` is idempotent: simplifying a simplified tree is
//! the identity.

pub mod conflict;


pub use conflict::conflicts;

use crate::common::expr::{BinOp, Expr, ExprNode, Literal, QuantifierKind, UnaryOp};
use std::sync::Arc;

/// Simplify an expression bottom-up.
pub fn simplify(expr: &Expr) -> Expr {
    match &expr.node {
        ExprNode::Literal(_) | ExprNode::Var(_) => expr.clone(),

        ExprNode::Feature { object, name, at_pre } => {
            let object = object.as_ref().map(|o| Arc::new(simplify(o)));
            Expr {
                node: ExprNode::Feature {
                    object,
                    name: name.clone(),
                    at_pre: *at_pre,
                },
                ..expr.clone()
            }
        }

        ExprNode::Unary { op, operand } => {
            let operand = simplify(operand);
            match op {
                // Negation is pushed down structurally (De Morgan).
                UnaryOp::Not => negate(&operand),
                _ => Expr {
                    node: ExprNode::Unary {
                        op: *op,
                        operand: Arc::new(operand),
                    },
                    ..expr.clone()
                },
            }
        }

        ExprNode::Binary { op, lhs, rhs } => {
            let lhs = simplify(lhs);
            let rhs = simplify(rhs);
            match op {
                BinOp::And => simplify_and(&lhs, &rhs),
                BinOp::Or => simplify_or(&lhs, &rhs),
                BinOp::Implies => simplify_implies(&lhs, &rhs),
                _ => match fold_constants(*op, &lhs, &rhs) {
                    Some(folded) => folded,
                    None => Expr {
                        node: ExprNode::Binary {
                            op: *op,
                            lhs: Arc::new(lhs),
                            rhs: Arc::new(rhs),
                        },
                        ..expr.clone()
                    },
                },
            }
        }

        ExprNode::SetLiteral { kind, elements } => Expr {
            node: ExprNode::SetLiteral {
                kind: *kind,
                elements: elements.iter().map(|e| Arc::new(simplify(e))).collect(),
            },
            ..expr.clone()
        },

        ExprNode::Quantified {
            kind,
            var,
            range,
            body,
        } => {
            let range = simplify(range);
            let body = simplify(body);
            match kind {
                QuantifierKind::ForAll if body.is_true() => Expr::bool(true),
                QuantifierKind::Exists if body.is_false() => Expr::bool(false),
                _ => Expr {
                    node: ExprNode::Quantified {
                        kind: *kind,
                        var: var.clone(),
                        range: Arc::new(range),
                        body: Arc::new(body),
                    },
                    ..expr.clone()
                },
            }
        }
    }
}

/// Conjoin two (already simplified) constraints.
pub fn simplify_and(a: &Expr, b: &Expr) -> Expr {
    if a.is_true() {
        return b.clone();
    }
    if b.is_true() {
        return a.clone();
    }
    if a.is_false() || b.is_false() {
        return Expr::bool(false);
    }
    if a == b {
        return a.clone();
    }

    let a_parts = a.conjuncts();
    let b_parts = b.conjuncts();

    // Subsumption: the larger conjunction is reused unchanged when it
    // already contains every conjunct of the other side.
    if b_parts.iter().all(|p| a_parts.contains(p)) {
        return a.clone();
    }
    if a_parts.iter().all(|p| b_parts.contains(p)) {
        return b.clone();
    }

    // A statically detected contradiction collapses the conjunction.
    for x in &a_parts {
        for y in &b_parts {
            if conflicts(x, y) {
                return Expr::bool(false);
            }
        }
    }

    Expr::and(a, b)
}

/// Disjoin two (already simplified) constraints.
pub fn simplify_or(a: &Expr, b: &Expr) -> Expr {
    if a.is_false() {
        return b.clone();
    }
    if b.is_false() {
        return a.clone();
    }
    if a.is_true() || b.is_true() {
        return Expr::bool(true);
    }
    if a == b {
        return a.clone();
    }

    // Absorption: (p & q) or p  reduces to  p.
    if a.conjuncts().contains(&b) {
        return b.clone();
    }
    if b.conjuncts().contains(&a) {
        return a.clone();
    }

    Expr::or(a, b)
}

/// Simplify an implication between (already simplified) constraints.
pub fn simplify_implies(a: &Expr, b: &Expr) -> Expr {
    if a.is_true() {
        return b.clone();
    }
    if a.is_false() || b.is_true() {
        return Expr::bool(true);
    }
    if a == b {
        return Expr::bool(true);
    }
    if b.is_false() {
        return negate(a);
    }

    // The antecedent already contains the consequent.
    if a.conjuncts().contains(&b) {
        return Expr::bool(true);
    }

    // Common antecedent: a => (a => c) flattens to a => c.
    if let Some((inner_guard, inner_body)) = b.as_implication()
        && (inner_guard == a || a.conjuncts().contains(&inner_guard))
    {
        return Expr::implies(a, inner_body);
    }

    Expr::implies(a, b)
}

/// Structural negation: De Morgan push-down, comparison operator flip,
/// quantifier kind flip, double-negation cancellation.
pub fn negate(expr: &Expr) -> Expr {
    match &expr.node {
        ExprNode::Literal(Literal::Bool(b)) => Expr::bool(!b),

        ExprNode::Unary {
            op: UnaryOp::Not,
            operand,
        } => (**operand).clone(),

        ExprNode::Unary {
            op: UnaryOp::IsEmpty,
            operand,
        } => Expr::unary(UnaryOp::NotEmpty, operand),

        ExprNode::Unary {
            op: UnaryOp::NotEmpty,
            operand,
        } => Expr::unary(UnaryOp::IsEmpty, operand),

        ExprNode::Binary { op, lhs, rhs } => match op {
            BinOp::And => Expr::or(&negate(lhs), &negate(rhs)),
            BinOp::Or => Expr::and(&negate(lhs), &negate(rhs)),
            BinOp::Implies => Expr::and(lhs, &negate(rhs)),
            _ => match negated_comparison(*op) {
                Some(flipped) => Expr::binary(flipped, lhs, rhs),
                None => Expr::not(expr),
            },
        },

        ExprNode::Quantified {
            kind: QuantifierKind::ForAll,
            var,
            range,
            body,
        } => Expr::quantified(QuantifierKind::Exists, var.clone(), range, &negate(body)),

        ExprNode::Quantified {
            kind: QuantifierKind::Exists,
            var,
            range,
            body,
        } => Expr::quantified(QuantifierKind::ForAll, var.clone(), range, &negate(body)),

        _ => Expr::not(expr),
    }
}

fn negated_comparison(op: BinOp) -> Option<BinOp> {
    match op {
        BinOp::Eq => Some(BinOp::Neq),
        BinOp::Neq => Some(BinOp::Eq),
        BinOp::Lt => Some(BinOp::Geq),
        BinOp::Geq => Some(BinOp::Lt),
        BinOp::Gt => Some(BinOp::Leq),
        BinOp::Leq => Some(BinOp::Gt),
        BinOp::In => Some(BinOp::NotIn),
        BinOp::NotIn => Some(BinOp::In),
        BinOp::Subset => Some(BinOp::NotSubset),
        BinOp::NotSubset => Some(BinOp::Subset),
        _ => None,
    }
}

/// Fold integer arithmetic and comparisons between literals. Division is
/// left unfolded (it is partial, and its definedness is handled separately).
fn fold_constants(op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    let (ExprNode::Literal(Literal::Int(a)), ExprNode::Literal(Literal::Int(b))) =
        (&lhs.node, &rhs.node)
    else {
        return None;
    };
    let (a, b) = (*a, *b);
    match op {
        BinOp::Add => Some(Expr::int(a.checked_add(b)?)),
        BinOp::Sub => Some(Expr::int(a.checked_sub(b)?)),
        BinOp::Mul => Some(Expr::int(a.checked_mul(b)?)),
        BinOp::Eq => Some(Expr::bool(a == b)),
        BinOp::Neq => Some(Expr::bool(a != b)),
        BinOp::Lt => Some(Expr::bool(a < b)),
        BinOp::Leq => Some(Expr::bool(a <= b)),
        BinOp::Gt => Some(Expr::bool(a > b)),
        BinOp::Geq => Some(Expr::bool(a >= b)),
        _ => None,
    }
}
