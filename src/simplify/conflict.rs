// Static contradiction detection between comparison atoms.
//
// The table is conservative: an omitted operator pair loses a
// simplification opportunity, never correctness.

use crate::common::expr::{BinOp, Expr, ExprNode, Literal};

/// Operator pairs that are mutually exclusive over the same operands.
/// The relation is symmetric; only one orientation is listed here.
const OPPOSITES: &[(BinOp, BinOp)] = &[
    (BinOp::Eq, BinOp::Neq),
    (BinOp::Lt, BinOp::Geq),
    (BinOp::Gt, BinOp::Leq),
    (BinOp::Lt, BinOp::Gt),
    (BinOp::Eq, BinOp::Lt),
    (BinOp::Eq, BinOp::Gt),
    (BinOp::In, BinOp::NotIn),
    (BinOp::Subset, BinOp::NotSubset),
];

fn opposite_ops(a: BinOp, b: BinOp) -> bool {
    OPPOSITES
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// True when `a` and `b` can never hold together: the same left-hand term
/// compared under mutually exclusive operators, or under numeric bounds with
/// an empty intersection (`x = 1` against `x > 5`).
pub fn conflicts(a: &Expr, b: &Expr) -> bool {
    let (ExprNode::Binary {
        op: op_a,
        lhs: lhs_a,
        rhs: rhs_a,
    }, ExprNode::Binary {
        op: op_b,
        lhs: lhs_b,
        rhs: rhs_b,
    }) = (&a.node, &b.node)
    else {
        return false;
    };

    if !op_a.is_comparison() || !op_b.is_comparison() || lhs_a != lhs_b {
        return false;
    }

    if rhs_a == rhs_b {
        return opposite_ops(*op_a, *op_b);
    }

    // Different right-hand sides: decide only for literal bounds.
    match (&rhs_a.node, &rhs_b.node) {
        (ExprNode::Literal(Literal::Int(n)), ExprNode::Literal(Literal::Int(m))) => {
            int_bounds_empty(*op_a, *n, *op_b, *m)
        }
        (ExprNode::Literal(la), ExprNode::Literal(lb)) => {
            // Equality against two distinct literals is unsatisfiable.
            *op_a == BinOp::Eq && *op_b == BinOp::Eq && la != lb
        }
        _ => false,
    }
}

/// Interval for `x op n` over the integers: `(lower, upper)`, `None` for an
/// unbounded side. `Neq` carries no interval information, and a bound that
/// would overflow `i64` yields no interval either (the conflict is skipped).
fn int_interval(op: BinOp, n: i64) -> Option<(Option<i64>, Option<i64>)> {
    match op {
        BinOp::Eq => Some((Some(n), Some(n))),
        BinOp::Lt => Some((None, Some(n.checked_sub(1)?))),
        BinOp::Leq => Some((None, Some(n))),
        BinOp::Gt => Some((Some(n.checked_add(1)?), None)),
        BinOp::Geq => Some((Some(n), None)),
        _ => None,
    }
}

fn int_bounds_empty(op_a: BinOp, n: i64, op_b: BinOp, m: i64) -> bool {
    let (Some((lo_a, hi_a)), Some((lo_b, hi_b))) = (int_interval(op_a, n), int_interval(op_b, m))
    else {
        return false;
    };
    let lower = match (lo_a, lo_b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    let upper = match (hi_a, hi_b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    matches!((lower, upper), (Some(lo), Some(hi)) if lo > hi)
}
