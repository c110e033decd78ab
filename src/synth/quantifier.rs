//! Quantifier extraction from implication guards.
//!
//! A guard such as `x : Person & x.age > 18` binds `x` by membership; the
//! binding becomes a loop, any `x = e` equality over already-available
//! names becomes a `let`, and whatever is left stays a conditional inside
//! the loop body.

use crate::common::expr::{BinOp, Expr, ExprNode};
use std::collections::BTreeSet;

/// The decomposition of a guard into loop bindings, let-style equalities
/// and a residual condition.
#[derive(Clone, Debug)]
pub struct GuardSplit {
    /// Range bindings, in declaration order: the first entry is the
    /// outermost loop.
    pub bindings: Vec<(String, Expr)>,
    /// Local definitions usable inside the innermost loop body.
    pub lets: Vec<(String, Expr)>,
    /// What remains of the guard once bindings and lets are removed.
    pub residue: Expr,
    /// Names introduced by the bindings and lets, in order.
    pub introduced: Vec<String>,
}

impl GuardSplit {
    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// Split a guard against a notion of already-known names. A membership
/// conjunct `x : range` over an unknown `x` whose range is fully known
/// becomes a binding; an equality `x = e` in the same situation becomes a
/// let. Conjuncts are re-scanned until a pass makes no progress, so
/// bindings may depend on earlier ones regardless of textual order.
pub fn split_guard(guard: &Expr, known: &dyn Fn(&str) -> bool) -> GuardSplit {
    let mut pending: Vec<Expr> = guard.conjuncts().into_iter().cloned().collect();
    let mut bindings = Vec::new();
    let mut lets = Vec::new();
    let mut introduced_set = BTreeSet::new();
    let mut introduced = Vec::new();

    let mut progress = true;
    while progress {
        progress = false;
        let mut keep = Vec::new();
        for conjunct in pending {
            let decision = match binding_shape(&conjunct) {
                Some((shape, name, expr))
                    if !known(name)
                        && !introduced_set.contains(name)
                        && expr
                            .free_vars()
                            .iter()
                            .all(|v| known(v) || introduced_set.contains(v)) =>
                {
                    Some((shape, name.to_string(), expr.clone()))
                }
                _ => None,
            };
            match decision {
                Some((shape, name, expr)) => {
                    match shape {
                        BindingShape::Range => bindings.push((name.clone(), expr)),
                        BindingShape::Definition => lets.push((name.clone(), expr)),
                    }
                    introduced_set.insert(name.clone());
                    introduced.push(name);
                    progress = true;
                }
                None => keep.push(conjunct),
            }
        }
        pending = keep;
    }

    GuardSplit {
        bindings,
        lets,
        residue: Expr::conjoin(&pending),
        introduced,
    }
}

enum BindingShape {
    Range,
    Definition,
}

fn binding_shape(conjunct: &Expr) -> Option<(BindingShape, &str, &Expr)> {
    let ExprNode::Binary { op, lhs, rhs } = &conjunct.node else {
        return None;
    };
    let ExprNode::Var(name) = &lhs.node else {
        return None;
    };
    match op {
        BinOp::In => Some((BindingShape::Range, name, rhs)),
        BinOp::Eq => Some((BindingShape::Definition, name, rhs)),
        _ => None,
    }
}
