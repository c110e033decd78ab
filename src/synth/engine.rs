//! The postcondition-to-statement translator.
//!
//! A postcondition is processed top-down by shape: implication conjuncts
//! become if/else-if chains, guards binding fresh variables become loops,
//! equalities become assignments or returns, membership constraints against
//! stored collections go through the aggregate-update translator. A shape
//! with no rule degrades to a placeholder statement plus a diagnostic; the
//! operation as a whole always yields a statement tree.

use crate::checker::{Diagnostic, Diagnostics, Environment, check};
use crate::common::expr::{BinOp, Expr, ExprNode, Literal, RefKind};
use crate::common::model::{BehaviouralFeature, Model};
use crate::common::stmt::Statement;
use crate::common::types::Type;
use crate::simplify::{simplify, simplify_and};
use crate::synth::frame::FrameCache;
use crate::synth::names::NameGenerator;
use crate::synth::quantifier::split_guard;
use crate::synth::update::{qualify_target, translate_update};
use std::collections::{BTreeMap, BTreeSet};

/// Synthesize the body of one operation from its pre/postcondition.
///
/// Checking, simplification and synthesis diagnostics accumulate in
/// `diags`; none of them aborts the call.
pub fn synthesize_operation(
    op: &BehaviouralFeature,
    model: &Model,
    frames: &mut FrameCache,
    diags: &mut Diagnostics,
) -> Statement {
    let result_ty = op.result_type.clone();
    if op.is_query && result_ty.is_none() {
        diags.push(Diagnostic::MissingResultType {
            operation: op.key(),
        });
    }

    let Some(post) = &op.postcondition else {
        return Statement::Skip;
    };

    let env = seed_specification_locals(post, model, operation_env(op));
    let (post, _) = check(post, model, &env, diags);
    let pre = op
        .precondition
        .as_ref()
        .map(|p| simplify(&check(p, model, &env, diags).0));
    let post = simplify(&post);

    // Computes and caches the frame; an empty frame on an update operation
    // is reported from inside.
    frames.frame_of(op, model, diags);

    let mut names = NameGenerator::new();
    for v in post.free_vars() {
        names.reserve(v);
    }
    if let Some(p) = &pre {
        for v in p.free_vars() {
            names.reserve(v);
        }
    }
    for param in &op.parameters {
        names.reserve(&param.name);
    }
    names.reserve("self");
    names.reserve("result");

    // Before-state reads become snapshot locals, taken before any write.
    let (snapshots, post) = snapshot_pre_reads(&post, op, model, &mut names);

    let mut synthesizer = Synthesizer {
        model,
        op,
        names,
        locals: snapshots
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect(),
        diags,
    };
    let mut body = synthesizer.synth(&post, op.is_query);
    drop(synthesizer);

    if op.is_query {
        body = guard_query(body, &post, pre.as_ref(), op, result_ty.as_ref(), diags);
    }

    let mut parts: Vec<Statement> = snapshots
        .into_iter()
        .map(|(name, ty, init)| Statement::VarDecl {
            name,
            ty,
            init: Some(init),
        })
        .collect();
    parts.push(body);
    Statement::seq(parts)
}

/// The checking environment of an operation: its owner as context, `self`
/// for instance operations, every parameter, and `result` for operations
/// with a declared result.
fn operation_env(op: &BehaviouralFeature) -> Environment {
    let mut env = Environment::new();
    if let Some(owner) = &op.owner {
        env = env.with_context(owner.clone());
        if !op.is_static {
            env = env.with_var("self", Type::entity(owner.clone()));
        }
    }
    for param in &op.parameters {
        env = env.with_var(param.name.clone(), param.ty.clone());
    }
    if let Some(result_ty) = &op.result_type {
        env = env.with_var("result", result_ty.clone());
    }
    env
}

/// Extend the environment with names the specification itself introduces:
/// guard bindings (`x : range`), guard definitions (`x = e`) and
/// assignment targets that resolve to nothing. Seeding them keeps the
/// checker from reporting them unresolved; the synthesizer still decides
/// how each one is realized.
fn seed_specification_locals(post: &Expr, model: &Model, mut env: Environment) -> Environment {
    let mut sites: Vec<(String, Expr, bool)> = Vec::new();
    collect_binding_sites(post, &mut sites);

    // Re-scan until no site resolves, so dependent ranges bind in any order.
    let mut progress = true;
    while progress {
        progress = false;
        for (name, source, is_range) in &sites {
            if env.is_bound(name) {
                continue;
            }
            let mut scratch = Diagnostics::new();
            let (_, resolvable) = check(&Expr::var(name.clone()), model, &env, &mut scratch);
            if resolvable {
                continue;
            }
            let mut scratch = Diagnostics::new();
            let (checked, ok) = check(source, model, &env, &mut scratch);
            if !ok {
                continue;
            }
            let ty = if *is_range {
                checked
                    .element_ty
                    .clone()
                    .or_else(|| checked.ty.as_ref().and_then(|t| t.element().cloned()))
            } else {
                checked.ty.clone()
            };
            env = env.with_var(name.clone(), ty.unwrap_or_else(Type::integer));
            progress = true;
        }
    }
    env
}

/// Name-introduction sites: `(name, source, source-is-a-range)`.
fn collect_binding_sites(expr: &Expr, out: &mut Vec<(String, Expr, bool)>) {
    match &expr.node {
        ExprNode::Binary {
            op: BinOp::And | BinOp::Or,
            lhs,
            rhs,
        } => {
            collect_binding_sites(lhs, out);
            collect_binding_sites(rhs, out);
        }
        ExprNode::Binary {
            op: BinOp::Implies,
            lhs,
            rhs,
        } => {
            guard_sites(lhs, out);
            collect_binding_sites(rhs, out);
        }
        ExprNode::Binary {
            op: BinOp::Eq,
            lhs,
            rhs,
        } => {
            if let ExprNode::Var(name) = &lhs.node {
                out.push((name.clone(), (**rhs).clone(), false));
            }
        }
        _ => {}
    }
}

fn guard_sites(guard: &Expr, out: &mut Vec<(String, Expr, bool)>) {
    for conjunct in guard.conjuncts() {
        if let ExprNode::Binary { op, lhs, rhs } = &conjunct.node
            && let ExprNode::Var(name) = &lhs.node
        {
            match op {
                BinOp::In => out.push((name.clone(), (**rhs).clone(), true)),
                BinOp::Eq => out.push((name.clone(), (**rhs).clone(), false)),
                _ => {}
            }
        }
    }
}

/// Replace `f@pre` reads of the owner's own attributes with snapshot
/// locals, returning the declarations (name, type, initializer) and the
/// rewritten postcondition.
fn snapshot_pre_reads(
    post: &Expr,
    op: &BehaviouralFeature,
    model: &Model,
    names: &mut NameGenerator,
) -> (Vec<(String, Type, Expr)>, Expr) {
    let owner = op.owner.as_deref();
    let mut reads = BTreeSet::new();
    collect_self_pre_reads(post, &mut reads);

    let mut decls = Vec::new();
    let mut map = BTreeMap::new();
    for attr_name in reads {
        let attr = owner.and_then(|e| model.attribute_of(e, &attr_name));
        let ty = attr.map(|a| a.ty.clone()).unwrap_or_else(Type::integer);
        let snapshot = names.fresh(&format!("pre_{}", attr_name));
        let current = qualify_target(
            &Expr::feature(None, attr_name.clone()).with_annotations(
                Some(ty.clone()),
                ty.element().cloned(),
                RefKind::Attribute,
            ),
            model,
            owner,
            op.is_static,
        );
        decls.push((snapshot.clone(), ty.clone(), current));
        map.insert(attr_name, (snapshot, ty));
    }
    let rewritten = replace_pre_reads(post, &map);
    (decls, rewritten)
}

/// Before-state reads of the operation's own attributes: `f@pre` with no
/// object or with `self` as the object. Navigations through other objects
/// are left alone.
fn collect_self_pre_reads(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.node {
        ExprNode::Feature {
            object,
            name,
            at_pre,
        } => {
            if *at_pre && object_is_self(object.as_deref()) {
                out.insert(name.clone());
            }
            if let Some(obj) = object {
                collect_self_pre_reads(obj, out);
            }
        }
        ExprNode::Unary { operand, .. } => collect_self_pre_reads(operand, out),
        ExprNode::Binary { lhs, rhs, .. } => {
            collect_self_pre_reads(lhs, out);
            collect_self_pre_reads(rhs, out);
        }
        ExprNode::SetLiteral { elements, .. } => {
            for e in elements {
                collect_self_pre_reads(e, out);
            }
        }
        ExprNode::Quantified { range, body, .. } => {
            collect_self_pre_reads(range, out);
            collect_self_pre_reads(body, out);
        }
        ExprNode::Literal(_) | ExprNode::Var(_) => {}
    }
}

fn object_is_self(object: Option<&Expr>) -> bool {
    match object {
        None => true,
        Some(obj) => matches!(&obj.node, ExprNode::Var(name) if name == "self"),
    }
}

fn replace_pre_reads(expr: &Expr, map: &BTreeMap<String, (String, Type)>) -> Expr {
    use std::sync::Arc;
    match &expr.node {
        ExprNode::Feature {
            object,
            name,
            at_pre: true,
        } if object_is_self(object.as_deref()) && map.contains_key(name) => {
            let (snapshot, ty) = &map[name];
            Expr::var(snapshot.clone()).with_annotations(
                Some(ty.clone()),
                ty.element().cloned(),
                RefKind::Variable,
            )
        }
        ExprNode::Feature {
            object,
            name,
            at_pre,
        } => Expr {
            node: ExprNode::Feature {
                object: object
                    .as_ref()
                    .map(|o| Arc::new(replace_pre_reads(o, map))),
                name: name.clone(),
                at_pre: *at_pre,
            },
            ..expr.clone()
        },
        ExprNode::Unary { op, operand } => Expr {
            node: ExprNode::Unary {
                op: *op,
                operand: Arc::new(replace_pre_reads(operand, map)),
            },
            ..expr.clone()
        },
        ExprNode::Binary { op, lhs, rhs } => Expr {
            node: ExprNode::Binary {
                op: *op,
                lhs: Arc::new(replace_pre_reads(lhs, map)),
                rhs: Arc::new(replace_pre_reads(rhs, map)),
            },
            ..expr.clone()
        },
        ExprNode::SetLiteral { kind, elements } => Expr {
            node: ExprNode::SetLiteral {
                kind: *kind,
                elements: elements
                    .iter()
                    .map(|e| Arc::new(replace_pre_reads(e, map)))
                    .collect(),
            },
            ..expr.clone()
        },
        ExprNode::Quantified {
            kind,
            var,
            range,
            body,
        } => Expr {
            node: ExprNode::Quantified {
                kind: *kind,
                var: var.clone(),
                range: Arc::new(replace_pre_reads(range, map)),
                body: Arc::new(replace_pre_reads(body, map)),
            },
            ..expr.clone()
        },
        ExprNode::Literal(_) | ExprNode::Var(_) => expr.clone(),
    }
}

/// Wrap a query body in its applicability guard: the stated precondition
/// conjoined with the definedness conditions of the postcondition. A
/// violated guard short-circuits with a default result instead of failing.
fn guard_query(
    body: Statement,
    post: &Expr,
    pre: Option<&Expr>,
    op: &BehaviouralFeature,
    result_ty: Option<&Type>,
    diags: &mut Diagnostics,
) -> Statement {
    let def = definedness_conditions(post);
    let def_expr = Expr::conjoin(&def);
    let pre_expr = pre.cloned().unwrap_or_else(|| Expr::bool(true));
    let guard = simplify_and(&pre_expr, &def_expr);
    if guard.is_true() {
        return body;
    }

    if !def.is_empty() && !def.iter().all(|d| pre_expr.conjuncts().contains(&d)) {
        diags.push(Diagnostic::NonTotalPrecondition {
            operation: op.key(),
        });
    }

    let default = Expr::default_for(result_ty.unwrap_or(&Type::integer()));
    Statement::if_then_else(guard, body, Statement::Return(default))
}

/// Definedness side-conditions of every partial operation in the
/// expression. Division is the language's only partial operator.
fn definedness_conditions(expr: &Expr) -> Vec<Expr> {
    let mut out = Vec::new();
    collect_definedness(expr, &mut out);
    out
}

fn collect_definedness(expr: &Expr, out: &mut Vec<Expr>) {
    match &expr.node {
        ExprNode::Binary { op, lhs, rhs } => {
            collect_definedness(lhs, out);
            collect_definedness(rhs, out);
            if *op == BinOp::Div && !matches!(&rhs.node, ExprNode::Literal(Literal::Int(n)) if *n != 0)
            {
                let cond = Expr::binary(BinOp::Neq, rhs, &Expr::int(0));
                if !out.contains(&cond) {
                    out.push(cond);
                }
            }
        }
        ExprNode::Unary { operand, .. } => collect_definedness(operand, out),
        ExprNode::Feature {
            object: Some(obj), ..
        } => collect_definedness(obj, out),
        ExprNode::SetLiteral { elements, .. } => {
            for e in elements {
                collect_definedness(e, out);
            }
        }
        ExprNode::Quantified { range, body, .. } => {
            collect_definedness(range, out);
            collect_definedness(body, out);
        }
        _ => {}
    }
}

struct Synthesizer<'a> {
    model: &'a Model,
    op: &'a BehaviouralFeature,
    names: NameGenerator,
    /// Locals in scope: snapshots, auto-declared variables, loop bindings.
    locals: BTreeSet<String>,
    diags: &'a mut Diagnostics,
}

impl Synthesizer<'_> {
    /// Synthesize a (possibly compound) constraint. `tail` is true at the
    /// unguarded top level of a query, where `result = e` may become a
    /// plain return.
    fn synth(&mut self, expr: &Expr, tail: bool) -> Statement {
        let conjuncts: Vec<Expr> = expr.conjuncts().into_iter().cloned().collect();
        if conjuncts.len() == 1 {
            return self.synth_single(&conjuncts[0], tail);
        }

        // Successive implication conjuncts fold into one if/else-if chain.
        let mut parts = Vec::new();
        let mut chain: Vec<(Expr, Expr)> = Vec::new();
        for conjunct in conjuncts {
            match conjunct.as_implication() {
                Some((guard, branch)) if self.guard_resolved(guard) => {
                    chain.push((guard.clone(), branch.clone()));
                }
                _ => {
                    self.flush_chain(&mut chain, &mut parts);
                    let stmt = self.synth_single(&conjunct, false);
                    parts.push(stmt);
                }
            }
        }
        self.flush_chain(&mut chain, &mut parts);
        Statement::seq(parts)
    }

    fn flush_chain(&mut self, chain: &mut Vec<(Expr, Expr)>, parts: &mut Vec<Statement>) {
        if chain.is_empty() {
            return;
        }
        let mut folded: Option<Statement> = None;
        for (guard, branch) in chain.drain(..).rev() {
            let then_branch = self.synth(&branch, false);
            folded = Some(match folded {
                None => Statement::if_then(guard, then_branch),
                Some(rest) => Statement::if_then_else(guard, then_branch, rest),
            });
        }
        parts.push(folded.expect("chain checked non-empty"));
    }

    fn synth_single(&mut self, expr: &Expr, tail: bool) -> Statement {
        if expr.is_true() {
            return Statement::Skip;
        }

        if let Some((guard, body)) = expr.as_implication() {
            let (guard, body) = (guard.clone(), body.clone());
            return self.synth_implication(&guard, &body);
        }

        // Underspecified choice: the first applicable case wins.
        let disjuncts = expr.disjuncts();
        if disjuncts.len() > 1 {
            let first = disjuncts[0].clone();
            return self.synth(&first, tail);
        }

        if let ExprNode::Binary {
            op: BinOp::Eq,
            lhs,
            rhs,
        } = &expr.node
        {
            let (lhs, rhs) = ((**lhs).clone(), (**rhs).clone());
            if let Some(stmt) = self.synth_equality(&lhs, &rhs, tail) {
                return stmt;
            }
        }

        if let Some(stmt) = translate_update(
            expr,
            self.model,
            self.op.owner.as_deref(),
            self.op.is_static,
            &mut self.names,
        ) {
            return stmt;
        }

        self.gap(expr)
    }

    /// An implication synthesizes to a conditional; a guard that binds
    /// fresh variables synthesizes to loops around it instead.
    fn synth_implication(&mut self, guard: &Expr, body: &Expr) -> Statement {
        let split = {
            let known = |name: &str| self.known_name(name);
            split_guard(guard, &known)
        };

        if !split.has_bindings() && split.lets.is_empty() {
            let then_branch = self.synth(body, false);
            return Statement::if_then(guard.clone(), then_branch);
        }

        for name in &split.introduced {
            self.locals.insert(name.clone());
            self.names.reserve(name.clone());
        }

        let mut stmt = self.synth(body, false);
        if !split.residue.is_true() {
            stmt = Statement::if_then(split.residue.clone(), stmt);
        }
        for (name, value) in split.lets.iter().rev() {
            let decl = Statement::VarDecl {
                name: name.clone(),
                ty: value.ty.clone().unwrap_or_else(Type::integer),
                init: Some(value.clone()),
            };
            stmt = Statement::seq(vec![decl, stmt]);
        }
        // Outermost binding first in declaration order.
        for (var, range) in split.bindings.iter().rev() {
            stmt = Statement::Loop {
                var: var.clone(),
                range: range.clone(),
                body: Box::new(stmt),
            };
        }

        for name in &split.introduced {
            self.locals.remove(name);
        }
        stmt
    }

    fn synth_equality(&mut self, lhs: &Expr, rhs: &Expr, tail: bool) -> Option<Statement> {
        match &lhs.node {
            ExprNode::Var(name) => {
                if name == "result" && self.op.is_query && tail {
                    return Some(Statement::Return(rhs.clone()));
                }
                if self.is_bound_variable(name) {
                    return Some(Statement::assign(lhs.clone(), rhs.clone()));
                }
                if self.is_owner_attribute(name) {
                    let target = qualify_target(
                        lhs,
                        self.model,
                        self.op.owner.as_deref(),
                        self.op.is_static,
                    );
                    return Some(Statement::assign(target, rhs.clone()));
                }
                // Assignment to an unbound name declares it as a local;
                // flagged so callers can reject it.
                self.diags.push(Diagnostic::ImplicitLocal { name: name.clone() });
                self.locals.insert(name.clone());
                self.names.reserve(name.clone());
                Some(Statement::VarDecl {
                    name: name.clone(),
                    ty: rhs.ty.clone().unwrap_or_else(Type::integer),
                    init: Some(rhs.clone()),
                })
            }
            ExprNode::Feature { at_pre: false, .. } => {
                let target = qualify_target(
                    lhs,
                    self.model,
                    self.op.owner.as_deref(),
                    self.op.is_static,
                );
                Some(Statement::assign(target, rhs.clone()))
            }
            _ => None,
        }
    }

    fn gap(&mut self, expr: &Expr) -> Statement {
        self.diags.push(Diagnostic::SynthesisGap {
            constraint: expr.to_string(),
        });
        Statement::Unimplemented(expr.clone())
    }

    fn guard_resolved(&self, guard: &Expr) -> bool {
        guard.free_vars().iter().all(|v| self.known_name(v))
    }

    fn is_bound_variable(&self, name: &str) -> bool {
        (name == "self" && !self.op.is_static && self.op.owner.is_some())
            || (name == "result" && self.op.result_type.is_some())
            || self.op.parameters.iter().any(|p| p.name == name)
            || self.locals.contains(name)
    }

    fn is_owner_attribute(&self, name: &str) -> bool {
        self.op
            .owner
            .as_deref()
            .is_some_and(|e| self.model.attribute_of(e, name).is_some())
    }

    fn known_name(&self, name: &str) -> bool {
        self.is_bound_variable(name)
            || self.is_owner_attribute(name)
            || self
                .op
                .owner
                .as_deref()
                .is_some_and(|e| self.model.operation_of(e, name).is_some())
            || self.model.constant(name).is_some()
            || self.model.enumeration_literal(name).is_some()
            || self.model.entity(name).is_some()
    }
}
