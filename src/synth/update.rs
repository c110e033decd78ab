//! The aggregate-update translator.
//!
//! A membership or subset constraint against a stored collection is an
//! update idiom, not a condition: `v : f` asks that `v` end up in `f`.
//! Each idiom is rewritten into an assignment of the recomputed whole
//! value, so emitters only ever see plain assignments.

use crate::common::expr::{BinOp, Expr, ExprNode, UnaryOp};
use crate::common::model::Model;
use crate::common::stmt::Statement;
use crate::common::types::{CollectionKind, Type};
use crate::synth::names::NameGenerator;
use std::sync::Arc;

/// The mutation idiom encoded by one terminal constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UpdateKind {
    /// `v : f`, the element joins the collection.
    Add,
    /// `v /: f`, the element leaves the collection.
    Remove,
    /// `s <: f`, the operand set is folded in.
    Union,
    /// `s /<: f`, the operand set is taken out.
    Subtract,
}

/// Translate a terminal constraint into an assignment when it matches one
/// of the update idioms, or `None` when it does not.
pub fn translate_update(
    expr: &Expr,
    model: &Model,
    owner: Option<&str>,
    is_static: bool,
    names: &mut NameGenerator,
) -> Option<Statement> {
    let (kind, operand, target) = match &expr.node {
        ExprNode::Binary { op, lhs, rhs } => {
            let kind = match op {
                BinOp::In => UpdateKind::Add,
                BinOp::NotIn => UpdateKind::Remove,
                BinOp::Subset => UpdateKind::Union,
                BinOp::NotSubset => UpdateKind::Subtract,
                _ => return None,
            };
            (kind, &**lhs, &**rhs)
        }
        // `f->isEmpty()` as a postcondition empties the collection.
        ExprNode::Unary {
            op: UnaryOp::IsEmpty,
            operand,
        } => {
            let target = writable_target(operand, model, owner)?;
            let empty = Expr::set_literal(collection_kind(target, model, owner), Vec::new());
            return Some(assign_rewrite(target, |_| empty.clone(), model, owner, is_static));
        }
        _ => return None,
    };

    let target = writable_target(target, model, owner)?;

    // A reference navigated through a collection of owners lifts the
    // single-object rewrite to a loop over every owner.
    if let ExprNode::Feature {
        object: Some(objs), ..
    } = &target.node
        && objs.ty.as_ref().is_some_and(Type::is_collection)
    {
        return Some(lift_over_owners(kind, operand, target, objs, model, names));
    }

    Some(rewrite(kind, operand, target, model, owner, is_static))
}

/// The constraint's right-hand side must name a stored feature for the
/// rewrite to have somewhere to write.
fn writable_target<'a>(target: &'a Expr, model: &Model, owner: Option<&str>) -> Option<&'a Expr> {
    match &target.node {
        ExprNode::Feature { name, at_pre, .. } if !at_pre => {
            let known = owner.is_some_and(|e| model.attribute_of(e, name).is_some());
            (known || target.ty.as_ref().is_some_and(Type::is_collection)).then_some(target)
        }
        ExprNode::Var(name) => {
            let known = owner.is_some_and(|e| model.attribute_of(e, name).is_some());
            known.then_some(target)
        }
        _ => None,
    }
}

fn collection_kind(target: &Expr, model: &Model, owner: Option<&str>) -> CollectionKind {
    if let Some(kind) = target.ty.as_ref().and_then(Type::collection_kind) {
        return kind;
    }
    let name = match &target.node {
        ExprNode::Feature { name, .. } | ExprNode::Var(name) => name,
        _ => return CollectionKind::Set,
    };
    owner
        .and_then(|e| model.attribute_of(e, name))
        .and_then(|a| a.ty.collection_kind())
        .unwrap_or(CollectionKind::Set)
}

fn rewrite(
    kind: UpdateKind,
    operand: &Expr,
    target: &Expr,
    model: &Model,
    owner: Option<&str>,
    is_static: bool,
) -> Statement {
    let collection = collection_kind(target, model, owner);
    assign_rewrite(
        target,
        |current| recombined(kind, collection, current, operand),
        model,
        owner,
        is_static,
    )
}

/// The new whole value of the collection, per the idiom table. Ordered
/// collections append instead of unioning.
fn recombined(
    kind: UpdateKind,
    collection: CollectionKind,
    current: &Expr,
    operand: &Expr,
) -> Expr {
    match kind {
        UpdateKind::Add => {
            let singleton = Expr::set_literal(collection, vec![operand.clone()]);
            match collection {
                CollectionKind::Set => Expr::binary(BinOp::Union, current, &singleton),
                CollectionKind::Sequence => Expr::binary(BinOp::Concat, current, &singleton),
            }
        }
        UpdateKind::Remove => {
            let singleton = Expr::set_literal(collection, vec![operand.clone()]);
            Expr::binary(BinOp::Sub, current, &singleton)
        }
        UpdateKind::Union => match collection {
            CollectionKind::Set => Expr::binary(BinOp::Union, current, operand),
            CollectionKind::Sequence => Expr::binary(BinOp::Concat, current, operand),
        },
        UpdateKind::Subtract => Expr::binary(BinOp::Sub, current, operand),
    }
}

/// Build `target := f(target)` with the target qualified for the emitter:
/// a bare attribute of the owner reads and writes through `self`.
fn assign_rewrite(
    target: &Expr,
    value_of: impl Fn(&Expr) -> Expr,
    model: &Model,
    owner: Option<&str>,
    is_static: bool,
) -> Statement {
    let qualified = qualify_target(target, model, owner, is_static);
    let value = value_of(&qualified);
    Statement::assign(qualified, value)
}

pub(crate) fn qualify_target(
    target: &Expr,
    model: &Model,
    owner: Option<&str>,
    is_static: bool,
) -> Expr {
    let name = match &target.node {
        ExprNode::Feature { object: None, name, .. } | ExprNode::Var(name) => name.clone(),
        _ => return target.clone(),
    };
    let owned = owner.is_some_and(|e| model.attribute_of(e, &name).is_some());
    if owned && !is_static {
        Expr::feature(Some(&Expr::var("self")), name).with_annotations(
            target.ty.clone(),
            target.element_ty.clone(),
            target.kind,
        )
    } else {
        target.clone()
    }
}

/// Partition-and-recombine, realized as a loop: every owner in the
/// navigated collection gets the member-wise rewrite of its own feature.
fn lift_over_owners(
    kind: UpdateKind,
    operand: &Expr,
    target: &Expr,
    owners: &Arc<Expr>,
    model: &Model,
    names: &mut NameGenerator,
) -> Statement {
    let ExprNode::Feature { name, .. } = &target.node else {
        // writable_target only admits features here
        return Statement::Skip;
    };
    let each = names.fresh("owner");
    // The member-wise target carries the attribute's own type, not the
    // lifted navigation type of `objs.f`.
    let element = owners
        .element_ty
        .clone()
        .or_else(|| owners.ty.as_ref().and_then(|t| t.element().cloned()));
    let attr_ty = match &element {
        Some(Type::Entity(entity)) => model.attribute_of(entity, name).map(|a| a.ty.clone()),
        _ => None,
    };
    let member_target = Expr::feature(Some(&Expr::var(&each)), name.clone()).with_annotations(
        attr_ty.clone(),
        attr_ty.as_ref().and_then(|t| t.element().cloned()),
        target.kind,
    );
    let collection = attr_ty
        .as_ref()
        .and_then(Type::collection_kind)
        .unwrap_or(CollectionKind::Set);
    let body = Statement::assign(
        member_target.clone(),
        recombined(kind, collection, &member_target, operand),
    );
    Statement::Loop {
        var: each,
        range: (**owners).clone(),
        body: Box::new(body),
    }
}
