// Constraint type checking and reference resolution.
//
// The checker annotates every node with its type, element type and
// reference kind, returning a fresh tree. Unresolved references are
// reported and checking continues: downstream consistency analysis still
// runs over the well-typed portion.

use crate::checker::diagnostics::{Diagnostic, Diagnostics};
use crate::checker::env::Environment;
use crate::common::expr::{BinOp, Expr, ExprNode, Literal, QuantifierKind, RefKind, UnaryOp};
use crate::common::model::Model;
use crate::common::types::{CollectionKind, Type};
use std::sync::Arc;

/// Check an expression, returning the annotated tree and whether no new
/// errors were reported.
///
/// Checking is idempotent: re-running it on an already-checked, unchanged
/// tree produces identical annotations.
pub fn check(
    expr: &Expr,
    model: &Model,
    env: &Environment,
    diags: &mut Diagnostics,
) -> (Expr, bool) {
    let errors_before = diags.error_count();
    let checked = check_expr(expr, model, env, diags);
    (checked, diags.error_count() == errors_before)
}

fn check_expr(expr: &Expr, model: &Model, env: &Environment, diags: &mut Diagnostics) -> Expr {
    match &expr.node {
        ExprNode::Literal(lit) => {
            let ty = match lit {
                Literal::Int(_) => Type::integer(),
                Literal::Real(_) => Type::real(),
                Literal::Bool(_) => Type::boolean(),
                Literal::Str(_) => Type::string(),
            };
            Expr::new(expr.node.clone()).with_annotations(Some(ty), None, RefKind::Value)
        }

        ExprNode::Var(name) => {
            let (ty, element_ty, kind) = resolve_name(name, model, env, diags, true);
            Expr::new(expr.node.clone()).with_annotations(ty, element_ty, kind)
        }

        ExprNode::Feature {
            object,
            name,
            at_pre,
        } => check_feature(expr, object.as_deref(), name, *at_pre, model, env, diags),

        ExprNode::Unary { op, operand } => {
            let operand = check_expr(operand, model, env, diags);
            check_unary(*op, operand, model, diags)
        }

        ExprNode::Binary { op, lhs, rhs } => {
            let lhs = check_expr(lhs, model, env, diags);
            let rhs = check_expr(rhs, model, env, diags);
            check_binary(*op, lhs, rhs, model, diags)
        }

        ExprNode::SetLiteral { kind, elements } => {
            let elements: Vec<Expr> = elements
                .iter()
                .map(|e| check_expr(e, model, env, diags))
                .collect();
            let element_ty = elements.iter().find_map(|e| e.ty.clone());
            if let Some(expected) = &element_ty {
                for e in &elements {
                    if let Some(found) = &e.ty
                        && found != expected
                        && !model.is_subtype(found, expected)
                        && !model.is_subtype(expected, found)
                    {
                        diags.push(Diagnostic::TypeMismatch {
                            expected: expected.to_string(),
                            found: Some(found.clone()),
                            at: e.to_string(),
                        });
                    }
                }
            }
            let ty = element_ty.clone().map(|elem| Type::Collection {
                kind: *kind,
                element: Arc::new(elem),
            });
            Expr::new(ExprNode::SetLiteral {
                kind: *kind,
                elements: elements.into_iter().map(Arc::new).collect(),
            })
            .with_annotations(ty, element_ty, RefKind::Value)
        }

        ExprNode::Quantified {
            kind,
            var,
            range,
            body,
        } => {
            let range = check_expr(range, model, env, diags);
            let element_ty = range
                .element_ty
                .clone()
                .or_else(|| range.ty.as_ref().and_then(|t| t.element().cloned()));
            if let Some(ty) = &range.ty
                && !ty.is_collection()
            {
                diags.push(Diagnostic::TypeMismatch {
                    expected: "a collection".to_string(),
                    found: Some(ty.clone()),
                    at: range.to_string(),
                });
            }
            // The bound variable is in scope for the body only.
            let body_env = match &element_ty {
                Some(elem) => env.with_var(var.clone(), elem.clone()),
                None => env.with_var(var.clone(), Type::integer()),
            };
            let body = check_expr(body, model, &body_env, diags);

            let (ty, element_ty) = match kind {
                QuantifierKind::ForAll | QuantifierKind::Exists => {
                    expect_boolean(&body, diags);
                    (Some(Type::boolean()), None)
                }
                QuantifierKind::Select => (range.ty.clone(), element_ty),
                QuantifierKind::Collect => {
                    let collected = body.ty.clone();
                    let kind = range
                        .ty
                        .as_ref()
                        .and_then(Type::collection_kind)
                        .unwrap_or(CollectionKind::Sequence);
                    let ty = collected.clone().map(|elem| Type::Collection {
                        kind,
                        element: Arc::new(elem),
                    });
                    (ty, collected)
                }
            };
            Expr::new(ExprNode::Quantified {
                kind: *kind,
                var: var.clone(),
                range: Arc::new(range),
                body: Arc::new(body),
            })
            .with_annotations(ty, element_ty, RefKind::Value)
        }
    }
}

/// Resolution order for a bare name: (1) bound variable, (2) feature of the
/// innermost context entity or its ancestors, outward through the context
/// stack, (3) global constant or enumeration literal, (4) entity class-id.
fn resolve_name(
    name: &str,
    model: &Model,
    env: &Environment,
    diags: &mut Diagnostics,
    include_vars: bool,
) -> (Option<Type>, Option<Type>, RefKind) {
    if include_vars && let Some(ty) = env.lookup(name) {
        return (Some(ty.clone()), ty.element().cloned(), RefKind::Variable);
    }

    for context in env.contexts() {
        if let Some(attr) = model.attribute_of(context, name) {
            let kind = if attr.is_role {
                RefKind::Role
            } else {
                RefKind::Attribute
            };
            return (Some(attr.ty.clone()), attr.element_ty.clone(), kind);
        }
        if let Some(op) = model.operation_of(context, name) {
            let kind = if op.is_query {
                RefKind::Query
            } else {
                RefKind::UpdateOp
            };
            let element_ty = op.result_type.as_ref().and_then(|t| t.element().cloned());
            return (op.result_type.clone(), element_ty, kind);
        }
    }

    if let Some(constant) = model.constant(name) {
        return (
            Some(constant.ty.clone()),
            constant.element_ty.clone(),
            RefKind::Constant,
        );
    }
    if let Some(enum_ty) = model.enumeration_literal(name) {
        return (Some(enum_ty.clone()), None, RefKind::Constant);
    }

    if model.entity(name).is_some() {
        // An entity name in expression position denotes its instance set.
        return (
            Some(Type::set_of(Type::entity(name))),
            Some(Type::entity(name)),
            RefKind::ClassId,
        );
    }

    let scope = match env.innermost_context() {
        Some(entity) => format!("context `{}`", entity),
        None => "the current scope".to_string(),
    };
    diags.push(Diagnostic::UnresolvedName {
        name: name.to_string(),
        scope,
    });
    (None, None, RefKind::Unresolved)
}

fn check_feature(
    original: &Expr,
    object: Option<&Expr>,
    name: &str,
    at_pre: bool,
    model: &Model,
    env: &Environment,
    diags: &mut Diagnostics,
) -> Expr {
    let Some(object) = object else {
        // Featureless form: resolve against the context stack only.
        let (ty, element_ty, kind) = resolve_name(name, model, env, diags, false);
        return Expr::new(original.node.clone()).with_annotations(ty, element_ty, kind);
    };

    let object = check_expr(object, model, env, diags);

    let (ty, element_ty, kind) = match &object.ty {
        Some(Type::Entity(entity)) => resolve_entity_feature(entity, name, model, diags),
        Some(Type::Collection { kind, element }) => {
            // Navigation through a collection of owners lifts the feature to
            // a collection of its values.
            if let Type::Entity(entity) = element.as_ref() {
                let (fty, _felem, fkind) = resolve_entity_feature(entity, name, model, diags);
                let lifted = fty.map(|t| match t {
                    Type::Collection { element, .. } => Type::Collection {
                        kind: *kind,
                        element,
                    },
                    scalar => Type::Collection {
                        kind: *kind,
                        element: Arc::new(scalar),
                    },
                });
                let lifted_elem = lifted.as_ref().and_then(|t| t.element().cloned());
                (lifted, lifted_elem, fkind)
            } else {
                diags.push(Diagnostic::UnresolvedName {
                    name: name.to_string(),
                    scope: format!("collection `{}`", object),
                });
                (None, None, RefKind::Unresolved)
            }
        }
        Some(other) => {
            diags.push(Diagnostic::TypeMismatch {
                expected: "an entity".to_string(),
                found: Some(other.clone()),
                at: object.to_string(),
            });
            (None, None, RefKind::Unresolved)
        }
        None => (None, None, RefKind::Unresolved),
    };

    Expr::new(ExprNode::Feature {
        object: Some(Arc::new(object)),
        name: name.to_string(),
        at_pre,
    })
    .with_annotations(ty, element_ty, kind)
}

fn resolve_entity_feature(
    entity: &str,
    name: &str,
    model: &Model,
    diags: &mut Diagnostics,
) -> (Option<Type>, Option<Type>, RefKind) {
    if let Some(attr) = model.attribute_of(entity, name) {
        let kind = if attr.is_role {
            RefKind::Role
        } else {
            RefKind::Attribute
        };
        return (Some(attr.ty.clone()), attr.element_ty.clone(), kind);
    }
    if let Some(op) = model.operation_of(entity, name) {
        let kind = if op.is_query {
            RefKind::Query
        } else {
            RefKind::UpdateOp
        };
        let element_ty = op.result_type.as_ref().and_then(|t| t.element().cloned());
        return (op.result_type.clone(), element_ty, kind);
    }
    diags.push(Diagnostic::UnresolvedName {
        name: name.to_string(),
        scope: format!("entity `{}`", entity),
    });
    (None, None, RefKind::Unresolved)
}

fn check_unary(op: UnaryOp, operand: Expr, _model: &Model, diags: &mut Diagnostics) -> Expr {
    let ty = match op {
        UnaryOp::Not => {
            expect_boolean(&operand, diags);
            Some(Type::boolean())
        }
        UnaryOp::Neg => {
            if let Some(ty) = &operand.ty
                && !ty.is_numeric()
            {
                diags.push(Diagnostic::TypeMismatch {
                    expected: "a numeric type".to_string(),
                    found: Some(ty.clone()),
                    at: operand.to_string(),
                });
            }
            operand.ty.clone().or(Some(Type::integer()))
        }
        UnaryOp::Size => {
            expect_collection(&operand, diags);
            Some(Type::integer())
        }
        UnaryOp::IsEmpty | UnaryOp::NotEmpty => {
            expect_collection(&operand, diags);
            Some(Type::boolean())
        }
    };
    Expr::new(ExprNode::Unary {
        op,
        operand: Arc::new(operand),
    })
    .with_annotations(ty, None, RefKind::Value)
}

fn check_binary(op: BinOp, lhs: Expr, rhs: Expr, model: &Model, diags: &mut Diagnostics) -> Expr {
    let (ty, element_ty) = match op {
        BinOp::And | BinOp::Or | BinOp::Implies => {
            expect_boolean(&lhs, diags);
            expect_boolean(&rhs, diags);
            (Some(Type::boolean()), None)
        }

        BinOp::Eq | BinOp::Neq => {
            if let (Some(lt), Some(rt)) = (&lhs.ty, &rhs.ty)
                && !model.is_subtype(lt, rt)
                && !model.is_subtype(rt, lt)
                && !(lt.is_numeric() && rt.is_numeric())
            {
                diags.push(Diagnostic::TypeMismatch {
                    expected: lt.to_string(),
                    found: Some(rt.clone()),
                    at: rhs.to_string(),
                });
            }
            (Some(Type::boolean()), None)
        }

        BinOp::Lt | BinOp::Leq | BinOp::Gt | BinOp::Geq => {
            for side in [&lhs, &rhs] {
                if let Some(ty) = &side.ty
                    && !ty.is_numeric()
                    && *ty != Type::string()
                {
                    diags.push(Diagnostic::TypeMismatch {
                        expected: "a numeric or String type".to_string(),
                        found: Some(ty.clone()),
                        at: side.to_string(),
                    });
                }
            }
            (Some(Type::boolean()), None)
        }

        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            for side in [&lhs, &rhs] {
                if let Some(ty) = &side.ty
                    && !ty.is_numeric()
                {
                    diags.push(Diagnostic::TypeMismatch {
                        expected: "a numeric type".to_string(),
                        found: Some(ty.clone()),
                        at: side.to_string(),
                    });
                }
            }
            let ty = match (&lhs.ty, &rhs.ty) {
                (Some(lt), Some(rt)) if lt.is_numeric() && rt.is_numeric() => {
                    Some(lt.numeric_join(rt))
                }
                _ => Some(Type::integer()),
            };
            (ty, None)
        }

        BinOp::In | BinOp::NotIn => {
            expect_collection(&rhs, diags);
            if let (Some(lt), Some(elem)) = (&lhs.ty, rhs.element_ty.as_ref())
                && !model.is_subtype(lt, elem)
                && !model.is_subtype(elem, lt)
            {
                diags.push(Diagnostic::TypeMismatch {
                    expected: elem.to_string(),
                    found: Some(lt.clone()),
                    at: lhs.to_string(),
                });
            }
            (Some(Type::boolean()), None)
        }

        BinOp::Subset | BinOp::NotSubset => {
            expect_collection(&lhs, diags);
            expect_collection(&rhs, diags);
            (Some(Type::boolean()), None)
        }

        BinOp::Union | BinOp::Intersect | BinOp::Concat => {
            expect_collection(&lhs, diags);
            expect_collection(&rhs, diags);
            let ty = lhs.ty.clone().or_else(|| rhs.ty.clone());
            let elem = lhs.element_ty.clone().or_else(|| rhs.element_ty.clone());
            (ty, elem)
        }
    };

    Expr::new(ExprNode::Binary {
        op,
        lhs: Arc::new(lhs),
        rhs: Arc::new(rhs),
    })
    .with_annotations(ty, element_ty, RefKind::Value)
}

fn expect_boolean(expr: &Expr, diags: &mut Diagnostics) {
    if let Some(ty) = &expr.ty
        && !ty.is_boolean()
    {
        diags.push(Diagnostic::TypeMismatch {
            expected: "Boolean".to_string(),
            found: Some(ty.clone()),
            at: expr.to_string(),
        });
    }
}

fn expect_collection(expr: &Expr, diags: &mut Diagnostics) {
    if let Some(ty) = &expr.ty
        && !ty.is_collection()
        && *ty != Type::string()
    {
        diags.push(Diagnostic::TypeMismatch {
            expected: "a collection".to_string(),
            found: Some(ty.clone()),
            at: expr.to_string(),
        });
    }
}
