// Reference resolution and annotation tests

use crate::checker::tests::common::sample_model;
use crate::checker::{Diagnostic, Diagnostics, Environment, check};
use crate::common::expr::{BinOp, Expr, QuantifierKind, RefKind, UnaryOp};
use crate::common::types::Type;

#[test]
fn bound_variable_shadows_attribute() {
    let model = sample_model();
    let env = Environment::new()
        .with_context("Person")
        .with_var("age", Type::real());
    let mut diags = Diagnostics::new();
    let (checked, ok) = check(&Expr::var("age"), &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.kind, RefKind::Variable);
    assert_eq!(checked.ty, Some(Type::real()));
}

#[test]
fn bare_name_resolves_to_context_attribute() {
    let model = sample_model();
    let env = Environment::new().with_context("Person");
    let mut diags = Diagnostics::new();
    let (checked, ok) = check(&Expr::var("age"), &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.kind, RefKind::Attribute);
    assert_eq!(checked.ty, Some(Type::integer()));
}

#[test]
fn inherited_attribute_resolves_through_ancestors() {
    let model = sample_model();
    let env = Environment::new().with_context("Employee");
    let mut diags = Diagnostics::new();
    let (checked, ok) = check(&Expr::var("name"), &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.kind, RefKind::Attribute);
    assert_eq!(checked.ty, Some(Type::string()));
}

#[test]
fn query_operation_reference() {
    let model = sample_model();
    let env = Environment::new().with_context("Person");
    let mut diags = Diagnostics::new();
    let (checked, _) = check(&Expr::var("ageInMonths"), &model, &env, &mut diags);
    assert_eq!(checked.kind, RefKind::Query);
    assert_eq!(checked.ty, Some(Type::integer()));
}

#[test]
fn constant_and_enum_literal_resolution() {
    let model = sample_model();
    let env = Environment::new();
    let mut diags = Diagnostics::new();

    let (max, _) = check(&Expr::var("MAX"), &model, &env, &mut diags);
    assert_eq!(max.kind, RefKind::Constant);
    assert_eq!(max.ty, Some(Type::integer()));

    let (red, _) = check(&Expr::var("red"), &model, &env, &mut diags);
    assert_eq!(red.kind, RefKind::Constant);
    assert!(matches!(red.ty, Some(Type::Enumeration { .. })));
    assert!(diags.is_empty());
}

#[test]
fn entity_name_is_class_id() {
    let model = sample_model();
    let env = Environment::new();
    let mut diags = Diagnostics::new();
    let (checked, ok) = check(&Expr::var("Person"), &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.kind, RefKind::ClassId);
    assert_eq!(checked.ty, Some(Type::set_of(Type::entity("Person"))));
    assert_eq!(checked.element_ty, Some(Type::entity("Person")));
}

#[test]
fn unresolved_name_reports_and_continues() {
    let model = sample_model();
    let env = Environment::new().with_context("Person");
    let mut diags = Diagnostics::new();

    // age = mystery + 1 : the right side is unresolved, the left is not.
    let expr = Expr::eq(
        &Expr::var("age"),
        &Expr::binary(BinOp::Add, &Expr::var("mystery"), &Expr::int(1)),
    );
    let (checked, ok) = check(&expr, &model, &env, &mut diags);
    assert!(!ok);
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvedName { name, .. } if name == "mystery"))
    );

    // The well-typed portion is still annotated.
    let conjuncts = checked.conjuncts();
    assert_eq!(conjuncts.len(), 1);
    assert_eq!(checked.ty, Some(Type::boolean()));
}

#[test]
fn quantifier_binds_variable_for_body_only() {
    let model = sample_model();
    let env = Environment::new().with_context("Library");
    let mut diags = Diagnostics::new();

    let body = Expr::binary(BinOp::Gt, &Expr::var("y"), &Expr::int(0));
    let q = Expr::quantified(QuantifierKind::ForAll, "y", &Expr::var("items"), &body);
    let (checked, ok) = check(&q, &model, &env, &mut diags);
    assert!(ok, "diagnostics: {:?}", diags.into_vec());
    assert_eq!(checked.ty, Some(Type::boolean()));

    // Outside the quantifier the variable does not exist.
    let mut diags = Diagnostics::new();
    let (_, ok) = check(&Expr::var("y"), &model, &env, &mut diags);
    assert!(!ok);
}

#[test]
fn feature_navigation_on_object() {
    let model = sample_model();
    let env = Environment::new().with_var("self", Type::entity("Person"));
    let mut diags = Diagnostics::new();

    let expr = Expr::feature(Some(&Expr::var("self")), "age");
    let (checked, ok) = check(&expr, &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.kind, RefKind::Attribute);
    assert_eq!(checked.ty, Some(Type::integer()));
}

#[test]
fn navigation_through_collection_is_lifted() {
    let model = sample_model();
    let env = Environment::new().with_var("people", Type::set_of(Type::entity("Person")));
    let mut diags = Diagnostics::new();

    let expr = Expr::feature(Some(&Expr::var("people")), "age");
    let (checked, ok) = check(&expr, &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.ty, Some(Type::set_of(Type::integer())));
    assert_eq!(checked.kind, RefKind::Attribute);
}

#[test]
fn size_of_collection_is_integer() {
    let model = sample_model();
    let env = Environment::new().with_context("Library");
    let mut diags = Diagnostics::new();

    let expr = Expr::unary(UnaryOp::Size, &Expr::var("items"));
    let (checked, ok) = check(&expr, &model, &env, &mut diags);
    assert!(ok);
    assert_eq!(checked.ty, Some(Type::integer()));
}

#[test]
fn arithmetic_on_boolean_is_reported() {
    let model = sample_model();
    let env = Environment::new();
    let mut diags = Diagnostics::new();

    let expr = Expr::binary(BinOp::Add, &Expr::int(1), &Expr::bool(true));
    let (checked, ok) = check(&expr, &model, &env, &mut diags);
    assert!(!ok);
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::TypeMismatch { .. }))
    );
    // Best-effort annotation survives the mismatch.
    assert_eq!(checked.ty, Some(Type::integer()));
}

#[test]
fn rechecking_produces_identical_annotations() {
    let model = sample_model();
    let env = Environment::new()
        .with_context("Person")
        .with_var("x", Type::integer());
    let mut diags = Diagnostics::new();

    let expr = Expr::and(
        &Expr::implies(
            &Expr::binary(BinOp::Gt, &Expr::var("x"), &Expr::int(0)),
            &Expr::eq(&Expr::var("age"), &Expr::var("x")),
        ),
        &Expr::binary(BinOp::Leq, &Expr::var("age"), &Expr::var("MAX")),
    );

    let (first, ok1) = check(&expr, &model, &env, &mut diags);
    let (second, ok2) = check(&first, &model, &env, &mut diags);
    assert!(ok1 && ok2);
    // Debug output covers every annotation field; no drift allowed.
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
}
