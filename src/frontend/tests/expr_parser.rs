use crate::common::expr::{BinOp, Expr, QuantifierKind, UnaryOp};
use crate::common::types::CollectionKind;
use crate::frontend::parse_constraint;

fn parse(src: &str) -> Expr {
    parse_constraint(src).unwrap_or_else(|errs| panic!("parse failed for `{src}`: {errs:?}"))
}

#[test]
fn test_arithmetic_precedence() {
    let expr = parse("a + b * c");
    let expected = Expr::binary(
        BinOp::Add,
        &Expr::var("a"),
        &Expr::binary(BinOp::Mul, &Expr::var("b"), &Expr::var("c")),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_comparison_binds_tighter_than_conjunction() {
    let expr = parse("x > 0 & y = 1");
    let expected = Expr::and(
        &Expr::binary(BinOp::Gt, &Expr::var("x"), &Expr::int(0)),
        &Expr::eq(&Expr::var("y"), &Expr::int(1)),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_implication_has_lowest_precedence() {
    let expr = parse("x > 0 & y = 1 => z = 2");
    let (guard, body) = expr.as_implication().expect("expected an implication");
    assert_eq!(guard.conjuncts().len(), 2);
    assert_eq!(body.to_string(), "z = 2");
}

#[test]
fn test_implication_is_right_associative() {
    let expr = parse("a => b => c");
    let expected = Expr::implies(
        &Expr::var("a"),
        &Expr::implies(&Expr::var("b"), &Expr::var("c")),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_disjunction_between_conjunction_and_implication() {
    let expr = parse("a & b or c => d");
    let (guard, _) = expr.as_implication().expect("expected an implication");
    assert_eq!(guard.disjuncts().len(), 2);
}

#[test]
fn test_navigation_and_before_state() {
    let expr = parse("self.count@pre + 1");
    let expected = Expr::binary(
        BinOp::Add,
        &Expr::feature_pre(Some(&Expr::var("self")), "count"),
        &Expr::int(1),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_bare_before_state_read() {
    let expr = parse("balance@pre");
    assert_eq!(expr, Expr::feature_pre(None, "balance"));
}

#[test]
fn test_membership_operator() {
    let expr = parse("v : items");
    let expected = Expr::binary(BinOp::In, &Expr::var("v"), &Expr::var("items"));
    assert_eq!(expr, expected);
}

#[test]
fn test_includes_desugars_to_membership() {
    let expr = parse("items->includes(v)");
    let expected = Expr::binary(BinOp::In, &Expr::var("v"), &Expr::var("items"));
    assert_eq!(expr, expected);

    let expr = parse("items->excludes(v)");
    let expected = Expr::binary(BinOp::NotIn, &Expr::var("v"), &Expr::var("items"));
    assert_eq!(expr, expected);
}

#[test]
fn test_collection_operators() {
    let expr = parse("items \\/ Set{v}");
    let expected = Expr::binary(
        BinOp::Union,
        &Expr::var("items"),
        &Expr::set_literal(CollectionKind::Set, vec![Expr::var("v")]),
    );
    assert_eq!(expr, expected);

    let expr = parse("log ^ Sequence{v}");
    let expected = Expr::binary(
        BinOp::Concat,
        &Expr::var("log"),
        &Expr::set_literal(CollectionKind::Sequence, vec![Expr::var("v")]),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_subset_operators() {
    let expr = parse("s <: items & t /<: items");
    let expected = Expr::and(
        &Expr::binary(BinOp::Subset, &Expr::var("s"), &Expr::var("items")),
        &Expr::binary(BinOp::NotSubset, &Expr::var("t"), &Expr::var("items")),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_aggregate_methods() {
    let expr = parse("items->size() > 0");
    let expected = Expr::binary(
        BinOp::Gt,
        &Expr::unary(UnaryOp::Size, &Expr::var("items")),
        &Expr::int(0),
    );
    assert_eq!(expr, expected);

    let expr = parse("items->isEmpty()");
    assert_eq!(expr, Expr::unary(UnaryOp::IsEmpty, &Expr::var("items")));
}

#[test]
fn test_quantifier() {
    let expr = parse("members->forAll(p | p.age > 0)");
    let body = Expr::binary(
        BinOp::Gt,
        &Expr::feature(Some(&Expr::var("p")), "age"),
        &Expr::int(0),
    );
    let expected = Expr::quantified(QuantifierKind::ForAll, "p", &Expr::var("members"), &body);
    assert_eq!(expr, expected);
}

#[test]
fn test_chained_postfix() {
    let expr = parse("self.members->size()");
    let expected = Expr::unary(
        UnaryOp::Size,
        &Expr::feature(Some(&Expr::var("self")), "members"),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_negation_and_unary_minus() {
    let expr = parse("not(x = 1)");
    assert_eq!(expr, Expr::not(&Expr::eq(&Expr::var("x"), &Expr::int(1))));

    let expr = parse("-x + 1");
    let expected = Expr::binary(
        BinOp::Add,
        &Expr::unary(UnaryOp::Neg, &Expr::var("x")),
        &Expr::int(1),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_parentheses_override_precedence() {
    let expr = parse("(a + b) * c");
    let expected = Expr::binary(
        BinOp::Mul,
        &Expr::binary(BinOp::Add, &Expr::var("a"), &Expr::var("b")),
        &Expr::var("c"),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_display_round_trip() {
    for src in [
        "x > 0 => result = 1",
        "self.count@pre + 1 = self.count",
        "v : items & items->size() > 0",
        "members->forAll(p | p.age > 0)",
        "items \\/ Set{v}",
    ] {
        let expr = parse(src);
        assert_eq!(parse(&expr.to_string()), expr, "round trip of `{src}`");
    }
}

#[test]
fn test_incomplete_expression_is_an_error() {
    assert!(parse_constraint("x +").is_err());
    assert!(parse_constraint("(x > 0").is_err());
    assert!(parse_constraint("").is_err());
}

#[test]
fn test_oversized_integer_literal_is_an_error() {
    // One digit past i64::MAX
    let errs = parse_constraint("x = 99999999999999999999999").unwrap_err();
    assert!(!errs.is_empty());
    assert!(errs[0].message.contains("integer literal"), "{}", errs[0]);
}
