// Postcondition-to-statement scenarios.

use crate::checker::{Diagnostic, Diagnostics, Severity};
use crate::common::expr::{BinOp, Expr, QuantifierKind, UnaryOp};
use crate::common::model::{Attribute, BehaviouralFeature, Model};
use crate::common::stmt::Statement;
use crate::common::types::{CollectionKind, Type};
use crate::synth::tests::common::{int_param, query_op, sample_model, update_op};
use crate::synth::{FrameCache, synthesize_operation};

fn run(op: &BehaviouralFeature, model: &Model) -> (Statement, Diagnostics) {
    let mut diags = Diagnostics::new();
    let mut frames = FrameCache::new();
    let stmt = synthesize_operation(op, model, &mut frames, &mut diags);
    (stmt, diags)
}

fn self_feature(name: &str) -> Expr {
    Expr::feature(Some(&Expr::var("self")), name)
}

#[test]
fn before_state_read_snapshots_then_assigns() {
    // age = age@pre + 1
    let model = sample_model();
    let mut op = update_op("Person", "birthday");
    op.postcondition = Some(Expr::eq(
        &Expr::feature(None, "age"),
        &Expr::binary(BinOp::Add, &Expr::feature_pre(None, "age"), &Expr::int(1)),
    ));

    let (stmt, diags) = run(&op, &model);
    let expected = Statement::Sequence(vec![
        Statement::VarDecl {
            name: "pre_age".to_string(),
            ty: Type::integer(),
            init: Some(self_feature("age")),
        },
        Statement::assign(
            self_feature("age"),
            Expr::binary(BinOp::Add, &Expr::var("pre_age"), &Expr::int(1)),
        ),
    ]);
    assert_eq!(stmt, expected);
    assert!(diags.is_empty(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn implication_conjuncts_become_else_if_chain() {
    // (x > 0 => result = 1) & (x <= 0 => result = -1)
    let model = sample_model();
    let mut op = query_op("Person", "sign", Type::integer());
    op.parameters.push(int_param("x"));
    let gt = Expr::binary(BinOp::Gt, &Expr::var("x"), &Expr::int(0));
    let leq = Expr::binary(BinOp::Leq, &Expr::var("x"), &Expr::int(0));
    op.postcondition = Some(Expr::and(
        &Expr::implies(&gt, &Expr::eq(&Expr::var("result"), &Expr::int(1))),
        &Expr::implies(&leq, &Expr::eq(&Expr::var("result"), &Expr::int(-1))),
    ));

    let (stmt, diags) = run(&op, &model);
    let expected = Statement::if_then_else(
        gt,
        Statement::assign(Expr::var("result"), Expr::int(1)),
        Statement::if_then(leq, Statement::assign(Expr::var("result"), Expr::int(-1))),
    );
    assert_eq!(stmt, expected);
    assert!(diags.is_empty(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn constraint_without_rule_degrades_to_gap() {
    // Set{1,2,3}->forAll(y | y : self.items) constrains nothing assignable.
    let model = sample_model();
    let mut op = update_op("Library", "fill");
    op.postcondition = Some(Expr::quantified(
        QuantifierKind::ForAll,
        "y",
        &Expr::set_literal(
            CollectionKind::Set,
            vec![Expr::int(1), Expr::int(2), Expr::int(3)],
        ),
        &Expr::binary(BinOp::In, &Expr::var("y"), &self_feature("items")),
    ));

    let (stmt, diags) = run(&op, &model);
    assert!(matches!(stmt, Statement::Unimplemented(_)));
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::SynthesisGap { .. }))
    );
    assert!(diags.iter().all(|d| d.severity() == Severity::Warning));
}

#[test]
fn unguarded_query_equality_returns() {
    // result = self.items->size()
    let model = sample_model();
    let mut op = query_op("Library", "size", Type::integer());
    op.postcondition = Some(Expr::eq(
        &Expr::var("result"),
        &Expr::unary(UnaryOp::Size, &self_feature("items")),
    ));

    let (stmt, diags) = run(&op, &model);
    let expected = Statement::Return(Expr::unary(UnaryOp::Size, &self_feature("items")));
    assert_eq!(stmt, expected);
    assert!(diags.is_empty(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn guarded_query_equality_assigns() {
    // x > 0 => result = 1 : guarded, so no bare return.
    let model = sample_model();
    let mut op = query_op("Person", "positive", Type::integer());
    op.parameters.push(int_param("x"));
    let gt = Expr::binary(BinOp::Gt, &Expr::var("x"), &Expr::int(0));
    op.postcondition = Some(Expr::implies(
        &gt,
        &Expr::eq(&Expr::var("result"), &Expr::int(1)),
    ));

    let (stmt, _) = run(&op, &model);
    let expected = Statement::if_then(gt, Statement::assign(Expr::var("result"), Expr::int(1)));
    assert_eq!(stmt, expected);
}

#[test]
fn guard_binding_extracts_a_loop() {
    // (x : Person & x.age >= 18) => x.age = 0
    let model = sample_model();
    let mut op = update_op("Person", "resetAdults");
    let x_age = Expr::feature(Some(&Expr::var("x")), "age");
    op.postcondition = Some(Expr::implies(
        &Expr::and(
            &Expr::binary(BinOp::In, &Expr::var("x"), &Expr::var("Person")),
            &Expr::binary(BinOp::Geq, &x_age, &Expr::int(18)),
        ),
        &Expr::eq(&x_age, &Expr::int(0)),
    ));

    let (stmt, diags) = run(&op, &model);
    let expected = Statement::Loop {
        var: "x".to_string(),
        range: Expr::var("Person"),
        body: Box::new(Statement::if_then(
            Expr::binary(BinOp::Geq, &x_age, &Expr::int(18)),
            Statement::assign(x_age.clone(), Expr::int(0)),
        )),
    };
    assert_eq!(stmt, expected);
    assert!(!diags.has_errors(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn dependent_guard_bindings_nest_loops_outer_to_inner() {
    // (x : Person & y : x.friends) => y.age = 0
    let model = sample_model();
    let mut op = update_op("Person", "resetFriends");
    let y_age = Expr::feature(Some(&Expr::var("y")), "age");
    op.postcondition = Some(Expr::implies(
        &Expr::and(
            &Expr::binary(BinOp::In, &Expr::var("x"), &Expr::var("Person")),
            &Expr::binary(
                BinOp::In,
                &Expr::var("y"),
                &Expr::feature(Some(&Expr::var("x")), "friends"),
            ),
        ),
        &Expr::eq(&y_age, &Expr::int(0)),
    ));

    let (stmt, diags) = run(&op, &model);
    let expected = Statement::Loop {
        var: "x".to_string(),
        range: Expr::var("Person"),
        body: Box::new(Statement::Loop {
            var: "y".to_string(),
            range: Expr::feature(Some(&Expr::var("x")), "friends"),
            body: Box::new(Statement::assign(y_age, Expr::int(0))),
        }),
    };
    assert_eq!(stmt, expected);
    assert!(!diags.has_errors(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn membership_constraint_recomputes_the_aggregate() {
    // v : items on a Set attribute
    let model = sample_model();
    let mut op = update_op("Library", "store");
    op.parameters.push(int_param("v"));
    op.postcondition = Some(Expr::binary(
        BinOp::In,
        &Expr::var("v"),
        &Expr::feature(None, "items"),
    ));

    let (stmt, diags) = run(&op, &model);
    let singleton = Expr::set_literal(CollectionKind::Set, vec![Expr::var("v")]);
    let expected = Statement::assign(
        self_feature("items"),
        Expr::binary(BinOp::Union, &self_feature("items"), &singleton),
    );
    assert_eq!(stmt, expected);
    assert!(diags.is_empty(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn ordered_membership_appends() {
    // v : log on a Sequence attribute
    let model = sample_model();
    let mut op = update_op("Library", "record");
    op.parameters.push(int_param("v"));
    op.postcondition = Some(Expr::binary(
        BinOp::In,
        &Expr::var("v"),
        &Expr::feature(None, "log"),
    ));

    let (stmt, _) = run(&op, &model);
    let singleton = Expr::set_literal(CollectionKind::Sequence, vec![Expr::var("v")]);
    let expected = Statement::assign(
        self_feature("log"),
        Expr::binary(BinOp::Concat, &self_feature("log"), &singleton),
    );
    assert_eq!(stmt, expected);
}

#[test]
fn non_membership_removes() {
    let model = sample_model();
    let mut op = update_op("Library", "discard");
    op.parameters.push(int_param("v"));
    op.postcondition = Some(Expr::binary(
        BinOp::NotIn,
        &Expr::var("v"),
        &Expr::feature(None, "items"),
    ));

    let (stmt, _) = run(&op, &model);
    let singleton = Expr::set_literal(CollectionKind::Set, vec![Expr::var("v")]);
    let expected = Statement::assign(
        self_feature("items"),
        Expr::binary(BinOp::Sub, &self_feature("items"), &singleton),
    );
    assert_eq!(stmt, expected);
}

#[test]
fn subset_constraint_unions_whole_operand() {
    let model = sample_model();
    let mut op = update_op("Library", "absorb");
    op.parameters
        .push(Attribute::new("s", Type::set_of(Type::integer())));
    op.postcondition = Some(Expr::binary(
        BinOp::Subset,
        &Expr::var("s"),
        &Expr::feature(None, "items"),
    ));

    let (stmt, _) = run(&op, &model);
    let expected = Statement::assign(
        self_feature("items"),
        Expr::binary(BinOp::Union, &self_feature("items"), &Expr::var("s")),
    );
    assert_eq!(stmt, expected);
}

#[test]
fn update_through_owner_collection_becomes_a_loop() {
    // p : members.friends updates every member's friends.
    let model = sample_model();
    let mut op = update_op("Library", "introduce");
    op.parameters
        .push(Attribute::new("p", Type::entity("Person")));
    op.postcondition = Some(Expr::binary(
        BinOp::In,
        &Expr::var("p"),
        &Expr::feature(Some(&Expr::feature(None, "members")), "friends"),
    ));

    let (stmt, diags) = run(&op, &model);
    let member_friends = Expr::feature(Some(&Expr::var("owner")), "friends");
    let singleton = Expr::set_literal(CollectionKind::Set, vec![Expr::var("p")]);
    let expected = Statement::Loop {
        var: "owner".to_string(),
        range: Expr::feature(None, "members"),
        body: Box::new(Statement::assign(
            member_friends.clone(),
            Expr::binary(BinOp::Union, &member_friends, &singleton),
        )),
    };
    assert_eq!(stmt, expected);
    assert!(!diags.has_errors(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn first_disjunct_wins() {
    let model = sample_model();
    let mut op = query_op("Library", "pick", Type::integer());
    op.postcondition = Some(Expr::or(
        &Expr::eq(&Expr::var("result"), &Expr::int(1)),
        &Expr::eq(&Expr::var("result"), &Expr::int(2)),
    ));

    let (stmt, _) = run(&op, &model);
    assert_eq!(stmt, Statement::Return(Expr::int(1)));
}

#[test]
fn assignment_to_unbound_name_declares_and_warns() {
    let model = sample_model();
    let mut op = update_op("Person", "tally");
    op.postcondition = Some(Expr::eq(&Expr::var("total"), &Expr::int(5)));

    let (stmt, diags) = run(&op, &model);
    assert_eq!(
        stmt,
        Statement::VarDecl {
            name: "total".to_string(),
            ty: Type::integer(),
            init: Some(Expr::int(5)),
        }
    );
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::ImplicitLocal { name } if name == "total"))
    );
    assert!(!diags.has_errors(), "diagnostics: {:?}", diags.into_vec());
}

#[test]
fn partial_division_guards_the_query() {
    // result = count / n with no precondition: the definedness condition
    // becomes the guard and its absence from the precondition is reported.
    let model = sample_model();
    let mut op = query_op("Library", "share", Type::integer());
    op.parameters.push(int_param("n"));
    op.postcondition = Some(Expr::eq(
        &Expr::var("result"),
        &Expr::binary(BinOp::Div, &Expr::feature(None, "count"), &Expr::var("n")),
    ));

    let (stmt, diags) = run(&op, &model);
    let division = Expr::binary(BinOp::Div, &Expr::feature(None, "count"), &Expr::var("n"));
    let guard = Expr::binary(BinOp::Neq, &Expr::var("n"), &Expr::int(0));
    let expected = Statement::if_then_else(
        guard,
        Statement::Return(division),
        Statement::Return(Expr::int(0)),
    );
    assert_eq!(stmt, expected);
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::NonTotalPrecondition { .. }))
    );
}

#[test]
fn stated_precondition_covers_definedness() {
    let model = sample_model();
    let mut op = query_op("Library", "share", Type::integer());
    op.parameters.push(int_param("n"));
    let nonzero = Expr::binary(BinOp::Neq, &Expr::var("n"), &Expr::int(0));
    op.precondition = Some(nonzero.clone());
    op.postcondition = Some(Expr::eq(
        &Expr::var("result"),
        &Expr::binary(BinOp::Div, &Expr::feature(None, "count"), &Expr::var("n")),
    ));

    let (stmt, diags) = run(&op, &model);
    assert!(matches!(stmt, Statement::If { .. }));
    assert!(
        !diags
            .iter()
            .any(|d| matches!(d, Diagnostic::NonTotalPrecondition { .. }))
    );
}

#[test]
fn missing_result_type_is_reported() {
    let model = sample_model();
    let mut op = update_op("Library", "peek");
    op.is_query = true;
    op.postcondition = Some(Expr::eq(&Expr::var("result"), &Expr::int(0)));

    let (_, diags) = run(&op, &model);
    assert!(
        diags
            .iter()
            .any(|d| matches!(d, Diagnostic::MissingResultType { .. }))
    );
}

#[test]
fn synthesis_is_deterministic() {
    let model = sample_model();
    let mut op = update_op("Person", "resetFriends");
    op.postcondition = Some(Expr::implies(
        &Expr::and(
            &Expr::binary(BinOp::In, &Expr::var("x"), &Expr::var("Person")),
            &Expr::binary(
                BinOp::In,
                &Expr::var("y"),
                &Expr::feature(Some(&Expr::var("x")), "friends"),
            ),
        ),
        &Expr::eq(&Expr::feature(Some(&Expr::var("y")), "age"), &Expr::int(0)),
    ));

    let (first, _) = run(&op, &model);
    let (second, _) = run(&op, &model);
    assert_eq!(first, second);
}

#[test]
fn operation_without_postcondition_is_a_skip() {
    let model = sample_model();
    let op = update_op("Person", "noop");
    let (stmt, diags) = run(&op, &model);
    assert_eq!(stmt, Statement::Skip);
    assert!(diags.is_empty());
}
