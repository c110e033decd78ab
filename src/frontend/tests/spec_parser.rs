use crate::common::types::Type;
use crate::frontend::parse_spec;

#[test]
fn test_update_operation_specification() {
    let ops = parse_spec(
        "context Library::store(v : Integer)\n\
         pre: v > 0\n\
         post: items = items@pre \\/ Set{v}\n",
    )
    .unwrap();

    assert_eq!(ops.len(), 1);
    let op = &ops[0];
    assert_eq!(op.owner.as_deref(), Some("Library"));
    assert_eq!(op.name, "store");
    assert!(!op.is_query);
    assert!(!op.is_static);
    assert_eq!(op.parameters.len(), 1);
    assert_eq!(op.parameters[0].name, "v");
    assert_eq!(op.parameters[0].ty, Type::integer());
    assert_eq!(op.precondition.as_ref().unwrap().to_string(), "v > 0");
    assert_eq!(
        op.postcondition.as_ref().unwrap().to_string(),
        "items = items@pre \\/ Set{v}"
    );
}

#[test]
fn test_static_query_with_result_type() {
    let ops = parse_spec(
        "static query context Library::total() : Integer\n\
         post: result = count\n",
    )
    .unwrap();

    let op = &ops[0];
    assert!(op.is_static);
    assert!(op.is_query);
    assert_eq!(op.result_type, Some(Type::integer()));
    assert!(op.precondition.is_none());
}

#[test]
fn test_repeated_clauses_are_conjoined() {
    let ops = parse_spec(
        "context Account::transfer(amount : Integer)\n\
         pre: amount > 0\n\
         pre: amount <= balance\n\
         post: balance = balance@pre - amount\n\
         post: moved = moved@pre + amount\n",
    )
    .unwrap();

    let op = &ops[0];
    assert_eq!(op.precondition.as_ref().unwrap().conjuncts().len(), 2);
    assert_eq!(op.postcondition.as_ref().unwrap().conjuncts().len(), 2);
}

#[test]
fn test_collection_parameter_types() {
    let ops = parse_spec(
        "context Library::restock(batch : Set(Integer), order : Sequence(Person))\n\
         post: true\n",
    )
    .unwrap();

    let op = &ops[0];
    assert_eq!(op.parameters[0].ty, Type::set_of(Type::integer()));
    assert!(op.parameters[0].is_collection_valued());
    assert_eq!(
        op.parameters[1].ty,
        Type::sequence_of(Type::entity("Person"))
    );
    assert_eq!(
        op.parameters[1].element_ty,
        Some(Type::entity("Person"))
    );
}

#[test]
fn test_multiple_operations_in_one_file() {
    let ops = parse_spec(
        "context Library::store(v : Integer)\n\
         post: v : items\n\
         \n\
         query context Library::stock() : Integer\n\
         post: result = items->size()\n",
    )
    .unwrap();

    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].name, "store");
    assert_eq!(ops[1].name, "stock");
    assert!(ops[1].is_query);
}

#[test]
fn test_operation_without_clauses() {
    let ops = parse_spec("context Library::touch()\n").unwrap();
    let op = &ops[0];
    assert!(op.precondition.is_none());
    assert!(op.postcondition.is_none());
}

#[test]
fn test_missing_context_keyword_is_an_error() {
    let errs = parse_spec("Library::store(v : Integer) post: v : items").unwrap_err();
    assert!(!errs.is_empty());
}

#[test]
fn test_error_spans_point_into_the_source() {
    let src = "context Library::store(v : Integer)\npost: v +";
    let errs = parse_spec(src).unwrap_err();
    assert!(errs.iter().all(|e| e.span.end <= src.len()));
}
