// Shared model and operation builders for synthesis tests.

use crate::common::model::{Attribute, BehaviouralFeature, Entity, Model};
use crate::common::types::Type;

/// Person (age, name, friends), Library (items, log, count, members).
pub fn sample_model() -> Model {
    let mut model = Model::new();

    let mut person = Entity::new("Person");
    person
        .add_attribute(Attribute::new("age", Type::integer()))
        .unwrap();
    person
        .add_attribute(Attribute::new("name", Type::string()))
        .unwrap();
    person
        .add_attribute(Attribute::collection(
            "friends",
            Type::set_of(Type::entity("Person")),
        ))
        .unwrap();
    model.add_entity(person).unwrap();

    let mut library = Entity::new("Library");
    library
        .add_attribute(Attribute::collection(
            "items",
            Type::set_of(Type::integer()),
        ))
        .unwrap();
    library
        .add_attribute(Attribute::collection(
            "log",
            Type::sequence_of(Type::integer()),
        ))
        .unwrap();
    library
        .add_attribute(Attribute::new("count", Type::integer()))
        .unwrap();
    library
        .add_attribute(Attribute::collection(
            "members",
            Type::set_of(Type::entity("Person")),
        ))
        .unwrap();
    model.add_entity(library).unwrap();

    model
}

/// An update operation owned by `owner`.
pub fn update_op(owner: &str, name: &str) -> BehaviouralFeature {
    let mut op = BehaviouralFeature::new(name);
    op.owner = Some(owner.to_string());
    op
}

/// A query operation owned by `owner` with the given result type.
pub fn query_op(owner: &str, name: &str, result_type: Type) -> BehaviouralFeature {
    let mut op = BehaviouralFeature::query(name, result_type);
    op.owner = Some(owner.to_string());
    op
}

pub fn int_param(name: &str) -> Attribute {
    Attribute::new(name, Type::integer())
}
