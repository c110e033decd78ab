// Common test utilities for checker tests

use crate::common::model::{Attribute, BehaviouralFeature, Entity, Model};
use crate::common::types::Type;

/// A small library/person model shared by checker and synthesis tests.
///
/// Person { age: Integer, name: String }
/// Employee : Person { salary: Real }
/// Library { items: Set(Integer), count: Integer }
/// enum Colour { red, green, blue }
/// constant MAX : Integer
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
        .add_operation(BehaviouralFeature::query("ageInMonths", Type::integer()))
        .unwrap();
    model.add_entity(person).unwrap();

    let mut employee = Entity::new("Employee");
    employee.superclass = Some("Person".to_string());
    employee
        .add_attribute(Attribute::new("salary", Type::real()))
        .unwrap();
    model.add_entity(employee).unwrap();

    let mut library = Entity::new("Library");
    library
        .add_attribute(Attribute::collection(
            "items",
            Type::set_of(Type::integer()),
        ))
        .unwrap();
    library
        .add_attribute(Attribute::new("count", Type::integer()))
        .unwrap();
    model.add_entity(library).unwrap();

    model.enumerations.push(Type::Enumeration {
        name: "Colour".to_string(),
        literals: vec!["red".to_string(), "green".to_string(), "blue".to_string()],
    });

    model.constants.push(Attribute::new("MAX", Type::integer()));

    model
}
