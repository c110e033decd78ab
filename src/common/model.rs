use crate::common::expr::Expr;
use crate::common::types::{Primitive, Type};
use std::fmt;

/// Upper multiplicity bound of 0 denotes "unbounded" (`*`).
pub const UNBOUNDED: u32 = 0;

/// A data attribute or materialized association role of an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
    /// Element type for collection-valued attributes.
    pub element_ty: Option<Type>,
    pub lower: u32,
    pub upper: u32,
    pub frozen: bool,
    pub derived: bool,
    pub unique: bool,
    /// Owning entity, by name. A back-reference only; the entity owns the
    /// attribute, not the other way round.
    pub owner: Option<String>,
    /// True for attributes materialized from association ends.
    pub is_role: bool,
    /// Navigation path for attributes synthesized from composed role chains.
    pub navigation: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let element_ty = ty.element().cloned();
        Attribute {
            name: name.into(),
            ty,
            element_ty,
            lower: 1,
            upper: 1,
            frozen: false,
            derived: false,
            unique: false,
            owner: None,
            is_role: false,
            navigation: Vec::new(),
        }
    }

    pub fn collection(name: impl Into<String>, ty: Type) -> Self {
        let mut attr = Attribute::new(name, ty);
        attr.lower = 0;
        attr.upper = UNBOUNDED;
        attr
    }

    pub fn is_collection_valued(&self) -> bool {
        self.ty.is_collection()
    }
}

/// An operation specified by precondition/postcondition constraints.
///
/// The pre/postcondition are set once when the model is built and only ever
/// consulted by the synthesizer; the write frame derived from the
/// postcondition is computed lazily and cached per operation.
#[derive(Clone, Debug)]
pub struct BehaviouralFeature {
    pub name: String,
    pub parameters: Vec<Attribute>,
    pub result_type: Option<Type>,
    pub precondition: Option<Expr>,
    pub postcondition: Option<Expr>,
    pub is_query: bool,
    pub is_static: bool,
    /// Owning entity, or `None` for a free operation.
    pub owner: Option<String>,
}

impl BehaviouralFeature {
    pub fn new(name: impl Into<String>) -> Self {
        BehaviouralFeature {
            name: name.into(),
            parameters: Vec::new(),
            result_type: None,
            precondition: None,
            postcondition: None,
            is_query: false,
            is_static: false,
            owner: None,
        }
    }

    pub fn query(name: impl Into<String>, result_type: Type) -> Self {
        let mut f = BehaviouralFeature::new(name);
        f.result_type = Some(result_type);
        f.is_query = true;
        f
    }

    /// Stable identity used for memoizing per-operation analyses.
    pub fn key(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}::{}", owner, self.name),
            None => self.name.clone(),
        }
    }
}

/// An entity (class) of the data model. Built once from the source model,
/// read-only during synthesis.
#[derive(Clone, Debug)]
pub struct Entity {
    pub name: String,
    pub superclass: Option<String>,
    pub attributes: Vec<Attribute>,
    pub operations: Vec<BehaviouralFeature>,
    pub is_abstract: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            superclass: None,
            attributes: Vec::new(),
            operations: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn operation(&self, name: &str) -> Option<&BehaviouralFeature> {
        self.operations.iter().find(|o| o.name == name)
    }

    /// Add an owned attribute. Names must be unique within the entity's own
    /// declared feature set (inherited names may be overridden).
    pub fn add_attribute(&mut self, mut attr: Attribute) -> Result<(), ModelError> {
        if self.attribute(&attr.name).is_some() || self.operation(&attr.name).is_some() {
            return Err(ModelError::DuplicateFeature {
                entity: self.name.clone(),
                name: attr.name,
            });
        }
        if attr.upper != UNBOUNDED && attr.lower > attr.upper {
            return Err(ModelError::InvalidMultiplicity {
                entity: self.name.clone(),
                name: attr.name,
                lower: attr.lower,
                upper: attr.upper,
            });
        }
        attr.owner = Some(self.name.clone());
        self.attributes.push(attr);
        Ok(())
    }

    pub fn add_operation(&mut self, mut op: BehaviouralFeature) -> Result<(), ModelError> {
        if self.attribute(&op.name).is_some() || self.operation(&op.name).is_some() {
            return Err(ModelError::DuplicateFeature {
                entity: self.name.clone(),
                name: op.name,
            });
        }
        op.owner = Some(self.name.clone());
        self.operations.push(op);
        Ok(())
    }
}

/// A binary association between two entities. Installing it on a model
/// materializes role attributes on both ends.
#[derive(Clone, Debug)]
pub struct Association {
    pub source: String,
    pub target: String,
    /// Role name of the target end (the attribute added to the source).
    pub target_role: String,
    /// Optional role name of the source end (inverse attribute).
    pub source_role: Option<String>,
    pub target_lower: u32,
    pub target_upper: u32,
    pub source_lower: u32,
    pub source_upper: u32,
    /// Target end is ordered (Sequence rather than Set).
    pub ordered: bool,
    /// Target role values are unique across sources; forces the inverse
    /// role to cardinality 0..1.
    pub unique: bool,
}

impl Association {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        target_role: impl Into<String>,
    ) -> Self {
        Association {
            source: source.into(),
            target: target.into(),
            target_role: target_role.into(),
            source_role: None,
            target_lower: 0,
            target_upper: UNBOUNDED,
            source_lower: 0,
            source_upper: UNBOUNDED,
            ordered: false,
            unique: false,
        }
    }
}

fn role_attribute(
    role: &str,
    other_entity: &str,
    lower: u32,
    upper: u32,
    ordered: bool,
) -> Attribute {
    let ty = if upper == 1 {
        Type::entity(other_entity)
    } else if ordered {
        Type::sequence_of(Type::entity(other_entity))
    } else {
        Type::set_of(Type::entity(other_entity))
    };
    let mut attr = Attribute::new(role, ty);
    attr.lower = lower;
    attr.upper = upper;
    attr.is_role = true;
    attr.navigation = vec![role.to_string()];
    attr
}

/// The data model: entities, enumerations, global constants.
///
/// Read-only once built; all synthesis-time queries go through the lookup
/// methods here, which search the ancestor chain for inherited features.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub entities: Vec<Entity>,
    pub enumerations: Vec<Type>,
    pub constants: Vec<Attribute>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), ModelError> {
        if self.entity(&entity.name).is_some() {
            return Err(ModelError::DuplicateEntity { name: entity.name });
        }
        self.entities.push(entity);
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    /// The entity followed by its superclass chain, innermost first.
    pub fn ancestors(&self, name: &str) -> Vec<&Entity> {
        let mut chain = Vec::new();
        let mut current = self.entity(name);
        while let Some(entity) = current {
            // A cycle in superclass declarations would loop forever.
            if chain.iter().any(|e: &&Entity| e.name == entity.name) {
                break;
            }
            chain.push(entity);
            current = entity.superclass.as_deref().and_then(|s| self.entity(s));
        }
        chain
    }

    /// Look up an attribute of an entity, searching the ancestor chain.
    pub fn attribute_of(&self, entity: &str, name: &str) -> Option<&Attribute> {
        self.ancestors(entity)
            .iter()
            .find_map(|e| e.attribute(name))
    }

    /// Look up an operation of an entity, searching the ancestor chain.
    pub fn operation_of(&self, entity: &str, name: &str) -> Option<&BehaviouralFeature> {
        self.ancestors(entity)
            .iter()
            .find_map(|e| e.operation(name))
    }

    pub fn constant(&self, name: &str) -> Option<&Attribute> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Resolve a bare name as an enumeration literal.
    pub fn enumeration_literal(&self, name: &str) -> Option<&Type> {
        self.enumerations.iter().find(|ty| match ty {
            Type::Enumeration { literals, .. } => literals.iter().any(|l| l == name),
            _ => false,
        })
    }

    /// Install an association: a role attribute appears on the source end,
    /// and on the target end too when an inverse role name is given.
    pub fn add_association(&mut self, assoc: Association) -> Result<(), ModelError> {
        if self.entity(&assoc.source).is_none() {
            return Err(ModelError::UnknownEntity {
                name: assoc.source,
            });
        }
        if self.entity(&assoc.target).is_none() {
            return Err(ModelError::UnknownEntity {
                name: assoc.target,
            });
        }

        let mut forward = role_attribute(
            &assoc.target_role,
            &assoc.target,
            assoc.target_lower,
            assoc.target_upper,
            assoc.ordered,
        );
        forward.unique = assoc.unique;
        self.entity_mut(&assoc.source)
            .expect("source entity checked above")
            .add_attribute(forward)?;

        if let Some(source_role) = &assoc.source_role {
            // A unique forward role bounds the inverse at 0..1.
            let (lower, upper) = if assoc.unique {
                (0, 1)
            } else {
                (assoc.source_lower, assoc.source_upper)
            };
            let inverse = role_attribute(source_role, &assoc.source, lower, upper, false);
            self.entity_mut(&assoc.target)
                .expect("target entity checked above")
                .add_attribute(inverse)?;
        }
        Ok(())
    }

    /// Subtype query over the type model: numeric widening, entity ancestry
    /// and covariant same-kind collections.
    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (Type::Primitive(Primitive::Integer), Type::Primitive(Primitive::Real)) => true,
            (Type::Entity(a), Type::Entity(b)) => {
                self.ancestors(a).iter().any(|e| &e.name == b)
            }
            (
                Type::Collection {
                    kind: k1,
                    element: e1,
                },
                Type::Collection {
                    kind: k2,
                    element: e2,
                },
            ) => k1 == k2 && self.is_subtype(e1, e2),
            _ => false,
        }
    }

    /// Structural similarity of two types, in [0, 1]. Used to decide whether
    /// same-named operations from different model branches may be merged.
    pub fn similarity(&self, a: &Type, b: &Type) -> f64 {
        if a == b {
            return 1.0;
        }
        match (a, b) {
            _ if a.is_numeric() && b.is_numeric() => 0.75,
            (Type::Entity(_), Type::Entity(_)) => {
                if self.is_subtype(a, b) || self.is_subtype(b, a) {
                    0.75
                } else {
                    0.0
                }
            }
            (
                Type::Collection {
                    kind: k1,
                    element: e1,
                },
                Type::Collection {
                    kind: k2,
                    element: e2,
                },
            ) => {
                let factor = if k1 == k2 { 0.8 } else { 0.4 };
                factor * self.similarity(e1, e2)
            }
            _ => 0.0,
        }
    }
}

/// Errors raised while building a model.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    DuplicateEntity {
        name: String,
    },
    DuplicateFeature {
        entity: String,
        name: String,
    },
    UnknownEntity {
        name: String,
    },
    InvalidMultiplicity {
        entity: String,
        name: String,
        lower: u32,
        upper: u32,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::DuplicateEntity { name } => {
                write!(f, "Entity `{}` is declared twice", name)
            }
            ModelError::DuplicateFeature { entity, name } => {
                write!(f, "Entity `{}` already declares a feature `{}`", entity, name)
            }
            ModelError::UnknownEntity { name } => {
                write!(f, "Unknown entity `{}`", name)
            }
            ModelError::InvalidMultiplicity {
                entity,
                name,
                lower,
                upper,
            } => {
                write!(
                    f,
                    "Attribute `{}.{}` has invalid multiplicity {}..{}",
                    entity, name, lower, upper
                )
            }
        }
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        let mut model = Model::new();
        let mut person = Entity::new("Person");
        person
            .add_attribute(Attribute::new("age", Type::integer()))
            .unwrap();
        model.add_entity(person).unwrap();

        let mut employee = Entity::new("Employee");
        employee.superclass = Some("Person".to_string());
        employee
            .add_attribute(Attribute::new("salary", Type::real()))
            .unwrap();
        model.add_entity(employee).unwrap();
        model
    }

    #[test]
    fn feature_lookup_searches_ancestors() {
        let model = sample_model();
        let attr = model.attribute_of("Employee", "age").unwrap();
        assert_eq!(attr.owner.as_deref(), Some("Person"));
        assert!(model.attribute_of("Person", "salary").is_none());
    }

    #[test]
    fn duplicate_feature_is_rejected() {
        let mut entity = Entity::new("Person");
        entity
            .add_attribute(Attribute::new("age", Type::integer()))
            .unwrap();
        let err = entity
            .add_attribute(Attribute::new("age", Type::real()))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateFeature { .. }));
    }

    #[test]
    fn association_installs_roles_on_both_ends() {
        let mut model = sample_model();
        model.add_entity(Entity::new("Company")).unwrap();
        let mut assoc = Association::new("Company", "Person", "staff");
        assoc.source_role = Some("employer".to_string());
        assoc.source_upper = 1;
        model.add_association(assoc).unwrap();

        let staff = model.attribute_of("Company", "staff").unwrap();
        assert!(staff.is_role);
        assert_eq!(staff.ty, Type::set_of(Type::entity("Person")));

        let employer = model.attribute_of("Person", "employer").unwrap();
        assert_eq!(employer.ty, Type::entity("Company"));
    }

    #[test]
    fn unique_role_bounds_inverse() {
        let mut model = sample_model();
        model.add_entity(Entity::new("Badge")).unwrap();
        let mut assoc = Association::new("Person", "Badge", "badge");
        assoc.target_upper = 1;
        assoc.unique = true;
        assoc.source_role = Some("holder".to_string());
        model.add_association(assoc).unwrap();

        let holder = model.attribute_of("Badge", "holder").unwrap();
        assert_eq!((holder.lower, holder.upper), (0, 1));
    }

    #[test]
    fn subtype_via_ancestry_and_widening() {
        let model = sample_model();
        assert!(model.is_subtype(&Type::entity("Employee"), &Type::entity("Person")));
        assert!(!model.is_subtype(&Type::entity("Person"), &Type::entity("Employee")));
        assert!(model.is_subtype(&Type::integer(), &Type::real()));
        assert!(model.is_subtype(
            &Type::set_of(Type::entity("Employee")),
            &Type::set_of(Type::entity("Person"))
        ));
    }

    #[test]
    fn similarity_is_symmetric_on_samples() {
        let model = sample_model();
        let a = Type::set_of(Type::entity("Employee"));
        let b = Type::set_of(Type::entity("Person"));
        assert_eq!(model.similarity(&a, &b), model.similarity(&b, &a));
        assert!(model.similarity(&a, &b) > 0.5);
        assert_eq!(model.similarity(&Type::integer(), &Type::boolean()), 0.0);
    }
}
