use std::fmt;
use std::sync::Arc;

/// Built-in primitive types of the constraint language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Integer,
    Real,
    Boolean,
    String,
}

/// Kind of a parameterized collection type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Set,
    Sequence,
}

/// Semantic type of a model feature or constraint expression.
///
/// Types are created during model construction and type inference and are
/// immutable once assigned to an AST node: reuse clones, never mutates.
/// An `Entity` type resolves by name to exactly one data-model entity.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Primitive(Primitive),
    Enumeration {
        name: String,
        literals: Vec<String>,
    },
    Entity(String),
    Collection {
        kind: CollectionKind,
        element: Arc<Type>,
    },
}

impl Type {
    pub fn integer() -> Self {
        Type::Primitive(Primitive::Integer)
    }

    pub fn real() -> Self {
        Type::Primitive(Primitive::Real)
    }

    pub fn boolean() -> Self {
        Type::Primitive(Primitive::Boolean)
    }

    pub fn string() -> Self {
        Type::Primitive(Primitive::String)
    }

    pub fn entity(name: impl Into<String>) -> Self {
        Type::Entity(name.into())
    }

    pub fn set_of(element: Type) -> Self {
        Type::Collection {
            kind: CollectionKind::Set,
            element: Arc::new(element),
        }
    }

    pub fn sequence_of(element: Type) -> Self {
        Type::Collection {
            kind: CollectionKind::Sequence,
            element: Arc::new(element),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Type::Collection { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Primitive(Primitive::Integer) | Type::Primitive(Primitive::Real)
        )
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Boolean))
    }

    /// Element type of a collection, `None` for non-collection types.
    ///
    /// Element types are propagated explicitly: a collection is never
    /// implicitly nested without its element type being spelled out.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Collection { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Type::Collection { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The join of two numeric types: Real absorbs Integer.
    pub fn numeric_join(&self, other: &Type) -> Type {
        if matches!(self, Type::Primitive(Primitive::Real))
            || matches!(other, Type::Primitive(Primitive::Real))
        {
            Type::real()
        } else {
            Type::integer()
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Primitive(Primitive::Integer) => write!(f, "Integer"),
            Type::Primitive(Primitive::Real) => write!(f, "Real"),
            Type::Primitive(Primitive::Boolean) => write!(f, "Boolean"),
            Type::Primitive(Primitive::String) => write!(f, "String"),
            Type::Enumeration { name, .. } => write!(f, "{}", name),
            Type::Entity(name) => write!(f, "{}", name),
            Type::Collection { kind, element } => match kind {
                CollectionKind::Set => write!(f, "Set({})", element),
                CollectionKind::Sequence => write!(f, "Sequence({})", element),
            },
        }
    }
}
