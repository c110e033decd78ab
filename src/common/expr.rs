use crate::common::types::{CollectionKind, Type};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Semantic role of a resolved reference, assigned by the type checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    /// A plain value (literal, arithmetic result, ...).
    Value,
    /// A data attribute of an entity.
    Attribute,
    /// An association role materialized as an attribute.
    Role,
    /// A bound variable (parameter, quantifier variable, local).
    Variable,
    /// A global or enumeration constant.
    Constant,
    /// A free function.
    Function,
    /// A query operation of an entity.
    Query,
    /// An update operation of an entity.
    UpdateOp,
    /// An entity name used as the set of its instances.
    ClassId,
    /// A type name used in a type position.
    TypeRef,
    /// Not yet resolved (pre-checking, or reported as an error).
    Unresolved,
}

/// Literal values.
#[derive(Clone, Debug)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Real(a), Literal::Real(b)) => a.to_bits() == b.to_bits(),
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Str(a), Literal::Str(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Size,
    IsEmpty,
    NotEmpty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Implies,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    Add,
    Sub,
    Mul,
    Div,
    /// Membership: `x : c`
    In,
    /// Non-membership: `x /: c`
    NotIn,
    /// Subset: `s <: c`
    Subset,
    /// Non-subset: `s /<: c`
    NotSubset,
    /// Set union: `s \/ t`
    Union,
    /// Set intersection: `s /\ t`
    Intersect,
    /// Sequence concatenation: `s ^ t`
    Concat,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::Neq
                | BinOp::Lt
                | BinOp::Leq
                | BinOp::Gt
                | BinOp::Geq
                | BinOp::In
                | BinOp::NotIn
                | BinOp::Subset
                | BinOp::NotSubset
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "&",
            BinOp::Or => "or",
            BinOp::Implies => "=>",
            BinOp::Eq => "=",
            BinOp::Neq => "/=",
            BinOp::Lt => "<",
            BinOp::Leq => "<=",
            BinOp::Gt => ">",
            BinOp::Geq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::In => ":",
            BinOp::NotIn => "/:",
            BinOp::Subset => "<:",
            BinOp::NotSubset => "/<:",
            BinOp::Union => "\\/",
            BinOp::Intersect => "/\\",
            BinOp::Concat => "^",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinOp::Implies => 1,
            BinOp::Or => 2,
            BinOp::And => 3,
            BinOp::Eq
            | BinOp::Neq
            | BinOp::Lt
            | BinOp::Leq
            | BinOp::Gt
            | BinOp::Geq
            | BinOp::In
            | BinOp::NotIn
            | BinOp::Subset
            | BinOp::NotSubset => 4,
            BinOp::Add | BinOp::Sub | BinOp::Union | BinOp::Intersect | BinOp::Concat => 5,
            BinOp::Mul | BinOp::Div => 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantifierKind {
    ForAll,
    Exists,
    Select,
    Collect,
}

impl QuantifierKind {
    pub fn keyword(self) -> &'static str {
        match self {
            QuantifierKind::ForAll => "forAll",
            QuantifierKind::Exists => "exists",
            QuantifierKind::Select => "select",
            QuantifierKind::Collect => "collect",
        }
    }
}

/// Structure of a constraint expression.
///
/// Children are reference-counted immutable subtrees. Transformations build
/// new trees; no node is ever mutated after construction, so sharing a
/// subtree between parents is harmless.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprNode {
    Literal(Literal),
    Var(String),
    Feature {
        object: Option<Arc<Expr>>,
        name: String,
        at_pre: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Arc<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Arc<Expr>,
        rhs: Arc<Expr>,
    },
    SetLiteral {
        kind: CollectionKind,
        elements: Vec<Arc<Expr>>,
    },
    Quantified {
        kind: QuantifierKind,
        var: String,
        range: Arc<Expr>,
        body: Arc<Expr>,
    },
}

/// A constraint expression node with its inferred annotations.
///
/// `ty`, `element_ty` and `kind` are filled by the type checker, which
/// returns a freshly annotated tree rather than mutating its input.
#[derive(Clone, Debug)]
pub struct Expr {
    pub node: ExprNode,
    pub ty: Option<Type>,
    pub element_ty: Option<Type>,
    pub kind: RefKind,
}

/// Structural equality: annotations are ignored so that a checked tree
/// compares equal to its unchecked original.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Expr {
    pub fn new(node: ExprNode) -> Self {
        Expr {
            node,
            ty: None,
            element_ty: None,
            kind: RefKind::Unresolved,
        }
    }

    pub fn with_annotations(mut self, ty: Option<Type>, element_ty: Option<Type>, kind: RefKind) -> Self {
        self.ty = ty;
        self.element_ty = element_ty;
        self.kind = kind;
        self
    }

    // Literals

    pub fn int(n: i64) -> Self {
        Expr::new(ExprNode::Literal(Literal::Int(n)))
            .with_annotations(Some(Type::integer()), None, RefKind::Value)
    }

    pub fn real(x: f64) -> Self {
        Expr::new(ExprNode::Literal(Literal::Real(x)))
            .with_annotations(Some(Type::real()), None, RefKind::Value)
    }

    pub fn bool(b: bool) -> Self {
        Expr::new(ExprNode::Literal(Literal::Bool(b)))
            .with_annotations(Some(Type::boolean()), None, RefKind::Value)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::new(ExprNode::Literal(Literal::Str(s.into())))
            .with_annotations(Some(Type::string()), None, RefKind::Value)
    }

    // References

    pub fn var(name: impl Into<String>) -> Self {
        Expr::new(ExprNode::Var(name.into()))
    }

    pub fn feature(object: Option<&Expr>, name: impl Into<String>) -> Self {
        Expr::new(ExprNode::Feature {
            object: object.map(|o| Arc::new(o.clone())),
            name: name.into(),
            at_pre: false,
        })
    }

    pub fn feature_pre(object: Option<&Expr>, name: impl Into<String>) -> Self {
        Expr::new(ExprNode::Feature {
            object: object.map(|o| Arc::new(o.clone())),
            name: name.into(),
            at_pre: true,
        })
    }

    // Combinators: every combinator clones its operands, so no two parents
    // ever hand out the same mutable tree.

    pub fn unary(op: UnaryOp, operand: &Expr) -> Self {
        let ty = match op {
            UnaryOp::Not | UnaryOp::IsEmpty | UnaryOp::NotEmpty => Some(Type::boolean()),
            UnaryOp::Size => Some(Type::integer()),
            UnaryOp::Neg => operand.ty.clone(),
        };
        Expr::new(ExprNode::Unary {
            op,
            operand: Arc::new(operand.clone()),
        })
        .with_annotations(ty, None, RefKind::Value)
    }

    pub fn binary(op: BinOp, lhs: &Expr, rhs: &Expr) -> Self {
        let ty = if op.is_comparison() || matches!(op, BinOp::And | BinOp::Or | BinOp::Implies) {
            Some(Type::boolean())
        } else {
            None
        };
        Expr::new(ExprNode::Binary {
            op,
            lhs: Arc::new(lhs.clone()),
            rhs: Arc::new(rhs.clone()),
        })
        .with_annotations(ty, None, RefKind::Value)
    }

    pub fn and(lhs: &Expr, rhs: &Expr) -> Self {
        Expr::binary(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: &Expr, rhs: &Expr) -> Self {
        Expr::binary(BinOp::Or, lhs, rhs)
    }

    pub fn implies(lhs: &Expr, rhs: &Expr) -> Self {
        Expr::binary(BinOp::Implies, lhs, rhs)
    }

    pub fn eq(lhs: &Expr, rhs: &Expr) -> Self {
        Expr::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn not(operand: &Expr) -> Self {
        Expr::unary(UnaryOp::Not, operand)
    }

    pub fn set_literal(kind: CollectionKind, elements: Vec<Expr>) -> Self {
        Expr::new(ExprNode::SetLiteral {
            kind,
            elements: elements.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn quantified(kind: QuantifierKind, var: impl Into<String>, range: &Expr, body: &Expr) -> Self {
        Expr::new(ExprNode::Quantified {
            kind,
            var: var.into(),
            range: Arc::new(range.clone()),
            body: Arc::new(body.clone()),
        })
    }

    /// Conjoin a list of constraints, `true` for the empty list.
    pub fn conjoin(parts: &[Expr]) -> Expr {
        match parts {
            [] => Expr::bool(true),
            [single] => single.clone(),
            [head, tail @ ..] => {
                let mut acc = head.clone();
                for p in tail {
                    acc = Expr::and(&acc, p);
                }
                acc
            }
        }
    }

    // Shape queries

    pub fn is_true(&self) -> bool {
        matches!(self.node, ExprNode::Literal(Literal::Bool(true)))
    }

    pub fn is_false(&self) -> bool {
        matches!(self.node, ExprNode::Literal(Literal::Bool(false)))
    }

    pub fn as_implication(&self) -> Option<(&Expr, &Expr)> {
        match &self.node {
            ExprNode::Binary {
                op: BinOp::Implies,
                lhs,
                rhs,
            } => Some((lhs, rhs)),
            _ => None,
        }
    }

    /// Flatten a left-associated conjunction into its conjuncts.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match &self.node {
            ExprNode::Binary {
                op: BinOp::And,
                lhs,
                rhs,
            } => {
                let mut parts = lhs.conjuncts();
                parts.extend(rhs.conjuncts());
                parts
            }
            _ => vec![self],
        }
    }

    /// Flatten a left-associated disjunction into its disjuncts.
    pub fn disjuncts(&self) -> Vec<&Expr> {
        match &self.node {
            ExprNode::Binary {
                op: BinOp::Or,
                lhs,
                rhs,
            } => {
                let mut parts = lhs.disjuncts();
                parts.extend(rhs.disjuncts());
                parts
            }
            _ => vec![self],
        }
    }

    /// Free variable names, excluding quantifier-bound occurrences.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_free_vars(&mut vars, &mut BTreeSet::new());
        vars
    }

    fn collect_free_vars(&self, out: &mut BTreeSet<String>, bound: &mut BTreeSet<String>) {
        match &self.node {
            ExprNode::Literal(_) => {}
            ExprNode::Var(name) => {
                if !bound.contains(name) {
                    out.insert(name.clone());
                }
            }
            ExprNode::Feature { object, .. } => {
                if let Some(obj) = object {
                    obj.collect_free_vars(out, bound);
                }
            }
            ExprNode::Unary { operand, .. } => operand.collect_free_vars(out, bound),
            ExprNode::Binary { lhs, rhs, .. } => {
                lhs.collect_free_vars(out, bound);
                rhs.collect_free_vars(out, bound);
            }
            ExprNode::SetLiteral { elements, .. } => {
                for e in elements {
                    e.collect_free_vars(out, bound);
                }
            }
            ExprNode::Quantified {
                var, range, body, ..
            } => {
                range.collect_free_vars(out, bound);
                let fresh = bound.insert(var.clone());
                body.collect_free_vars(out, bound);
                if fresh {
                    bound.remove(var);
                }
            }
        }
    }

    /// Substitute `replacement` for every free occurrence of variable `name`,
    /// returning a new tree. Quantifiers binding `name` shadow it.
    pub fn substitute(&self, name: &str, replacement: &Expr) -> Expr {
        match &self.node {
            ExprNode::Var(v) if v == name => replacement.clone(),
            ExprNode::Literal(_) | ExprNode::Var(_) => self.clone(),
            ExprNode::Feature {
                object,
                name: fname,
                at_pre,
            } => {
                let object = object
                    .as_ref()
                    .map(|o| Arc::new(o.substitute(name, replacement)));
                Expr {
                    node: ExprNode::Feature {
                        object,
                        name: fname.clone(),
                        at_pre: *at_pre,
                    },
                    ..self.clone()
                }
            }
            ExprNode::Unary { op, operand } => Expr {
                node: ExprNode::Unary {
                    op: *op,
                    operand: Arc::new(operand.substitute(name, replacement)),
                },
                ..self.clone()
            },
            ExprNode::Binary { op, lhs, rhs } => Expr {
                node: ExprNode::Binary {
                    op: *op,
                    lhs: Arc::new(lhs.substitute(name, replacement)),
                    rhs: Arc::new(rhs.substitute(name, replacement)),
                },
                ..self.clone()
            },
            ExprNode::SetLiteral { kind, elements } => Expr {
                node: ExprNode::SetLiteral {
                    kind: *kind,
                    elements: elements
                        .iter()
                        .map(|e| Arc::new(e.substitute(name, replacement)))
                        .collect(),
                },
                ..self.clone()
            },
            ExprNode::Quantified {
                kind,
                var,
                range,
                body,
            } => {
                let range = Arc::new(range.substitute(name, replacement));
                let body = if var == name {
                    body.clone()
                } else {
                    Arc::new(body.substitute(name, replacement))
                };
                Expr {
                    node: ExprNode::Quantified {
                        kind: *kind,
                        var: var.clone(),
                        range,
                        body,
                    },
                    ..self.clone()
                }
            }
        }
    }

    /// A zero/empty value of the given type, used when a guarded query
    /// short-circuits instead of running its body.
    pub fn default_for(ty: &Type) -> Expr {
        match ty {
            Type::Primitive(crate::common::types::Primitive::Integer) => Expr::int(0),
            Type::Primitive(crate::common::types::Primitive::Real) => Expr::real(0.0),
            Type::Primitive(crate::common::types::Primitive::Boolean) => Expr::bool(false),
            Type::Primitive(crate::common::types::Primitive::String) => Expr::string(""),
            Type::Enumeration { name, literals } => {
                let lit = literals.first().cloned().unwrap_or_default();
                Expr::var(lit).with_annotations(
                    Some(Type::Enumeration {
                        name: name.clone(),
                        literals: literals.clone(),
                    }),
                    None,
                    RefKind::Constant,
                )
            }
            Type::Entity(_) => {
                Expr::var("null").with_annotations(Some(ty.clone()), None, RefKind::Value)
            }
            Type::Collection { kind, element } => Expr::set_literal(*kind, Vec::new())
                .with_annotations(Some(ty.clone()), Some((**element).clone()), RefKind::Value),
        }
    }

    fn precedence(&self) -> u8 {
        match &self.node {
            ExprNode::Binary { op, .. } => op.precedence(),
            _ => 7,
        }
    }

    fn fmt_child(&self, child: &Expr, f: &mut fmt::Formatter) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.node {
            ExprNode::Literal(Literal::Int(n)) => write!(f, "{}", n),
            ExprNode::Literal(Literal::Real(x)) => write!(f, "{}", x),
            ExprNode::Literal(Literal::Bool(b)) => write!(f, "{}", b),
            ExprNode::Literal(Literal::Str(s)) => write!(f, "\"{}\"", s),
            ExprNode::Var(name) => write!(f, "{}", name),
            ExprNode::Feature {
                object,
                name,
                at_pre,
            } => {
                if let Some(obj) = object {
                    self.fmt_child(obj, f)?;
                    write!(f, ".")?;
                }
                write!(f, "{}", name)?;
                if *at_pre {
                    write!(f, "@pre")?;
                }
                Ok(())
            }
            ExprNode::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "not({})", operand),
                UnaryOp::Neg => {
                    write!(f, "-")?;
                    self.fmt_child(operand, f)
                }
                UnaryOp::Size => {
                    self.fmt_child(operand, f)?;
                    write!(f, "->size()")
                }
                UnaryOp::IsEmpty => {
                    self.fmt_child(operand, f)?;
                    write!(f, "->isEmpty()")
                }
                UnaryOp::NotEmpty => {
                    self.fmt_child(operand, f)?;
                    write!(f, "->notEmpty()")
                }
            },
            ExprNode::Binary { op, lhs, rhs } => {
                self.fmt_child(lhs, f)?;
                write!(f, " {} ", op.symbol())?;
                // Right operand at equal precedence is parenthesized to keep
                // printing and re-parsing left-associative.
                if rhs.precedence() <= self.precedence() {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
            ExprNode::SetLiteral { kind, elements } => {
                match kind {
                    CollectionKind::Set => write!(f, "Set{{")?,
                    CollectionKind::Sequence => write!(f, "Sequence{{")?,
                }
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
            ExprNode::Quantified {
                kind,
                var,
                range,
                body,
            } => {
                self.fmt_child(range, f)?;
                write!(f, "->{}({} | {})", kind.keyword(), var, body)
            }
        }
    }
}
