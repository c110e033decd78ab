use crate::common::expr::Expr;
use crate::common::types::Type;
use std::fmt;

/// The synthesized statement tree.
///
/// This is the stable contract between the synthesis engine and every
/// target-language emitter: emitters only render, they never restructure.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Sequence(Vec<Statement>),
    VarDecl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    Loop {
        var: String,
        range: Expr,
        body: Box<Statement>,
    },
    Return(Expr),
    /// Fallback for a postcondition shape the synthesizer has no rule for.
    /// Emitters render it as an explicit placeholder; the constraint is kept
    /// for inspection.
    Unimplemented(Expr),
    Skip,
}

impl Statement {
    pub fn seq(parts: Vec<Statement>) -> Statement {
        Statement::Sequence(parts).normalize()
    }

    pub fn assign(target: Expr, value: Expr) -> Statement {
        Statement::Assign { target, value }
    }

    pub fn if_then(cond: Expr, then_branch: Statement) -> Statement {
        Statement::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: None,
        }
    }

    pub fn if_then_else(cond: Expr, then_branch: Statement, else_branch: Statement) -> Statement {
        Statement::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        }
    }

    pub fn is_skip(&self) -> bool {
        match self {
            Statement::Skip => true,
            Statement::Sequence(parts) => parts.iter().all(Statement::is_skip),
            _ => false,
        }
    }

    /// Flatten nested sequences and drop skips. A singleton sequence
    /// collapses to its element, an empty one to `Skip`.
    pub fn normalize(self) -> Statement {
        match self {
            Statement::Sequence(parts) => {
                let mut flat = Vec::new();
                for part in parts {
                    match part.normalize() {
                        Statement::Skip => {}
                        Statement::Sequence(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                match flat.len() {
                    0 => Statement::Skip,
                    1 => flat.into_iter().next().expect("len checked"),
                    _ => Statement::Sequence(flat),
                }
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => Statement::If {
                cond,
                then_branch: Box::new(then_branch.normalize()),
                else_branch: else_branch.map(|e| Box::new(e.normalize())),
            },
            Statement::Loop { var, range, body } => Statement::Loop {
                var,
                range,
                body: Box::new(body.normalize()),
            },
            other => other,
        }
    }

    /// Every assignment target attribute in the tree, in textual order.
    /// Used by tests to cross-check write-frame inference.
    pub fn assigned_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_assigned(&mut out);
        out
    }

    fn collect_assigned(&self, out: &mut Vec<String>) {
        match self {
            Statement::Sequence(parts) => {
                for p in parts {
                    p.collect_assigned(out);
                }
            }
            Statement::Assign { target, .. } => {
                if let Some(name) = assign_target_name(target) {
                    out.push(name);
                }
            }
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.collect_assigned(out);
                if let Some(e) = else_branch {
                    e.collect_assigned(out);
                }
            }
            Statement::Loop { body, .. } => body.collect_assigned(out),
            _ => {}
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Statement::Sequence(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    part.fmt_indented(f, indent)?;
                }
                Ok(())
            }
            Statement::VarDecl { name, ty, init } => match init {
                Some(e) => write!(f, "{}var {} : {} := {} ;", pad, name, ty, e),
                None => write!(f, "{}var {} : {} ;", pad, name, ty),
            },
            Statement::Assign { target, value } => {
                write!(f, "{}{} := {} ;", pad, target, value)
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
            } => {
                write!(f, "{}if {} {{", pad, cond)?;
                writeln!(f)?;
                then_branch.fmt_indented(f, indent + 1)?;
                writeln!(f)?;
                write!(f, "{}}}", pad)?;
                match else_branch.as_deref() {
                    // else-if chains stay on one line per guard.
                    Some(chained @ Statement::If { .. }) => {
                        write!(f, " else ")?;
                        let mut chain = format!("{}", IndentedChain(chained, indent));
                        if let Some(rest) = chain.strip_prefix(&pad) {
                            chain = rest.to_string();
                        }
                        write!(f, "{}", chain)
                    }
                    Some(other) => {
                        write!(f, " else {{")?;
                        writeln!(f)?;
                        other.fmt_indented(f, indent + 1)?;
                        writeln!(f)?;
                        write!(f, "{}}}", pad)
                    }
                    None => Ok(()),
                }
            }
            Statement::Loop { var, range, body } => {
                write!(f, "{}for {} : {} {{", pad, var, range)?;
                writeln!(f)?;
                body.fmt_indented(f, indent + 1)?;
                writeln!(f)?;
                write!(f, "{}}}", pad)
            }
            Statement::Return(expr) => write!(f, "{}return {} ;", pad, expr),
            Statement::Unimplemented(constraint) => {
                write!(f, "{}/* no synthesis rule for: {} */", pad, constraint)
            }
            Statement::Skip => write!(f, "{}skip ;", pad),
        }
    }
}

struct IndentedChain<'a>(&'a Statement, usize);

impl fmt::Display for IndentedChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_indented(f, self.1)
    }
}

/// The attribute or variable name written by an assignment target.
pub fn assign_target_name(target: &Expr) -> Option<String> {
    use crate::common::expr::ExprNode;
    match &target.node {
        ExprNode::Var(name) => Some(name.clone()),
        ExprNode::Feature { name, .. } => Some(name.clone()),
        _ => None,
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
