//! Surface syntax of the constraint language: lexer and parsers.
//!
//! Operation specifications are written as
//!
//! ```text
//! context Account::deposit(amount : Integer)
//! pre: amount > 0
//! post: balance = balance@pre + amount
//! ```
//!
//! The lexer produces a spanned token stream; the parsers turn it into the
//! unannotated `Expr`/`BehaviouralFeature` values that the checker and the
//! synthesizer consume. Parse errors are `Rich` values carrying source spans.

pub mod lexer;
pub mod parser;

#[cfg(test)]
mod tests;

use crate::common::expr::Expr;
use crate::common::model::BehaviouralFeature;
use chumsky::prelude::*;
use std::fmt;

pub type Span = SimpleSpan<usize>;
pub type Spanned<T> = (T, Span);

pub use lexer::lexer;
pub use parser::{expr_parser, spec_parser};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token<'src> {
    Int(i64),
    Real(f64),
    Str(&'src str),
    Ident(&'src str),
    Op(&'src str),
    Ctrl(char),
    // Keywords
    Context,
    Pre,
    Post,
    Static,
    Query,
    Set,
    Sequence,
    True,
    False,
    Not,
    Or,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Real(x) => write!(f, "{x}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Op(s) => write!(f, "{s}"),
            Token::Ctrl(c) => write!(f, "{c}"),
            Token::Context => write!(f, "context"),
            Token::Pre => write!(f, "pre"),
            Token::Post => write!(f, "post"),
            Token::Static => write!(f, "static"),
            Token::Query => write!(f, "query"),
            Token::Set => write!(f, "Set"),
            Token::Sequence => write!(f, "Sequence"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Not => write!(f, "not"),
            Token::Or => write!(f, "or"),
        }
    }
}

/// A lex or parse failure, already rendered against the source text.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for SyntaxError {}

fn collect_errors<T: fmt::Display>(errors: Vec<Rich<'_, T, Span>>) -> Vec<SyntaxError> {
    errors
        .into_iter()
        .map(|e| SyntaxError {
            span: *e.span(),
            message: e.to_string(),
        })
        .collect()
}

/// Lex and parse a whole specification file into operation specifications.
pub fn parse_spec(src: &str) -> Result<Vec<BehaviouralFeature>, Vec<SyntaxError>> {
    let (tokens, lex_errors) = lexer().parse(src).into_output_errors();
    let mut errors = collect_errors(lex_errors);
    let Some(tokens) = tokens else {
        return Err(errors);
    };

    let (ops, parse_errors) = spec_parser()
        .parse(
            tokens
                .as_slice()
                .map((src.len()..src.len()).into(), |(t, s)| (t, s)),
        )
        .into_output_errors();
    errors.extend(collect_errors(parse_errors));

    match ops {
        Some(ops) if errors.is_empty() => Ok(ops),
        _ => Err(errors),
    }
}

/// Lex and parse a single constraint expression.
pub fn parse_constraint(src: &str) -> Result<Expr, Vec<SyntaxError>> {
    let (tokens, lex_errors) = lexer().parse(src).into_output_errors();
    let mut errors = collect_errors(lex_errors);
    let Some(tokens) = tokens else {
        return Err(errors);
    };

    let (expr, parse_errors) = expr_parser()
        .then_ignore(end())
        .parse(
            tokens
                .as_slice()
                .map((src.len()..src.len()).into(), |(t, s)| (t, s)),
        )
        .into_output_errors();
    errors.extend(collect_errors(parse_errors));

    match expr {
        Some(expr) if errors.is_empty() => Ok(expr),
        _ => Err(errors),
    }
}
