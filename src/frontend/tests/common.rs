use crate::frontend::lexer::lexer;
use crate::frontend::{Spanned, Token};
use chumsky::prelude::*;

pub fn lex(src: &str) -> Vec<Spanned<Token<'_>>> {
    lexer().parse(src).into_result().unwrap()
}
