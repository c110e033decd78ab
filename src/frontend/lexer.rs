use crate::frontend::{Span, Spanned, Token};
use chumsky::prelude::*;

// Lexer
pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<Rich<'src, char, Span>>> {
    // A parser for numeric literals: digits with an optional fractional part
    // (the fractional part is consumed here so it is not left behind as a
    // stray `.`). A literal that does not fit in i64/f64 is a lex error, not
    // a panic.
    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .validate(|s: &str, e, emitter| {
            if s.contains('.') {
                s.parse().map(Token::Real).unwrap_or_else(|err| {
                    emitter.emit(Rich::custom(
                        e.span(),
                        format!("invalid real literal: {}", err),
                    ));
                    Token::Real(0.0)
                })
            } else {
                s.parse().map(Token::Int).unwrap_or_else(|err| {
                    emitter.emit(Rich::custom(
                        e.span(),
                        format!("invalid integer literal: {}", err),
                    ));
                    Token::Int(0)
                })
            }
        });

    // A parser for string literals
    let string = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'))
        .map(Token::Str);

    // A parser for operators, longest first so that `/<:` never lexes as
    // `/` `<` `:`
    let op = choice((
        just("/<:"),
        just("@pre"),
        just("\\/"),
        just("/\\"),
        just("=>"),
        just("/="),
        just("/:"),
        just("<="),
        just(">="),
        just("<:"),
        just("->"),
        just("::"),
        just("="),
        just("<"),
        just(">"),
        just("+"),
        just("-"),
        just("*"),
        just("/"),
        just("^"),
        just("&"),
    ))
    .map(Token::Op);

    // A parser for control characters
    let ctrl = one_of("(){},|.:").map(Token::Ctrl);

    // A parser for identifiers and keywords
    // Note: text::ascii::ident() in chumsky 1.0-alpha doesn't include digits,
    // so we build a custom identifier parser
    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .collect::<String>(),
        )
        .to_slice()
        .map(|ident: &str| match ident {
            "context" => Token::Context,
            "pre" => Token::Pre,
            "post" => Token::Post,
            "static" => Token::Static,
            "query" => Token::Query,
            "Set" => Token::Set,
            "Sequence" => Token::Sequence,
            "true" => Token::True,
            "false" => Token::False,
            "not" => Token::Not,
            "or" => Token::Or,
            _ => Token::Ident(ident),
        });

    let token = number.or(string).or(op).or(ctrl).or(ident);

    let comment = just("//")
        .then(any().and_is(just('\n').not()).repeated())
        .padded();

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded_by(comment.repeated())
        .padded()
        // If we encounter an error, skip and attempt to lex the next character as a token instead
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}
