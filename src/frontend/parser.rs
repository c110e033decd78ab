use crate::common::expr::{BinOp, Expr, QuantifierKind, UnaryOp};
use crate::common::model::{Attribute, BehaviouralFeature};
use crate::common::types::{CollectionKind, Type};
use crate::frontend::{Span, Token};
use chumsky::input::ValueInput;
use chumsky::prelude::*;

/// Constraint expression parser, precedence-climbing from atoms up to
/// implication. Implication is right-associative; everything else binds to
/// the left.
pub fn expr_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    recursive(|expr| {
        let ident = select! { Token::Ident(name) => name.to_string() }.labelled("identifier");

        let literal = select! {
            Token::Int(n) => Expr::int(n),
            Token::Real(x) => Expr::real(x),
            Token::Str(s) => Expr::string(s),
            Token::True => Expr::bool(true),
            Token::False => Expr::bool(false),
        }
        .labelled("literal");

        // Set{1, 2} and Sequence{} literals
        let collection = choice((
            just(Token::Set).to(CollectionKind::Set),
            just(Token::Sequence).to(CollectionKind::Sequence),
        ))
        .then(
            expr.clone()
                .separated_by(just(Token::Ctrl(',')))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::Ctrl('{')), just(Token::Ctrl('}'))),
        )
        .map(|(kind, elements)| Expr::set_literal(kind, elements));

        // not(e) takes a parenthesized argument
        let negation = just(Token::Not)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
            )
            .map(|e| Expr::not(&e));

        // A bare name, optionally read in the before-state
        let name = ident
            .clone()
            .then(just(Token::Op("@pre")).or_not())
            .map(|(name, at_pre)| {
                if at_pre.is_some() {
                    Expr::feature_pre(None, name)
                } else {
                    Expr::var(name)
                }
            });

        let atom = choice((
            literal,
            collection,
            negation,
            expr.clone()
                .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
            name,
        ))
        .boxed();

        // Postfix operators: `.feature[@pre]` navigation and the `->` methods
        #[derive(Clone)]
        enum Postfix {
            Nav(String, bool),
            Quantifier(QuantifierKind, String, Expr),
            Aggregate(UnaryOp),
            Membership(BinOp, Expr),
        }

        let navigation = just(Token::Ctrl('.'))
            .ignore_then(ident.clone())
            .then(just(Token::Op("@pre")).or_not())
            .map(|(name, at_pre)| Postfix::Nav(name, at_pre.is_some()));

        // c->forAll(x | body) and friends
        let quantifier = select! {
            Token::Ident("forAll") => QuantifierKind::ForAll,
            Token::Ident("exists") => QuantifierKind::Exists,
            Token::Ident("select") => QuantifierKind::Select,
            Token::Ident("collect") => QuantifierKind::Collect,
        }
        .then(
            ident
                .clone()
                .then_ignore(just(Token::Ctrl('|')))
                .then(expr.clone())
                .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
        )
        .map(|(kind, (var, body))| Postfix::Quantifier(kind, var, body));

        // c->size(), c->isEmpty(), c->notEmpty()
        let aggregate = select! {
            Token::Ident("size") => UnaryOp::Size,
            Token::Ident("isEmpty") => UnaryOp::IsEmpty,
            Token::Ident("notEmpty") => UnaryOp::NotEmpty,
        }
        .then_ignore(just(Token::Ctrl('(')))
        .then_ignore(just(Token::Ctrl(')')))
        .map(Postfix::Aggregate);

        // c->includes(e) desugars to `e : c`, c->excludes(e) to `e /: c`
        let membership = select! {
            Token::Ident("includes") => BinOp::In,
            Token::Ident("excludes") => BinOp::NotIn,
        }
        .then(
            expr.clone()
                .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
        )
        .map(|(op, element)| Postfix::Membership(op, element));

        let arrow =
            just(Token::Op("->")).ignore_then(choice((quantifier, aggregate, membership)));

        let postfix = atom.foldl(
            choice((navigation, arrow)).repeated(),
            |base, suffix| match suffix {
                Postfix::Nav(name, true) => Expr::feature_pre(Some(&base), name),
                Postfix::Nav(name, false) => Expr::feature(Some(&base), name),
                Postfix::Quantifier(kind, var, body) => Expr::quantified(kind, var, &base, &body),
                Postfix::Aggregate(op) => Expr::unary(op, &base),
                Postfix::Membership(op, element) => Expr::binary(op, &element, &base),
            },
        );

        let unary = just(Token::Op("-"))
            .repeated()
            .foldr(postfix, |_, operand| Expr::unary(UnaryOp::Neg, &operand))
            .boxed();

        let product = unary
            .clone()
            .foldl(
                choice((
                    just(Token::Op("*")).to(BinOp::Mul),
                    just(Token::Op("/")).to(BinOp::Div),
                ))
                .then(unary)
                .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, &lhs, &rhs),
            )
            .boxed();

        // Collection operators sit at the same level as + and -
        let additive = product
            .clone()
            .foldl(
                choice((
                    just(Token::Op("+")).to(BinOp::Add),
                    just(Token::Op("-")).to(BinOp::Sub),
                    just(Token::Op("\\/")).to(BinOp::Union),
                    just(Token::Op("/\\")).to(BinOp::Intersect),
                    just(Token::Op("^")).to(BinOp::Concat),
                ))
                .then(product)
                .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, &lhs, &rhs),
            )
            .boxed();

        let comparison = additive
            .clone()
            .foldl(
                choice((
                    just(Token::Op("=")).to(BinOp::Eq),
                    just(Token::Op("/=")).to(BinOp::Neq),
                    just(Token::Op("<=")).to(BinOp::Leq),
                    just(Token::Op(">=")).to(BinOp::Geq),
                    just(Token::Op("<:")).to(BinOp::Subset),
                    just(Token::Op("/<:")).to(BinOp::NotSubset),
                    just(Token::Op("/:")).to(BinOp::NotIn),
                    just(Token::Ctrl(':')).to(BinOp::In),
                    just(Token::Op("<")).to(BinOp::Lt),
                    just(Token::Op(">")).to(BinOp::Gt),
                ))
                .then(additive)
                .repeated(),
                |lhs, (op, rhs)| Expr::binary(op, &lhs, &rhs),
            )
            .boxed();

        let conjunction = comparison.clone().foldl(
            just(Token::Op("&")).ignore_then(comparison).repeated(),
            |lhs, rhs| Expr::and(&lhs, &rhs),
        );

        let disjunction = conjunction.clone().foldl(
            just(Token::Or).ignore_then(conjunction).repeated(),
            |lhs, rhs| Expr::or(&lhs, &rhs),
        );

        // Right-associative: the consequent is a whole expression again.
        let implication = disjunction
            .then(just(Token::Op("=>")).ignore_then(expr.clone()).or_not())
            .map(|(lhs, rhs)| match rhs {
                Some(rhs) => Expr::implies(&lhs, &rhs),
                None => lhs,
            });

        implication.labelled("expression").as_context()
    })
    .boxed()
}

/// Type annotations: primitives, entity names, Set(T) and Sequence(T).
pub fn type_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Type, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    recursive(|ty| {
        choice((
            just(Token::Set)
                .ignore_then(
                    ty.clone()
                        .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))),
                )
                .map(Type::set_of),
            just(Token::Sequence)
                .ignore_then(ty.delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))))
                .map(Type::sequence_of),
            select! {
                Token::Ident("Integer") => Type::integer(),
                Token::Ident("Real") => Type::real(),
                Token::Ident("Boolean") => Type::boolean(),
                Token::Ident("String") => Type::string(),
                Token::Ident(name) => Type::entity(name),
            },
        ))
        .labelled("type")
    })
    .boxed()
}

/// A single operation specification:
///
/// ```text
/// [static] [query] context Entity::name(params) [: ResultType]
/// (pre: constraint)*
/// (post: constraint)*
/// ```
///
/// Repeated pre/post clauses are conjoined in source order.
pub fn operation_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, BehaviouralFeature, extra::Err<Rich<'tokens, Token<'src>, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let ty = type_parser();
    let expr = expr_parser();

    let parameter = select! { Token::Ident(name) => name.to_string() }
        .then_ignore(just(Token::Ctrl(':')))
        .then(ty.clone())
        .map(|(name, ty)| {
            if ty.is_collection() {
                Attribute::collection(name, ty)
            } else {
                Attribute::new(name, ty)
            }
        })
        .labelled("parameter");

    let parameters = parameter
        .separated_by(just(Token::Ctrl(',')))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')')));

    let pre_clause = just(Token::Pre)
        .ignore_then(just(Token::Ctrl(':')))
        .ignore_then(expr.clone());
    let post_clause = just(Token::Post)
        .ignore_then(just(Token::Ctrl(':')))
        .ignore_then(expr.clone());

    just(Token::Static)
        .or_not()
        .then(just(Token::Query).or_not())
        .then_ignore(just(Token::Context))
        .then(select! { Token::Ident(name) => name.to_string() })
        .then_ignore(just(Token::Op("::")))
        .then(select! { Token::Ident(name) => name.to_string() })
        .then(parameters)
        .then(just(Token::Ctrl(':')).ignore_then(ty).or_not())
        .then(pre_clause.repeated().collect::<Vec<_>>())
        .then(post_clause.repeated().collect::<Vec<_>>())
        .map(
            |(((((((is_static, is_query), owner), name), parameters), result_type), pres), posts)| {
                let mut op = BehaviouralFeature::new(name);
                op.owner = Some(owner);
                op.parameters = parameters;
                op.result_type = result_type;
                op.is_static = is_static.is_some();
                op.is_query = is_query.is_some();
                op.precondition = (!pres.is_empty()).then(|| Expr::conjoin(&pres));
                op.postcondition = (!posts.is_empty()).then(|| Expr::conjoin(&posts));
                op
            },
        )
        .labelled("operation specification")
        .as_context()
        .boxed()
}

/// A whole specification file: a sequence of operation specifications.
pub fn spec_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Vec<BehaviouralFeature>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    operation_parser()
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .boxed()
}
