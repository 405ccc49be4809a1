use crate::ast::{Expr, Module, Stmt};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, lex};

/// Deepest expression nesting accepted before parsing gives up.
pub const MAX_NESTING: usize = 256;

pub fn parse(input: &str) -> Result<Module, CoreError> {
    let tokens = lex(input)?;
    let mut position = 0;
    let mut stmts = Vec::new();
    while position < tokens.len() {
        if matches!(tokens[position].kind, TokenKind::Semi) {
            position += 1;
            continue;
        }
        stmts.push(parse_stmt(&tokens, &mut position)?);
        match tokens.get(position) {
            None => {}
            Some(Token {
                kind: TokenKind::Semi,
                ..
            }) => position += 1,
            Some(token) => {
                return Err(CoreError::ParseError(format!(
                    "expected ';' between statements at byte {}",
                    token.position
                )));
            }
        }
    }
    Ok(Module { stmts })
}

/// Parses a single expression, rejecting anything after it.
pub fn parse_expression(input: &str) -> Result<Expr, CoreError> {
    let tokens = lex(input)?;
    let mut position = 0;
    let expr = parse_expr(&tokens, &mut position)?;
    if position != tokens.len() {
        return Err(CoreError::ParseError(
            "unexpected trailing input".to_string(),
        ));
    }
    Ok(expr)
}

fn parse_stmt(tokens: &[Token], position: &mut usize) -> Result<Stmt, CoreError> {
    if let Some(TokenKind::Ident(word)) = tokens.get(*position).map(|t| &t.kind) {
        if word == "let" {
            *position += 1;
            let name = expect_ident(tokens, position, "variable name after 'let'")?;
            if is_reserved(&name) {
                return Err(CoreError::SemanticError(format!(
                    "'{name}' cannot be used as a variable name"
                )));
            }
            let value = parse_expr(tokens, position)?;
            return Ok(Stmt::Let { name, value });
        }
    }
    Ok(Stmt::Expr(parse_expr(tokens, position)?))
}

fn parse_expr(tokens: &[Token], position: &mut usize) -> Result<Expr, CoreError> {
    parse_nested(tokens, position, 0)
}

fn parse_nested(tokens: &[Token], position: &mut usize, depth: usize) -> Result<Expr, CoreError> {
    let token = tokens
        .get(*position)
        .ok_or_else(|| CoreError::ParseError("unexpected end of input".to_string()))?;
    if depth >= MAX_NESTING {
        return Err(CoreError::ParseError(format!(
            "expression nested more than {MAX_NESTING} levels deep at byte {}",
            token.position
        )));
    }
    *position += 1;
    match &token.kind {
        TokenKind::Number(value) => Ok(Expr::Number(*value)),
        TokenKind::Str(value) => Ok(Expr::Str(value.clone())),
        TokenKind::LParen => {
            let expr = parse_nested(tokens, position, depth + 1)?;
            expect(tokens, position, TokenKind::RParen, "')'")?;
            Ok(expr)
        }
        TokenKind::LBracket => {
            let mut items = Vec::new();
            while !at(tokens, *position, &TokenKind::RBracket) {
                items.push(parse_nested(tokens, position, depth + 1)?);
            }
            expect(tokens, position, TokenKind::RBracket, "']'")?;
            Ok(Expr::List(items))
        }
        TokenKind::LBrace => {
            let mut entries = Vec::new();
            while !at(tokens, *position, &TokenKind::RBrace) {
                let key = match tokens.get(*position).map(|t| &t.kind) {
                    Some(TokenKind::Ident(key)) | Some(TokenKind::Str(key)) => key.clone(),
                    Some(_) => {
                        return Err(CoreError::ParseError(format!(
                            "object key must be a name or string at byte {}",
                            tokens[*position].position
                        )));
                    }
                    None => break,
                };
                *position += 1;
                let value = parse_nested(tokens, position, depth + 1)?;
                entries.push((key, value));
            }
            expect(tokens, position, TokenKind::RBrace, "'}'")?;
            Ok(Expr::Object(entries))
        }
        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Semi => Err(
            CoreError::ParseError(format!("unexpected token at byte {}", token.position)),
        ),
        TokenKind::Ident(name) => match name.as_str() {
            "true" => Ok(Expr::Bool(true)),
            "false" => Ok(Expr::Bool(false)),
            "null" => Ok(Expr::Null),
            "this" => Ok(Expr::This),
            "let" => Err(CoreError::ParseError(
                "'let' is only allowed at the start of a statement".to_string(),
            )),
            _ => match operator_arity(name) {
                Some(arity) => {
                    let mut args = Vec::with_capacity(arity);
                    for _ in 0..arity {
                        let arg = parse_nested(tokens, position, depth + 1)?;
                        args.push(arg);
                    }
                    Ok(Expr::Call {
                        name: name.clone(),
                        args,
                    })
                }
                None => Ok(Expr::Ident(name.clone())),
            },
        },
    }
}

/// Whether the next token closes a bracketed sequence. Running out of
/// tokens first is reported as an unterminated sequence.
fn at(tokens: &[Token], position: usize, kind: &TokenKind) -> bool {
    tokens.get(position).is_none_or(|t| &t.kind == kind)
}

fn expect(
    tokens: &[Token],
    position: &mut usize,
    kind: TokenKind,
    what: &str,
) -> Result<(), CoreError> {
    match tokens.get(*position) {
        Some(token) if token.kind == kind => {
            *position += 1;
            Ok(())
        }
        Some(token) => Err(CoreError::ParseError(format!(
            "expected {what} at byte {}",
            token.position
        ))),
        None => Err(CoreError::ParseError(format!(
            "expected {what} before end of input"
        ))),
    }
}

fn expect_ident(tokens: &[Token], position: &mut usize, what: &str) -> Result<String, CoreError> {
    match tokens.get(*position).map(|t| &t.kind) {
        Some(TokenKind::Ident(name)) => {
            *position += 1;
            Ok(name.clone())
        }
        _ => Err(CoreError::ParseError(format!("expected {what}"))),
    }
}

/// Number of operands taken by each prefix operator.
pub fn operator_arity(name: &str) -> Option<usize> {
    match name {
        "add" | "sub" | "mul" | "div" | "mod" | "lt" | "le" | "gt" | "ge" | "eq" | "ne"
        | "and" | "or" | "bit_and" | "bit_or" | "bit_xor" | "bit_shl" | "bit_shr" => Some(2),
        "set" | "get" | "index" | "call" | "new" | "fn" => Some(2),
        "neg" | "not" | "bit_not" | "typeof" => Some(1),
        "if" => Some(3),
        _ => None,
    }
}

fn is_reserved(name: &str) -> bool {
    operator_arity(name).is_some() || matches!(name, "let" | "true" | "false" | "null" | "this")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_nesting_depth() {
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = parse_expression(&deep).unwrap_err();
        assert!(matches!(err, CoreError::ParseError(message) if message.contains("nested")));

        let negations = format!("{}x", "neg ".repeat(MAX_NESTING));
        assert!(matches!(parse_expression(&negations), Err(CoreError::ParseError(_))));

        let fits = format!("{}x", "neg ".repeat(MAX_NESTING - 1));
        assert!(parse_expression(&fits).is_ok());
    }

    #[test]
    fn parses_simple_expression() {
        let expr = parse_expression("add 1 2").expect("parse");
        assert!(expr.is_call("add"));
    }

    #[test]
    fn parses_nested_expression_with_parens() {
        let expr = parse_expression("add 1 (mul 2 3)").expect("parse");
        if let Expr::Call { name, args } = expr {
            assert_eq!(name, "add");
            assert_eq!(args.len(), 2);
            assert!(args[1].is_call("mul"));
        } else {
            panic!("unexpected variant");
        }
    }

    #[test]
    fn unknown_names_are_identifiers() {
        assert_eq!(
            parse_expression("foo").expect("parse"),
            Expr::Ident("foo".to_string())
        );
    }

    #[test]
    fn rejects_trailing_tokens() {
        let err = parse_expression("add 1 2 3").unwrap_err();
        assert!(matches!(err, CoreError::ParseError(_)));
    }

    #[test]
    fn parses_statements() {
        let module = parse("let x 1; let y (add x 2);\n call log [y];").expect("parse");
        assert_eq!(module.stmts.len(), 3);
        assert!(matches!(&module.stmts[0], Stmt::Let { name, .. } if name == "x"));
        assert!(matches!(&module.stmts[2], Stmt::Expr(e) if e.is_call("call")));
    }

    #[test]
    fn parses_lists_and_objects() {
        let expr = parse_expression("{name \"n\" \"two words\" [1 true null]}").expect("parse");
        let Expr::Object(entries) = expr else {
            panic!("expected object");
        };
        assert_eq!(entries[0], ("name".to_string(), Expr::Str("n".to_string())));
        assert_eq!(
            entries[1].1,
            Expr::List(vec![Expr::Number(1.0), Expr::Bool(true), Expr::Null])
        );
    }

    #[test]
    fn requires_separators_between_statements() {
        let err = parse("let x 1 let y 2").unwrap_err();
        assert!(matches!(err, CoreError::ParseError(_)));
    }

    #[test]
    fn rejects_unterminated_list() {
        assert!(matches!(
            parse_expression("[1 2"),
            Err(CoreError::ParseError(_))
        ));
    }

    #[test]
    fn rejects_operator_as_variable_name() {
        assert!(matches!(parse("let add 1"), Err(CoreError::SemanticError(_))));
    }

    #[test]
    fn empty_statements_are_skipped() {
        assert!(parse(";;").expect("parse").stmts.is_empty());
    }
}
