//! Lowering from the surface AST to the JavaScript output tree.

use crate::ast::{Expr, Module, Stmt};
use crate::error::CoreError;
use crate::js::ast::{
    JsExpr, JsFunction, JsLiteral, JsParameter, JsProgram, JsStmt, JsVar, PropertyInitializer,
    PropertyKey,
};
use crate::js::ops::{BinaryOp, UnaryOp};

pub fn lower_module(module: &Module) -> Result<JsProgram, CoreError> {
    let statements = module
        .stmts
        .iter()
        .map(lower_stmt)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(JsProgram::new(statements))
}

fn lower_stmt(stmt: &Stmt) -> Result<JsStmt, CoreError> {
    match stmt {
        Stmt::Let { name, value } => {
            check_binding(name)?;
            Ok(JsStmt::Vars(vec![JsVar {
                name: name.clone(),
                init: Some(lower_expr(value)?),
            }]))
        }
        Stmt::Expr(expr) => Ok(JsStmt::Expr(lower_expr(expr)?)),
    }
}

pub fn lower_expr(expr: &Expr) -> Result<JsExpr, CoreError> {
    match expr {
        Expr::Number(value) => Ok(JsExpr::number(*value)),
        Expr::Str(value) => Ok(JsExpr::string(value.clone())),
        Expr::Bool(value) => Ok(JsExpr::boolean(*value)),
        Expr::Null => Ok(JsExpr::Literal(JsLiteral::Null)),
        Expr::This => Ok(JsExpr::This),
        Expr::Ident(name) => {
            check_binding(name)?;
            Ok(JsExpr::name(name.clone()))
        }
        Expr::List(items) => Ok(JsExpr::ArrayLiteral(lower_all(items)?)),
        Expr::Object(entries) => {
            let props = entries
                .iter()
                .map(|(key, value)| -> Result<PropertyInitializer, CoreError> {
                    Ok(PropertyInitializer {
                        key: property_key(key),
                        value: lower_expr(value)?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JsExpr::ObjectLiteral(props))
        }
        Expr::Call { name, args } => lower_call(name, args),
    }
}

fn lower_call(name: &str, args: &[Expr]) -> Result<JsExpr, CoreError> {
    if let Some(op) = binary_operator(name) {
        let [lhs, rhs] = operands::<2>(name, args)?;
        return Ok(JsExpr::binary(op, lower_expr(lhs)?, lower_expr(rhs)?));
    }
    if let Some(op) = unary_operator(name) {
        let [arg] = operands::<1>(name, args)?;
        return Ok(JsExpr::prefix(op, lower_expr(arg)?));
    }

    match name {
        "if" => {
            let [test, then_expr, else_expr] = operands::<3>(name, args)?;
            Ok(JsExpr::conditional(
                lower_expr(test)?,
                lower_expr(then_expr)?,
                lower_expr(else_expr)?,
            ))
        }
        "set" => {
            let [target, value] = operands::<2>(name, args)?;
            let target = lower_expr(target)?;
            if !target.is_assignable() {
                return Err(CoreError::SemanticError(
                    "'set' needs a variable, 'get' or 'index' as its target".to_string(),
                ));
            }
            Ok(JsExpr::binary(BinaryOp::Asg, target, lower_expr(value)?))
        }
        "get" => {
            let [object, property] = operands::<2>(name, args)?;
            let object = lower_expr(object)?;
            match property {
                Expr::Ident(prop) => Ok(JsExpr::member(object, prop.clone())),
                Expr::Str(prop) if is_identifier(prop) => Ok(JsExpr::member(object, prop.clone())),
                Expr::Str(prop) => Ok(JsExpr::ArrayAccess {
                    array: Box::new(object),
                    index: Box::new(JsExpr::string(prop.clone())),
                }),
                _ => Err(CoreError::SemanticError(
                    "'get' expects a property name".to_string(),
                )),
            }
        }
        "index" => {
            let [array, index] = operands::<2>(name, args)?;
            Ok(JsExpr::ArrayAccess {
                array: Box::new(lower_expr(array)?),
                index: Box::new(lower_expr(index)?),
            })
        }
        "call" => {
            let [callee, list] = operands::<2>(name, args)?;
            Ok(JsExpr::call(lower_expr(callee)?, argument_list(name, list)?))
        }
        "new" => {
            let [ctor, list] = operands::<2>(name, args)?;
            Ok(JsExpr::New {
                ctor: Box::new(lower_expr(ctor)?),
                args: argument_list(name, list)?,
            })
        }
        "fn" => {
            let [params, body] = operands::<2>(name, args)?;
            let Expr::List(params) = params else {
                return Err(CoreError::SemanticError(
                    "'fn' expects a parameter list".to_string(),
                ));
            };
            let params = params
                .iter()
                .map(|param| -> Result<JsParameter, CoreError> {
                    match param {
                        Expr::Ident(name) => {
                            check_binding(name)?;
                            Ok(JsParameter { name: name.clone() })
                        }
                        _ => Err(CoreError::SemanticError(
                            "function parameters must be names".to_string(),
                        )),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JsExpr::Function(Box::new(JsFunction {
                name: None,
                params,
                body: vec![JsStmt::Return(Some(lower_expr(body)?))],
            })))
        }
        _ => Err(CoreError::SemanticError(format!(
            "unknown operator '{name}'"
        ))),
    }
}

fn binary_operator(name: &str) -> Option<BinaryOp> {
    let op = match name {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "div" => BinaryOp::Div,
        "mod" => BinaryOp::Mod,
        "lt" => BinaryOp::Lt,
        "le" => BinaryOp::Lte,
        "gt" => BinaryOp::Gt,
        "ge" => BinaryOp::Gte,
        "eq" => BinaryOp::StrictEq,
        "ne" => BinaryOp::StrictNeq,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        "bit_and" => BinaryOp::BitAnd,
        "bit_or" => BinaryOp::BitOr,
        "bit_xor" => BinaryOp::BitXor,
        "bit_shl" => BinaryOp::Shl,
        "bit_shr" => BinaryOp::Shr,
        _ => return None,
    };
    Some(op)
}

fn unary_operator(name: &str) -> Option<UnaryOp> {
    let op = match name {
        "neg" => UnaryOp::Neg,
        "not" => UnaryOp::Not,
        "bit_not" => UnaryOp::BitNot,
        "typeof" => UnaryOp::TypeOf,
        _ => return None,
    };
    Some(op)
}

fn operands<'a, const N: usize>(name: &str, args: &'a [Expr]) -> Result<&'a [Expr; N], CoreError> {
    args.try_into().map_err(|_| {
        CoreError::SemanticError(format!(
            "'{name}' takes {N} operands, got {}",
            args.len()
        ))
    })
}

fn argument_list(name: &str, list: &Expr) -> Result<Vec<JsExpr>, CoreError> {
    match list {
        Expr::List(items) => lower_all(items),
        _ => Err(CoreError::SemanticError(format!(
            "'{name}' expects its arguments as a [list]"
        ))),
    }
}

fn lower_all(items: &[Expr]) -> Result<Vec<JsExpr>, CoreError> {
    items.iter().map(lower_expr).collect()
}

fn property_key(key: &str) -> PropertyKey {
    if is_identifier(key) {
        PropertyKey::Ident(key.to_string())
    } else {
        PropertyKey::String(key.to_string())
    }
}

fn check_binding(name: &str) -> Result<(), CoreError> {
    if is_js_reserved(name) {
        return Err(CoreError::SemanticError(format!(
            "'{name}' is a reserved word in JavaScript"
        )));
    }
    Ok(())
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !is_js_reserved(text)
}

fn is_js_reserved(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "enum"
            | "export"
            | "extends"
            | "finally"
            | "for"
            | "function"
            | "import"
            | "in"
            | "instanceof"
            | "return"
            | "super"
            | "switch"
            | "throw"
            | "try"
            | "var"
            | "void"
            | "while"
            | "with"
    )
}
