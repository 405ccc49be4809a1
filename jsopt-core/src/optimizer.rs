//! Constant folding over the JavaScript output tree.
//!
//! Folds are applied bottom-up so that a folded operand can enable a fold
//! in its parent. A fold whose numeric result is NaN, infinite or negative
//! zero is skipped: those values have no literal spelling.

use std::mem;

use jsopt_trace::TraceLogger;

use crate::compiler::FOLD;
use crate::error::CoreError;
use crate::js::ast::{ForInit, JsExpr, JsLiteral, JsProgram, JsStmt, JsVar, SwitchMember};
use crate::js::ops::{BinaryOp, UnaryOp};

/// Folds constants in place and returns the number of folds applied.
pub fn optimize(program: &mut JsProgram, logger: &TraceLogger) -> Result<usize, CoreError> {
    let mut folder = Folder { logger, folds: 0 };
    folder.stmts(&mut program.statements)?;
    Ok(folder.folds)
}

enum Outcome {
    Folded { expr: JsExpr, rule: &'static str },
    Kept(JsExpr),
}

struct Folder<'a> {
    logger: &'a TraceLogger,
    folds: usize,
}

impl Folder<'_> {
    fn stmts(&mut self, stmts: &mut [JsStmt]) -> Result<(), CoreError> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut JsStmt) -> Result<(), CoreError> {
        match stmt {
            JsStmt::Block(stmts) => self.stmts(stmts)?,
            JsStmt::Expr(expr) | JsStmt::Throw(expr) => self.expr(expr)?,
            JsStmt::Vars(vars) => {
                for var in vars {
                    if let Some(init) = &mut var.init {
                        self.expr(init)?;
                    }
                }
            }
            JsStmt::If {
                test,
                then_stmt,
                else_stmt,
            } => {
                self.expr(test)?;
                self.stmt(then_stmt)?;
                if let Some(else_stmt) = else_stmt {
                    self.stmt(else_stmt)?;
                }
                if let Some(taken) = test.as_literal().and_then(truthiness) {
                    let event = self.logger.start(FOLD, &["rule", "if"])?;
                    if let JsStmt::If {
                        then_stmt,
                        else_stmt,
                        ..
                    } = mem::replace(stmt, JsStmt::Empty)
                    {
                        let (kept, dropped) = if taken {
                            (*then_stmt, else_stmt)
                        } else {
                            (else_stmt.map_or(JsStmt::Empty, |s| *s), Some(then_stmt))
                        };
                        let mut hoisted = Vec::new();
                        if let Some(dropped) = &dropped {
                            var_names(dropped, &mut hoisted);
                        }
                        *stmt = with_declarations(kept, hoisted);
                    }
                    self.folds += 1;
                    event.end(&[])?;
                }
            }
            JsStmt::While { test, body } | JsStmt::DoWhile { body, test } => {
                self.expr(test)?;
                self.stmt(body)?;
            }
            JsStmt::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(ForInit::Vars(vars)) => {
                        for var in vars {
                            if let Some(init) = &mut var.init {
                                self.expr(init)?;
                            }
                        }
                    }
                    Some(ForInit::Expr(expr)) => self.expr(expr)?,
                    None => {}
                }
                if let Some(test) = test {
                    self.expr(test)?;
                }
                if let Some(update) = update {
                    self.expr(update)?;
                }
                self.stmt(body)?;
            }
            JsStmt::ForIn { object, body, .. } => {
                self.expr(object)?;
                self.stmt(body)?;
            }
            JsStmt::Switch {
                discriminant,
                members,
            } => {
                self.expr(discriminant)?;
                for member in members {
                    match member {
                        SwitchMember::Case { test, body } => {
                            self.expr(test)?;
                            self.stmts(body)?;
                        }
                        SwitchMember::Default { body } => self.stmts(body)?,
                    }
                }
            }
            JsStmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value)?;
                }
            }
            JsStmt::Try {
                body,
                catch,
                finally,
            } => {
                self.stmts(body)?;
                if let Some(catch) = catch {
                    self.stmts(&mut catch.body)?;
                }
                if let Some(finally) = finally {
                    self.stmts(finally)?;
                }
            }
            JsStmt::Label { body, .. } => self.stmt(body)?,
            JsStmt::Break(_) | JsStmt::Continue(_) | JsStmt::Empty => {}
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut JsExpr) -> Result<(), CoreError> {
        match expr {
            JsExpr::Binary { lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
            }
            JsExpr::Prefix { arg, .. } | JsExpr::Postfix { arg, .. } => self.expr(arg)?,
            JsExpr::Conditional {
                test,
                then_expr,
                else_expr,
            } => {
                self.expr(test)?;
                self.expr(then_expr)?;
                self.expr(else_expr)?;
            }
            JsExpr::NameRef { qualifier, .. } => {
                if let Some(qualifier) = qualifier {
                    self.expr(qualifier)?;
                }
            }
            JsExpr::Invocation { callee: target, args } | JsExpr::New { ctor: target, args } => {
                self.expr(target)?;
                for arg in args {
                    self.expr(arg)?;
                }
            }
            JsExpr::ArrayAccess { array, index } => {
                self.expr(array)?;
                self.expr(index)?;
            }
            JsExpr::ArrayLiteral(items) => {
                for item in items {
                    self.expr(item)?;
                }
            }
            JsExpr::ObjectLiteral(props) => {
                for prop in props {
                    self.expr(&mut prop.value)?;
                }
            }
            JsExpr::Function(function) => self.stmts(&mut function.body)?,
            JsExpr::Literal(_) | JsExpr::This => return Ok(()),
        }

        let taken = mem::replace(expr, JsExpr::This);
        match fold(taken) {
            Outcome::Folded { expr: folded, rule } => {
                let event = self.logger.start(FOLD, &["rule", rule])?;
                *expr = folded;
                self.folds += 1;
                event.end(&[])?;
            }
            Outcome::Kept(original) => *expr = original,
        }
        Ok(())
    }
}

/// Names a `var` inside `stmt` declares for its enclosing function.
/// Function expressions have their own scope and are not entered.
fn var_names(stmt: &JsStmt, out: &mut Vec<String>) {
    let declare = |name: &str, out: &mut Vec<String>| {
        if !out.iter().any(|known| known == name) {
            out.push(name.to_string());
        }
    };
    match stmt {
        JsStmt::Vars(vars) => {
            for var in vars {
                declare(&var.name, out);
            }
        }
        JsStmt::Block(stmts) => stmts.iter().for_each(|stmt| var_names(stmt, out)),
        JsStmt::If {
            then_stmt,
            else_stmt,
            ..
        } => {
            var_names(then_stmt, out);
            if let Some(else_stmt) = else_stmt {
                var_names(else_stmt, out);
            }
        }
        JsStmt::For { init, body, .. } => {
            if let Some(ForInit::Vars(vars)) = init {
                for var in vars {
                    declare(&var.name, out);
                }
            }
            var_names(body, out);
        }
        JsStmt::ForIn { var, body, .. } => {
            declare(var, out);
            var_names(body, out);
        }
        JsStmt::While { body, .. } | JsStmt::DoWhile { body, .. } | JsStmt::Label { body, .. } => {
            var_names(body, out)
        }
        JsStmt::Switch { members, .. } => {
            for member in members {
                let (SwitchMember::Case { body, .. } | SwitchMember::Default { body }) = member;
                body.iter().for_each(|stmt| var_names(stmt, out));
            }
        }
        JsStmt::Try {
            body,
            catch,
            finally,
        } => {
            let catch_body = catch.iter().flat_map(|catch| catch.body.iter());
            let finally_body = finally.iter().flatten();
            for stmt in body.iter().chain(catch_body).chain(finally_body) {
                var_names(stmt, out);
            }
        }
        JsStmt::Expr(_)
        | JsStmt::Break(_)
        | JsStmt::Continue(_)
        | JsStmt::Return(_)
        | JsStmt::Throw(_)
        | JsStmt::Empty => {}
    }
}

/// `kept`, preceded by initializer-free declarations of `names`.
fn with_declarations(kept: JsStmt, names: Vec<String>) -> JsStmt {
    if names.is_empty() {
        return kept;
    }
    let declarations = JsStmt::Vars(
        names
            .into_iter()
            .map(|name| JsVar { name, init: None })
            .collect(),
    );
    match kept {
        JsStmt::Empty => declarations,
        kept => JsStmt::Block(vec![declarations, kept]),
    }
}

/// A property reference. Moving one out of `(0, a.f)()` or `(x && a.f)()`
/// would change the `this` of the call.
fn is_property_reference(expr: &JsExpr) -> bool {
    matches!(
        expr,
        JsExpr::NameRef {
            qualifier: Some(_),
            ..
        } | JsExpr::ArrayAccess { .. }
    )
}

fn fold(expr: JsExpr) -> Outcome {
    match expr {
        JsExpr::Binary { op, lhs, rhs } => {
            if let (JsExpr::Literal(a), JsExpr::Literal(b)) = (lhs.as_ref(), rhs.as_ref()) {
                if let Some(result) = fold_binary(op, a, b) {
                    return Outcome::Folded {
                        expr: JsExpr::Literal(result),
                        rule: op.symbol(),
                    };
                }
            }
            if matches!(op, BinaryOp::And | BinaryOp::Or) {
                if let Some(truthy) = lhs.as_literal().and_then(truthiness) {
                    // `&&` keeps a falsy left side, `||` a truthy one
                    let keep_left = truthy == (op == BinaryOp::Or);
                    if keep_left || !is_property_reference(&rhs) {
                        return Outcome::Folded {
                            expr: if keep_left { *lhs } else { *rhs },
                            rule: op.symbol(),
                        };
                    }
                }
            }
            if op == BinaryOp::Comma && !lhs.has_side_effects() && !is_property_reference(&rhs) {
                return Outcome::Folded {
                    expr: *rhs,
                    rule: op.symbol(),
                };
            }
            Outcome::Kept(JsExpr::Binary { op, lhs, rhs })
        }
        JsExpr::Prefix {
            op: UnaryOp::Not,
            arg,
        } => match arg.as_literal().and_then(truthiness) {
            Some(truthy) => Outcome::Folded {
                expr: JsExpr::boolean(!truthy),
                rule: "!",
            },
            None => Outcome::Kept(JsExpr::Prefix {
                op: UnaryOp::Not,
                arg,
            }),
        },
        JsExpr::Conditional {
            test,
            then_expr,
            else_expr,
        } => match test.as_literal().and_then(truthiness) {
            Some(truthy) => Outcome::Folded {
                expr: if truthy { *then_expr } else { *else_expr },
                rule: "?:",
            },
            None => Outcome::Kept(JsExpr::Conditional {
                test,
                then_expr,
                else_expr,
            }),
        },
        other => Outcome::Kept(other),
    }
}

fn fold_binary(op: BinaryOp, lhs: &JsLiteral, rhs: &JsLiteral) -> Option<JsLiteral> {
    use BinaryOp::*;
    match (lhs, rhs) {
        (JsLiteral::Number(a), JsLiteral::Number(b)) => {
            let (a, b) = (*a, *b);
            if a.is_nan() || b.is_nan() {
                return None;
            }
            let value = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a / b,
                Mod => a % b,
                BitAnd => f64::from(to_int32(a) & to_int32(b)),
                BitOr => f64::from(to_int32(a) | to_int32(b)),
                BitXor => f64::from(to_int32(a) ^ to_int32(b)),
                Shl => f64::from(to_int32(a).wrapping_shl(shift_count(b))),
                Shr => f64::from(to_int32(a) >> shift_count(b)),
                ShrU => f64::from(to_uint32(a) >> shift_count(b)),
                Lt => return Some(JsLiteral::Boolean(a < b)),
                Lte => return Some(JsLiteral::Boolean(a <= b)),
                Gt => return Some(JsLiteral::Boolean(a > b)),
                Gte => return Some(JsLiteral::Boolean(a >= b)),
                Eq | StrictEq => return Some(JsLiteral::Boolean(a == b)),
                Neq | StrictNeq => return Some(JsLiteral::Boolean(a != b)),
                _ => return None,
            };
            representable(value).then_some(JsLiteral::Number(value))
        }
        (JsLiteral::String(a), JsLiteral::String(b)) => match op {
            Add => Some(JsLiteral::String(format!("{a}{b}"))),
            Eq | StrictEq => Some(JsLiteral::Boolean(a == b)),
            Neq | StrictNeq => Some(JsLiteral::Boolean(a != b)),
            _ => None,
        },
        (JsLiteral::Boolean(a), JsLiteral::Boolean(b)) => match op {
            Eq | StrictEq => Some(JsLiteral::Boolean(a == b)),
            Neq | StrictNeq => Some(JsLiteral::Boolean(a != b)),
            _ => None,
        },
        (JsLiteral::Null, JsLiteral::Null) => match op {
            Eq | StrictEq => Some(JsLiteral::Boolean(true)),
            Neq | StrictNeq => Some(JsLiteral::Boolean(false)),
            _ => None,
        },
        (JsLiteral::RegExp { .. }, _) | (_, JsLiteral::RegExp { .. }) => None,
        // differently typed primitives are never strictly equal; loose
        // equality would coerce, so it is left alone
        _ => match op {
            StrictEq => Some(JsLiteral::Boolean(false)),
            StrictNeq => Some(JsLiteral::Boolean(true)),
            _ => None,
        },
    }
}

/// JavaScript truthiness of a literal.
fn truthiness(lit: &JsLiteral) -> Option<bool> {
    match lit {
        JsLiteral::Boolean(value) => Some(*value),
        JsLiteral::Null => Some(false),
        JsLiteral::Number(value) => Some(*value != 0.0 && !value.is_nan()),
        JsLiteral::String(value) => Some(!value.is_empty()),
        JsLiteral::RegExp { .. } => Some(true),
    }
}

fn representable(value: f64) -> bool {
    value.is_finite() && !(value == 0.0 && value.is_sign_negative())
}

/// ECMAScript ToInt32.
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let wrapped = value.trunc() % 4_294_967_296.0;
    (wrapped as i64) as u32 as i32
}

fn to_uint32(value: f64) -> u32 {
    to_int32(value) as u32
}

fn shift_count(value: f64) -> u32 {
    to_uint32(value) & 0x1f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::printer::{expr_to_js, to_js};
    use jsopt_trace::{OutputFormat, TraceConfig};
    use rstest::rstest;

    fn num(value: f64) -> JsExpr {
        JsExpr::number(value)
    }

    fn fold_expr(expr: JsExpr) -> (JsExpr, usize) {
        let mut program = JsProgram::new(vec![JsStmt::Expr(expr)]);
        let folds = optimize(&mut program, &TraceLogger::disabled()).expect("optimize");
        match program.statements.pop() {
            Some(JsStmt::Expr(expr)) => (expr, folds),
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[rstest]
    #[case(JsExpr::binary(BinaryOp::Add, num(1.0), num(2.0)), "3")]
    #[case(JsExpr::binary(BinaryOp::Mod, num(-7.0), num(3.0)), "(-1)")]
    #[case(JsExpr::binary(BinaryOp::BitOr, num(4294967297.0), num(0.0)), "1")]
    #[case(JsExpr::binary(BinaryOp::Shl, num(1.0), num(33.0)), "2")]
    #[case(JsExpr::binary(BinaryOp::ShrU, num(-1.0), num(0.0)), "4294967295")]
    #[case(JsExpr::binary(BinaryOp::Shr, num(-8.0), num(1.0)), "(-4)")]
    #[case(JsExpr::binary(BinaryOp::Add, JsExpr::string("a"), JsExpr::string("b")), "\"ab\"")]
    #[case(JsExpr::binary(BinaryOp::StrictEq, num(1.0), JsExpr::string("1")), "false")]
    #[case(JsExpr::binary(BinaryOp::Lt, num(1.0), num(2.0)), "true")]
    #[case(JsExpr::prefix(UnaryOp::Not, JsExpr::string("")), "true")]
    #[case(JsExpr::conditional(num(0.0), JsExpr::name("a"), JsExpr::name("b")), "b")]
    #[case(JsExpr::binary(BinaryOp::And, JsExpr::boolean(true), JsExpr::name("x")), "x")]
    #[case(JsExpr::binary(BinaryOp::Or, JsExpr::Literal(JsLiteral::Null), JsExpr::name("x")), "x")]
    #[case(JsExpr::binary(BinaryOp::Or, num(5.0), JsExpr::name("x")), "5")]
    #[case(JsExpr::binary(BinaryOp::Comma, JsExpr::name("a"), JsExpr::name("b")), "b")]
    fn folds_to(#[case] expr: JsExpr, #[case] expected: &str) {
        let (folded, folds) = fold_expr(expr);
        assert_eq!(folds, 1);
        assert_eq!(expr_to_js(&folded).expect("print"), expected);
    }

    #[rstest]
    #[case(JsExpr::binary(BinaryOp::Div, num(1.0), num(0.0)))]
    #[case(JsExpr::binary(BinaryOp::Mul, num(-1.0), num(0.0)))]
    #[case(JsExpr::binary(BinaryOp::Mod, num(1.0), num(0.0)))]
    #[case(JsExpr::binary(BinaryOp::Eq, num(1.0), JsExpr::string("1")))]
    #[case(JsExpr::binary(BinaryOp::Lt, JsExpr::string("a"), JsExpr::string("b")))]
    #[case(JsExpr::binary(BinaryOp::Add, num(1.0), JsExpr::name("x")))]
    fn leaves_unrepresentable_or_dynamic_results(#[case] expr: JsExpr) {
        let (folded, folds) = fold_expr(expr.clone());
        assert_eq!(folds, 0);
        assert_eq!(folded, expr);
    }

    #[rstest]
    #[case(JsExpr::binary(BinaryOp::Comma, JsExpr::call(JsExpr::name("f"), vec![]), JsExpr::name("b")))]
    #[case(JsExpr::binary(BinaryOp::Comma, num(0.0), JsExpr::member(JsExpr::name("a"), "f")))]
    #[case(JsExpr::binary(BinaryOp::And, JsExpr::boolean(true), JsExpr::member(JsExpr::name("a"), "f")))]
    fn keeps_effects_and_call_receivers(#[case] expr: JsExpr) {
        let (folded, folds) = fold_expr(expr.clone());
        assert_eq!(folds, 0);
        assert_eq!(folded, expr);
    }

    #[test]
    fn folds_cascade_bottom_up() {
        // (1 + 2) * (10 - 4) -> 18
        let expr = JsExpr::binary(
            BinaryOp::Mul,
            JsExpr::binary(BinaryOp::Add, num(1.0), num(2.0)),
            JsExpr::binary(BinaryOp::Sub, num(10.0), num(4.0)),
        );
        let (folded, folds) = fold_expr(expr);
        assert_eq!(folded, num(18.0));
        assert_eq!(folds, 3);
    }

    #[test]
    fn literal_if_keeps_one_branch() {
        let mut program = JsProgram::new(vec![
            JsStmt::If {
                test: JsExpr::binary(BinaryOp::Gt, num(2.0), num(1.0)),
                then_stmt: Box::new(JsStmt::Expr(JsExpr::name("yes"))),
                else_stmt: Some(Box::new(JsStmt::Expr(JsExpr::name("no")))),
            },
            JsStmt::If {
                test: JsExpr::boolean(false),
                then_stmt: Box::new(JsStmt::Expr(JsExpr::name("never"))),
                else_stmt: None,
            },
        ]);
        let folds = optimize(&mut program, &TraceLogger::disabled()).expect("optimize");
        assert_eq!(folds, 3);
        assert_eq!(
            program.statements,
            vec![JsStmt::Expr(JsExpr::name("yes")), JsStmt::Empty]
        );
    }

    #[test]
    fn discarded_branch_keeps_its_var_declarations() {
        let call_f = JsStmt::Expr(JsExpr::call(JsExpr::name("f"), vec![JsExpr::name("x")]));
        let mut program = JsProgram::new(vec![
            JsStmt::If {
                test: JsExpr::boolean(false),
                then_stmt: Box::new(JsStmt::Vars(vec![JsVar {
                    name: "x".into(),
                    init: Some(num(1.0)),
                }])),
                else_stmt: None,
            },
            call_f,
        ]);
        optimize(&mut program, &TraceLogger::disabled()).expect("optimize");
        assert_eq!(to_js(&program).expect("print"), "var x;\nf(x);\n");
    }

    #[test]
    fn nested_declarations_survive_next_to_the_kept_branch() {
        let dropped = JsStmt::Block(vec![
            JsStmt::For {
                init: Some(ForInit::Vars(vec![JsVar {
                    name: "i".into(),
                    init: Some(num(0.0)),
                }])),
                test: None,
                update: None,
                body: Box::new(JsStmt::Vars(vec![JsVar {
                    name: "j".into(),
                    init: None,
                }])),
            },
            JsStmt::ForIn {
                var: "i".into(),
                object: JsExpr::name("o"),
                body: Box::new(JsStmt::Empty),
            },
        ]);
        let mut program = JsProgram::new(vec![JsStmt::If {
            test: JsExpr::boolean(true),
            then_stmt: Box::new(JsStmt::Expr(JsExpr::name("yes"))),
            else_stmt: Some(Box::new(dropped)),
        }]);
        optimize(&mut program, &TraceLogger::disabled()).expect("optimize");
        let declared = |name: &str| JsVar {
            name: name.into(),
            init: None,
        };
        assert_eq!(
            program.statements,
            vec![JsStmt::Block(vec![
                JsStmt::Vars(vec![declared("i"), declared("j")]),
                JsStmt::Expr(JsExpr::name("yes")),
            ])]
        );
    }

    #[test]
    fn folds_inside_function_bodies_and_initializers() {
        let function = crate::js::ast::JsFunction {
            name: None,
            params: vec![],
            body: vec![JsStmt::Return(Some(JsExpr::binary(
                BinaryOp::Mul,
                num(6.0),
                num(7.0),
            )))],
        };
        let mut program = JsProgram::new(vec![JsStmt::Vars(vec![JsVar {
            name: "f".into(),
            init: Some(JsExpr::Function(Box::new(function))),
        }])]);
        let folds = optimize(&mut program, &TraceLogger::disabled()).expect("optimize");
        assert_eq!(folds, 1);
    }

    #[test]
    fn int32_conversion() {
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(-1.0), u32::MAX);
    }

    fn traced_folds(quiet: bool) -> (usize, usize) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.json");
        let config = TraceConfig {
            format: OutputFormat::Raw,
            quiet_high_volume: quiet,
            ..TraceConfig::to_path(&path)
        };
        let logger = TraceLogger::open(config).expect("logger");
        let mut program = JsProgram::new(vec![JsStmt::Expr(JsExpr::binary(
            BinaryOp::Add,
            JsExpr::binary(BinaryOp::Add, num(1.0), num(2.0)),
            num(3.0),
        ))]);
        let folds = optimize(&mut program, &logger).expect("optimize");
        logger.shutdown();

        let text = std::fs::read_to_string(&path).expect("read trace");
        let records = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("record"))
            .filter(|record| record["typeName"] == FOLD.name)
            .count();
        (folds, records)
    }

    #[test]
    fn each_fold_is_traced() {
        assert_eq!(traced_folds(false), (2, 2));
    }

    #[test]
    fn quiet_mode_still_folds_without_tracing() {
        assert_eq!(traced_folds(true), (2, 0));
    }
}
