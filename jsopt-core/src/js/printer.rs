//! Serializes the output AST back to JavaScript source.
//!
//! Statements are laid out one per line with two-space indentation;
//! expressions are printed compactly. Every child expression is checked
//! against its parent's precedence and wrapped in parentheses only when
//! the grammar would otherwise read it differently.

use crate::error::CoreError;
use crate::js::ast::{
    ForInit, JsCatch, JsExpr, JsFunction, JsLiteral, JsProgram, JsStmt, JsVar,
    PropertyInitializer, PropertyKey, SwitchMember,
};
use crate::js::ops::{BinaryOp, UnaryOp};
use crate::js::precedence::{NodeRef, Precedence, resolve};

const INDENT: &str = "  ";

pub fn to_js(program: &JsProgram) -> Result<String, CoreError> {
    let mut printer = Printer::default();
    for stmt in &program.statements {
        printer.stmt(stmt)?;
        printer.newline();
    }
    Ok(printer.out)
}

pub fn expr_to_js(expr: &JsExpr) -> Result<String, CoreError> {
    let mut printer = Printer::default();
    printer.expr(expr)?;
    Ok(printer.out)
}

/// Which side of a binary operator a child sits on.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Default)]
struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    // -----------------------------------------------------------------
    // Output primitives
    // -----------------------------------------------------------------

    /// Appends `text`, keeping `+ +` and `- -` from fusing into `++`/`--`
    /// and a `/` from opening a comment with the `/` or `*` after it.
    fn push(&mut self, text: &str) {
        if let (Some(last), Some(first)) = (self.out.chars().last(), text.chars().next()) {
            let fuses = match last {
                '+' | '-' => first == last,
                '/' => first == '/' || first == '*',
                _ => false,
            };
            if fuses {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn stmt(&mut self, stmt: &JsStmt) -> Result<(), CoreError> {
        self.indent();
        self.stmt_inline(stmt)
    }

    /// Prints a statement whose indentation is already in place.
    fn stmt_inline(&mut self, stmt: &JsStmt) -> Result<(), CoreError> {
        match stmt {
            JsStmt::Block(stmts) => self.block(stmts),
            JsStmt::Expr(expr) => {
                if starts_ambiguously(expr) {
                    self.push("(");
                    self.expr(expr)?;
                    self.push(")");
                } else {
                    self.expr(expr)?;
                }
                self.push(";");
                Ok(())
            }
            JsStmt::Vars(vars) => {
                self.vars(vars, false)?;
                self.push(";");
                Ok(())
            }
            JsStmt::If {
                test,
                then_stmt,
                else_stmt,
            } => {
                self.push("if (");
                self.expr(test)?;
                self.push(")");
                match else_stmt {
                    None => self.body(then_stmt),
                    Some(else_stmt) => {
                        // `if (a) if (b) x; else y;` would bind the else inward
                        if dangles_else(then_stmt) {
                            self.push(" ");
                            self.block(std::slice::from_ref(then_stmt.as_ref()))?;
                            self.push(" ");
                        } else {
                            self.body(then_stmt)?;
                            self.continue_after(then_stmt);
                        }
                        self.push("else");
                        match else_stmt.as_ref() {
                            JsStmt::If { .. } => {
                                self.push(" ");
                                self.stmt_inline(else_stmt)
                            }
                            other => self.body(other),
                        }
                    }
                }
            }
            JsStmt::While { test, body } => {
                self.push("while (");
                self.expr(test)?;
                self.push(")");
                self.body(body)
            }
            JsStmt::DoWhile { body, test } => {
                self.push("do");
                self.body(body)?;
                self.continue_after(body);
                self.push("while (");
                self.expr(test)?;
                self.push(");");
                Ok(())
            }
            JsStmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push("for (");
                match init {
                    Some(ForInit::Vars(vars)) => self.vars(vars, true)?,
                    Some(ForInit::Expr(expr)) => {
                        if contains_in(expr) {
                            self.push("(");
                            self.expr(expr)?;
                            self.push(")");
                        } else {
                            self.expr(expr)?;
                        }
                    }
                    None => {}
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(test)?;
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(update)?;
                }
                self.push(")");
                self.body(body)
            }
            JsStmt::ForIn { var, object, body } => {
                self.push("for (var ");
                self.push(var);
                self.push(" in ");
                self.expr(object)?;
                self.push(")");
                self.body(body)
            }
            JsStmt::Switch {
                discriminant,
                members,
            } => {
                self.push("switch (");
                self.expr(discriminant)?;
                self.push(") {");
                self.newline();
                self.depth += 1;
                for member in members {
                    self.switch_member(member)?;
                }
                self.depth -= 1;
                self.indent();
                self.push("}");
                Ok(())
            }
            JsStmt::Break(label) => self.jump("break", label.as_deref()),
            JsStmt::Continue(label) => self.jump("continue", label.as_deref()),
            JsStmt::Return(value) => {
                self.push("return");
                if let Some(value) = value {
                    self.push(" ");
                    self.expr(value)?;
                }
                self.push(";");
                Ok(())
            }
            JsStmt::Throw(value) => {
                self.push("throw ");
                self.expr(value)?;
                self.push(";");
                Ok(())
            }
            JsStmt::Try {
                body,
                catch,
                finally,
            } => {
                if catch.is_none() && finally.is_none() {
                    return Err(CoreError::SemanticError(
                        "try statement needs a catch or finally clause".to_string(),
                    ));
                }
                self.push("try ");
                self.block(body)?;
                if let Some(JsCatch { param, body }) = catch {
                    self.push(" catch (");
                    self.push(param);
                    self.push(") ");
                    self.block(body)?;
                }
                if let Some(finally) = finally {
                    self.push(" finally ");
                    self.block(finally)?;
                }
                Ok(())
            }
            JsStmt::Label { label, body } => {
                self.push(label);
                self.push(": ");
                self.stmt_inline(body)
            }
            JsStmt::Empty => {
                self.push(";");
                Ok(())
            }
        }
    }

    fn block(&mut self, stmts: &[JsStmt]) -> Result<(), CoreError> {
        self.push("{");
        self.newline();
        self.depth += 1;
        for stmt in stmts {
            self.stmt(stmt)?;
            self.newline();
        }
        self.depth -= 1;
        self.indent();
        self.push("}");
        Ok(())
    }

    /// Body of a compound statement: blocks stay on the header line,
    /// anything else moves to its own indented line.
    fn body(&mut self, stmt: &JsStmt) -> Result<(), CoreError> {
        if let JsStmt::Block(stmts) = stmt {
            self.push(" ");
            return self.block(stmts);
        }
        self.newline();
        self.depth += 1;
        let result = self.stmt(stmt);
        self.depth -= 1;
        result
    }

    /// Positions the cursor for the keyword that follows a body, such as
    /// `else` or the `while` of a do-while.
    fn continue_after(&mut self, body: &JsStmt) {
        if matches!(body, JsStmt::Block(_)) {
            self.push(" ");
        } else {
            self.newline();
            self.indent();
        }
    }

    fn jump(&mut self, keyword: &str, label: Option<&str>) -> Result<(), CoreError> {
        self.push(keyword);
        if let Some(label) = label {
            self.push(" ");
            self.push(label);
        }
        self.push(";");
        Ok(())
    }

    fn vars(&mut self, vars: &[JsVar], no_in: bool) -> Result<(), CoreError> {
        if vars.is_empty() {
            return Err(CoreError::SemanticError(
                "var declaration without any variables".to_string(),
            ));
        }
        self.push("var ");
        for (i, var) in vars.iter().enumerate() {
            if i > 0 {
                self.push(",");
            }
            self.push(&var.name);
            if let Some(init) = &var.init {
                self.push("=");
                if no_in && contains_in(init) {
                    self.push("(");
                    self.expr(init)?;
                    self.push(")");
                } else {
                    self.list_item(init)?;
                }
            }
        }
        Ok(())
    }

    fn switch_member(&mut self, member: &SwitchMember) -> Result<(), CoreError> {
        self.indent();
        let body = match member {
            SwitchMember::Case { test, body } => {
                self.push("case ");
                self.expr(test)?;
                body
            }
            SwitchMember::Default { body } => {
                self.push("default");
                body
            }
        };
        self.push(":");
        self.newline();
        self.depth += 1;
        for stmt in body {
            self.stmt(stmt)?;
            self.newline();
        }
        self.depth -= 1;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn expr(&mut self, expr: &JsExpr) -> Result<(), CoreError> {
        match expr {
            JsExpr::Binary { op, lhs, rhs } => {
                self.operand(*op, lhs, Side::Left)?;
                if op.is_keyword() {
                    self.push(" ");
                    self.push(op.symbol());
                    self.push(" ");
                } else {
                    self.push(op.symbol());
                }
                self.operand(*op, rhs, Side::Right)
            }
            JsExpr::Prefix { op, arg } => {
                if op.is_modifying() && *op != UnaryOp::Delete && !arg.is_assignable() {
                    return Err(CoreError::SemanticError(format!(
                        "operand of prefix '{}' is not assignable",
                        op.symbol()
                    )));
                }
                self.push(op.symbol());
                if op.is_keyword() {
                    self.push(" ");
                }
                let needs_parens = precedence_of(arg)? < op.precedence();
                self.wrapped(arg, needs_parens)
            }
            JsExpr::Postfix { op, arg } => {
                if !op.is_postfix_capable() {
                    return Err(CoreError::SemanticError(format!(
                        "'{}' cannot be used as a postfix operator",
                        op.symbol()
                    )));
                }
                if !arg.is_assignable() {
                    return Err(CoreError::SemanticError(format!(
                        "operand of postfix '{}' is not assignable",
                        op.symbol()
                    )));
                }
                // `-a++` reads as `-(a++)`, so a unary operand needs parentheses
                let needs_parens = precedence_of(arg)? <= op.precedence();
                self.wrapped(arg, needs_parens)?;
                self.push(op.symbol());
                Ok(())
            }
            JsExpr::Conditional {
                test,
                then_expr,
                else_expr,
            } => {
                // right-associative: an equal-level test is parenthesized,
                // an equal-level else branch is not
                let test_parens = precedence_of(test)? <= Precedence::CONDITIONAL;
                self.wrapped(test, test_parens)?;
                self.push("?");
                let then_parens = precedence_of(then_expr)? < Precedence::CONDITIONAL;
                self.wrapped(then_expr, then_parens)?;
                self.push(":");
                let else_parens = precedence_of(else_expr)? < Precedence::CONDITIONAL;
                self.wrapped(else_expr, else_parens)
            }
            JsExpr::NameRef { name, qualifier } => {
                if let Some(qualifier) = qualifier {
                    let needs_parens = precedence_of(qualifier)? < Precedence::CALL_MEMBER
                        || matches!(qualifier.as_ref(), JsExpr::Literal(JsLiteral::Number(_)));
                    self.wrapped(qualifier, needs_parens)?;
                    self.push(".");
                }
                self.push(name);
                Ok(())
            }
            JsExpr::Invocation { callee, args } => {
                let needs_parens = precedence_of(callee)? < Precedence::CALL_MEMBER;
                self.wrapped(callee, needs_parens)?;
                self.arguments(args)
            }
            JsExpr::New { ctor, args } => {
                self.push("new ");
                // `new f()()` would call the result of `new f()`
                let needs_parens =
                    precedence_of(ctor)? < Precedence::CALL_MEMBER || contains_invocation(ctor);
                self.wrapped(ctor, needs_parens)?;
                self.arguments(args)
            }
            JsExpr::ArrayAccess { array, index } => {
                let needs_parens = precedence_of(array)? < Precedence::CALL_MEMBER;
                self.wrapped(array, needs_parens)?;
                self.push("[");
                self.expr(index)?;
                self.push("]");
                Ok(())
            }
            JsExpr::ArrayLiteral(items) => {
                self.push("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                    }
                    self.list_item(item)?;
                }
                self.push("]");
                Ok(())
            }
            JsExpr::ObjectLiteral(props) => {
                self.push("{");
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.push(",");
                    }
                    self.property(prop)?;
                }
                self.push("}");
                Ok(())
            }
            JsExpr::Function(function) => self.function(function),
            JsExpr::Literal(lit) => {
                self.literal(lit);
                Ok(())
            }
            JsExpr::This => {
                self.push("this");
                Ok(())
            }
        }
    }

    fn operand(&mut self, op: BinaryOp, child: &JsExpr, side: Side) -> Result<(), CoreError> {
        if side == Side::Left && op.is_assignment() && !child.is_assignable() {
            return Err(CoreError::SemanticError(format!(
                "left side of '{}' is not assignable",
                op.symbol()
            )));
        }
        let parent = op.precedence();
        let child_level = precedence_of(child)?;
        let contradicts_associativity = match side {
            Side::Left => !op.is_left_associative(),
            Side::Right => op.is_left_associative(),
        };
        let needs_parens =
            child_level < parent || (child_level == parent && contradicts_associativity);
        self.wrapped(child, needs_parens)
    }

    fn wrapped(&mut self, expr: &JsExpr, parens: bool) -> Result<(), CoreError> {
        if parens {
            self.push("(");
            self.expr(expr)?;
            self.push(")");
            Ok(())
        } else {
            self.expr(expr)
        }
    }

    /// An element of a comma-separated list, where a bare comma
    /// expression would split into two elements.
    fn list_item(&mut self, expr: &JsExpr) -> Result<(), CoreError> {
        let needs_parens = precedence_of(expr)? <= Precedence::COMMA;
        self.wrapped(expr, needs_parens)
    }

    fn arguments(&mut self, args: &[JsExpr]) -> Result<(), CoreError> {
        self.push("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(",");
            }
            self.list_item(arg)?;
        }
        self.push(")");
        Ok(())
    }

    fn property(&mut self, prop: &PropertyInitializer) -> Result<(), CoreError> {
        match &prop.key {
            PropertyKey::Ident(name) => self.push(name),
            PropertyKey::String(value) => self.push(&quote(value)),
            // `-1` or `Infinity` is not a numeric literal key; its string is
            PropertyKey::Number(value) if value.is_finite() && *value >= 0.0 => {
                self.push(&format_number(*value))
            }
            PropertyKey::Number(value) => self.push(&quote(&format_number(*value))),
        }
        self.push(":");
        self.list_item(&prop.value)
    }

    fn function(&mut self, function: &JsFunction) -> Result<(), CoreError> {
        self.push("function");
        if let Some(name) = &function.name {
            self.push(" ");
            self.push(name);
        }
        self.push("(");
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.push(",");
            }
            self.push(&param.name);
        }
        self.push(")");
        if function.body.is_empty() {
            self.push("{}");
            return Ok(());
        }
        self.block(&function.body)
    }

    fn literal(&mut self, lit: &JsLiteral) {
        match lit {
            JsLiteral::Boolean(true) => self.push("true"),
            JsLiteral::Boolean(false) => self.push("false"),
            JsLiteral::Null => self.push("null"),
            JsLiteral::Number(value) => {
                let text = format_number(*value);
                if text.starts_with('-') {
                    self.push("(");
                    self.push(&text);
                    self.push(")");
                } else {
                    self.push(&text);
                }
            }
            JsLiteral::String(value) => self.push(&quote(value)),
            // one piece, so the guard in `push` never splits the literal
            JsLiteral::RegExp { pattern, flags } => self.push(&format!("/{pattern}/{flags}")),
        }
    }
}

fn precedence_of(expr: &JsExpr) -> Result<Precedence, CoreError> {
    resolve(NodeRef::Expr(expr))
}

/// Whether an expression statement would begin with `function` or `{` and
/// be read as a declaration or block.
fn starts_ambiguously(expr: &JsExpr) -> bool {
    match expr {
        JsExpr::Function(_) | JsExpr::ObjectLiteral(_) => true,
        JsExpr::Binary { lhs, .. } => starts_ambiguously(lhs),
        JsExpr::Conditional { test, .. } => starts_ambiguously(test),
        JsExpr::Postfix { arg, .. } => starts_ambiguously(arg),
        JsExpr::Invocation { callee, .. } => starts_ambiguously(callee),
        JsExpr::ArrayAccess { array, .. } => starts_ambiguously(array),
        JsExpr::NameRef {
            qualifier: Some(qualifier),
            ..
        } => starts_ambiguously(qualifier),
        _ => false,
    }
}

/// True when the callee chain of a `new` target holds a call.
fn contains_invocation(expr: &JsExpr) -> bool {
    match expr {
        JsExpr::Invocation { .. } => true,
        JsExpr::NameRef {
            qualifier: Some(qualifier),
            ..
        } => contains_invocation(qualifier),
        JsExpr::ArrayAccess { array, .. } => contains_invocation(array),
        _ => false,
    }
}

/// True when an `in` operator appears anywhere outside a function body.
fn contains_in(expr: &JsExpr) -> bool {
    match expr {
        JsExpr::Binary { op, lhs, rhs } => {
            *op == BinaryOp::In || contains_in(lhs) || contains_in(rhs)
        }
        JsExpr::Prefix { arg, .. } | JsExpr::Postfix { arg, .. } => contains_in(arg),
        JsExpr::Conditional {
            test,
            then_expr,
            else_expr,
        } => contains_in(test) || contains_in(then_expr) || contains_in(else_expr),
        JsExpr::NameRef { qualifier, .. } => qualifier.as_deref().is_some_and(contains_in),
        JsExpr::Invocation { callee: target, args } | JsExpr::New { ctor: target, args } => {
            contains_in(target) || args.iter().any(contains_in)
        }
        JsExpr::ArrayAccess { array, index } => contains_in(array) || contains_in(index),
        JsExpr::ArrayLiteral(items) => items.iter().any(contains_in),
        JsExpr::ObjectLiteral(props) => props.iter().any(|p| contains_in(&p.value)),
        JsExpr::Function(_) | JsExpr::Literal(_) | JsExpr::This => false,
    }
}

/// True if `stmt` ends in an `if` without `else` that would capture a
/// following `else`.
fn dangles_else(stmt: &JsStmt) -> bool {
    match stmt {
        JsStmt::If {
            else_stmt: None, ..
        } => true,
        JsStmt::If {
            else_stmt: Some(else_stmt),
            ..
        } => dangles_else(else_stmt),
        JsStmt::While { body, .. }
        | JsStmt::For { body, .. }
        | JsStmt::ForIn { body, .. }
        | JsStmt::Label { body, .. } => dangles_else(body),
        _ => false,
    }
}

/// Double-quoted JavaScript string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Formats a number the way JavaScript's `Number.prototype.toString` does.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value < 0.0 {
        return format!("-{}", format_number(-value));
    }

    // shortest round-trip digits plus a decimal exponent
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let (first, rest) = digits.split_at(1);
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let exp = (n - 1).abs();
        if rest.is_empty() {
            format!("{first}e{sign}{exp}")
        } else {
            format!("{first}.{rest}e{sign}{exp}")
        }
    }
}
