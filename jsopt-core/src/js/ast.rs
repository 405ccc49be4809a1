//! Output-language AST.
//!
//! Expressions and statements are separate closed enums: only `JsExpr`
//! values carry a precedence, so most code never has to ask.

use crate::js::ops::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum JsLiteral {
    Boolean(bool),
    Null,
    Number(f64),
    String(String),
    RegExp { pattern: String, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsExpr {
    Binary {
        op: BinaryOp,
        lhs: Box<JsExpr>,
        rhs: Box<JsExpr>,
    },
    Prefix {
        op: UnaryOp,
        arg: Box<JsExpr>,
    },
    Postfix {
        op: UnaryOp,
        arg: Box<JsExpr>,
    },
    Conditional {
        test: Box<JsExpr>,
        then_expr: Box<JsExpr>,
        else_expr: Box<JsExpr>,
    },
    /// `name` when `qualifier` is `None`, `qualifier.name` otherwise.
    NameRef {
        name: String,
        qualifier: Option<Box<JsExpr>>,
    },
    Invocation {
        callee: Box<JsExpr>,
        args: Vec<JsExpr>,
    },
    New {
        ctor: Box<JsExpr>,
        args: Vec<JsExpr>,
    },
    ArrayAccess {
        array: Box<JsExpr>,
        index: Box<JsExpr>,
    },
    ArrayLiteral(Vec<JsExpr>),
    ObjectLiteral(Vec<PropertyInitializer>),
    Function(Box<JsFunction>),
    Literal(JsLiteral),
    This,
}

/// `key: value` inside an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInitializer {
    pub key: PropertyKey,
    pub value: JsExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Ident(String),
    String(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsFunction {
    pub name: Option<String>,
    pub params: Vec<JsParameter>,
    pub body: Vec<JsStmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsParameter {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsVar {
    pub name: String,
    pub init: Option<JsExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Vars(Vec<JsVar>),
    Expr(JsExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchMember {
    Case { test: JsExpr, body: Vec<JsStmt> },
    Default { body: Vec<JsStmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsCatch {
    pub param: String,
    pub body: Vec<JsStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsStmt {
    Block(Vec<JsStmt>),
    Expr(JsExpr),
    Vars(Vec<JsVar>),
    If {
        test: JsExpr,
        then_stmt: Box<JsStmt>,
        else_stmt: Option<Box<JsStmt>>,
    },
    While {
        test: JsExpr,
        body: Box<JsStmt>,
    },
    DoWhile {
        body: Box<JsStmt>,
        test: JsExpr,
    },
    For {
        init: Option<ForInit>,
        test: Option<JsExpr>,
        update: Option<JsExpr>,
        body: Box<JsStmt>,
    },
    ForIn {
        var: String,
        object: JsExpr,
        body: Box<JsStmt>,
    },
    Switch {
        discriminant: JsExpr,
        members: Vec<SwitchMember>,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Return(Option<JsExpr>),
    Throw(JsExpr),
    Try {
        body: Vec<JsStmt>,
        catch: Option<JsCatch>,
        finally: Option<Vec<JsStmt>>,
    },
    Label {
        label: String,
        body: Box<JsStmt>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsProgram {
    pub statements: Vec<JsStmt>,
}

impl JsExpr {
    pub fn name(name: impl Into<String>) -> JsExpr {
        JsExpr::NameRef {
            name: name.into(),
            qualifier: None,
        }
    }

    pub fn member(qualifier: JsExpr, name: impl Into<String>) -> JsExpr {
        JsExpr::NameRef {
            name: name.into(),
            qualifier: Some(Box::new(qualifier)),
        }
    }

    pub fn number(value: f64) -> JsExpr {
        JsExpr::Literal(JsLiteral::Number(value))
    }

    pub fn string(value: impl Into<String>) -> JsExpr {
        JsExpr::Literal(JsLiteral::String(value.into()))
    }

    pub fn boolean(value: bool) -> JsExpr {
        JsExpr::Literal(JsLiteral::Boolean(value))
    }

    pub fn binary(op: BinaryOp, lhs: JsExpr, rhs: JsExpr) -> JsExpr {
        JsExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn prefix(op: UnaryOp, arg: JsExpr) -> JsExpr {
        JsExpr::Prefix {
            op,
            arg: Box::new(arg),
        }
    }

    pub fn call(callee: JsExpr, args: Vec<JsExpr>) -> JsExpr {
        JsExpr::Invocation {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn conditional(test: JsExpr, then_expr: JsExpr, else_expr: JsExpr) -> JsExpr {
        JsExpr::Conditional {
            test: Box::new(test),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn as_literal(&self) -> Option<&JsLiteral> {
        match self {
            JsExpr::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Whether the expression can be a target of `=`, `++` and friends.
    pub fn is_assignable(&self) -> bool {
        matches!(self, JsExpr::NameRef { .. } | JsExpr::ArrayAccess { .. })
    }

    /// True if evaluating the expression may have observable effects.
    pub fn has_side_effects(&self) -> bool {
        match self {
            JsExpr::Literal(_) | JsExpr::This | JsExpr::Function(_) => false,
            JsExpr::NameRef { qualifier, .. } => {
                qualifier.as_deref().is_some_and(JsExpr::has_side_effects)
            }
            JsExpr::Binary { op, lhs, rhs } => {
                op.is_assignment() || lhs.has_side_effects() || rhs.has_side_effects()
            }
            JsExpr::Prefix { op, arg } | JsExpr::Postfix { op, arg } => {
                op.is_modifying() || arg.has_side_effects()
            }
            JsExpr::Conditional {
                test,
                then_expr,
                else_expr,
            } => test.has_side_effects() || then_expr.has_side_effects() || else_expr.has_side_effects(),
            JsExpr::ArrayLiteral(items) => items.iter().any(JsExpr::has_side_effects),
            JsExpr::ObjectLiteral(props) => props.iter().any(|p| p.value.has_side_effects()),
            JsExpr::ArrayAccess { array, index } => {
                array.has_side_effects() || index.has_side_effects()
            }
            JsExpr::Invocation { .. } | JsExpr::New { .. } => true,
        }
    }
}

impl JsProgram {
    pub fn new(statements: Vec<JsStmt>) -> Self {
        JsProgram { statements }
    }
}
