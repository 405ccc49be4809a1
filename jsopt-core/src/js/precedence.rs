//! Operator precedence of output expressions.
//!
//! Levels follow the classic JavaScript operator table:
//!
//! * 16: indivisible primaries, either childless or self-delimiting
//! * 15: member access, calls, `new`, indexing
//! * 14: unary operators
//! * 13..=4: non-assigning binary operators
//! * 3: the conditional operator
//! * 2: assignments
//! * 1: the comma operator
//!
//! Resolution is shallow: composite nodes report the level of their own
//! operator, children are never visited.

use core::fmt;

use crate::error::CoreError;
use crate::js::ast::{
    JsCatch, JsExpr, JsFunction, JsParameter, JsProgram, JsStmt, PropertyInitializer,
    SwitchMember,
};

/// Binding strength of an expression; higher binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precedence(u8);

impl Precedence {
    pub const COMMA: Precedence = Precedence(1);
    pub const ASSIGNMENT: Precedence = Precedence(2);
    pub const CONDITIONAL: Precedence = Precedence(3);
    pub const UNARY: Precedence = Precedence(14);
    pub const CALL_MEMBER: Precedence = Precedence(15);
    pub const PRIMARY: Precedence = Precedence(16);

    pub(crate) const fn new(level: u8) -> Self {
        Precedence(level)
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl JsExpr {
    pub fn precedence(&self) -> Precedence {
        match self {
            JsExpr::Literal(_)
            | JsExpr::This
            | JsExpr::ArrayLiteral(_)
            | JsExpr::ObjectLiteral(_)
            | JsExpr::Function(_) => Precedence::PRIMARY,
            JsExpr::NameRef { qualifier, .. } => match qualifier {
                None => Precedence::PRIMARY,
                Some(_) => Precedence::CALL_MEMBER,
            },
            JsExpr::Invocation { .. } | JsExpr::New { .. } | JsExpr::ArrayAccess { .. } => {
                Precedence::CALL_MEMBER
            }
            JsExpr::Prefix { op, .. } | JsExpr::Postfix { op, .. } => op.precedence(),
            JsExpr::Binary { op, .. } => op.precedence(),
            JsExpr::Conditional { .. } => Precedence::CONDITIONAL,
        }
    }
}

/// A borrowed view of any node in the output tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Expr(&'a JsExpr),
    Stmt(&'a JsStmt),
    PropertyInitializer(&'a PropertyInitializer),
    Function(&'a JsFunction),
    Parameter(&'a JsParameter),
    Parameters(&'a [JsParameter]),
    SwitchMember(&'a SwitchMember),
    Catch(&'a JsCatch),
    Program(&'a JsProgram),
}

impl NodeRef<'_> {
    /// Short node name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeRef::Expr(_) => "expression",
            NodeRef::Stmt(stmt) => match stmt {
                JsStmt::Block(_) => "block",
                JsStmt::Expr(_) => "expression statement",
                JsStmt::Vars(_) => "var declaration",
                JsStmt::If { .. } => "if statement",
                JsStmt::While { .. } => "while loop",
                JsStmt::DoWhile { .. } => "do-while loop",
                JsStmt::For { .. } => "for loop",
                JsStmt::ForIn { .. } => "for-in loop",
                JsStmt::Switch { .. } => "switch statement",
                JsStmt::Break(_) => "break statement",
                JsStmt::Continue(_) => "continue statement",
                JsStmt::Return(_) => "return statement",
                JsStmt::Throw(_) => "throw statement",
                JsStmt::Try { .. } => "try statement",
                JsStmt::Label { .. } => "labeled statement",
                JsStmt::Empty => "empty statement",
            },
            NodeRef::PropertyInitializer(_) => "property initializer",
            NodeRef::Function(_) => "function",
            NodeRef::Parameter(_) => "parameter",
            NodeRef::Parameters(_) => "parameter list",
            NodeRef::SwitchMember(SwitchMember::Case { .. }) => "case clause",
            NodeRef::SwitchMember(SwitchMember::Default { .. }) => "default clause",
            NodeRef::Catch(_) => "catch clause",
            NodeRef::Program(_) => "program",
        }
    }
}

/// Precedence of `node`, or [`CoreError::NoPrecedence`] for anything that
/// is not an expression.
pub fn resolve(node: NodeRef<'_>) -> Result<Precedence, CoreError> {
    match node {
        NodeRef::Expr(expr) => Ok(expr.precedence()),
        NodeRef::PropertyInitializer(_) | NodeRef::Function(_) => Ok(Precedence::PRIMARY),
        NodeRef::Stmt(_)
        | NodeRef::Parameter(_)
        | NodeRef::Parameters(_)
        | NodeRef::SwitchMember(_)
        | NodeRef::Catch(_)
        | NodeRef::Program(_) => Err(CoreError::NoPrecedence {
            node: node.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::ast::{JsLiteral, JsVar, PropertyKey};
    use crate::js::ops::{BinaryOp, UnaryOp};
    use rstest::rstest;

    fn level(expr: &JsExpr) -> Precedence {
        resolve(NodeRef::Expr(expr)).expect("expressions always resolve")
    }

    fn function() -> JsFunction {
        JsFunction {
            name: None,
            params: vec![],
            body: vec![],
        }
    }

    #[rstest]
    #[case(JsExpr::Literal(JsLiteral::Boolean(true)))]
    #[case(JsExpr::Literal(JsLiteral::Null))]
    #[case(JsExpr::number(4.5))]
    #[case(JsExpr::string("s"))]
    #[case(JsExpr::Literal(JsLiteral::RegExp { pattern: "a+".into(), flags: "g".into() }))]
    #[case(JsExpr::This)]
    #[case(JsExpr::ArrayLiteral(vec![JsExpr::number(1.0)]))]
    #[case(JsExpr::ObjectLiteral(vec![]))]
    #[case(JsExpr::Function(Box::new(function())))]
    #[case(JsExpr::name("x"))]
    fn primaries_share_the_top_level(#[case] expr: JsExpr) {
        assert_eq!(level(&expr), Precedence::PRIMARY);
    }

    #[test]
    fn member_call_new_and_index_share_one_level() {
        let member = JsExpr::member(JsExpr::name("a"), "b");
        let call = JsExpr::call(JsExpr::name("f"), vec![]);
        let new = JsExpr::New {
            ctor: Box::new(JsExpr::name("C")),
            args: vec![],
        };
        let index = JsExpr::ArrayAccess {
            array: Box::new(JsExpr::name("a")),
            index: Box::new(JsExpr::number(0.0)),
        };
        for expr in [&member, &call, &new, &index] {
            assert_eq!(level(expr), Precedence::CALL_MEMBER);
        }
        assert_eq!(Precedence::CALL_MEMBER.level() + 1, Precedence::PRIMARY.level());
    }

    #[test]
    fn operators_report_their_own_level() {
        let neg = JsExpr::prefix(UnaryOp::Neg, JsExpr::name("a"));
        let post = JsExpr::Postfix {
            op: UnaryOp::Inc,
            arg: Box::new(JsExpr::name("a")),
        };
        assert_eq!(level(&neg), Precedence::UNARY);
        assert_eq!(level(&post), Precedence::UNARY);

        for op in BinaryOp::ALL {
            let expr = JsExpr::binary(op, JsExpr::name("a"), JsExpr::name("b"));
            assert_eq!(level(&expr), op.precedence());
        }

        let cond = JsExpr::conditional(JsExpr::name("a"), JsExpr::name("b"), JsExpr::name("c"));
        assert_eq!(level(&cond), Precedence::CONDITIONAL);
        assert!(level(&cond) < BinaryOp::Or.precedence());
        assert!(level(&cond) > BinaryOp::Asg.precedence());
    }

    #[test]
    fn resolution_is_shallow() {
        // a deep right operand does not change the outer answer
        let deep = JsExpr::binary(
            BinaryOp::Mul,
            JsExpr::name("a"),
            JsExpr::binary(BinaryOp::Comma, JsExpr::name("b"), JsExpr::name("c")),
        );
        assert_eq!(level(&deep), BinaryOp::Mul.precedence());
    }

    #[test]
    fn property_initializer_is_primary() {
        let init = PropertyInitializer {
            key: PropertyKey::Ident("k".into()),
            value: JsExpr::number(1.0),
        };
        assert_eq!(
            resolve(NodeRef::PropertyInitializer(&init)).expect("resolves"),
            Precedence::PRIMARY
        );
    }

    #[rstest]
    #[case(JsStmt::Block(vec![]))]
    #[case(JsStmt::Empty)]
    #[case(JsStmt::Expr(JsExpr::number(1.0)))]
    #[case(JsStmt::Vars(vec![JsVar { name: "a".into(), init: None }]))]
    #[case(JsStmt::While { test: JsExpr::boolean(true), body: Box::new(JsStmt::Empty) })]
    #[case(JsStmt::Switch { discriminant: JsExpr::name("x"), members: vec![] })]
    #[case(JsStmt::Throw(JsExpr::name("e")))]
    #[case(JsStmt::Try { body: vec![], catch: None, finally: Some(vec![]) })]
    #[case(JsStmt::Label { label: "l".into(), body: Box::new(JsStmt::Empty) })]
    #[case(JsStmt::Break(None))]
    fn statements_have_no_precedence(#[case] stmt: JsStmt) {
        let err = resolve(NodeRef::Stmt(&stmt)).unwrap_err();
        assert!(matches!(err, CoreError::NoPrecedence { .. }));
    }

    #[test]
    fn other_structural_nodes_have_no_precedence() {
        let param = JsParameter { name: "p".into() };
        let params = vec![param.clone()];
        let member = SwitchMember::Default { body: vec![] };
        let catch = JsCatch {
            param: "e".into(),
            body: vec![],
        };
        let program = JsProgram::default();

        for node in [
            NodeRef::Parameter(&param),
            NodeRef::Parameters(&params),
            NodeRef::SwitchMember(&member),
            NodeRef::Catch(&catch),
            NodeRef::Program(&program),
        ] {
            match resolve(node) {
                Err(CoreError::NoPrecedence { node: name }) => assert_eq!(name, node.kind_name()),
                other => panic!("expected failure for {}, got {other:?}", node.kind_name()),
            }
        }
    }
}
