//! JavaScript operators and their fixed binding strength.

use crate::js::precedence::Precedence;

/// Binary (and assignment, and comma) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    ShrU,
    Lt,
    Lte,
    Gt,
    Gte,
    InstanceOf,
    In,
    Eq,
    Neq,
    StrictEq,
    StrictNeq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Asg,
    AsgAdd,
    AsgSub,
    AsgMul,
    AsgDiv,
    AsgMod,
    AsgShl,
    AsgShr,
    AsgShrU,
    AsgBitAnd,
    AsgBitOr,
    AsgBitXor,
    Comma,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 36] = [
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::ShrU,
        BinaryOp::Lt,
        BinaryOp::Lte,
        BinaryOp::Gt,
        BinaryOp::Gte,
        BinaryOp::InstanceOf,
        BinaryOp::In,
        BinaryOp::Eq,
        BinaryOp::Neq,
        BinaryOp::StrictEq,
        BinaryOp::StrictNeq,
        BinaryOp::BitAnd,
        BinaryOp::BitXor,
        BinaryOp::BitOr,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Asg,
        BinaryOp::AsgAdd,
        BinaryOp::AsgSub,
        BinaryOp::AsgMul,
        BinaryOp::AsgDiv,
        BinaryOp::AsgMod,
        BinaryOp::AsgShl,
        BinaryOp::AsgShr,
        BinaryOp::AsgShrU,
        BinaryOp::AsgBitAnd,
        BinaryOp::AsgBitOr,
        BinaryOp::AsgBitXor,
        BinaryOp::Comma,
    ];

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Mul => "*",
            Div => "/",
            Mod => "%",
            Add => "+",
            Sub => "-",
            Shl => "<<",
            Shr => ">>",
            ShrU => ">>>",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
            InstanceOf => "instanceof",
            In => "in",
            Eq => "==",
            Neq => "!=",
            StrictEq => "===",
            StrictNeq => "!==",
            BitAnd => "&",
            BitXor => "^",
            BitOr => "|",
            And => "&&",
            Or => "||",
            Asg => "=",
            AsgAdd => "+=",
            AsgSub => "-=",
            AsgMul => "*=",
            AsgDiv => "/=",
            AsgMod => "%=",
            AsgShl => "<<=",
            AsgShr => ">>=",
            AsgShrU => ">>>=",
            AsgBitAnd => "&=",
            AsgBitOr => "|=",
            AsgBitXor => "^=",
            Comma => ",",
        }
    }

    pub fn precedence(self) -> Precedence {
        use BinaryOp::*;
        let level = match self {
            Mul | Div | Mod => 13,
            Add | Sub => 12,
            Shl | Shr | ShrU => 11,
            Lt | Lte | Gt | Gte | InstanceOf | In => 10,
            Eq | Neq | StrictEq | StrictNeq => 9,
            BitAnd => 8,
            BitXor => 7,
            BitOr => 6,
            And => 5,
            Or => 4,
            Asg | AsgAdd | AsgSub | AsgMul | AsgDiv | AsgMod | AsgShl | AsgShr | AsgShrU
            | AsgBitAnd | AsgBitOr | AsgBitXor => return Precedence::ASSIGNMENT,
            Comma => return Precedence::COMMA,
        };
        Precedence::new(level)
    }

    pub fn is_assignment(self) -> bool {
        self.precedence() == Precedence::ASSIGNMENT
    }

    /// Assignments group right to left; everything else left to right.
    pub fn is_left_associative(self) -> bool {
        !self.is_assignment()
    }

    /// Operator spelled with letters, so it always needs surrounding spaces.
    pub fn is_keyword(self) -> bool {
        matches!(self, BinaryOp::InstanceOf | BinaryOp::In)
    }
}

/// Prefix and postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Delete,
    Void,
    TypeOf,
    Inc,
    Dec,
    Pos,
    Neg,
    BitNot,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Delete => "delete",
            UnaryOp::Void => "void",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }

    pub fn precedence(self) -> Precedence {
        Precedence::UNARY
    }

    /// Only `++` and `--` may appear after their operand.
    pub fn is_postfix_capable(self) -> bool {
        matches!(self, UnaryOp::Inc | UnaryOp::Dec)
    }

    /// Writes to its operand.
    pub fn is_modifying(self) -> bool {
        matches!(self, UnaryOp::Inc | UnaryOp::Dec | UnaryOp::Delete)
    }

    pub fn is_keyword(self) -> bool {
        matches!(self, UnaryOp::Delete | UnaryOp::Void | UnaryOp::TypeOf)
    }
}
