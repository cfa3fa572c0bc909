//! Машинные инструкции.
//!
//! Генератор строит типизированные [`Op`], а наружу отдаёт их текстовую
//! форму [`Instruction`] (`{instruction}` в сериализованном виде).
//!
//! # Набор инструкций
//!
//! ```text
//! LOAD 10, R1        ; непосредственное значение
//! LOAD x, R1         ; значение переменной
//! STORE R1, x        ; запись в переменную (память выделяется при первой записи)
//! ADD R1, R1, R2     ; SUB MUL DIV MOD AND OR XOR SHL SHR
//! CMPLT R1, R1, R2   ; CMPEQ CMPNE CMPLE CMPGT CMPGE -> 0 / 1
//! NEG R1, R1         ; NOT BNOT
//! JMP L0 / JZ R1, L0 / JNZ R1, L0 / L0:
//! FUNC f / ARG a / END f
//! PARAM R1 / CALL f, R1 / RET R1 / RET
//! ```
//!
//! У каждого вызова свой набор регистров.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Одна текстовая инструкция. Порядок в последовательности - порядок исполнения.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(rename = "instruction")]
    pub text: String,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Регистр `R<n>`, нумерация с единицы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(pub usize);

impl Register {
    /// Следующий по номеру регистр.
    pub fn next(self) -> Register {
        Register(self.0 + 1)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Метка перехода `L<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Бинарные операции.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
}

impl BinaryOp {
    /// Операция для бинарного оператора исходного языка (`+`, `<=`, ...).
    pub fn from_operator(op: &str) -> Option<Self> {
        let op = match op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "&" => BinaryOp::And,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "==" => BinaryOp::CmpEq,
            "!=" => BinaryOp::CmpNe,
            "<" => BinaryOp::CmpLt,
            "<=" => BinaryOp::CmpLe,
            ">" => BinaryOp::CmpGt,
            ">=" => BinaryOp::CmpGe,
            _ => return None,
        };
        Some(op)
    }

    /// Операция составного присваивания (`+=`, `<<=`, ...).
    pub fn from_compound_assign(op: &str) -> Option<Self> {
        match op {
            "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => {
                Self::from_operator(&op[..op.len() - 1])
            }
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "ADD",
            BinaryOp::Sub => "SUB",
            BinaryOp::Mul => "MUL",
            BinaryOp::Div => "DIV",
            BinaryOp::Mod => "MOD",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Shl => "SHL",
            BinaryOp::Shr => "SHR",
            BinaryOp::CmpEq => "CMPEQ",
            BinaryOp::CmpNe => "CMPNE",
            BinaryOp::CmpLt => "CMPLT",
            BinaryOp::CmpLe => "CMPLE",
            BinaryOp::CmpGt => "CMPGT",
            BinaryOp::CmpGe => "CMPGE",
        }
    }
}

/// Унарные операции.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "-" => Some(UnaryOp::Neg),
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "NEG",
            UnaryOp::Not => "NOT",
            UnaryOp::BitNot => "BNOT",
        }
    }
}

/// Типизированная инструкция.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    LoadImm { value: i64, dst: Register },
    LoadVar { name: String, dst: Register },
    Store { src: Register, name: String },
    Binary { op: BinaryOp, dst: Register, lhs: Register, rhs: Register },
    Unary { op: UnaryOp, dst: Register, src: Register },
    Jump(Label),
    JumpIfZero(Register, Label),
    JumpIfNotZero(Register, Label),
    Label(Label),
    Func(String),
    End(String),
    Param(Register),
    Arg(String),
    Call { name: String, dst: Register },
    Ret(Option<Register>),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::LoadImm { value, dst } => write!(f, "LOAD {}, {}", value, dst),
            Op::LoadVar { name, dst } => write!(f, "LOAD {}, {}", name, dst),
            Op::Store { src, name } => write!(f, "STORE {}, {}", src, name),
            Op::Binary { op, dst, lhs, rhs } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), dst, lhs, rhs)
            }
            Op::Unary { op, dst, src } => write!(f, "{} {}, {}", op.mnemonic(), dst, src),
            Op::Jump(label) => write!(f, "JMP {}", label),
            Op::JumpIfZero(reg, label) => write!(f, "JZ {}, {}", reg, label),
            Op::JumpIfNotZero(reg, label) => write!(f, "JNZ {}, {}", reg, label),
            Op::Label(label) => write!(f, "{}:", label),
            Op::Func(name) => write!(f, "FUNC {}", name),
            Op::End(name) => write!(f, "END {}", name),
            Op::Param(reg) => write!(f, "PARAM {}", reg),
            Op::Arg(name) => write!(f, "ARG {}", name),
            Op::Call { name, dst } => write!(f, "CALL {}, {}", name, dst),
            Op::Ret(Some(reg)) => write!(f, "RET {}", reg),
            Op::Ret(None) => write!(f, "RET"),
        }
    }
}

impl From<Op> for Instruction {
    fn from(op: Op) -> Self {
        Instruction::new(op.to_string())
    }
}
