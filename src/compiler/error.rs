// Compiler Error Handling

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompilerError {
    // Bytecode errors
    TruncatedRecord { offset: usize },
    MissingSentinel,
    UnknownOpcode { code: u8, record: usize },
    InvalidJumpTarget { record: usize, target: usize },
    StorageOutOfRange { record: usize, slot: i64 },
    OperandOutOfRange { index: usize, value: i64 },

    // Assembly errors
    UnknownMnemonic { line: usize, mnemonic: String },
    MissingOperand { line: usize },
    InvalidOperand { line: usize, operand: String },
    UndefinedLabel { line: usize, label: String },
    InvalidStorage { line: usize, slot: i64 },

    // Source errors
    InvalidUtf8(String),
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::TruncatedRecord { offset } => {
                write!(f, "Truncated bytecode record at byte offset {}", offset)
            }
            CompilerError::MissingSentinel => {
                write!(f, "Bytecode stream ends without the FF FF FF FF terminator")
            }
            CompilerError::UnknownOpcode { code, record } => {
                write!(f, "Unknown opcode byte {:#04x} in record {}", code, record)
            }
            CompilerError::InvalidJumpTarget { record, target } => {
                write!(
                    f,
                    "Jump in record {} targets instruction {} outside the program",
                    record, target
                )
            }
            CompilerError::StorageOutOfRange { record, slot } => {
                write!(f, "Storage index {} out of range in record {}", slot, record)
            }
            CompilerError::OperandOutOfRange { index, value } => {
                write!(
                    f,
                    "Operand {} of instruction {} does not fit in 24 bits",
                    value, index
                )
            }
            CompilerError::UnknownMnemonic { line, mnemonic } => {
                write!(f, "Unknown mnemonic '{}' on line {}", mnemonic, line)
            }
            CompilerError::MissingOperand { line } => {
                write!(f, "Missing operand on line {}", line)
            }
            CompilerError::InvalidOperand { line, operand } => {
                write!(f, "Invalid operand '{}' on line {}", operand, line)
            }
            CompilerError::UndefinedLabel { line, label } => {
                write!(f, "Undefined label '{}' on line {}", label, line)
            }
            CompilerError::InvalidStorage { line, slot } => {
                write!(f, "Storage index {} out of range on line {}", slot, line)
            }
            CompilerError::InvalidUtf8(msg) => {
                write!(f, "Source is not valid UTF-8: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompilerError {}
