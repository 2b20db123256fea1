// Bytecode codec
//
// Each instruction is a 4-byte record: a 24-bit little-endian operand
// followed by the opcode byte (negative opcodes stored as 256 + code).
// Control instructions carry their resolved instruction index. The stream
// ends with FF FF FF FF.

use super::error::CompilerError;
use crate::opcode::{Instruction, Opcode};
use crate::program::Program;
use log::debug;

pub const SENTINEL: [u8; 4] = [0xFF; 4];

const RECORD_SIZE: usize = 4;
const MAX_OPERAND: i64 = 0xFF_FFFF;

pub fn write_bytecode(program: &Program) -> Result<Vec<u8>, CompilerError> {
    let mut bytes = Vec::with_capacity((program.len() + 1) * RECORD_SIZE);
    for (index, instruction) in program.instructions.iter().enumerate() {
        let operand = match instruction.label() {
            Some(label) => program.target(label) as i64,
            None => instruction.value().unwrap_or(0),
        };
        if !(0..=MAX_OPERAND).contains(&operand) {
            return Err(CompilerError::OperandOutOfRange {
                index,
                value: operand,
            });
        }
        let code = instruction.opcode().code().rem_euclid(256) as u8;
        bytes.push((operand & 0xFF) as u8);
        bytes.push(((operand >> 8) & 0xFF) as u8);
        bytes.push(((operand >> 16) & 0xFF) as u8);
        bytes.push(code);
    }
    bytes.extend_from_slice(&SENTINEL);
    Ok(bytes)
}

/// Whether the data looks like bytecode, i.e. contains the terminator
pub fn has_sentinel(data: &[u8]) -> bool {
    data.windows(RECORD_SIZE).any(|w| w == SENTINEL)
}

/// Decode a bytecode stream. Jump labels are numbered after the index they
/// resolve to. Bytes after the terminator are ignored.
pub fn read_bytecode(data: &[u8]) -> Result<Program, CompilerError> {
    let mut program = Program::new();
    let mut offset = 0;
    loop {
        let record = match data.get(offset..offset + RECORD_SIZE) {
            Some(record) => record,
            None if offset == data.len() => return Err(CompilerError::MissingSentinel),
            None => return Err(CompilerError::TruncatedRecord { offset }),
        };
        if record == SENTINEL {
            break;
        }
        let index = offset / RECORD_SIZE;
        let operand =
            record[0] as i64 | (record[1] as i64) << 8 | (record[2] as i64) << 16;
        let code = if record[3] >= 128 {
            record[3] as i16 - 256
        } else {
            record[3] as i16
        };
        let opcode = Opcode::from_code(code).ok_or(CompilerError::UnknownOpcode {
            code: record[3],
            record: index,
        })?;
        let instruction = Instruction::from_parts(opcode, operand).ok_or(
            CompilerError::StorageOutOfRange {
                record: index,
                slot: operand,
            },
        )?;
        if let Some(label) = instruction.label() {
            program.labels.insert(label, label);
        }
        program.instructions.push(instruction);
        offset += RECORD_SIZE;
    }

    let len = program.len();
    for (record, instruction) in program.instructions.iter().enumerate() {
        if let Some(target) = instruction.label() {
            if target > len {
                return Err(CompilerError::InvalidJumpTarget { record, target });
            }
        }
    }
    debug!("read_bytecode: {} instructions", len);
    Ok(program)
}

#[cfg(test)]
#[path = "bytecode_tests.rs"]
mod tests;
