// Bytecode codec tests

use super::*;
use crate::compiler::serializer::serialize;
use crate::grid::Grid;
use test_log::test;

fn program_of(instructions: Vec<Instruction>, labels: &[(usize, usize)]) -> Program {
    let mut program = Program::new();
    program.instructions = instructions;
    for &(label, target) in labels {
        program.labels.insert(label, target);
    }
    program
}

fn with_sentinel(records: &[u8]) -> Vec<u8> {
    let mut bytes = records.to_vec();
    bytes.extend_from_slice(&SENTINEL);
    bytes
}

#[test]
fn test_write_records() {
    let program = program_of(
        vec![
            Instruction::Push(0x123456),
            Instruction::Select(21),
            Instruction::Jmp(7),
            Instruction::Halt,
        ],
        &[(7, 0)],
    );
    assert_eq!(
        write_bytecode(&program).unwrap(),
        with_sentinel(&[
            0x56, 0x34, 0x12, 7, //
            21, 0, 0, 9, //
            0, 0, 0, 0xFF, //
            0, 0, 0, 18,
        ])
    );
}

#[test]
fn test_read_records() {
    let program = read_bytecode(&with_sentinel(&[2, 0, 0, 7, 0, 0, 0, 0xFF, 0, 0, 0, 18])).unwrap();
    assert_eq!(
        program.instructions,
        vec![Instruction::Push(2), Instruction::Jmp(0), Instruction::Halt]
    );
    assert_eq!(program.jump_target(1), Some(0));
}

#[test]
fn test_serialized_program_survives() {
    let program = serialize(&Grid::new("반받따망희"), false);
    let bytes = write_bytecode(&program).unwrap();
    let decoded = read_bytecode(&bytes).unwrap();
    assert_eq!(decoded.len(), program.len());
    for i in 0..program.len() {
        assert_eq!(decoded.instructions[i].opcode(), program.instructions[i].opcode());
        assert_eq!(decoded.instructions[i].value(), program.instructions[i].value());
        assert_eq!(decoded.jump_target(i), program.jump_target(i));
    }
    // Writing the decoded program again gives identical bytes
    assert_eq!(write_bytecode(&decoded).unwrap(), bytes);
}

#[test]
fn test_jump_to_end_of_program() {
    let program = read_bytecode(&with_sentinel(&[1, 0, 0, 0xFE])).unwrap();
    assert_eq!(program.instructions, vec![Instruction::BrPop1(1)]);
    assert_eq!(program.jump_target(0), Some(1));
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let mut bytes = with_sentinel(&[0, 0, 0, 18]);
    bytes.extend_from_slice(b"\n\n        HALT\n");
    assert_eq!(read_bytecode(&bytes).unwrap().instructions, vec![Instruction::Halt]);
}

#[test]
fn test_read_errors() {
    assert_eq!(
        read_bytecode(&[0, 0, 0, 18, 0, 0]),
        Err(CompilerError::TruncatedRecord { offset: 4 })
    );
    assert_eq!(
        read_bytecode(&[0, 0, 0, 18]),
        Err(CompilerError::MissingSentinel)
    );
    assert_eq!(
        read_bytecode(&with_sentinel(&[0, 0, 0, 18, 0, 0, 0, 13])),
        Err(CompilerError::UnknownOpcode { code: 13, record: 1 })
    );
    assert_eq!(
        read_bytecode(&with_sentinel(&[0, 0, 0, 0xFC])),
        Err(CompilerError::UnknownOpcode { code: 0xFC, record: 0 })
    );
    assert_eq!(
        read_bytecode(&with_sentinel(&[9, 0, 0, 0xFF])),
        Err(CompilerError::InvalidJumpTarget { record: 0, target: 9 })
    );
    // SEL 300, HALT
    assert_eq!(
        read_bytecode(&with_sentinel(&[0x2C, 0x01, 0, 9, 0, 0, 0, 18])),
        Err(CompilerError::StorageOutOfRange { record: 0, slot: 300 })
    );
    assert_eq!(
        read_bytecode(&with_sentinel(&[0, 0, 0, 18, 28, 0, 0, 10])),
        Err(CompilerError::StorageOutOfRange { record: 1, slot: 28 })
    );
}

#[test]
fn test_storage_operands_survive_rewrite() {
    let bytes = with_sentinel(&[27, 0, 0, 9, 21, 0, 0, 10, 0, 0, 0, 18]);
    let program = read_bytecode(&bytes).unwrap();
    assert_eq!(
        program.instructions,
        vec![Instruction::Select(27), Instruction::Move(21), Instruction::Halt]
    );
    assert_eq!(write_bytecode(&program).unwrap(), bytes);
}

#[test]
fn test_write_rejects_wide_operands() {
    let program = program_of(vec![Instruction::Halt, Instruction::Push(-1)], &[]);
    assert_eq!(
        write_bytecode(&program),
        Err(CompilerError::OperandOutOfRange { index: 1, value: -1 })
    );
    let program = program_of(vec![Instruction::Push(0x100_0000)], &[]);
    assert!(write_bytecode(&program).is_err());
}

#[test]
fn test_has_sentinel() {
    assert!(has_sentinel(&with_sentinel(&[])));
    assert!(!has_sentinel("반받따망희".as_bytes()));
    assert!(!has_sentinel(&[0xFF, 0xFF, 0xFF]));
}
