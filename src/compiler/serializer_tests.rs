// Serializer tests: the traced instruction lists of small panes

use super::*;
use crate::opcode::Instruction::{
    BrPop1, BrPop2, Halt, Jmp, Move, Mul, PopChar, PopNum, Push, PushChar, PushNum, Select,
};
use test_log::test;

fn serialized(source: &str) -> Program {
    serialize(&Grid::new(source), false)
}

fn targets(program: &Program) -> Vec<Option<usize>> {
    (0..program.len()).map(|i| program.jump_target(i)).collect()
}

#[test]
fn test_straight_line_with_guards() {
    let program = serialized("반받따망희");
    assert_eq!(
        program.instructions,
        vec![
            Push(2),
            Push(3),
            BrPop2(0),
            Mul,
            BrPop1(1),
            PopNum,
            Halt,
            Jmp(2),
            Jmp(3)
        ]
    );
    // Guard failures continue in reverse and rejoin traced code
    assert_eq!(program.target(0), 7);
    assert_eq!(program.target(1), 8);
    assert_eq!(program.target(2), 1);
    assert_eq!(program.target(3), 2);
    assert!(program.comments.is_none());
}

#[test]
fn test_empty_source() {
    let program = serialized("");
    assert!(program.is_empty());
    assert!(program.labels.is_empty());
    assert!(serialized("\n\n").is_empty());
}

#[test]
fn test_halt_on_first_cell() {
    assert_eq!(serialized("희반").instructions, vec![Halt]);
}

#[test]
fn test_vertical_travel() {
    assert_eq!(serialized("분\n희").instructions, vec![Push(2), Halt]);
}

#[test]
fn test_revisited_state_becomes_jump() {
    let program = serialized("반");
    assert_eq!(program.instructions, vec![Push(2), Jmp(0)]);
    assert_eq!(targets(&program), vec![None, Some(0)]);
}

#[test]
fn test_io_specializations() {
    let program = serialized("방밯망맣희");
    assert_eq!(
        program.instructions,
        vec![
            PushNum,
            PushChar,
            BrPop1(0),
            PopNum,
            BrPop1(1),
            PopChar,
            Halt,
            Jmp(2),
            Jmp(3)
        ]
    );
    assert_eq!(
        targets(&program),
        vec![None, None, Some(7), None, Some(8), None, None, Some(1), Some(2)]
    );
}

#[test]
fn test_storage_operands() {
    let program = serialized("상쌍희");
    assert_eq!(
        program.instructions,
        vec![Select(21), BrPop1(0), Move(21), Halt, Jmp(1)]
    );
    assert_eq!(program.target(0), 4);
    assert_eq!(program.target(1), 0);
}

#[test]
fn test_non_hangul_cells_emit_nothing() {
    let plain = serialized("반받따망희");
    let padded = serialized("반ab받따망희");
    assert_eq!(padded.instructions, plain.instructions);
}

#[test]
fn test_provenance_comments() {
    let program = serialize(&Grid::new("반받따망희"), true);
    let comments = program.comments.as_ref().unwrap();
    assert_eq!(comments.len(), program.len());
    assert_eq!(comments[0], vec!["반".to_string(), "[  0,  0] RIGHT1".to_string()]);
    // The guard itself has no cell; the operation behind it does
    assert!(comments[2].is_empty());
    assert_eq!(comments[3][0], "따");
    assert_eq!(program.comment(6), "희 / [  0,  4] RIGHT1");
}
