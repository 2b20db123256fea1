// Constant folding tests

use super::*;
use crate::compiler::assembly::read_asm;
use test_log::test;

fn folded(source: &str) -> (Program, Vec<bool>) {
    let mut program = read_asm(source).unwrap();
    let live = fold_constants(&mut program, true);
    (program, live)
}

#[test]
fn test_fold_addition() {
    let (program, live) = folded("PUSH 3\nPUSH 4\nADD\nPOPNUM\nHALT\n");
    assert_eq!(program.instructions[2], Instruction::Push(7));
    assert_eq!(live, vec![false, false, true, true, true]);
}

#[test]
fn test_fold_division_and_compare() {
    let (program, _) = folded("PUSH 10\nPUSH 3\nDIV\n");
    assert_eq!(program.instructions[2], Instruction::Push(3));
    let (program, _) = folded("PUSH 5\nPUSH 5\nCMP\n");
    assert_eq!(program.instructions[2], Instruction::Push(1));
    let (program, _) = folded("PUSH 9\nPUSH 4\nMOD\n");
    assert_eq!(program.instructions[2], Instruction::Push(1));
}

#[test]
fn test_fold_chains() {
    let (program, _) = folded("PUSH 1\nPUSH 2\nADD\nPUSH 3\nMUL\nPOPNUM\n");
    assert_eq!(program.instructions[4], Instruction::Push(9));
}

#[test]
fn test_fold_dup() {
    let (program, live) = folded("PUSH 4\nDUP\nMUL\n");
    assert_eq!(program.instructions[2], Instruction::Push(16));
    assert_eq!(live, vec![false, false, true]);

    let mut program = read_asm("PUSH 4\nDUP\nPOPNUM\n").unwrap();
    fold_constants(&mut program, false);
    assert_eq!(program.instructions[1], Instruction::Dup);
    fold_constants(&mut program, true);
    assert_eq!(program.instructions[1], Instruction::Push(4));
}

#[test]
fn test_unrepresentable_results_stay() {
    for source in [
        "PUSH 3\nPUSH 4\nSUB\n",
        "PUSH 1\nPUSH 0\nDIV\n",
        "PUSH 1\nPUSH 0\nMOD\n",
        "PUSH 9999\nPUSH 9999\nMUL\n",
    ] {
        let (program, live) = folded(source);
        assert_eq!(program.instructions, read_asm(source).unwrap().instructions, "{}", source);
        assert!(live.iter().all(|&l| l));
    }
}

#[test]
fn test_queue_and_port_are_not_folded() {
    let source = "SEL 21\nPUSH 3\nPUSH 4\nSUB\n";
    let (program, _) = folded(source);
    assert_eq!(program.instructions[3], Instruction::Sub);

    let (program, _) = folded("SEL 27\nPUSH 4\nDUP\n");
    assert_eq!(program.instructions[2], Instruction::Dup);
}

#[test]
fn test_jump_target_blocks_folding() {
    let (program, _) = folded("PUSH 2\nx: PUSH 3\nADD\nJMP x\n");
    assert_eq!(program.instructions[2], Instruction::Add);
}

#[test]
fn test_queue_context() {
    let program = read_asm("PUSH 1\nBRZ q\nSEL 21\nq: PUSH 2\nHALT\n").unwrap();
    assert_eq!(
        queue_context(&program),
        vec![Some(false), Some(false), Some(false), Some(true), Some(true)]
    );
    let program = read_asm("JMP x\nPUSH 1\nx: HALT\n").unwrap();
    assert_eq!(queue_context(&program), vec![Some(false), None, Some(false)]);
}

#[test]
fn test_fold_through_jump() {
    let (program, live) = folded("PUSH 3\nPUSH 4\nJMP t\nHALT\nt: ADD\nPOPNUM\nHALT\n");
    assert_eq!(program.instructions[0], Instruction::None);
    assert_eq!(program.instructions[1], Instruction::Push(7));
    assert_eq!(program.jump_target(2), Some(5));
    assert!(!live[0]);
    assert!(!live[3]);
}

#[test]
fn test_shared_operation_is_not_folded_through_jump() {
    let source = "PUSH 3\nPUSH 4\nJMP t\nPUSH 1\nJMP t\nt: ADD\nPOPNUM\nHALT\n";
    let (program, _) = folded(source);
    assert_eq!(program.instructions[1], Instruction::Push(4));
    assert_eq!(program.jump_target(2), Some(5));
}
