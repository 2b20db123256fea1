// Assembly codec tests

use super::*;
use crate::compiler::serializer::serialize;
use crate::grid::Grid;
use test_log::test;

/// Opcode, operand and resolved target of every instruction
fn shape(program: &Program) -> Vec<(Opcode, Option<i64>, Option<usize>)> {
    (0..program.len())
        .map(|i| {
            let instruction = program.instructions[i];
            (instruction.opcode(), instruction.value(), program.jump_target(i))
        })
        .collect()
}

#[test]
fn test_write_layout() {
    let program = serialize(&Grid::new("반받따망희"), false);
    let text = write_asm(&program, false);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "        PUSH 2    ");
    assert_eq!(lines[1], "L1:     PUSH 3    ");
    assert_eq!(lines[2], "L2:     BRPOP2 L7  ");
    assert_eq!(lines[3], "        MUL       ");
    assert_eq!(lines[5], "        POPNUM    ");
    assert_eq!(lines[7], "L7:     JMP  L1   ");
}

#[test]
fn test_write_commented() {
    let program = serialize(&Grid::new("반받따망희"), true);
    let text = write_asm(&program, true);
    let first = text.lines().next().unwrap();
    assert_eq!(first, "        PUSH 2     ; L0   반 / [  0,  0] RIGHT1");
}

#[test]
fn test_text_round_trip() {
    let program = serialize(&Grid::new("반받따망희"), true);
    for commented in [false, true] {
        let decoded = read_asm(&write_asm(&program, commented)).unwrap();
        assert_eq!(shape(&decoded), shape(&program));
    }
    let decoded = read_asm(&write_asm(&program, true)).unwrap();
    assert_eq!(decoded.comment(0), program.comment(0));
    assert_eq!(decoded.comment(7), "");
}

#[test]
fn test_label_past_the_end() {
    let program = read_asm("JMP end\nend:\n").unwrap();
    assert_eq!(program.jump_target(0), Some(1));
    let text = write_asm(&program, false);
    assert_eq!(text, "        JMP  L1   \nL1:\n");
    assert_eq!(shape(&read_asm(&text).unwrap()), shape(&program));
}

#[test]
fn test_mnemonics_and_operands() {
    let program = read_asm("  push 7\n\n; nothing here\nsel 27 ; port\nJMP 0\nbrz 3\n").unwrap();
    assert_eq!(
        shape(&program),
        vec![
            (Opcode::Push, Some(7), None),
            (Opcode::Select, Some(27), None),
            (Opcode::Jmp, None, Some(0)),
            (Opcode::Brz, None, Some(3)),
        ]
    );
    assert_eq!(program.comment(1), "port");
}

#[test]
fn test_read_errors() {
    assert_eq!(
        read_asm("PUSH 1\nFROB\n"),
        Err(CompilerError::UnknownMnemonic {
            line: 2,
            mnemonic: "FROB".to_string()
        })
    );
    assert_eq!(read_asm("PUSH"), Err(CompilerError::MissingOperand { line: 1 }));
    assert_eq!(read_asm("JMP\n"), Err(CompilerError::MissingOperand { line: 1 }));
    assert_eq!(
        read_asm("PUSH x"),
        Err(CompilerError::InvalidOperand {
            line: 1,
            operand: "x".to_string()
        })
    );
    assert_eq!(
        read_asm("HALT\nJMP nowhere"),
        Err(CompilerError::UndefinedLabel {
            line: 2,
            label: "nowhere".to_string()
        })
    );
    assert_eq!(
        read_asm("JMP 5"),
        Err(CompilerError::UndefinedLabel {
            line: 1,
            label: "5".to_string()
        })
    );
    assert_eq!(
        read_asm("MOV 28"),
        Err(CompilerError::InvalidStorage { line: 1, slot: 28 })
    );
}
