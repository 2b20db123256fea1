// Jump-chain collapse, control-flow reachability and compaction

use crate::opcode::Instruction;
use crate::program::Program;
use indexmap::IndexMap;
use log::debug;

/// Redirect every label that lands on a bare `JMP` to that jump's own
/// target (one hop per label).
pub fn collapse_jumps(program: &mut Program) {
    let labels: Vec<_> = program.labels.keys().copied().collect();
    let mut redirected = 0;
    for label in labels {
        let target = program.target(label);
        if let Some(Instruction::Jmp(next)) = program.instructions.get(target) {
            let indirect = program.target(*next);
            if indirect != target {
                program.labels.insert(label, indirect);
                redirected += 1;
            }
        }
    }
    debug!("collapse_jumps: {} labels redirected", redirected);
}

/// Instructions reachable from index 0 by following control flow
pub fn reachability(program: &Program) -> Vec<bool> {
    let len = program.len();
    let mut reached = vec![false; len];
    let mut pending = vec![0usize];
    while let Some(mut pc) = pending.pop() {
        while pc < len && !reached[pc] {
            reached[pc] = true;
            match program.instructions[pc] {
                Instruction::Halt => break,
                Instruction::Jmp(label) => {
                    pc = program.target(label);
                    continue;
                }
                Instruction::Brz(label) | Instruction::BrPop1(label) | Instruction::BrPop2(label) => {
                    pending.push(program.target(label));
                }
                _ => {}
            }
            pc += 1;
        }
    }
    reached
}

/// Delete every instruction whose `live` flag is false and renumber the
/// surviving label targets. Labels not referenced by a surviving jump are
/// dropped. Comments of deleted instructions move to the next survivor.
pub fn compact(program: &mut Program, live: &[bool]) {
    let len = program.len();
    let mut deleted_before = Vec::with_capacity(len + 1);
    let mut deleted = 0;
    for i in 0..len {
        deleted_before.push(deleted);
        if !live.get(i).copied().unwrap_or(false) {
            deleted += 1;
        }
    }
    deleted_before.push(deleted);

    let mut instructions = Vec::with_capacity(len - deleted);
    let mut labels = IndexMap::new();
    let mut comments = program.comments.as_ref().map(|_| Vec::new());
    let mut carried: Vec<String> = Vec::new();

    for (i, instruction) in program.instructions.iter().enumerate() {
        let own = program
            .comments
            .as_ref()
            .and_then(|c| c.get(i))
            .cloned()
            .unwrap_or_default();
        if !live.get(i).copied().unwrap_or(false) {
            carried.extend(own);
            continue;
        }
        if let Some(label) = instruction.label() {
            let target = program.target(label).min(len);
            labels.insert(label, target - deleted_before[target]);
        }
        instructions.push(*instruction);
        if let Some(comments) = comments.as_mut() {
            let mut merged = std::mem::take(&mut carried);
            merged.extend(own);
            comments.push(merged);
        }
    }

    debug!(
        "compact: {} -> {} instructions, {} labels",
        len,
        instructions.len(),
        labels.len()
    );
    program.instructions = instructions;
    program.labels = labels;
    program.comments = comments;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::assembly::read_asm;

    #[test]
    fn test_collapse_jumps() {
        let mut program = read_asm("JMP a\nHALT\na: JMP b\nb: HALT\n").unwrap();
        collapse_jumps(&mut program);
        assert_eq!(program.jump_target(0), Some(3));
        assert_eq!(program.jump_target(2), Some(3));
    }

    #[test]
    fn test_reachability() {
        let program =
            read_asm("PUSH 1\nBRZ x\nHALT\nPUSH 5\nx: POPNUM\nHALT\n").unwrap();
        assert_eq!(
            reachability(&program),
            vec![true, true, true, false, true, true]
        );
    }

    #[test]
    fn test_compact_renumbers_labels() {
        let mut program = read_asm("PUSH 1\nx: NONE\nJMP x\nHALT\n").unwrap();
        compact(&mut program, &[true, false, true, true]);
        assert_eq!(
            program.instructions,
            vec![Instruction::Push(1), Instruction::Jmp(0), Instruction::Halt]
        );
        // A label on a deleted instruction lands on the next survivor
        assert_eq!(program.jump_target(1), Some(1));
    }

    #[test]
    fn test_compact_carries_comments() {
        let mut program = read_asm("PUSH 1 ; one\nNONE ; gone\nHALT ; end\n").unwrap();
        compact(&mut program, &[true, false, true]);
        let comments = program.comments.unwrap();
        assert_eq!(comments[0], vec!["one".to_string()]);
        assert_eq!(comments[1], vec!["gone".to_string(), "end".to_string()]);
    }

    #[test]
    fn test_compact_drops_unreferenced_labels() {
        let mut program = read_asm("BRZ x\nx: HALT\n").unwrap();
        compact(&mut program, &[false, true]);
        assert_eq!(program.instructions, vec![Instruction::Halt]);
        assert!(program.labels.is_empty());
    }
}
