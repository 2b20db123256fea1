// Block reordering: move a jump-only block next to the jump that enters it
//
//   ... JMP | i: ... JMP (ix) | ... | f: JMP -> i | ...
//
// When the block starting at `i` cannot be entered by falling through
// (instruction i-1 is a JMP), is entered by exactly one JMP at `f`, and
// leaves through a JMP at `ix` without branching on the way, the block
// replaces the jump at `f`.

use crate::opcode::Instruction;
use crate::program::Program;
use log::debug;
use std::collections::HashMap;

pub fn reorder_blocks(program: &mut Program) {
    let mut moves = 0;
    while let Some((i, ix, f)) = find_movable_block(program) {
        relocate(program, i, ix, f);
        moves += 1;
    }
    program.remove_unused_labels();
    debug!("reorder_blocks: {} blocks moved", moves);
}

fn find_movable_block(program: &Program) -> Option<(usize, usize, usize)> {
    let len = program.len();
    // jump source -> destination, and destination -> its only jump source
    let mut jump_map: HashMap<usize, usize> = HashMap::new();
    let mut jump_rmap: HashMap<usize, Option<usize>> = HashMap::new();
    for (source, instruction) in program.instructions.iter().enumerate() {
        if let Instruction::Jmp(label) = instruction {
            let dest = program.target(*label);
            jump_map.insert(source, dest);
            jump_rmap
                .entry(dest)
                .and_modify(|only| *only = None)
                .or_insert(Some(source));
        }
    }

    for i in 1..len {
        let f = match jump_rmap.get(&i) {
            Some(Some(f)) => *f,
            _ => continue,
        };
        if !jump_map.contains_key(&(i - 1)) {
            continue;
        }
        let ix = match block_end(program, i, &jump_map, &jump_rmap) {
            Some(ix) => ix,
            None => continue,
        };
        if ix == f || f == i {
            continue;
        }
        return Some((i, ix, f));
    }
    None
}

/// Index of the JMP closing the block that starts at `i`
fn block_end(
    program: &Program,
    i: usize,
    jump_map: &HashMap<usize, usize>,
    jump_rmap: &HashMap<usize, Option<usize>>,
) -> Option<usize> {
    let mut ix = i;
    while ix + 1 < program.len() {
        ix += 1;
        if jump_map.contains_key(&ix) {
            return Some(ix);
        }
        if jump_rmap.contains_key(&ix) || program.instructions[ix].opcode().is_branch() {
            return None;
        }
    }
    None
}

/// Move block `i..=ix` into the place of the jump at `f`, deleting it
fn relocate(program: &mut Program, i: usize, ix: usize, f: usize) {
    let len = program.len();
    let order: Vec<usize> = if ix < f {
        (0..i).chain(ix + 1..f).chain(i..=ix).chain(f + 1..len).collect()
    } else {
        (0..f).chain(i..=ix).chain(f + 1..i).chain(ix + 1..len).collect()
    };
    debug!("reorder_blocks: block {}..={} replaces jump at {}", i, ix, f);

    let mut new_index = vec![0; len + 1];
    for (new, &old) in order.iter().enumerate() {
        new_index[old] = new;
    }
    new_index[f] = new_index[i];
    new_index[len] = order.len();

    for target in program.labels.values_mut() {
        *target = new_index[(*target).min(len)];
    }
    program.instructions = order.iter().map(|&k| program.instructions[k]).collect();
    if let Some(comments) = program.comments.as_mut() {
        let old = std::mem::take(comments);
        *comments = order
            .iter()
            .map(|&k| old.get(k).cloned().unwrap_or_default())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::assembly::read_asm;
    use crate::opcode::Opcode;

    #[test]
    fn test_blocks_move_to_their_only_entry() {
        let mut program = read_asm(
            "        PUSH 5
        JMP L4
L2:     POPNUM
        JMP L6
L4:     DUP
        JMP L2
L6:     HALT
",
        )
        .unwrap();
        reorder_blocks(&mut program);
        let opcodes: Vec<_> = program.instructions.iter().map(|i| i.opcode()).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::Push, Opcode::Dup, Opcode::PopNum, Opcode::Jmp, Opcode::Halt]
        );
        assert_eq!(program.jump_target(3), Some(4));
        assert_eq!(program.labels.len(), 1);
    }

    #[test]
    fn test_block_without_closing_jump_stays() {
        let source = "PUSH 1\nJMP x\nx: POPNUM\nHALT\n";
        let mut program = read_asm(source).unwrap();
        reorder_blocks(&mut program);
        assert_eq!(program.instructions, read_asm(source).unwrap().instructions);
    }
}
