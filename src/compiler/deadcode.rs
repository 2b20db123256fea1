// Dead-code analysis driven by lower bounds on storage depth
//
// Both analyses walk the control flow from instruction 0 carrying a lower
// bound on the depth of the selected storage. A depth guard whose
// requirement is met by that bound is stepped over without being marked,
// so guards that every path satisfies, and branch arms only they reach,
// come out dead.

use crate::opcode::{Instruction, STORAGE_COUNT};
use crate::program::Program;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Depth after executing `instruction` on a storage holding at least `depth`
fn transfer(instruction: &Instruction, depth: usize) -> usize {
    let op = instruction.opcode();
    depth.saturating_sub(op.stack_delete()) + op.stack_add()
}

/// Coarse analysis: one depth bound for whichever storage is selected.
/// Selecting a storage resets the bound to zero.
pub fn live_coarse(program: &Program) -> Vec<bool> {
    let len = program.len();
    let mut min_depth: Vec<Option<usize>> = vec![None; len];
    let mut jobs: VecDeque<(usize, usize)> = VecDeque::new();
    jobs.push_back((0, 0));

    while let Some((mut pc, mut depth)) = jobs.pop_front() {
        while pc < len {
            if let Some(seen) = min_depth[pc] {
                if depth >= seen {
                    break;
                }
            }
            let instruction = program.instructions[pc];
            let op = instruction.opcode();
            if op.is_guard() {
                if depth >= op.required_size() {
                    pc += 1;
                    continue;
                }
                min_depth[pc] = Some(depth);
                jobs.push_back((program.jump_target(pc).unwrap_or(len), depth));
                pc += 1;
                continue;
            }

            min_depth[pc] = Some(depth);
            depth = transfer(&instruction, depth);
            match instruction {
                Instruction::Brz(label) => jobs.push_back((program.target(label), depth)),
                Instruction::Jmp(label) => {
                    pc = program.target(label);
                    continue;
                }
                Instruction::Select(_) => depth = 0,
                Instruction::Halt => break,
                _ => {}
            }
            pc += 1;
        }
    }

    let live: Vec<bool> = min_depth.iter().map(Option::is_some).collect();
    debug!(
        "live_coarse: {} of {} instructions live",
        live.iter().filter(|&&l| l).count(),
        len
    );
    live
}

/// Precise analysis: a depth bound per storage plus the selected storage.
/// Moving into a storage raises that storage's bound.
pub fn live_precise(program: &Program) -> Vec<bool> {
    let len = program.len();
    let mut live = vec![false; len];
    let mut min_depths: HashMap<(usize, u8), [usize; STORAGE_COUNT]> = HashMap::new();
    let mut jobs: VecDeque<(usize, u8, [usize; STORAGE_COUNT])> = VecDeque::new();
    jobs.push_back((0, 0, [0; STORAGE_COUNT]));

    while let Some((mut pc, mut selected, mut depths)) = jobs.pop_front() {
        while pc < len {
            let instruction = program.instructions[pc];
            let op = instruction.opcode();
            let current = depths.get(selected as usize).copied().unwrap_or(0);

            if op.is_guard() && current >= op.required_size() {
                pc += 1;
                continue;
            }

            // Join with what was already explored from here; stop when this
            // path adds nothing
            match min_depths.get_mut(&(pc, selected)) {
                Some(seen) => {
                    if depths.iter().zip(seen.iter()).all(|(d, s)| d >= s) {
                        break;
                    }
                    for (s, d) in seen.iter_mut().zip(depths.iter()) {
                        *s = (*s).min(*d);
                    }
                    depths = *seen;
                }
                None => {
                    min_depths.insert((pc, selected), depths);
                }
            }
            live[pc] = true;

            if op.is_guard() {
                jobs.push_back((program.jump_target(pc).unwrap_or(len), selected, depths));
                pc += 1;
                continue;
            }

            let current = depths.get(selected as usize).copied().unwrap_or(0);
            if let Some(slot) = depths.get_mut(selected as usize) {
                *slot = transfer(&instruction, current);
            }
            match instruction {
                Instruction::Brz(label) => {
                    jobs.push_back((program.target(label), selected, depths));
                }
                Instruction::Jmp(label) => {
                    pc = program.target(label);
                    continue;
                }
                Instruction::Select(slot) => selected = slot,
                Instruction::Move(slot) => {
                    if let Some(depth) = depths.get_mut(slot as usize) {
                        *depth += 1;
                    }
                }
                Instruction::Halt => break,
                _ => {}
            }
            pc += 1;
        }
    }

    debug!(
        "live_precise: {} of {} instructions live",
        live.iter().filter(|&&l| l).count(),
        len
    );
    live
}
