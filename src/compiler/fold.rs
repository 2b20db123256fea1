// Constant folding
//
// Instructions are first classified by the kind of storage selected when
// they run. Only instructions that never run on the queue or the port are
// folded: the queue pops its operands in the opposite order, and the port
// duplicates its last push rather than its top.

use crate::number::binary_op;
use crate::opcode::{Instruction, LabelId, SLOT_PORT, SLOT_QUEUE};
use crate::program::Program;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Largest literal a bytecode record can carry
pub const MAX_LITERAL: i64 = 0xFF_FFFF;

/// Storage context of every instruction: `None` if never reached,
/// `Some(true)` if it may run with the queue or port selected
pub fn queue_context(program: &Program) -> Vec<Option<bool>> {
    let len = program.len();
    let mut context: Vec<Option<bool>> = vec![None; len];
    let mut jobs: VecDeque<(usize, bool)> = VecDeque::new();
    jobs.push_back((0, false));

    while let Some((mut pc, mut in_queue)) = jobs.pop_front() {
        while pc < len {
            if let Some(seen) = context[pc] {
                if seen || !in_queue {
                    break;
                }
            }
            context[pc] = Some(in_queue);
            let instruction = program.instructions[pc];
            if instruction.opcode().is_branch() {
                jobs.push_back((pc + 1, in_queue));
                jobs.push_back((program.jump_target(pc).unwrap_or(len), in_queue));
                break;
            }
            match instruction {
                Instruction::Jmp(label) => {
                    jobs.push_back((program.target(label), in_queue));
                    break;
                }
                Instruction::Select(slot) => in_queue = slot == SLOT_QUEUE || slot == SLOT_PORT,
                Instruction::Halt => break,
                _ => {}
            }
            pc += 1;
        }
    }
    context
}

struct Folder<'a> {
    program: &'a mut Program,
    context: Vec<Option<bool>>,
    live: Vec<bool>,
    /// Instruction index -> its only label
    unique_labels: HashMap<usize, LabelId>,
    /// Label id -> number of instructions referring to it
    label_uses: HashMap<LabelId, usize>,
    /// Instruction index -> number of labels resolving to it
    targets: Vec<usize>,
    folded: usize,
}

/// Fold constant operations in place. Returns the liveness vector for
/// compaction: unreached and folded-away instructions are false.
pub fn fold_constants(program: &mut Program, fold_dup: bool) -> Vec<bool> {
    let context = queue_context(program);
    let live = context.iter().map(Option::is_some).collect();
    let unique_labels = program.unique_labels();
    let targets = program.target_counts();
    let mut label_uses = HashMap::new();
    for label in program.instructions.iter().filter_map(|i| i.label()) {
        *label_uses.entry(label).or_insert(0) += 1;
    }

    let mut folder = Folder {
        program,
        context,
        live,
        unique_labels,
        label_uses,
        targets,
        folded: 0,
    };
    if fold_dup {
        folder.fold_dups();
    }
    folder.fold_operations();
    debug!("fold_constants: {} operations folded", folder.folded);
    folder.live
}

impl<'a> Folder<'a> {
    /// Runs only with a plain stack selected
    fn is_stack_only(&self, index: usize) -> bool {
        self.context.get(index).copied().flatten() == Some(false)
    }

    /// Closest preceding instruction that is not a no-op
    fn previous(&self, index: usize) -> Option<usize> {
        (0..index)
            .rev()
            .find(|&i| self.program.instructions[i] != Instruction::None)
    }

    /// Whether a jump may land anywhere in `from..=to`
    fn has_target_in(&self, from: usize, to: usize) -> bool {
        self.targets
            .get(from..=to)
            .map_or(false, |counts| counts.iter().any(|&count| count > 0))
    }

    fn fold_dups(&mut self) {
        for i in 1..self.program.len() {
            if self.program.instructions[i] != Instruction::Dup {
                continue;
            }
            let i1 = match self.previous(i) {
                Some(i1) => i1,
                None => continue,
            };
            if !self.is_stack_only(i) || !self.is_stack_only(i1) {
                continue;
            }
            if self.has_target_in(i1 + 1, i) {
                continue;
            }
            if let Instruction::Push(value) = self.program.instructions[i1] {
                self.program.instructions[i] = Instruction::Push(value);
                self.folded += 1;
            }
        }
    }

    fn fold_operations(&mut self) {
        for i in 2..self.program.len() {
            let i1 = match self.previous(i) {
                Some(i1) => i1,
                None => continue,
            };
            let i2 = match self.previous(i1) {
                Some(i2) => i2,
                None => continue,
            };
            let v2 = match self.program.instructions[i2] {
                Instruction::Push(v) => v,
                _ => continue,
            };
            let v1 = match self.program.instructions[i1] {
                Instruction::Push(v) => v,
                Instruction::Dup => v2,
                _ => continue,
            };
            if ![i, i1, i2].iter().all(|&k| self.is_stack_only(k)) {
                continue;
            }
            if self.has_target_in(i2 + 1, i) {
                continue;
            }

            match self.program.instructions[i] {
                Instruction::Jmp(label) => self.fold_through_jump(i, i1, i2, label, v1, v2),
                instruction if instruction.opcode().is_binary() => {
                    if let Some(value) = evaluate(instruction, v2, v1) {
                        self.program.instructions[i] = Instruction::Push(value);
                        self.program.instructions[i1] = Instruction::None;
                        self.program.instructions[i2] = Instruction::None;
                        self.live[i1] = false;
                        self.live[i2] = false;
                        self.folded += 1;
                    }
                }
                _ => {}
            }
        }
    }

    /// `PUSH; PUSH; JMP t` where `t` holds the operation and is entered only
    /// through this jump's label: compute here and jump past the operation
    fn fold_through_jump(&mut self, i: usize, i1: usize, i2: usize, label: LabelId, v1: i64, v2: i64) {
        let target = self.program.target(label);
        if self.unique_labels.get(&target) != Some(&label)
            || self.label_uses.get(&label) != Some(&1)
            || target + 1 >= self.program.len()
        {
            return;
        }
        let operation = self.program.instructions[target];
        if !operation.opcode().is_binary() {
            return;
        }
        let value = match evaluate(operation, v2, v1) {
            Some(value) => value,
            None => return,
        };

        debug!("fold_constants: {} at {} folded through jump {}", operation, target, i);
        self.program.instructions[i1] = Instruction::Push(value);
        self.program.instructions[i2] = Instruction::None;
        self.live[i2] = false;
        self.program.labels.insert(label, target + 1);
        self.targets[target] -= 1;
        self.targets[target + 1] += 1;
        self.unique_labels.remove(&target);
        if self.targets[target + 1] == 1 {
            self.unique_labels.insert(target + 1, label);
        } else {
            self.unique_labels.remove(&(target + 1));
        }
        if let Some(comments) = self.program.comments.as_mut() {
            let moved = comments.get(target).cloned().unwrap_or_default();
            if let Some(slot) = comments.get_mut(i1) {
                slot.extend(moved);
            }
        }
        self.folded += 1;
    }
}

/// Compile-time value of `left op right`, if it can be stored as a literal
fn evaluate(operation: Instruction, left: i64, right: i64) -> Option<i64> {
    match binary_op(operation.opcode(), &left, &right) {
        Ok(value) if (0..=MAX_LITERAL).contains(&value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
#[path = "fold_tests.rs"]
mod tests;
