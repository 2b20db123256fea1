// Graph serializer: traces the two-dimensional pane into a linear program

use crate::grid::{
    Cell, Direction, Grid, Position, Step, VALUE_CONSTANTS, VALUE_NUMBER, VALUE_UNICODE,
};
use crate::opcode::{Instruction, LabelId, Opcode};
use crate::program::Program;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Cursor state; every distinct state is emitted at most once
type State = (Position, Direction, Step);

/// Where a traced state landed in the instruction list
#[derive(Debug, Clone, Copy)]
struct Visit {
    /// Index of the instruction for the cell itself
    code: usize,
    /// Index of the depth guard preceding it, if the cell needed one
    guard: Option<usize>,
}

/// A pending trace, started when dequeued
#[derive(Debug)]
struct Job {
    position: Position,
    direction: Direction,
    step: Step,
    label: Option<LabelId>,
}

struct Serializer<'a> {
    grid: &'a Grid,
    program: Program,
    visits: HashMap<State, Visit>,
    jobs: VecDeque<Job>,
    next_label: LabelId,
    /// (instruction index, provenance text) pairs, in trace order
    provenance: Vec<(usize, String)>,
}

/// Serialize a pane starting at the top-left cell moving down.
/// With `with_comments`, every instruction records the cells it came from.
pub fn serialize(grid: &Grid, with_comments: bool) -> Program {
    let mut serializer = Serializer {
        grid,
        program: Program::new(),
        visits: HashMap::new(),
        jobs: VecDeque::new(),
        next_label: 0,
        provenance: Vec::new(),
    };
    if !grid.is_empty() {
        serializer.run();
    }
    serializer.finish(with_comments)
}

impl<'a> Serializer<'a> {
    fn run(&mut self) {
        self.jobs.push_back(Job {
            position: Position::new(0, 0),
            direction: Direction::Down,
            step: 1,
            label: None,
        });
        while let Some(job) = self.jobs.pop_front() {
            debug!(
                "serialize: dequeue {} {} {} label {:?}",
                job.position,
                job.direction.name(),
                job.step,
                job.label
            );
            if let Some(label) = job.label {
                self.program.labels.insert(label, self.program.len());
            }
            self.trace(job.position, job.direction, job.step);
        }
    }

    fn new_label(&mut self) -> LabelId {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.program.instructions.push(instruction);
        self.program.len() - 1
    }

    /// First cell inside the pane at or after `position`, or None if the
    /// travel never meets one
    fn skip_to_cell(&self, mut position: Position, direction: Direction, step: Step) -> Option<Position> {
        let limit = (self.grid.height() + 1) * (self.grid.width() + 2);
        for _ in 0..limit {
            if self.grid.contains(position) {
                return Some(position);
            }
            position = self.grid.advance(position, direction, step);
        }
        None
    }

    fn trace(&mut self, start: Position, mut direction: Direction, mut step: Step) {
        let mut position = start;
        loop {
            position = match self.skip_to_cell(position, direction, step) {
                Some(p) => p,
                None => return,
            };

            let cell = self.grid.decode(position);
            let (next_direction, next_step) = cell.movement.apply(direction, step);
            if cell.movement.is_deterministic() {
                direction = next_direction;
                step = next_step;
            }

            let state = (position, direction, step);
            if let Some(visit) = self.visits.get(&state).copied() {
                let label = self.new_label();
                self.program
                    .labels
                    .insert(label, visit.guard.unwrap_or(visit.code));
                self.emit(Instruction::Jmp(label));
                return;
            }
            self.visits.insert(
                state,
                Visit {
                    code: self.program.len(),
                    guard: None,
                },
            );

            direction = next_direction;
            step = next_step;

            let halted = self.emit_cell(state, cell, direction, step);
            self.record_provenance(state);
            if halted {
                return;
            }
            position = self.grid.advance(position, direction, step);
        }
    }

    /// Emit the instructions of one cell. `direction` and `step` are the
    /// outgoing travel, which the underflow path reverses. Returns true on
    /// halt.
    fn emit_cell(&mut self, state: State, cell: Cell, direction: Direction, step: Step) -> bool {
        let opcode = match (cell.opcode, cell.value) {
            (Opcode::Pop, VALUE_NUMBER) => Opcode::PopNum,
            (Opcode::Pop, VALUE_UNICODE) => Opcode::PopChar,
            (Opcode::Push, VALUE_NUMBER) => Opcode::PushNum,
            (Opcode::Push, VALUE_UNICODE) => Opcode::PushChar,
            (op, _) => op,
        };

        let instruction = match opcode {
            Opcode::None => return false,
            Opcode::Push => Instruction::Push(VALUE_CONSTANTS[cell.value as usize]),
            Opcode::Select => Instruction::Select(cell.value),
            Opcode::Move => Instruction::Move(cell.value),
            Opcode::Halt => {
                self.emit(Instruction::Halt);
                return true;
            }
            op => match Instruction::from_parts(op, 0) {
                Some(instruction) => instruction,
                None => return false,
            },
        };

        if opcode.required_size() == 0 {
            self.emit(instruction);
            return false;
        }

        let label = self.new_label();
        let guard = if opcode.required_size() == 1 {
            Instruction::BrPop1(label)
        } else {
            Instruction::BrPop2(label)
        };
        let guard_index = self.emit(guard);
        let instruction = if opcode == Opcode::Brz {
            Instruction::Brz(label)
        } else {
            instruction
        };
        let code_index = self.emit(instruction);
        self.visits.insert(
            state,
            Visit {
                code: code_index,
                guard: Some(guard_index),
            },
        );

        let reverse = direction.reversed();
        self.jobs.push_back(Job {
            position: self.grid.advance(state.0, reverse, step),
            direction: reverse,
            step,
            label: Some(label),
        });
        false
    }

    fn record_provenance(&mut self, state: State) {
        let (position, direction, step) = state;
        let code = match self.visits.get(&state) {
            Some(visit) => visit.code,
            None => return,
        };
        if let Some(ch) = self.grid.char_at(position) {
            if ('가'..='힣').contains(&ch) {
                self.provenance.push((code, ch.to_string()));
            }
        }
        self.provenance.push((
            code,
            format!("{} {:<5}{}", position, direction.name(), step),
        ));
    }

    fn finish(mut self, with_comments: bool) -> Program {
        if with_comments {
            let mut comments = vec![Vec::new(); self.program.len()];
            for (index, text) in self.provenance.drain(..) {
                if let Some(slot) = comments.get_mut(index) {
                    slot.push(text);
                }
            }
            self.program.comments = Some(comments);
        }
        debug!(
            "serialize: {} instructions, {} labels",
            self.program.len(),
            self.program.labels.len()
        );
        self.program
    }
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
