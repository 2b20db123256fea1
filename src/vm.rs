use crate::io::Console;
use crate::number::{ArithmeticError, Number};
use crate::opcode::{Instruction, STORAGE_COUNT};
use crate::program::Program;
use crate::storage::{Space, SpaceError, Storage};
use log::{debug, warn};
use std::fmt;
use std::io::{Read, Write};

/// Fatal runtime faults
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    DivisionByZero { pc: usize },
    ModuloByZero { pc: usize },
    StorageUnderflow {
        pc: usize,
        slot: usize,
        required: usize,
        available: usize,
    },
    InvalidStorage { pc: usize, slot: usize },
    InvalidNumberInput { pc: usize },
    /// Machine-integer arithmetic left the `i64` range
    Overflow { pc: usize },
    Io(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmError::DivisionByZero { pc } => write!(f, "Division by zero at L{}", pc),
            VmError::ModuloByZero { pc } => write!(f, "Modulo by zero at L{}", pc),
            VmError::StorageUnderflow {
                pc,
                slot,
                required,
                available,
            } => write!(
                f,
                "Storage {} underflow at L{}: {} values required, {} available",
                slot, pc, required, available
            ),
            VmError::InvalidStorage { pc, slot } => {
                write!(f, "Invalid storage {} at L{}", slot, pc)
            }
            VmError::InvalidNumberInput { pc } => {
                write!(f, "Input is not a valid number at L{}", pc)
            }
            VmError::Overflow { pc } => write!(f, "Integer overflow at L{}", pc),
            VmError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(error: std::io::Error) -> Self {
        VmError::Io(error.to_string())
    }
}

/// Outcome of one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Fall through to the next instruction
    Continue,
    /// Control moved, pc already updated
    Jumped,
    /// Halt, or ran past the last instruction
    Halted,
}

/// Virtual machine over one numeric back end
pub struct Machine<N> {
    code: Vec<Instruction>,
    /// Resolved destination of each control instruction
    targets: Vec<usize>,
    pc: usize,
    selected: usize,
    storage: Storage<N>,
}

impl<N: Number> Machine<N> {
    pub fn new(program: &Program) -> Self {
        let targets = (0..program.len())
            .map(|i| program.jump_target(i).unwrap_or(0))
            .collect();
        Machine {
            code: program.instructions.clone(),
            targets,
            pc: 0,
            selected: 0,
            storage: Storage::new(),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn storage(&self) -> &Storage<N> {
        &self.storage
    }

    /// Run to completion. The result is the value popped from the selected
    /// storage at the end, or 0 if it is empty.
    pub fn run<R: Read, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<N, VmError> {
        debug!("run: {} instructions, {} backend", self.code.len(), N::NAME);
        let outcome = loop {
            match self.step(console) {
                Ok(ExecutionResult::Halted) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };
        console.flush()?;
        outcome?;
        let result = self
            .space_mut(self.selected)?
            .pop()
            .unwrap_or_else(|_| N::from_i64(0));
        debug!("run: halted at L{} with {}", self.pc, result);
        Ok(result)
    }

    fn space_mut(&mut self, slot: usize) -> Result<&mut Space<N>, VmError> {
        let pc = self.pc;
        self.storage
            .get_mut(slot)
            .ok_or(VmError::InvalidStorage { pc, slot })
    }

    fn fault(&self, error: SpaceError) -> VmError {
        let pc = self.pc;
        match error {
            SpaceError::Underflow {
                required,
                available,
            } => VmError::StorageUnderflow {
                pc,
                slot: self.selected,
                required,
                available,
            },
            SpaceError::Arithmetic(ArithmeticError::DivisionByZero) => VmError::DivisionByZero { pc },
            SpaceError::Arithmetic(ArithmeticError::ModuloByZero) => VmError::ModuloByZero { pc },
            SpaceError::Arithmetic(ArithmeticError::Overflow) => VmError::Overflow { pc },
        }
    }

    /// Execute the instruction at pc
    pub fn step<R: Read, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<ExecutionResult, VmError> {
        let instruction = match self.code.get(self.pc) {
            Some(instruction) => *instruction,
            None => return Ok(ExecutionResult::Halted),
        };
        let pc = self.pc;
        let selected = self.selected;
        let required = instruction.opcode().required_size();
        let available = self.space_mut(selected)?.len();

        match instruction {
            Instruction::BrPop1(_) | Instruction::BrPop2(_) => {
                if available < required {
                    self.pc = self.targets[pc];
                    return Ok(ExecutionResult::Jumped);
                }
            }
            Instruction::Jmp(_) => {
                self.pc = self.targets[pc];
                return Ok(ExecutionResult::Jumped);
            }
            Instruction::Halt => return Ok(ExecutionResult::Halted),
            _ if available < required => {
                return Err(VmError::StorageUnderflow {
                    pc,
                    slot: selected,
                    required,
                    available,
                })
            }
            _ => {}
        }

        match instruction {
            Instruction::Div
            | Instruction::Add
            | Instruction::Mul
            | Instruction::Mod
            | Instruction::Sub
            | Instruction::Cmp => {
                let result = self.space_mut(selected)?.binary(instruction.opcode());
                result.map_err(|e| self.fault(e))?;
            }
            Instruction::Pop => {
                self.pop_selected()?;
            }
            Instruction::Push(value) => self.space_mut(selected)?.push(N::from_i64(value)),
            Instruction::Dup => {
                let result = self.space_mut(selected)?.dup();
                result.map_err(|e| self.fault(e))?;
            }
            Instruction::Swap => {
                let result = self.space_mut(selected)?.swap();
                result.map_err(|e| self.fault(e))?;
            }
            Instruction::Select(slot) => {
                let slot = slot as usize;
                if slot >= STORAGE_COUNT {
                    return Err(VmError::InvalidStorage { pc, slot });
                }
                self.selected = slot;
            }
            Instruction::Move(slot) => {
                let slot = slot as usize;
                if slot >= STORAGE_COUNT {
                    return Err(VmError::InvalidStorage { pc, slot });
                }
                let value = self.pop_selected()?;
                self.space_mut(slot)?.push(value);
            }
            Instruction::Brz(_) => {
                if self.pop_selected()?.is_zero() {
                    self.pc = self.targets[pc];
                    return Ok(ExecutionResult::Jumped);
                }
            }
            Instruction::PopNum => {
                let value = self.pop_selected()?;
                console.write_number(&value)?;
            }
            Instruction::PopChar => {
                let value = self.pop_selected()?;
                console.write_char(&value)?;
            }
            Instruction::PushNum => {
                let value = console
                    .read_number::<N>()?
                    .ok_or(VmError::InvalidNumberInput { pc })?;
                self.space_mut(selected)?.push(value);
            }
            Instruction::PushChar => {
                let value = console.read_char::<N>()?;
                self.space_mut(selected)?.push(value);
            }
            Instruction::None
            | Instruction::BrPop1(_)
            | Instruction::BrPop2(_)
            | Instruction::Jmp(_)
            | Instruction::Halt => {}
        }
        self.pc += 1;
        Ok(ExecutionResult::Continue)
    }

    fn pop_selected(&mut self) -> Result<N, VmError> {
        let selected = self.selected;
        let result = self.space_mut(selected)?.pop();
        result.map_err(|e| self.fault(e))
    }
}

/// Convert a final value into a process exit status, logging when the
/// value had to be reduced
pub fn exit_code<N: Number>(value: &N) -> i32 {
    let (code, truncated) = value.to_exit_code();
    if truncated {
        warn!("exit value {} reduced modulo 2^32 to {}", value, code);
    }
    code
}

#[cfg(test)]
#[path = "vm_tests.rs"]
mod tests;
