// Aheui compiler
// Serializes a program pane into linear code, optimizes it, and reads and
// writes the bytecode and assembly representations

pub mod assembly;
pub mod bytecode;
pub mod deadcode;
pub mod error;
pub mod fold;
pub mod jump;
pub mod reorder;
pub mod serializer;

use crate::grid::Grid;
use crate::program::Program;
use log::{debug, info};
use std::fmt;

pub use error::CompilerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    /// Plain serialization
    O0,
    /// Coarse dead-code analysis and constant folding
    O1,
    /// Per-storage dead-code analysis, block reordering and constant folding
    O2,
}

impl OptLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(OptLevel::O0),
            1 => Some(OptLevel::O1),
            2 => Some(OptLevel::O2),
            _ => None,
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptLevel::O0 => write!(f, "0"),
            OptLevel::O1 => write!(f, "1"),
            OptLevel::O2 => write!(f, "2"),
        }
    }
}

/// Representation of a program on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Bytecode,
    Asm,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceFormat::Text => write!(f, "text"),
            SourceFormat::Bytecode => write!(f, "bytecode"),
            SourceFormat::Asm => write!(f, "asm"),
        }
    }
}

/// Main compiler structure, holding the program being worked on
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    program: Program,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::default()
    }

    pub fn from_program(program: Program) -> Self {
        Compiler { program }
    }

    /// Serialize program text. With `with_comments`, each instruction keeps
    /// the cells it was traced from.
    pub fn compile(source: &str, with_comments: bool) -> Self {
        let grid = Grid::new(source);
        let program = serializer::serialize(&grid, with_comments);
        info!("Compiled {} instructions from text", program.len());
        Compiler { program }
    }

    pub fn read_bytecode(data: &[u8]) -> Result<Self, CompilerError> {
        Ok(Compiler {
            program: bytecode::read_bytecode(data)?,
        })
    }

    pub fn read_asm(text: &str) -> Result<Self, CompilerError> {
        Ok(Compiler {
            program: assembly::read_asm(text)?,
        })
    }

    /// Load a program in any source format
    pub fn load(data: &[u8], format: SourceFormat, with_comments: bool) -> Result<Self, CompilerError> {
        match format {
            SourceFormat::Bytecode => Compiler::read_bytecode(data),
            SourceFormat::Asm => Compiler::read_asm(utf8(data)?),
            SourceFormat::Text => Ok(Compiler::compile(utf8(data)?, with_comments)),
        }
    }

    pub fn write_bytecode(&self) -> Result<Vec<u8>, CompilerError> {
        bytecode::write_bytecode(&self.program)
    }

    pub fn write_asm(&self, commented: bool) -> String {
        assembly::write_asm(&self.program, commented)
    }

    /// Run the passes of an optimization level. The order of the passes is
    /// fixed: each relies on the layout left by the previous one.
    pub fn optimize(&mut self, level: OptLevel) {
        let before = self.program.len();
        match level {
            OptLevel::O0 => return,
            OptLevel::O1 => {
                jump::collapse_jumps(&mut self.program);
                let live = deadcode::live_coarse(&self.program);
                jump::compact(&mut self.program, &live);
            }
            OptLevel::O2 => {
                jump::collapse_jumps(&mut self.program);
                let live = deadcode::live_precise(&self.program);
                jump::compact(&mut self.program, &live);
                reorder::reorder_blocks(&mut self.program);
            }
        }

        let folded = fold::fold_constants(&mut self.program, true);
        jump::collapse_jumps(&mut self.program);
        let reachable = jump::reachability(&self.program);
        let live: Vec<bool> = folded
            .iter()
            .zip(reachable.iter())
            .map(|(f, r)| *f && *r)
            .collect();
        jump::compact(&mut self.program, &live);
        debug!(
            "optimize -O{}: {} -> {} instructions",
            level,
            before,
            self.program.len()
        );
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }
}

fn utf8(data: &[u8]) -> Result<&str, CompilerError> {
    std::str::from_utf8(data).map_err(|e| CompilerError::InvalidUtf8(e.to_string()))
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
