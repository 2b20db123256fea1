// Assembly text codec
//
//   L0:     PUSH 2     ; L0   반 / [  0,  0] RIGHT1
//           BRPOP2 L7  ; L2   따 / [  0,  2] RIGHT1
//
// A line is an optional `label:` prefix, a case-insensitive mnemonic, an
// operand for instructions that take one, and an optional `;` comment.

use super::error::CompilerError;
use crate::opcode::{Instruction, LabelId, Opcode, ALL_OPCODES};
use crate::program::Program;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

lazy_static! {
    static ref MNEMONICS: HashMap<&'static str, Opcode> =
        ALL_OPCODES.iter().map(|op| (op.name(), *op)).collect();
}

pub fn write_asm(program: &Program, commented: bool) -> String {
    let mut text = String::new();
    let targets = program.target_counts();
    for (i, instruction) in program.instructions.iter().enumerate() {
        if targets[i] > 0 {
            text.push_str(&format!("{:<8}", format!("L{}:", i)));
        } else {
            text.push_str(&" ".repeat(8));
        }

        let opcode = instruction.opcode();
        let mut name = opcode.name().to_string();
        if name.len() == 3 {
            name.push(' ');
        }
        let code = match (instruction.label(), instruction.value()) {
            (Some(label), _) => format!("{} L{:<3}", name, program.target(label)),
            (None, Some(value)) => format!("{} {:<4}", name, value),
            (None, None) => name,
        };

        if commented {
            text.push_str(&format!("{:<10} ; L{:<3} {}\n", code, i, program.comment(i)));
        } else {
            text.push_str(&format!("{:<10}\n", code));
        }
    }
    if targets[program.len()] > 0 {
        text.push_str(&format!("L{}:\n", program.len()));
    }
    text
}

/// Jump operand waiting for every label to be defined
struct PendingJump {
    index: usize,
    line: usize,
    operand: String,
}

pub fn read_asm(text: &str) -> Result<Program, CompilerError> {
    let mut program = Program::new();
    let mut comments = Vec::new();
    let mut label_names: HashMap<String, usize> = HashMap::new();
    let mut pending = Vec::new();

    for (row, raw) in text.split('\n').enumerate() {
        let line = row + 1;
        let (main, comment) = match raw.split_once(';') {
            Some((main, comment)) => (main, Some(comment)),
            None => (raw, None),
        };
        let main = match main.split_once(':') {
            Some((label, rest)) => {
                label_names.insert(label.trim().to_string(), program.len());
                rest
            }
            None => main,
        };
        let mut parts = main.split_whitespace();
        let mnemonic = match parts.next() {
            Some(mnemonic) => mnemonic,
            None => continue,
        };
        let opcode = *MNEMONICS
            .get(mnemonic.to_uppercase().as_str())
            .ok_or_else(|| CompilerError::UnknownMnemonic {
                line,
                mnemonic: mnemonic.to_string(),
            })?;
        let operand = parts.next();

        let value: i64 = if opcode.is_jump() {
            let operand = operand.ok_or(CompilerError::MissingOperand { line })?;
            pending.push(PendingJump {
                index: program.len(),
                line,
                operand: operand.to_string(),
            });
            // Label is assigned once all labels are known
            0
        } else if opcode.uses_value() {
            let operand = operand.ok_or(CompilerError::MissingOperand { line })?;
            operand.parse().map_err(|_| CompilerError::InvalidOperand {
                line,
                operand: operand.to_string(),
            })?
        } else {
            0
        };
        let instruction = Instruction::from_parts(opcode, value)
            .ok_or(CompilerError::InvalidStorage { line, slot: value })?;
        program.instructions.push(instruction);
        comments.push(comment.map(strip_index).into_iter().flatten().collect());
    }

    let len = program.len();
    let mut label_ids: IndexMap<String, LabelId> = IndexMap::new();
    for jump in pending {
        let target = match label_names.get(&jump.operand) {
            Some(&target) => target,
            None => match jump.operand.parse::<usize>() {
                Ok(target) if target <= len => target,
                _ => {
                    return Err(CompilerError::UndefinedLabel {
                        line: jump.line,
                        label: jump.operand,
                    })
                }
            },
        };
        let next_id = label_ids.len();
        let label = *label_ids.entry(jump.operand).or_insert(next_id);
        program.labels.insert(label, target);
        program.instructions[jump.index] = program.instructions[jump.index].with_label(label);
    }

    program.comments = Some(comments);
    debug!(
        "read_asm: {} instructions, {} labels",
        len,
        program.labels.len()
    );
    Ok(program)
}

/// Comment text without the `L<index>` column written by `write_asm`
fn strip_index(comment: &str) -> Option<String> {
    let comment = comment.trim();
    let rest = match comment.split_once(char::is_whitespace) {
        Some((first, rest)) if is_index_tag(first) => rest.trim_start(),
        None if is_index_tag(comment) => "",
        _ => comment,
    };
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn is_index_tag(token: &str) -> bool {
    token.len() > 1
        && token.starts_with('L')
        && token[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
#[path = "assembly_tests.rs"]
mod tests;
