/// Linear program: instructions, label map and optional provenance comments
use crate::opcode::{Instruction, LabelId};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// Label id -> instruction index, in order of creation
    pub labels: IndexMap<LabelId, usize>,
    /// Per-instruction provenance, present when compiled with debug info
    pub comments: Option<Vec<Vec<String>>>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Resolved index of a label. Labels that were never bound resolve to
    /// the end of the program.
    pub fn target(&self, label: LabelId) -> usize {
        self.labels
            .get(&label)
            .copied()
            .unwrap_or(self.instructions.len())
    }

    /// Resolved jump destination of the instruction at `index`, if any
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        self.instructions
            .get(index)
            .and_then(|inst| inst.label())
            .map(|label| self.target(label))
    }

    /// Next unused label id
    pub fn fresh_label(&self) -> LabelId {
        self.labels.keys().max().map_or(0, |max| max + 1)
    }

    /// Number of labels resolving to each index, one past the end included
    pub fn target_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.instructions.len() + 1];
        for &target in self.labels.values() {
            if let Some(count) = counts.get_mut(target) {
                *count += 1;
            }
        }
        counts
    }

    /// Map of instruction index -> the only label resolving to it.
    /// Indices targeted by several labels are absent.
    pub fn unique_labels(&self) -> HashMap<usize, LabelId> {
        let mut seen: HashMap<usize, Option<LabelId>> = HashMap::new();
        for (&label, &target) in &self.labels {
            seen.entry(target)
                .and_modify(|slot| *slot = None)
                .or_insert(Some(label));
        }
        seen.into_iter()
            .filter_map(|(target, label)| label.map(|l| (target, l)))
            .collect()
    }

    /// Comment text of one instruction, joined for display
    pub fn comment(&self, index: usize) -> String {
        self.comments
            .as_ref()
            .and_then(|c| c.get(index))
            .map(|c| c.join(" / "))
            .unwrap_or_default()
    }

    /// Drop labels that no instruction refers to
    pub fn remove_unused_labels(&mut self) {
        let used: HashSet<LabelId> = self
            .instructions
            .iter()
            .filter_map(|inst| inst.label())
            .collect();
        self.labels.retain(|label, _| used.contains(label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_labels() {
        let mut program = Program::new();
        program.instructions = vec![
            Instruction::Jmp(0),
            Instruction::Jmp(1),
            Instruction::Jmp(2),
            Instruction::Halt,
        ];
        program.labels.insert(0, 3);
        program.labels.insert(1, 3);
        program.labels.insert(2, 0);
        let unique = program.unique_labels();
        assert_eq!(unique.get(&0), Some(&2));
        assert_eq!(unique.get(&3), None);
        assert_eq!(program.fresh_label(), 3);
        assert_eq!(program.target_counts(), vec![1, 0, 0, 2, 0]);
    }

    #[test]
    fn test_remove_unused_labels() {
        let mut program = Program::new();
        program.instructions = vec![Instruction::Jmp(5), Instruction::Halt];
        program.labels.insert(4, 1);
        program.labels.insert(5, 1);
        program.labels.insert(7, 9);
        program.remove_unused_labels();
        assert_eq!(program.labels.len(), 1);
        assert_eq!(program.target(5), 1);
        assert_eq!(program.target(9), 2);
    }
}
