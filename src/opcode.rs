/// Opcode table and linear instruction representation
///
/// Primitive opcodes keep the numbering of the source syllable's initial
/// consonant (ㄴ = 2 ... ㅎ = 18). Derived I/O opcodes follow at 19-22 and
/// the synthetic control opcodes use small negative codes, which is also how
/// they are laid out in bytecode records.
use std::fmt;

/// Number of storage slots
pub const STORAGE_COUNT: usize = 28;

/// Slot index of the FIFO queue (ㅇ)
pub const SLOT_QUEUE: u8 = 21;

/// Slot index of the port (ㅎ)
pub const SLOT_PORT: u8 = 27;

/// Label identifier used by control-flow instructions
pub type LabelId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Div,
    Add,
    Mul,
    Mod,
    Pop,
    Push,
    Dup,
    Select,
    Move,
    None,
    Cmp,
    Brz,
    Sub,
    Swap,
    Halt,
    PopNum,
    PopChar,
    PushNum,
    PushChar,
    BrPop2,
    BrPop1,
    Jmp,
}

pub const ALL_OPCODES: [Opcode; 22] = [
    Opcode::Div,
    Opcode::Add,
    Opcode::Mul,
    Opcode::Mod,
    Opcode::Pop,
    Opcode::Push,
    Opcode::Dup,
    Opcode::Select,
    Opcode::Move,
    Opcode::None,
    Opcode::Cmp,
    Opcode::Brz,
    Opcode::Sub,
    Opcode::Swap,
    Opcode::Halt,
    Opcode::PopNum,
    Opcode::PopChar,
    Opcode::PushNum,
    Opcode::PushChar,
    Opcode::BrPop2,
    Opcode::BrPop1,
    Opcode::Jmp,
];

impl Opcode {
    /// Numeric code as stored in bytecode (negative for control opcodes)
    pub fn code(self) -> i16 {
        match self {
            Opcode::Div => 2,
            Opcode::Add => 3,
            Opcode::Mul => 4,
            Opcode::Mod => 5,
            Opcode::Pop => 6,
            Opcode::Push => 7,
            Opcode::Dup => 8,
            Opcode::Select => 9,
            Opcode::Move => 10,
            Opcode::None => 11,
            Opcode::Cmp => 12,
            Opcode::Brz => 14,
            Opcode::Sub => 16,
            Opcode::Swap => 17,
            Opcode::Halt => 18,
            Opcode::PopNum => 19,
            Opcode::PopChar => 20,
            Opcode::PushNum => 21,
            Opcode::PushChar => 22,
            Opcode::BrPop2 => -3,
            Opcode::BrPop1 => -2,
            Opcode::Jmp => -1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        ALL_OPCODES.iter().copied().find(|op| op.code() == code)
    }

    /// Primitive opcode for an initial consonant index (0..=18).
    /// Consonants without an effect (ㄱ ㄲ ㅇ ㅉ ㅋ) decode to `None`.
    pub fn from_initial(initial: u8) -> Self {
        match initial {
            2 => Opcode::Div,
            3 => Opcode::Add,
            4 => Opcode::Mul,
            5 => Opcode::Mod,
            6 => Opcode::Pop,
            7 => Opcode::Push,
            8 => Opcode::Dup,
            9 => Opcode::Select,
            10 => Opcode::Move,
            12 => Opcode::Cmp,
            14 => Opcode::Brz,
            16 => Opcode::Sub,
            17 => Opcode::Swap,
            18 => Opcode::Halt,
            _ => Opcode::None,
        }
    }

    /// Assembly mnemonic
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Div => "DIV",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Mod => "MOD",
            Opcode::Pop => "POP",
            Opcode::Push => "PUSH",
            Opcode::Dup => "DUP",
            Opcode::Select => "SEL",
            Opcode::Move => "MOV",
            Opcode::None => "NONE",
            Opcode::Cmp => "CMP",
            Opcode::Brz => "BRZ",
            Opcode::Sub => "SUB",
            Opcode::Swap => "SWAP",
            Opcode::Halt => "HALT",
            Opcode::PopNum => "POPNUM",
            Opcode::PopChar => "POPCHAR",
            Opcode::PushNum => "PUSHNUM",
            Opcode::PushChar => "PUSHCHAR",
            Opcode::BrPop2 => "BRPOP2",
            Opcode::BrPop1 => "BRPOP1",
            Opcode::Jmp => "JMP",
        }
    }

    /// Minimum depth of the selected storage needed before execution
    pub fn required_size(self) -> usize {
        match self {
            Opcode::Div
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mod
            | Opcode::Cmp
            | Opcode::Sub
            | Opcode::Swap
            | Opcode::BrPop2 => 2,
            Opcode::Pop
            | Opcode::Dup
            | Opcode::Move
            | Opcode::Brz
            | Opcode::PopNum
            | Opcode::PopChar
            | Opcode::BrPop1 => 1,
            _ => 0,
        }
    }

    /// Values removed from the selected storage
    pub fn stack_delete(self) -> usize {
        match self {
            Opcode::Div
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mod
            | Opcode::Cmp
            | Opcode::Sub
            | Opcode::Swap => 2,
            Opcode::Pop
            | Opcode::Dup
            | Opcode::Move
            | Opcode::Brz
            | Opcode::PopNum
            | Opcode::PopChar => 1,
            _ => 0,
        }
    }

    /// Values added to the selected storage
    pub fn stack_add(self) -> usize {
        match self {
            Opcode::Div
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Mod
            | Opcode::Cmp
            | Opcode::Sub
            | Opcode::Push
            | Opcode::PushNum
            | Opcode::PushChar => 1,
            Opcode::Dup | Opcode::Swap => 2,
            _ => 0,
        }
    }

    /// Whether the instruction carries an operand
    pub fn uses_value(self) -> bool {
        matches!(
            self,
            Opcode::Push
                | Opcode::Select
                | Opcode::Move
                | Opcode::Brz
                | Opcode::BrPop2
                | Opcode::BrPop1
                | Opcode::Jmp
        )
    }

    /// Conditional branches (two successors)
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Brz | Opcode::BrPop1 | Opcode::BrPop2)
    }

    /// Any instruction whose operand is a label
    pub fn is_jump(self) -> bool {
        self.is_branch() || self == Opcode::Jmp
    }

    pub fn is_guard(self) -> bool {
        matches!(self, Opcode::BrPop1 | Opcode::BrPop2)
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Div | Opcode::Add | Opcode::Mul | Opcode::Mod | Opcode::Cmp | Opcode::Sub
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A linear instruction with its operand stored inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Div,
    Add,
    Mul,
    Mod,
    Pop,
    /// Push a literal value
    Push(i64),
    Dup,
    /// Select a storage slot
    Select(u8),
    /// Pop from the selected slot and push into the given slot
    Move(u8),
    None,
    Cmp,
    Brz(LabelId),
    Sub,
    Swap,
    Halt,
    PopNum,
    PopChar,
    PushNum,
    PushChar,
    BrPop2(LabelId),
    BrPop1(LabelId),
    Jmp(LabelId),
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Div => Opcode::Div,
            Instruction::Add => Opcode::Add,
            Instruction::Mul => Opcode::Mul,
            Instruction::Mod => Opcode::Mod,
            Instruction::Pop => Opcode::Pop,
            Instruction::Push(_) => Opcode::Push,
            Instruction::Dup => Opcode::Dup,
            Instruction::Select(_) => Opcode::Select,
            Instruction::Move(_) => Opcode::Move,
            Instruction::None => Opcode::None,
            Instruction::Cmp => Opcode::Cmp,
            Instruction::Brz(_) => Opcode::Brz,
            Instruction::Sub => Opcode::Sub,
            Instruction::Swap => Opcode::Swap,
            Instruction::Halt => Opcode::Halt,
            Instruction::PopNum => Opcode::PopNum,
            Instruction::PopChar => Opcode::PopChar,
            Instruction::PushNum => Opcode::PushNum,
            Instruction::PushChar => Opcode::PushChar,
            Instruction::BrPop2(_) => Opcode::BrPop2,
            Instruction::BrPop1(_) => Opcode::BrPop1,
            Instruction::Jmp(_) => Opcode::Jmp,
        }
    }

    /// Build an instruction from an opcode and a raw operand.
    /// For control opcodes the operand is taken as a label id; it is
    /// ignored for opcodes without an operand. `None` if a storage operand
    /// does not name one of the storage slots.
    pub fn from_parts(opcode: Opcode, operand: i64) -> Option<Self> {
        let label = operand.max(0) as LabelId;
        let slot = u8::try_from(operand)
            .ok()
            .filter(|&slot| (slot as usize) < STORAGE_COUNT);
        let instruction = match opcode {
            Opcode::Div => Instruction::Div,
            Opcode::Add => Instruction::Add,
            Opcode::Mul => Instruction::Mul,
            Opcode::Mod => Instruction::Mod,
            Opcode::Pop => Instruction::Pop,
            Opcode::Push => Instruction::Push(operand),
            Opcode::Dup => Instruction::Dup,
            Opcode::Select => Instruction::Select(slot?),
            Opcode::Move => Instruction::Move(slot?),
            Opcode::None => Instruction::None,
            Opcode::Cmp => Instruction::Cmp,
            Opcode::Brz => Instruction::Brz(label),
            Opcode::Sub => Instruction::Sub,
            Opcode::Swap => Instruction::Swap,
            Opcode::Halt => Instruction::Halt,
            Opcode::PopNum => Instruction::PopNum,
            Opcode::PopChar => Instruction::PopChar,
            Opcode::PushNum => Instruction::PushNum,
            Opcode::PushChar => Instruction::PushChar,
            Opcode::BrPop2 => Instruction::BrPop2(label),
            Opcode::BrPop1 => Instruction::BrPop1(label),
            Opcode::Jmp => Instruction::Jmp(label),
        };
        Some(instruction)
    }

    /// Label referenced by a control instruction
    pub fn label(&self) -> Option<LabelId> {
        match self {
            Instruction::Brz(l)
            | Instruction::BrPop2(l)
            | Instruction::BrPop1(l)
            | Instruction::Jmp(l) => Some(*l),
            _ => None,
        }
    }

    /// Same instruction pointing at another label
    pub fn with_label(&self, label: LabelId) -> Self {
        match self {
            Instruction::Brz(_) => Instruction::Brz(label),
            Instruction::BrPop2(_) => Instruction::BrPop2(label),
            Instruction::BrPop1(_) => Instruction::BrPop1(label),
            Instruction::Jmp(_) => Instruction::Jmp(label),
            other => *other,
        }
    }

    /// Literal or slot operand of a non-control instruction
    pub fn value(&self) -> Option<i64> {
        match self {
            Instruction::Push(v) => Some(*v),
            Instruction::Select(s) | Instruction::Move(s) => Some(*s as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.value(), self.label()) {
            (Some(v), _) => write!(f, "{} {}", self.opcode(), v),
            (_, Some(l)) => write!(f, "{} @{}", self.opcode(), l),
            _ => write!(f, "{}", self.opcode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for op in ALL_OPCODES {
            assert_eq!(Opcode::from_code(op.code()), Some(op));
        }
        assert_eq!(Opcode::from_code(0), None);
        assert_eq!(Opcode::from_code(13), None);
    }

    #[test]
    fn test_depth_table() {
        assert_eq!(Opcode::Swap.required_size(), 2);
        assert_eq!(Opcode::Dup.stack_delete(), 1);
        assert_eq!(Opcode::Dup.stack_add(), 2);
        assert_eq!(Opcode::Brz.required_size(), 1);
        assert_eq!(Opcode::Jmp.required_size(), 0);
        assert_eq!(Opcode::PushChar.required_size(), 0);
    }

    #[test]
    fn test_initial_consonants_without_effect() {
        for initial in [0, 1, 11, 13, 15] {
            assert_eq!(Opcode::from_initial(initial), Opcode::None);
        }
        assert_eq!(Opcode::from_initial(18), Opcode::Halt);
    }

    #[test]
    fn test_label_rewrite() {
        let jump = Instruction::BrPop1(4);
        assert_eq!(jump.with_label(9), Instruction::BrPop1(9));
        assert_eq!(Instruction::Push(3).with_label(9), Instruction::Push(3));
        assert_eq!(Instruction::Move(21).value(), Some(21));
    }

    #[test]
    fn test_from_parts_checks_storage() {
        assert_eq!(Instruction::from_parts(Opcode::Select, 27), Some(Instruction::Select(27)));
        assert_eq!(Instruction::from_parts(Opcode::Move, 0), Some(Instruction::Move(0)));
        assert_eq!(Instruction::from_parts(Opcode::Select, 28), None);
        assert_eq!(Instruction::from_parts(Opcode::Move, 300), None);
        assert_eq!(Instruction::from_parts(Opcode::Select, -1), None);
        assert_eq!(Instruction::from_parts(Opcode::Jmp, 5), Some(Instruction::Jmp(5)));
        assert_eq!(Instruction::from_parts(Opcode::Push, 300), Some(Instruction::Push(300)));
    }
}
