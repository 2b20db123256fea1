/// The 28 storage slots of the machine
///
/// Slot 21 (ㅇ) is a FIFO queue and slot 27 (ㅎ) is the port; every other
/// slot is a LIFO stack.
use crate::number::{binary_op, ArithmeticError, Number};
use crate::opcode::{Opcode, SLOT_PORT, SLOT_QUEUE, STORAGE_COUNT};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceError {
    Underflow { required: usize, available: usize },
    Arithmetic(ArithmeticError),
}

impl From<ArithmeticError> for SpaceError {
    fn from(error: ArithmeticError) -> Self {
        SpaceError::Arithmetic(error)
    }
}

#[derive(Debug, Clone)]
pub enum Space<N> {
    Stack(Vec<N>),
    /// Front of the deque is the next value out
    Queue(VecDeque<N>),
    /// A stack whose `dup` repeats the last value pushed
    Port { items: Vec<N>, last_push: N },
}

impl<N: Number> Space<N> {
    pub fn for_slot(slot: usize) -> Self {
        match slot {
            s if s == SLOT_QUEUE as usize => Space::Queue(VecDeque::new()),
            s if s == SLOT_PORT as usize => Space::Port {
                items: Vec::new(),
                last_push: N::from_i64(0),
            },
            _ => Space::Stack(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Space::Stack(items) => items.len(),
            Space::Queue(items) => items.len(),
            Space::Port { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require(&self, required: usize) -> Result<(), SpaceError> {
        let available = self.len();
        if available < required {
            Err(SpaceError::Underflow {
                required,
                available,
            })
        } else {
            Ok(())
        }
    }

    pub fn push(&mut self, value: N) {
        match self {
            Space::Stack(items) => items.push(value),
            Space::Queue(items) => items.push_back(value),
            Space::Port { items, last_push } => {
                *last_push = value.clone();
                items.push(value);
            }
        }
    }

    pub fn pop(&mut self) -> Result<N, SpaceError> {
        let value = match self {
            Space::Stack(items) | Space::Port { items, .. } => items.pop(),
            Space::Queue(items) => items.pop_front(),
        };
        value.ok_or(SpaceError::Underflow {
            required: 1,
            available: 0,
        })
    }

    /// Value the next `pop` would return
    pub fn peek(&self) -> Option<&N> {
        match self {
            Space::Stack(items) | Space::Port { items, .. } => items.last(),
            Space::Queue(items) => items.front(),
        }
    }

    pub fn dup(&mut self) -> Result<(), SpaceError> {
        self.require(1)?;
        match self {
            Space::Stack(items) => {
                if let Some(top) = items.last().cloned() {
                    items.push(top);
                }
            }
            Space::Queue(items) => {
                if let Some(front) = items.front().cloned() {
                    items.push_front(front);
                }
            }
            Space::Port { items, last_push } => items.push(last_push.clone()),
        }
        Ok(())
    }

    pub fn swap(&mut self) -> Result<(), SpaceError> {
        self.require(2)?;
        match self {
            Space::Stack(items) | Space::Port { items, .. } => {
                let n = items.len();
                items.swap(n - 1, n - 2);
            }
            Space::Queue(items) => items.swap(0, 1),
        }
        Ok(())
    }

    /// Apply a binary opcode. The first value out is the right operand.
    /// Stacks replace the remaining top with the result; the queue pops both
    /// operands and pushes the result at the back.
    pub fn binary(&mut self, op: Opcode) -> Result<(), SpaceError> {
        self.require(2)?;
        match self {
            Space::Stack(items) | Space::Port { items, .. } => {
                let right = items.pop();
                if let (Some(right), Some(left)) = (right, items.last_mut()) {
                    *left = binary_op(op, left, &right)?;
                }
            }
            Space::Queue(items) => {
                if let (Some(right), Some(left)) = (items.pop_front(), items.pop_front()) {
                    items.push_back(binary_op(op, &left, &right)?);
                }
            }
        }
        Ok(())
    }
}

/// All storage slots plus the selection
#[derive(Debug, Clone)]
pub struct Storage<N> {
    spaces: Vec<Space<N>>,
}

impl<N: Number> Default for Storage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Number> Storage<N> {
    pub fn new() -> Self {
        Storage {
            spaces: (0..STORAGE_COUNT).map(Space::for_slot).collect(),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Space<N>> {
        self.spaces.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Space<N>> {
        self.spaces.get_mut(slot)
    }
}
