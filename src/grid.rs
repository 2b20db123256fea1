/// Source pane of a two-dimensional program
///
/// Every Hangul syllable in the text decodes into three independent parts:
/// - the initial consonant selects the operation
/// - the medial vowel selects the movement
/// - the final consonant selects the operand
///
/// Any other character still occupies its cell but has no effect. Cells past
/// the end of a line are not part of the pane and are skipped while tracing.
use crate::opcode::Opcode;
use log::debug;
use std::fmt;

const HANGUL_FIRST: u32 = 0xAC00;
const HANGUL_LAST: u32 = 0xD7A3;

/// Constant pushed for each final consonant
pub const VALUE_CONSTANTS: [i64; 28] = [
    0, 2, 4, 4, 2, 5, 5, 3, 5, 7, 9, 9, 7, 9, 9, 8, 4, 4, 6, 2, 4, 1, 3, 4, 3, 4, 4, 3,
];

/// Final consonant ㅇ: number I/O for push/pop
pub const VALUE_NUMBER: u8 = 21;

/// Final consonant ㅎ: character I/O for push/pop
pub const VALUE_UNICODE: u8 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:>3},{:>3}]", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Right,
    Up,
    Left,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Down | Direction::Up)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "DOWN",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Left => "LEFT",
        }
    }
}

/// Step multiplier, always 1 or 2
pub type Step = usize;

/// Movement directive of a syllable's medial vowel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Set an absolute direction and step (ㅏ ㅑ ㅓ ㅕ ㅗ ㅛ ㅜ ㅠ)
    Go(Direction, Step),
    /// ㅡ: reverse vertical travel
    HorizontalWall,
    /// ㅣ: reverse horizontal travel
    VerticalWall,
    /// ㅢ: reverse any travel
    Wall,
    /// Keep the current direction and step
    Keep,
}

impl Movement {
    pub fn from_medial(medial: u8) -> Self {
        match medial {
            0 => Movement::Go(Direction::Right, 1),
            2 => Movement::Go(Direction::Right, 2),
            4 => Movement::Go(Direction::Left, 1),
            6 => Movement::Go(Direction::Left, 2),
            8 => Movement::Go(Direction::Up, 1),
            12 => Movement::Go(Direction::Up, 2),
            13 => Movement::Go(Direction::Down, 1),
            17 => Movement::Go(Direction::Down, 2),
            18 => Movement::HorizontalWall,
            19 => Movement::Wall,
            20 => Movement::VerticalWall,
            _ => Movement::Keep,
        }
    }

    /// Deterministic movements override the incoming direction regardless
    /// of where the cursor came from.
    pub fn is_deterministic(self) -> bool {
        matches!(self, Movement::Go(_, _))
    }

    /// Outgoing direction and step for the given incoming state
    pub fn apply(self, direction: Direction, step: Step) -> (Direction, Step) {
        match self {
            Movement::Go(d, s) => (d, s),
            Movement::Wall => (direction.reversed(), step),
            Movement::HorizontalWall if direction.is_vertical() => (direction.reversed(), step),
            Movement::VerticalWall if !direction.is_vertical() => (direction.reversed(), step),
            _ => (direction, step),
        }
    }
}

/// Decoded grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub opcode: Opcode,
    pub movement: Movement,
    /// Final consonant index in 0..=27
    pub value: u8,
}

impl Cell {
    /// Cell without any effect
    pub const EMPTY: Cell = Cell {
        opcode: Opcode::None,
        movement: Movement::Keep,
        value: 0,
    };

    pub fn decode(ch: char) -> Self {
        let code = ch as u32;
        if !(HANGUL_FIRST..=HANGUL_LAST).contains(&code) {
            return Cell::EMPTY;
        }
        let base = code - HANGUL_FIRST;
        Cell {
            opcode: Opcode::from_initial((base / 588) as u8),
            movement: Movement::from_medial(((base / 28) % 21) as u8),
            value: (base % 28) as u8,
        }
    }
}

/// The program pane
pub struct Grid {
    rows: Vec<Vec<char>>,
    width: usize,
}

impl Grid {
    pub fn new(text: &str) -> Self {
        let rows: Vec<Vec<char>> = text.split('\n').map(|line| line.chars().collect()).collect();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        debug!("Grid: {} rows, width {}", rows.len(), width);
        Grid { rows, width }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// True if no cell exists at all
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Whether the position lies inside a line of the source
    pub fn contains(&self, pos: Position) -> bool {
        self.rows
            .get(pos.row)
            .map_or(false, |row| pos.col < row.len())
    }

    /// Raw character at a position
    pub fn char_at(&self, pos: Position) -> Option<char> {
        self.rows.get(pos.row).and_then(|row| row.get(pos.col)).copied()
    }

    /// Decode a position; positions without a symbol decode to `Cell::EMPTY`
    pub fn decode(&self, pos: Position) -> Cell {
        self.char_at(pos).map_or(Cell::EMPTY, Cell::decode)
    }

    /// Next position travelling `step` cells in `direction`, wrapping at the
    /// pane borders. A vertical wrap skips rows too short to contain the
    /// column; a leftward wrap skips to the last cell of the row.
    pub fn advance(&self, pos: Position, direction: Direction, step: Step) -> Position {
        let height = self.height();
        let width = self.width.max(1);
        let Position { mut row, mut col } = pos;
        match direction {
            Direction::Down => {
                row += step;
                if row >= height {
                    row = 0;
                    for _ in 0..height {
                        if self.contains(Position::new(row, col)) {
                            break;
                        }
                        row = (row + 1) % height;
                    }
                }
            }
            Direction::Right => {
                col += step;
                if col >= width {
                    col = 0;
                }
            }
            Direction::Up => {
                if row < step {
                    row = height - 1;
                    for _ in 0..height {
                        if self.contains(Position::new(row, col)) {
                            break;
                        }
                        row = if row == 0 { height - 1 } else { row - 1 };
                    }
                } else {
                    row -= step;
                }
            }
            Direction::Left => {
                if col < step {
                    col = width - 1;
                    while col > 0 && !self.contains(Position::new(row, col)) {
                        col -= 1;
                    }
                } else {
                    col -= step;
                }
            }
        }
        Position::new(row, col)
    }
}
