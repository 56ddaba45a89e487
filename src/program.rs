use std::fmt;

use tracing::debug;

/// One of the eight operations of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BfInstruction {
    GoRight,
    GoLeft,
    Increment,
    Decrement,
    GetInput,
    PutOutput,
    LoopStart,
    LoopEnd,
}

impl BfInstruction {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let instruction = match symbol {
            '>' => Self::GoRight,
            '<' => Self::GoLeft,
            '+' => Self::Increment,
            '-' => Self::Decrement,
            ',' => Self::GetInput,
            '.' => Self::PutOutput,
            '[' => Self::LoopStart,
            ']' => Self::LoopEnd,
            _ => return None,
        };
        Some(instruction)
    }

    pub fn symbol(self) -> char {
        match self {
            Self::GoRight => '>',
            Self::GoLeft => '<',
            Self::Increment => '+',
            Self::Decrement => '-',
            Self::GetInput => ',',
            Self::PutOutput => '.',
            Self::LoopStart => '[',
            Self::LoopEnd => ']',
        }
    }
}

impl fmt::Display for BfInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Source text with every character outside the instruction alphabet removed.
///
/// Indices into a `Program` are the coordinates used by the jump table and by
/// the instruction pointer of the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Program {
    instructions: Vec<BfInstruction>,
}

impl Program {
    pub fn load(source: &str) -> Self {
        let instructions: Vec<_> = source.chars().filter_map(BfInstruction::from_symbol).collect();
        debug!(
            source_len = source.len(),
            instructions = instructions.len(),
            "filtered program"
        );
        Self { instructions }
    }

    pub fn instructions(&self) -> &[BfInstruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<BfInstruction> {
        self.instructions.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl From<Vec<BfInstruction>> for Program {
    fn from(instructions: Vec<BfInstruction>) -> Self {
        Self { instructions }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            write!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[test]
fn test_filter_drops_comments() {
    let program = Program::load("hello +[- world]>.<, #!");
    assert_eq!(program.to_string(), "+[-]>.<,");
    assert_eq!(program.len(), 8);
}

#[test]
fn test_filter_keeps_order() {
    let program = Program::load("a]b[c.d,e<f>g-h+");
    assert_eq!(
        program.instructions(),
        [
            BfInstruction::LoopEnd,
            BfInstruction::LoopStart,
            BfInstruction::PutOutput,
            BfInstruction::GetInput,
            BfInstruction::GoLeft,
            BfInstruction::GoRight,
            BfInstruction::Decrement,
            BfInstruction::Increment,
        ]
    );
}

#[test]
fn test_filter_is_idempotent() {
    for source in ["", "no code here", "++[>+<-]\n.\t,", "[[]]x[][]y", "日本語 + 語 -"] {
        let once = Program::load(source);
        let twice = Program::load(&once.to_string());
        assert_eq!(once, twice);
    }
}

#[test]
fn test_empty_source() {
    assert!(Program::load("").is_empty());
    assert!(Program::load("just a comment\n").is_empty());
}

#[test]
fn test_from_instructions() {
    let program = Program::from(vec![
        BfInstruction::Increment,
        BfInstruction::LoopStart,
        BfInstruction::Decrement,
        BfInstruction::LoopEnd,
    ]);
    assert_eq!(program, Program::load("+[-]"));
    assert_eq!(program.get(1), Some(BfInstruction::LoopStart));
    assert_eq!(program.get(4), None);
}
