use crate::BfError;

pub const DEFAULT_TAPE_LENGTH: usize = 65536;

/// Fixed-length row of byte cells with a head that wraps at both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tape {
    cells: Box<[u8]>,
    head: usize,
}

impl Tape {
    pub fn new(length: usize) -> Result<Self, BfError> {
        if length == 0 {
            return Err(BfError::InvalidTapeLength);
        }
        Ok(Self {
            cells: vec![0; length].into_boxed_slice(),
            head: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn value(&self) -> u8 {
        self.cells[self.head]
    }

    pub fn set_value(&mut self, value: u8) {
        self.cells[self.head] = value;
    }

    pub fn go_right(&mut self) {
        self.head = (self.head + 1) % self.cells.len();
    }

    pub fn go_left(&mut self) {
        self.head = self.head.checked_sub(1).unwrap_or(self.cells.len() - 1);
    }

    pub fn increment(&mut self) {
        self.set_value(self.value().wrapping_add(1));
    }

    pub fn decrement(&mut self) {
        self.set_value(self.value().wrapping_sub(1));
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self {
            cells: vec![0; DEFAULT_TAPE_LENGTH].into_boxed_slice(),
            head: 0,
        }
    }
}

#[test]
fn test_cell_wraps() -> anyhow::Result<()> {
    let mut tape = Tape::new(4)?;
    tape.decrement();
    assert_eq!(tape.value(), 255);
    tape.increment();
    assert_eq!(tape.value(), 0);
    tape.set_value(255);
    tape.increment();
    assert_eq!(tape.value(), 0);
    Ok(())
}

#[test]
fn test_head_wraps() -> anyhow::Result<()> {
    let mut tape = Tape::new(3)?;
    tape.go_left();
    assert_eq!(tape.head(), 2);
    tape.go_right();
    assert_eq!(tape.head(), 0);
    tape.go_right();
    tape.go_right();
    tape.go_right();
    assert_eq!(tape.head(), 0);
    Ok(())
}

#[test]
fn test_cells_are_independent() -> anyhow::Result<()> {
    let mut tape = Tape::new(2)?;
    tape.increment();
    tape.go_right();
    tape.decrement();
    assert_eq!(tape.cells(), [1, 255]);
    Ok(())
}

#[test]
fn test_zero_length() {
    let err = Tape::new(0).expect_err("must reject empty tape");
    assert!(matches!(err, BfError::InvalidTapeLength));
}

#[test]
fn test_default_length() {
    let tape = Tape::default();
    assert_eq!(tape.len(), DEFAULT_TAPE_LENGTH);
    assert!(tape.cells().iter().all(|&cell| cell == 0));
}
