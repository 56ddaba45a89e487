use thiserror::Error;

pub mod interpreter;
pub mod jump;
pub mod program;
pub mod tape;

pub use interpreter::{BfInterpreter, InterpreterConfig};
pub use jump::{JumpPair, JumpTable};
pub use program::{BfInstruction, Program};
pub use tape::{DEFAULT_TAPE_LENGTH, Tape};

#[derive(Debug, Error)]
pub enum BfError {
    #[error("syntax error: {0}")]
    UnbalancedLoop(#[from] UnbalancedLoop),
    #[error("lack of input")]
    LackOfInput,
    #[error("input is not valid utf-8")]
    InvalidUtf8,
    #[error("no jump target recorded for loop instruction at {index}")]
    MissingJumpTarget { index: usize },
    #[error("tape length must be nonzero")]
    InvalidTapeLength,
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UnbalancedLoop {
    #[error("ending loop `]` at {index} has no matching `[`")]
    NotStarted { index: usize },
    #[error("starting loop `[` at {index} has no matching `]`")]
    NotEnded { index: usize },
}

#[test]
fn test_error_messages() {
    let err = BfError::from(UnbalancedLoop::NotStarted { index: 4 });
    assert_eq!(
        err.to_string(),
        "syntax error: ending loop `]` at 4 has no matching `[`"
    );
    let err = BfError::from(UnbalancedLoop::NotEnded { index: 0 });
    assert_eq!(
        err.to_string(),
        "syntax error: starting loop `[` at 0 has no matching `]`"
    );
}
