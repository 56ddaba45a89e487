use std::io::{BufRead, Write};

use tracing::{debug, trace};

use crate::{
    BfError,
    jump::JumpTable,
    program::{BfInstruction, Program},
    tape::{DEFAULT_TAPE_LENGTH, Tape},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterpreterConfig {
    /// Number of cells on the tape. Must be nonzero.
    pub tape_length: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            tape_length: DEFAULT_TAPE_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BfInterpreter<I, O> {
    program: Program,
    instruction_pointer: usize,
    jumps: JumpTable,
    tape: Tape,
    steps: u64,
    input: I,
    output: O,
}

impl<I, O> BfInterpreter<I, O>
where
    I: BufRead,
    O: Write,
{
    pub fn new(source: &str, input: I, output: O) -> Result<Self, BfError> {
        Self::with_config(source, InterpreterConfig::default(), input, output)
    }

    pub fn with_config(
        source: &str,
        config: InterpreterConfig,
        input: I,
        output: O,
    ) -> Result<Self, BfError> {
        let program = Program::load(source);
        let jumps = JumpTable::resolve(&program)?;
        Self::from_parts(program, jumps, config, input, output)
    }

    /// Builds an interpreter from an already resolved program.
    ///
    /// `jumps` is expected to come from [`JumpTable::resolve`] on the same
    /// `program`; a loop instruction without a partner fails at run time with
    /// [`BfError::MissingJumpTarget`].
    pub fn from_parts(
        program: Program,
        jumps: JumpTable,
        config: InterpreterConfig,
        input: I,
        output: O,
    ) -> Result<Self, BfError> {
        Ok(Self {
            program,
            instruction_pointer: 0,
            jumps,
            tape: Tape::new(config.tape_length)?,
            steps: 0,
            input,
            output,
        })
    }

    pub fn is_end(&self) -> bool {
        self.instruction_pointer >= self.program.len()
    }

    pub fn head_value(&self) -> u8 {
        self.tape.value()
    }

    pub fn tape_pointer(&self) -> usize {
        self.tape.head()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn current_instruction(&self) -> Option<BfInstruction> {
        self.program.get(self.instruction_pointer)
    }

    fn jump_target(&self) -> Result<usize, BfError> {
        self.jumps
            .partner(self.instruction_pointer)
            .ok_or(BfError::MissingJumpTarget {
                index: self.instruction_pointer,
            })
    }

    /// Reads one UTF-8 encoded character from the input.
    fn read_char(&mut self) -> Result<char, BfError> {
        let mut bytes = [0; 4];
        let first = match self.input.fill_buf()? {
            [] => return Err(BfError::LackOfInput),
            [first, ..] => *first,
        };
        let width = match first {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => {
                self.input.consume(1);
                return Err(BfError::InvalidUtf8);
            }
        };
        let mut filled = 0;
        while filled < width {
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                return Err(BfError::InvalidUtf8);
            }
            let take = buf.len().min(width - filled);
            bytes[filled..filled + take].copy_from_slice(&buf[..take]);
            self.input.consume(take);
            filled += take;
        }
        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(BfError::InvalidUtf8)
    }

    /// Executes the instruction under the instruction pointer. Does nothing
    /// once the program has ended.
    pub fn step(&mut self) -> Result<(), BfError> {
        let Some(instruction) = self.current_instruction() else {
            return Ok(());
        };
        trace!(
            ip = self.instruction_pointer,
            %instruction,
            head = self.tape.head(),
            value = self.tape.value(),
            "dispatch"
        );
        match instruction {
            BfInstruction::GoRight => self.tape.go_right(),
            BfInstruction::GoLeft => self.tape.go_left(),
            BfInstruction::Increment => self.tape.increment(),
            BfInstruction::Decrement => self.tape.decrement(),
            BfInstruction::GetInput => {
                let c = self.read_char()?;
                self.tape.set_value((u32::from(c) % 256) as u8);
            }
            BfInstruction::PutOutput => {
                let mut buf = [0; 4];
                let encoded = char::from(self.tape.value()).encode_utf8(&mut buf);
                self.output.write_all(encoded.as_bytes())?;
                self.output.flush()?;
            }
            BfInstruction::LoopStart => {
                if self.tape.value() == 0 {
                    self.instruction_pointer = self.jump_target()?;
                }
            }
            BfInstruction::LoopEnd => {
                if self.tape.value() != 0 {
                    self.instruction_pointer = self.jump_target()?;
                }
            }
        }
        self.instruction_pointer += 1;
        self.steps += 1;
        Ok(())
    }

    /// Runs at most `limit` instructions. Returns whether the program ended.
    pub fn run_steps(&mut self, limit: u64) -> Result<bool, BfError> {
        for _ in 0..limit {
            if self.is_end() {
                break;
            }
            self.step()?;
        }
        Ok(self.is_end())
    }

    pub fn execute(mut self) -> Result<(), BfError> {
        while !self.is_end() {
            self.step()?;
        }
        debug!(steps = self.steps, "program ended");
        Ok(())
    }
}

#[test]
fn test_echo() -> anyhow::Result<()> {
    let input = std::io::BufReader::new(&[1, 4, 2, 3, 5, 2, 3, 0][..]);
    let mut output = vec![];
    let interpreter = BfInterpreter::new(",[.,]", input, &mut output)?;
    interpreter.execute()?;
    assert_eq!(output, [1, 4, 2, 3, 5, 2, 3]);
    Ok(())
}

#[test]
fn test_cat_until_exhausted() -> anyhow::Result<()> {
    let input = std::io::BufReader::new(&b"cat!"[..]);
    let mut output = vec![];
    let interpreter = BfInterpreter::new(",[.,]", input, &mut output)?;
    let err = interpreter.execute().expect_err("input must run out");
    assert!(matches!(err, BfError::LackOfInput));
    assert_eq!(output, b"cat!");
    Ok(())
}

#[test]
fn test_reverse() -> anyhow::Result<()> {
    let input = std::io::BufReader::new(&[1, 4, 2, 3, 5, 2, 3, 0][..]);
    let mut output = vec![];
    let interpreter = BfInterpreter::new(">,[>,]<[.<]", input, &mut output)?;
    interpreter.execute()?;
    assert_eq!(output, [3, 2, 5, 3, 2, 4, 1]);
    Ok(())
}

#[test]
fn test_hello_world() -> anyhow::Result<()> {
    let input = std::io::BufReader::new(&[][..]);
    let mut output = vec![];
    let interpreter = BfInterpreter::new(
        "++++++++++[>+++++++>++++++++++>+++>++++<
<<<-]>++.>+.+++++++..+++.>>++++.<++.<+++
+++++.--------.+++.------.--------.>+.",
        input,
        &mut output,
    )?;
    interpreter.execute()?;
    assert_eq!(output, b"Hello, world!");
    Ok(())
}

#[test]
fn test_sum_n() -> anyhow::Result<()> {
    let input = std::io::BufReader::new(&[3][..]);
    let mut output = vec![];
    let interpreter = BfInterpreter::new(
        ",[[->>+>+<<<]>>>[-<<<+>>>]<[-<+>]<<-]>.",
        input,
        &mut output,
    )?;
    interpreter.execute()?;
    assert_eq!(output, [6]);
    Ok(())
}

#[test]
fn test_eight_increments() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new("++++++++.", &b""[..], &mut output)?;
    interpreter.execute()?;
    assert_eq!(output, [8]);
    Ok(())
}

#[test]
fn test_byte_wraps() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new("-.+.", &b""[..], &mut output)?;
    interpreter.execute()?;
    assert_eq!(String::from_utf8(output)?, "\u{ff}\0");
    Ok(())
}

#[test]
fn test_pointer_wraps() -> anyhow::Result<()> {
    let mut output = vec![];
    let config = InterpreterConfig { tape_length: 2 };
    let interpreter = BfInterpreter::with_config("<+++>>.", config, &b""[..], &mut output)?;
    interpreter.execute()?;
    assert_eq!(output, [3]);
    Ok(())
}

#[test]
fn test_skip_loop_on_zero() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new("[+++.]++.", &b""[..], &mut output)?;
    interpreter.execute()?;
    assert_eq!(output, [2]);
    Ok(())
}

#[test]
fn test_empty_program() -> anyhow::Result<()> {
    let mut output = vec![];
    let mut interpreter = BfInterpreter::new("nothing to do", &b""[..], &mut output)?;
    assert!(interpreter.is_end());
    assert_eq!(interpreter.current_instruction(), None);
    interpreter.step()?;
    assert_eq!(interpreter.steps(), 0);
    interpreter.execute()?;
    assert!(output.is_empty());
    Ok(())
}

#[test]
fn test_non_halting() -> anyhow::Result<()> {
    let mut output = vec![];
    let mut interpreter = BfInterpreter::new("+[]", &b""[..], &mut output)?;
    let ended = interpreter.run_steps(10_000)?;
    assert!(!ended);
    assert_eq!(interpreter.steps(), 10_000);
    assert_eq!(interpreter.head_value(), 1);
    Ok(())
}

#[test]
fn test_run_steps_stops_at_end() -> anyhow::Result<()> {
    let mut output = vec![];
    let mut interpreter = BfInterpreter::new("+>+", &b""[..], &mut output)?;
    assert!(!interpreter.run_steps(2)?);
    assert_eq!(interpreter.tape_pointer(), 1);
    assert_eq!(interpreter.current_instruction(), Some(BfInstruction::Increment));
    assert!(interpreter.run_steps(100)?);
    assert_eq!(interpreter.steps(), 3);
    assert_eq!(&interpreter.tape().cells()[..2], [1, 1]);
    Ok(())
}

#[test]
fn test_missing_jump_target() -> anyhow::Result<()> {
    let mut output = vec![];
    let program = Program::load("[]");
    let interpreter = BfInterpreter::from_parts(
        program,
        JumpTable::default(),
        InterpreterConfig::default(),
        &b""[..],
        &mut output,
    )?;
    let err = interpreter.execute().expect_err("jump table does not match");
    assert!(matches!(err, BfError::MissingJumpTarget { index: 0 }));
    Ok(())
}

#[test]
fn test_zero_tape_length() {
    let mut output = vec![];
    let config = InterpreterConfig { tape_length: 0 };
    let res = BfInterpreter::with_config("+", config, &b""[..], &mut output);
    assert!(matches!(res, Err(BfError::InvalidTapeLength)));
}

#[test]
fn test_unbalanced_rejected_before_run() {
    let mut output = vec![];
    let res = BfInterpreter::new("+++.]", &b""[..], &mut output);
    assert!(matches!(res, Err(BfError::UnbalancedLoop(_))));
    assert!(output.is_empty());
}

#[test]
fn test_input_reads_whole_character() -> anyhow::Result<()> {
    let mut output = vec![];
    let mut interpreter = BfInterpreter::new(",>,", "éa".as_bytes(), &mut output)?;
    interpreter.run_steps(2)?;
    assert_eq!(interpreter.tape().cells()[0], 233);
    interpreter.run_steps(1)?;
    assert_eq!(interpreter.tape().cells()[1], b'a');
    Ok(())
}

#[test]
fn test_input_code_point_wraps() -> anyhow::Result<()> {
    let mut output = vec![];
    // U+0101 is 257.
    let mut interpreter = BfInterpreter::new(",", "\u{101}".as_bytes(), &mut output)?;
    interpreter.step()?;
    assert_eq!(interpreter.head_value(), 1);

    let mut interpreter = BfInterpreter::new(",", "😀".as_bytes(), &mut output)?;
    interpreter.step()?;
    assert_eq!(interpreter.head_value(), (0x1F600 % 256) as u8);
    Ok(())
}

#[test]
fn test_echo_non_ascii() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new(",.", "é".as_bytes(), &mut output)?;
    interpreter.execute()?;
    assert_eq!(String::from_utf8(output)?, "é");
    Ok(())
}

#[test]
fn test_output_high_cell_is_character() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new("--.", &b""[..], &mut output)?;
    interpreter.execute()?;
    assert_eq!(String::from_utf8(output)?, "\u{fe}");
    Ok(())
}

#[test]
fn test_invalid_utf8_input() -> anyhow::Result<()> {
    let mut output = vec![];
    let interpreter = BfInterpreter::new(",", &[0xFF][..], &mut output)?;
    let err = interpreter.execute().expect_err("input is not utf-8");
    assert!(matches!(err, BfError::InvalidUtf8));

    let interpreter = BfInterpreter::new(",", &[0xC3][..], &mut output)?;
    let err = interpreter.execute().expect_err("character is truncated");
    assert!(matches!(err, BfError::InvalidUtf8));
    Ok(())
}
