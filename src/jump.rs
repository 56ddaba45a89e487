use std::fmt;

use tracing::{debug, warn};

use crate::{
    BfError, UnbalancedLoop,
    program::{BfInstruction, Program},
};

/// A matched loop-begin and loop-end, as indices into a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JumpPair {
    pub begin: usize,
    pub end: usize,
}

impl fmt::Display for JumpPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.begin, self.end)
    }
}

/// All loop pairs of a program.
///
/// Pairs are kept in the order the resolver closed them (innermost loops
/// first) and, separately, sorted by begin index. `partners` maps every loop
/// instruction to the index of its counterpart so the interpreter jumps in
/// constant time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JumpTable {
    resolved: Vec<JumpPair>,
    sorted: Vec<JumpPair>,
    partners: Vec<Option<usize>>,
}

impl JumpTable {
    pub fn resolve(program: &Program) -> Result<Self, BfError> {
        let mut loop_stack = vec![];
        let mut resolved = vec![];
        let mut partners = vec![None; program.len()];
        for (index, instruction) in program.instructions().iter().enumerate() {
            match instruction {
                BfInstruction::LoopStart => loop_stack.push(index),
                BfInstruction::LoopEnd => {
                    let Some(begin) = loop_stack.pop() else {
                        warn!(index, "loop end without matching begin");
                        return Err(UnbalancedLoop::NotStarted { index }.into());
                    };
                    partners[begin] = Some(index);
                    partners[index] = Some(begin);
                    resolved.push(JumpPair { begin, end: index });
                }
                _ => {}
            }
        }
        if let Some(&index) = loop_stack.first() {
            warn!(index, open = loop_stack.len(), "loop begin without matching end");
            return Err(UnbalancedLoop::NotEnded { index }.into());
        }

        let mut sorted = resolved.clone();
        sorted.sort_unstable_by_key(|pair| pair.begin);
        debug!(pairs = sorted.len(), "resolved jump table");
        Ok(Self {
            resolved,
            sorted,
            partners,
        })
    }

    /// Pairs in begin-index order.
    pub fn pairs(&self) -> &[JumpPair] {
        &self.sorted
    }

    /// Pairs in the order their loop-end was reached.
    pub fn resolution_order(&self) -> &[JumpPair] {
        &self.resolved
    }

    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

impl fmt::Display for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, pair) in self.sorted.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pair}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
fn resolve(source: &str) -> Result<JumpTable, BfError> {
    JumpTable::resolve(&Program::load(source))
}

#[test]
fn test_nested_pairs() -> anyhow::Result<()> {
    let table = resolve("[[]]")?;
    assert_eq!(
        table.pairs(),
        [JumpPair { begin: 0, end: 3 }, JumpPair { begin: 1, end: 2 }]
    );
    assert_eq!(
        table.resolution_order(),
        [JumpPair { begin: 1, end: 2 }, JumpPair { begin: 0, end: 3 }]
    );
    Ok(())
}

#[test]
fn test_sibling_pairs() -> anyhow::Result<()> {
    let table = resolve("[][]")?;
    assert_eq!(
        table.pairs(),
        [JumpPair { begin: 0, end: 1 }, JumpPair { begin: 2, end: 3 }]
    );
    assert_eq!(table.pairs(), table.resolution_order());
    Ok(())
}

#[test]
fn test_partners() -> anyhow::Result<()> {
    let table = resolve("+[>[-]<]")?;
    assert_eq!(table.partner(1), Some(7));
    assert_eq!(table.partner(7), Some(1));
    assert_eq!(table.partner(3), Some(5));
    assert_eq!(table.partner(5), Some(3));
    assert_eq!(table.partner(0), None);
    assert_eq!(table.partner(100), None);
    Ok(())
}

#[test]
fn test_indices_ignore_comments() -> anyhow::Result<()> {
    let table = resolve("loop: [ body - ] done")?;
    assert_eq!(table.pairs(), [JumpPair { begin: 0, end: 2 }]);
    Ok(())
}

#[test]
fn test_pairs_properly_nested() -> anyhow::Result<()> {
    let program = Program::load("[[-]>[[+]<]]+[,.]");
    let table = JumpTable::resolve(&program)?;
    let begins = program
        .instructions()
        .iter()
        .filter(|&&i| i == BfInstruction::LoopStart)
        .count();
    assert_eq!(table.len(), begins);
    for a in table.pairs() {
        assert_eq!(program.get(a.begin), Some(BfInstruction::LoopStart));
        assert_eq!(program.get(a.end), Some(BfInstruction::LoopEnd));
        for b in table.pairs() {
            let disjoint = a.end < b.begin || b.end < a.begin;
            let a_in_b = b.begin <= a.begin && a.end <= b.end;
            let b_in_a = a.begin <= b.begin && b.end <= a.end;
            assert!(disjoint || a_in_b || b_in_a, "{a} overlaps {b}");
        }
    }
    Ok(())
}

#[test]
fn test_display() -> anyhow::Result<()> {
    assert_eq!(resolve("[[]][]")?.to_string(), "[[0:3], [1:2], [4:5]]");
    assert_eq!(resolve("+[-]")?.to_string(), "[[1:3]]");
    assert_eq!(resolve("+-")?.to_string(), "[]");
    Ok(())
}

#[test]
fn test_not_opening_loop() {
    let err = resolve("]").expect_err("must occur syntax error");
    assert!(matches!(
        err,
        BfError::UnbalancedLoop(UnbalancedLoop::NotStarted { index: 0 })
    ));
}

#[test]
fn test_not_closing_loop() {
    let err = resolve("[").expect_err("must occur syntax error");
    assert!(matches!(
        err,
        BfError::UnbalancedLoop(UnbalancedLoop::NotEnded { index: 0 })
    ));
}

#[test]
fn test_unbalanced_reports_index() {
    let err = resolve("+[-]]").expect_err("must occur syntax error");
    assert!(matches!(
        err,
        BfError::UnbalancedLoop(UnbalancedLoop::NotStarted { index: 4 })
    ));

    let err = resolve("+[[-]").expect_err("must occur syntax error");
    assert!(matches!(
        err,
        BfError::UnbalancedLoop(UnbalancedLoop::NotEnded { index: 1 })
    ));
}
