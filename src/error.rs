use thiserror::Error;

use crate::cell::{Addr, Cell};
use crate::region::RegionError;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Severity {
    /// Abandon the current evaluation and go back to the top-level loop.
    Recoverable,
    /// Stop the run loop.
    Fatal,
}

impl Severity {
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Recoverable => "error: ",
            Severity::Fatal       => "fatal: ",
        }
    }
}

#[derive(Debug,Clone,PartialEq,Eq,Error)]
pub enum VmError {
    #[error("undefined word")]
    UndefinedWord(Cell),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error("{0} call from non-compiled context")]
    NotCompiled(&'static str),

    #[error("assignment to undefined variable")]
    UndefinedVariable(Cell),
    #[error("not a variable")]
    NotAVariable(Cell),

    #[error("expected a word in definition")]
    ExpectedName(Cell),
    #[error("construct nesting too deep")]
    NestingTooDeep,
    #[error("unbalanced control structure")]
    Unbalanced,

    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid number")]
    InvalidNumber,

    #[error("invalid instruction {0}")]
    InvalidInstruction(Cell),
    #[error("invalid jump target at {0}")]
    InvalidJumpTarget(Addr),

    #[error("out of dictionary space")]
    ArenaExhausted,

    #[error("end of input")]
    EndOfInput,
}

impl VmError {
    pub fn severity(&self) -> Severity {
        match self {
            VmError::ArenaExhausted | VmError::EndOfInput => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    /// Arena writes that run out of room end the run; anything else the
    /// arena reports is an ordinary addressing mistake.
    pub fn arena(err: RegionError) -> VmError {
        match err {
            RegionError::Overflow => VmError::ArenaExhausted,
            other => VmError::Region(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities() {
        assert_eq!(VmError::UndefinedWord(Cell::word(1)).severity(), Severity::Recoverable);
        assert_eq!(VmError::Region(RegionError::Overflow).severity(), Severity::Recoverable);
        assert_eq!(VmError::ArenaExhausted.severity(), Severity::Fatal);
    }

    #[test]
    fn arena_overflow_is_fatal() {
        assert_eq!(VmError::arena(RegionError::Overflow), VmError::ArenaExhausted);
        assert_eq!(VmError::arena(RegionError::Underflow), VmError::Region(RegionError::Underflow));
    }

    #[test]
    fn messages() {
        assert_eq!(VmError::from(RegionError::Underflow).to_string(), "reached beginning of stack");
        assert_eq!(VmError::NotCompiled("jump").to_string(), "jump call from non-compiled context");
        assert_eq!(VmError::UndefinedWord(Cell::word(5)).to_string(), "undefined word");
    }
}
