use tracing::debug;

use crate::archive::Builtin;
use crate::cell::{Addr, Cell, Kind};
use crate::console::Console;
use crate::error::VmError;
use crate::hash::word;
use crate::vm::Vm;

/// Words the engine treats as instructions with inline operands.
pub mod opcode {
    use super::*;

    pub const RETURN        : Cell = word(";");
    pub const JUMP          : Cell = word("jump");
    pub const JUMP_FALSE    : Cell = word("jumpf");
    pub const PUSH_CONSTANT : Cell = word("pushc");
    pub const STORE         : Cell = word("to");

    /// The built-in an instruction cell stands for, if it is one of the
    /// opcodes above.  Compiled code runs these directly, never through a
    /// definition of the same name.
    pub fn builtin(instr: Cell) -> Option<Builtin> {
        match instr {
            RETURN        => Some(Builtin::Return),
            JUMP          => Some(Builtin::Jump),
            JUMP_FALSE    => Some(Builtin::JumpFalse),
            PUSH_CONSTANT => Some(Builtin::PushConstant),
            STORE         => Some(Builtin::To),
            _             => None,
        }
    }
}

/// Control words that are only meaningful while compiling.
pub mod keyword {
    use super::*;

    pub const IF     : Cell = word("if");
    pub const ELSE   : Cell = word("else");
    pub const THEN   : Cell = word("then");
    pub const BEGIN  : Cell = word("begin");
    pub const WHILE  : Cell = word("while");
    pub const REPEAT : Cell = word("repeat");
}

/// Open control constructs of the definition being compiled.
///
/// `forward` holds placeholder slots waiting for a jump target further on;
/// `backward` holds loop heads that a later jump returns to.
#[derive(Debug)]
pub struct Backpatch {
    forward: Vec<Addr>,
    backward: Vec<Addr>,
    limit: usize,
}

impl Backpatch {
    pub fn new(limit: usize) -> Backpatch {
        Backpatch{
            forward:  Vec::with_capacity(limit),
            backward: Vec::with_capacity(limit),
            limit:    limit,
        }
    }

    pub fn push_forward(&mut self, slot: Addr) -> Result<(),VmError> {
        if self.forward.len() >= self.limit {
            return Err(VmError::NestingTooDeep);
        }
        self.forward.push(slot);
        Ok(())
    }

    pub fn pop_forward(&mut self) -> Result<Addr,VmError> {
        self.forward.pop().ok_or(VmError::Unbalanced)
    }

    pub fn push_backward(&mut self, head: Addr) -> Result<(),VmError> {
        if self.backward.len() >= self.limit {
            return Err(VmError::NestingTooDeep);
        }
        self.backward.push(head);
        Ok(())
    }

    pub fn pop_backward(&mut self) -> Result<Addr,VmError> {
        self.backward.pop().ok_or(VmError::Unbalanced)
    }

    pub fn is_balanced(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }
}

impl<C: Console> Vm<C> {
    /// Compile one definition from input.  On failure the partial
    /// definition is unlinked, though the arena space it used stays taken.
    pub fn compile(&mut self) -> Result<(),VmError> {
        let previous = self.definitions;

        self.compiling = true;
        let ret = self.compile_definition();
        self.compiling = false;

        if let Err(err) = &ret {
            debug!(error = %err, "definition abandoned");
            self.definitions = previous;
        }

        ret
    }

    /// Emit a jump opcode with an empty target, returning the target slot.
    fn emit_jump(&mut self, op: Cell) -> Result<Addr,VmError> {
        self.emit(op)?;
        self.emit(Cell::NIL)
    }

    fn compile_definition(&mut self) -> Result<(),VmError> {
        let name = self.next_token()?;
        self.alloc_definition(name)?;

        let mut patches = Backpatch::new(self.max_nesting);

        loop {
            let token = self.next_token()?;

            match token {
                opcode::RETURN => {
                    break;
                },

                keyword::IF => {
                    let slot = self.emit_jump(opcode::JUMP_FALSE)?;
                    patches.push_forward(slot)?;
                },
                keyword::ELSE => {
                    let open = patches.pop_forward()?;
                    let slot = self.emit_jump(opcode::JUMP)?;
                    patches.push_forward(slot)?;

                    let here = self.arena.here();
                    self.patch(open, here)?;
                },
                keyword::THEN => {
                    let open = patches.pop_forward()?;
                    let here = self.arena.here();
                    self.patch(open, here)?;
                },

                keyword::BEGIN => {
                    patches.push_backward(self.arena.here())?;
                },
                keyword::WHILE => {
                    let slot = self.emit_jump(opcode::JUMP_FALSE)?;
                    patches.push_forward(slot)?;
                },
                keyword::REPEAT => {
                    let head = patches.pop_backward()?;
                    let exit = patches.pop_forward()?;

                    self.emit(opcode::JUMP)?;
                    self.emit(Cell::addr(head))?;

                    let here = self.arena.here();
                    self.patch(exit, here)?;
                },

                opcode::STORE => {
                    let target = self.next_token()?;
                    if !target.is(Kind::Word) {
                        return Err(VmError::ExpectedName(target));
                    }

                    self.emit(opcode::STORE)?;
                    self.emit(target.retag(Kind::Literal))?;
                },

                _ if token.is(Kind::Word) => {
                    self.emit(token)?;
                },
                _ => {
                    self.emit(opcode::PUSH_CONSTANT)?;
                    self.emit(token)?;
                },
            }
        }

        if !patches.is_balanced() {
            return Err(VmError::Unbalanced);
        }

        self.emit(opcode::RETURN)?;
        Ok(())
    }
}
