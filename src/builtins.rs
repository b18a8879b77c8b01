use std::fmt;

use crate::archive::Builtin;
use crate::cell::{Addr, Cell, Kind, CELL_SIZE};
use crate::console::{Console, ConsoleWriter};
use crate::define::HEADER_CELLS;
use crate::error::VmError;
use crate::vm::Vm;

impl<C: Console> Vm<C> {
    fn print(&mut self, args: fmt::Arguments) {
        fmt::Write::write_fmt(&mut ConsoleWriter(&mut self.console), args).ok();
    }

    fn pop2(&mut self) -> Result<(Cell,Cell),VmError> {
        self.operands.require(2)?;
        let b = self.operands.pop()?;
        let a = self.operands.pop()?;
        Ok((a,b))
    }

    fn compiled_ip(&self, name: &'static str) -> Result<Addr,VmError> {
        self.ip.ok_or(VmError::NotCompiled(name))
    }

    // target of the jump whose opcode is at `ip`
    fn inline_target(&self, ip: Addr) -> Result<Addr,VmError> {
        let slot = ip.offset(1);
        let target = self.arena.cell_at(slot)?;
        target.to_addr()
            .filter(|addr| addr.is_aligned())
            .ok_or(VmError::InvalidJumpTarget(slot))
    }

    fn binop(&mut self, op: impl FnOnce(Cell,Cell) -> Result<Cell,VmError>) -> Result<bool,VmError> {
        let (a,b) = self.pop2()?;
        self.operands.push(op(a,b)?)?;
        Ok(true)
    }

    fn compare(&mut self, op: impl FnOnce(u64,u64) -> bool) -> Result<bool,VmError> {
        self.binop(|a,b| Ok(Cell::bool(op(a.raw(), b.raw()))))
    }

    /// Reorder the top `n` cells: `order` lists, bottom first, which of the
    /// popped cells (0 being the deepest) end up on the stack.
    fn shuffle(&mut self, n: usize, order: &[usize]) -> Result<bool,VmError> {
        self.operands.require(n)?;

        let mut top = [Cell::NIL; 4];
        for i in (0..n).rev() {
            top[i] = self.operands.pop()?;
        }

        for &i in order {
            self.operands.push(top[i])?;
        }

        Ok(true)
    }

    fn display(&mut self, cell: Cell) {
        match cell.kind() {
            Kind::Integer => self.print(format_args!("{} ", cell.signed())),
            Kind::Word    => self.print(format_args!("#<word 0x{:016x}> ", cell.payload())),
            Kind::Address => self.print(format_args!("#<addr 0x{:x}> ", cell.payload())),
            Kind::Literal => self.print(format_args!("#<literal 0x{:016x}> ", cell.payload())),
        }
    }

    fn print_archives(&mut self) {
        let mut listing = String::new();

        for arc in self.archives() {
            listing.push_str(arc.name());
            listing.push_str(":\n");

            for ent in arc.entries() {
                listing.push_str("   ");
                listing.push_str(ent.name);
                listing.push('\n');
            }
        }

        self.console.write_str(&listing);
    }

    fn assign(&mut self, name: Cell) -> Result<(),VmError> {
        let slot = self.variable_slot(name)?;
        let value = self.operands.pop()?;
        self.arena.set_cell(slot, value)?;
        Ok(())
    }

    /// Run one built-in.  Returns whether `ip` should advance past the
    /// instruction afterwards.
    pub fn exec_builtin(&mut self, op: Builtin) -> Result<bool,VmError> {
        match op {
            Builtin::Compile => {
                self.compile()?;
                Ok(true)
            },
            Builtin::Return => {
                let ret = self.returns.pop()?;
                self.ip = ret.to_addr();
                Ok(true)
            },
            Builtin::Jump => {
                let ip = self.compiled_ip("jump")?;
                self.ip = Some(self.inline_target(ip)?);
                Ok(false)
            },
            Builtin::JumpFalse => {
                let ip = self.compiled_ip("jumpf")?;
                let cond = self.operands.pop()?;

                self.ip = if cond.is_false() {
                    Some(self.inline_target(ip)?)
                } else {
                    Some(ip.offset(2))
                };
                Ok(false)
            },
            Builtin::PushConstant => {
                let ip = self.compiled_ip("pushc")?;
                let value = self.arena.cell_at(ip.offset(1))?;
                self.operands.push(value)?;
                self.ip = Some(ip.offset(2));
                Ok(false)
            },

            Builtin::Add => self.binop(|a,b| Ok(Cell::from_raw(a.raw().wrapping_add(b.raw())))),
            Builtin::Subtract => self.binop(|a,b| Ok(Cell::from_raw(a.raw().wrapping_sub(b.raw())))),
            Builtin::Multiply => self.binop(|a,b| Ok(Cell::from_raw(a.raw().wrapping_mul(b.payload())))),
            Builtin::Divide => self.binop(|a,b| {
                if b.payload() == 0 {
                    return Err(VmError::DivisionByZero);
                }
                Ok(Cell::int(a.payload() / b.payload()))
            }),
            Builtin::Modulo => self.binop(|a,b| {
                a.raw().checked_rem(b.raw())
                    .map(Cell::from_raw)
                    .ok_or(VmError::DivisionByZero)
            }),

            Builtin::Less     => self.compare(|a,b| a < b),
            Builtin::Greater  => self.compare(|a,b| a > b),
            Builtin::Equal    => self.compare(|a,b| a == b),
            Builtin::NotEqual => self.compare(|a,b| a != b),

            Builtin::CharFetch => {
                let addr = self.operands.pop()?.as_addr();
                let byte = self.arena.byte_at(addr)?;
                self.operands.push(Cell::int(byte as u64))?;
                Ok(true)
            },
            Builtin::CharStore => {
                let (ch, addr) = self.pop2()?;
                self.arena.set_byte(addr.as_addr(), ch.payload() as u8)?;
                Ok(true)
            },
            Builtin::Emit => {
                let ch = self.operands.pop()?;
                self.console.write_char(ch.payload() as u8);
                Ok(true)
            },
            Builtin::Fetch => {
                let addr = self.operands.pop()?.as_addr();
                let value = self.arena.cell_at(addr)?;
                self.operands.push(value)?;
                Ok(true)
            },
            Builtin::Store => {
                let (value, addr) = self.pop2()?;
                self.arena.set_cell(addr.as_addr(), value)?;
                Ok(true)
            },
            Builtin::Cells => {
                let n = self.operands.pop()?;
                self.operands.push(Cell::from_raw(n.raw().wrapping_mul(CELL_SIZE as u64)))?;
                Ok(true)
            },
            Builtin::Create => {
                let name = self.next_token()?;
                // data starts right after the variable body
                let data = self.arena.here().offset(HEADER_CELLS + 3);
                self.make_variable(name, Cell::addr(data))?;
                Ok(true)
            },
            Builtin::Allot => {
                let bytes = self.operands.pop()?.signed();
                self.arena.allot(bytes).map_err(VmError::arena)?;
                Ok(true)
            },

            Builtin::Drop => {
                self.operands.pop()?;
                Ok(true)
            },
            Builtin::Dup => {
                let top = self.operands.peek()?;
                self.operands.push(top)?;
                Ok(true)
            },
            Builtin::Swap  => self.shuffle(2, &[1, 0]),
            Builtin::Over  => self.shuffle(2, &[0, 1, 0]),
            Builtin::Tuck  => self.shuffle(2, &[1, 0, 1]),
            Builtin::Nip   => self.shuffle(2, &[1]),
            Builtin::Swap2 => self.shuffle(4, &[2, 3, 0, 1]),
            Builtin::Over2 => self.shuffle(4, &[0, 1, 2, 3, 0, 1]),

            Builtin::Value => {
                let name = self.next_token()?;
                self.make_variable(name, Cell::int(0))?;
                Ok(true)
            },
            Builtin::To => {
                match self.ip {
                    Some(ip) => {
                        let name = self.arena.cell_at(ip.offset(1))?.retag(Kind::Word);
                        self.assign(name)?;
                        self.ip = Some(ip.offset(2));
                        Ok(false)
                    },
                    None => {
                        let name = self.next_token()?;
                        self.assign(name)?;
                        Ok(true)
                    },
                }
            },

            Builtin::Display => {
                let cell = self.operands.pop()?;
                self.display(cell);
                Ok(true)
            },
            Builtin::DisplayHex => {
                let cell = self.operands.pop()?;
                self.print(format_args!("0x{:x} ", cell.payload()));
                Ok(true)
            },
            Builtin::Newline => {
                self.console.write_char(b'\n');
                Ok(true)
            },
            Builtin::PrintArchives => {
                self.print_archives();
                Ok(true)
            },
            Builtin::PushMeminfo => {
                let used = self.arena.used() as u64;
                let free = self.arena.available() as u64;
                self.operands.push(Cell::int(used))?;
                self.operands.push(Cell::int(free))?;
                Ok(true)
            },

            Builtin::Exit => {
                self.running = false;
                Ok(true)
            },
        }
    }
}
