use tracing::debug;

use crate::cell::{Addr, Cell, Kind};
use crate::compile::opcode;
use crate::console::Console;
use crate::error::VmError;
use crate::hash::name_hash;
use crate::region::Region;
use crate::vm::Vm;

/// Cells taken by a definition header: the name, then the link to the
/// previous definition.
pub const HEADER_CELLS : usize = 2;

/// A user definition as found in the arena.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct Definition {
    pub header: Addr,
    pub name: Cell,
    pub previous: Option<Addr>,
}

impl Definition {
    fn read(arena: &Region, header: Addr) -> Option<Definition> {
        let name = arena.cell_at(header).ok()?;
        let link = arena.cell_at(header.offset(1)).ok()?;

        Some(Definition{
            header:   header,
            name:     name,
            previous: link.to_addr(),
        })
    }

    pub fn body(&self) -> Addr {
        self.header.offset(HEADER_CELLS)
    }

    /// Address of the stored value, if the body has the variable shape
    /// `pushc <value> ;`.
    pub fn value_slot(&self, arena: &Region) -> Option<Addr> {
        let body = self.body();
        let first = arena.cell_at(body).ok()?;
        let last = arena.cell_at(body.offset(2)).ok()?;

        if first == opcode::PUSH_CONSTANT && last == opcode::RETURN {
            Some(body.offset(1))
        } else {
            None
        }
    }
}

/// Walks the definition chain, newest first.
pub struct Definitions<'a> {
    arena: &'a Region,
    next: Option<Addr>,
}

impl<'a> Iterator for Definitions<'a> {
    type Item = Definition;

    fn next(&mut self) -> Option<Definition> {
        let def = Definition::read(self.arena, self.next?)?;
        self.next = def.previous;
        Some(def)
    }
}

impl<C: Console> Vm<C> {
    pub fn definitions(&self) -> Definitions<'_> {
        Definitions{ arena: &self.arena, next: self.definitions }
    }

    pub fn find_definition(&self, name: Cell) -> Option<Definition> {
        self.definitions().find(|def| def.name == name)
    }

    /// Find a definition by source spelling.
    pub fn lookup(&self, name: &str) -> Option<Definition> {
        self.find_definition(name_hash(name))
    }

    /// Lay down a header at the arena cursor and link it in.  Everything
    /// below the new body becomes permanent.
    pub(crate) fn alloc_definition(&mut self, name: Cell) -> Result<Definition,VmError> {
        if !name.is(Kind::Word) {
            return Err(VmError::ExpectedName(name));
        }

        let previous = self.definitions;
        let header = self.emit(name)?;
        self.emit(previous.map(Cell::addr).unwrap_or(Cell::NIL))?;
        self.arena.protect();

        self.definitions = Some(header);
        debug!(%header, %name, "definition");

        Ok(Definition{ header, name, previous })
    }

    /// Define `name` as a variable holding `value`.  If the body does not
    /// fit, the header is unlinked again.
    pub(crate) fn make_variable(&mut self, name: Cell, value: Cell) -> Result<Definition,VmError> {
        let def = self.alloc_definition(name)?;

        if let Err(err) = self.emit_variable_body(value) {
            debug!(error = %err, %name, "variable abandoned");
            self.definitions = def.previous;
            return Err(err);
        }

        Ok(def)
    }

    fn emit_variable_body(&mut self, value: Cell) -> Result<(),VmError> {
        self.emit(opcode::PUSH_CONSTANT)?;
        self.emit(value)?;
        self.emit(opcode::RETURN)?;
        Ok(())
    }

    /// Value cell of the newest variable called `name`.
    pub(crate) fn variable_slot(&self, name: Cell) -> Result<Addr,VmError> {
        let def = self.find_definition(name).ok_or(VmError::UndefinedVariable(name))?;
        def.value_slot(&self.arena).ok_or(VmError::NotAVariable(name))
    }

    /// Body of the newest definition called `name`, up to and including
    /// the first return.
    pub fn dump_definition(&self, name: &str) -> Option<Vec<Cell>> {
        let def = self.lookup(name)?;
        let mut body = Vec::new();
        let mut at = def.body();

        while at < self.arena.here() {
            let cell = self.arena.cell_at(at).ok()?;
            debug!("[{}] {}", at, cell);
            body.push(cell);

            if cell == opcode::RETURN {
                break;
            }

            // inline operands are data, even when they look like a return
            at = match cell {
                opcode::JUMP | opcode::JUMP_FALSE | opcode::PUSH_CONSTANT | opcode::STORE => {
                    let operand = self.arena.cell_at(at.offset(1)).ok()?;
                    debug!("[{}] {}", at.offset(1), operand);
                    body.push(operand);
                    at.offset(2)
                },
                _ => at.offset(1),
            };
        }

        Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::console::ScriptConsole;
    use crate::hash::word;

    fn vm(src: &str) -> Vm<ScriptConsole> {
        Vm::new(ScriptConsole::new(src), &VmConfig::default())
    }

    #[test]
    fn headers_link_newest_first() {
        let mut vm = vm("");
        let a = vm.alloc_definition(word("a")).unwrap();
        let b = vm.alloc_definition(word("b")).unwrap();

        assert_eq!(a.previous, None);
        assert_eq!(b.previous, Some(a.header));
        assert_eq!(b.header, a.body());

        let names : Vec<Cell> = vm.definitions().map(|d| d.name).collect();
        assert_eq!(names, vec![ word("b"), word("a") ]);
    }

    #[test]
    fn headers_protect_the_arena() {
        let mut vm = vm("");
        let def = vm.alloc_definition(word("a")).unwrap();

        assert_eq!(vm.arena().start(), def.body());
        assert_eq!(vm.arena.allot(-8), Err(crate::region::RegionError::Underflow));
    }

    #[test]
    fn names_must_be_words() {
        let mut vm = vm("");
        assert_eq!(vm.alloc_definition(Cell::int(3)), Err(VmError::ExpectedName(Cell::int(3))));
        assert_eq!(vm.definitions().count(), 0);
        assert_eq!(vm.arena().here(), Addr(0));
    }

    #[test]
    fn variables() {
        let mut vm = vm("");
        let def = vm.make_variable(word("x"), Cell::int(9)).unwrap();

        let slot = vm.variable_slot(word("x")).unwrap();
        assert_eq!(slot, def.body().offset(1));
        assert_eq!(vm.arena().cell_at(slot).unwrap(), Cell::int(9));
        assert_eq!(vm.dump_definition("x").unwrap(), vec![
            opcode::PUSH_CONSTANT, Cell::int(9), opcode::RETURN,
        ]);
    }

    #[test]
    fn truncated_variables_are_unlinked() {
        let config = VmConfig{ arena_cells: 7, ..VmConfig::default() };
        let mut vm = Vm::new(ScriptConsole::new(""), &config);

        let a = vm.make_variable(word("a"), Cell::int(1)).unwrap();
        assert_eq!(vm.make_variable(word("b"), Cell::int(2)), Err(VmError::ArenaExhausted));

        assert!(vm.lookup("b").is_none());
        assert_eq!(vm.definitions().map(|d| d.header).collect::<Vec<_>>(), vec![ a.header ]);
    }

    #[test]
    fn variable_lookup_errors() {
        let mut vm = vm(": p 1 2 ;");
        vm.step();

        assert_eq!(vm.variable_slot(word("q")), Err(VmError::UndefinedVariable(word("q"))));
        assert_eq!(vm.variable_slot(word("p")), Err(VmError::NotAVariable(word("p"))));
    }

    #[test]
    fn lookup_folds_case() {
        let mut vm = vm("");
        vm.make_variable(word("counter"), Cell::int(0)).unwrap();

        assert!(vm.lookup("COUNTER").is_some());
        assert!(vm.lookup("count").is_none());
    }

    #[test]
    fn dump_compiled_body() {
        let mut vm = vm(": f 59 dup ;");
        vm.step();

        assert_eq!(vm.dump_definition("f").unwrap(), vec![
            opcode::PUSH_CONSTANT, Cell::int(59), word("dup"), opcode::RETURN,
        ]);
        assert!(vm.dump_definition("nope").is_none());
    }

    #[test]
    fn dump_skips_inline_operands() {
        let mut vm = vm("");
        vm.alloc_definition(word("g")).unwrap();
        vm.emit(opcode::PUSH_CONSTANT).unwrap();
        vm.emit(opcode::RETURN).unwrap();
        vm.emit(opcode::RETURN).unwrap();

        assert_eq!(vm.dump_definition("g").unwrap().len(), 3);
    }
}
