use tracing::{debug, error, info, trace, warn};

use crate::archive::{Archive, Builtin};
use crate::cell::{Addr, Cell, Kind};
use crate::compile::opcode;
use crate::config::VmConfig;
use crate::console::Console;
use crate::error::{Severity, VmError};
use crate::region::Region;

/// The interpreter: three regions, an instruction pointer and the word
/// tables, driven one step at a time.
///
/// `ip` is `None` while control sits in the top-level read loop and points
/// into the arena while a definition runs.
pub struct Vm<C: Console> {
    pub(crate) operands: Region,
    pub(crate) returns: Region,
    pub(crate) arena: Region,

    pub(crate) ip: Option<Addr>,
    pub(crate) archives: Vec<Archive>,
    pub(crate) definitions: Option<Addr>,

    pub(crate) running: bool,
    pub(crate) compiling: bool,

    pub(crate) console: C,
    pub(crate) max_nesting: usize,
    last_error: Option<VmError>,
}

impl<C: Console> Vm<C> {
    pub fn new(console: C, config: &VmConfig) -> Vm<C> {
        let mut vm = Vm::with_regions(
            console,
            Region::with_cells(config.operand_cells),
            Region::with_cells(config.return_cells),
            Region::with_cells(config.arena_cells),
        );
        vm.max_nesting = config.max_nesting;
        vm
    }

    /// Build a VM over host-supplied regions.
    pub fn with_regions(console: C, operands: Region, returns: Region, arena: Region) -> Vm<C> {
        let mut vm = Vm{
            operands:    operands,
            returns:     returns,
            arena:       arena,

            ip:          None,
            archives:    Vec::new(),
            definitions: None,

            running:     false,
            compiling:   false,

            console:     console,
            max_nesting: VmConfig::DEFAULT_MAX_NESTING,
            last_error:  None,
        };

        vm.register_archive(Archive::base());

        debug!(
            operands = vm.operands.capacity(),
            returns = vm.returns.capacity(),
            arena = vm.arena.capacity(),
            "vm created"
        );

        vm
    }

    /// Add a word table.  It is searched before every table registered
    /// earlier, but after all user definitions.
    pub fn register_archive(&mut self, mut archive: Archive) {
        archive.compute_hashes();
        debug!(archive = archive.name(), words = archive.len(), "archive registered");
        self.archives.push(archive);
    }

    pub fn archives(&self) -> impl Iterator<Item = &Archive> {
        self.archives.iter().rev()
    }

    pub fn lookup_builtin(&self, hash: Cell) -> Option<Builtin> {
        self.archives().find_map(|arc| arc.lookup(hash)).map(|ent| ent.op)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn compiling(&self) -> bool {
        self.compiling
    }

    pub fn ip(&self) -> Option<Addr> {
        self.ip
    }

    pub fn operands(&self) -> &Region {
        &self.operands
    }

    pub fn returns(&self) -> &Region {
        &self.returns
    }

    pub fn arena(&self) -> &Region {
        &self.arena
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    pub fn last_error(&self) -> Option<&VmError> {
        self.last_error.as_ref()
    }

    /// Operand stack contents, bottom first.
    pub fn stack(&self) -> Vec<Cell> {
        self.operands.contents()
    }

    pub fn push(&mut self, cell: Cell) -> Result<(),VmError> {
        self.operands.push(cell)?;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell,VmError> {
        Ok(self.operands.pop()?)
    }

    /// Append one cell to the arena, returning where it landed.
    pub(crate) fn emit(&mut self, cell: Cell) -> Result<Addr,VmError> {
        let at = self.arena.here();
        self.arena.push(cell).map_err(VmError::arena)?;
        Ok(at)
    }

    pub(crate) fn patch(&mut self, slot: Addr, target: Addr) -> Result<(),VmError> {
        self.arena.set_cell(slot, Cell::addr(target)).map_err(VmError::arena)
    }

    /// Call a word by hash.  Returns whether `ip` should move past the
    /// instruction that made the call.
    pub fn resolve_and_execute(&mut self, word: Cell) -> Result<bool,VmError> {
        if let Some(def) = self.find_definition(word) {
            let ret = self.ip.map(Cell::addr).unwrap_or(Cell::NIL);
            self.returns.push(ret)?;
            self.ip = Some(def.body());
            return Ok(false);
        }

        if let Some(op) = self.lookup_builtin(word) {
            return self.exec_builtin(op);
        }

        Err(VmError::UndefinedWord(word))
    }

    fn try_step(&mut self) -> Result<(),VmError> {
        let advance = match self.ip {
            Some(ip) => {
                let instr = self.arena.cell_at(ip)?;
                trace!(%ip, %instr, "step");

                if !instr.is(Kind::Word) {
                    return Err(VmError::InvalidInstruction(instr));
                }

                match opcode::builtin(instr) {
                    Some(op) => self.exec_builtin(op)?,
                    None => self.resolve_and_execute(instr)?,
                }
            },
            None => {
                let token = self.next_token()?;
                trace!(%token, "top level");

                if token.is(Kind::Word) {
                    self.resolve_and_execute(token)?
                } else {
                    self.operands.push(token)?;
                    false
                }
            },
        };

        if advance {
            if let Some(ip) = self.ip {
                self.ip = Some(ip.offset(1));
            }
        }

        Ok(())
    }

    /// Run one instruction (or one top-level token).  Errors never escape:
    /// they are reported through the console and folded into the VM state.
    pub fn step(&mut self) {
        match self.try_step() {
            Ok(()) => {},
            Err(VmError::EndOfInput) => {
                debug!("end of input");
                self.running = false;
            },
            Err(err) => {
                self.signal(err);
            },
        }
    }

    pub fn run(&mut self) {
        self.running = true;
        info!("running");

        while self.running {
            self.step();
        }

        info!(depth = self.operands.depth(), "stopped");
    }

    /// Report an error and apply its recovery.
    pub fn signal(&mut self, err: VmError) {
        let severity = err.severity();

        self.console.write_str(severity.prefix());
        self.console.write_str(&err.to_string());
        self.console.write_char(b'\n');

        match severity {
            Severity::Recoverable => {
                warn!(error = %err, ip = ?self.ip, "recovering at top level");
                self.ip = None;
                self.operands.clear();
            },
            Severity::Fatal => {
                error!(error = %err, "halting");
                self.running = false;
            },
        }

        self.last_error = Some(err);
    }
}
