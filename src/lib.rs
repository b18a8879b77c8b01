//! An embeddable stack machine and incremental compiler for a small Forth.
//!
//! The host supplies a [`Console`] (read one byte, write one byte) and the
//! capacities of the three regions; everything else lives in the [`Vm`].
//!
//! ```
//! use cellforth::{Cell, ScriptConsole, Vm, VmConfig};
//!
//! let mut vm = Vm::new(ScriptConsole::new(": sq dup * ; 7 sq"), &VmConfig::default());
//! vm.run();
//! assert_eq!(vm.stack(), vec![ Cell::int(49) ]);
//! ```

pub mod archive;
pub mod cell;
pub mod compile;
pub mod config;
pub mod console;
pub mod define;
pub mod error;
pub mod hash;
pub mod region;
pub mod token;
pub mod vm;

mod builtins;

pub use archive::{Archive, ArchiveEntry, Builtin};
pub use cell::{Addr, Cell, Kind, CELL_SIZE};
pub use config::VmConfig;
pub use console::{Console, ScriptConsole, StreamConsole};
pub use define::Definition;
pub use error::{Severity, VmError};
pub use hash::{hash, name_hash, word};
pub use region::{Region, RegionError};
pub use vm::Vm;
