/// Capacities for a VM.  All region sizes are in cells.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct VmConfig {
    pub operand_cells: usize,
    pub return_cells:  usize,
    pub arena_cells:   usize,

    /// Deepest nesting of `if`/`begin` constructs inside one definition.
    pub max_nesting:   usize,
}

impl VmConfig {
    pub const DEFAULT_REGION_CELLS : usize = 1024;
    pub const DEFAULT_MAX_NESTING  : usize = 8;
}

impl Default for VmConfig {
    fn default() -> VmConfig {
        VmConfig{
            operand_cells: VmConfig::DEFAULT_REGION_CELLS,
            return_cells:  VmConfig::DEFAULT_REGION_CELLS,
            arena_cells:   VmConfig::DEFAULT_REGION_CELLS,
            max_nesting:   VmConfig::DEFAULT_MAX_NESTING,
        }
    }
}
