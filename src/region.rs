use thiserror::Error;

use crate::cell::{Addr, Cell, CELL_SIZE};

#[derive(Debug,Clone,Copy,PartialEq,Eq,Error)]
pub enum RegionError {
    #[error("reached end of stack")]
    Overflow,
    #[error("reached beginning of stack")]
    Underflow,
    #[error("address {0} is outside the region")]
    OutOfBounds(Addr),
    #[error("address {0} is not cell aligned")]
    Misaligned(Addr),
}

/// A fixed-capacity, pointer-bumped buffer.
///
/// The same type backs the operand stack, the return stack and the
/// dictionary arena.  `start <= ptr <= end` always holds and `ptr` stays
/// cell aligned.  The buffer is allocated once and never resized, so an
/// address handed out by the region stays valid for its whole life.
#[derive(Debug)]
pub struct Region {
    buf: Vec<u8>,
    start: usize,
    ptr: usize,
}

impl Region {
    pub fn with_cells(cells: usize) -> Region {
        Region::from_buffer(vec![0; cells * CELL_SIZE])
    }

    /// Wrap host-supplied storage.  A trailing partial cell is not used.
    pub fn from_buffer(mut buf: Vec<u8>) -> Region {
        let usable = buf.len() - buf.len() % CELL_SIZE;
        buf.truncate(usable);

        Region{
            buf:   buf,
            start: 0,
            ptr:   0,
        }
    }

    pub fn start(&self) -> Addr {
        Addr(self.start)
    }

    pub fn here(&self) -> Addr {
        Addr(self.ptr)
    }

    pub fn end(&self) -> Addr {
        Addr(self.buf.len())
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn used(&self) -> usize {
        self.ptr
    }

    pub fn available(&self) -> usize {
        self.buf.len() - self.ptr
    }

    /// Number of cells between `start` and `ptr`.
    pub fn depth(&self) -> usize {
        (self.ptr - self.start) / CELL_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.ptr == self.start
    }

    pub fn require(&self, cells: usize) -> Result<(),RegionError> {
        if self.depth() >= cells {
            Ok(())
        } else {
            Err(RegionError::Underflow)
        }
    }

    pub fn push(&mut self, cell: Cell) -> Result<(),RegionError> {
        if self.available() < CELL_SIZE {
            return Err(RegionError::Overflow);
        }

        let at = self.ptr;
        self.write_cell(at, cell);
        self.ptr += CELL_SIZE;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell,RegionError> {
        let cell = self.peek()?;
        self.ptr -= CELL_SIZE;
        Ok(cell)
    }

    pub fn peek(&self) -> Result<Cell,RegionError> {
        self.pick(0)
    }

    /// The cell `depth` places below the top (0 is the top).
    pub fn pick(&self, depth: usize) -> Result<Cell,RegionError> {
        self.require(depth + 1)?;
        Ok(self.read_cell(self.ptr - (depth + 1) * CELL_SIZE))
    }

    pub fn clear(&mut self) {
        self.ptr = self.start;
    }

    /// Make everything below the cursor permanent.
    pub fn protect(&mut self) {
        self.start = self.ptr;
    }

    /// Move the cursor by `bytes`, rounded away from zero to whole cells.
    /// Returns the cursor as it was before the move.
    pub fn allot(&mut self, bytes: i64) -> Result<Addr,RegionError> {
        let before = self.here();
        let magnitude = usize::try_from(bytes.unsigned_abs()).map_err(|_| RegionError::Overflow)?;
        let rounded = magnitude.checked_add(CELL_SIZE - 1).ok_or(RegionError::Overflow)? / CELL_SIZE * CELL_SIZE;

        if bytes >= 0 {
            if rounded > self.available() {
                return Err(RegionError::Overflow);
            }
            self.ptr += rounded;
        } else {
            if rounded > self.ptr - self.start {
                return Err(RegionError::Underflow);
            }
            self.ptr -= rounded;
        }

        Ok(before)
    }

    pub fn cell_at(&self, addr: Addr) -> Result<Cell,RegionError> {
        self.check_cell(addr)?;
        Ok(self.read_cell(addr.0))
    }

    pub fn set_cell(&mut self, addr: Addr, cell: Cell) -> Result<(),RegionError> {
        self.check_cell(addr)?;
        self.write_cell(addr.0, cell);
        Ok(())
    }

    pub fn byte_at(&self, addr: Addr) -> Result<u8,RegionError> {
        self.buf.get(addr.0).copied().ok_or(RegionError::OutOfBounds(addr))
    }

    pub fn set_byte(&mut self, addr: Addr, byte: u8) -> Result<(),RegionError> {
        let slot = self.buf.get_mut(addr.0).ok_or(RegionError::OutOfBounds(addr))?;
        *slot = byte;
        Ok(())
    }

    /// Write a byte `index` bytes past the cursor without moving it.
    pub fn stage_byte(&mut self, index: usize, byte: u8) -> Result<(),RegionError> {
        if index >= self.available() {
            return Err(RegionError::Overflow);
        }

        self.buf[self.ptr + index] = byte;
        Ok(())
    }

    /// Bytes from `addr` up to (not including) the first NUL.
    pub fn c_str_at(&self, addr: Addr) -> Result<&[u8],RegionError> {
        let tail = self.buf.get(addr.0..).ok_or(RegionError::OutOfBounds(addr))?;
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(&tail[..len])
    }

    /// Live cells from `start` to the cursor, bottom first.
    pub fn contents(&self) -> Vec<Cell> {
        (self.start..self.ptr).step_by(CELL_SIZE).map(|at| self.read_cell(at)).collect()
    }

    fn check_cell(&self, addr: Addr) -> Result<(),RegionError> {
        if !addr.is_aligned() {
            return Err(RegionError::Misaligned(addr));
        }

        match addr.0.checked_add(CELL_SIZE) {
            Some(last) if last <= self.buf.len() => Ok(()),
            _ => Err(RegionError::OutOfBounds(addr)),
        }
    }

    fn read_cell(&self, at: usize) -> Cell {
        let mut bytes = [0u8; CELL_SIZE];
        bytes.copy_from_slice(&self.buf[at..at + CELL_SIZE]);
        Cell::from_raw(u64::from_le_bytes(bytes))
    }

    fn write_cell(&mut self, at: usize, cell: Cell) {
        self.buf[at..at + CELL_SIZE].copy_from_slice(&cell.raw().to_le_bytes());
    }
}
