use std::fmt;

/// Size in bytes of one cell in every region.
pub const CELL_SIZE: usize = std::mem::size_of::<u64>();

#[derive(Debug,PartialEq,Eq,Clone,Copy)]
#[repr(u8)]
pub enum Kind {
    Integer = 0,
    Word    = 1,
    Address = 2,
    // a word name carried as data, never executed
    Literal = 3,
}

impl Kind {
    const fn from_bits(bits: u64) -> Kind {
        match bits & Cell::MASK {
            0 => Kind::Integer,
            1 => Kind::Word,
            2 => Kind::Address,
            _ => Kind::Literal,
        }
    }
}

/// Byte offset into a region.
#[derive(Debug,PartialEq,Eq,PartialOrd,Ord,Clone,Copy,Hash)]
pub struct Addr(pub usize);

impl Addr {
    pub const fn offset(self, cells: usize) -> Addr {
        Addr(self.0 + cells * CELL_SIZE)
    }

    pub const fn bytes(self, count: usize) -> Addr {
        Addr(self.0 + count)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn is_aligned(self) -> bool {
        self.0 % CELL_SIZE == 0
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A tagged machine word: `payload << 2 | kind`.
///
/// The tag rides along through arithmetic.  `+` on an address and an
/// integer yields an address, which is how pointer arithmetic works.
#[derive(Debug,PartialEq,Eq,Clone,Copy,Hash)]
pub struct Cell(u64);

impl Cell {
    pub const SHIFT : u32 = 2;
    pub const MASK  : u64 = (1 << Cell::SHIFT) - 1;

    pub const MAX_PAYLOAD : u64 = u64::MAX >> Cell::SHIFT;

    pub const NIL   : Cell = Cell(0);
    pub const FALSE : Cell = Cell::int(0);
    pub const TRUE  : Cell = Cell::int(1);

    pub const fn tag(payload: u64, kind: Kind) -> Cell {
        Cell((payload << Cell::SHIFT) | kind as u64)
    }

    pub const fn from_raw(raw: u64) -> Cell {
        Cell(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn payload(self) -> u64 {
        self.0 >> Cell::SHIFT
    }

    pub const fn signed(self) -> i64 {
        (self.0 as i64) >> Cell::SHIFT
    }

    pub const fn kind(self) -> Kind {
        Kind::from_bits(self.0)
    }

    pub fn is(self, kind: Kind) -> bool {
        self.kind() == kind
    }

    pub const fn int(x: u64) -> Cell {
        Cell::tag(x, Kind::Integer)
    }

    pub const fn word(hash: u64) -> Cell {
        Cell::tag(hash, Kind::Word)
    }

    pub const fn addr(addr: Addr) -> Cell {
        Cell::tag(addr.0 as u64, Kind::Address)
    }

    pub fn bool(b: bool) -> Cell {
        if b { Cell::TRUE } else { Cell::FALSE }
    }

    pub fn is_false(self) -> bool {
        self.payload() == 0
    }

    pub fn to_addr(self) -> Option<Addr> {
        if self.is(Kind::Address) {
            usize::try_from(self.payload()).ok().map(Addr)
        } else {
            None
        }
    }

    // payload read as a byte offset, whatever the tag says
    pub fn as_addr(self) -> Addr {
        Addr(usize::try_from(self.payload()).unwrap_or(usize::MAX))
    }

    pub fn retag(self, kind: Kind) -> Cell {
        Cell::tag(self.payload(), kind)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            Kind::Integer => { write!(f, "[int] {}", self.signed()) },
            Kind::Word    => { write!(f, "[word] {:#018x}", self.payload()) },
            Kind::Address => { write!(f, "[addr] {:#x}", self.payload()) },
            Kind::Literal => { write!(f, "[lit] {:#018x}", self.payload()) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cells() {
        assert_eq!(Cell::int(7).raw(), 28);
        assert_eq!(Cell::int(7).payload(), 7);
        assert_eq!(Cell::int(7).kind(), Kind::Integer);

        assert_eq!(Cell::word(123).kind(), Kind::Word);
        assert_eq!(Cell::addr(Addr(16)).to_addr(), Some(Addr(16)));
        assert_eq!(Cell::int(16).to_addr(), None);
        assert_eq!(Cell::word(16).to_addr(), None);

        assert_eq!(Cell::from_raw(3).kind(), Kind::Literal);
        assert_eq!(Cell::word(99).retag(Kind::Literal), Cell::tag(99, Kind::Literal));
        assert_eq!(Cell::NIL, Cell::FALSE);
    }

    #[test]
    fn booleans() {
        assert!(Cell::FALSE.is_false());
        assert!(!Cell::TRUE.is_false());
        assert_eq!(Cell::bool(true), Cell::TRUE);
        assert_eq!(Cell::bool(false), Cell::FALSE);

        // false is decided on the payload alone
        assert!(Cell::tag(0, Kind::Word).is_false());
    }

    #[test]
    fn signed_payloads() {
        let minus_eight = Cell::from_raw(Cell::int(0).raw().wrapping_sub(Cell::int(8).raw()));
        assert_eq!(minus_eight.kind(), Kind::Integer);
        assert_eq!(minus_eight.signed(), -8);
        assert_eq!(Cell::int(8).signed(), 8);
    }

    #[test]
    fn addresses() {
        assert_eq!(Addr(8).offset(2), Addr(24));
        assert_eq!(Addr(8).bytes(3), Addr(11));
        assert!(Addr(16).is_aligned());
        assert!(!Addr(17).is_aligned());
        assert_eq!(format!("{}", Addr(255)), "0xff");
    }

    proptest! {
        #[test]
        fn tagging_round_trips(payload in 0..=Cell::MAX_PAYLOAD, bits in 0u64..4) {
            let kind = Kind::from_bits(bits);
            let cell = Cell::tag(payload, kind);
            prop_assert_eq!(cell.payload(), payload);
            prop_assert_eq!(cell.kind(), kind);
            prop_assert_eq!(cell.raw() & Cell::MASK, bits);
        }

        #[test]
        fn raw_addition_keeps_address_tag(base in 0u64..(1 << 40), delta in 0u64..(1 << 20)) {
            let sum = Cell::from_raw(Cell::addr(Addr(base as usize)).raw() + Cell::int(delta).raw());
            prop_assert_eq!(sum, Cell::addr(Addr((base + delta) as usize)));
        }
    }
}
