//! Name hashing.
//!
//! A word is known only by the hash of its (lowercased, truncated) name.
//! There is no collision resolution: two names with the same hash are the
//! same word.  The algorithm is fixed so that outside tools can compute the
//! hashes that appear in compiled code:
//!
//! ```text
//! hash = 757
//! for each byte b: hash = hash * 129 + b   (wrapping, 64 bit)
//! ```

use crate::cell::Cell;

pub const SEED : u64 = 757;
pub const MULTIPLIER : u64 = 129;

/// Name buffer size, terminator included.  Names keep at most
/// `MAX_WORD_LENGTH - 1` bytes.
pub const MAX_WORD_LENGTH : usize = 16;

pub const fn hash(name: &[u8]) -> u64 {
    let mut h = SEED;
    let mut i = 0;

    while i < name.len() {
        h = h.wrapping_mul(MULTIPLIER).wrapping_add(name[i] as u64);
        i += 1;
    }

    h
}

/// Word cell for a name exactly as spelled.
pub const fn word(name: &str) -> Cell {
    Cell::word(hash(name.as_bytes()))
}

/// Word cell for a name as the tokenizer would see it: lowercased and cut
/// to `MAX_WORD_LENGTH - 1` bytes.
pub fn name_hash(name: &str) -> Cell {
    let mut buf = [0u8; MAX_WORD_LENGTH - 1];
    let mut len = 0;

    for b in name.bytes().take(buf.len()) {
        buf[len] = b.to_ascii_lowercase();
        len += 1;
    }

    Cell::word(hash(&buf[..len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Kind;
    use proptest::prelude::*;

    #[test]
    fn known_hashes() {
        assert_eq!(hash(b""), 757);
        assert_eq!(hash(b"a"), 757 * 129 + 97);
        assert_eq!(hash(b"ab"), (757 * 129 + 97) * 129 + 98);
    }

    #[test]
    fn word_cells_are_tagged() {
        assert_eq!(word("dup").kind(), Kind::Word);
        assert_eq!(word("dup").payload(), hash(b"dup") & Cell::MAX_PAYLOAD);
    }

    #[test]
    fn name_hash_folds_and_truncates() {
        assert_eq!(name_hash("DUP"), word("dup"));
        assert_eq!(name_hash("abcdefghijklmnopqrst"), word("abcdefghijklmno"));
        assert_ne!(name_hash("abcdefghijklmn"), word("abcdefghijklmno"));
    }

    proptest! {
        #[test]
        fn name_hash_ignores_case(name in "[a-zA-Z0-9+*/-]{1,15}") {
            prop_assert_eq!(name_hash(&name), name_hash(&name.to_ascii_uppercase()));
            prop_assert_eq!(name_hash(&name), word(&name.to_ascii_lowercase()));
        }
    }
}
