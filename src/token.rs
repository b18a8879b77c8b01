use crate::cell::Cell;
use crate::compile::opcode;
use crate::console::Console;
use crate::error::VmError;
use crate::hash::{hash, MAX_WORD_LENGTH};
use crate::vm::Vm;

const DIGITS : &[u8; 16] = b"0123456789abcdef";

pub fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | 0x0b | b'\r' | 0x0c)
}

/// A lexeme as read from input: lowercased, at most `MAX_WORD_LENGTH - 1`
/// bytes.
struct Lexeme {
    buf: [u8; MAX_WORD_LENGTH - 1],
    len: usize,
}

impl Lexeme {
    fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Parse an integer literal.  `0x` after the first digit switches to hex.
pub fn parse_number(text: &[u8]) -> Result<u64,VmError> {
    let (base, digits) = match text {
        [_, b'x', rest @ ..] => (16, rest),
        _ => (10, text),
    };

    if digits.is_empty() {
        return Err(VmError::InvalidNumber);
    }

    let mut value : u64 = 0;
    for &ch in digits {
        let digit = DIGITS[..base].iter().position(|&d| d == ch).ok_or(VmError::InvalidNumber)?;
        value = value.wrapping_mul(base as u64).wrapping_add(digit as u64);
    }

    Ok(value)
}

impl<C: Console> Vm<C> {
    fn read_char(&mut self) -> Result<u8,VmError> {
        self.console.read_char().ok_or(VmError::EndOfInput)
    }

    /// Returns the first character after any whitespace and comments.
    fn skip_whitespace(&mut self) -> Result<u8,VmError> {
        let mut ch = self.read_char()?;
        let mut in_comment = false;

        while is_whitespace(ch) || in_comment || ch == b'(' {
            match ch {
                b'(' => { in_comment = true; },
                b')' => { in_comment = false; },
                _ => {},
            }

            ch = self.read_char()?;
        }

        Ok(ch)
    }

    fn read_lexeme(&mut self, first: u8) -> Lexeme {
        let mut lex = Lexeme{ buf: [0; MAX_WORD_LENGTH - 1], len: 0 };
        let mut next = Some(first);

        while let Some(ch) = next {
            if is_whitespace(ch) {
                break;
            }

            if lex.len < lex.buf.len() {
                lex.buf[lex.len] = ch.to_ascii_lowercase();
                lex.len += 1;
            }

            next = self.console.read_char();
        }

        lex
    }

    /// Copy a string literal into the arena.  The opening quote has already
    /// been read.
    fn read_string(&mut self) -> Result<Cell,VmError> {
        let skip = if self.compiling {
            self.emit(opcode::JUMP)?;
            Some(self.emit(Cell::NIL)?)
        } else {
            None
        };

        let mut len = 0;
        loop {
            let ch = self.read_char()?;
            if ch == b'"' {
                break;
            }

            self.arena.stage_byte(len, ch).map_err(VmError::arena)?;
            len += 1;
        }

        self.arena.stage_byte(len, 0).map_err(VmError::arena)?;
        let start = self.arena.allot(len as i64 + 1).map_err(VmError::arena)?;

        if let Some(slot) = skip {
            let here = self.arena.here();
            self.patch(slot, here)?;
        }

        Ok(Cell::addr(start))
    }

    /// Read and classify the next token from input.
    pub fn next_token(&mut self) -> Result<Cell,VmError> {
        let first = self.skip_whitespace()?;

        if first == b'"' {
            return self.read_string();
        }

        let lex = self.read_lexeme(first);

        if first.is_ascii_digit() {
            Ok(Cell::int(parse_number(lex.bytes())?))
        } else {
            Ok(Cell::word(hash(lex.bytes())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Kind;
    use crate::config::VmConfig;
    use crate::console::ScriptConsole;
    use crate::hash::word;

    fn vm(src: &str) -> Vm<ScriptConsole> {
        Vm::new(ScriptConsole::new(src), &VmConfig::default())
    }

    fn tokens(src: &str) -> Vec<Cell> {
        let mut vm = vm(src);
        let mut out = Vec::new();
        while let Ok(tok) = vm.next_token() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number(b"123"), Ok(123));
        assert_eq!(parse_number(b"0x1f"), Ok(31));
        assert_eq!(parse_number(b"7xff"), Ok(255));
        assert_eq!(parse_number(b"0x"), Err(VmError::InvalidNumber));
        assert_eq!(parse_number(b"12a"), Err(VmError::InvalidNumber));
        assert_eq!(parse_number(b"0xfg"), Err(VmError::InvalidNumber));
    }

    #[test]
    fn words_and_numbers() {
        assert_eq!(tokens("  1\t0x10\nDup  +\r\n"), vec![
            Cell::int(1), Cell::int(16), word("dup"), word("+"),
        ]);
    }

    #[test]
    fn comments_do_not_nest() {
        let mut vm = vm("1 ( a ( b ) 2 ) 3");
        vm.run();

        // the first `)` ends the comment, leaving `2 )` as code
        assert_eq!(vm.last_error(), Some(&VmError::UndefinedWord(word(")"))));
        assert_eq!(vm.stack(), vec![ Cell::int(3) ]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(tokens("(lead)1 (mid dle) 2 (tail)"), vec![ Cell::int(1), Cell::int(2) ]);
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(tokens("abcdefghijklmnopqrstuvwxyz next"), vec![
            word("abcdefghijklmno"), word("next"),
        ]);
    }

    #[test]
    fn end_of_input() {
        let mut vm = vm("  ( open comment");
        assert_eq!(vm.next_token(), Err(VmError::EndOfInput));
    }

    #[test]
    fn top_level_strings() {
        let mut vm = vm("\"Hi There\" 5");
        let tok = vm.next_token().unwrap();

        let addr = tok.to_addr().unwrap();
        assert_eq!(vm.arena().c_str_at(addr).unwrap(), b"Hi There");
        // 8 bytes plus terminator, rounded up to two cells
        assert_eq!(vm.arena().here(), addr.offset(2));
        assert_eq!(vm.next_token(), Ok(Cell::int(5)));
    }

    #[test]
    fn compiled_strings_are_jumped_over() {
        let mut vm = vm("\"abc\"");
        vm.compiling = true;
        let start = vm.arena().here();

        let tok = vm.next_token().unwrap();
        assert_eq!(tok.kind(), Kind::Address);
        assert_eq!(vm.arena().cell_at(start).unwrap(), opcode::JUMP);
        assert_eq!(tok.to_addr(), Some(start.offset(2)));
        assert_eq!(vm.arena().cell_at(start.offset(1)).unwrap(), Cell::addr(start.offset(3)));
        assert_eq!(vm.arena().here(), start.offset(3));
    }

    #[test]
    fn string_exhausts_arena() {
        let config = VmConfig{ arena_cells: 1, ..VmConfig::default() };
        let mut vm = Vm::new(ScriptConsole::new("\"too long for one cell\""), &config);

        assert_eq!(vm.next_token(), Err(VmError::ArenaExhausted));
        assert_eq!(vm.arena().here().get(), 0);
    }
}
