use crate::cell::Cell;
use crate::hash::name_hash;

/// Every built-in operation.  The set is closed; archives only decide which
/// names reach which operation.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Builtin {
    Compile,
    Return,
    Jump,
    JumpFalse,
    PushConstant,

    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    Greater,
    Equal,
    NotEqual,

    CharFetch,
    CharStore,
    Emit,
    Fetch,
    Store,
    Cells,
    Create,
    Allot,

    Drop,
    Dup,
    Swap,
    Over,
    Tuck,
    Nip,
    Swap2,
    Over2,

    Value,
    To,

    Display,
    DisplayHex,
    Newline,
    PrintArchives,
    PushMeminfo,

    Exit,
}

#[derive(Debug,Clone)]
pub struct ArchiveEntry {
    pub name: &'static str,
    pub op: Builtin,
    pub hash: Cell,
}

/// A named, immutable table of built-in words.
#[derive(Debug,Clone)]
pub struct Archive {
    name: &'static str,
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn new(name: &'static str, table: &[(&'static str, Builtin)]) -> Archive {
        let entries = table.iter().map(|&(name, op)| ArchiveEntry{
            name: name,
            op:   op,
            hash: Cell::NIL,
        }).collect();

        Archive{ name, entries }
    }

    pub fn base() -> Archive {
        Archive::new("base", BASE_WORDS)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // done once, when the archive is registered with a VM
    pub(crate) fn compute_hashes(&mut self) {
        for ent in &mut self.entries {
            ent.hash = name_hash(ent.name);
        }
    }

    pub fn lookup(&self, hash: Cell) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|ent| ent.hash == hash)
    }
}

const BASE_WORDS : &[(&str, Builtin)] = &[
    (":",       Builtin::Compile),
    (";",       Builtin::Return),
    ("jump",    Builtin::Jump),
    ("jumpf",   Builtin::JumpFalse),
    ("pushc",   Builtin::PushConstant),

    ("+",       Builtin::Add),
    ("-",       Builtin::Subtract),
    ("*",       Builtin::Multiply),
    ("/",       Builtin::Divide),
    ("mod",     Builtin::Modulo),
    ("<",       Builtin::Less),
    (">",       Builtin::Greater),
    ("=",       Builtin::Equal),
    ("!=",      Builtin::NotEqual),

    ("c@",      Builtin::CharFetch),
    ("c!",      Builtin::CharStore),
    ("emit",    Builtin::Emit),
    ("@",       Builtin::Fetch),
    ("!",       Builtin::Store),
    ("cells",   Builtin::Cells),
    ("create",  Builtin::Create),
    ("allot",   Builtin::Allot),

    ("drop",    Builtin::Drop),
    ("dup",     Builtin::Dup),
    ("swap",    Builtin::Swap),
    ("over",    Builtin::Over),
    ("tuck",    Builtin::Tuck),
    ("nip",     Builtin::Nip),
    ("swap2",   Builtin::Swap2),
    ("over2",   Builtin::Over2),

    ("value",   Builtin::Value),
    ("to",      Builtin::To),

    (".",       Builtin::Display),
    (".x",      Builtin::DisplayHex),
    ("cr",      Builtin::Newline),
    ("print-archives", Builtin::PrintArchives),
    ("push-meminfo",   Builtin::PushMeminfo),

    ("exit",    Builtin::Exit),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::word;

    #[test]
    fn hashes_are_computed_on_registration() {
        let mut arc = Archive::base();
        assert!(arc.entries().iter().all(|ent| ent.hash == Cell::NIL));

        arc.compute_hashes();
        assert_eq!(arc.lookup(word("dup")).unwrap().op, Builtin::Dup);
        assert_eq!(arc.lookup(word(";")).unwrap().op, Builtin::Return);
        assert_eq!(arc.lookup(word("print-archives")).unwrap().op, Builtin::PrintArchives);
        assert!(arc.lookup(word("if")).is_none());
    }

    #[test]
    fn base_names_are_unique() {
        let mut arc = Archive::base();
        arc.compute_hashes();

        for (i,ent) in arc.entries().iter().enumerate() {
            let first = arc.entries().iter().position(|e| e.hash == ent.hash).unwrap();
            assert_eq!(first, i, "{} collides with {}", ent.name, arc.entries()[first].name);
        }
    }

    #[test]
    fn custom_archives() {
        let arc = Archive::new("alias", &[("plus", Builtin::Add)]);
        assert_eq!(arc.name(), "alias");
        assert_eq!(arc.len(), 1);
        assert!(!arc.is_empty());
    }
}
