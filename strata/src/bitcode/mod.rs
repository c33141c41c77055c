//! Recovers string constants from the textual dump of LLVM bitcode (`llvm-bcanalyzer --dump`).
//!
//! The dump is consumed in a single forward pass: the type block is loaded into a
//! [`TypeTable`], then the records of the first constants block are decoded with a
//! [`ConstantBlockParser`]. Constants blocks nested in function blocks are not scanned.

mod constants;
mod tag;
mod types;

pub use constants::{
    pack_le,
    ConstantBlockParser,
};
pub use tag::{
    operands,
    scan_tag,
    Operands,
    Tag,
    TagKind,
};
pub use types::{
    ArrayType,
    IntegerType,
    TypeTable,
};

use crate::error::StrataError;

const TYPE_BLOCK: &str = "TYPE_BLOCK_ID_NEW";
const CONSTANTS_BLOCK: &str = "CONSTANTS_BLOCK";

/// Bitcode files start with this magic
pub const BITCODE_MAGIC: &[u8; 4] = b"BC\xc0\xde";

/// Magic of the bitcode wrapper header (e.g. on Darwin)
pub const BITCODE_WRAPPER_MAGIC: &[u8; 4] = b"\xde\xc0\x17\x0b";

/// Check whether `content` is LLVM bitcode rather than native object code
pub fn is_bitcode(content: &[u8]) -> bool {
    content.starts_with(BITCODE_MAGIC) || content.starts_with(BITCODE_WRAPPER_MAGIC)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DumpState {
    Outside,
    TypeBlock,
    ConstantsBlock,
    Done,
}

/// Lazily yields the string constants of a bitcode dump, one byte string per record.
///
/// The iterator stops after the first error.
pub struct ConstantStrings<I> {
    lines: I,
    state: DumpState,
    types: TypeTable,
    constants: ConstantBlockParser,
}

impl<I, S> ConstantStrings<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: I, char_width_limit: u32) -> Self {
        Self {
            lines,
            state: DumpState::Outside,
            types: TypeTable::new(),
            constants: ConstantBlockParser::new(char_width_limit),
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }
}

impl<I, S> Iterator for ConstantStrings<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<Vec<u8>, StrataError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state != DumpState::Done {
            let line = self.lines.next()?;
            let line = line.as_ref().trim();
            let Some(tag) = scan_tag(line) else {
                continue;
            };

            match self.state {
                DumpState::Outside => {
                    if tag.kind == TagKind::Opening {
                        match tag.name {
                            TYPE_BLOCK => self.state = DumpState::TypeBlock,
                            CONSTANTS_BLOCK => self.state = DumpState::ConstantsBlock,
                            _ => {},
                        }
                    }
                },
                DumpState::TypeBlock => {
                    if tag.kind == TagKind::Closing && tag.name == TYPE_BLOCK {
                        self.state = DumpState::Outside;
                    } else {
                        self.types.feed(line, tag.name, tag.attr_start);
                    }
                },
                DumpState::ConstantsBlock => {
                    if tag.kind == TagKind::Closing && tag.name == CONSTANTS_BLOCK {
                        self.state = DumpState::Done;
                    } else {
                        match self.constants.feed(&self.types, line, tag.name, tag.attr_start) {
                            Ok(Some(bytes)) => return Some(Ok(bytes)),
                            Ok(None) => {},
                            Err(err) => {
                                self.state = DumpState::Done;
                                return Some(Err(err));
                            },
                        }
                    }
                },
                DumpState::Done => unreachable!(),
            }
        }

        None
    }
}

/// Recover the string constants of a complete dump
pub fn parse_dump(dump: &str, char_width_limit: u32) -> ConstantStrings<std::str::Lines<'_>> {
    ConstantStrings::new(dump.lines(), char_width_limit)
}
