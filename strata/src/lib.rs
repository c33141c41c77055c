//! `strata` attributes the string literals in the read-only data of a linked binary
//! to the object files it was linked from.
//!
//! The pipeline:
//! 1. Recover the string literals of every object file. LLVM bitcode is dumped with
//!    `llvm-bcanalyzer` and the constant strings are read from the dump, native objects
//!    contribute the strings of their merged string sections.
//! 2. Find every literal in the `.rodata` sections of the linked binary.
//! 3. Turn the matches into address ranges, resolving literals that were merged by the linker.
//!
//! [`StringLiteralAnalyzer`] runs all steps at once, [`extract_literals`] and
//! [`resolve_string_pieces`] expose the first two steps with an encoded interface
//! for batch processing.

mod analyzer;
mod batch;
mod config;
mod error;
mod logger;
mod merge;

/* The building blocks: */
pub mod bitcode;
pub mod codec;
pub mod object;
pub mod reader;
pub mod resolver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analyzer::{
    Analysis,
    StringLiteralAnalyzer,
};
pub use batch::{
    extract_literals,
    resolve_string_pieces,
    LiteralExtractor,
};
pub use config::{
    Config,
    ConfigBuilder,
    DEFAULT_CHAR_WIDTH_LIMIT,
};
pub use error::StrataError;
pub use logger::Logger;
pub use merge::{
    create_merge_string_replacements,
    MergeStats,
    StringLiteral,
};
pub use strata_tools::{
    SectionPosition,
    Target,
};
