//! `strata_tools` wraps the external binaries that `strata` depends on and parses their output.
//!
//! `readelf` enumerates the sections of object files and archive members that may contain
//! string literals, `llvm-bcanalyzer` turns LLVM bitcode into the textual dump that
//! `strata` recovers constants from.

mod listing;

pub mod env;
pub mod toolchain;
pub use listing::{
    string_candidates,
    SectionHeader,
    SectionHeaderBuilder,
    SectionListing,
    SectionLocator,
    SectionPosition,
    Target,
    CANDIDATE_SECTION,
};
