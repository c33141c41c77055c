use std::path::Path;

use strata_tools::{
    toolchain::{
        BcAnalyzerWrapper,
        BitcodeDumper,
        ReadelfWrapper,
        SectionDumper,
    },
    Target,
};

use crate::{
    batch::LiteralExtractor,
    config::Config,
    error::StrataError,
    logger::Logger,
    merge::{
        create_merge_string_replacements,
        MergeStats,
        StringLiteral,
    },
    object::{
        read_haystacks,
        StringSection,
    },
    resolver::resolve_literals,
};

/// The string literals of a linked binary attributed to the objects it was linked from
#[derive(Debug)]
pub struct Analysis {
    pub sections: Vec<StringSection>,
    /// One list per entry in `sections`, sorted by address
    pub literals: Vec<Vec<StringLiteral>>,
    pub stats: MergeStats,
}

impl Analysis {
    pub fn num_literals(&self) -> usize {
        self.literals.iter().map(|x| x.len()).sum()
    }

    /// The number of bytes of the string sections that could be attributed
    pub fn attributed_bytes(&self) -> u64 {
        self.literals.iter().flatten().map(|x| x.size).sum()
    }
}

pub struct StringLiteralAnalyzer<S: SectionDumper, B: BitcodeDumper> {
    extractor: LiteralExtractor<S, B>,
}

impl StringLiteralAnalyzer<ReadelfWrapper, BcAnalyzerWrapper> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(LiteralExtractor::from_config(config))
    }
}

impl<S: SectionDumper, B: BitcodeDumper> StringLiteralAnalyzer<S, B> {
    pub fn new(extractor: LiteralExtractor<S, B>) -> Self {
        Self {
            extractor,
        }
    }

    pub fn analyze<P: AsRef<Path>>(&self, linked_elf: P, targets: &[Target], logger: &mut Logger) -> Result<Analysis, StrataError> {
        let linked_elf = linked_elf.as_ref();

        logger.set_title("Reading string sections");
        let (sections, haystacks) = read_haystacks(linked_elf)?;
        logger.debug(format!("Found {} string sections in {}", sections.len(), linked_elf.display()));

        logger.set_title("Extracting string literals");
        let literals = self.extractor.extract(targets, logger)?;

        logger.set_title("Resolving string literals");
        let positions = resolve_literals(&literals, &haystacks);
        let addresses = sections.iter().map(|x| x.address).collect::<Vec<_>>();
        let (literals, stats) = create_merge_string_replacements(&addresses, &positions)?;

        let analysis = Analysis {
            sections,
            literals,
            stats,
        };

        let total = haystacks.iter().map(|x| x.len() as u64).sum::<u64>();
        logger.info(format!("Attributed {} string literals ({}/{} bytes)", analysis.num_literals(), analysis.attributed_bytes(), total));
        logger.info(format!("Removed {} overlapping literals ({} bytes), created {} aliases", stats.removed, stats.removed_bytes, stats.aliases));

        Ok(analysis)
    }
}
