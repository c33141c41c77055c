use std::path::Path;

use strata_tools::{
    toolchain::{
        BcAnalyzerWrapper,
        BitcodeDumper,
        ReadelfWrapper,
        SectionDumper,
    },
    string_candidates,
    SectionHeader,
    SectionLocator,
    SectionPosition,
    Target,
};

use crate::{
    bitcode::{
        is_bitcode,
        parse_dump,
        BITCODE_MAGIC,
    },
    codec::{
        decode_literals,
        encode_literals,
        encode_positions,
        LiteralsByPath,
    },
    config::Config,
    error::StrataError,
    logger::Logger,
    object::{
        elf_section_headers,
        split_string_section,
        ArchiveMembers,
    },
    reader::{
        read_head,
        read_sections,
        slice_sections,
    },
    resolver::resolve_literals,
};

/// Recovers the string literals of object files and archive members.
///
/// Bitcode goes through `llvm-bcanalyzer`, native objects contribute the content of
/// their merged string sections. The section headers of standalone objects come from
/// `readelf`, the ones of archive members are parsed in-process so that archives
/// mixing bitcode and native members never hand a non-ELF member to `readelf`.
pub struct LiteralExtractor<S: SectionDumper, B: BitcodeDumper> {
    locator: SectionLocator<S>,
    bitcode: B,
    char_width_limit: u32,
}

impl LiteralExtractor<ReadelfWrapper, BcAnalyzerWrapper> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(ReadelfWrapper::from_paths(config.tools()), BcAnalyzerWrapper::from_paths(config.tools()), config.char_width_limit())
    }
}

impl<S: SectionDumper, B: BitcodeDumper> LiteralExtractor<S, B> {
    pub fn new(sections: S, bitcode: B, char_width_limit: u32) -> Self {
        Self {
            locator: SectionLocator::new(sections),
            bitcode,
            char_width_limit,
        }
    }

    /// Extract the literals of all targets.
    /// A target that cannot be processed is skipped with a warning, only tool failures abort.
    pub fn extract(&self, targets: &[Target], logger: &mut Logger) -> Result<LiteralsByPath, StrataError> {
        let mut ret = LiteralsByPath::new();

        for target in targets {
            logger.set_prefix(target.path().display().to_string());

            match self.extract_target(target, &mut ret, logger) {
                Ok(()) => {},
                Err(err) if err.is_per_file() => logger.warning(format!("Skipping: {err}")),
                Err(err) => {
                    logger.clear_prefix();
                    return Err(err);
                },
            }
        }

        logger.clear_prefix();
        logger.debug(format!("Extracted {} string literals from {} objects", ret.values().map(|x| x.len()).sum::<usize>(), ret.len()));
        Ok(ret)
    }

    fn parse_bitcode(&self, dump: &str) -> Result<Vec<Vec<u8>>, StrataError> {
        parse_dump(dump, self.char_width_limit).collect()
    }

    fn extract_target(&self, target: &Target, out: &mut LiteralsByPath, logger: &Logger) -> Result<(), StrataError> {
        match target {
            Target::Object(path) => self.extract_object(target, path, out),
            Target::Archive {
                path,
                members,
            } => self.extract_archive(path, members, out, logger),
        }
    }

    fn extract_object(&self, target: &Target, path: &Path, out: &mut LiteralsByPath) -> Result<(), StrataError> {
        if is_bitcode(&read_head(path, BITCODE_MAGIC.len())?) {
            let literals = self.parse_bitcode(&self.bitcode.dump_bitcode(path)?)?;
            insert_literals(out, path.display().to_string(), literals);
            return Ok(());
        }

        for (file, headers) in self.locator.locate_headers(target)? {
            let strings = self.merged_strings(path, &headers, 0)?;
            let positions = strings.iter().map(|(position, _)| *position).collect::<Vec<_>>();
            let blobs = read_sections(path, &positions)?;
            insert_literals(out, file, split_blobs(&blobs, &strings));
        }

        Ok(())
    }

    fn extract_archive(&self, path: &Path, members: &[String], out: &mut LiteralsByPath, logger: &Logger) -> Result<(), StrataError> {
        let content = std::fs::read(path).map_err(|err| StrataError::io(path, err))?;
        let archive = ArchiveMembers::parse(path, &content)?;
        let members = if members.is_empty() { archive.names().into_iter().map(|x| x.to_string()).collect() } else { members.to_vec() };

        for member in members {
            let member_path = Target::member_path(path, &member);
            let Some(data) = archive.content(&member) else {
                logger.warning(format!("{member_path} is not part of the archive"));
                continue;
            };

            let literals = if is_bitcode(data) {
                self.parse_bitcode(&self.bitcode.dump_bitcode_bytes(data)?)
            } else {
                self.extract_member(path, &content, &archive, &member_path, &member, data)
            };

            match literals {
                Ok(literals) => insert_literals(out, member_path, literals),
                Err(err) if err.is_per_file() => logger.warning(format!("Skipping {member_path}: {err}")),
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// The literals of a native archive member.
    /// Section offsets are relative to the member and get moved by the member's data offset.
    fn extract_member(&self, path: &Path, content: &[u8], archive: &ArchiveMembers<'_>, member_path: &str, member: &str, data: &[u8]) -> Result<Vec<Vec<u8>>, StrataError> {
        let headers = string_candidates(&elf_section_headers(member_path, data)?);
        let base = archive.data_offset(member).unwrap_or(0);
        let strings = self.merged_strings(path, &headers, base)?;
        let positions = strings.iter().map(|(position, _)| *position).collect::<Vec<_>>();
        let blobs = slice_sections(path, content, &positions)?;
        Ok(split_blobs(&blobs, &strings))
    }

    /// The merged string sections among `headers` that fit the char width limit,
    /// with their positions moved by `base` and their char width
    fn merged_strings(&self, path: &Path, headers: &[SectionHeader], base: u64) -> Result<Vec<(SectionPosition, usize)>, StrataError> {
        let mut ret = Vec::new();

        for header in headers {
            let width = header.entry_size().max(1);

            if !header.is_merge_strings() || width > self.char_width_limit as u64 {
                continue;
            }

            let position = header.position().shifted(base).ok_or_else(|| {
                StrataError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, format!("section {} at {:#x} + {:#x} is out of range", header.name(), header.position().file_offset, base)))
            })?;
            ret.push((position, width as usize));
        }

        Ok(ret)
    }
}

fn split_blobs(blobs: &[Vec<u8>], strings: &[(SectionPosition, usize)]) -> Vec<Vec<u8>> {
    blobs.iter().zip(strings).flat_map(|(blob, (_, width))| split_string_section(blob, *width)).collect()
}

fn insert_literals(out: &mut LiteralsByPath, path: String, literals: Vec<Vec<u8>>) {
    if !literals.is_empty() {
        out.entry(path).or_default().extend(literals);
    }
}

/// Batch entry point: extract the literals of `targets` and encode them for the executor
pub fn extract_literals(targets: &[Target], config: &Config, logger: &mut Logger) -> Result<Vec<u8>, StrataError> {
    let extractor = LiteralExtractor::from_config(config);
    encode_literals(&extractor.extract(targets, logger)?)
}

/// Batch entry point: resolve encoded literals against the string sections of the linked binary.
/// Returns one encoded position map per haystack.
pub fn resolve_string_pieces<H: AsRef<[u8]>>(encoded_literals: &[u8], haystacks: &[H]) -> Result<Vec<Vec<u8>>, StrataError> {
    let literals = decode_literals(encoded_literals)?;
    resolve_literals(&literals, haystacks).iter().map(encode_positions).collect()
}
