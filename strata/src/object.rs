use std::path::Path;

use goblin::{
    archive::Archive,
    elf::{
        section_header::{
            sht_to_str as sh_type_to_str,
            SHF_ALLOC,
            SHF_EXECINSTR,
            SHF_MERGE,
            SHF_STRINGS,
            SHF_WRITE,
            SHT_PROGBITS,
        },
        Elf,
    },
};
use memchr::{
    memchr,
    memchr_iter,
};
use strata_tools::{
    SectionHeader,
    SectionPosition,
};

use crate::{
    error::StrataError,
    reader::read_sections,
};

/// Name of the section family that holds string data in linked binaries
const RODATA: &str = ".rodata";

/// Section flags in the order and spelling of `readelf`
const FLAG_LETTERS: [(u64, char); 5] = [(SHF_WRITE as u64, 'W'), (SHF_ALLOC as u64, 'A'), (SHF_EXECINSTR as u64, 'X'), (SHF_MERGE as u64, 'M'), (SHF_STRINGS as u64, 'S')];

fn is_terminator(element: &[u8]) -> bool {
    element.iter().all(|x| *x == 0)
}

/// Length of the string at the start of `tail` including its terminator
fn string_len(tail: &[u8], char_width: usize) -> usize {
    if char_width == 1 {
        return memchr(0, tail).map(|x| x + 1).unwrap_or(tail.len());
    }

    tail.chunks(char_width).position(is_terminator).map(|x| (x + 1) * char_width).unwrap_or(tail.len()).min(tail.len())
}

/// Offsets of all non-empty strings in `blob`
fn string_starts(blob: &[u8], char_width: usize) -> Vec<u64> {
    let mut ret = Vec::new();

    if char_width == 1 {
        let mut prev_end = 0;

        for null_pos in memchr_iter(0, blob) {
            if null_pos > prev_end {
                ret.push(prev_end as u64);
            }
            prev_end = null_pos + 1;
        }

        if prev_end < blob.len() {
            ret.push(prev_end as u64);
        }

        return ret;
    }

    let mut at_start = true;

    for (idx, element) in blob.chunks(char_width).enumerate() {
        let terminator = is_terminator(element);

        if at_start && !terminator {
            ret.push((idx * char_width) as u64);
        }

        at_start = terminator;
    }

    ret
}

/// Read one NUL-terminated string of `char_width`-byte characters at every address.
/// The terminator is part of the literal. Addresses outside of `blob` are skipped,
/// a string running into the end of `blob` ends there.
pub fn literals_at(blob: &[u8], addresses: &[u64], char_width: usize) -> Vec<Vec<u8>> {
    let char_width = char_width.max(1);
    let mut ret = Vec::with_capacity(addresses.len());

    for address in addresses {
        let Some(start) = usize::try_from(*address).ok().filter(|x| *x < blob.len()) else {
            continue;
        };

        let tail = &blob[start..];
        ret.push(tail[..string_len(tail, char_width)].to_vec());
    }

    ret
}

/// Split a merged string section into its literals.
/// Empty strings (a lone terminator) are alignment padding and left out.
pub fn split_string_section(blob: &[u8], char_width: usize) -> Vec<Vec<u8>> {
    let char_width = char_width.max(1);
    literals_at(blob, &string_starts(blob, char_width), char_width)
}

/// A string-bearing section of a linked binary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringSection {
    pub name: String,
    pub address: u64,
    pub position: SectionPosition,
}

/// The sections of a linked binary that the linker may have merged string literals into
pub fn string_sections(content: &[u8]) -> Result<Vec<StringSection>, StrataError> {
    let elf = Elf::parse(content).map_err(|err| StrataError::InvalidElf("linked binary".to_string(), err.to_string()))?;
    let mut ret = Vec::new();

    for header in &elf.section_headers {
        if header.sh_type != SHT_PROGBITS {
            continue;
        }

        let Some(name) = elf.shdr_strtab.get_at(header.sh_name) else {
            continue;
        };

        if name == RODATA || name.starts_with(".rodata.") {
            ret.push(StringSection {
                name: name.to_string(),
                address: header.sh_addr,
                position: SectionPosition::new(header.sh_offset, header.sh_size),
            });
        }
    }

    Ok(ret)
}

/// Find the string sections of the linked binary at `path` and read their content
pub fn read_haystacks<P: AsRef<Path>>(path: P) -> Result<(Vec<StringSection>, Vec<Vec<u8>>), StrataError> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|err| StrataError::io(path, err))?;
    let sections = string_sections(&content).map_err(|err| match err {
        StrataError::InvalidElf(_, msg) => StrataError::InvalidElf(path.display().to_string(), msg),
        err => err,
    })?;
    let positions = sections.iter().map(|x| x.position).collect::<Vec<_>>();
    let haystacks = read_sections(path, &positions)?;
    Ok((sections, haystacks))
}

/// The section header table of an ELF object held in memory, in the shape `readelf` reports it.
/// `name` only shows up in error messages.
pub fn elf_section_headers(name: &str, content: &[u8]) -> Result<Vec<SectionHeader>, StrataError> {
    let invalid = |msg: String| StrataError::InvalidElf(name.to_string(), msg);
    let elf = Elf::parse(content).map_err(|err| invalid(err.to_string()))?;
    let mut ret = Vec::with_capacity(elf.section_headers.len());

    for header in elf.section_headers.iter().skip(1) {
        let section_name = elf.shdr_strtab.get_at(header.sh_name).unwrap_or_default();
        let kind = sh_type_to_str(header.sh_type);
        let flags = FLAG_LETTERS.iter().filter(|(bit, _)| header.sh_flags & bit != 0).map(|(_, letter)| letter).collect::<String>();
        let built = SectionHeader::builder()
            .name(section_name)
            .kind(kind.strip_prefix("SHT_").unwrap_or(kind))
            .address(header.sh_addr)
            .position(SectionPosition::new(header.sh_offset, header.sh_size))
            .entry_size(header.sh_entsize)
            .flags(flags)
            .alignment(header.sh_addralign)
            .build()
            .map_err(|err| invalid(err.to_string()))?;
        ret.push(built);
    }

    Ok(ret)
}

/// The members of a static archive
pub struct ArchiveMembers<'a> {
    content: &'a [u8],
    archive: Archive<'a>,
}

impl<'a> ArchiveMembers<'a> {
    pub fn parse(path: &Path, content: &'a [u8]) -> Result<Self, StrataError> {
        let archive = Archive::parse(content).map_err(|err| StrataError::InvalidElf(path.display().to_string(), err.to_string()))?;

        Ok(Self {
            content,
            archive,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.archive.members()
    }

    /// The offset of a member's content from the start of the archive
    pub fn data_offset(&self, member: &str) -> Option<u64> {
        self.archive.get(member).map(|x| x.offset)
    }

    pub fn content(&self, member: &str) -> Option<&'a [u8]> {
        self.archive.extract(member, self.content).ok()
    }
}
