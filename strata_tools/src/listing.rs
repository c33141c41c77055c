/*
`readelf -S --wide` prints one table per input file. For archives every member gets
its own table that is preceded by a "File:" line:

File: obj/libbase.a(string_util.o)
There are 14 section headers, starting at offset 0x6f8:

Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0
  [ 5] .rodata.str1.1    PROGBITS        0000000000000000 000060 00000d 01 AMS  0   0  1
  [ 6] .rodata.cst16     PROGBITS        0000000000000000 000070 000010 10  AM  0   0 16
*/

use std::{
    collections::BTreeMap,
    path::{
        Path,
        PathBuf,
    },
};

use crate::toolchain::{
    SectionDumper,
    ToolError,
};

/// Name fragment shared by all sections that may hold string literal data
pub const CANDIDATE_SECTION: &str = ".rodata.";

const PROGBITS: &str = "PROGBITS";
const FILE_PREFIX: &str = "File:";

/// Location of a section's bytes inside a file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionPosition {
    pub file_offset: u64,
    pub size: u64,
}

impl SectionPosition {
    pub fn new(file_offset: u64, size: u64) -> Self {
        Self {
            file_offset,
            size,
        }
    }

    /// The first file offset after this section
    pub fn end(&self) -> Option<u64> {
        self.file_offset.checked_add(self.size)
    }

    /// Move this position by `base` bytes, e.g. from member-relative to archive-relative offsets.
    /// Returns `None` if the result would not be addressable.
    pub fn shifted(&self, base: u64) -> Option<Self> {
        let moved = Self::new(self.file_offset.checked_add(base)?, self.size);
        moved.end()?;
        Some(moved)
    }
}

/// One row of the section header table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionHeader {
    name: String,
    kind: String,
    address: u64,
    position: SectionPosition,
    entry_size: u64,
    flags: String,
    alignment: u64,
}

impl SectionHeader {
    /// Create a [`SectionHeaderBuilder`] for headers that do not come from `readelf`
    pub fn builder() -> SectionHeaderBuilder {
        SectionHeaderBuilder::default()
    }

    fn parse(line: &str) -> Option<Self> {
        let open = line.find('[')?;
        let close = open + line[open..].find(']')?;

        /* Skips the "[Nr]" heading */
        line[open + 1..close].trim().parse::<usize>().ok()?;

        let items = line[close + 1..].split_whitespace().collect::<Vec<_>>();

        /* The flags column may be empty, everything else is always present */
        if items.len() < 9 {
            return None;
        }

        let hex = |s: &str| u64::from_str_radix(s, 16).ok();
        let last = items.len() - 1;

        Some(Self {
            name: items[0].to_string(),
            kind: items[1].to_string(),
            address: hex(items[2])?,
            position: SectionPosition::new(hex(items[3])?, hex(items[4])?),
            entry_size: hex(items[5])?,
            flags: items[6..last - 2].concat(),
            alignment: items[last].parse().ok()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn position(&self) -> SectionPosition {
        self.position
    }

    pub fn entry_size(&self) -> u64 {
        self.entry_size
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    /// Whether the linker may merge this section's content as NUL-terminated strings
    pub fn is_merge_strings(&self) -> bool {
        self.flags.contains('S')
    }

    /// Whether this section can contain string literals
    pub fn is_candidate(&self) -> bool {
        self.name.contains(CANDIDATE_SECTION) && self.kind == PROGBITS
    }
}

#[derive(Default)]
pub struct SectionHeaderBuilder {
    name: Option<String>,
    kind: Option<String>,
    address: u64,
    position: Option<SectionPosition>,
    entry_size: u64,
    flags: String,
    alignment: u64,
}

impl SectionHeaderBuilder {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the section type as `readelf` prints it, e.g. `PROGBITS`
    pub fn kind<S: Into<String>>(mut self, kind: S) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn address(mut self, address: u64) -> Self {
        self.address = address;
        self
    }

    pub fn position(mut self, position: SectionPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn entry_size(mut self, entry_size: u64) -> Self {
        self.entry_size = entry_size;
        self
    }

    /// Set the flag letters as `readelf` prints them, e.g. `AMS`
    pub fn flags<S: Into<String>>(mut self, flags: S) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    /// Finally, create the [`SectionHeader`]
    pub fn build(self) -> Result<SectionHeader, &'static str> {
        let name = self.name.ok_or("Section name was not set")?;
        let kind = self.kind.ok_or("Section type was not set")?;
        let position = self.position.ok_or("Section position was not set")?;

        Ok(SectionHeader {
            name,
            kind,
            address: self.address,
            position,
            entry_size: self.entry_size,
            flags: self.flags,
            alignment: self.alignment,
        })
    }
}

/// The candidate string sections among `headers`.
/// Alignment-1 sections come first since they most likely hold 1-byte characters.
pub fn string_candidates(headers: &[SectionHeader]) -> Vec<SectionHeader> {
    let mut candidates = headers.iter().filter(|x| x.is_candidate()).cloned().collect::<Vec<_>>();
    candidates.sort_by_key(|x| x.alignment() != 1);
    candidates
}

/// The parsed output of `readelf -S --wide`, keyed by file (or `archive.a(member.o)`)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SectionListing {
    sections: BTreeMap<String, Vec<SectionHeader>>,
}

impl SectionListing {
    /// Parse a section listing. Rows that appear before any "File:" line belong to `default_path`.
    pub fn parse(text: &str, default_path: &str) -> Self {
        let mut sections = BTreeMap::<String, Vec<SectionHeader>>::new();
        let mut current = default_path.to_string();

        for line in text.lines() {
            let line = line.trim();

            if let Some(path) = line.strip_prefix(FILE_PREFIX) {
                current = path.trim().to_string();
            } else if let Some(header) = SectionHeader::parse(line) {
                sections.entry(current.clone()).or_default().push(header);
            }
        }

        Self {
            sections,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|x| x.as_str())
    }

    /// Keep only the files for which `predicate` returns true
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut predicate: F) {
        self.sections.retain(|path, _| predicate(path));
    }

    /// The candidate string sections of every file, see [`string_candidates`].
    /// Files without candidates are left out.
    pub fn string_sections(&self) -> BTreeMap<String, Vec<SectionHeader>> {
        let mut ret = BTreeMap::new();

        for (path, headers) in &self.sections {
            let candidates = string_candidates(headers);

            if !candidates.is_empty() {
                ret.insert(path.clone(), candidates);
            }
        }

        ret
    }

    /// Like [`SectionListing::string_sections`] but only the positions
    pub fn string_positions(&self) -> BTreeMap<String, Vec<SectionPosition>> {
        self.string_sections().into_iter().map(|(path, headers)| (path, headers.iter().map(|x| x.position()).collect())).collect()
    }
}

/// A unit of work for the section locator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Object(PathBuf),

    /// A static archive. An empty member list selects all members.
    Archive {
        path: PathBuf,
        members: Vec<String>,
    },
}

impl Target {
    pub fn path(&self) -> &Path {
        match self {
            Target::Object(path) => path,
            Target::Archive {
                path,
                ..
            } => path,
        }
    }

    /// The name under which an archive member is reported: `archive.a(member.o)`
    pub fn member_path(archive: &Path, member: &str) -> String {
        format!("{}({})", archive.display(), member)
    }

    /// Split `archive.a(member.o)` into its archive and member parts
    pub fn split_member_path(path: &str) -> Option<(&str, &str)> {
        let inner = path.strip_suffix(')')?;
        let open = inner.rfind('(')?;
        Some((&inner[..open], &inner[open + 1..]))
    }

    /// Group object paths into targets so that every archive is listed only once.
    /// Order of first appearance is kept.
    pub fn group_paths<S: AsRef<str>>(paths: &[S]) -> Vec<Target> {
        let mut ret = Vec::<Target>::new();

        for path in paths {
            let path = path.as_ref();

            if let Some((archive, member)) = Self::split_member_path(path) {
                let existing = ret.iter_mut().find_map(|x| match x {
                    Target::Archive {
                        path,
                        members,
                    } if path.as_os_str() == archive => Some(members),
                    _ => None,
                });

                if let Some(members) = existing {
                    members.push(member.to_string());
                } else {
                    ret.push(Target::Archive {
                        path: PathBuf::from(archive),
                        members: vec![member.to_string()],
                    });
                }
            } else {
                ret.push(Target::Object(PathBuf::from(path)));
            }
        }

        ret
    }
}

/// Enumerates the sections that may hold string literals in object files and archive members
pub struct SectionLocator<D: SectionDumper> {
    dumper: D,
}

impl<D: SectionDumper> SectionLocator<D> {
    pub fn new(dumper: D) -> Self {
        Self {
            dumper,
        }
    }

    /// The full section listing of a target restricted to the requested archive members
    pub fn listing(&self, target: &Target) -> Result<SectionListing, ToolError> {
        let path = target.path();
        let text = self.dumper.dump_section_headers(path)?;
        let default_path = path.display().to_string();
        let mut listing = SectionListing::parse(&text, &default_path);

        if let Target::Archive {
            members,
            ..
        } = target
        {
            if !members.is_empty() {
                let wanted = members.iter().map(|member| Target::member_path(path, member)).collect::<Vec<_>>();
                listing.retain(|file| wanted.iter().any(|x| x == file));
            }
        }

        Ok(listing)
    }

    pub fn locate_headers(&self, target: &Target) -> Result<BTreeMap<String, Vec<SectionHeader>>, ToolError> {
        Ok(self.listing(target)?.string_sections())
    }

    pub fn locate(&self, target: &Target) -> Result<BTreeMap<String, Vec<SectionPosition>>, ToolError> {
        Ok(self.listing(target)?.string_positions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT_LISTING: &str = "There are 9 section headers, starting at offset 0x2b8:

Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0
  [ 1] .text             PROGBITS        0000000000000000 000040 000023 00  AX  0   0  4
  [ 2] .rodata.str4.4    PROGBITS        0000000000000000 000064 000020 04 AMS  0   0  4
  [ 3] .rodata.str1.1    PROGBITS        0000000000000000 000084 00000d 01 AMS  0   0  1
  [ 4] .rela.rodata.foo  RELA            0000000000000000 000200 000018 18   I  7   3  8
  [ 5] .note.GNU-stack   PROGBITS        0000000000000000 000091 000000 00      0   0  1
  [ 6] .rodata.cst16     PROGBITS        0000000000000000 0000a0 000010 10  AM  0   0 16
Key to Flags:
  W (write), A (alloc), X (execute), M (merge), S (strings), I (info),
";

    const ARCHIVE_LISTING: &str = "
File: obj/libbase.a(a.o)
There are 3 section headers, starting at offset 0x100:

Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0
  [ 1] .rodata.str1.1    PROGBITS        0000000000000000 000040 000008 01 AMS  0   0  1

File: obj/libbase.a(b.o)
There are 3 section headers, starting at offset 0x100:

Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0
  [ 1] .text             PROGBITS        0000000000000000 000040 000010 00  AX  0   0  4

File: obj/libbase.a(c.o)
There are 3 section headers, starting at offset 0x100:

Section Headers:
  [Nr] Name              Type            Address          Off    Size   ES Flg Lk Inf Al
  [ 1] .rodata.str2.2    PROGBITS        0000000000000000 000050 000006 02 AMS  0   0  2
";

    struct CannedDumper(&'static str);

    impl SectionDumper for CannedDumper {
        fn dump_section_headers(&self, _path: &Path) -> Result<String, ToolError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_row() {
        let header = SectionHeader::parse("[ 3] .rodata.str1.1    PROGBITS        0000000000000000 000084 00000d 01 AMS  0   0  1").unwrap();
        assert_eq!(header.name(), ".rodata.str1.1");
        assert_eq!(header.kind(), "PROGBITS");
        assert_eq!(header.position(), SectionPosition::new(0x84, 0xd));
        assert_eq!(header.entry_size(), 1);
        assert_eq!(header.flags(), "AMS");
        assert_eq!(header.alignment(), 1);
        assert!(header.is_merge_strings());
        assert!(header.is_candidate());

        let header = SectionHeader::parse("[ 5] .note.GNU-stack   PROGBITS        0000000000000000 000091 000000 00      0   0  1").unwrap();
        assert_eq!(header.flags(), "");
        assert!(!header.is_candidate());

        assert!(SectionHeader::parse("[Nr] Name Type Address Off Size ES Flg Lk Inf Al").is_none());
        assert!(SectionHeader::parse("[ 0]                   NULL            0000000000000000 000000 000000 00      0   0  0").is_none());
        assert!(SectionHeader::parse("Key to Flags:").is_none());
    }

    #[test]
    fn test_str1_first() {
        let listing = SectionListing::parse(OBJECT_LISTING, "obj/foo.o");
        let positions = listing.string_positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions["obj/foo.o"], vec![SectionPosition::new(0x84, 0xd), SectionPosition::new(0x64, 0x20), SectionPosition::new(0xa0, 0x10)]);
    }

    #[test]
    fn test_archive_members() {
        let listing = SectionListing::parse(ARCHIVE_LISTING, "obj/libbase.a");
        assert_eq!(listing.paths().collect::<Vec<_>>(), vec!["obj/libbase.a(a.o)", "obj/libbase.a(b.o)", "obj/libbase.a(c.o)"]);

        /* b.o has no string sections and thus no entry */
        let positions = listing.string_positions();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions["obj/libbase.a(a.o)"], vec![SectionPosition::new(0x40, 8)]);
        assert_eq!(positions["obj/libbase.a(c.o)"], vec![SectionPosition::new(0x50, 6)]);
    }

    #[test]
    fn test_locator_filters_members() {
        let locator = SectionLocator::new(CannedDumper(ARCHIVE_LISTING));
        let target = Target::Archive {
            path: PathBuf::from("obj/libbase.a"),
            members: vec!["c.o".to_string(), "b.o".to_string()],
        };
        let positions = locator.locate(&target).unwrap();
        assert_eq!(positions.keys().collect::<Vec<_>>(), vec!["obj/libbase.a(c.o)"]);

        let target = Target::Archive {
            path: PathBuf::from("obj/libbase.a"),
            members: Vec::new(),
        };
        assert_eq!(locator.locate(&target).unwrap().len(), 2);
    }

    #[test]
    fn test_locator_no_candidates() {
        let locator = SectionLocator::new(CannedDumper("garbage\n\n[ 1] .text PROGBITS 0 40 10 00 AX 0 0 4\n"));
        let positions = locator.locate(&Target::Object(PathBuf::from("obj/empty.o"))).unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_builder() {
        let header = SectionHeader::builder().name(".rodata.str2.2").kind("PROGBITS").position(SectionPosition::new(0x40, 6)).entry_size(2).flags("AMS").alignment(2).build().unwrap();
        assert!(header.is_candidate());
        assert!(header.is_merge_strings());
        assert_eq!(header.address(), 0);

        assert!(SectionHeader::builder().name(".rodata").kind("PROGBITS").build().is_err());
        assert!(SectionHeader::builder().kind("PROGBITS").position(SectionPosition::new(0, 0)).build().is_err());
    }

    #[test]
    fn test_candidates_order() {
        let header = |name: &str, kind: &str, alignment| SectionHeader::builder().name(name).kind(kind).position(SectionPosition::new(0, 1)).alignment(alignment).build().unwrap();
        let headers = [header(".rodata.str4.4", "PROGBITS", 4), header(".text", "PROGBITS", 1), header(".rodata.str1.1", "PROGBITS", 1), header(".rela.rodata.x", "RELA", 1)];
        let names = string_candidates(&headers).iter().map(|x| x.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec![".rodata.str1.1", ".rodata.str4.4"]);
    }

    #[test]
    fn test_shifted() {
        let position = SectionPosition::new(0x40, 8);
        assert_eq!(position.shifted(100), Some(SectionPosition::new(0xa4, 8)));
        assert_eq!(position.shifted(u64::MAX), None);
        assert_eq!(SectionPosition::new(0, 8).shifted(u64::MAX - 4), None);
    }

    #[test]
    fn test_group_paths() {
        let targets = Target::group_paths(&["obj/a.o", "obj/libx.a(b.o)", "obj/c.o", "obj/libx.a(d.o)"]);
        assert_eq!(
            targets,
            vec![
                Target::Object(PathBuf::from("obj/a.o")),
                Target::Archive {
                    path: PathBuf::from("obj/libx.a"),
                    members: vec!["b.o".to_string(), "d.o".to_string()],
                },
                Target::Object(PathBuf::from("obj/c.o")),
            ]
        );
        assert_eq!(Target::split_member_path("x/y.a(z.o)"), Some(("x/y.a", "z.o")));
        assert_eq!(Target::split_member_path("x/y.o"), None);
    }
}
