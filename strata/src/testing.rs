//! Helpers for tests that need real files: temporary files, minimal ELF objects and archives.
//!
//! Only compiled for tests or with the `testing` feature.

use std::path::PathBuf;

const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;
const SHF_ALLOC: u64 = 0x2;
const SHF_MERGE: u64 = 0x10;
const SHF_STRINGS: u64 = 0x20;

/// A file in the temp directory that is removed again when dropped
pub struct TempFile(pub PathBuf);

impl TempFile {
    pub fn new(name: &str, content: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("strata-{}-{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

struct RawSection<'a> {
    name: &'a str,
    kind: u32,
    address: u64,
    flags: u64,
    entry_size: u64,
    content: &'a [u8],
}

fn build(sections: &[RawSection<'_>]) -> Vec<u8> {
    let mut shstrtab = vec![0u8];
    let mut names = Vec::with_capacity(sections.len() + 1);

    for name in sections.iter().map(|x| x.name).chain(std::iter::once(".shstrtab")) {
        names.push(shstrtab.len() as u32);
        shstrtab.extend_from_slice(name.as_bytes());
        shstrtab.push(0);
    }

    let strtab = RawSection {
        name: ".shstrtab",
        kind: SHT_STRTAB,
        address: 0,
        flags: 0,
        entry_size: 0,
        content: &shstrtab,
    };

    /* Section content starts right after the file header */
    let mut out = vec![0u8; 64];
    let mut headers = vec![[0u8; 64]];

    for (section, name) in sections.iter().chain(std::iter::once(&strtab)).zip(&names) {
        let mut header = [0u8; 64];
        header[0..4].copy_from_slice(&name.to_le_bytes());
        header[4..8].copy_from_slice(&section.kind.to_le_bytes());
        header[8..16].copy_from_slice(&section.flags.to_le_bytes());
        header[16..24].copy_from_slice(&section.address.to_le_bytes());
        header[24..32].copy_from_slice(&(out.len() as u64).to_le_bytes());
        header[32..40].copy_from_slice(&(section.content.len() as u64).to_le_bytes());
        header[48..56].copy_from_slice(&section.entry_size.max(1).to_le_bytes());
        header[56..64].copy_from_slice(&section.entry_size.to_le_bytes());
        headers.push(header);
        out.extend_from_slice(section.content);
    }

    while out.len() % 8 != 0 {
        out.push(0);
    }

    let shoff = out.len() as u64;
    for header in &headers {
        out.extend_from_slice(header);
    }

    out[0..4].copy_from_slice(b"\x7fELF");
    out[4] = 2;
    out[5] = 1;
    out[6] = 1;
    out[16..18].copy_from_slice(&2u16.to_le_bytes());
    out[18..20].copy_from_slice(&62u16.to_le_bytes());
    out[20..24].copy_from_slice(&1u32.to_le_bytes());
    out[40..48].copy_from_slice(&shoff.to_le_bytes());
    out[52..54].copy_from_slice(&64u16.to_le_bytes());
    out[54..56].copy_from_slice(&56u16.to_le_bytes());
    out[58..60].copy_from_slice(&64u16.to_le_bytes());
    out[60..62].copy_from_slice(&(headers.len() as u16).to_le_bytes());
    out[62..64].copy_from_slice(&((headers.len() - 1) as u16).to_le_bytes());
    out
}

/// A little-endian ELF64 file that only has sections: (name, type, address, content).
/// The content of the first section starts at file offset 64.
pub fn build_elf(sections: &[(&str, u32, u64, &[u8])]) -> Vec<u8> {
    let sections = sections
        .iter()
        .map(|(name, kind, address, content)| RawSection {
            name: *name,
            kind: *kind,
            address: *address,
            flags: 0,
            entry_size: 0,
            content: *content,
        })
        .collect::<Vec<_>>();
    build(&sections)
}

/// A relocatable object with merged string sections: (name, char width, content).
/// The content of the first section starts at file offset 64.
pub fn build_object(strings: &[(&str, u64, &[u8])]) -> Vec<u8> {
    let sections = strings
        .iter()
        .map(|(name, width, content)| RawSection {
            name: *name,
            kind: SHT_PROGBITS,
            address: 0,
            flags: SHF_ALLOC | SHF_MERGE | SHF_STRINGS,
            entry_size: *width,
            content: *content,
        })
        .collect::<Vec<_>>();
    build(&sections)
}

/// A GNU archive without symbol table
pub fn build_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"!<arch>\n".to_vec();

    for (name, content) in members {
        let header = format!("{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n", format!("{name}/"), 0, 0, 0, 644, content.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(content);

        if out.len() % 2 != 0 {
            out.push(b'\n');
        }
    }

    out
}
