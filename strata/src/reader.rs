use std::{
    fs::File,
    io::{
        ErrorKind,
        Read,
    },
    path::Path,
};

use memmap2::{
    Mmap,
    MmapOptions,
};
use strata_tools::SectionPosition;

use crate::error::StrataError;

fn mmap_file(file: &File) -> std::io::Result<Mmap> {
    let map = unsafe { MmapOptions::new().map(file) }?;
    Ok(map)
}

fn slice<'a>(content: &'a [u8], position: &SectionPosition) -> std::io::Result<&'a [u8]> {
    let range = usize::try_from(position.file_offset)
        .ok()
        .zip(position.end().and_then(|x| usize::try_from(x).ok()))
        .filter(|(_, end)| *end <= content.len());

    match range {
        Some((start, end)) => Ok(&content[start..end]),
        None => Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("{} bytes at offset {:#x} exceed the file size of {:#x}", position.size, position.file_offset, content.len()),
        )),
    }
}

/// Read the bytes of every section in `positions`, in the same order.
/// Fails if the file cannot be read or a section runs past the end of the file.
pub fn read_sections<P: AsRef<Path>>(path: P, positions: &[SectionPosition]) -> Result<Vec<Vec<u8>>, StrataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| StrataError::io(path, err))?;
    let len = file.metadata().map_err(|err| StrataError::io(path, err))?.len();

    /* Empty files cannot be mapped */
    if len == 0 || positions.is_empty() {
        return slice_sections(path, &[], positions);
    }

    let content = mmap_file(&file).map_err(|err| StrataError::io(path, err))?;
    slice_sections(path, &content, positions)
}

/// Like [`read_sections`] for a file that is already in memory.
/// `path` only shows up in error messages.
pub fn slice_sections(path: &Path, content: &[u8], positions: &[SectionPosition]) -> Result<Vec<Vec<u8>>, StrataError> {
    let mut ret = Vec::with_capacity(positions.len());

    for position in positions {
        let bytes = slice(content, position).map_err(|err| StrataError::io(path, err))?;
        ret.push(bytes.to_vec());
    }

    Ok(ret)
}

/// Read at most the first `len` bytes of a file, e.g. to check its magic
pub fn read_head<P: AsRef<Path>>(path: P, len: usize) -> Result<Vec<u8>, StrataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| StrataError::io(path, err))?;
    let mut ret = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut ret).map_err(|err| StrataError::io(path, err))?;
    Ok(ret)
}
