use std::{
    ffi::OsStr,
    path::{
        Path,
        PathBuf,
    },
};

use crate::{
    env::ToolPaths,
    toolchain::{
        run_tool,
        SectionDumper,
        ToolError,
    },
};

#[derive(Debug, Clone)]
pub struct ReadelfWrapper {
    readelf: PathBuf,
}

impl ReadelfWrapper {
    pub fn new<P: Into<PathBuf>>(readelf: P) -> Self {
        Self {
            readelf: readelf.into(),
        }
    }

    pub fn from_paths(paths: &ToolPaths) -> Self {
        Self::new(paths.readelf())
    }

    fn args(target: &Path) -> Vec<&OsStr> {
        vec![OsStr::new("-S"), OsStr::new("--wide"), target.as_os_str()]
    }
}

impl SectionDumper for ReadelfWrapper {
    fn dump_section_headers(&self, path: &Path) -> Result<String, ToolError> {
        run_tool(&self.readelf, &Self::args(path))
    }
}
