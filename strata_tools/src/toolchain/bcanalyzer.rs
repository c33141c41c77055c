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
        run_tool_with_stdin,
        BitcodeDumper,
        ToolError,
    },
};

/// Read from stdin
const STDIN: &str = "-";

#[derive(Debug, Clone)]
pub struct BcAnalyzerWrapper {
    bcanalyzer: PathBuf,
}

impl BcAnalyzerWrapper {
    pub fn new<P: Into<PathBuf>>(bcanalyzer: P) -> Self {
        Self {
            bcanalyzer: bcanalyzer.into(),
        }
    }

    pub fn from_paths(paths: &ToolPaths) -> Self {
        Self::new(paths.bcanalyzer())
    }

    fn args(input: &OsStr) -> Vec<&OsStr> {
        vec![OsStr::new("--dump"), OsStr::new("--disable-histogram"), input]
    }
}

impl BitcodeDumper for BcAnalyzerWrapper {
    fn dump_bitcode(&self, path: &Path) -> Result<String, ToolError> {
        run_tool(&self.bcanalyzer, &Self::args(path.as_os_str()))
    }

    fn dump_bitcode_bytes(&self, content: &[u8]) -> Result<String, ToolError> {
        run_tool_with_stdin(&self.bcanalyzer, &Self::args(OsStr::new(STDIN)), content)
    }
}
