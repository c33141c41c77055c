use std::path::{
    Path,
    PathBuf,
};

pub const STRATA_TOOL_PREFIX: &str = "STRATA_TOOL_PREFIX";
pub const STRATA_READELF: &str = "STRATA_READELF";
pub const STRATA_BCANALYZER: &str = "STRATA_BCANALYZER";
pub const STRATA_CHAR_WIDTH_LIMIT: &str = "STRATA_CHAR_WIDTH_LIMIT";

pub const READELF_NAME: &str = "readelf";
pub const BCANALYZER_NAME: &str = "llvm-bcanalyzer";

pub fn env_value(key: &str, default: &str) -> String {
    if let Ok(value) = std::env::var(key) {
        value
    } else {
        default.to_string()
    }
}

/// Locations of the external binaries that the section locator and the
/// bitcode parser shell out to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    readelf: PathBuf,
    bcanalyzer: PathBuf,
}

impl ToolPaths {
    /// Derive tool locations from a toolchain prefix like `/opt/llvm/bin/llvm-`.
    ///
    /// `readelf` is `<prefix>readelf`, `llvm-bcanalyzer` lives in the same directory
    /// as the prefix (or is looked up in `PATH` if the prefix has no directory part).
    pub fn from_prefix(prefix: &str) -> Self {
        let readelf = PathBuf::from(format!("{prefix}{READELF_NAME}"));
        let bcanalyzer = if prefix.ends_with('/') {
            Path::new(prefix).join(BCANALYZER_NAME)
        } else {
            match Path::new(prefix).parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join(BCANALYZER_NAME),
                _ => PathBuf::from(BCANALYZER_NAME),
            }
        };

        Self {
            readelf,
            bcanalyzer,
        }
    }

    /// Tool locations from `STRATA_TOOL_PREFIX`, with `STRATA_READELF` and
    /// `STRATA_BCANALYZER` taking precedence for the individual binaries.
    pub fn from_env() -> Self {
        let mut paths = Self::from_prefix(&env_value(STRATA_TOOL_PREFIX, ""));

        if let Ok(readelf) = std::env::var(STRATA_READELF) {
            paths.readelf = PathBuf::from(readelf);
        }

        if let Ok(bcanalyzer) = std::env::var(STRATA_BCANALYZER) {
            paths.bcanalyzer = PathBuf::from(bcanalyzer);
        }

        paths
    }

    pub fn with_readelf<P: Into<PathBuf>>(mut self, readelf: P) -> Self {
        self.readelf = readelf.into();
        self
    }

    pub fn with_bcanalyzer<P: Into<PathBuf>>(mut self, bcanalyzer: P) -> Self {
        self.bcanalyzer = bcanalyzer.into();
        self
    }

    pub fn readelf(&self) -> &Path {
        &self.readelf
    }

    pub fn bcanalyzer(&self) -> &Path {
        &self.bcanalyzer
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self::from_prefix("")
    }
}
