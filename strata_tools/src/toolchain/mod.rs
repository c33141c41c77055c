mod bcanalyzer;
mod readelf;

use std::{
    ffi::OsStr,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
    process::{
        Command,
        Output,
        Stdio,
    },
};

use thiserror::Error;

pub use bcanalyzer::BcAnalyzerWrapper;
pub use readelf::ReadelfWrapper;

/// Everything that can go wrong when shelling out to an external tool.
/// All of these are fatal for the invocation that needed the tool's output.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Could not start {tool}: {source}")]
    SpawnFailed {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ExitStatus {
        tool: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("{0} produced output that is not valid UTF-8")]
    InvalidOutput(PathBuf),
}

/// Produces the section header table of an ELF file or of all members of a static archive
/// in the textual format of `readelf -S --wide`.
pub trait SectionDumper {
    fn dump_section_headers(&self, path: &Path) -> Result<String, ToolError>;
}

/// Produces the textual dump of an LLVM bitcode file in the format of `llvm-bcanalyzer --dump`.
pub trait BitcodeDumper {
    fn dump_bitcode(&self, path: &Path) -> Result<String, ToolError>;

    /// Dump bitcode that is not available as a standalone file, e.g. an archive member.
    fn dump_bitcode_bytes(&self, content: &[u8]) -> Result<String, ToolError>;
}

fn check_output(tool: &Path, output: Output) -> Result<String, ToolError> {
    if !output.status.success() {
        let status = if let Some(code) = output.status.code() { format!("status {code}") } else { "a signal".to_string() };

        return Err(ToolError::ExitStatus {
            tool: tool.to_path_buf(),
            status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput(tool.to_path_buf()))
}

pub(crate) fn run_tool<S: AsRef<OsStr>>(tool: &Path, args: &[S]) -> Result<String, ToolError> {
    let output = Command::new(tool).args(args).stdin(Stdio::null()).output().map_err(|source| ToolError::SpawnFailed {
        tool: tool.to_path_buf(),
        source,
    })?;

    check_output(tool, output)
}

pub(crate) fn run_tool_with_stdin<S: AsRef<OsStr>>(tool: &Path, args: &[S], content: &[u8]) -> Result<String, ToolError> {
    let spawn_failed = |source| ToolError::SpawnFailed {
        tool: tool.to_path_buf(),
        source,
    };

    let mut child = Command::new(tool).args(args).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn().map_err(spawn_failed)?;

    /* Feed stdin from a separate thread so that a full stdout pipe cannot deadlock us */
    let feeder = child.stdin.take().map(|mut stdin| {
        let content = content.to_vec();
        std::thread::spawn(move || stdin.write_all(&content))
    });

    let output = child.wait_with_output().map_err(spawn_failed)?;

    if let Some(feeder) = feeder {
        /* A tool that exits early closes the pipe, its exit status tells the real story */
        let _ = feeder.join();
    }

    check_output(tool, output)
}
