use std::path::Path;

use strata_tools::toolchain::{
    BitcodeDumper,
    SectionDumper,
    ToolError,
};

/// Replays `llvm-bcanalyzer` output per file name
pub struct CannedBitcode(pub Vec<(&'static str, String)>);

impl BitcodeDumper for CannedBitcode {
    fn dump_bitcode(&self, path: &Path) -> Result<String, ToolError> {
        let name = path.file_name().and_then(|x| x.to_str()).unwrap_or_default();

        for (suffix, dump) in &self.0 {
            if name.ends_with(suffix) {
                return Ok(dump.clone());
            }
        }

        Err(ToolError::InvalidOutput(path.to_path_buf()))
    }

    fn dump_bitcode_bytes(&self, _content: &[u8]) -> Result<String, ToolError> {
        Ok(self.0.first().map(|(_, dump)| dump.clone()).unwrap_or_default())
    }
}

/// Replays `readelf -S --wide` output
pub struct CannedSections(pub String);

impl SectionDumper for CannedSections {
    fn dump_section_headers(&self, _path: &Path) -> Result<String, ToolError> {
        Ok(self.0.clone())
    }
}

/// A bitcode dump whose constants block holds the given i8 strings
pub fn bitcode_dump(strings: &[&str]) -> String {
    let mut types = String::new();
    let mut constants = String::new();

    types.push_str(&format!("    <NUMENTRY op0={}/>\n    <INTEGER op0=8/>\n", strings.len() + 1));

    for (i, string) in strings.iter().enumerate() {
        types.push_str(&format!("    <ARRAY abbrevid=9 op0={} op1=0/>\n", string.len() + 1));

        let ops = string.bytes().enumerate().map(|(j, x)| format!("op{j}={x}")).collect::<Vec<_>>().join(" ");
        constants.push_str(&format!("    <SETTYPE abbrevid=4 op0={}/>\n", i + 1));
        constants.push_str(&format!("    <CSTRING abbrevid=6 {ops}/> record string = '{string}'\n"));
    }

    format!(
        "<MODULE_BLOCK NumWords=100 BlockCodeSize=3>\n  <TYPE_BLOCK_ID_NEW NumWords=10 BlockCodeSize=4>\n{types}  </TYPE_BLOCK_ID_NEW>\n  <CONSTANTS_BLOCK NumWords=10 BlockCodeSize=4>\n{constants}  </CONSTANTS_BLOCK>\n</MODULE_BLOCK>\n"
    )
}
