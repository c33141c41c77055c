use strata_tools::env::{
    env_value,
    ToolPaths,
    STRATA_CHAR_WIDTH_LIMIT,
};

use crate::error::StrataError;

/// Widest character (in bytes) that is still considered part of a string by default.
/// Wider integer arrays are much more likely to be tables of numbers than text.
pub const DEFAULT_CHAR_WIDTH_LIMIT: u32 = 2;

const MAX_CHAR_WIDTH: u32 = 4;

/// Settings shared by all stages of one strata invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    char_width_limit: u32,
    tools: ToolPaths,
}

impl Config {
    /// Maximum element byte-width of an integer array that is treated as a string
    pub fn char_width_limit(&self) -> u32 {
        self.char_width_limit
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Create a [`ConfigBuilder`] with the default settings
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            char_width_limit: None,
            tools: None,
        }
    }

    /// Read tool locations and the char width limit from the environment
    pub fn from_env() -> Result<Self, StrataError> {
        let limit = env_value(STRATA_CHAR_WIDTH_LIMIT, &DEFAULT_CHAR_WIDTH_LIMIT.to_string());
        let limit = limit.trim().parse::<u32>().map_err(|_| StrataError::InvalidConfig(format!("{STRATA_CHAR_WIDTH_LIMIT}={limit} is not a number")))?;

        Self::builder().char_width_limit(limit).tools(ToolPaths::from_env()).build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            char_width_limit: DEFAULT_CHAR_WIDTH_LIMIT,
            tools: ToolPaths::default(),
        }
    }
}

pub struct ConfigBuilder {
    char_width_limit: Option<u32>,
    tools: Option<ToolPaths>,
}

impl ConfigBuilder {
    pub fn char_width_limit(mut self, limit: u32) -> Self {
        self.char_width_limit = Some(limit);
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn build(self) -> Result<Config, StrataError> {
        let char_width_limit = self.char_width_limit.unwrap_or(DEFAULT_CHAR_WIDTH_LIMIT);

        if char_width_limit == 0 || char_width_limit > MAX_CHAR_WIDTH {
            return Err(StrataError::InvalidConfig(format!("char width limit must be between 1 and {MAX_CHAR_WIDTH}, got {char_width_limit}")));
        }

        Ok(Config {
            char_width_limit,
            tools: self.tools.unwrap_or_default(),
        })
    }
}
