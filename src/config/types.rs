use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Read-ahead window in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Bytes kept per unit for header parsing
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Stop after this many units
    #[serde(default)]
    pub max_units: Option<usize>,
}

fn default_buffer_size() -> usize {
    nalscope_bitstream::scanner::BUFFER_SIZE
}

fn default_max_payload_bytes() -> usize {
    nalscope_bitstream::scanner::MAX_PAYLOAD
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            max_payload_bytes: default_max_payload_bytes(),
            max_units: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Print the full syntax tree
    #[serde(default)]
    pub show_tree: bool,

    /// Print the POC sequence
    #[serde(default = "default_show_poc")]
    pub show_poc: bool,
}

fn default_show_poc() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            show_tree: false,
            show_poc: default_show_poc(),
        }
    }
}
