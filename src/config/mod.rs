mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Smallest accepted read-ahead window
pub const MIN_BUFFER_SIZE: usize = 64;

/// Smallest accepted per-unit payload
pub const MIN_PAYLOAD_BYTES: usize = 16;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./nalscope.toml",
        "~/.config/nalscope/config.toml",
        "/etc/nalscope/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.scanner.buffer_size < MIN_BUFFER_SIZE {
        anyhow::bail!(
            "scanner.buffer_size must be at least {} bytes (got {})",
            MIN_BUFFER_SIZE,
            config.scanner.buffer_size
        );
    }

    if config.scanner.max_payload_bytes < MIN_PAYLOAD_BYTES {
        anyhow::bail!(
            "scanner.max_payload_bytes must be at least {} bytes (got {})",
            MIN_PAYLOAD_BYTES,
            config.scanner.max_payload_bytes
        );
    }

    if config.scanner.max_units == Some(0) {
        anyhow::bail!("scanner.max_units cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.scanner.buffer_size, 40960);
        assert_eq!(config.scanner.max_payload_bytes, 8192);
        assert_eq!(config.scanner.max_units, None);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(!config.output.show_tree);
        assert!(config.output.show_poc);
    }

    #[test]
    fn test_partial_sections() {
        let file = write_config(
            r#"
[scanner]
max_units = 100

[output]
format = "json"
show_poc = false
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.scanner.max_units, Some(100));
        assert_eq!(config.scanner.buffer_size, 40960);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.show_poc);
    }

    #[test]
    fn test_rejects_small_buffer() {
        let file = write_config("[scanner]\nbuffer_size = 8\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_rejects_small_payload() {
        let file = write_config("[scanner]\nmax_payload_bytes = 4\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let file = write_config("[output]\nformat = \"xml\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
