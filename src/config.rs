//! File configuration for CLI defaults.
//!
//! The file is a flat `key = value` list (a TOML subset): integers are bare,
//! strings are double-quoted, and `#` starts a comment outside strings.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Defaults read from a config file; CLI flags override every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Documents processed at once (same range as CLI).
    pub concurrency: Option<u8>,
    /// Per-document time budget in seconds.
    pub document_timeout_secs: Option<u64>,
    /// Widest numeral range expanded into individual ordinals.
    pub max_range_span: Option<u32>,
    /// JSON Lines output file.
    pub output: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against the CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=64).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=64");
        }
        if let Some(timeout) = self.document_timeout_secs
            && !(1..=600).contains(&timeout)
        {
            bail!(
                "Invalid config value for `document_timeout_secs`: {timeout}. Expected range: 1..=600"
            );
        }
        if let Some(span) = self.max_range_span
            && !(1..=10_000).contains(&span)
        {
            bail!("Invalid config value for `max_range_span`: {span}. Expected range: 1..=10000");
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Equivalent `-v` count.
    #[must_use]
    pub fn verbose_count(self) -> u8 {
        match self {
            Self::Default | Self::Quiet => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
        }
    }
}

/// Resolves the config path.
///
/// Priority:
/// 1. `explicit` (from `--config`)
/// 2. `$XDG_CONFIG_HOME/citegraph/config.toml`
/// 3. `$HOME/.config/citegraph/config.toml`
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("citegraph")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("citegraph")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// A missing default file yields an empty config; a missing `--config` file
/// is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = resolve_config_path(explicit) else {
        return Ok(FileConfig::default());
    };

    if !path.exists() {
        if explicit.is_some() {
            bail!("Config file '{}' does not exist", path.display());
        }
        return Ok(FileConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "concurrency" => {
                let parsed = parse_integer(value)
                    .and_then(|n| u8::try_from(n).context("Integer value out of range for u8"))
                    .with_context(|| format!("Invalid `concurrency` value on line {line_number}"))?;
                cfg.concurrency = Some(parsed);
            }
            "document_timeout_secs" => {
                let parsed = parse_integer(value).with_context(|| {
                    format!("Invalid `document_timeout_secs` value on line {line_number}")
                })?;
                cfg.document_timeout_secs = Some(parsed);
            }
            "max_range_span" => {
                let parsed = parse_integer(value)
                    .and_then(|n| u32::try_from(n).context("Integer value out of range for u32"))
                    .with_context(|| {
                        format!("Invalid `max_range_span` value on line {line_number}")
                    })?;
                cfg.max_range_span = Some(parsed);
            }
            "output" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output` value on line {line_number}"))?;
                cfg.output = Some(PathBuf::from(parsed));
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_number}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
concurrency = 16
document_timeout_secs = 45
max_range_span = 250
output = "graphs.jsonl"
verbosity = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(cfg.concurrency, Some(16));
        assert_eq!(cfg.document_timeout_secs, Some(45));
        assert_eq!(cfg.max_range_span, Some(250));
        assert_eq!(cfg.output, Some(PathBuf::from("graphs.jsonl")));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
concurrency = 4 # workers
output = "out#1.jsonl" # hash inside string kept
"#,
        )
        .unwrap();
        assert_eq!(cfg.concurrency, Some(4));
        assert_eq!(cfg.output, Some(PathBuf::from("out#1.jsonl")));
    }

    #[test]
    fn test_parse_config_rejects_invalid_concurrency() {
        let err = parse_config_str("concurrency = 65").unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_concurrency_too_large_for_u8() {
        let err = parse_config_str("concurrency = 300").unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_zero_timeout() {
        let err = parse_config_str("document_timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("document_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("max_range_span = 4 trailing").unwrap_err();
        assert!(err.to_string().contains("max_range_span"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_output() {
        let err = parse_config_str("output = graphs.jsonl").unwrap_err();
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("rate_limit = 123").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("rate_limit"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("concurrency 4").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_verbosity_verbose_count() {
        assert_eq!(VerbositySetting::Default.verbose_count(), 0);
        assert_eq!(VerbositySetting::Verbose.verbose_count(), 1);
        assert_eq!(VerbositySetting::Debug.verbose_count(), 2);
    }

    #[test]
    fn test_resolve_config_path_prefers_explicit() {
        let path = resolve_config_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, Some(PathBuf::from("/tmp/custom.toml")));
    }

    #[test]
    fn test_load_config_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_load_config_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("citegraph.toml");
        fs::write(&path, "concurrency = 3\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.concurrency, Some(3));
    }
}
