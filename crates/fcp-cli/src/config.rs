use anyhow::{bail, Context, Result};
use fcp_lib::{plot::PlotMode, Field};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Plot defaults read from a TOML file; command-line flags take precedence.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlotConfig {
    #[serde(default)]
    pub mode: Option<PlotMode>,
    #[serde(default)]
    pub x: Option<Field>,
    #[serde(default)]
    pub y: Option<Field>,
    #[serde(default)]
    pub cycles: Option<String>,
    #[serde(default)]
    pub active_mass: Option<f64>,
    #[serde(default)]
    pub colormap: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    #[serde(default)]
    pub auto_detect: Option<bool>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub decimal_comma: Option<bool>,
}

pub fn read_config(path: &Path) -> Result<PlotConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: PlotConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Accept `tab`, `\t`, `semicolon`, `comma` or a single ASCII character.
pub fn parse_delimiter(text: &str) -> Result<u8> {
    match text {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "semicolon" => Ok(b';'),
        "comma" => Ok(b','),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => bail!("delimiter must be a single ASCII character, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mode = \"multi\"\nx = \"capacity\"\nactive_mass = 0.012\ncolormap = \"plasma\"\n\n[load]\nauto_detect = true\ndelimiter = \"semicolon\""
        )
        .unwrap();
        let config = read_config(file.path()).unwrap();
        assert_eq!(config.mode, Some(PlotMode::Multi));
        assert_eq!(config.x, Some(Field::Capacity));
        assert_eq!(config.y, None);
        assert_eq!(config.active_mass, Some(0.012));
        assert_eq!(config.load.auto_detect, Some(true));
        assert_eq!(parse_delimiter(config.load.delimiter.as_deref().unwrap()).unwrap(), b';');
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colour = \"red\"").unwrap();
        assert!(read_config(file.path()).is_err());
    }

    #[test]
    fn delimiter_names() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert!(parse_delimiter("||").is_err());
    }
}
