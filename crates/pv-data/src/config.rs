//! Load configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DataError;

/// Caller-supplied settings for one load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Slide image base URL; wins over the script's own `slides` item
    pub base_url: Option<String>,

    /// Slide image extension; wins over the script's own `slides` item
    pub extension: Option<String>,

    /// Percentage step between progress notifications
    pub progress_step: u8,

    /// Never build a TOC, whatever the script's options say
    pub no_auto_toc: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            extension: None,
            progress_step: 10,
            no_auto_toc: false,
        }
    }
}

/// Dotted numeric version such as `1.9.4`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewerVersion(Vec<u32>);

impl ViewerVersion {
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for ViewerVersion {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| DataError::Source(format!("invalid version '{}'", s)))?;
        if parts.len() < 2 || parts.len() > 4 {
            return Err(DataError::Source(format!("invalid version '{}'", s)));
        }
        Ok(Self(parts))
    }
}

impl fmt::Display for ViewerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        let old: ViewerVersion = "1.9.3".parse().unwrap();
        let new: ViewerVersion = "1.9.10".parse().unwrap();
        assert!(new > old);
        assert_eq!(new.to_string(), "1.9.10");
        assert!("1".parse::<ViewerVersion>().is_err());
        assert!("1.x".parse::<ViewerVersion>().is_err());
    }

    #[test]
    fn test_options_defaults() {
        let options: LoadOptions = serde_json::from_str(r#"{"base_url":"http://host/deck/"}"#).unwrap();
        assert_eq!(options.base_url.as_deref(), Some("http://host/deck/"));
        assert_eq!(options.progress_step, 10);
    }
}
