//! Items of a presentation script
//!
//! A script is a flat sequence of items. Header items (slides, options,
//! titles, script offset) configure the load; `script` items carry the
//! encoded presentation packets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum ScriptItem {
    /// Slide image location, overriding what slide-state packets carry
    Slides {
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        extension: Option<String>,
    },
    Options {
        #[serde(default)]
        no_auto_toc: bool,
        #[serde(default)]
        preferred_viewer_version: Option<String>,
    },
    /// Title of one presentation slide
    Title { deck: String, index: i64, text: String },
    /// Origin that absolute script times are measured from
    ScriptOffset {
        start: String,
        #[serde(default)]
        delta: Option<String>,
    },
    Script {
        #[serde(rename = "type")]
        script_type: String,
        time: ScriptTime,
        /// Base64 packet, or one piece of it
        command: String,
    },
}

/// Time attached to a script item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptTime {
    /// Seconds from the start of the media
    Seconds(f64),
    /// Absolute wall-clock time, measured from the script offset
    Stamp(String),
}

/// How a `script` item relates to its packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    /// Complete packet, or the last piece of a fragmented one
    Whole,
    /// Any piece but the last of a fragmented packet
    Fragment,
    /// Navigation packet; never fragmented
    Navigation,
}

impl ScriptType {
    /// `None` for types the viewer does not replay
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "CXP0" => Some(ScriptType::Whole),
            "CXP1" => Some(ScriptType::Fragment),
            "CXP3" => Some(ScriptType::Navigation),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScriptType::Whole => "CXP0",
            ScriptType::Fragment => "CXP1",
            ScriptType::Navigation => "CXP3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let item: ScriptItem =
            serde_json::from_str(r#"{"element":"script","type":"CXP3","time":12.5,"command":"e30="}"#).unwrap();
        assert_eq!(
            item,
            ScriptItem::Script {
                script_type: "CXP3".into(),
                time: ScriptTime::Seconds(12.5),
                command: "e30=".into(),
            }
        );

        let item: ScriptItem =
            serde_json::from_str(r#"{"element":"script","type":"CXP0","time":"3/14/2005 1:02:03 PM","command":""}"#)
                .unwrap();
        assert!(matches!(item, ScriptItem::Script { time: ScriptTime::Stamp(_), .. }));

        let item: ScriptItem = serde_json::from_str(r#"{"element":"options","no_auto_toc":true}"#).unwrap();
        assert_eq!(
            item,
            ScriptItem::Options {
                no_auto_toc: true,
                preferred_viewer_version: None,
            }
        );
    }

    #[test]
    fn test_script_types() {
        assert_eq!(ScriptType::parse("CXP1"), Some(ScriptType::Fragment));
        assert_eq!(ScriptType::parse("CXP2"), None);
        assert_eq!(ScriptType::Navigation.code(), "CXP3");
    }
}
