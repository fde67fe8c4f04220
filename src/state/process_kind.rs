use serde::{Deserialize, Serialize};
use std::fmt;

/// What a crawl job does with its frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessKind {
    /// Seed from collection pages, grow through similar-app links
    Discover,

    /// Backfill detail fields onto a previously dumped frontier
    Details,
}

impl ProcessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "DISCOVER",
            Self::Details => "DETAILS",
        }
    }

    /// Parses the `type` parameter of a start request (case-insensitive)
    pub fn from_param(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("DISCOVER") {
            Some(Self::Discover)
        } else if s.eq_ignore_ascii_case("DETAILS") {
            Some(Self::Details)
        } else {
            None
        }
    }

    /// Suffix inserted before `.json` in dump file names
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Discover => "",
            Self::Details => "_detailed",
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
