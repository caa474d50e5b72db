use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::FileRecord;

/// Discrete match category, declared best first
///
/// The derived ordering is used to rank candidates before their numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Prefix,
    Substring,
    FuzzyHigh,
    FuzzyMedium,
    FuzzyLow,
    Recent,
    Frequent,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Substring => "substring",
            Self::FuzzyHigh => "fuzzy_high",
            Self::FuzzyMedium => "fuzzy_medium",
            Self::FuzzyLow => "fuzzy_low",
            Self::Recent => "recent",
            Self::Frequent => "frequent",
        }
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(self, Self::FuzzyHigh | Self::FuzzyMedium | Self::FuzzyLow)
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked hit returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: PathBuf,
    pub name: String,
    pub size: Option<u64>,
    pub file_type: Option<String>,
    pub is_directory: bool,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub score: f64,
    pub match_tier: MatchTier,
}

impl SearchResult {
    pub fn from_record(record: FileRecord, score: f64, match_tier: MatchTier) -> Self {
        Self {
            path: record.path,
            name: record.name,
            size: record.size,
            file_type: record.file_type,
            is_directory: record.is_directory,
            access_count: record.access_count,
            last_accessed: record.last_accessed,
            modified_time: record.modified_time,
            score,
            match_tier,
        }
    }
}
