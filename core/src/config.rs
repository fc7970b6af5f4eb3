use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a query term is matched against the keys of the term index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// An exact key wins; otherwise the first index term (in ascending order)
    /// that contains the query term as a substring.
    #[default]
    Substring,
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory that registered `local_path`s are relative to.
    pub data_dir: PathBuf,
    /// Separator between terms inside a cleaned chunk.
    pub term_separator: String,
    pub match_policy: MatchPolicy,
}

impl EngineConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self { data_dir: data_dir.as_ref().to_path_buf(), ..Self::default() }
    }

    pub fn with_term_separator(mut self, sep: impl Into<String>) -> Self {
        self.term_separator = sep.into();
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Absolute location of a registered document's content.
    pub fn content_path(&self, local_path: &str) -> PathBuf {
        self.data_dir.join(local_path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), term_separator: " ".into(), match_policy: MatchPolicy::Substring }
    }
}
