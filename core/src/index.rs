use crate::{Error, MatchPolicy, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type DocId = String;

/// Occurrences of one term, per document.
pub type DocCounts = BTreeMap<DocId, u32>;

/// Registered documents keyed by id; iteration order is id order.
pub type Registry = BTreeMap<DocId, DocumentInfo>;

fn default_chunk_separator() -> String { "\n".to_string() }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub has_chunks: bool,
    /// Path of the content file, relative to the data directory.
    pub local_path: String,
    #[serde(default = "default_chunk_separator")]
    pub chunk_separator: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl DocumentInfo {
    pub fn new(local_path: impl Into<String>, has_chunks: bool) -> Self {
        Self { has_chunks, local_path: local_path.into(), chunk_separator: default_chunk_separator(), url: None }
    }

    pub fn with_chunk_separator(mut self, sep: impl Into<String>) -> Self {
        self.chunk_separator = sep.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Global term -> {document -> count} table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermIndex {
    pub terms: BTreeMap<String, DocCounts>,
}

impl TermIndex {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn get(&self, term: &str) -> Option<&DocCounts> { self.terms.get(term) }

    /// Every document id that appears under any term.
    pub fn indexed_doc_ids(&self) -> BTreeSet<&str> {
        self.terms.values().flat_map(|counts| counts.keys().map(String::as_str)).collect()
    }

    /// Merge per-term counts in. Existing documents under the same term keep
    /// their counts; entries for the merged documents overwrite by key.
    pub fn merge(&mut self, counts: BTreeMap<String, DocCounts>) {
        for (term, doc_counts) in counts {
            match self.terms.get_mut(&term) {
                Some(existing) => existing.extend(doc_counts),
                None => {
                    self.terms.insert(term, doc_counts);
                }
            }
        }
    }

    /// Resolve a query term to an index entry under the given policy.
    pub fn lookup(&self, term: &str, policy: MatchPolicy) -> Result<(&str, &DocCounts)> {
        if let Some((key, counts)) = self.terms.get_key_value(term) {
            return Ok((key.as_str(), counts));
        }
        if policy == MatchPolicy::Substring {
            if let Some((key, counts)) = self.terms.iter().find(|(key, _)| key.contains(term)) {
                return Ok((key.as_str(), counts));
            }
        }
        Err(Error::UnknownTerm(term.to_string()))
    }

    /// Fail on the first document id that is not in the registry.
    pub fn check_against(&self, registry: &Registry) -> Result<()> {
        for (term, counts) in &self.terms {
            if let Some(doc_id) = counts.keys().find(|id| !registry.contains_key(*id)) {
                return Err(Error::InconsistentIndex { term: term.clone(), doc_id: doc_id.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u32)]) -> DocCounts {
        pairs.iter().map(|(d, c)| (d.to_string(), *c)).collect()
    }

    fn single(term: &str, doc: &str, c: u32) -> BTreeMap<String, DocCounts> {
        BTreeMap::from([(term.to_string(), counts(&[(doc, c)]))])
    }

    #[test]
    fn merge_keeps_other_documents() {
        let mut index = TermIndex::new();
        index.merge(single("λογος", "a", 3));
        index.merge(single("λογος", "b", 1));
        assert_eq!(index.get("λογος"), Some(&counts(&[("a", 3), ("b", 1)])));
        assert_eq!(index.indexed_doc_ids().len(), 2);
    }

    #[test]
    fn substring_lookup_prefers_exact_key() {
        let mut index = TermIndex::new();
        index.merge(single("αλογος", "a", 1));
        index.merge(single("λογος", "b", 2));
        let (key, _) = index.lookup("λογος", MatchPolicy::Substring).unwrap();
        assert_eq!(key, "λογος");
        let (key, _) = index.lookup("λογ", MatchPolicy::Substring).unwrap();
        assert_eq!(key, "αλογος");
        assert!(matches!(index.lookup("λογ", MatchPolicy::Exact), Err(Error::UnknownTerm(_))));
    }

    #[test]
    fn check_against_reports_dangling_ids() {
        let mut index = TermIndex::new();
        index.merge(single("θεος", "ghost", 1));
        let registry = Registry::new();
        match index.check_against(&registry) {
            Err(Error::InconsistentIndex { doc_id, .. }) => assert_eq!(doc_id, "ghost"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
