use crate::index::{DocCounts, DocId, DocumentInfo};
use crate::normalizer::Normalizer;
use crate::{EngineConfig, Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A registered document read from disk, cleaned and counted.
#[derive(Debug, Clone)]
pub struct Document {
    pub doc_id: DocId,
    pub chunks: Vec<String>,
    pub has_chunks: bool,
    pub is_clean: bool,
    pub term_freq: BTreeMap<String, u32>,
}

/// Read a document's content file.
pub fn read_content(doc_id: &str, path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::MissingDocument { id: doc_id.to_string(), path: path.to_path_buf() },
        _ => Error::io(path, e),
    })
}

impl Document {
    pub fn from_info(doc_id: &str, info: &DocumentInfo, config: &EngineConfig, normalizer: &dyn Normalizer) -> Result<Self> {
        let text = read_content(doc_id, &config.content_path(&info.local_path))?;
        let doc = Self::from_text(doc_id, &text, info, &config.term_separator, normalizer);
        if doc.term_freq.is_empty() {
            tracing::warn!(doc_id, path = %info.local_path, "document has no terms after cleaning");
        }
        Ok(doc)
    }

    /// Clean `text` as a whole, split it into chunks, clean each chunk and
    /// count the terms separated by `term_sep`.
    pub fn from_text(doc_id: &str, text: &str, info: &DocumentInfo, term_sep: &str, normalizer: &dyn Normalizer) -> Self {
        let text = normalizer.clean_text(text);
        let raw_chunks: Vec<&str> = if info.has_chunks && !info.chunk_separator.is_empty() {
            text.split(info.chunk_separator.as_str()).collect()
        } else {
            vec![text.as_str()]
        };
        let chunks: Vec<String> = raw_chunks
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(|c| normalizer.clean_chunk(c))
            .collect();
        let term_freq = count_terms(&chunks, term_sep);
        Self { doc_id: doc_id.to_string(), chunks, has_chunks: info.has_chunks, is_clean: true, term_freq }
    }

    /// Per-term records holding only this document's count.
    pub fn to_doc_counts(&self) -> BTreeMap<String, DocCounts> {
        self.term_freq
            .iter()
            .map(|(term, count)| (term.clone(), DocCounts::from([(self.doc_id.clone(), *count)])))
            .collect()
    }
}

fn count_terms(chunks: &[String], sep: &str) -> BTreeMap<String, u32> {
    let mut terms: BTreeMap<String, u32> = BTreeMap::new();
    for chunk in chunks {
        let tokens: Box<dyn Iterator<Item = &str> + '_> =
            if sep.is_empty() { Box::new(chunk.split_whitespace()) } else { Box::new(chunk.split(sep)) };
        for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
            *terms.entry(token.to_string()).or_insert(0) += 1;
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{Generic, Greek};

    #[test]
    fn counts_are_conserved_across_chunks() {
        let info = DocumentInfo::new("doc.txt", true);
        let doc = Document::from_text("d", "alpha beta\nalpha", &info, " ", &Generic);
        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.term_freq.get("alpha"), Some(&2));
        assert_eq!(doc.term_freq.get("beta"), Some(&1));

        let whole = Document::from_text("d", "alpha beta\nalpha", &DocumentInfo::new("doc.txt", false), " ", &Generic);
        assert_eq!(whole.chunks.len(), 1);
        assert_eq!(whole.term_freq, doc.term_freq);
    }

    #[test]
    fn empty_chunks_are_discarded() {
        let info = DocumentInfo::new("doc.txt", true).with_chunk_separator("|");
        let doc = Document::from_text("d", "||μῆνιν ἄειδε||θεά|", &info, " ", &Greek);
        assert_eq!(doc.chunks.len(), 2);
        assert_eq!(doc.term_freq.get("μηνιν"), Some(&1));
        assert_eq!(doc.term_freq.get("θεα"), Some(&1));
    }

    #[test]
    fn doc_counts_hold_one_entry_per_term() {
        let info = DocumentInfo::new("doc.txt", false);
        let doc = Document::from_text("iliad", "θεὰ θεὰ μῆνιν", &info, " ", &Greek);
        let counts = doc.to_doc_counts();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["θεα"], DocCounts::from([("iliad".to_string(), 2)]));
    }

    #[test]
    fn missing_content_is_reported() {
        let config = EngineConfig::new("/nonexistent-agora-dir");
        let info = DocumentInfo::new("nope.txt", false);
        let err = Document::from_info("nope", &info, &config, &Generic).unwrap_err();
        assert!(matches!(err, Error::MissingDocument { .. }));
    }
}
