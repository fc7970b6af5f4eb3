use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Registration of an id that is already in the registry (or twice in one batch).
    #[error("document id already registered: {0}")]
    DuplicateDocument(String),

    /// The content file of a registered document cannot be read.
    #[error("content of document {id} not found at {}", path.display())]
    MissingDocument { id: String, path: PathBuf },

    /// Lookup miss in the term index. Recovered by the tf-idf scorer.
    #[error("term not found in term index: {0}")]
    UnknownTerm(String),

    #[error("corpus is empty: no registered documents")]
    EmptyCorpus,

    #[error("term index references unregistered document {doc_id} under term {term:?}")]
    InconsistentIndex { term: String, doc_id: String },

    /// A registered document was left without a similarity score.
    #[error("no similarity score computed for document {0}")]
    UnscoredDocument(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("failed to lock store at {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_document() {
        let err = Error::MissingDocument { id: "iliad".into(), path: PathBuf::from("data/iliad.txt") };
        let msg = err.to_string();
        assert!(msg.contains("iliad"));
        assert!(msg.contains("data/iliad.txt"));
    }

    #[test]
    fn display_inconsistent_index() {
        let err = Error::InconsistentIndex { term: "λογος".into(), doc_id: "ghost".into() };
        assert!(err.to_string().contains("ghost"));
    }
}
