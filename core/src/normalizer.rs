use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"\p{P}+").expect("valid regex");
    static ref SPACES: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref WORD_RUN: Regex = Regex::new(r"(?u)[\p{L}\p{M}][\p{L}\p{M}\p{N}_']*").expect("valid regex");
    static ref TOKEN: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
    static ref NON_GREEK: Regex = Regex::new(r"[^\p{Greek}\s]+").expect("valid regex");
    static ref NON_ALNUM: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    // Unaccented, lower-case forms; tokens are compared after accent stripping.
    static ref GREEK_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "ο","η","το","του","της","τω","τη","τον","την","οι","αι","τα","των","τοις","ταις","τους","τας",
            "και","δε","τε","γαρ","μεν","ουν","αλλα","αλλ","γε","περ","δη","αρα","τοι",
            "εν","εις","ες","εκ","εξ","απο","απ","προς","επι","επ","κατα","κατ","μετα","μετ","περι",
            "υπο","υπ","δια","δι","παρα","παρ","αμφι","ανα","αντι","συν","υπερ",
            "ως","ου","ουκ","ουχ","μη","αν","ει","εαν","οτι","ουδε","μηδε","ουτε","μητε",
            "αυτος","αυτου","αυτω","αυτον","αυτη","αυτης","αυτην","αυτο","αυτων","αυτοις","αυτους",
            "ος","ην","ου","ω","ον","οις","ους","ας","τις","τι","τινα","τινος"
        ];
        words.iter().copied().collect()
    };
}

/// The text transforms a corpus language must provide.
///
/// `clean_text` is applied to a document's full text, `clean_chunk` to each
/// chunk after splitting. Nothing else in the engine normalizes text.
pub trait Normalizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn to_lower(&self, text: &str) -> String {
        text.to_lowercase()
    }

    fn remove_stop_words(&self, text: &str) -> String;

    /// Replace punctuation with spaces. Line breaks are untouched so chunk
    /// separators survive full-text cleaning.
    fn remove_punctuation(&self, text: &str) -> String {
        PUNCT.replace_all(text, " ").into_owned()
    }

    fn remove_accents(&self, text: &str) -> String;

    fn clean_chunk(&self, text: &str) -> String;

    fn clean_text(&self, text: &str) -> String {
        let txt = self.to_lower(text);
        let txt = self.remove_stop_words(&txt);
        let txt = self.remove_punctuation(&txt);
        self.remove_accents(&txt)
    }

    /// Map one query word onto the form index terms take. Empty when the word
    /// carries no term.
    fn query_term(&self, word: &str) -> String {
        self.remove_accents(&self.to_lower(word)).trim().to_string()
    }
}

/// Language-neutral cleanup: lower-casing, punctuation and whitespace only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generic;

/// Classical (polytonic) Greek.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greek;

/// English with stop words and Snowball stemming.
#[derive(Debug, Clone, Copy, Default)]
pub struct English;

static GENERIC: Generic = Generic;
static GREEK: Greek = Greek;
static ENGLISH: English = English;

impl Normalizer for Generic {
    fn name(&self) -> &'static str { "generic" }

    fn remove_stop_words(&self, text: &str) -> String { text.to_string() }

    fn remove_accents(&self, text: &str) -> String { text.to_string() }

    fn clean_chunk(&self, text: &str) -> String {
        collapse_whitespace(text)
    }
}

impl Normalizer for Greek {
    fn name(&self) -> &'static str { "greek" }

    fn remove_stop_words(&self, text: &str) -> String {
        WORD_RUN
            .replace_all(text, |caps: &regex::Captures| {
                let word = &caps[0];
                if GREEK_STOPWORDS.contains(strip_marks(word).as_str()) { " ".to_string() } else { word.to_string() }
            })
            .into_owned()
    }

    /// ἄρχω -> αρχω; breathings and iota subscripts go as well.
    fn remove_accents(&self, text: &str) -> String {
        strip_marks(text)
    }

    fn clean_chunk(&self, text: &str) -> String {
        let txt = NON_GREEK.replace_all(text, " ");
        collapse_whitespace(&txt)
    }
}

impl Normalizer for English {
    fn name(&self) -> &'static str { "english" }

    fn remove_stop_words(&self, text: &str) -> String {
        WORD_RUN
            .replace_all(text, |caps: &regex::Captures| {
                let word = &caps[0];
                if ENGLISH_STOPWORDS.contains(word) { " ".to_string() } else { word.to_string() }
            })
            .into_owned()
    }

    fn remove_accents(&self, text: &str) -> String {
        let compat: String = text.nfkc().collect();
        strip_marks(&compat)
    }

    fn clean_chunk(&self, text: &str) -> String {
        let txt = NON_ALNUM.replace_all(text, " ");
        txt.split_whitespace().map(|w| STEMMER.stem(w).into_owned()).collect::<Vec<_>>().join(" ")
    }

    /// Index terms are stemmed, so query words are too; stop words yield nothing.
    fn query_term(&self, word: &str) -> String {
        let txt = self.remove_stop_words(&self.to_lower(word));
        self.clean_chunk(&self.remove_accents(&txt)).trim().to_string()
    }
}

/// Selects one of the built-in normalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerKind {
    Generic,
    #[default]
    Greek,
    English,
}

impl NormalizerKind {
    pub fn normalizer(self) -> &'static dyn Normalizer {
        match self {
            NormalizerKind::Generic => &GENERIC,
            NormalizerKind::Greek => &GREEK,
            NormalizerKind::English => &ENGLISH,
        }
    }
}

impl fmt::Display for NormalizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.normalizer().name())
    }
}

fn strip_marks(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

fn collapse_whitespace(text: &str) -> String {
    SPACES.replace_all(text, " ").into_owned()
}

/// Split cleaned text into terms of two or more word characters.
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Turn raw query text into lookup terms for the term index: punctuation is
/// dropped, then each whitespace-separated word goes through
/// [`Normalizer::query_term`].
pub fn query_terms(normalizer: &dyn Normalizer, text: &str) -> Vec<String> {
    normalizer
        .remove_punctuation(text)
        .split_whitespace()
        .map(|t| normalizer.query_term(t))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greek_accents_are_stripped() {
        assert_eq!(Greek.remove_accents("ἄρχω"), "αρχω");
        assert_eq!(Greek.remove_accents("τῷ λόγῳ"), "τω λογω");
    }

    #[test]
    fn greek_stop_words_are_whole_tokens() {
        let out = Greek.remove_stop_words("καὶ ὁ λόγος καιρός");
        let words: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(words, vec!["λόγος", "καιρός"]);
    }

    #[test]
    fn greek_chunk_drops_latin_and_digits() {
        assert_eq!(Greek.clean_chunk("λογος 12 abc  θεος").trim(), "λογος θεος");
    }

    #[test]
    fn clean_text_keeps_line_breaks() {
        let out = Generic.clean_text("Alpha, Beta!\nAlpha.");
        assert_eq!(out.split('\n').count(), 2);
        assert!(out.starts_with("alpha"));
    }

    #[test]
    fn english_stems_and_filters() {
        let cleaned = English.clean_text("The Runners are running");
        let chunk = English.clean_chunk(&cleaned);
        let words: Vec<&str> = chunk.split_whitespace().collect();
        assert!(words.contains(&"run"));
        assert!(!words.contains(&"the"));
    }

    #[test]
    fn query_terms_are_lowered_and_unaccented() {
        let terms = query_terms(NormalizerKind::Greek.normalizer(), "Λόγος\nἈρχή ");
        assert_eq!(terms, vec!["λογος".to_string(), "αρχη".to_string()]);
    }

    #[test]
    fn query_terms_drop_punctuation() {
        let terms = query_terms(NormalizerKind::Greek.normalizer(), "μῆνιν, θεά·");
        assert_eq!(terms, vec!["μηνιν".to_string(), "θεα".to_string()]);
    }

    #[test]
    fn english_query_terms_are_stemmed() {
        let terms = query_terms(NormalizerKind::English.normalizer(), "The Running, cooking!");
        assert_eq!(terms, vec!["run".to_string(), "cook".to_string()]);
    }

    #[test]
    fn tokenize_skips_single_characters() {
        assert_eq!(tokenize("a bb ccc"), vec!["bb", "ccc"]);
    }
}
