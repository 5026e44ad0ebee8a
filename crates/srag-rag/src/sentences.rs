//! Sentence splitting shared by the relevance trimmer and the extractive responder

use regex::Regex;

use srag_core::{Error, Result};

/// Words that end in a period without ending the sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "fig", "approx",
];

/// Splits text at terminal punctuation followed by whitespace or the end of
/// the text, and at blank lines. Decimals, versions and abbreviations stay
/// inside their sentence.
pub struct SentenceSplitter {
    boundary: Regex,
}

impl SentenceSplitter {
    pub fn new() -> Result<Self> {
        let boundary = Regex::new(r"[.!?]+(?:\s+|$)|\n\s*\n")
            .map_err(|e| Error::Configuration(format!("invalid sentence pattern: {}", e)))?;
        Ok(Self { boundary })
    }

    /// Sentences of `text`, each with its whitespace collapsed
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.boundary.find_iter(text) {
            if !Self::ends_sentence(text, boundary.start(), boundary.end()) {
                continue;
            }
            push_sentence(&mut sentences, &text[start..boundary.end()]);
            start = boundary.end();
        }
        push_sentence(&mut sentences, &text[start..]);

        sentences
    }

    fn ends_sentence(text: &str, start: usize, end: usize) -> bool {
        let punctuation = &text[start..end];
        if !punctuation.starts_with(['.', '!', '?']) {
            return true;
        }

        // "e.g. the", "approx. ten"
        if text[end..].chars().next().is_some_and(char::is_lowercase) {
            return false;
        }

        if punctuation.starts_with('.') {
            let word = text[..start]
                .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"')
                .next()
                .unwrap_or_default()
                .to_lowercase();
            if ABBREVIATIONS.contains(&word.as_str()) {
                return false;
            }
        }

        true
    }
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}
