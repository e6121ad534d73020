use crate::index::Position;
use crate::language::Languages;
use unicode_normalization::UnicodeNormalization;

/// Splits text into maximal runs of alphabet letters, numbering words
/// sequentially. The counter survives across calls, so feeding a document
/// line by line numbers its words continuously.
pub struct Tokenizer<'a> {
    languages: &'a Languages,
    next_position: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(languages: &'a Languages) -> Self {
        Self { languages, next_position: 0 }
    }

    /// Position the next emitted word will get.
    pub fn position(&self) -> Position { self.next_position }

    pub fn tokenize(&mut self, text: &str) -> Vec<(String, Position)> {
        let mut tokens = Vec::new();
        let mut word = String::new();
        for c in text.nfc() {
            if self.languages.is_letter(c) {
                word.push(c);
            } else if !word.is_empty() {
                tokens.push((std::mem::take(&mut word), self.next_position));
                self.next_position += 1;
            }
        }
        if !word.is_empty() {
            tokens.push((word, self.next_position));
            self.next_position += 1;
        }
        tokens
    }
}

/// Tokenize a standalone piece of text into (word, position), positions starting at 0.
pub fn tokenize(text: &str, languages: &Languages) -> Vec<(String, Position)> {
    Tokenizer::new(languages).tokenize(text)
}
