use search_core::language::{LanguageProfile, Languages};
use search_core::tokenizer::tokenize;

#[test]
fn it_splits_on_non_letters() {
    let langs = Languages::default();
    let toks = tokenize("Hello,world! Привет-мир 42 times", &langs);
    let words: Vec<String> = toks.iter().map(|(w, _)| w.clone()).collect();
    assert_eq!(words, vec!["Hello", "world", "Привет", "мир", "times"]);
    let positions: Vec<u32> = toks.iter().map(|(_, p)| *p).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
}

#[test]
fn it_respects_configured_alphabets() {
    let english_only = Languages::new(vec![LanguageProfile::english()]);
    let toks = tokenize("cat кот dog", &english_only);
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["cat", "dog"]);
}

#[test]
fn it_joins_decomposed_cyrillic() {
    let langs = Languages::default();
    // "й" written as "и" followed by a combining breve
    let toks = tokenize("мои\u{306} дом", &langs);
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["мой", "дом"]);
}

#[test]
fn it_handles_empty_text() {
    assert!(tokenize("", &Languages::default()).is_empty());
    assert!(tokenize(" .,;!? 123", &Languages::default()).is_empty());
}
