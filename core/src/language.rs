use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

lazy_static! {
    static ref ENGLISH_STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref RUSSIAN_STEMMER: Stemmer = Stemmer::create(Algorithm::Russian);
}

/// Produces the canonical forms of a lowercase token.
///
/// Implementations are called concurrently by every indexing worker and by
/// query lookups, so they must be stateless or synchronize internally.
pub trait NormalFormProvider: Send + Sync {
    fn normal_forms(&self, token: &str) -> Vec<String>;
}

/// Snowball stemmer used as the default lemmatizer; yields exactly one form.
#[derive(Clone, Copy)]
pub struct SnowballForms {
    stemmer: &'static Stemmer,
}

impl SnowballForms {
    pub fn english() -> Self { Self { stemmer: &ENGLISH_STEMMER } }
    pub fn russian() -> Self { Self { stemmer: &RUSSIAN_STEMMER } }
}

impl NormalFormProvider for SnowballForms {
    fn normal_forms(&self, token: &str) -> Vec<String> {
        vec![self.stemmer.stem(token).into_owned()]
    }
}

/// Table-driven lemmatizer. A token may map to several lemmas; tokens missing
/// from the table are their own normal form.
#[derive(Debug, Clone, Default)]
pub struct DictionaryForms {
    lemmas: HashMap<String, Vec<String>>,
}

impl DictionaryForms {
    pub fn new() -> Self { Self::default() }

    /// Builds a table from `(token, lemma)` pairs; repeated tokens accumulate lemmas.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut dict = Self::new();
        for (token, lemma) in pairs {
            dict.add(token, lemma);
        }
        dict
    }

    pub fn add(&mut self, token: impl Into<String>, lemma: impl Into<String>) {
        let lemma = lemma.into();
        let entry = self.lemmas.entry(token.into()).or_default();
        if !entry.contains(&lemma) {
            entry.push(lemma);
        }
    }
}

impl NormalFormProvider for DictionaryForms {
    fn normal_forms(&self, token: &str) -> Vec<String> {
        match self.lemmas.get(token) {
            Some(lemmas) => lemmas.clone(),
            None => vec![token.to_string()],
        }
    }
}

/// One supported language: its alphabet and the lemmatizer behind it.
#[derive(Clone)]
pub struct LanguageProfile {
    code: String,
    alphabet: Vec<RangeInclusive<char>>,
    forms: Arc<dyn NormalFormProvider>,
}

impl LanguageProfile {
    pub fn new(
        code: impl Into<String>,
        alphabet: Vec<RangeInclusive<char>>,
        forms: Arc<dyn NormalFormProvider>,
    ) -> Self {
        Self { code: code.into(), alphabet, forms }
    }

    pub fn russian() -> Self {
        Self::new("ru", vec!['а'..='я', 'А'..='Я'], Arc::new(SnowballForms::russian()))
    }

    pub fn english() -> Self {
        Self::new("en", vec!['a'..='z', 'A'..='Z'], Arc::new(SnowballForms::english()))
    }

    pub fn by_code(code: &str) -> Option<Self> {
        match code {
            "ru" => Some(Self::russian()),
            "en" => Some(Self::english()),
            _ => None,
        }
    }

    /// Same alphabet, different lemmatizer.
    pub fn with_forms(mut self, forms: Arc<dyn NormalFormProvider>) -> Self {
        self.forms = forms;
        self
    }

    pub fn code(&self) -> &str { &self.code }

    pub fn is_letter(&self, c: char) -> bool {
        self.alphabet.iter().any(|range| range.contains(&c))
    }

    /// Normal forms of a lowercase token, or nothing if the token contains a
    /// character this language's lemmatizer cannot handle.
    pub fn normal_forms(&self, token: &str) -> Vec<String> {
        if token.is_empty() || !token.chars().all(|c| self.is_letter(c)) {
            return Vec::new();
        }
        self.forms.normal_forms(token)
    }
}

impl fmt::Debug for LanguageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageProfile")
            .field("code", &self.code)
            .field("alphabet", &self.alphabet)
            .finish_non_exhaustive()
    }
}

/// The union of the configured language profiles.
#[derive(Debug, Clone)]
pub struct Languages {
    profiles: Vec<LanguageProfile>,
}

impl Languages {
    pub fn new(profiles: Vec<LanguageProfile>) -> Self { Self { profiles } }

    pub fn profiles(&self) -> &[LanguageProfile] { &self.profiles }

    pub fn codes(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.code.clone()).collect()
    }

    pub fn is_letter(&self, c: char) -> bool {
        self.profiles.iter().any(|p| p.is_letter(c))
    }

    pub fn normal_forms(&self, token: &str) -> HashSet<String> {
        self.profiles.iter().flat_map(|p| p.normal_forms(token)).collect()
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self::new(vec![LanguageProfile::russian(), LanguageProfile::english()])
    }
}
