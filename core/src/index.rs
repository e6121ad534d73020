use crate::language::Languages;
use dashmap::DashMap;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Word offset within a document.
pub type Position = u32;

/// Anything usable as a document label: a path string, a numeric id, ...
pub trait DocumentId: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> DocumentId for T {}

/// Per-worker memo of `lowercase token -> normal forms`.
///
/// Owned by exactly one worker, so it needs no synchronization. It is never
/// evicted: it lives as long as the worker.
#[derive(Debug, Default)]
pub struct FormCache {
    forms: HashMap<String, Arc<[String]>>,
    hits: u64,
    misses: u64,
}

impl FormCache {
    pub fn new() -> Self { Self::default() }

    pub fn forms(&mut self, languages: &Languages, token: &str) -> Arc<[String]> {
        if let Some(forms) = self.forms.get(token) {
            self.hits += 1;
            return Arc::clone(forms);
        }
        self.misses += 1;
        let forms: Arc<[String]> = languages.normal_forms(token).into_iter().collect();
        self.forms.insert(token.to_string(), Arc::clone(&forms));
        forms
    }

    pub fn hits(&self) -> u64 { self.hits }
    pub fn misses(&self) -> u64 { self.misses }
    pub fn len(&self) -> usize { self.forms.len() }
    pub fn is_empty(&self) -> bool { self.forms.is_empty() }
}

/// Normal form -> document -> positions, in document scan order.
///
/// A form is present only while at least one document has a non-empty
/// position list for it. Insertion is safe from any number of threads;
/// lookups never block each other.
pub struct InvertedIndex<D> {
    languages: Languages,
    pub(crate) postings: DashMap<String, DashMap<D, Vec<Position>>>,
}

impl<D: DocumentId> InvertedIndex<D> {
    pub fn new(languages: Languages) -> Self {
        Self { languages, postings: DashMap::new() }
    }

    pub fn languages(&self) -> &Languages { &self.languages }

    pub fn is_letter(&self, c: char) -> bool { self.languages.is_letter(c) }

    /// Record `token` at `position` in `document` under each of its normal forms.
    /// Re-inserting a position appends a duplicate entry.
    pub fn insert(&self, cache: &mut FormCache, token: &str, document: &D, position: Position) {
        let token = token.to_lowercase();
        let forms = cache.forms(&self.languages, &token);
        for form in forms.iter() {
            self.insert_form(form, document, position);
        }
    }

    fn insert_form(&self, form: &str, document: &D, position: Position) {
        let bucket = match self.postings.get(form) {
            Some(bucket) => bucket,
            None => self.postings.entry(form.to_string()).or_default().downgrade(),
        };
        if let Some(mut positions) = bucket.get_mut(document) {
            positions.push(position);
            return;
        }
        bucket.entry(document.clone()).or_default().push(position);
    }

    /// Positions of every normal form of `word`, merged per document.
    ///
    /// A word with a character outside the configured alphabets matches nothing.
    /// A document reached through one form keeps its list as stored. Lists from
    /// several forms are merged in ascending order, each position kept as many
    /// times as the form that holds it most often, so a homonym counts once
    /// while repeated insertions survive.
    pub fn lookup(&self, word: &str) -> HashMap<D, Vec<Position>> {
        let word: String = word.nfc().collect();
        if !word.chars().all(|c| self.is_letter(c)) {
            return HashMap::new();
        }
        let word = word.to_lowercase();

        let mut result: HashMap<D, Vec<Position>> = HashMap::new();
        for form in self.languages.normal_forms(&word) {
            let Some(bucket) = self.postings.get(&form) else { continue };
            for posting in bucket.iter() {
                match result.entry(posting.key().clone()) {
                    Entry::Occupied(mut e) => {
                        let merged = union_counts(e.get(), posting.value());
                        *e.get_mut() = merged;
                    }
                    Entry::Vacant(e) => {
                        e.insert(posting.value().clone());
                    }
                }
            }
        }
        result
    }

    /// Postings stored under an exact normal form.
    pub fn postings(&self, form: &str) -> Option<HashMap<D, Vec<Position>>> {
        self.postings.get(form).map(|bucket| {
            bucket.iter().map(|p| (p.key().clone(), p.value().clone())).collect()
        })
    }

    pub fn num_forms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Plain snapshot of the whole index.
    pub fn to_map(&self) -> HashMap<String, HashMap<D, Vec<Position>>> {
        self.postings
            .iter()
            .map(|form| {
                let docs = form.value().iter().map(|p| (p.key().clone(), p.value().clone())).collect();
                (form.key().clone(), docs)
            })
            .collect()
    }
}

/// Sorted multiset union of two position lists.
fn union_counts(a: &[Position], b: &[Position]) -> Vec<Position> {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    let mut out = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else if b[j] < a[i] {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

impl<D: DocumentId> PartialEq for InvertedIndex<D> {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl<D: DocumentId> fmt::Debug for InvertedIndex<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvertedIndex")
            .field("languages", &self.languages.codes())
            .field("num_forms", &self.num_forms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_counts_hits() {
        let langs = Languages::default();
        let mut cache = FormCache::new();
        cache.forms(&langs, "word");
        cache.forms(&langs, "word");
        cache.forms(&langs, "слово");
        assert_eq!((cache.hits(), cache.misses(), cache.len()), (1, 2, 2));
    }

    #[test]
    fn duplicate_positions_are_kept() {
        let index: InvertedIndex<u32> = InvertedIndex::new(Languages::default());
        let mut cache = FormCache::new();
        index.insert(&mut cache, "Cat", &1, 4);
        index.insert(&mut cache, "cat", &1, 4);
        assert_eq!(index.lookup("cat").get(&1), Some(&vec![4, 4]));
    }

    #[test]
    fn union_keeps_the_larger_multiplicity() {
        assert_eq!(union_counts(&[1, 3, 3], &[3, 2]), vec![1, 2, 3, 3]);
        assert_eq!(union_counts(&[5, 5], &[5, 5, 5]), vec![5, 5, 5]);
        assert_eq!(union_counts(&[], &[4]), vec![4]);
    }
}
