use search_core::language::{DictionaryForms, LanguageProfile, Languages};
use search_core::persist::{
    from_bytes, load_index_file, load_meta, save_index_file, save_meta, to_bytes,
    write_index_with_progress, MetaFile, FORMAT_VERSION,
};
use search_core::{CodecError, FormCache, InvertedIndex};
use std::sync::Arc;
use tempfile::tempdir;

fn languages() -> Languages {
    let dict = Arc::new(DictionaryForms::from_pairs([("стали", "стать"), ("стали", "сталь")]));
    Languages::new(vec![
        LanguageProfile::russian().with_forms(dict.clone()),
        LanguageProfile::english().with_forms(dict),
    ])
}

fn sample_index() -> InvertedIndex<String> {
    let index = InvertedIndex::new(languages());
    let mut cache = FormCache::new();
    let a = "a.txt".to_string();
    let b = "b.txt".to_string();
    for (word, position) in [("zeta", 5), ("alpha", 1), ("zeta", 1), ("zeta", 3), ("стали", 2)] {
        index.insert(&mut cache, word, &a, position);
    }
    index.insert(&mut cache, "alpha", &b, 0);
    index.insert(&mut cache, "alpha", &b, 0);
    index
}

#[test]
fn round_trip_preserves_content_and_order() {
    let index = sample_index();
    let bytes = to_bytes(&index).unwrap();
    let loaded: InvertedIndex<String> = from_bytes(&bytes, languages()).unwrap();

    assert_eq!(loaded, index);
    assert_eq!(loaded.postings("zeta").unwrap()["a.txt"], vec![5, 1, 3]);
    assert_eq!(loaded.postings("alpha").unwrap()["b.txt"], vec![0, 0]);
    assert_eq!(loaded.lookup("стали")["a.txt"], vec![2]);
}

#[test]
fn empty_index_round_trips() {
    let index: InvertedIndex<String> = InvertedIndex::new(languages());
    let loaded: InvertedIndex<String> = from_bytes(&to_bytes(&index).unwrap(), languages()).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn document_labels_are_stored_once() {
    let index: InvertedIndex<String> = InvertedIndex::new(languages());
    let mut cache = FormCache::new();
    let label = "a-rather-long-document-label".to_string();
    for (i, word) in ["one", "two", "three", "four", "five"].iter().enumerate() {
        index.insert(&mut cache, word, &label, i as u32);
    }
    let bytes = to_bytes(&index).unwrap();
    let needle = label.as_bytes();
    let count = bytes.windows(needle.len()).filter(|w| *w == needle).count();
    assert_eq!(count, 1);
}

#[test]
fn progress_fires_every_ten_percent() {
    let index: InvertedIndex<u32> = InvertedIndex::new(languages());
    let mut cache = FormCache::new();
    let words = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t"];
    for (i, word) in words.iter().enumerate() {
        index.insert(&mut cache, word, &1, i as u32);
    }
    let mut calls = Vec::new();
    write_index_with_progress(&index, Vec::new(), |done, total| calls.push((done, total))).unwrap();
    assert_eq!(calls.len(), 10);
    assert_eq!(calls.first(), Some(&(2, 20)));
    assert_eq!(calls.last(), Some(&(20, 20)));
}

#[test]
fn rejects_foreign_data() {
    let err = from_bytes::<String>(b"definitely not an index", languages()).unwrap_err();
    assert!(matches!(err, CodecError::BadMagic));
    let err = from_bytes::<String>(b"", languages()).unwrap_err();
    assert!(matches!(err, CodecError::BadMagic));
}

#[test]
fn rejects_other_versions() {
    let mut bytes = to_bytes(&sample_index()).unwrap();
    bytes[8..12].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    let err = from_bytes::<String>(&bytes, languages()).unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedVersion { found, .. } if found == FORMAT_VERSION + 1));
}

#[test]
fn rejects_truncated_and_padded_data() {
    let bytes = to_bytes(&sample_index()).unwrap();
    for cut in [bytes.len() - 1, bytes.len() / 2, 20] {
        assert!(from_bytes::<String>(&bytes[..cut], languages()).is_err(), "cut at {cut}");
    }
    let mut padded = bytes.clone();
    padded.push(0);
    let err = from_bytes::<String>(&padded, languages()).unwrap_err();
    assert!(matches!(err, CodecError::Corrupt(_)));
}

#[test]
fn rejects_oversized_length_prefix() {
    let mut bytes = to_bytes(&sample_index()).unwrap();
    // magic, version, ["ru", "en"], document count, then the first document's length
    let first_document = 8 + 4 + (8 + 10 + 10) + 8;
    bytes[first_document..first_document + 8].copy_from_slice(&(1u64 << 42).to_le_bytes());
    let err = from_bytes::<String>(&bytes, languages()).unwrap_err();
    assert!(matches!(err, CodecError::Encoding(_)));

    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.ser");
    std::fs::write(&path, &bytes).unwrap();
    assert!(load_index_file::<String>(&path, languages()).is_err());
}

#[test]
fn rejects_language_mismatch() {
    let english = Languages::new(vec![LanguageProfile::english()]);
    let index: InvertedIndex<String> = InvertedIndex::new(english);
    let bytes = to_bytes(&index).unwrap();
    let err = from_bytes::<String>(&bytes, Languages::default()).unwrap_err();
    match err {
        CodecError::LanguageMismatch { stored, configured } => {
            assert_eq!(stored, vec!["en".to_string()]);
            assert_eq!(configured, vec!["ru".to_string(), "en".to_string()]);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn index_and_meta_files_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("index.ser");
    let index = sample_index();
    save_index_file(&path, &index).unwrap();
    let loaded: InvertedIndex<String> = load_index_file(&path, languages()).unwrap();
    assert_eq!(loaded, index);

    let meta = MetaFile {
        num_docs: 2,
        num_forms: index.num_forms() as u64,
        created_at: "2024-01-01T00:00:00Z".into(),
        version: FORMAT_VERSION,
        languages: vec!["ru".into(), "en".into()],
    };
    save_meta(&path, &meta).unwrap();
    assert_eq!(load_meta(&path).unwrap(), meta);

    assert!(load_index_file::<String>(&dir.path().join("absent.ser"), languages()).is_err());
}
