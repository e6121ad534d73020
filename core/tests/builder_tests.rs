use search_core::language::{DictionaryForms, LanguageProfile, Languages};
use search_core::IndexBuilder;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

fn plain_languages() -> Languages {
    let dict = Arc::new(DictionaryForms::new());
    Languages::new(vec![
        LanguageProfile::russian().with_forms(dict.clone()),
        LanguageProfile::english().with_forms(dict),
    ])
}

fn write_corpus(dir: &std::path::Path) -> Vec<(PathBuf, String)> {
    let texts: Vec<String> = vec![
        "the quick brown fox\njumps over the lazy dog".into(),
        "Быстрая коричневая лиса\nпрыгает через ленивую собаку".into(),
        "fox and dog, dog and fox.\n\nthe end".into(),
        String::new(),
        "one two three four five six seven eight nine ten\n".repeat(50),
    ];
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let path = dir.join(format!("doc{i}.txt"));
            fs::write(&path, text).unwrap();
            (path, format!("doc{i}"))
        })
        .collect()
}

#[test]
fn worker_count_does_not_change_content() {
    let dir = tempdir().unwrap();
    let docs = write_corpus(dir.path());

    let single = IndexBuilder::new(plain_languages()).workers(1).build(docs.clone());
    let two = IndexBuilder::new(plain_languages()).workers(2).build(docs.clone());
    let eight = IndexBuilder::new(plain_languages()).workers(8).build(docs);

    assert!(single.failures.is_empty());
    assert_eq!(single.documents, 5);
    assert!(!single.index.is_empty());
    assert_eq!(single.index, two.index);
    assert_eq!(single.index, eight.index);
}

#[test]
fn positions_continue_across_lines() {
    let dir = tempdir().unwrap();
    let docs = write_corpus(dir.path());
    let out = IndexBuilder::new(plain_languages()).workers(3).build(docs);

    assert_eq!(out.index.lookup("dog")["doc0"], vec![8]);
    assert_eq!(out.index.lookup("fox")["doc2"], vec![0, 5]);
    assert_eq!(out.index.lookup("end")["doc2"], vec![7]);
    assert_eq!(out.index.lookup("собаку")["doc1"], vec![6]);
    assert_eq!(out.index.lookup("ten")["doc4"].len(), 50);
}

#[test]
fn missing_document_does_not_stop_the_build() {
    let dir = tempdir().unwrap();
    let mut docs = write_corpus(dir.path());
    docs.push((dir.path().join("missing.txt"), "missing".to_string()));

    let out = IndexBuilder::new(plain_languages()).workers(2).build(docs);
    assert_eq!(out.documents, 6);
    assert_eq!(out.failures.len(), 1);
    assert!(out.failures[0].path.ends_with("missing.txt"));
    assert!(out.index.lookup("fox").contains_key("doc0"));
}

#[test]
fn read_failure_keeps_lines_read_so_far() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.txt");
    fs::write(&path, b"first words\n\xff\xfe not utf8\nlast words\n").unwrap();

    let out = IndexBuilder::new(plain_languages()).build(vec![(path, "broken".to_string())]);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.index.lookup("first")["broken"], vec![0]);
    assert!(out.index.lookup("last").is_empty());
}

#[test]
fn empty_document_set_gives_empty_index() {
    let out = IndexBuilder::new(plain_languages()).workers(4).build(Vec::<(PathBuf, String)>::new());
    assert_eq!(out.documents, 0);
    assert_eq!(out.bytes, 0);
    assert_eq!(out.index.num_forms(), 0);
}

#[test]
fn zero_workers_still_builds() {
    let dir = tempdir().unwrap();
    let docs = write_corpus(dir.path());
    let out = IndexBuilder::new(plain_languages()).workers(0).build(docs);
    assert!(out.index.lookup("lazy").contains_key("doc0"));
}
