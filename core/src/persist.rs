//! Binary persistence of an [`InvertedIndex`].
//!
//! Layout, every field bincode-encoded in sequence:
//!
//! ```text
//! magic "LEMMAIDX" | version: u32 | language codes: Vec<String>
//! documents: Vec<D>                       distinct payloads, referenced by slot
//! forms: u64
//!   form: String | postings: u64
//!     slot: u32 | positions: Vec<u32>     positions in scan order
//! ```
//!
//! The format is rebuilt from scratch on every save; there is no in-place update.

use crate::error::CodecError;
use crate::index::{DocumentId, InvertedIndex, Position};
use crate::language::Languages;
use anyhow::{Context, Result};
use bincode::Options;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const MAGIC: [u8; 8] = *b"LEMMAIDX";
pub const FORMAT_VERSION: u32 = 1;

const PROGRESS_STEP: usize = 10;

/// Fires once each time another 10 % of the forms has been processed.
struct Milestones {
    total: usize,
    next_percent: usize,
}

impl Milestones {
    fn new(total: usize) -> Self { Self { total, next_percent: PROGRESS_STEP } }

    fn reached(&mut self, done: usize) -> bool {
        if self.total == 0 {
            return false;
        }
        let percent = done * 100 / self.total;
        if percent < self.next_percent {
            return false;
        }
        while self.next_percent <= percent {
            self.next_percent += PROGRESS_STEP;
        }
        true
    }
}

pub fn write_index<D, W>(index: &InvertedIndex<D>, writer: W) -> Result<(), CodecError>
where
    D: DocumentId + Serialize,
    W: Write,
{
    write_index_with_progress(index, writer, |_, _| {})
}

/// Like [`write_index`], calling `progress(done, total)` at every 10 % of normal forms written.
pub fn write_index_with_progress<D, W, F>(
    index: &InvertedIndex<D>,
    mut writer: W,
    mut progress: F,
) -> Result<(), CodecError>
where
    D: DocumentId + Serialize,
    W: Write,
    F: FnMut(usize, usize),
{
    let mut slots: HashMap<D, u32> = HashMap::new();
    let mut documents: Vec<D> = Vec::new();
    for form in index.postings.iter() {
        for posting in form.value().iter() {
            if !slots.contains_key(posting.key()) {
                let slot = u32::try_from(documents.len())
                    .map_err(|_| CodecError::Corrupt("too many documents".into()))?;
                slots.insert(posting.key().clone(), slot);
                documents.push(posting.key().clone());
            }
        }
    }

    writer.write_all(&MAGIC)?;
    bincode::serialize_into(&mut writer, &FORMAT_VERSION)?;
    bincode::serialize_into(&mut writer, &index.languages().codes())?;
    bincode::serialize_into(&mut writer, &documents)?;

    let total = index.postings.len();
    bincode::serialize_into(&mut writer, &(total as u64))?;
    let mut milestones = Milestones::new(total);
    let mut written = 0usize;
    for form in index.postings.iter() {
        let bucket = form.value();
        bincode::serialize_into(&mut writer, form.key())?;
        bincode::serialize_into(&mut writer, &(bucket.len() as u64))?;
        for posting in bucket.iter() {
            let slot = slots
                .get(posting.key())
                .ok_or_else(|| CodecError::Corrupt("document added while saving".into()))?;
            bincode::serialize_into(&mut writer, slot)?;
            bincode::serialize_into(&mut writer, posting.value())?;
        }
        written += 1;
        if milestones.reached(written) {
            progress(written, total);
        }
    }
    if written != total {
        return Err(CodecError::Corrupt("index modified while saving".into()));
    }
    writer.flush()?;
    Ok(())
}

/// Decodes one field in the same encoding `bincode::serialize_into` writes.
/// A length prefix claiming more than `limit` bytes fails instead of allocating.
fn decode<T, R>(reader: &mut R, limit: u64) -> Result<T, CodecError>
where
    T: DeserializeOwned,
    R: Read,
{
    let options = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit);
    Ok(options.deserialize_from(reader)?)
}

/// Reads an index from a stream of at most `limit` bytes.
pub fn read_index<D, R>(reader: R, limit: u64, languages: Languages) -> Result<InvertedIndex<D>, CodecError>
where
    D: DocumentId + DeserializeOwned,
    R: Read,
{
    read_index_with_progress(reader, limit, languages, |_, _| {})
}

/// Reads an index written by [`write_index`]. Nothing is returned unless the
/// whole stream is valid. `limit` is the stream length: no field may claim more.
pub fn read_index_with_progress<D, R, F>(
    mut reader: R,
    limit: u64,
    languages: Languages,
    mut progress: F,
) -> Result<InvertedIndex<D>, CodecError>
where
    D: DocumentId + DeserializeOwned,
    R: Read,
    F: FnMut(usize, usize),
{
    let mut magic = [0u8; MAGIC.len()];
    reader.read_exact(&mut magic).map_err(|_| CodecError::BadMagic)?;
    if magic != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version: u32 = decode(&mut reader, limit)?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion { found: version, expected: FORMAT_VERSION });
    }
    let stored: Vec<String> = decode(&mut reader, limit)?;
    let configured = languages.codes();
    if stored != configured {
        return Err(CodecError::LanguageMismatch { stored, configured });
    }
    let documents: Vec<D> = decode(&mut reader, limit)?;

    let total: u64 = decode(&mut reader, limit)?;
    let total = usize::try_from(total)
        .map_err(|_| CodecError::Corrupt(format!("form count {total} out of range")))?;
    let index = InvertedIndex::new(languages);
    let mut milestones = Milestones::new(total);
    for done in 1..=total {
        let form: String = decode(&mut reader, limit)?;
        let count: u64 = decode(&mut reader, limit)?;
        if count == 0 {
            return Err(CodecError::Corrupt(format!("normal form '{form}' has no postings")));
        }
        let bucket: DashMap<D, Vec<Position>> = DashMap::new();
        for _ in 0..count {
            let slot: u32 = decode(&mut reader, limit)?;
            let document = documents.get(slot as usize).ok_or_else(|| {
                CodecError::Corrupt(format!(
                    "document slot {slot} out of range ({} documents)",
                    documents.len()
                ))
            })?;
            let positions: Vec<Position> = decode(&mut reader, limit)?;
            if positions.is_empty() {
                return Err(CodecError::Corrupt(format!("empty position list under '{form}'")));
            }
            if bucket.insert(document.clone(), positions).is_some() {
                return Err(CodecError::Corrupt(format!("document slot {slot} repeated under '{form}'")));
            }
        }
        if index.postings.contains_key(&form) {
            return Err(CodecError::Corrupt(format!("normal form '{form}' repeated")));
        }
        index.postings.insert(form, bucket);
        if milestones.reached(done) {
            progress(done, total);
        }
    }

    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(CodecError::Corrupt("trailing data after index".into()));
    }
    Ok(index)
}

pub fn to_bytes<D>(index: &InvertedIndex<D>) -> Result<Vec<u8>, CodecError>
where
    D: DocumentId + Serialize,
{
    let mut bytes = Vec::new();
    write_index(index, &mut bytes)?;
    Ok(bytes)
}

pub fn from_bytes<D>(bytes: &[u8], languages: Languages) -> Result<InvertedIndex<D>, CodecError>
where
    D: DocumentId + DeserializeOwned,
{
    read_index(bytes, bytes.len() as u64, languages)
}

pub fn save_index_file<D>(path: &Path, index: &InvertedIndex<D>) -> Result<()>
where
    D: DocumentId + Serialize,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let f = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let start = Instant::now();
    tracing::info!(path = %path.display(), num_forms = index.num_forms(), "writing index");
    write_index_with_progress(index, BufWriter::new(f), |done, total| {
        tracing::info!(done, total, "writing normal forms: {}%", done * 100 / total);
    })
    .with_context(|| format!("cannot write index to {}", path.display()))?;
    tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "index written");
    Ok(())
}

pub fn load_index_file<D>(path: &Path, languages: Languages) -> Result<InvertedIndex<D>>
where
    D: DocumentId + DeserializeOwned,
{
    let f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let size = f.metadata().with_context(|| format!("cannot stat {}", path.display()))?.len();
    let start = Instant::now();
    tracing::info!(path = %path.display(), size, "reading index");
    let index = read_index_with_progress(BufReader::new(f), size, languages, |done, total| {
        tracing::info!(done, total, "reading normal forms: {}%", done * 100 / total);
    })
    .with_context(|| format!("cannot read index from {}", path.display()))?;
    tracing::info!(
        num_forms = index.num_forms(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index read"
    );
    Ok(index)
}

/// Human-readable description written next to the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_forms: u64,
    pub created_at: String,
    pub version: u32,
    pub languages: Vec<String>,
}

/// `index.ser` -> `index.ser.meta.json`
pub fn meta_path(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

pub fn save_meta(index_path: &Path, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(meta_path(index_path))?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(index_path: &Path) -> Result<MetaFile> {
    let mut f = File::open(meta_path(index_path))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones_fire_once_per_step() {
        let mut m = Milestones::new(25);
        let fired: Vec<usize> = (1..=25).filter(|&done| m.reached(done)).collect();
        assert_eq!(fired, vec![3, 5, 8, 10, 13, 15, 18, 20, 23, 25]);

        let mut m = Milestones::new(3);
        let fired: Vec<usize> = (1..=3).filter(|&done| m.reached(done)).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn meta_path_appends_suffix() {
        assert_eq!(meta_path(Path::new("out/index.ser")), PathBuf::from("out/index.ser.meta.json"));
    }
}
