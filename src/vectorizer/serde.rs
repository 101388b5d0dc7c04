//! CBOR persistence of corpora and dictionaries.
//!
//! Files are written to `<path>.tmp` first and renamed into place, so an
//! interrupted write never leaves a truncated file behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::counting::CountingNgramDictionary;

/// Extension of the dictionary file written by [`Corpus::export`].
pub const VOCAB_EXTENSION: &str = "vocab";
/// Extension of the corpus file written by [`Corpus::export`].
pub const CORPUS_EXTENSION: &str = "corpus";
/// Extension of the plain word list written by [`Corpus::export`].
pub const WORDS_EXTENSION: &str = "words";

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Run `write` against `<path>.tmp`, then move the result to `path`.
fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let written = write(&mut writer).and_then(|()| Ok(writer.flush()?));
    drop(writer);
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn save_cbor<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    write_atomic(path, |writer| Ok(serde_cbor::to_writer(writer, value)?))
}

fn load_cbor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_cbor::from_reader(reader)?)
}

impl Corpus {
    /// Serialize as CBOR.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_cbor::from_reader(reader)?)
    }

    /// Write the whole corpus (dictionaries, documents, IDF) to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save_cbor(self, path)?;
        info!(path = %path.display(), documents = self.len(), "saved corpus");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let corpus: Self = load_cbor(path)?;
        info!(path = %path.display(), documents = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    /// Finalize, then write `<name>.vocab` (the counting dictionary),
    /// `<name>.corpus` (the corpus) and `<name>.words` (one term per line)
    /// into `dir`.
    ///
    /// # Returns
    /// * paths of the dictionary and corpus files
    pub fn export(&mut self, dir: impl AsRef<Path>, name: &str) -> Result<(PathBuf, PathBuf)> {
        self.finalize();
        let dir = dir.as_ref();
        let vocab = dir.join(format!("{}.{}", name, VOCAB_EXTENSION));
        let corpus = dir.join(format!("{}.{}", name, CORPUS_EXTENSION));
        let words = dir.join(format!("{}.{}", name, WORDS_EXTENSION));
        self.dictionary().save(&vocab)?;
        self.save(&corpus)?;
        write_atomic(&words, |writer| Ok(self.dictionary().terms().write_words(writer)?))?;
        Ok((vocab, corpus))
    }
}

impl CountingNgramDictionary {
    /// Serialize as CBOR.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_cbor::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save_cbor(self, path)?;
        info!(path = %path.display(), terms = self.terms().term_count(), "saved dictionary");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dictionary: Self = load_cbor(path)?;
        info!(path = %path.display(), terms = dictionary.terms().term_count(), "loaded dictionary");
        Ok(dictionary)
    }
}
