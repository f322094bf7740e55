//! Corpus loading: plain text files, text directories and JSON record arrays.
//!
//! The loader only turns files into text or records; `ChunkBuilder` decides
//! what becomes a chunk. Construction errors are fatal and surface here.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::chunking::ChunkBuilder;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Separator placed between rendered records in `FlattenedRecords` mode.
pub const RECORD_SEPARATOR: &str = "\n\n-----\n\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusFormat {
    /// One text file, chunked by paragraphs or windows.
    Text,
    /// A JSON array; each record is one chunk.
    #[default]
    Records,
    /// A JSON array rendered into one text and chunked like `Text`.
    FlattenedRecords,
    /// Every `*.txt` file under a directory, each chunked like `Text`.
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub format: CorpusFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub language: String,
    #[serde(default, deserialize_with = "nullable")]
    pub filename: String,
    #[serde(default, deserialize_with = "nullable")]
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploitBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub language: String,
    #[serde(default, deserialize_with = "nullable")]
    pub filename: String,
    #[serde(default, deserialize_with = "nullable")]
    pub code: String,
    #[serde(default, deserialize_with = "nullable")]
    pub note: String,
}

/// One vulnerability entry of a JSON corpus. Absent and `null` fields read as
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "nullable")]
    pub cve_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub short_description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub vulnerable_code: CodeBlock,
    #[serde(default, deserialize_with = "nullable")]
    pub exploit_example: ExploitBlock,
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Renders the record as one chunk text. The line order is fixed; changing
    /// it changes every chunk and therefore every score.
    ///
    /// The two section headers are always present; every other line is
    /// omitted when its value is empty.
    pub fn render(&self) -> String {
        self.render_with(Layout::Compact)
    }

    /// Renders the record as one block of a flattened corpus. Same order as
    /// `render`, but the identity lines and both language/file lines are kept
    /// with an empty value; tags, code and the note are still omitted when
    /// empty.
    pub fn render_block(&self) -> String {
        self.render_with(Layout::Block)
    }

    fn render_with(&self, layout: Layout) -> String {
        let keep = |label: &str, value: &str| match layout {
            Layout::Block => format!("{label}{value}"),
            Layout::Compact => labelled(label, value),
        };
        let vuln = &self.vulnerable_code;
        let exploit = &self.exploit_example;
        let lines = [
            keep("CVE: ", &self.cve_id),
            keep("Название: ", &self.name),
            keep("Описание: ", &self.short_description),
            labelled("Теги: ", &self.tags.join(", ")),
            "Уязвимый код:".to_string(),
            keep("- Язык: ", &vuln.language),
            keep("- Файл: ", &vuln.filename),
            vuln.code.trim().to_string(),
            "Пример эксплуатации (без вредоносной нагрузки):".to_string(),
            keep("- Язык: ", &exploit.language),
            keep("- Файл: ", &exploit.filename),
            exploit.code.trim().to_string(),
            labelled("Примечание: ", &exploit.note),
        ];
        lines.into_iter().filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
    }
}

#[derive(Clone, Copy)]
enum Layout {
    Compact,
    Block,
}

fn labelled(label: &str, value: &str) -> String {
    if value.is_empty() { String::new() } else { format!("{label}{value}") }
}

/// Joins `render_block` output of every record, separated by `RECORD_SEPARATOR`.
pub fn flatten_records(records: &[Record]) -> String {
    records.iter().map(Record::render_block).collect::<Vec<_>>().join(RECORD_SEPARATOR)
}

/// Reads a text file. Byte sequences that are not valid UTF-8 are dropped.
pub fn read_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::CorpusNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(err.as_bytes().utf8_chunks().map(|chunk| chunk.valid()).collect()),
    }
}

/// Reads a JSON array of records. A non-array root is rejected before any
/// record is decoded.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let text = read_text(path)?;
    parse_records(&text, path)
}

/// Parses JSON record text; `origin` is only used in error messages.
pub fn parse_records(text: &str, origin: &Path) -> Result<Vec<Record>> {
    let malformed = |source| Error::MalformedJson { path: origin.to_path_buf(), source };
    let value: serde_json::Value = serde_json::from_str(text.trim()).map_err(malformed)?;
    if !value.is_array() {
        return Err(Error::NotAnArray(origin.to_path_buf()));
    }
    serde_json::from_value(value).map_err(malformed)
}

/// Sorted list of `*.txt` files under `root`.
pub fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(walkdir::DirEntry::into_path)
        .collect();
    txt_files.sort();
    txt_files
}

/// Loads the configured corpus and chunks it.
pub fn load_chunks(settings: &CorpusSettings, builder: &ChunkBuilder) -> Result<Vec<Chunk>> {
    let path = settings.path.as_path();
    info!(path = %path.display(), format = ?settings.format, "loading corpus");
    let chunks = match settings.format {
        CorpusFormat::Text => builder.build_text(&read_text(path)?),
        CorpusFormat::Records => {
            let records = read_records(path)?;
            debug!(records = records.len(), "decoded records");
            builder.build_records(&records)
        }
        CorpusFormat::FlattenedRecords => {
            let records = read_records(path)?;
            debug!(records = records.len(), "decoded records");
            builder.build_text(&flatten_records(&records))
        }
        CorpusFormat::Directory => {
            if !path.is_dir() {
                return Err(Error::CorpusNotFound(path.to_path_buf()));
            }
            let files = list_txt_files(path);
            debug!(files = files.len(), "found text files");
            let texts = files.iter().map(|file| read_text(file)).collect::<Result<Vec<_>>>()?;
            builder.build_texts(texts.iter().map(String::as_str))
        }
    };
    info!(chunks = chunks.len(), "corpus chunked");
    Ok(chunks)
}
