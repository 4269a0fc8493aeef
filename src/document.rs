// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document recognition.
//!
//! Folio manages a tree of markdown __documents__. Each document declares its
//! kind in a small header at the top of the file:
//!
//! ```text
//! ## The Republic
//! `[study_file][philosophy][plato]`
//! ```
//!
//! The first line is the title. The second line is a list of bracketed tags
//! wrapped in back quotes, where the first tag names the [`DocumentKind`] and
//! the remaining tags are attached to the document's record.
//!
//! Only the header is interpreted here. The body of a document belongs to
//! whatever grammar the document kind uses, and folio does not need it to
//! keep its record store up to date. The [`DocumentParser`] trait keeps the
//! collector independent of how documents are actually recognized.

use crate::record::file::{FileRecord, FileRecordError};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// File extension every document must have.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Kind of document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Document describing the directory it lives in.
    #[serde(rename = "root_file")]
    Root,

    #[serde(rename = "note_file")]
    Note,

    #[serde(rename = "essay_file")]
    Essay,

    #[serde(rename = "study_file")]
    Study,

    /// Monthly collection of thoughts.
    #[serde(rename = "thoughts_file")]
    Thoughts,

    /// Monthly diary.
    #[serde(rename = "diary_file")]
    Diary,
}

/// Document kinds in dispatch order, keyed by header tag.
const KINDS: [(&str, DocumentKind); 6] = [
    ("root_file", DocumentKind::Root),
    ("note_file", DocumentKind::Note),
    ("essay_file", DocumentKind::Essay),
    ("study_file", DocumentKind::Study),
    ("thoughts_file", DocumentKind::Thoughts),
    ("diary_file", DocumentKind::Diary),
];

impl DocumentKind {
    /// Header tag that declares this kind.
    pub fn tag(self) -> &'static str {
        KINDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(tag, _)| *tag)
            .unwrap_or_default()
    }

    /// Recognize kind from header tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        KINDS
            .iter()
            .find(|(candidate, _)| *candidate == tag)
            .map(|(_, kind)| *kind)
    }

    /// Specifier of dated kinds, e.g., "Thoughts" for "2024.01_Thoughts.md".
    pub fn dated_specifier(self) -> Option<&'static str> {
        match self {
            Self::Thoughts => Some("Thoughts"),
            Self::Diary => Some("Diary"),
            _ => None,
        }
    }
}

impl Display for DocumentKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.tag())
    }
}

impl FromStr for DocumentKind {
    type Err = UnknownKind;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        // INVARIANT: Accept both "essay" and "essay_file".
        Self::from_tag(data)
            .or_else(|| Self::from_tag(format!("{data}_file").as_str()))
            .ok_or_else(|| UnknownKind(data.into()))
    }
}

/// Document kind tag is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown document kind {0:?}")]
pub struct UnknownKind(pub String);

/// A recognized document.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub kind: DocumentKind,
    pub record: FileRecord,
}

/// Turn files into documents.
pub trait DocumentParser {
    /// Recognize and parse file at path.
    ///
    /// # Errors
    ///
    /// - Return [`ParseError`] if the file is not a document folio
    ///   understands, or the document is malformed.
    fn parse(&self, path: &Path) -> Result<Document>;
}

/// Parser that only reads document headers.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderParser;

impl HeaderParser {
    /// Construct new header parser.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for HeaderParser {
    #[instrument(skip(self), level = "debug")]
    fn parse(&self, path: &Path) -> Result<Document> {
        let name = file_name(path);
        if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
            return Err(ParseError::NotMarkdown(name));
        }

        let content = read_to_string(path).map_err(|err| ParseError::Read {
            source: err,
            path: path.into(),
        })?;
        let mut lines = content.lines();

        let title = lines
            .next()
            .and_then(|line| line.strip_prefix("## "))
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or(ParseError::MissingTitle)?
            .to_string();

        let mut tags = lines
            .next()
            .and_then(parse_tag_line)
            .ok_or(ParseError::MissingKind)?;
        let kind_tag = tags.remove(0);
        let kind = DocumentKind::from_tag(&kind_tag).ok_or(ParseError::UnknownKind(kind_tag))?;

        let mut seen = std::collections::HashSet::new();
        if !tags.iter().all(|tag| seen.insert(tag.as_str())) {
            return Err(ParseError::DuplicateTags(kind));
        }

        if kind == DocumentKind::Root {
            let expect = root_title(&name);
            if title != expect {
                return Err(ParseError::RootTitle { title, expect });
            }
        }

        if let Some(specifier) = kind.dated_specifier() {
            check_dated(&title, &name, kind, specifier)?;
        }

        debug!("recognized {kind} {title:?}");
        let record = FileRecord::new(path, kind, title, tags)
            .map_err(|err| ParseError::Record { source: err, kind })?;

        Ok(Document { kind, record })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse "`[kind][tag]...`" into its tags.
fn parse_tag_line(line: &str) -> Option<Vec<String>> {
    let mut rest = line.trim().strip_prefix('`')?.strip_suffix('`')?;
    let mut tags = Vec::new();

    while !rest.is_empty() {
        let body = rest.strip_prefix('[')?;
        let end = body.find(']')?;
        let tag = &body[..end];
        if tag.is_empty() || tag.contains('[') {
            return None;
        }
        tags.push(tag.to_string());
        rest = &body[end + 1..];
    }

    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Title a root file must carry, e.g., "_essays_bg.md" gives "Essays bg".
fn root_title(name: &str) -> String {
    let stem = name.strip_prefix('_').unwrap_or(name);
    let stem = stem
        .strip_suffix(&format!(".{DOCUMENT_EXTENSION}"))
        .unwrap_or(stem)
        .replace('_', " ");

    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Dated documents are titled "YYYY.MM <specifier>" and named after it.
fn check_dated(title: &str, name: &str, kind: DocumentKind, specifier: &str) -> Result<()> {
    let dated_title = || ParseError::DatedTitle {
        title: title.into(),
        kind,
    };

    let (date, rest) = title.split_once(' ').ok_or_else(dated_title)?;
    let (year, month) = date.split_once('.').ok_or_else(dated_title)?;
    let is_year = year.len() == 4 && year.chars().all(|c| c.is_ascii_digit());
    let is_month = month.len() == 2 && matches!(month.parse::<u32>(), Ok(1..=12));
    if rest != specifier || !is_year || !is_month {
        return Err(dated_title());
    }

    let expect = format!("{year}.{month}_{specifier}.{DOCUMENT_EXTENSION}");
    if name != expect {
        return Err(ParseError::DatedFileName {
            name: name.into(),
            expect,
            kind,
        });
    }

    Ok(())
}

/// Document parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// File does not have the document extension.
    #[error("File {0:?} is not a .md file.")]
    NotMarkdown(String),

    /// File cannot be read.
    #[error("Failed to read {:?}.", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// First line is not a title.
    #[error("Header must start with a \"## <title>\" line.")]
    MissingTitle,

    /// Second line is not a tag line.
    #[error("Header must declare its document kind as \"`[<kind>]`\".")]
    MissingKind,

    /// Kind tag does not name any document kind.
    #[error("Unrecognized document kind {0:?}.")]
    UnknownKind(String),

    /// Header repeats a tag.
    #[error("Cannot have duplicate tags.")]
    DuplicateTags(DocumentKind),

    /// Root file title does not match its file name.
    #[error("Root file title {title:?} does not match file name {expect:?}.")]
    RootTitle { title: String, expect: String },

    /// Dated document title is malformed.
    #[error(
        "Title {title:?} must be formatted as \"YYYY.MM {}\".",
        .kind.dated_specifier().unwrap_or_default()
    )]
    DatedTitle { title: String, kind: DocumentKind },

    /// Dated document file name does not follow its title.
    #[error("File name {name:?} does not match the header-derived {expect:?}.")]
    DatedFileName {
        name: String,
        expect: String,
        kind: DocumentKind,
    },

    /// Record cannot be built for document.
    #[error("{source}")]
    Record {
        source: FileRecordError,
        kind: DocumentKind,
    },
}

impl ParseError {
    /// Check if error signals a programming error rather than a bad document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Record {
                source: FileRecordError::Identity(_),
                ..
            }
        )
    }

    /// Document kind declared by the header, if parsing got that far.
    pub fn kind(&self) -> Option<DocumentKind> {
        match self {
            Self::DuplicateTags(kind)
            | Self::DatedTitle { kind, .. }
            | Self::DatedFileName { kind, .. }
            | Self::Record { kind, .. } => Some(*kind),
            Self::RootTitle { .. } => Some(DocumentKind::Root),
            Self::NotMarkdown(_)
            | Self::Read { .. }
            | Self::MissingTitle
            | Self::MissingKind
            | Self::UnknownKind(_) => None,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = ParseError> = std::result::Result<T, E>;
