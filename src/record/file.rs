// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Collected document records.

use crate::{
    document::DocumentKind,
    record::{
        Determinant, Deterministic, FieldDecl, FieldKind, IdentityError, Record, RecordId, Schema,
    },
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::metadata,
    path::{Path, PathBuf},
};
use uuid::Uuid;

/// Record of one collected document.
///
/// Identified by its path. Two file records are considered equal if they
/// share the same identifier __and__ the same modification time. Content
/// changes are only ever detected through the file system's modification
/// time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    id: RecordId,
    path: PathBuf,
    kind: DocumentKind,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl FileRecord {
    /// Construct new file record.
    ///
    /// Creation and modification times are read from the file system.
    ///
    /// # Errors
    ///
    /// - Return [`FileRecordError::Metadata`] if file metadata cannot be read.
    /// - Return [`FileRecordError::Identity`] if identifier cannot be derived.
    pub fn new(
        path: impl Into<PathBuf>,
        kind: DocumentKind,
        title: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<Self> {
        let path = path.into();
        let stats = metadata(&path).map_err(|err| FileRecordError::Metadata {
            source: err,
            path: path.clone(),
        })?;
        let modified_at: DateTime<Utc> = stats
            .modified()
            .map_err(|err| FileRecordError::Metadata {
                source: err,
                path: path.clone(),
            })?
            .into();
        let created_at = stats
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified_at);

        Ok(Self::with_times(path, kind, title, tags, created_at, modified_at)?)
    }

    /// Construct new file record with explicit timestamps.
    ///
    /// # Errors
    ///
    /// - Return [`IdentityError`] if identifier cannot be derived.
    pub fn with_times(
        path: impl Into<PathBuf>,
        kind: DocumentKind,
        title: impl Into<String>,
        tags: Vec<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<Self, IdentityError> {
        let mut record = Self {
            id: RecordId::from(Uuid::nil()),
            path: path.into(),
            kind,
            created_at,
            modified_at,
            title: title.into(),
            tags,
        };
        record.id = record.derive_id()?;

        Ok(record)
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_slice()
    }
}

impl PartialEq for FileRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.modified_at == other.modified_at
    }
}

impl Record for FileRecord {
    const TYPE_NAME: &'static str = "FileRecord";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Deterministic for FileRecord {
    const SCHEMA: Schema = Schema {
        fields: &[
            FieldDecl::new("path", FieldKind::Path),
            FieldDecl::new("kind", FieldKind::String),
            FieldDecl::new("created_at", FieldKind::Timestamp),
            FieldDecl::new("modified_at", FieldKind::Timestamp),
            FieldDecl::new("title", FieldKind::String),
            FieldDecl::new("tags", FieldKind::Sequence),
        ],
        determinants: &["path"],
    };

    fn determinant(&self, field: &str) -> Option<Determinant> {
        let value = match field {
            "path" => Determinant::Path(self.path.clone()),
            "kind" => Determinant::String(self.kind.tag().into()),
            "created_at" => Determinant::Timestamp(self.created_at),
            "modified_at" => Determinant::Timestamp(self.modified_at),
            "title" => Determinant::String(self.title.clone()),
            _ => return None,
        };

        Some(value)
    }
}

/// File record error types.
#[derive(Debug, thiserror::Error)]
pub enum FileRecordError {
    /// File metadata cannot be read.
    #[error("failed to read metadata of {:?}", path.display())]
    Metadata {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Identifier cannot be derived.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Friendly result alias :3
type Result<T, E = FileRecordError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::{assert_eq, assert_ne};

    fn stamp(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn note(path: &str, title: &str, modified: DateTime<Utc>) -> Result<FileRecord, IdentityError> {
        FileRecord::with_times(path, DocumentKind::Note, title, vec![], stamp(1), modified)
    }

    #[test]
    fn same_path_same_id() -> anyhow::Result<()> {
        let first = FileRecord::with_times(
            "/notes/purpose/_purpose.md",
            DocumentKind::Root,
            "Purpose",
            vec![],
            stamp(1),
            stamp(2),
        )?;
        let second = FileRecord::with_times(
            "/notes/purpose/_purpose.md",
            DocumentKind::Note,
            "Something else",
            vec!["tagged".into()],
            stamp(3),
            stamp(4),
        )?;
        assert_eq!(first.id(), second.id());
        Ok(())
    }

    #[test]
    fn different_path_different_id() -> anyhow::Result<()> {
        let first = note("/notes/a.md", "A", stamp(1))?;
        let second = note("/notes/b.md", "A", stamp(1))?;
        assert_ne!(first.id(), second.id());
        Ok(())
    }

    #[test]
    fn equality_tracks_modification_time_only() -> anyhow::Result<()> {
        let base = note("/notes/a.md", "A", stamp(1))?;
        let retitled = FileRecord::with_times(
            "/notes/a.md",
            DocumentKind::Note,
            "B",
            vec![],
            stamp(2),
            stamp(1),
        )?;
        let touched = note("/notes/a.md", "A", stamp(1) + Duration::seconds(1))?;
        assert_eq!(base, retitled);
        assert_ne!(base, touched);
        Ok(())
    }

    #[test]
    fn schema_is_valid() {
        assert_eq!(FileRecord::SCHEMA.validate(FileRecord::TYPE_NAME), Ok(()));
    }

    #[test]
    fn new_reads_file_times() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("note.md");
        std::fs::write(&path, "## Note\n`[note_file]`\n")?;
        let record = FileRecord::new(&path, DocumentKind::Note, "Note", vec![])?;
        let mtime: DateTime<Utc> = metadata(&path)?.modified()?.into();
        assert_eq!(record.modified_at(), mtime);
        assert_eq!(record.path(), path.as_path());
        Ok(())
    }

    #[test]
    fn new_fails_on_missing_file() {
        let result = FileRecord::new("/does/not/exist.md", DocumentKind::Note, "Nope", vec![]);
        assert!(matches!(result, Err(FileRecordError::Metadata { .. })));
    }
}
