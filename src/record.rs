// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record identity.
//!
//! Every piece of data that folio keeps in its record store is a __record__.
//! A record is identified by a [`RecordId`]. Free-standing records can just
//! use a random identifier, but most records describe something that already
//! has a real-world identity, e.g., "the note file at this path". These
//! records are __deterministic__: their identifier is derived from a declared
//! subset of their fields called __determinant fields__.
//!
//! # Deterministic Identifiers
//!
//! A deterministic identifier is computed by joining the record's type name
//! with the canonical string form of each non-empty determinant value using
//! [`DETERMINANT_DELIMITER`], and hashing the result with SHA-256. The first
//! sixteen bytes of the digest become the identifier. Thus, collecting the
//! same file twice always yields the same identifier, which is what allows
//! folio to reconcile a fresh collection against its record store.
//!
//! Canonical forms:
//!
//! - Numbers, strings, and booleans are stringified directly.
//! - Timestamps use the `%d/%m/%Y` date format in UTC.
//! - Paths use their slash-separated form.
//!
//! Empty values (zero, false, empty strings and paths, absent values) are
//! skipped. A record whose determinant values are all empty cannot be
//! identified, because its type name alone would collide with every other
//! record of the same type.
//!
//! # Schemas
//!
//! Each deterministic record type declares a [`Schema`] listing its fields
//! and which of them are determinants. Schemas are checked before any
//! identifier is derived. A broken schema is a programming error, so it is
//! reported as an [`IdentityError`] rather than being silently ignored.

pub mod file;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    path::PathBuf,
};
use uuid::Uuid;

/// Delimiter placed between the type name and each determinant value.
pub const DETERMINANT_DELIMITER: &str = "_";

/// Date format used for timestamp determinants.
pub const DETERMINANT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Unique identifier of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Construct new random identifier for free-standing records.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for RecordId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, fmt)
    }
}

/// Value of a determinant field.
#[derive(Clone, Debug, PartialEq)]
pub enum Determinant {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Path(PathBuf),
    Absent,
}

impl Determinant {
    /// Check if value gets skipped during identifier derivation.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Integer(value) => *value == 0,
            Self::Float(value) => *value == 0.0,
            Self::String(value) => value.is_empty(),
            Self::Boolean(value) => !*value,
            Self::Timestamp(_) => false,
            Self::Path(value) => value.as_os_str().is_empty(),
            Self::Absent => true,
        }
    }

    /// Canonical string form of value.
    pub fn canonical(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format!("{value:?}"),
            Self::String(value) => value.clone(),
            Self::Boolean(value) => if *value { "True" } else { "False" }.into(),
            Self::Timestamp(value) => value.format(DETERMINANT_DATE_FORMAT).to_string(),
            Self::Path(value) => slash_path(value),
            Self::Absent => String::new(),
        }
    }
}

fn slash_path(path: &std::path::Path) -> String {
    let path = path.to_string_lossy();
    if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.into_owned()
    }
}

/// Compute deterministic identifier from type name and determinant values.
///
/// # Errors
///
/// - Return [`IdentityError::OnlyTypeName`] if every value is empty.
pub fn compute_id(
    type_name: &str,
    values: impl IntoIterator<Item = Determinant>,
) -> Result<RecordId> {
    let mut parts = vec![type_name.to_string()];
    parts.extend(
        values
            .into_iter()
            .filter(|value| !value.is_empty())
            .map(|value| value.canonical()),
    );

    // INVARIANT: Never identify a record by its type name alone.
    if parts.len() < 2 {
        return Err(IdentityError::OnlyTypeName(type_name.into()));
    }

    let digest = Sha256::digest(parts.join(DETERMINANT_DELIMITER).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    Ok(RecordId(Uuid::from_bytes(bytes)))
}

/// Type of a record field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    Path,
    Identifier,
    Sequence,
}

impl FieldKind {
    /// Check if field type may be used as a determinant.
    pub fn is_determinable(self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Float
                | Self::String
                | Self::Boolean
                | Self::Timestamp
                | Self::Path
        )
    }
}

/// Declared field of a record type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDecl {
    /// Declare field by name and kind.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Field layout of a deterministic record type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    /// All fields of the record type.
    pub fields: &'static [FieldDecl],

    /// Names of fields that determine the record's identifier.
    pub determinants: &'static [&'static str],
}

impl Schema {
    /// Check that schema can produce identifiers.
    ///
    /// # Errors
    ///
    /// - Return [`IdentityError::NoDeterminants`] if no determinant is declared.
    /// - Return [`IdentityError::UndeclaredField`] if a determinant is not a
    ///   field of the record type.
    /// - Return [`IdentityError::DisallowedType`] if a determinant's type
    ///   cannot be converted to a canonical string.
    pub fn validate(&self, type_name: &str) -> Result<()> {
        if self.determinants.is_empty() {
            return Err(IdentityError::NoDeterminants(type_name.into()));
        }

        for determinant in self.determinants {
            let field = self
                .fields
                .iter()
                .find(|field| field.name == *determinant)
                .ok_or_else(|| IdentityError::UndeclaredField {
                    type_name: type_name.into(),
                    field: (*determinant).into(),
                })?;

            if !field.kind.is_determinable() {
                return Err(IdentityError::DisallowedType {
                    type_name: type_name.into(),
                    field: (*determinant).into(),
                    kind: field.kind,
                });
            }
        }

        Ok(())
    }
}

/// A record that can be kept in a record store.
pub trait Record: Clone + Debug + PartialEq {
    /// Name of the record type.
    const TYPE_NAME: &'static str;

    /// Identifier of record.
    fn id(&self) -> RecordId;
}

/// A record whose identifier is derived from its determinant fields.
pub trait Deterministic: Record {
    /// Field layout of record type.
    const SCHEMA: Schema;

    /// Value of a declared field, or `None` if no such field exists.
    fn determinant(&self, field: &str) -> Option<Determinant>;

    /// Derive identifier from current determinant values.
    ///
    /// # Errors
    ///
    /// - Return [`IdentityError`] if the schema is broken, or every
    ///   determinant value is empty.
    fn derive_id(&self) -> Result<RecordId> {
        Self::SCHEMA.validate(Self::TYPE_NAME)?;

        let mut values = Vec::with_capacity(Self::SCHEMA.determinants.len());
        for field in Self::SCHEMA.determinants {
            let value = self
                .determinant(field)
                .ok_or_else(|| IdentityError::UndeclaredField {
                    type_name: Self::TYPE_NAME.into(),
                    field: (*field).into(),
                })?;
            values.push(value);
        }

        compute_id(Self::TYPE_NAME, values)
    }
}

/// Record identity error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Record type declares no determinant fields.
    #[error("{0} must define at least one determinant field")]
    NoDeterminants(String),

    /// Determinant field is not part of record type.
    #[error("determinant field {field:?} is not defined in {type_name}")]
    UndeclaredField { type_name: String, field: String },

    /// Determinant field has a type that cannot be canonicalized.
    #[error("determinant field {field:?} of {type_name} has disallowed type {kind:?}")]
    DisallowedType {
        type_name: String,
        field: String,
        kind: FieldKind,
    },

    /// All determinant values are empty.
    #[error("cannot generate {0} id based only on the type name")]
    OnlyTypeName(String),
}

/// Friendly result alias :3
pub type Result<T, E = IdentityError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use simple_test_case::test_case;

    #[derive(Clone, Debug, PartialEq)]
    struct Chapter {
        id: RecordId,
        book: String,
        title: String,
        pages: Vec<String>,
    }

    impl Record for Chapter {
        const TYPE_NAME: &'static str = "Chapter";

        fn id(&self) -> RecordId {
            self.id
        }
    }

    impl Deterministic for Chapter {
        const SCHEMA: Schema = Schema {
            fields: &[
                FieldDecl::new("book", FieldKind::String),
                FieldDecl::new("title", FieldKind::String),
                FieldDecl::new("pages", FieldKind::Sequence),
            ],
            determinants: &["book", "title"],
        };

        fn determinant(&self, field: &str) -> Option<Determinant> {
            match field {
                "book" => Some(Determinant::String(self.book.clone())),
                "title" => Some(Determinant::String(self.title.clone())),
                _ => None,
            }
        }
    }

    fn chapter(book: &str, title: &str, pages: &[&str]) -> Chapter {
        Chapter {
            id: RecordId::random(),
            book: book.into(),
            title: title.into(),
            pages: pages.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn derive_id_ignores_non_determinant_fields() -> anyhow::Result<()> {
        let first = chapter("republic", "cave", &["514a"]);
        let second = chapter("republic", "cave", &["514a", "520a"]);
        assert_eq!(first.derive_id()?, second.derive_id()?);
        Ok(())
    }

    #[test]
    fn derive_id_changes_with_any_determinant() -> anyhow::Result<()> {
        let base = chapter("republic", "cave", &[]).derive_id()?;
        assert_ne!(base, chapter("republic", "line", &[]).derive_id()?);
        assert_ne!(base, chapter("laws", "cave", &[]).derive_id()?);
        Ok(())
    }

    #[test]
    fn compute_id_is_stable() -> anyhow::Result<()> {
        let values = || [Determinant::Path("/notes/_notes.md".into())];
        assert_eq!(compute_id("FileRecord", values())?, compute_id("FileRecord", values())?);
        assert_ne!(compute_id("FileRecord", values())?, compute_id("Note", values())?);
        Ok(())
    }

    #[test]
    fn compute_id_skips_empty_values() -> anyhow::Result<()> {
        let sparse = compute_id(
            "Chapter",
            [Determinant::Absent, Determinant::String("cave".into())],
        )?;
        let dense = compute_id("Chapter", [Determinant::String("cave".into())])?;
        assert_eq!(sparse, dense);
        Ok(())
    }

    #[test_case(vec![]; "no values")]
    #[test_case(vec![Determinant::String(String::new())]; "empty string")]
    #[test_case(vec![Determinant::Integer(0), Determinant::Boolean(false)]; "falsy values")]
    #[test_case(vec![Determinant::Path(PathBuf::new()), Determinant::Absent]; "empty path")]
    #[test]
    fn compute_id_rejects_type_name_only(values: Vec<Determinant>) {
        let result = compute_id("Chapter", values);
        assert_eq!(result, Err(IdentityError::OnlyTypeName("Chapter".into())));
    }

    #[test_case(Determinant::Integer(42), "42"; "integer")]
    #[test_case(Determinant::Float(1.0), "1.0"; "float")]
    #[test_case(Determinant::Boolean(true), "True"; "boolean")]
    #[test_case(Determinant::Path("/notes/purpose".into()), "/notes/purpose"; "path")]
    #[test]
    fn determinant_canonical_form(value: Determinant, expect: &str) {
        assert_eq!(value.canonical(), expect);
    }

    #[test]
    fn timestamp_canonical_form_is_date_only() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 0).unwrap();
        assert_eq!(Determinant::Timestamp(stamp).canonical(), "09/03/2024");
    }

    #[test]
    fn schema_requires_determinants() {
        const SCHEMA: Schema = Schema {
            fields: &[FieldDecl::new("title", FieldKind::String)],
            determinants: &[],
        };
        assert_eq!(
            SCHEMA.validate("Chapter"),
            Err(IdentityError::NoDeterminants("Chapter".into()))
        );
    }

    #[test]
    fn schema_rejects_undeclared_determinant() {
        const SCHEMA: Schema = Schema {
            fields: &[FieldDecl::new("title", FieldKind::String)],
            determinants: &["book"],
        };
        assert_eq!(
            SCHEMA.validate("Chapter"),
            Err(IdentityError::UndeclaredField {
                type_name: "Chapter".into(),
                field: "book".into(),
            })
        );
    }

    #[test]
    fn schema_rejects_disallowed_type() {
        const SCHEMA: Schema = Schema {
            fields: &[FieldDecl::new("pages", FieldKind::Sequence)],
            determinants: &["pages"],
        };
        assert_eq!(
            SCHEMA.validate("Chapter"),
            Err(IdentityError::DisallowedType {
                type_name: "Chapter".into(),
                field: "pages".into(),
                kind: FieldKind::Sequence,
            })
        );
    }
}
