// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Structural validators.
//!
//! A validator checks one invariant about the contents of a [`Directory`].
//! Violations are reported as human-readable strings instead of errors, so
//! every validator of a rule set gets to run even when an earlier one has
//! already failed.

use crate::{
    collect::directory::{name_of, Directory},
    document::{DocumentKind, DOCUMENT_EXTENSION},
};

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, path::Path};

/// File name prefix required inside archive directories.
pub const ARCHIVE_PREFIX: &str = "archived_";

/// State validators may depend on besides the directory itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context {
    /// Calendar year at validation time.
    pub current_year: i32,
}

/// Check on the contents of a directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Validator {
    /// Directory must contain at least one file.
    HasFiles,

    /// Every file must be a markdown document.
    MarkdownOnly,

    NoSubdirectories,

    /// Exactly one root document.
    ExactlyOneRootFile,

    NoRootFile,

    /// Nothing but a single root document.
    OnlyRootFile,

    /// Only root and note documents.
    NotesOnly,

    /// Distinct document kinds must equal the allowed set exactly.
    AllowedKinds { kinds: BTreeSet<DocumentKind> },

    /// File names must start with the current year.
    CurrentYearPrefix,

    /// Subdirectories must be named after a year.
    YearNamedSubdirectories,

    /// File names must start with the directory's own name, itself a year.
    ParentYearPrefix,

    /// File names must start with [`ARCHIVE_PREFIX`].
    ArchivePrefix,
}

impl Validator {
    /// Convenience constructor for [`Validator::AllowedKinds`].
    pub fn allowed_kinds(kinds: impl IntoIterator<Item = DocumentKind>) -> Self {
        Self::AllowedKinds {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Run check, returning every violation found.
    pub fn check(&self, directory: &Directory, context: &Context) -> Vec<String> {
        let name = directory.name();
        let mut errors = Vec::new();

        match self {
            Self::HasFiles => {
                if directory.files.is_empty() {
                    errors.push(format!("Directory {name:?} does not contain any files."));
                }
            }
            Self::MarkdownOnly => {
                for file in &directory.files {
                    if !is_markdown(file) {
                        errors.push(format!(
                            "Directory {name:?} contains non-markdown file {:?}.",
                            name_of(file)
                        ));
                    }
                }
            }
            Self::NoSubdirectories => {
                if !directory.subdirectories.is_empty() {
                    errors.push(format!("Directory {name:?} must not contain subdirectories."));
                }
            }
            Self::ExactlyOneRootFile => {
                if directory.count_of(DocumentKind::Root) != 1 {
                    errors.push(format!("Directory {name:?} must contain only one root file."));
                }
            }
            Self::NoRootFile => {
                if directory.count_of(DocumentKind::Root) != 0 {
                    errors.push(format!("Directory {name:?} must not contain a root file."));
                }
            }
            Self::OnlyRootFile => {
                if directory.kinds != [DocumentKind::Root] {
                    errors.push(format!("Directory {name:?} must only contain a root file."));
                }
            }
            Self::NotesOnly => {
                let foreign = directory
                    .kinds
                    .iter()
                    .filter(|kind| !matches!(kind, DocumentKind::Root | DocumentKind::Note))
                    .collect::<BTreeSet<_>>();
                for kind in foreign {
                    errors.push(format!(
                        "Directory {name:?} should only contain a root file and note files, \
                         not {:?} files.",
                        kind.tag()
                    ));
                }
            }
            Self::AllowedKinds { kinds } => {
                let found = directory.kinds.iter().copied().collect::<BTreeSet<_>>();
                if &found != kinds {
                    let allowed = kinds
                        .iter()
                        .map(|kind| format!("{:?}", kind.tag()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    errors.push(format!("Directory {name:?} should only contain {allowed} files."));
                }
            }
            Self::CurrentYearPrefix => {
                let year = context.current_year.to_string();
                for file in &directory.files {
                    let file_name = name_of(file);
                    if !file_name.starts_with(&year) {
                        errors.push(format!(
                            "Directory {name:?}'s files must be prefixed with the current year \
                             {year}, not {file_name:?}."
                        ));
                    }
                }
            }
            Self::YearNamedSubdirectories => {
                for subdirectory in &directory.subdirectories {
                    let subdirectory_name = name_of(subdirectory);
                    if !is_year(&subdirectory_name) {
                        errors.push(format!(
                            "Directory {name:?}'s subdirectories must be named after a year, \
                             not {subdirectory_name:?}."
                        ));
                    }
                }
            }
            Self::ParentYearPrefix => {
                for file in &directory.files {
                    let file_name = name_of(file);
                    if !file_name.starts_with(&name) {
                        errors.push(format!(
                            "Directory {name:?}'s files must be from the year {name:?}, \
                             not {file_name:?}."
                        ));
                    }
                }
            }
            Self::ArchivePrefix => {
                for file in &directory.files {
                    let file_name = name_of(file);
                    if !file_name.starts_with(ARCHIVE_PREFIX) {
                        errors.push(format!(
                            "Directory {name:?}'s files must be prefixed with {ARCHIVE_PREFIX:?}, \
                             not {file_name:?}."
                        ));
                    }
                }
            }
        }

        errors
    }
}

/// Four digit year from 1000 to 9999.
fn is_year(name: &str) -> bool {
    let mut chars = name.chars();
    name.len() == 4
        && matches!(chars.next(), Some('1'..='9'))
        && chars.all(|c| c.is_ascii_digit())
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION)
}
