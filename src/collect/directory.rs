// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{document::DocumentKind, record::file::FileRecord};

use std::path::{Path, PathBuf};

/// Contents of one walked directory.
///
/// Built once per directory during collection, then handed by value to the
/// validation pass which returns it with any violations appended to
/// `errors`. Never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Directory {
    /// Absolute path of directory.
    pub path: PathBuf,

    /// Immediate subdirectories.
    pub subdirectories: Vec<PathBuf>,

    /// Immediate files, noise excluded.
    pub files: Vec<PathBuf>,

    /// Records extracted from recognized documents.
    pub records: Vec<FileRecord>,

    /// Kind of each recognized document, in file order.
    pub kinds: Vec<DocumentKind>,

    /// Parse errors and rule violations.
    pub errors: Vec<String>,
}

impl Directory {
    /// Construct new empty directory aggregate.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Name of directory as shown in error messages.
    pub fn name(&self) -> String {
        name_of(&self.path)
    }

    /// Count documents of a given kind.
    pub fn count_of(&self, kind: DocumentKind) -> usize {
        self.kinds.iter().filter(|candidate| **candidate == kind).count()
    }
}

pub(crate) fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
