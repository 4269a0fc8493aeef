// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Notes tree collection.
//!
//! Collection walks the notes tree top-down, recognizes every document it
//! finds, and checks each directory against the rule set resolved for it by
//! the [`RuleBook`]. Per-file parse failures and per-directory rule
//! violations never abort the walk. They are gathered as plain strings so
//! the user gets to see every problem in the tree at once.
//!
//! # All or Nothing
//!
//! Records collected from a tree with any error at all are discarded. The
//! record store is reconciled with full-replace semantics, i.e., records
//! missing from a collection get deleted. Handing a partial collection to
//! reconciliation would silently destroy records for every directory that
//! failed to validate. Thus, a [`CollectionResult`] with errors never
//! carries records.

pub mod directory;

use crate::{
    document::{DocumentParser, HeaderParser, ParseError},
    record::file::FileRecord,
    rules::{validator::Context, RuleBook},
};
use directory::Directory;

use chrono::{Datelike, Utc};
use glob::Pattern;
use ignore::{DirEntry, WalkBuilder};
use std::{
    collections::HashMap,
    fs::remove_file,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Outcome of a collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectionResult {
    records: Vec<FileRecord>,
    errors: Vec<String>,
}

impl CollectionResult {
    /// Construct new collection result.
    ///
    /// Records are dropped if there is any error.
    pub fn new(records: Vec<FileRecord>, errors: Vec<String>) -> Self {
        let records = if errors.is_empty() { records } else { Vec::new() };
        Self { records, errors }
    }

    /// Collected records, empty whenever there are errors.
    pub fn records(&self) -> &[FileRecord] {
        self.records.as_slice()
    }

    /// Every parse error and rule violation in walk order.
    pub fn errors(&self) -> &[String] {
        self.errors.as_slice()
    }

    /// Check if collection is free of errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Take collected records.
    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
    }
}

#[derive(Debug, Default)]
struct Listing {
    files: Vec<PathBuf>,
    subdirectories: Vec<PathBuf>,
    failures: Vec<ignore::Error>,
}

/// Walked tree, directories in pre-order with their immediate entries.
#[derive(Debug, Default)]
struct Tree {
    order: Vec<PathBuf>,
    listings: HashMap<PathBuf, Listing>,
}

impl Tree {
    fn walk(location: &Path) -> Self {
        let walker = WalkBuilder::new(location)
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        Self::from_entries(location, walker)
    }

    fn from_entries(
        location: &Path,
        entries: impl IntoIterator<Item = Result<DirEntry, ignore::Error>>,
    ) -> Self {
        let mut tree = Self::default();
        tree.listing(location);
        for entry in entries {
            match entry {
                Ok(entry) => tree.insert(&entry),
                Err(error) => tree.fail(location, error),
            }
        }

        tree
    }

    fn listing(&mut self, directory: &Path) -> &mut Listing {
        if !self.listings.contains_key(directory) {
            self.order.push(directory.to_path_buf());
        }

        self.listings.entry(directory.to_path_buf()).or_default()
    }

    fn insert(&mut self, entry: &DirEntry) {
        let path = entry.path();
        let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());

        // INVARIANT: Walk root is never listed as a child of its parent.
        if entry.depth() > 0 {
            if let Some(parent) = path.parent() {
                let listing = self.listing(parent);
                if is_dir {
                    listing.subdirectories.push(path.to_path_buf());
                } else {
                    listing.files.push(path.to_path_buf());
                }
            }
        }

        if is_dir {
            self.listing(path);
        }
    }

    /// Attach walk failure to the directory it happened in.
    fn fail(&mut self, location: &Path, error: ignore::Error) {
        warn!("walk failure under {:?}: {error}", location.display());
        let owner = failed_path(&error)
            .and_then(|path| {
                if self.listings.contains_key(&path) {
                    Some(path)
                } else {
                    path.parent()
                        .filter(|parent| self.listings.contains_key(*parent))
                        .map(Path::to_path_buf)
                }
            })
            .unwrap_or_else(|| location.to_path_buf());
        self.listing(&owner).failures.push(error);
    }
}

fn failed_path(error: &ignore::Error) -> Option<PathBuf> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            failed_path(err)
        }
        _ => None,
    }
}

fn failure_cause(error: &ignore::Error) -> &ignore::Error {
    match error {
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => failure_cause(err),
        _ => error,
    }
}

/// Notes tree collector.
///
/// Anchored at the notes root. Rule resolution always uses paths relative to
/// that root, even when collecting only part of the tree.
#[derive(Debug)]
pub struct Collector<P = HeaderParser>
where
    P: DocumentParser,
{
    root: PathBuf,
    parser: P,
    rules: RuleBook,
    noise: Vec<Pattern>,
    current_year: Option<i32>,
}

impl Collector<HeaderParser> {
    /// Construct new collector using the default header parser and rules.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_parser(root, HeaderParser::new())
    }
}

impl<P> Collector<P>
where
    P: DocumentParser,
{
    /// Construct new collector with custom document parser.
    pub fn with_parser(root: impl Into<PathBuf>, parser: P) -> Self {
        Self {
            root: root.into(),
            parser,
            rules: RuleBook::default(),
            noise: Vec::new(),
            current_year: None,
        }
    }

    /// Use rule book instead of default rules.
    pub fn rules(mut self, rules: RuleBook) -> Self {
        self.rules = rules;
        self
    }

    /// Delete and skip files whose name matches any noise pattern.
    pub fn noise(mut self, noise: impl IntoIterator<Item = Pattern>) -> Self {
        self.noise = noise.into_iter().collect();
        self
    }

    /// Pin current year instead of reading the clock at collection time.
    pub fn current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    /// Path relative to notes root.
    ///
    /// # Errors
    ///
    /// - Return [`CollectError::OutsideRoot`] if path is not under root.
    pub fn relative_to_root(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| CollectError::OutsideRoot {
                location: path.as_ref().into(),
                root: self.root.clone(),
            })
    }

    /// Collect records from location in notes tree.
    ///
    /// Location is either the notes root itself, or any directory under it.
    ///
    /// # Errors
    ///
    /// - Return [`CollectError::NotFound`] if root or location is missing.
    /// - Return [`CollectError::NotADirectory`] if root or location is not
    ///   a directory.
    /// - Return [`CollectError::OutsideRoot`] if location is not under root.
    /// - Return [`CollectError::Identity`] if a record type is broken.
    #[instrument(skip(self, location), level = "debug")]
    pub fn collect(&self, location: impl AsRef<Path>) -> Result<CollectionResult> {
        let location = location.as_ref();
        check_directory(&self.root)?;
        check_directory(location)?;
        self.relative_to_root(location)?;

        info!("collect documents from {:?}", location.display());
        self.gather(Tree::walk(location))
    }

    fn gather(&self, tree: Tree) -> Result<CollectionResult> {
        let context = Context {
            current_year: self.current_year.unwrap_or_else(|| Utc::now().year()),
        };

        let mut records = Vec::new();
        let mut errors = Vec::new();
        let Tree {
            order,
            mut listings,
        } = tree;
        for path in order {
            let listing = listings.remove(&path).unwrap_or_default();
            let directory = self.visit(path, listing, &context)?;
            records.extend(directory.records);
            errors.extend(directory.errors);
        }

        let result = CollectionResult::new(records, errors);
        info!(
            "collected {} records with {} errors",
            result.records().len(),
            result.errors().len()
        );

        Ok(result)
    }

    fn visit(&self, path: PathBuf, listing: Listing, context: &Context) -> Result<Directory> {
        debug!("visit {:?}", path.display());
        let mut directory = Directory::new(path);
        directory.subdirectories = listing.subdirectories;

        for failure in listing.failures {
            let path = failed_path(&failure).unwrap_or_else(|| directory.path.clone());
            directory
                .errors
                .push(format!("{:?}: {}", self.display_path(&path), failure_cause(&failure)));
        }

        for file in listing.files {
            if self.is_noise(&file) {
                debug!("remove noise {:?}", file.display());
                if let Err(error) = remove_file(&file) {
                    warn!("failed to remove {:?}: {error}", file.display());
                }
                continue;
            }

            directory.files.push(file.clone());
            match self.parser.parse(&file) {
                Ok(document) => {
                    directory.kinds.push(document.kind);
                    directory.records.push(document.record);
                }
                Err(error) if error.is_fatal() => return Err(CollectError::Identity(error)),
                Err(error) => {
                    // INVARIANT: Declared kind still counts towards directory rules.
                    if let Some(kind) = error.kind() {
                        directory.kinds.push(kind);
                    }

                    let relative = self.display_path(&file);
                    let message = error.to_string();
                    directory
                        .errors
                        .push(format!("{relative:?}: {}", message.trim_end_matches('.')));
                }
            }
        }

        let segments = self
            .relative_to_root(&directory.path)?
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>();

        Ok(self.rules.validate(directory, &segments, context))
    }

    fn display_path(&self, path: &Path) -> String {
        match self.relative_to_root(path) {
            Ok(relative) => slash_path(&relative),
            Err(_) => path.display().to_string(),
        }
    }

    fn is_noise(&self, file: &Path) -> bool {
        let name = directory::name_of(file);
        self.noise.iter().any(|pattern| pattern.matches(&name))
    }
}

fn check_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CollectError::NotFound(path.into()));
    }

    if !path.is_dir() {
        return Err(CollectError::NotADirectory(path.into()));
    }

    Ok(())
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Collection error types.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Root or location does not exist.
    #[error("{:?} does not exist", .0.display())]
    NotFound(PathBuf),

    /// Root or location is not a directory.
    #[error("{:?} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Location is not part of the notes tree.
    #[error("{:?} is not under notes root {:?}", location.display(), root.display())]
    OutsideRoot { location: PathBuf, root: PathBuf },

    /// Record identity cannot be derived.
    #[error(transparent)]
    Identity(ParseError),
}

/// Friendly result alias :3
type Result<T, E = CollectError> = std::result::Result<T, E>;
