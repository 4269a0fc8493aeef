// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directory rule resolution.
//!
//! The notes tree is not free-form. Each directory must obey a __rule set__
//! chosen by its path relative to the notes root, e.g., `purpose/essays` may
//! only hold essays, and `thoughts` must be partitioned by year.
//!
//! # Rule Sets
//!
//! A rule set is a pair of validator lists:
//!
//! - __Own__ validators apply to the directory whose path matches the rule
//!   exactly.
//! - __Subdirectory__ validators apply to every descendant of that directory
//!   that has no more specific rule of its own.
//!
//! Two baseline validators are always appended to both lists: the directory
//! must contain at least one file, and every file must be a markdown document.
//!
//! # Resolution
//!
//! Resolution tries successively shorter prefixes of a directory's relative
//! path. The first prefix with a registered rule set wins. An exact match
//! selects that rule set's own validators, while an ancestor match selects
//! its subdirectory validators. The notes root itself always uses the root
//! rule set, and any directory with no matching prefix at all uses the
//! default rule set.

pub mod validator;

use crate::{collect::directory::Directory, document::DocumentKind};
use validator::{Context, Validator};

use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Validators every rule set carries.
const BASELINE: [Validator; 2] = [Validator::HasFiles, Validator::MarkdownOnly];

/// Validators for a directory and its descendants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    own: Vec<Validator>,
    subdirectory: Vec<Validator>,
}

impl RuleSet {
    /// Construct new rule set.
    pub fn new(
        own: impl IntoIterator<Item = Validator>,
        subdirectory: impl IntoIterator<Item = Validator>,
    ) -> Self {
        Self {
            own: with_baseline(own.into_iter().collect()),
            subdirectory: with_baseline(subdirectory.into_iter().collect()),
        }
    }

    /// Construct new rule set whose own validators also apply to descendants.
    ///
    /// Descendants get the subdirectory validators, followed by each own
    /// validator that is not already among them.
    pub fn inherited(
        own: impl IntoIterator<Item = Validator>,
        subdirectory: impl IntoIterator<Item = Validator>,
    ) -> Self {
        let own = own.into_iter().collect::<Vec<_>>();
        let mut subdirectory = subdirectory.into_iter().collect::<Vec<_>>();
        for validator in &own {
            if !subdirectory.contains(validator) {
                subdirectory.push(validator.clone());
            }
        }

        Self::new(own, subdirectory)
    }

    /// Validators for the directory matching this rule set exactly.
    pub fn own(&self) -> &[Validator] {
        self.own.as_slice()
    }

    /// Validators for descendants without a rule set of their own.
    pub fn subdirectory(&self) -> &[Validator] {
        self.subdirectory.as_slice()
    }
}

fn with_baseline(mut validators: Vec<Validator>) -> Vec<Validator> {
    for validator in BASELINE {
        if !validators.contains(&validator) {
            validators.push(validator);
        }
    }

    validators
}

/// Rule set found for a relative path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup<'a> {
    /// Matching rule set.
    pub rule_set: &'a RuleSet,

    /// Whether the full path matched rather than one of its ancestors.
    pub exact: bool,
}

impl<'a> Lookup<'a> {
    /// Validators selected by this lookup.
    pub fn validators(&self) -> &'a [Validator] {
        if self.exact {
            self.rule_set.own()
        } else {
            self.rule_set.subdirectory()
        }
    }
}

/// Mapping of relative directory paths to rule sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleBook {
    rules: BTreeMap<Vec<String>, RuleSet>,
    root: RuleSet,
    default: RuleSet,
}

impl RuleBook {
    /// Construct new rule book with no path rules.
    pub fn new(root: RuleSet, default: RuleSet) -> Self {
        Self {
            rules: BTreeMap::new(),
            root,
            default,
        }
    }

    /// Register rule set for slash-separated relative path.
    ///
    /// Replaces any rule set already registered for the same path.
    pub fn insert(&mut self, path: impl AsRef<str>, rule_set: RuleSet) -> Option<RuleSet> {
        self.rules.insert(segments(path.as_ref()), rule_set)
    }

    /// Find rule set registered for path or its closest ancestor.
    ///
    /// Returns `None` for the root path, or when no prefix has a rule set.
    pub fn lookup(&self, path: &[String]) -> Option<Lookup<'_>> {
        (1..=path.len()).rev().find_map(|len| {
            self.rules.get(&path[..len]).map(|rule_set| Lookup {
                rule_set,
                exact: len == path.len(),
            })
        })
    }

    /// Resolve validators for directory at relative path.
    pub fn resolve(&self, path: &[String]) -> &[Validator] {
        if path.is_empty() {
            return self.root.own();
        }

        match self.lookup(path) {
            Some(lookup) => lookup.validators(),
            None => self.default.own(),
        }
    }

    /// Run resolved validators against directory.
    ///
    /// Takes the directory by value and returns it with every violation
    /// appended to its errors. All validators run, regardless of earlier
    /// failures.
    #[instrument(skip(self, directory, context), level = "debug")]
    pub fn validate(
        &self,
        mut directory: Directory,
        path: &[String],
        context: &Context,
    ) -> Directory {
        let validators = self.resolve(path);
        debug!("running {} validators on {:?}", validators.len(), directory.path.display());
        for validator in validators {
            let errors = validator.check(&directory, context);
            directory.errors.extend(errors);
        }

        directory
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        let root = RuleSet::new([Validator::OnlyRootFile], []);
        let default = RuleSet::inherited([Validator::ExactlyOneRootFile, Validator::NotesOnly], []);
        let essays = || {
            RuleSet::new(
                [
                    Validator::NoRootFile,
                    Validator::NoSubdirectories,
                    Validator::allowed_kinds([DocumentKind::Essay]),
                ],
                [],
            )
        };

        let mut book = Self::new(root, default);
        book.insert("purpose", RuleSet::new([Validator::ExactlyOneRootFile], []));
        book.insert("purpose/essays", essays());
        book.insert("purpose/essays_bg", essays());
        book.insert(
            "thoughts",
            RuleSet::new(
                [
                    Validator::NoRootFile,
                    Validator::CurrentYearPrefix,
                    Validator::YearNamedSubdirectories,
                    Validator::allowed_kinds([DocumentKind::Thoughts]),
                ],
                [
                    Validator::NoRootFile,
                    Validator::NoSubdirectories,
                    Validator::ParentYearPrefix,
                ],
            ),
        );
        book.insert(
            "studies",
            RuleSet::new(
                [Validator::ExactlyOneRootFile, Validator::OnlyRootFile],
                [
                    Validator::ExactlyOneRootFile,
                    Validator::allowed_kinds([DocumentKind::Root, DocumentKind::Study]),
                ],
            ),
        );
        book.insert(
            "archive",
            RuleSet::inherited(
                [
                    Validator::ArchivePrefix,
                    Validator::NoRootFile,
                    Validator::NotesOnly,
                ],
                [],
            ),
        );

        book
    }
}

/// Split slash-separated path into its non-empty segments.
pub fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(ToString::to_string)
        .collect()
}
