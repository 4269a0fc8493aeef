// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that folio uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::{
    path::{default_store_dir, NoWayHome},
    rules::{validator::Validator, RuleBook, RuleSet},
};

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Noise file patterns used when none are configured.
pub const DEFAULT_NOISE: &[&str] = &[".DS_Store"];

/// Folio configuration layout.
///
/// # General Layout
///
/// A configuration is composed of two basic parts: settings and rules. The
/// settings section tells folio where the notes tree and the record store
/// live. The rules section registers extra directory rules on top of the
/// built-in ones, replacing any built-in rule registered for the same path.
///
/// ```toml
/// [settings]
/// notes_directory = "$HOME/notes"
///
/// [[rule]]
/// path = "recipes"
/// own = [{ check = "exactly_one_root_file" }]
/// subdirectory = [{ check = "no_root_file" }]
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Configuration {
    /// Settings for folio.
    pub settings: Settings,

    /// Extra directory rules.
    #[serde(rename = "rule", skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleDefinition>>,
}

impl Configuration {
    /// Construct new configuration for notes tree with default settings.
    pub fn new(notes_directory: impl Into<PathBuf>) -> Self {
        Self {
            settings: Settings {
                notes_directory: notes_directory.into(),
                store_directory: None,
                noise: default_noise(),
            },
            rules: None,
        }
    }

    /// Path to record store directory.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if no store directory is
    ///   configured and the default one cannot be determined.
    pub fn store_directory(&self) -> Result<PathBuf> {
        match &self.settings.store_directory {
            Some(path) => Ok(path.clone()),
            None => Ok(default_store_dir()?),
        }
    }

    /// Compile noise file patterns.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Pattern`] if a pattern is malformed.
    pub fn noise_patterns(&self) -> Result<Vec<Pattern>> {
        self.settings
            .noise
            .iter()
            .map(|pattern| Pattern::new(pattern).map_err(ConfigError::Pattern))
            .collect()
    }

    /// Built-in rule book with configured rules layered on top.
    pub fn rule_book(&self) -> RuleBook {
        let mut book = RuleBook::default();
        for rule in self.rules.iter().flatten() {
            book.insert(&rule.path, rule.to_rule_set());
        }

        book
    }
}

impl FromStr for Configuration {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Configuration = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on directory fields.
        config.settings.notes_directory = expand(&config.settings.notes_directory)?;
        if let Some(path) = &config.settings.store_directory {
            config.settings.store_directory = Some(expand(path)?);
        }

        Ok(config)
    }
}

impl Display for Configuration {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(path: &std::path::Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

fn default_noise() -> Vec<String> {
    DEFAULT_NOISE.iter().map(ToString::to_string).collect()
}

/// Folio settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Root of the notes tree.
    pub notes_directory: PathBuf,

    /// Record store directory, `$XDG_DATA_HOME/folio-store` if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_directory: Option<PathBuf>,

    /// Glob patterns of files to delete during collection.
    #[serde(default = "default_noise")]
    pub noise: Vec<String>,
}

/// Directory rule listing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RuleDefinition {
    /// Slash-separated path relative to notes root.
    pub path: String,

    /// Validators for the directory itself.
    #[serde(default)]
    pub own: Vec<Validator>,

    /// Validators for descendants without a rule of their own.
    #[serde(default)]
    pub subdirectory: Vec<Validator>,

    /// Apply own validators to descendants as well.
    #[serde(default)]
    pub inherit: bool,
}

impl RuleDefinition {
    /// Convert into rule set.
    pub fn to_rule_set(&self) -> RuleSet {
        let own = self.own.iter().cloned();
        let subdirectory = self.subdirectory.iter().cloned();
        if self.inherit {
            RuleSet::inherited(own, subdirectory)
        } else {
            RuleSet::new(own, subdirectory)
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Noise pattern is malformed.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Default store directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::DocumentKind, rules::segments};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("NOTES", "/home/blah/notes"), ("STORE", "/home/blah/store")])]
    fn deserialize_configuration() -> anyhow::Result<()> {
        let result: Configuration = r#"
            [settings]
            notes_directory = "$NOTES"
            store_directory = "$STORE/folio"
            noise = [".DS_Store", "*.swp"]

            [[rule]]
            path = "recipes"
            own = [{ check = "exactly_one_root_file" }]
            subdirectory = [
                { check = "no_root_file" },
                { check = "allowed_kinds", kinds = ["note_file"] },
            ]
            inherit = true
        "#
        .parse()?;

        let expect = Configuration {
            settings: Settings {
                notes_directory: "/home/blah/notes".into(),
                store_directory: Some("/home/blah/store/folio".into()),
                noise: vec![".DS_Store".into(), "*.swp".into()],
            },
            rules: Some(vec![RuleDefinition {
                path: "recipes".into(),
                own: vec![Validator::ExactlyOneRootFile],
                subdirectory: vec![
                    Validator::NoRootFile,
                    Validator::allowed_kinds([DocumentKind::Note]),
                ],
                inherit: true,
            }]),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_minimal_configuration() -> anyhow::Result<()> {
        let result: Configuration = indoc! {r#"
            [settings]
            notes_directory = "/notes"
        "#}
        .parse()?;

        assert_eq!(result, Configuration::new("/notes"));
        assert_eq!(result.noise_patterns()?, vec![Pattern::new(".DS_Store")?]);

        Ok(())
    }

    #[test]
    fn deserialize_rejects_unknown_check() {
        let result = indoc! {r#"
            [settings]
            notes_directory = "/notes"

            [[rule]]
            path = "recipes"
            own = [{ check = "no_recipes" }]
        "#}
        .parse::<Configuration>();

        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialize_configuration() -> anyhow::Result<()> {
        let mut config = Configuration::new("/home/blah/notes");
        config.rules = Some(vec![RuleDefinition {
            path: "purpose/essays".into(),
            own: vec![Validator::allowed_kinds([DocumentKind::Essay])],
            ..Default::default()
        }]);

        let result = config.to_string();
        assert!(result.starts_with("[settings]\nnotes_directory = \"/home/blah/notes\"\n"));
        assert!(!result.contains("store_directory"));
        assert_eq!(result.parse::<Configuration>()?, config);

        Ok(())
    }

    #[test]
    fn configured_rules_override_built_in_rules() {
        let mut config = Configuration::new("/notes");
        config.rules = Some(vec![RuleDefinition {
            path: "thoughts".into(),
            own: vec![Validator::NoSubdirectories],
            ..Default::default()
        }]);

        let book = config.rule_book();
        assert_eq!(
            book.resolve(&segments("thoughts")),
            [Validator::NoSubdirectories, Validator::HasFiles, Validator::MarkdownOnly]
        );
        assert_eq!(
            book.resolve(&segments("purpose")),
            RuleBook::default().resolve(&segments("purpose"))
        );
    }

    #[test]
    fn malformed_noise_pattern() {
        let mut config = Configuration::new("/notes");
        config.settings.noise = vec!["[".into()];
        assert!(matches!(config.noise_patterns(), Err(ConfigError::Pattern(_))));
    }
}
