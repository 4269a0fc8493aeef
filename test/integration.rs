// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::NotesFixture;

use folio::{
    collect::Collector,
    config::Configuration,
    document::DocumentKind,
    reconcile::{reconcile_collection, ReconcileError},
    record::{file::FileRecord, Record},
    store::{RecordStore, TomlStore},
};

use anyhow::Result;
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use std::fs::remove_file;

fn collector(fixture: &NotesFixture) -> Collector {
    Collector::new(fixture.root()).current_year(2024)
}

/// Tree that satisfies every built-in rule.
fn clean_tree(fixture: &NotesFixture) -> Result<()> {
    fixture.root_file("personal")?;
    fixture.document("personal/health.md", DocumentKind::Note, "Health")?;
    fixture.document("personal/money.md", DocumentKind::Note, "Money")?;
    fixture.root_file("purpose")?;
    fixture.document("purpose/essays/on_time.md", DocumentKind::Essay, "On time")?;
    fixture.document("thoughts/2024.01_Thoughts.md", DocumentKind::Thoughts, "2024.01 Thoughts")?;
    fixture.document(
        "thoughts/2021/2021.05_Thoughts.md",
        DocumentKind::Thoughts,
        "2021.05 Thoughts",
    )?;
    fixture.root_file("studies")?;
    fixture.root_file("studies/philosophy")?;
    fixture.document("studies/philosophy/republic.md", DocumentKind::Study, "Republic")?;
    fixture.document("archive/archived_old.md", DocumentKind::Note, "Old")?;

    Ok(())
}

fn titles(records: &[FileRecord]) -> Vec<String> {
    let mut titles = records.iter().map(|record| record.title().to_string()).collect::<Vec<_>>();
    titles.sort();
    titles
}

#[test]
fn collect_and_reconcile_clean_tree() -> Result<()> {
    let fixture = NotesFixture::new()?;
    clean_tree(&fixture)?;

    let result = collector(&fixture).collect(fixture.root())?;
    assert_eq!(result.errors(), [] as [String; 0]);
    assert_eq!(result.records().len(), 12);

    let mut store = TomlStore::<FileRecord>::open(fixture.store())?;
    let first = reconcile_collection(&mut store, result)?;
    assert_eq!(first.created.len(), 12);

    let store = TomlStore::<FileRecord>::open(fixture.store())?;
    assert_eq!(store.count()?, 12);

    Ok(())
}

#[test]
fn recollection_tracks_tree_changes() -> Result<()> {
    let fixture = NotesFixture::new()?;
    clean_tree(&fixture)?;

    let mut store = TomlStore::<FileRecord>::open(fixture.store())?;
    reconcile_collection(&mut store, collector(&fixture).collect(fixture.root())?)?;

    let again = reconcile_collection(&mut store, collector(&fixture).collect(fixture.root())?)?;
    assert!(!again.has_changes());
    assert_eq!(again.unchanged.len(), 12);

    fixture.touch("personal/health.md")?;
    remove_file(fixture.path("personal/money.md"))?;
    fixture.document("personal/sleep.md", DocumentKind::Note, "Sleep")?;

    let changes = reconcile_collection(&mut store, collector(&fixture).collect(fixture.root())?)?;
    assert_eq!(titles(&changes.created), ["Sleep"]);
    assert_eq!(titles(&changes.updated), ["Health"]);
    assert_eq!(titles(&changes.deleted), ["Money"]);
    assert_eq!(changes.unchanged.len(), 10);

    let store = TomlStore::<FileRecord>::open(fixture.store())?;
    assert_eq!(store.count()?, 12);

    Ok(())
}

#[test]
fn one_bad_directory_withholds_every_record() -> Result<()> {
    let fixture = NotesFixture::new()?;
    clean_tree(&fixture)?;
    fixture.document("recipes/bread.md", DocumentKind::Note, "Bread")?;

    let result = collector(&fixture).collect(fixture.root())?;
    assert_eq!(
        result.errors(),
        [r#"Directory "recipes" must contain only one root file."#]
    );
    assert!(result.records().is_empty());

    let mut store = TomlStore::<FileRecord>::open(fixture.store())?;
    let error = reconcile_collection(&mut store, result).unwrap_err();
    assert!(matches!(error, ReconcileError::Precondition { errors: 1 }));
    assert!(!store.table_path().exists());

    Ok(())
}

#[test]
fn yearly_directory_rejects_stale_file() -> Result<()> {
    let fixture = NotesFixture::new()?;
    fixture.write(
        "thoughts/2019_Notes.md",
        indoc! {r#"
            ## Old notes
            `[thoughts_file]`
        "#},
    )?;

    let result = collector(&fixture).collect(fixture.root())?;
    let expect = concat!(
        r#"Directory "thoughts"'s files must be prefixed with the current year 2024, "#,
        r#"not "2019_Notes.md"."#
    );
    assert!(result.errors().iter().any(|error| error == expect));

    Ok(())
}

#[test]
fn deep_study_directories_inherit_subdirectory_rules() -> Result<()> {
    let fixture = NotesFixture::new()?;
    fixture.root_file("studies")?;
    fixture.root_file("studies/philosophy")?;
    fixture.document("studies/philosophy/republic.md", DocumentKind::Study, "Republic")?;
    fixture.root_file("studies/philosophy/greek")?;
    fixture.document("studies/philosophy/greek/essay.md", DocumentKind::Essay, "Essay")?;

    let result = collector(&fixture).collect(fixture.root())?;
    assert_eq!(
        result.errors(),
        [r#"Directory "greek" should only contain "root_file", "study_file" files."#]
    );

    Ok(())
}

#[test]
fn configured_rules_and_noise_apply() -> Result<()> {
    let fixture = NotesFixture::new()?;
    fixture.document("recipes/bread.md", DocumentKind::Note, "Bread")?;
    fixture.write("recipes/bread.md~", "")?;

    let config: Configuration = formatdoc! {r#"
            [settings]
            notes_directory = "{}"
            noise = ["*~"]

            [[rule]]
            path = "recipes"
            own = [{{ check = "no_root_file" }}, {{ check = "notes_only" }}]
        "#,
        fixture.root().display()
    }
    .parse()?;

    let result = Collector::new(&config.settings.notes_directory)
        .rules(config.rule_book())
        .noise(config.noise_patterns()?)
        .current_year(2024)
        .collect(fixture.root())?;
    assert!(result.is_clean(), "{:?}", result.errors());
    assert_eq!(titles(result.records()), ["Bread", "Notes"]);
    assert!(!fixture.path("recipes/bread.md~").exists());

    Ok(())
}

#[test]
fn record_identity_survives_reopening_store() -> Result<()> {
    let fixture = NotesFixture::new()?;
    let result = collector(&fixture).collect(fixture.root())?;
    let root_record = result.records()[0].clone();

    let mut store = TomlStore::<FileRecord>::open(fixture.store())?;
    reconcile_collection(&mut store, result)?;

    let store = TomlStore::<FileRecord>::open(fixture.store())?;
    let found = store.find(root_record.id())?.expect("root record is stored");
    assert_eq!(found.path(), fixture.path("_notes.md"));
    assert_eq!(found.kind(), DocumentKind::Root);

    Ok(())
}
