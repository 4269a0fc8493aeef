// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Folio keeps a structured tree of markdown notes honest.
//!
//! The notes tree is walked top-down, every document in it is recognized,
//! and every directory is checked against the rules registered for its
//! path. When the whole tree is clean, the records extracted from its
//! documents are reconciled into a persistent record store, which then
//! mirrors the tree exactly.
//!
//! The pipeline is split into the following modules:
//!
//! - [`record`] derives stable record identifiers from declared fields.
//! - [`document`] recognizes documents and extracts their records.
//! - [`rules`] resolves and runs directory rules.
//! - [`collect`] walks the notes tree.
//! - [`store`] persists records.
//! - [`reconcile`] brings the record store in line with a collection.

pub mod collect;
pub mod config;
pub mod document;
pub mod path;
pub mod reconcile;
pub mod record;
pub mod rules;
pub mod store;
