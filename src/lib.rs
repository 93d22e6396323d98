//! buildtrack: construction progress tracking.
//!
//! A project is split into phases of tasks with photo evidence, plus a
//! ledger of payment milestones. The whole project is persisted as one JSON
//! document, either in a local snapshot file or behind the HTTP API served
//! by [`web`].

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod settings;
pub mod tracker;
pub mod web;

#[cfg(all(test, feature = "libsql"))]
pub(crate) mod testing;
