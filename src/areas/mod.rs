//! Stateful repository components
//!
//! - `config`: the per-working-copy configuration and its secret-store seam
//! - `history`: the local commit-manifest store (`.quill/`)
//! - `object_store`: content-addressed blob storage on the remote surface
//! - `sync`: the engine composing everything (commit, pull, checkout, clone)
//! - `workspace`: ignore-aware working-tree file system operations

pub mod config;
pub mod history;
pub mod object_store;
pub mod sync;
pub mod workspace;
