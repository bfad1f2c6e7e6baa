//! quill: a minimal version-control tool that stores history as
//! content-addressed objects on a remote filesystem, with commits pulled
//! and pushed as small manifest files. One user, one working directory,
//! one remote; no branches, no merges.

pub mod areas;
pub mod artifacts;
pub mod remote;
