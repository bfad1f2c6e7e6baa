//! Value objects and algorithms
//!
//! - `codec`: content hashing and compressed stream transfer
//! - `commit`: the immutable snapshot record and its manifest naming
//! - `diff`: classification of local changes against a reference commit
//! - `ignore`: gitignore-style pattern matching for tree walks
//! - `share`: the `user@host:port#path` descriptor grammar

pub mod codec;
pub mod commit;
pub mod diff;
pub mod ignore;
pub mod share;
