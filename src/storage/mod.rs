//! Fixture storage module.
//!
//! Writes keys, encrypted keys and certificate dumps to an output directory,
//! and reads certificates back for verification.

pub mod external;
pub mod writer;
