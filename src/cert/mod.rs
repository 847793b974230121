//! Certificate generation module.
//!
//! This module provides X.509 certificate generation following a two-level CA
//! hierarchy: a self-signed root, an intermediate signed by the root, and
//! end-entity certificates signed by the intermediate.

pub mod builder;
pub mod ca;
pub mod chain;
pub mod entity;
pub mod intermediate;
pub mod loader;
pub mod x509_signing;
