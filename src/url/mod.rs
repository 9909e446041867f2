//! URL handling module
//!
//! This module provides URL canonicalization and origin comparison. A
//! [`CanonicalUrl`] is the identity key used by the frontier and the visit
//! ledger; it can only be produced by [`canonicalize`].

mod canonical;
mod origin;

// Re-export main functions
pub use canonical::{canonicalize, CanonicalUrl};
pub use origin::{same_origin, Origin, OriginPolicy};
