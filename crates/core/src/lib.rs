//! Domain logic for the accessibility image scanner.
//!
//! Everything in this crate is pure with respect to persistence: the
//! extractor and classifier read from a [`content::ContentRepository`]
//! and return values; nothing here touches the scan store.

pub mod classify;
pub mod content;
pub mod error;
pub mod export;
pub mod extract;
pub mod hashing;
pub mod types;
