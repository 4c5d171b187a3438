//! `billquill-numbering` — tenant-scoped sequential document numbers.
//!
//! Numbers are human-readable (`QT-001`, `INV-00042`) and strictly sequential
//! per tenant and document kind. Allocation goes through an atomic
//! increment-and-return counter so two concurrent creations can never observe
//! the same base value.

pub mod number;
pub mod sequence;

pub use number::{DocumentKind, DocumentNumber};
pub use sequence::{InMemorySequences, SequenceProvider};
