//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** - they have no
/// identity of their own. A `FinancialSummary` with the same figures as another
/// is the same summary; a `Quotation` with the same fields as another is still
/// a different document.
///
/// To "modify" a value object, construct a new one. The trait only requires
/// what that implies in practice:
/// - **Clone**: values are cheap to copy around
/// - **PartialEq**: values compare by their attributes
/// - **Debug**: values show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
