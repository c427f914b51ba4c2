// Stored entity types
//
// Every entity is created exactly once by the import pipeline and treated
// as immutable by the query side.

pub mod country;
pub mod holiday;
pub mod language;
pub mod ounit;
pub mod subdivision;

pub use country::Country;
pub use holiday::{Holiday, HolidayType, TypeFamily};
pub use language::Language;
pub use ounit::OUnit;
pub use subdivision::Subdivision;
