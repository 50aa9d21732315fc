pub mod normalized;

pub use normalized::{NormalizationOutput, NormalizationReport, NormalizedFields, PhotoReport};
