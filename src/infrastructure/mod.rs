pub mod admission;
pub mod oracle;

pub use admission::{AdmissionController, AdmissionToken};
pub use oracle::{ErrorClass, OracleFailure, ScoringOracle};
