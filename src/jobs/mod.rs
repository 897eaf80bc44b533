pub mod reputation;

pub use reputation::{ReportCountSignal, ReputationJob, ReputationSignal};
