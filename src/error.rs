use thiserror::Error;

/// Possible errors that arise due to issues with the sample or request passed to the pursuer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EppError {
    #[error("The sample provided has no events")]
    EmptySample,
    #[error("The sample provided has no measurements")]
    NoMeasurements,
    #[error("Sample data has the wrong shape: {0}")]
    WrongDimension(String),
    #[error("Subset mask does not match the sample: {0}")]
    SubsetLength(String),
    #[error("Censor mask does not match the sample: {0}")]
    CensorLength(String),
}
