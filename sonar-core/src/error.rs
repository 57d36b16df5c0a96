use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid job id '{0}'")]
    InvalidJobId(String),

    #[error("Job {0} did not finish: {1}")]
    JobFailed(String, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
