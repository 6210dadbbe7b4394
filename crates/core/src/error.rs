use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynopsisError {
    #[error("Submission failed: {reason}")]
    SubmissionFailed { reason: String },

    #[error("Status poll failed for job {job_id}: {reason}")]
    PollFailed { job_id: String, reason: String },

    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("Fetching results failed for job {job_id}: {reason}")]
    FetchFailed { job_id: String, reason: String },

    #[error("Results for job {job_id} are not available yet")]
    ResultsUnavailable { job_id: String },

    #[error("{format} export failed: {reason}")]
    ExportFailed { format: String, reason: String },

    #[error("Translation failed: {reason}")]
    TranslationFailed { reason: String },

    #[error("Polling for job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("Storage error for key {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("Invalid configuration: {var} {reason}")]
    InvalidConfig { var: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

impl SynopsisError {
    /// Short, user-facing message stored on the result store when an
    /// operation aborts.
    pub fn short_message(&self) -> String {
        match self {
            SynopsisError::SubmissionFailed { .. } => "Could not submit the job".to_string(),
            SynopsisError::PollFailed { .. } => "Lost track of the job status".to_string(),
            SynopsisError::JobFailed { reason, .. } => format!("Processing failed: {reason}"),
            SynopsisError::FetchFailed { .. } | SynopsisError::ResultsUnavailable { .. } => {
                "Could not load the results".to_string()
            }
            SynopsisError::ExportFailed { format, .. } => format!("Could not export {format}"),
            SynopsisError::Cancelled { .. } => "Processing was cancelled".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SynopsisError>;
