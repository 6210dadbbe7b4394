//! Synopsis Core Library
//!
//! Client for a media summarization service: submit a URL, file, or text,
//! poll the job until it finishes, then work with the transcript, summaries,
//! chapters, quiz, sentiment, and translations it produced.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod history;
pub mod input;
pub mod kv;
pub mod paths;
pub mod poll;
pub mod prefs;
pub mod store;
pub mod types;

// Re-export commonly used items at crate root
pub use backend::{HttpBackend, JobBackend};
pub use client::JobClient;
pub use config::ClientConfig;
pub use error::{Result, SynopsisError};
pub use export::{ExportArtifact, ExportFormat, export_json, export_local, save_artifact};
pub use format::{format_markdown, format_timestamp};
pub use history::HistoryStore;
pub use input::{ModelOptions, Payload, SubmissionInput};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use paths::{get_export_path, get_root_data_dir, get_state_path};
pub use poll::{PollHandle, PollStopper, StatusUpdate};
pub use prefs::{Preferences, Theme};
pub use store::ResultStore;
pub use types::{
    Answer, Chapter, HistoryItem, InputKind, Job, JobStatus, Quiz, QuizKind, QuizQuestion,
    ResultBundle, Segment, Sentiment, Stage, Summaries,
};
