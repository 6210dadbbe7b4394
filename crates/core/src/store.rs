use std::collections::BTreeMap;

use crate::types::{Chapter, Job, JobStatus, ResultBundle, Stage};

/// In-memory state of the active job.
///
/// Every update names the job it belongs to; updates for any other job are
/// dropped, so a late response from a superseded job never leaks into the
/// current one.
#[derive(Debug, Default)]
pub struct ResultStore {
    job: Option<Job>,
    results: Option<ResultBundle>,
    processing: bool,
    error: Option<String>,
    answers: BTreeMap<String, bool>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `job_id` the active job, discarding everything about the
    /// previous one.
    pub fn begin(&mut self, job_id: &str) {
        self.job = Some(Job::new(job_id));
        self.results = None;
        self.error = None;
        self.answers.clear();
        self.processing = true;
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.job.as_ref().is_some_and(|job| job.id == job_id)
    }

    /// Whether results may be fetched for `job_id`.
    pub fn is_completed(&self, job_id: &str) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| job.id == job_id && job.stage == Stage::Completed)
    }

    /// Apply a poll response. Returns `false` when it was ignored.
    pub fn apply_status(&mut self, job_id: &str, status: &JobStatus) -> bool {
        let Some(job) = self.job.as_mut().filter(|job| job.id == job_id) else {
            tracing::debug!(job_id, "Ignoring status for inactive job");
            return false;
        };
        if job.stage.is_terminal() {
            tracing::debug!(job_id, stage = %job.stage, "Ignoring status after terminal stage");
            return false;
        }

        job.stage = status.stage.clone();
        job.progress = if status.stage == Stage::Completed {
            100
        } else {
            status.progress
        };
        true
    }

    /// Store fetched results. Returns `false` when the job is not the active,
    /// completed job.
    pub fn apply_results(&mut self, job_id: &str, bundle: ResultBundle) -> bool {
        if !self.is_completed(job_id) {
            tracing::debug!(job_id, "Ignoring results for inactive or unfinished job");
            return false;
        }
        self.results = Some(bundle);
        true
    }

    pub fn results(&self) -> Option<&ResultBundle> {
        self.results.as_ref()
    }

    /// Cache a translation of the transcript on the active job's results.
    pub fn add_translation(&mut self, job_id: &str, lang: &str, text: &str) -> bool {
        if !self.is_active(job_id) {
            return false;
        }
        match self.results.as_mut() {
            Some(bundle) => {
                bundle.translations.insert(lang.to_string(), text.to_string());
                true
            }
            None => false,
        }
    }

    pub fn processing(&self) -> bool {
        self.processing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record a user-facing error and stop the progress indicator.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.processing = false;
    }

    pub fn finish(&mut self) {
        self.processing = false;
    }

    /// Score an answer. Only the first answer per question counts; repeated
    /// answers return the recorded verdict. `None` for unknown questions or
    /// when no results are loaded.
    pub fn answer(&mut self, question_id: &str, choice: &str) -> Option<bool> {
        if let Some(verdict) = self.answers.get(question_id) {
            return Some(*verdict);
        }

        let question = self.results.as_ref()?.quiz.find(question_id)?;
        let verdict = question.is_correct(choice);
        self.answers.insert(question_id.to_string(), verdict);
        Some(verdict)
    }

    /// `(correct, answered)` across the current quiz.
    pub fn score(&self) -> (usize, usize) {
        let correct = self.answers.values().filter(|v| **v).count();
        (correct, self.answers.len())
    }

    /// Chapter playing at `seconds`, with its index.
    pub fn chapter_at(&self, seconds: f64) -> Option<(usize, &Chapter)> {
        self.results
            .as_ref()?
            .chapters
            .iter()
            .enumerate()
            .find(|(_, chapter)| chapter.contains(seconds))
    }
}
