use std::{sync::Arc, time::Duration};

use crate::{
    backend::{HttpBackend, JobBackend},
    config::ClientConfig,
    error::{Result, SynopsisError},
    export::{ExportArtifact, ExportFormat, export_local},
    history::HistoryStore,
    input::{ModelOptions, SubmissionInput, snippet},
    kv::KeyValueStore,
    poll::{PollHandle, PollStopper, StatusUpdate, check_status},
    store::ResultStore,
    types::{InputKind, Job, JobStatus, ResultBundle},
};

const TITLE_CHARS: usize = 60;

struct ActiveInput {
    kind: InputKind,
    label: String,
}

/// Drives one job at a time through submit, poll, fetch, and export.
///
/// All state lives in the owned [`ResultStore`] and [`HistoryStore`] and is
/// only mutated through `&mut self`, after the awaited request returns.
pub struct JobClient {
    backend: Arc<dyn JobBackend>,
    poll_interval: Duration,
    store: ResultStore,
    history: HistoryStore,
    active_input: Option<ActiveInput>,
    active_poll: Option<PollStopper>,
}

impl JobClient {
    pub fn new(backend: Arc<dyn JobBackend>, history: HistoryStore, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            store: ResultStore::new(),
            history,
            active_input: None,
            active_poll: None,
        }
    }

    /// HTTP client against `config.api_url` with history kept in `kv`.
    pub fn from_config(config: &ClientConfig, kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let backend = HttpBackend::new(config)?;
        let history = HistoryStore::open(kv)?;
        Ok(Self::new(Arc::new(backend), history, config.poll_interval))
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ResultStore {
        &mut self.store
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn toggle_favorite(&mut self, job_id: &str) -> Result<bool> {
        self.history.toggle_favorite(job_id)
    }

    /// Surface an error as a short message on the store and pass it on.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Job operation failed");
            self.store.fail(e.short_message());
        }
        result
    }

    /// Validate and submit `input`. The new job replaces the active one and
    /// any poll chain still running for the previous job is stopped.
    pub async fn submit(&mut self, input: &SubmissionInput, options: &ModelOptions) -> Result<String> {
        if let Err(e) = input.validate() {
            return self.settle(Err(e));
        }

        self.stop_polling();
        let submitted = self.backend.submit(input, options).await;
        let job_id = self.settle(submitted)?;

        self.store.begin(&job_id);
        self.active_input = Some(ActiveInput {
            kind: input.kind,
            label: input.label(),
        });

        tracing::info!(job_id = %job_id, kind = %input.kind, models = ?options.models, "Job started");
        Ok(job_id)
    }

    /// One status request for `job_id`. A `failed` stage is returned as
    /// [`SynopsisError::JobFailed`].
    pub async fn poll_status(&mut self, job_id: &str) -> Result<JobStatus> {
        let status = self.backend.status(job_id).await;
        let status = self.settle(status)?;
        self.store.apply_status(job_id, &status);

        let outcome = check_status(job_id, status);
        self.settle(outcome)
    }

    /// Start a poll chain for `job_id`, stopping the previous one.
    pub fn start_polling(&mut self, job_id: &str) -> PollHandle {
        self.stop_polling();
        let handle = PollHandle::spawn(Arc::clone(&self.backend), job_id, self.poll_interval);
        self.active_poll = Some(handle.stopper());
        handle
    }

    pub fn stop_polling(&mut self) {
        if let Some(stopper) = self.active_poll.take() {
            stopper.stop();
        }
    }

    /// Apply a poll update; updates for any job but the active one are
    /// ignored.
    pub fn apply_update(&mut self, update: &StatusUpdate) -> bool {
        self.store.apply_status(&update.job_id, &update.status)
    }

    /// Poll until `job_id` reaches a terminal stage, reporting every applied
    /// update through `on_progress`.
    pub async fn wait_for_completion(
        &mut self,
        job_id: &str,
        mut on_progress: impl FnMut(&Job),
    ) -> Result<JobStatus> {
        let mut handle = self.start_polling(job_id);

        while let Some(update) = handle.next_update().await {
            if self.apply_update(&update) {
                if let Some(job) = self.store.job() {
                    on_progress(job);
                }
            }
        }

        let outcome = handle.join().await;
        self.active_poll = None;
        self.settle(outcome)
    }

    /// Fetch results for the active job. Only allowed once it completed.
    pub async fn fetch_results(&mut self, job_id: &str) -> Result<&ResultBundle> {
        if !self.store.is_completed(job_id) {
            return self.settle(Err(SynopsisError::ResultsUnavailable {
                job_id: job_id.to_string(),
            }));
        }

        let fetched = self.backend.result(job_id).await;
        let bundle = self.settle(fetched)?;
        tracing::info!(
            job_id,
            chapters = bundle.chapters.len(),
            questions = bundle.quiz.questions().count(),
            "Fetched results"
        );
        self.store.apply_results(job_id, bundle);

        self.store
            .results()
            .ok_or_else(|| SynopsisError::ResultsUnavailable {
                job_id: job_id.to_string(),
            })
    }

    /// Submit, poll to completion, fetch results, and record the job in
    /// history.
    pub async fn process(
        &mut self,
        input: &SubmissionInput,
        options: &ModelOptions,
        mut on_progress: impl FnMut(&Job),
    ) -> Result<&ResultBundle> {
        let job_id = self.submit(input, options).await?;
        if let Some(job) = self.store.job() {
            on_progress(job);
        }

        self.wait_for_completion(&job_id, &mut on_progress).await?;
        self.fetch_results(&job_id).await?;

        let recorded = self.record_history(&job_id);
        self.settle(recorded)?;
        self.store.finish();

        self.store
            .results()
            .ok_or_else(|| SynopsisError::ResultsUnavailable { job_id })
    }

    fn record_history(&mut self, job_id: &str) -> Result<()> {
        let Some(job) = self.store.job().filter(|job| job.id == job_id) else {
            return Ok(());
        };

        let summary = self
            .store
            .results()
            .map(|bundle| snippet(&bundle.summaries.short, TITLE_CHARS))
            .unwrap_or_default();
        let (kind, label) = match &self.active_input {
            Some(input) => (input.kind, input.label.clone()),
            None => (InputKind::Text, job_id.to_string()),
        };
        let title = if summary.is_empty() { label } else { summary };

        self.history.record(job, &title, kind)?;
        Ok(())
    }

    /// Adopt an existing job (for example from history) as the active job
    /// and poll it once.
    pub async fn refresh(&mut self, job_id: &str) -> Result<JobStatus> {
        self.stop_polling();
        self.store.begin(job_id);
        self.active_input = None;

        let status = self.poll_status(job_id).await?;
        self.store.finish();
        Ok(status)
    }

    /// Export the loaded results. PDF is rendered by the server; markdown
    /// and JSON are generated locally.
    pub async fn export_results(&mut self, format: ExportFormat) -> Result<ExportArtifact> {
        let job_id = match (self.store.job(), self.store.results()) {
            (Some(job), Some(_)) => job.id.clone(),
            _ => {
                return self.settle(Err(SynopsisError::ExportFailed {
                    format: format.to_string(),
                    reason: "no results loaded".to_string(),
                }));
            }
        };

        let artifact = match format {
            ExportFormat::Pdf => self
                .backend
                .export_pdf(&job_id)
                .await
                .map(|bytes| ExportArtifact::new(format, &job_id, bytes)),
            _ => match self.store.results() {
                Some(bundle) => export_local(&job_id, bundle, format),
                None => Err(SynopsisError::ResultsUnavailable { job_id: job_id.clone() }),
            },
        };
        self.settle(artifact)
    }

    /// Best-effort translation: any failure yields `text` unchanged.
    pub async fn translate(&self, text: &str, target_lang: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        match self.backend.translate(text, target_lang).await {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => {
                tracing::warn!(target_lang, "Empty translation, keeping original text");
                text.to_string()
            }
            Err(e) => {
                tracing::warn!(target_lang, error = %e, "Translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    /// Transcript of the loaded results in `target_lang`, reusing a
    /// translation the backend already produced. Successful translations are
    /// cached on the results.
    pub async fn translate_transcript(&mut self, target_lang: &str) -> Option<String> {
        let bundle = self.store.results()?;
        if let Some(existing) = bundle.translations.get(target_lang) {
            return Some(existing.clone());
        }

        let original = bundle.transcript.clone();
        let translated = self.translate(&original, target_lang).await;
        if translated != original {
            if let Some(job_id) = self.store.job().map(|job| job.id.clone()) {
                self.store.add_translation(&job_id, target_lang, &translated);
            }
        }
        Some(translated)
    }
}
