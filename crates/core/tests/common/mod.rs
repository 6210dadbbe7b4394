#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use synopsis_core::{
    Chapter, HistoryStore, JobBackend, JobClient, JobStatus, MemoryStore, ModelOptions, Payload,
    ResultBundle, Stage, SubmissionInput, Summaries, SynopsisError,
    types::{Answer, Quiz, QuizKind, QuizQuestion},
};
use tokio::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Backend stub that replays scripted status responses and echoes submitted
/// text back as the transcript.
pub struct ScriptedBackend {
    job_ids: Mutex<VecDeque<String>>,
    statuses: Mutex<VecDeque<JobStatus>>,
    last_status: Mutex<Option<JobStatus>>,
    submitted_text: Mutex<String>,
    pub calls: Mutex<Vec<String>>,
    pub status_times: Mutex<Vec<Instant>>,
    pub fail_status_requests: bool,
    pub fail_translations: bool,
}

impl ScriptedBackend {
    pub fn new(job_ids: &[&str], statuses: Vec<JobStatus>) -> Self {
        Self {
            job_ids: Mutex::new(job_ids.iter().map(|s| s.to_string()).collect()),
            statuses: Mutex::new(statuses.into()),
            last_status: Mutex::new(None),
            submitted_text: Mutex::new(String::new()),
            calls: Mutex::new(Vec::new()),
            status_times: Mutex::new(Vec::new()),
            fail_status_requests: false,
            fail_translations: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn status(stage: Stage, progress: u8) -> JobStatus {
    JobStatus::new(stage, progress)
}

pub fn failed(reason: &str) -> JobStatus {
    let mut status = JobStatus::new(Stage::Failed, 30);
    status.error = Some(reason.to_string());
    status
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(&self, input: &SubmissionInput, _options: &ModelOptions) -> synopsis_core::Result<String> {
        if let Payload::Text(text) = &input.payload {
            *self.submitted_text.lock().unwrap() = text.clone();
        }
        let job_id = self
            .job_ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "job_extra".to_string());
        self.log(format!("submit:{job_id}"));
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> synopsis_core::Result<JobStatus> {
        self.log(format!("status:{job_id}"));
        self.status_times.lock().unwrap().push(Instant::now());

        if self.fail_status_requests {
            return Err(SynopsisError::PollFailed {
                job_id: job_id.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let next = self.statuses.lock().unwrap().pop_front();
        let mut last = self.last_status.lock().unwrap();
        match next {
            Some(status) => {
                *last = Some(status.clone());
                Ok(status)
            }
            None => Ok(last
                .clone()
                .unwrap_or_else(|| JobStatus::new(Stage::Running, 0))),
        }
    }

    async fn result(&self, job_id: &str) -> synopsis_core::Result<ResultBundle> {
        self.log(format!("result:{job_id}"));
        let mut bundle = sample_bundle();
        bundle.transcript = self.submitted_text.lock().unwrap().clone();
        Ok(bundle)
    }

    async fn export_pdf(&self, job_id: &str) -> synopsis_core::Result<Vec<u8>> {
        self.log(format!("pdf:{job_id}"));
        Ok(b"%PDF-1.7 stub".to_vec())
    }

    async fn translate(&self, text: &str, target_lang: &str) -> synopsis_core::Result<String> {
        self.log(format!("translate:{target_lang}"));
        if self.fail_translations {
            return Err(SynopsisError::TranslationFailed {
                reason: "network unreachable".to_string(),
            });
        }
        Ok(format!("[{target_lang}] {text}"))
    }
}

pub fn sample_bundle() -> ResultBundle {
    ResultBundle {
        transcript: String::new(),
        summaries: Summaries {
            short: "A friendly greeting to the world".into(),
            detailed: "The speaker greets the world.".into(),
            bullets: vec!["hello".into(), "world".into()],
            ..Default::default()
        },
        chapters: vec![Chapter {
            title: "Greeting".into(),
            start_seconds: 0.0,
            end_seconds: 4.0,
            content: "hello world".into(),
        }],
        quiz: Quiz {
            mcq: vec![QuizQuestion {
                id: "mcq-1".into(),
                question: "What is greeted?".into(),
                options: vec!["the moon".into(), "the world".into()],
                correct_answer: Answer::Choice("the world".into()),
                kind: QuizKind::Mcq,
            }],
            true_false: vec![],
        },
        ..Default::default()
    }
}

pub fn client_with(backend: Arc<ScriptedBackend>) -> (Arc<MemoryStore>, JobClient) {
    let kv = Arc::new(MemoryStore::new());
    let history = HistoryStore::open(kv.clone()).unwrap();
    (kv, JobClient::new(backend, history, POLL_INTERVAL))
}
