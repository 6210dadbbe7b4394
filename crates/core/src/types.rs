use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle position of a job as reported by the backend.
///
/// Unknown labels (`downloading`, `transcribing`, ...) are kept verbatim as
/// non-terminal stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Initializing,
    Queued,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    pub fn label(&self) -> &str {
        match self {
            Stage::Initializing => "initializing",
            Stage::Queued => "queued",
            Stage::Running => "running",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
            Stage::Other(label) => label,
        }
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "initializing" => Stage::Initializing,
            "queued" | "pending" => Stage::Queued,
            "running" | "processing" => Stage::Running,
            "completed" => Stage::Completed,
            "failed" => Stage::Failed,
            _ => Stage::Other(value),
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.label().to_string()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize a backend progress value to a 0-100 percentage.
///
/// Integers are percentages. Floats within `0.0..=1.0` are fractions, larger
/// floats are percentages.
pub fn normalize_progress(value: &serde_json::Number) -> u8 {
    if let Some(pct) = value.as_u64() {
        return pct.min(100) as u8;
    }
    if value.as_i64().is_some() {
        return 0;
    }

    let raw = value.as_f64().unwrap_or(0.0);
    let pct = if (0.0..=1.0).contains(&raw) {
        raw * 100.0
    } else {
        raw
    };
    pct.round().clamp(0.0, 100.0) as u8
}

fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(value.as_ref().map(normalize_progress).unwrap_or(0))
}

/// One status poll response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(alias = "status")]
    pub stage: Stage,
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(stage: Stage, progress: u8) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            logs: Vec::new(),
            error: None,
        }
    }

    /// Reason reported for a failed job, falling back to the last log line.
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.logs.last().cloned())
            .unwrap_or_else(|| "backend reported failure".to_string())
    }
}

/// A submitted job tracked on the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub stage: Stage,
    pub progress: u8,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: Stage::Initializing,
            progress: 0,
        }
    }
}

/// Kind of user input a job was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Url,
    File,
    Text,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Url => "url",
            InputKind::File => "file",
            InputKind::Text => "text",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summaries {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub detailed: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    /// Per-model summaries, keyed by model name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(alias = "start")]
    pub start_seconds: f64,
    #[serde(alias = "end")]
    pub end_seconds: f64,
    #[serde(default)]
    pub content: String,
}

impl Chapter {
    pub fn is_valid(&self) -> bool {
        self.start_seconds < self.end_seconds
    }

    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start_seconds && seconds < self.end_seconds
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizKind {
    #[default]
    #[serde(rename = "mcq")]
    Mcq,
    #[serde(rename = "true-false", alias = "true_false")]
    TrueFalse,
}

/// Expected answer: an option text for MCQ, a boolean for true/false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Truth(bool),
    Choice(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Truth(true) => f.write_str("True"),
            Answer::Truth(false) => f.write_str("False"),
            Answer::Choice(choice) => f.write_str(choice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(default)]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default)]
    pub kind: QuizKind,
}

impl QuizQuestion {
    /// Check a user's choice. MCQ accepts the option text or its letter
    /// (`A`, `B`, ...); true/false accepts `true`/`false` in any case.
    pub fn is_correct(&self, choice: &str) -> bool {
        let choice = choice.trim();
        match &self.correct_answer {
            Answer::Truth(expected) => choice
                .parse::<bool>()
                .or_else(|_| choice.to_ascii_lowercase().parse::<bool>())
                .map(|given| given == *expected)
                .unwrap_or(false),
            Answer::Choice(expected) => {
                let picked = option_for_letter(&self.options, choice).unwrap_or(choice);
                picked.trim().eq_ignore_ascii_case(expected.trim())
            }
        }
    }
}

fn option_for_letter<'a>(options: &'a [String], choice: &str) -> Option<&'a str> {
    let mut chars = choice.chars();
    let letter = chars.next()?;
    if chars.next().is_some() || !letter.is_ascii_alphabetic() {
        return None;
    }
    let index = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
    options.get(index).map(String::as_str)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub mcq: Vec<QuizQuestion>,
    #[serde(default)]
    pub true_false: Vec<QuizQuestion>,
}

impl Quiz {
    /// Assign kinds from the owning list and ids to questions that lack one.
    pub fn normalize(&mut self) {
        for (i, q) in self.mcq.iter_mut().enumerate() {
            q.kind = QuizKind::Mcq;
            if q.id.trim().is_empty() {
                q.id = format!("mcq-{}", i + 1);
            }
        }
        for (i, q) in self.true_false.iter_mut().enumerate() {
            q.kind = QuizKind::TrueFalse;
            q.options.clear();
            if q.id.trim().is_empty() {
                q.id = format!("tf-{}", i + 1);
            }
        }
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuizQuestion> {
        self.mcq.iter().chain(self.true_false.iter())
    }

    pub fn find(&self, id: &str) -> Option<&QuizQuestion> {
        self.questions().find(|q| q.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.mcq.is_empty() && self.true_false.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(alias = "sentiment")]
    pub overall: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub emotions: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detailed_emotions: BTreeMap<String, f64>,
}

/// Everything the backend returns for a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    #[serde(default)]
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub summaries: Summaries,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub quiz: Quiz,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
}

impl ResultBundle {
    /// Order chapters by start, drop chapters with an empty time range and
    /// fill in quiz ids.
    pub fn normalize(&mut self) {
        let before = self.chapters.len();
        self.chapters.retain(Chapter::is_valid);
        let dropped = before - self.chapters.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped chapters with start >= end");
        }
        self.chapters
            .sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        self.quiz.normalize();
    }
}

/// Durable record of a past job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default)]
    pub favorite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_accepts_status_key_and_fractional_progress() {
        let status: JobStatus =
            serde_json::from_value(json!({"status": "transcribing", "progress": 0.6})).unwrap();
        assert_eq!(status.stage, Stage::Other("transcribing".to_string()));
        assert_eq!(status.progress, 60);
        assert!(!status.stage.is_terminal());
    }

    #[test]
    fn progress_normalization() {
        let cases = [(json!(40), 40), (json!(1.0), 100), (json!(250), 100), (json!(-3), 0)];
        for (raw, expected) in cases {
            let status: JobStatus =
                serde_json::from_value(json!({"stage": "running", "progress": raw})).unwrap();
            assert_eq!(status.progress, expected);
        }

        let missing: JobStatus = serde_json::from_value(json!({"stage": "queued"})).unwrap();
        assert_eq!(missing.progress, 0);
        assert_eq!(missing.stage, Stage::Queued);
    }

    #[test]
    fn stage_round_trips_through_its_label() {
        assert_eq!(String::from(Stage::Completed), "completed");
        assert_eq!(Stage::from("FAILED".to_string()), Stage::Failed);
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Running.is_terminal());
    }

    #[test]
    fn failure_reason_prefers_error_then_logs() {
        let mut status = JobStatus::new(Stage::Failed, 20);
        assert_eq!(status.failure_reason(), "backend reported failure");
        status.logs = vec!["downloading".into(), "yt-dlp exited 1".into()];
        assert_eq!(status.failure_reason(), "yt-dlp exited 1");
        status.error = Some("unsupported url".into());
        assert_eq!(status.failure_reason(), "unsupported url");
    }

    #[test]
    fn bundle_normalize_orders_chapters_and_assigns_quiz_ids() {
        let mut bundle: ResultBundle = serde_json::from_value(json!({
            "transcript": "t",
            "chapters": [
                {"title": "Second", "start": 60.0, "end": 120.0, "content": "b"},
                {"title": "Broken", "start_seconds": 90.0, "end_seconds": 90.0},
                {"title": "First", "start_seconds": 0.0, "end_seconds": 60.0, "content": "a"}
            ],
            "quiz": {
                "mcq": [{"question": "Q?", "options": ["x", "y"], "correct_answer": "y"}],
                "true_false": [{"question": "Sky is blue", "correct_answer": true}]
            },
            "sentiment": {"sentiment": "POSITIVE", "confidence": 0.9, "emotions": {"positive": 0.9}}
        }))
        .unwrap();

        bundle.normalize();

        let titles: Vec<_> = bundle.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(bundle.quiz.mcq[0].id, "mcq-1");
        assert_eq!(bundle.quiz.true_false[0].id, "tf-1");
        assert_eq!(bundle.quiz.true_false[0].kind, QuizKind::TrueFalse);
        assert_eq!(bundle.sentiment.unwrap().overall, "POSITIVE");
    }

    #[test]
    fn quiz_answers_accept_letters_and_booleans() {
        let mcq = QuizQuestion {
            id: "mcq-1".into(),
            question: "Pick".into(),
            options: vec!["red".into(), "green".into()],
            correct_answer: Answer::Choice("green".into()),
            kind: QuizKind::Mcq,
        };
        assert!(mcq.is_correct("B"));
        assert!(mcq.is_correct("Green"));
        assert!(!mcq.is_correct("a"));

        let tf = QuizQuestion {
            id: "tf-1".into(),
            question: "True?".into(),
            options: vec![],
            correct_answer: Answer::Truth(false),
            kind: QuizKind::TrueFalse,
        };
        assert!(tf.is_correct("FALSE"));
        assert!(!tf.is_correct("true"));
        assert!(!tf.is_correct("maybe"));
    }

    #[test]
    fn history_item_uses_camel_case_job_id() {
        let item = HistoryItem {
            job_id: "job_1".into(),
            timestamp: Utc::now(),
            title: "Talk".into(),
            kind: InputKind::Url,
            favorite: false,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["jobId"], "job_1");
        assert_eq!(value["type"], "url");
    }
}
