use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use crate::{
    error::{Result, SynopsisError},
    format::format_markdown,
    paths::get_export_file_name,
    types::{Chapter, Quiz, ResultBundle, Sentiment, Summaries},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = SynopsisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(SynopsisError::ExportFailed {
                format: other.to_string(),
                reason: "unsupported export format".to_string(),
            }),
        }
    }
}

/// An exported document ready to be saved or displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(format: ExportFormat, job_id: &str, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: get_export_file_name(job_id, format),
            bytes,
        }
    }

    /// Text content for markdown and JSON exports.
    pub fn as_text(&self) -> Option<&str> {
        match self.format {
            ExportFormat::Pdf => None,
            _ => std::str::from_utf8(&self.bytes).ok(),
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    #[serde(rename = "jobId")]
    job_id: &'a str,
    timestamp: DateTime<Utc>,
    transcript: &'a str,
    summaries: &'a Summaries,
    chapters: &'a [Chapter],
    quiz: &'a Quiz,
    sentiment: Option<&'a Sentiment>,
    translations: &'a BTreeMap<String, String>,
}

pub fn export_json(job_id: &str, bundle: &ResultBundle, timestamp: DateTime<Utc>) -> Result<String> {
    let document = JsonExport {
        job_id,
        timestamp,
        transcript: &bundle.transcript,
        summaries: &bundle.summaries,
        chapters: &bundle.chapters,
        quiz: &bundle.quiz,
        sentiment: bundle.sentiment.as_ref(),
        translations: &bundle.translations,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Build a markdown or JSON export locally. PDF is rendered by the server.
pub fn export_local(job_id: &str, bundle: &ResultBundle, format: ExportFormat) -> Result<ExportArtifact> {
    let content = match format {
        ExportFormat::Markdown => format_markdown(bundle),
        ExportFormat::Json => export_json(job_id, bundle, Utc::now())?,
        ExportFormat::Pdf => {
            return Err(SynopsisError::ExportFailed {
                format: format.to_string(),
                reason: "pdf is rendered by the server".to_string(),
            });
        }
    };
    Ok(ExportArtifact::new(format, job_id, content.into_bytes()))
}

/// Save an export to a file
pub async fn save_artifact(artifact: &ExportArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, &artifact.bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn json_export_has_expected_top_level_keys() {
        let bundle = ResultBundle {
            transcript: "hello world".into(),
            translations: BTreeMap::from([("ta".to_string(), "வணக்கம்".to_string())]),
            ..Default::default()
        };
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let json = export_json("job_123", &bundle, ts).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["jobId"], "job_123");
        assert_eq!(value["timestamp"], "2026-01-02T03:04:05Z");
        assert_eq!(value["transcript"], "hello world");
        assert_eq!(value["translations"]["ta"], "வணக்கம்");
        assert!(value["sentiment"].is_null());
        for key in ["summaries", "chapters", "quiz"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn markdown_artifact_is_named_after_the_job() {
        let artifact = export_local("job_9", &ResultBundle::default(), ExportFormat::Markdown).unwrap();
        assert_eq!(artifact.file_name, "summary_job_9.md");
        assert!(artifact.as_text().unwrap().starts_with("# Summary Report"));
    }

    #[test]
    fn pdf_is_not_generated_locally() {
        let err = export_local("job_9", &ResultBundle::default(), ExportFormat::Pdf).unwrap_err();
        assert!(matches!(err, SynopsisError::ExportFailed { .. }));
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
