use std::path::{Path, PathBuf};

use crate::export::ExportFormat;

pub fn get_root_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("synopsis")
}

/// Default location of the persisted key-value state
pub fn get_state_path() -> PathBuf {
    get_root_data_dir().join("state.json")
}

/// File name for an exported report, safe to use as a single path component
pub fn get_export_file_name(job_id: &str, format: ExportFormat) -> String {
    let safe_id: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("summary_{}.{}", safe_id, format.extension())
}

/// Default path for an exported report inside `dir`
pub fn get_export_path(dir: &Path, job_id: &str, format: ExportFormat) -> PathBuf {
    dir.join(get_export_file_name(job_id, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_path_sanitizes_job_id() {
        let path = get_export_path(Path::new("/out"), "job/../1", ExportFormat::Markdown);
        assert_eq!(path, PathBuf::from("/out/summary_job____1.md"));
    }
}
