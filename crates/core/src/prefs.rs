use std::{fmt, str::FromStr};

use crate::{
    error::{Result, SynopsisError},
    kv::{KeyValueStore, LANGUAGE_KEY, THEME_KEY},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = SynopsisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(SynopsisError::Storage {
                key: THEME_KEY.to_string(),
                reason: format!("unknown theme {other:?}"),
            }),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences persisted next to the job history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            language: "en".to_string(),
        }
    }
}

impl Preferences {
    /// Load saved preferences. Unknown or missing values fall back to the
    /// defaults.
    pub fn load(kv: &dyn KeyValueStore) -> Result<Self> {
        let mut prefs = Self::default();

        if let Some(theme) = kv.get(THEME_KEY)? {
            match theme.parse() {
                Ok(theme) => prefs.theme = theme,
                Err(e) => tracing::warn!(error = %e, "Ignoring saved theme"),
            }
        }
        if let Some(language) = kv.get(LANGUAGE_KEY)? {
            let language = language.trim();
            if !language.is_empty() {
                prefs.language = language.to_string();
            }
        }

        Ok(prefs)
    }

    pub fn save(&self, kv: &dyn KeyValueStore) -> Result<()> {
        kv.set(THEME_KEY, self.theme.as_str())?;
        kv.set(LANGUAGE_KEY, &self.language)
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
        self.theme
    }
}
