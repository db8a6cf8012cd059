//! Class configuration loading and selection.
//!
//! # Responsibility
//! - Parse the `[[class]]` list from TOML into validated `ClassConfig`s.
//! - Pick the class a request refers to, by stream name or by private text.
//!
//! # Invariants
//! - Every loaded class carries a valid scheme configuration.
//! - Stream specifiers are unique within one registry.
//!
//! `start_date` may be a native TOML date (`2023-01-02`) or the same text
//! quoted.

use crate::model::term::TermConfigError;
use crate::schedule::{SchemeConfig, ScheduleResolver};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    InvalidScheme {
        stream_specifier: String,
        source: TermConfigError,
    },
    DuplicateSpecifier(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid class config: {err}"),
            Self::InvalidScheme {
                stream_specifier,
                source,
            } => write!(f, "class `{stream_specifier}` has invalid schedule: {source}"),
            Self::DuplicateSpecifier(value) => {
                write!(f, "stream specifier `{value}` is declared more than once")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidScheme { source, .. } => Some(source),
            Self::DuplicateSpecifier(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// One class stream and how its submissions are labeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Full stream name, e.g. `Spring 2023, Math 11`.
    pub stream_name: String,
    /// Short handle, e.g. `sp23`.
    pub stream_specifier: String,
    /// Reaction name staff use to invalidate a submission.
    pub invalid_emoji: String,
    pub schedule: SchemeConfig,
}

impl ClassConfig {
    pub fn build_resolver(&self) -> Result<Box<dyn ScheduleResolver>, ConfigError> {
        self.schedule
            .build()
            .map_err(|source| ConfigError::InvalidScheme {
                stream_specifier: self.stream_specifier.clone(),
                source,
            })
    }
}

#[derive(Deserialize)]
struct ClassFile {
    #[serde(default, rename = "class")]
    classes: Vec<ClassConfig>,
}

/// All configured classes.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassConfig>,
}

impl ClassRegistry {
    /// Validates and wraps already-parsed classes.
    pub fn new(classes: Vec<ClassConfig>) -> Result<Self, ConfigError> {
        let mut specifiers = BTreeSet::new();
        for class in &classes {
            class
                .schedule
                .validate()
                .map_err(|source| ConfigError::InvalidScheme {
                    stream_specifier: class.stream_specifier.clone(),
                    source,
                })?;
            if !specifiers.insert(class.stream_specifier.as_str()) {
                return Err(ConfigError::DuplicateSpecifier(
                    class.stream_specifier.clone(),
                ));
            }
        }
        Ok(Self { classes })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ClassFile = toml::from_str(text)?;
        Self::new(file.classes)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&text)?;
        info!(
            "event=config_load module=config status=ok classes={} path={}",
            registry.classes.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn classes(&self) -> &[ClassConfig] {
        &self.classes
    }

    pub fn by_specifier(&self, specifier: &str) -> Option<&ClassConfig> {
        self.classes
            .iter()
            .find(|class| class.stream_specifier == specifier)
    }

    /// Class whose stream is exactly `stream_name`.
    pub fn match_stream(&self, stream_name: &str) -> Option<&ClassConfig> {
        self.classes
            .iter()
            .find(|class| class.stream_name == stream_name)
    }

    /// Class mentioned in free private-message text.
    ///
    /// The text is minimized first; a class matches when it contains the
    /// class specifier or the minimized stream name. Returns the class and
    /// the minimized text with that mention removed.
    pub fn match_private(&self, text: &str) -> Option<(&ClassConfig, String)> {
        let content = minimize(text);
        for class in &self.classes {
            let names = [class.stream_specifier.to_lowercase(), minimize(&class.stream_name)];
            for name in names.iter().filter(|name| !name.is_empty()) {
                if content.contains(name.as_str()) {
                    let rest = content.replace(name.as_str(), "").trim().to_string();
                    return Some((class, rest));
                }
            }
        }
        None
    }
}

/// Lowercases, strips ASCII punctuation and trims surrounding whitespace.
pub fn minimize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .trim()
        .to_string()
}
