use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{Error, ExprResult};

/// Engine-wide settings. Everything here is read once when an
/// [`Engine`](crate::Engine) is built and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Function names that clash with host keywords. A lookup key equal to
    /// one of these gets a trailing `_`.
    #[serde(default = "default_reserved_words")]
    pub reserved_words: Vec<String>,

    /// `chrono` patterns tried, in order, after the ISO-8601 forms fail.
    #[serde(default = "default_datetime_formats")]
    pub datetime_formats: Vec<String>,

    /// Regex used by the word functions to split text into words.
    #[serde(default = "default_word_separator")]
    pub word_separator: String,

    #[serde(default = "default_template_cache_capacity")]
    pub template_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reserved_words: default_reserved_words(),
            datetime_formats: default_datetime_formats(),
            word_separator: default_word_separator(),
            template_cache_capacity: default_template_cache_capacity(),
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ExprResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ExprResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

// デフォルト値の定義
const RESERVED_WORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

fn default_reserved_words() -> Vec<String> {
    RESERVED_WORDS.iter().map(|w| w.to_string()).collect()
}

fn default_datetime_formats() -> Vec<String> {
    vec!["%d-%m-%Y %H:%M:%S".to_string()]
}

fn default_word_separator() -> String {
    r"[\s\p{P}\p{S}]+".to_string()
}

fn default_template_cache_capacity() -> usize {
    1024
}
