use serde::Deserialize;
use crate::core::error::Result;
use crate::core::types::FieldId;

/// How the free-text engine treats query tokens after the first one that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    /// Stop as soon as one token has been folded into a non-empty result.
    #[default]
    FirstMatch,
    /// Keep folding every token; tokens that match nothing are skipped.
    AllTokens,
}

/// Engine configuration, passed explicitly into every component that needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Exact values longer than this (in graphemes) are truncated before indexing
    #[serde(default = "default_max_value_len")]
    pub max_value_len: usize,

    #[serde(default = "default_multi_value_delimiter")]
    pub multi_value_delimiter: char,

    /// Separator used when a path facet is filtered through a plain string value
    #[serde(default = "default_path_separator")]
    pub path_separator: char,

    /// Max span of a numeric bucket before a new bucket is started
    #[serde(default = "default_bucket_max_size")]
    pub bucket_max_size: f64,

    #[serde(default = "default_token_delimiters")]
    pub token_delimiters: String,

    /// Multi-character split patterns, matched case-insensitively
    #[serde(default)]
    pub split_patterns: Vec<String>,

    /// Tokens processed per document or query
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_prefix_candidates")]
    pub prefix_candidates: usize,

    #[serde(default = "default_fuzzy_candidates")]
    pub fuzzy_candidates: usize,

    /// Drop fuzzy candidates sharing less than half of the token's characters
    #[serde(default)]
    pub strict_fuzzy: bool,

    /// Facets whose values feed the free-text index
    #[serde(default)]
    pub free_text_fields: Vec<FieldId>,

    #[serde(default)]
    pub text_match: TextMatchMode,

    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_max_value_len() -> usize { 64 }
fn default_multi_value_delimiter() -> char { ';' }
fn default_path_separator() -> char { '/' }
fn default_bucket_max_size() -> f64 { 100.0 }
fn default_token_delimiters() -> String { " \t\r\n,.;:!?\"'()[]{}<>|/\\*+=&#".to_string() }
fn default_max_tokens() -> usize { 128 }
fn default_prefix_candidates() -> usize { 50 }
fn default_fuzzy_candidates() -> usize { 3 }
fn default_worker_threads() -> usize { num_cpus::get() }

impl Default for Config {
    fn default() -> Self {
        Config {
            max_value_len: default_max_value_len(),
            multi_value_delimiter: default_multi_value_delimiter(),
            path_separator: default_path_separator(),
            bucket_max_size: default_bucket_max_size(),
            token_delimiters: default_token_delimiters(),
            split_patterns: Vec::new(),
            max_tokens: default_max_tokens(),
            prefix_candidates: default_prefix_candidates(),
            fuzzy_candidates: default_fuzzy_candidates(),
            strict_fuzzy: false,
            free_text_fields: Vec::new(),
            text_match: TextMatchMode::default(),
            worker_threads: default_worker_threads(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_free_text_fields(mut self, fields: Vec<FieldId>) -> Self {
        self.free_text_fields = fields;
        self
    }
}
