use regex::Regex;
use crate::analysis::token::Token;
use crate::core::error::Result;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Splits on single delimiter characters and on configured multi-character
/// patterns (case-insensitive).
#[derive(Clone)]
pub struct DelimiterTokenizer {
    pub delimiters: Vec<char>,
    pub split_patterns: Option<Regex>,
}

impl DelimiterTokenizer {
    pub fn new(delimiters: &str, split_patterns: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = split_patterns.iter()
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(p))
            .collect();
        let split_patterns = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?)
        };

        Ok(DelimiterTokenizer {
            delimiters: delimiters.chars().collect(),
            split_patterns,
        })
    }

    fn is_delimiter(&self, c: char) -> bool {
        c.is_whitespace() || self.delimiters.contains(&c)
    }
}

impl Default for DelimiterTokenizer {
    fn default() -> Self {
        DelimiterTokenizer {
            delimiters: " \t\r\n,.;:!?\"'()[]{}".chars().collect(),
            split_patterns: None,
        }
    }
}

impl Tokenizer for DelimiterTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let segments: Vec<&str> = match &self.split_patterns {
            Some(re) => re.split(text).collect(),
            None => vec![text],
        };

        let mut tokens = Vec::new();
        let mut position = 0u32;
        for segment in segments {
            for word in segment.split(|c: char| self.is_delimiter(c)) {
                if word.is_empty() {
                    continue;
                }
                // both are slices of `text`
                let offset = word.as_ptr() as usize - text.as_ptr() as usize;
                tokens.push(Token::new(word, position, offset));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "delimiter"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}
