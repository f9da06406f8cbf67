use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::dedup::DedupFilter;
use crate::analysis::filters::folding::FoldingFilter;
use crate::analysis::filters::limit::LimitFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{DelimiterTokenizer, Tokenizer};
use crate::core::config::Config;
use crate::core::error::Result;

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Normalized, de-duplicated keys in first-seen order
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Product-search pipeline: delimiter split, fold, de-duplicate, cap
    pub fn product_search(config: &Config) -> Result<Self> {
        let tokenizer = DelimiterTokenizer::new(&config.token_delimiters, &config.split_patterns)?;
        Ok(Analyzer::new("product_search".to_string(), Box::new(tokenizer))
            .add_filter(Box::new(FoldingFilter))
            .add_filter(Box::new(DedupFilter))
            .add_filter(Box::new(LimitFilter::new(config.max_tokens))))
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}
