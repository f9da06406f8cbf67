use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct LimitFilter {
    pub max_tokens: usize,
}

impl LimitFilter {
    pub fn new(max_tokens: usize) -> Self {
        LimitFilter { max_tokens }
    }
}

impl TokenFilter for LimitFilter {
    fn filter(&self, mut tokens: Vec<Token>) -> Vec<Token> {
        tokens.truncate(self.max_tokens);
        tokens
    }

    fn name(&self) -> &str {
        "limit"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(LimitFilter::new(self.max_tokens))
    }
}
