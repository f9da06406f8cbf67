use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Lowercases and strips diacritics through a fixed substitution table.
/// Only `text` changes; `original` keeps the source spelling.
pub struct FoldingFilter;

impl FoldingFilter {
    pub fn fold(text: &str) -> String {
        let mut folded = String::with_capacity(text.len());
        for c in text.chars().flat_map(char::to_lowercase) {
            match substitute(c) {
                Some(replacement) => folded.push_str(replacement),
                None => folded.push(c),
            }
        }
        folded
    }
}

fn substitute(c: char) -> Option<&'static str> {
    let replacement = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'þ' => "th",
        _ => return None,
    };
    Some(replacement)
}

impl TokenFilter for FoldingFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                token.text = Self::fold(&token.original);
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "folding"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(FoldingFilter)
    }
}
