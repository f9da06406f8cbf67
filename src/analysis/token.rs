use serde::{Serialize, Deserialize};

/// Token representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,      // Normalized text, used as the index key
    pub original: String,  // As written in the source, kept for display
    pub position: u32,     // Position among emitted tokens
    pub offset: usize,     // Byte offset in original text
}

impl Token {
    pub fn new(original: &str, position: u32, offset: usize) -> Self {
        Token {
            text: original.to_string(),
            original: original.to_string(),
            position,
            offset,
        }
    }
}
