pub mod results;
pub mod trie;
pub mod markov;
pub mod fuzzy;
pub mod free_text;
