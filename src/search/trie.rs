use std::collections::BTreeMap;
use crate::bitmap::id_set::IdSet;
use crate::core::types::ItemId;

/// Token stored at the end of a key
#[derive(Debug, Clone)]
pub struct TrieEntry {
    /// Oldest spelling still used by an item, for display
    pub word: String,
    pub ids: IdSet,
    /// Every live spelling of the key with its items, oldest first
    spellings: Vec<(String, IdSet)>,
}

impl TrieEntry {
    fn new(word: &str, id: ItemId) -> Self {
        TrieEntry {
            word: word.to_string(),
            ids: IdSet::from_slice(&[id]),
            spellings: vec![(word.to_string(), IdSet::from_slice(&[id]))],
        }
    }

    fn add(&mut self, word: &str, id: ItemId) {
        self.ids.add(id);
        match self.spellings.iter_mut().find(|(w, _)| w == word) {
            Some((_, ids)) => ids.add(id),
            None => self.spellings.push((word.to_string(), IdSet::from_slice(&[id]))),
        }
    }

    fn remove(&mut self, id: ItemId) {
        self.ids.remove(id);
        for (_, ids) in &mut self.spellings {
            ids.remove(id);
        }
        self.spellings.retain(|(_, ids)| !ids.is_empty());
        if let Some((word, _)) = self.spellings.first() {
            if *word != self.word {
                self.word = word.clone();
            }
        }
    }
}

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    entry: Option<TrieEntry>,
}

impl TrieNode {
    fn is_dead(&self) -> bool {
        self.entry.is_none() && self.children.is_empty()
    }

    fn remove(&mut self, key: &[char], id: ItemId) -> bool {
        match key.split_first() {
            None => {
                let Some(entry) = self.entry.as_mut() else {
                    return false;
                };
                let present = entry.ids.contains(id);
                entry.remove(id);
                if entry.ids.is_empty() {
                    self.entry = None;
                }
                present
            }
            Some((c, rest)) => {
                let Some(child) = self.children.get_mut(c) else {
                    return false;
                };
                let removed = child.remove(rest, id);
                if child.is_dead() {
                    self.children.remove(c);
                }
                removed
            }
        }
    }

    fn collect<'a>(&'a self, key: &mut String, out: &mut Vec<(String, &'a TrieEntry)>) {
        if let Some(entry) = &self.entry {
            out.push((key.clone(), entry));
        }
        for (c, child) in &self.children {
            key.push(*c);
            child.collect(key, out);
            key.pop();
        }
    }
}

/// Prefix tree keyed by normalized tokens
#[derive(Default)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, key: &str, word: &str, id: ItemId) {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }
        match node.entry.as_mut() {
            Some(entry) => entry.add(word, id),
            None => {
                node.entry = Some(TrieEntry::new(word, id));
                self.len += 1;
            }
        }
    }

    /// Drops `id` from `key`; a key left with no items disappears
    pub fn remove(&mut self, key: &str, id: ItemId) -> bool {
        let chars: Vec<char> = key.chars().collect();
        let before = self.get(key).is_some();
        let removed = self.root.remove(&chars, id);
        if before && self.get(key).is_none() {
            self.len -= 1;
        }
        removed
    }

    pub fn get(&self, key: &str) -> Option<&TrieEntry> {
        self.node(key).and_then(|n| n.entry.as_ref())
    }

    /// Every key starting with `prefix`, in key order
    pub fn prefix(&self, prefix: &str) -> Vec<(String, &TrieEntry)> {
        let mut out = Vec::new();
        if let Some(node) = self.node(prefix) {
            node.collect(&mut prefix.to_string(), &mut out);
        }
        out
    }

    fn node(&self, key: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }
}
