// ============================================================
// Layer 3 — Vocabulary and Dictionary
// ============================================================
// A Vocabulary is a bidirectional token ↔ id table. Ids are
// dense, starting at 0, and the first four are always the
// reserved tokens:
//
//   0 → <PAD>   padding after the end of a sequence
//   1 → <UNK>   any token missing from the table
//   2 → <GO>    first decoder input
//   3 → <EOS>   end of a target sequence
//
// A Dictionary bundles the encoder-side and decoder-side
// vocabularies. Both are built once per training run and never
// change after they are persisted.
//
// Reference: Rust Book §8 (Hash Maps)

use anyhow::{bail, ensure, Result};
use std::collections::{BTreeMap, HashMap};

pub const PAD: &str = "<PAD>";
pub const UNK: &str = "<UNK>";
pub const GO:  &str = "<GO>";
pub const EOS: &str = "<EOS>";

pub const PAD_ID: usize = 0;
pub const UNK_ID: usize = 1;
pub const GO_ID:  usize = 2;
pub const EOS_ID: usize = 3;

/// Reserved tokens in id order.
pub const RESERVED_TOKENS: [&str; 4] = [PAD, UNK, GO, EOS];

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    id_to_token: Vec<String>,
    token_to_id: HashMap<String, usize>,
}

impl Vocabulary {
    /// Reserved tokens followed by `tokens` in the given order.
    /// Duplicates (including reserved spellings) keep their first id.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self {
            id_to_token: Vec::new(),
            token_to_id: HashMap::new(),
        };
        for t in RESERVED_TOKENS {
            vocab.push(t.to_string());
        }
        for t in tokens {
            vocab.push(t.into());
        }
        vocab
    }

    fn push(&mut self, token: String) {
        if self.token_to_id.contains_key(&token) {
            return;
        }
        self.token_to_id.insert(token.clone(), self.id_to_token.len());
        self.id_to_token.push(token);
    }

    /// Rebuild from persisted id→token and token→id tables.
    ///
    /// Both tables must describe the same dense mapping and carry the
    /// reserved tokens at their fixed ids.
    pub fn from_tables(
        id_to_token: &BTreeMap<usize, String>,
        token_to_id: &BTreeMap<String, usize>,
    ) -> Result<Self> {
        ensure!(id_to_token.len() == token_to_id.len(),
            "vocabulary tables disagree: {} ids vs {} tokens",
            id_to_token.len(), token_to_id.len());

        let mut tokens = Vec::with_capacity(id_to_token.len());
        for (expected, (&id, token)) in id_to_token.iter().enumerate() {
            if id != expected {
                bail!("vocabulary ids are not dense: missing id {expected}");
            }
            if token_to_id.get(token) != Some(&id) {
                bail!("vocabulary tables disagree on token '{token}'");
            }
            tokens.push(token.clone());
        }
        for (id, reserved) in RESERVED_TOKENS.iter().enumerate() {
            ensure!(tokens.get(id).map(String::as_str) == Some(*reserved),
                "reserved token {reserved} must have id {id}");
        }

        let token_to_id = tokens.iter().cloned().enumerate().map(|(i, t)| (t, i)).collect();
        Ok(Self { id_to_token: tokens, token_to_id })
    }

    /// Export as (id→token, token→id) tables.
    pub fn to_tables(&self) -> (BTreeMap<usize, String>, BTreeMap<String, usize>) {
        let ids = self.id_to_token.iter().cloned().enumerate().collect();
        let tokens = self.token_to_id.iter().map(|(t, &i)| (t.clone(), i)).collect();
        (ids, tokens)
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Id of `token`, or `UNK_ID` when absent.
    pub fn id(&self, token: &str) -> usize {
        self.token_to_id.get(token).copied().unwrap_or(UNK_ID)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.id_to_token.get(id).map(String::as_str)
    }

    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<usize> {
        tokens.iter().map(|t| self.id(t.as_ref())).collect()
    }

    /// Map ids back to tokens. Out-of-range ids decode as `<UNK>`.
    pub fn decode(&self, ids: &[usize]) -> Vec<&str> {
        ids.iter().map(|&i| self.token(i).unwrap_or(UNK)).collect()
    }
}

// ─── Dictionary ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    pub encoder: Vocabulary,
    pub decoder: Vocabulary,
}

impl Dictionary {
    pub fn new(encoder: Vocabulary, decoder: Vocabulary) -> Self {
        Self { encoder, decoder }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids_are_fixed() {
        let v = Vocabulary::from_tokens(["hello", "world"]);
        assert_eq!(v.id(PAD), PAD_ID);
        assert_eq!(v.id(UNK), UNK_ID);
        assert_eq!(v.id(GO), GO_ID);
        assert_eq!(v.id(EOS), EOS_ID);
        assert_eq!(v.id("hello"), 4);
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn test_unknown_token_maps_to_unk() {
        let v = Vocabulary::from_tokens(["a"]);
        assert_eq!(v.encode(&["a", "zzz"]), vec![4, UNK_ID]);
        assert_eq!(v.decode(&[4, 99]), vec!["a", UNK]);
    }

    #[test]
    fn test_duplicates_keep_first_id() {
        let v = Vocabulary::from_tokens(["x", "<EOS>", "x", "y"]);
        assert_eq!(v.len(), 6);
        assert_eq!(v.id("y"), 5);
    }

    #[test]
    fn test_tables_rebuild_same_vocabulary() {
        let v = Vocabulary::from_tokens(["the", "cat"]);
        let (ids, tokens) = v.to_tables();
        let rebuilt = Vocabulary::from_tables(&ids, &tokens).unwrap();
        assert_eq!(rebuilt, v);
    }

    #[test]
    fn test_tables_without_reserved_tokens_are_rejected() {
        let ids: BTreeMap<usize, String> = [(0, "a".to_string())].into_iter().collect();
        let tokens: BTreeMap<String, usize> = [("a".to_string(), 0)].into_iter().collect();
        assert!(Vocabulary::from_tables(&ids, &tokens).is_err());
    }
}
