use regex::bytes::Regex;

use crate::client::Api;
use crate::common::{debug, Result};

// KeyFilter selects the keys a command operates on.
// `pattern` is handed to the store as is, `regex` narrows the candidates on this side.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    pattern: String,
    regex: Option<Regex>,
    invert: bool,
}

impl KeyFilter {
    // Compile the regex. an empty or missing regex keeps every candidate
    // regardless of `invert`.
    pub fn new(pattern: impl Into<String>, regex: Option<&str>, invert: bool) -> Result<Self> {
        let regex = match regex {
            Some(regex) if !regex.is_empty() => Some(Regex::new(regex)?),
            _ => None,
        };

        Ok(Self {
            pattern: pattern.into(),
            regex,
            invert,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    // Keys are binary safe, so the regex runs over bytes.
    pub fn matches(&self, key: &[u8]) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(key) != self.invert,
            None => true,
        }
    }

    // Enumerate by pattern and keep matching keys in the order the store returned them.
    pub async fn select<C>(&self, client: &mut C) -> Result<Vec<Vec<u8>>>
    where
        C: Api + ?Sized,
    {
        let mut keys = client.keys(&self.pattern).await?;
        let candidates = keys.len();

        keys.retain(|key| self.matches(key));

        debug!(
            pattern = %self.pattern,
            candidates,
            selected = keys.len(),
            "Keys selected"
        );

        Ok(keys)
    }
}
