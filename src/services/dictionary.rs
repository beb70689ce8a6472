use anyhow::{bail, Context, Result};
use rand::prelude::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

use crate::core::idea::BookType;
use crate::utils::text::fill_placeholders;

/// Named pools of substitution words for title patterns, one set per book
/// type. A name missing from the requested book type's pools is looked up
/// in the other book type's pools before it is given up on.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VariableDictionary {
    #[serde(default)]
    fiction: HashMap<String, Vec<String>>,
    #[serde(default, rename = "non-fiction")]
    non_fiction: HashMap<String, Vec<String>>,
}

impl VariableDictionary {
    pub fn from_json(json: &str) -> Result<Self> {
        let dict: VariableDictionary =
            serde_json::from_str(json).context("Failed to parse title variables")?;
        dict.validate()?;
        Ok(dict)
    }

    fn validate(&self) -> Result<()> {
        for (name, values) in self.fiction.iter().chain(self.non_fiction.iter()) {
            if values.is_empty() {
                bail!("Title variable '{}' has no values", name);
            }
        }
        Ok(())
    }

    fn own(&self, book_type: BookType) -> &HashMap<String, Vec<String>> {
        match book_type {
            BookType::Fiction => &self.fiction,
            BookType::NonFiction => &self.non_fiction,
        }
    }

    fn other(&self, book_type: BookType) -> &HashMap<String, Vec<String>> {
        match book_type {
            BookType::Fiction => &self.non_fiction,
            BookType::NonFiction => &self.fiction,
        }
    }

    pub fn values(&self, book_type: BookType, name: &str) -> Option<&[String]> {
        self.own(book_type)
            .get(name)
            .or_else(|| self.other(book_type).get(name))
            .map(Vec::as_slice)
    }

    pub fn contains(&self, book_type: BookType, name: &str) -> bool {
        self.values(book_type, name).is_some()
    }

    /// Renders `pattern`, drawing one value per placeholder name.
    pub fn fill<R: Rng + ?Sized>(&self, book_type: BookType, pattern: &str, rng: &mut R) -> String {
        fill_placeholders(pattern, |name| {
            self.values(book_type, name)
                .and_then(|values| values.choose(&mut *rng))
                .cloned()
        })
    }
}
