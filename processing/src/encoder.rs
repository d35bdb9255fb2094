use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::EncoderError;

/// Frozen bijection between the categories seen at fit time and dense codes.
///
/// Codes follow the sorted order of the distinct categories, so refitting on
/// the same data in any row order yields the same codes. There is no way to
/// add a category after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderRepr", into = "EncoderRepr")]
pub struct CategoryEncoder {
    name: String,
    categories: Vec<String>,
    codes: HashMap<String, u32>,
}

#[derive(Serialize, Deserialize)]
struct EncoderRepr {
    name: String,
    categories: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<I, S>(name: impl Into<String>, categories: I) -> Result<Self, EncoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let distinct: BTreeSet<String> = categories
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();

        if distinct.is_empty() {
            return Err(EncoderError::EmptyFit { encoder: name });
        }

        Self::from_ordered(name, distinct.into_iter().collect())
    }

    /// Rebuilds an encoder from its persisted category list, where position
    /// is the code.
    pub fn from_categories(name: impl Into<String>, categories: Vec<String>) -> Result<Self, EncoderError> {
        let name = name.into();
        if categories.is_empty() {
            return Err(EncoderError::EmptyFit { encoder: name });
        }
        Self::from_ordered(name, categories)
    }

    fn from_ordered(name: String, categories: Vec<String>) -> Result<Self, EncoderError> {
        let mut codes = HashMap::with_capacity(categories.len());
        for (code, category) in categories.iter().enumerate() {
            if codes.insert(category.clone(), code as u32).is_some() {
                return Err(EncoderError::DuplicateCategory {
                    encoder: name,
                    category: category.clone(),
                });
            }
        }
        Ok(Self {
            name,
            categories,
            codes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, category: &str) -> bool {
        self.codes.contains_key(category)
    }

    pub fn encode(&self, category: &str) -> Result<u32, EncoderError> {
        self.codes
            .get(category)
            .copied()
            .ok_or_else(|| EncoderError::UnknownCategory {
                encoder: self.name.clone(),
                category: category.to_string(),
            })
    }

    pub fn decode(&self, code: u32) -> Result<&str, EncoderError> {
        self.categories
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| EncoderError::InvalidCode {
                encoder: self.name.clone(),
                code,
                len: self.categories.len(),
            })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl TryFrom<EncoderRepr> for CategoryEncoder {
    type Error = EncoderError;

    fn try_from(repr: EncoderRepr) -> Result<Self, Self::Error> {
        Self::from_categories(repr.name, repr.categories)
    }
}

impl From<CategoryEncoder> for EncoderRepr {
    fn from(encoder: CategoryEncoder) -> Self {
        Self {
            name: encoder.name,
            categories: encoder.categories,
        }
    }
}
