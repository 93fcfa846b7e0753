//! Filter controls writing into the [`ParamStore`].
//!
//! Each control owns one parameter key. Text input is kept as a local draft
//! and only reaches the store on an explicit commit; selects write at once.

use thiserror::Error;

use crate::application::params::{ParamSet, ParamStore};
use crate::domain::resources::{FilterField, FilterKind, PAGE_KEY, ResourceSpec};

/// Separator joining multi-select values into a single parameter.
pub const MULTI_VALUE_DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("`{value}` is not an option of `{key}`")]
    UnknownOption { key: &'static str, value: String },
    #[error("value `{value}` for `{key}` contains the reserved delimiter `,`")]
    DelimiterInValue { key: &'static str, value: String },
    #[error("`{key}` is not a filter of {resource}")]
    NotInSchema { resource: &'static str, key: String },
}

/// Free-text filter with a draft that survives until committed.
#[derive(Debug, Clone)]
pub struct TextFilter {
    key: &'static str,
    draft: String,
}

impl TextFilter {
    pub fn new(key: &'static str, params: &ParamSet) -> Self {
        Self {
            key,
            draft: params.get(key).unwrap_or_default().to_string(),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Change the draft only; nothing is written until [`TextFilter::commit`].
    pub fn edit(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Write the trimmed draft. A blank draft removes the key.
    pub fn commit(&mut self, store: &ParamStore) -> bool {
        let trimmed = self.draft.trim().to_string();
        self.draft.clone_from(&trimmed);
        if trimmed.is_empty() {
            store.remove([self.key])
        } else {
            store.set([(self.key, trimmed)])
        }
    }

    pub fn clear(&mut self, store: &ParamStore) -> bool {
        self.draft.clear();
        store.remove([self.key])
    }

    /// Replace the draft with the committed value, e.g. after navigating back.
    pub fn sync(&mut self, params: &ParamSet) {
        self.draft = params.get(self.key).unwrap_or_default().to_string();
    }
}

/// Single choice out of a fixed option list.
#[derive(Debug, Clone, Copy)]
pub struct SelectFilter {
    key: &'static str,
    options: &'static [&'static str],
}

impl SelectFilter {
    pub fn new(key: &'static str, options: &'static [&'static str]) -> Self {
        Self { key, options }
    }

    pub fn options(&self) -> &'static [&'static str] {
        self.options
    }

    /// `None` or a blank value clears the selection.
    pub fn select(&self, store: &ParamStore, value: Option<&str>) -> Result<bool, FilterError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(store.remove([self.key])),
            Some(value) => {
                let option = self.option(value)?;
                Ok(store.set([(self.key, option)]))
            }
        }
    }

    /// Current selection; values outside the option list read as unselected.
    pub fn selected(&self, params: &ParamSet) -> Option<&'static str> {
        params.get(self.key).and_then(|value| self.option(value).ok())
    }

    fn option(&self, value: &str) -> Result<&'static str, FilterError> {
        self.options
            .iter()
            .copied()
            .find(|option| *option == value)
            .ok_or_else(|| FilterError::UnknownOption {
                key: self.key,
                value: value.to_string(),
            })
    }
}

/// Any subset of values carried as one delimited parameter.
#[derive(Debug, Clone, Copy)]
pub struct MultiSelectFilter {
    key: &'static str,
}

impl MultiSelectFilter {
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }

    /// Join values in selection order, skipping blanks and duplicates.
    /// `None` means the selection is empty and the key should be absent.
    pub fn encode<S: AsRef<str>>(&self, values: &[S]) -> Result<Option<String>, FilterError> {
        let mut kept: Vec<&str> = Vec::with_capacity(values.len());
        for value in values {
            let value = value.as_ref().trim();
            if value.is_empty() || kept.contains(&value) {
                continue;
            }
            if value.contains(MULTI_VALUE_DELIMITER) {
                return Err(FilterError::DelimiterInValue {
                    key: self.key,
                    value: value.to_string(),
                });
            }
            kept.push(value);
        }
        if kept.is_empty() {
            return Ok(None);
        }
        Ok(Some(kept.join(MULTI_VALUE_DELIMITER.to_string().as_str())))
    }

    pub fn decode(raw: &str) -> Vec<String> {
        raw.split(MULTI_VALUE_DELIMITER)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn selected(&self, params: &ParamSet) -> Vec<String> {
        params.get(self.key).map(Self::decode).unwrap_or_default()
    }

    pub fn apply<S: AsRef<str>>(
        &self,
        store: &ParamStore,
        values: &[S],
    ) -> Result<bool, FilterError> {
        match self.encode(values)? {
            Some(encoded) => Ok(store.set([(self.key, encoded)])),
            None => Ok(store.remove([self.key])),
        }
    }

    /// Add `value` if absent, otherwise remove it.
    pub fn toggle(&self, store: &ParamStore, value: &str) -> Result<bool, FilterError> {
        let mut selected = self.selected(&store.read());
        match selected.iter().position(|existing| existing == value) {
            Some(index) => {
                selected.remove(index);
            }
            None => selected.push(value.to_string()),
        }
        self.apply(store, &selected)
    }

    pub fn clear(&self, store: &ParamStore) -> bool {
        store.remove([self.key])
    }
}

/// A control bound to one field of a resource's filter schema.
#[derive(Debug, Clone, Copy)]
pub enum FilterControl {
    Text(&'static str),
    Select(SelectFilter),
    MultiSelect(MultiSelectFilter),
}

impl FilterControl {
    pub fn for_field(field: &FilterField) -> Self {
        match field.kind {
            FilterKind::Text => Self::Text(field.key),
            FilterKind::Select(options) => Self::Select(SelectFilter::new(field.key, options)),
            FilterKind::MultiSelect => Self::MultiSelect(MultiSelectFilter::new(field.key)),
        }
    }

    /// Write a raw textual value the way the matching control would.
    pub fn write(&self, store: &ParamStore, raw: &str) -> Result<bool, FilterError> {
        match self {
            Self::Text(key) => {
                let mut text = TextFilter::new(*key, &store.read());
                text.edit(raw);
                Ok(text.commit(store))
            }
            Self::Select(select) => select.select(store, Some(raw)),
            Self::MultiSelect(multi) => multi.apply(store, &MultiSelectFilter::decode(raw)),
        }
    }
}

/// Look up the control for `key`, rejecting keys outside the schema.
/// The page cursor is not a filter and is rejected as well.
pub fn control_for(spec: &ResourceSpec, key: &str) -> Result<FilterControl, FilterError> {
    spec.filter(key)
        .filter(|field| field.key != PAGE_KEY)
        .map(FilterControl::for_field)
        .ok_or_else(|| FilterError::NotInSchema {
            resource: spec.name,
            key: key.to_string(),
        })
}
