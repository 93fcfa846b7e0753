//! Anchor slugs for editor headings.
//!
//! `slug` transliterates accented input (Vietnamese diacritics included), so
//! “Cách làm bánh” becomes `cach-lam-banh`.

use std::collections::HashMap;

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Headings processed in order receive monotonic suffixes when duplicates
/// occur (`section`, `section-2`, `section-3`). Ids already present in the
/// document can be reserved up front so generated anchors never shadow them.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an id as taken without generating a new anchor for it.
    pub fn reserve(&mut self, id: &str) {
        self.occurrences.entry(id.to_string()).or_insert(1);
    }

    /// Slug for `heading`, or `section` when the text has no representable characters.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading).unwrap_or_else(|_| "section".to_string());

        let mut count = self.occurrences.get(&base).copied().unwrap_or(0);
        loop {
            count += 1;
            let candidate = if count == 1 {
                base.clone()
            } else {
                format!("{base}-{count}")
            };
            if count == 1 || !self.occurrences.contains_key(&candidate) {
                self.occurrences.insert(base.clone(), count);
                if candidate != base {
                    self.occurrences.insert(candidate.clone(), 1);
                }
                return candidate;
            }
        }
    }
}
