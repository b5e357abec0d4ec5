//! Type-ahead picker

use super::{ComponentError, Render};
use crate::view::escape_html;

const DEFAULT_MAX_SUGGESTIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteItem {
    pub value: String,
    pub label: String,
}

impl AutocompleteItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutocompleteComponent {
    id: String,
    items: Vec<AutocompleteItem>,
    query: String,
    max_suggestions: usize,
    selected: Option<String>,
}

impl AutocompleteComponent {
    pub fn new(id: impl Into<String>, items: Vec<AutocompleteItem>) -> Self {
        Self {
            id: id.into(),
            items,
            query: String::new(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            selected: None,
        }
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Update the typed text; a selection is dropped once the text diverges from it
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        let still_matches = self
            .selected_item()
            .is_some_and(|item| item.label == self.query);
        if !still_matches {
            self.selected = None;
        }
    }

    /// Matching items: prefix matches first, then substring matches
    ///
    /// Both groups keep the items' original order. An empty query suggests nothing.
    pub fn suggestions(&self) -> Vec<&AutocompleteItem> {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let (prefix, substring): (Vec<_>, Vec<_>) = self
            .items
            .iter()
            .map(|item| (item, item.label.to_lowercase()))
            .filter(|(_, label)| label.contains(&needle))
            .partition(|(_, label)| label.starts_with(&needle));

        prefix
            .into_iter()
            .chain(substring)
            .map(|(item, _)| item)
            .take(self.max_suggestions)
            .collect()
    }

    /// Select the item with `value` and echo its label into the query
    pub fn choose(&mut self, value: &str) -> Result<(), ComponentError> {
        let item = self
            .items
            .iter()
            .find(|item| item.value == value)
            .ok_or_else(|| ComponentError::UnknownOption(value.to_string()))?;
        self.query = item.label.clone();
        self.selected = Some(item.value.clone());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.selected = None;
    }

    fn selected_item(&self) -> Option<&AutocompleteItem> {
        let selected = self.selected.as_deref()?;
        self.items.iter().find(|item| item.value == selected)
    }
}

impl Render for AutocompleteComponent {
    fn render(&self, out: &mut String) {
        let id = escape_html(&self.id);
        out.push_str(&format!(
            concat!(
                r#"<div class="autocomplete" id="{id}">"#,
                r#"<input type="text" id="{id}-input" value="{query}" autocomplete="off">"#,
                r#"<input type="hidden" name="{id}" value="{selected}">"#
            ),
            id = id,
            query = escape_html(&self.query),
            selected = escape_html(self.selected.as_deref().unwrap_or("")),
        ));

        // Suggestions close once a choice is made
        if self.selected.is_none() {
            let suggestions = self.suggestions();
            if !suggestions.is_empty() {
                out.push_str(&format!(
                    r#"<ul class="suggestions" id="{}-suggestions" role="listbox">"#,
                    id
                ));
                for item in suggestions {
                    out.push_str(&format!(
                        r#"<li role="option" data-value="{}">{}</li>"#,
                        escape_html(&item.value),
                        escape_html(&item.label)
                    ));
                }
                out.push_str("</ul>");
            }
        }
        out.push_str("</div>");
    }
}
