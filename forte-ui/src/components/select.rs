//! Single-choice select

use super::{ComponentError, Render};
use crate::view::escape_html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SelectComponent {
    id: String,
    options: Vec<SelectOption>,
    placeholder: Option<String>,
    selected: Option<String>,
}

impl SelectComponent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: Vec::new(),
            placeholder: None,
            selected: None,
        }
    }

    pub fn with_option(mut self, option: SelectOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = SelectOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_label(&self) -> Option<&str> {
        let selected = self.selected.as_deref()?;
        self.options
            .iter()
            .find(|o| o.value == selected)
            .map(|o| o.label.as_str())
    }

    /// Select `value`; unknown and disabled options are rejected
    pub fn select(&mut self, value: &str) -> Result<(), ComponentError> {
        let option = self
            .options
            .iter()
            .find(|o| o.value == value)
            .ok_or_else(|| ComponentError::UnknownOption(value.to_string()))?;
        if option.disabled {
            return Err(ComponentError::DisabledOption(value.to_string()));
        }
        self.selected = Some(option.value.clone());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

impl Render for SelectComponent {
    fn render(&self, out: &mut String) {
        let id = escape_html(&self.id);
        out.push_str(&format!(r#"<select id="{}" name="{}">"#, id, id));

        if let Some(placeholder) = &self.placeholder {
            let selected = if self.selected.is_none() { " selected" } else { "" };
            out.push_str(&format!(
                r#"<option value="" disabled{}>{}</option>"#,
                selected,
                escape_html(placeholder)
            ));
        }

        for option in &self.options {
            let mut attrs = String::new();
            if self.selected.as_deref() == Some(option.value.as_str()) {
                attrs.push_str(" selected");
            }
            if option.disabled {
                attrs.push_str(" disabled");
            }
            out.push_str(&format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape_html(&option.value),
                attrs,
                escape_html(&option.label)
            ));
        }
        out.push_str("</select>");
    }
}
