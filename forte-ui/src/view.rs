//! Tab containers
//!
//! A [`Container`] holds the markup of one tab panel. Only the tab that owns
//! it writes to it, and only while that tab is loading or loaded.

/// Markup shown while a fetch is in flight
pub const LOADING_HTML: &str =
    r#"<div class="loading-indicator" role="status">Loading&hellip;</div>"#;

/// One tab's rendered panel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    id: String,
    html: String,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            html: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }

    /// Replace the panel's markup
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Append markup to the panel
    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }

    pub fn clear(&mut self) {
        self.html.clear();
    }

    pub fn show_loading(&mut self) {
        self.set_html(LOADING_HTML);
    }

    /// Replace the panel with the generic error block
    ///
    /// The block has no in-place retry: the only affordance is a full page
    /// reload.
    pub fn show_error(&mut self, message: &str) {
        self.html = error_block(message);
    }

    /// Swap in markup rendered off-screen
    pub(crate) fn replace_with(&mut self, staged: Container) {
        self.html = staged.html;
    }

    /// Whether the panel currently shows the error block
    pub fn shows_error(&self) -> bool {
        self.html.contains(r#"class="tab-error""#)
    }
}

/// Generic error block
pub fn error_block(message: &str) -> String {
    format!(
        concat!(
            r#"<div class="tab-error" role="alert">"#,
            r#"<p class="error-message">{}</p>"#,
            r#"<button type="button" data-action="reload-page">Reload page</button>"#,
            "</div>"
        ),
        escape_html(message)
    )
}

/// Escape text for use in element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
