use serde::{Deserialize, Serialize};

/// Content extracted from one rendered page. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageData {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub body_text: String,
    /// H1 texts in document order, already trimmed.
    pub h1s: Vec<String>,
    /// Absolute outbound link targets in document order.
    pub links: Vec<String>,
}

impl PageData {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_meta_description(mut self, description: impl Into<String>) -> Self {
        self.meta_description = description.into();
        self
    }

    pub fn with_body_text(mut self, body: impl Into<String>) -> Self {
        self.body_text = body.into();
        self
    }

    pub fn with_h1s<I, S>(mut self, h1s: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.h1s = h1s.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Title and body joined the way the keyword check searches them.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.body_text)
    }
}
