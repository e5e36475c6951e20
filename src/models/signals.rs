use serde::{Deserialize, Serialize};

pub const NO_TITLE: &str = "No title found";
pub const NO_DESCRIPTION: &str = "No description found";

/// Structural and content features pulled from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub url: String,
    pub title: String,
    pub description: String,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub content_snippet: String,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub accessibility_score: u8,
}

impl Signals {
    pub fn has_title(&self) -> bool {
        self.title != NO_TITLE
    }
}
