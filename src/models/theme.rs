use serde::{Deserialize, Serialize};

/// A site theme offered to authors.
///
/// Themes come from the catalog file named in the configuration; they are
/// not stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub layout: String,
    #[serde(default)]
    pub screenshot_urls: Vec<String>,
}

impl Theme {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        layout: impl Into<String>,
        screenshot_urls: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            layout: layout.into(),
            screenshot_urls,
        }
    }
}
