use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamContents {
    #[serde(default)]
    pub items: Vec<Entry>,
}

/// One article in a feed stream. Only the fields cards are built from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub thumbnail: Vec<Thumbnail>,
    #[serde(default)]
    pub visual: Option<Visual>,
    #[serde(default)]
    pub summary: Option<Content>,
    #[serde(default)]
    pub alternate: Vec<Link>,
}

impl Entry {
    /// First alternate link, the article's web page.
    pub fn link(&self) -> Option<&str> {
        self.alternate.first().map(|l| l.href.as_str())
    }

    pub fn source_title(&self) -> &str {
        self.origin
            .as_ref()
            .and_then(|o| o.title.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Visual {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkersRequest<'a> {
    pub action: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub entry_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TagRequest<'a> {
    pub entry_id: &'a str,
}
