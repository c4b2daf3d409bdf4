use super::types::Entry;

/// Placeholder the feed service uses when an entry has no visual.
const NO_VISUAL: &str = "none";

/// Pick the image to show for an entry.
///
/// Order: first thumbnail, then the visual block, then the first `src="..."`
/// inside the summary markup. `None` means a text-only card.
pub fn resolve_image(entry: &Entry) -> Option<String> {
    if let Some(thumb) = entry.thumbnail.first().filter(|t| !t.url.is_empty()) {
        return Some(thumb.url.clone());
    }

    if let Some(url) = entry
        .visual
        .as_ref()
        .and_then(|v| v.url.as_deref())
        .filter(|url| !url.is_empty() && *url != NO_VISUAL)
    {
        return Some(url.to_string());
    }

    entry
        .summary
        .as_ref()
        .and_then(|s| first_src_attribute(&s.content))
}

fn first_src_attribute(markup: &str) -> Option<String> {
    const NEEDLE: &str = "src=\"";
    let start = markup.find(NEEDLE)? + NEEDLE.len();
    let len = markup[start..].find('"')?;
    let url = &markup[start..start + len];
    (!url.is_empty()).then(|| url.to_string())
}
