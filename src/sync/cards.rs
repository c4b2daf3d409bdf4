//! Card payloads built by the refresh cycle, and the title markers that
//! identify the two sentinel cards.

use crate::feed::{Category, Entry};
use crate::timeline::{Card, MenuAction, MenuItem, Notification};

/// Title carried by the bundle cover card.
pub const COVER_TITLE: &str = "glassfeed:cover";
/// Title carried by the pinned refresh card.
pub const REFRESH_TITLE: &str = "glassfeed:refresh";

/// Menu item id, and therefore notification payload, of the save action.
pub const SAVE_ACTION_ID: &str = "save";
/// Menu item id, and therefore notification payload, of the refresh action.
pub const REFRESH_ACTION_ID: &str = "refresh";

const SAVE_ICON_URL: &str = "http://files.softicons.com/download/system-icons/web0.2ama-icons-by-chrfb/png/128x128/Bookmark.png";
const COVER_LABEL: &str = "Feedly";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardRole {
    Cover,
    Refresh,
    Other,
}

pub fn role_of(card: &Card) -> CardRole {
    match card.title.as_deref() {
        Some(COVER_TITLE) => CardRole::Cover,
        Some(REFRESH_TITLE) => CardRole::Refresh,
        _ => CardRole::Other,
    }
}

/// Card for one feed entry. `image` is shown inline when present.
pub fn entry_card(bundle_id: &str, source_id: &str, entry: &Entry, image: Option<&str>) -> Card {
    let title = entry.title.as_deref().unwrap_or("(untitled)");
    let mut html = format!(
        "<article><h1>{}</h1><h2><i>{}</i></h2>",
        escape_html(title),
        escape_html(entry.source_title())
    );
    if let Some(image) = image {
        html.push_str(&format!("<img src=\"{}\" />", escape_html(image)));
    }
    html.push_str("</article>");

    let mut menu_items = Vec::with_capacity(3);
    if let Some(link) = entry.link() {
        menu_items.push(MenuItem::open_uri(link));
    }
    menu_items.push(MenuItem::custom(
        SAVE_ACTION_ID,
        "Save For Later",
        Some(SAVE_ICON_URL),
    ));
    menu_items.push(MenuItem::new(MenuAction::Delete));

    Card {
        bundle_id: Some(bundle_id.to_string()),
        source_item_id: Some(source_id.to_string()),
        html: Some(html),
        menu_items,
        ..Card::default()
    }
}

/// Bundle cover listing the user's category labels.
pub fn cover_card(bundle_id: &str, categories: &[Category], image_url: &str) -> Card {
    let mut html = format!("<article><h1>{COVER_LABEL}</h1>");
    let labels: Vec<String> = categories
        .iter()
        .filter(|c| !c.label.is_empty())
        .take(3)
        .map(|c| escape_html(&c.label))
        .collect();
    if !labels.is_empty() {
        html.push_str(&format!("<p>{}</p>", labels.join(" &middot; ")));
    }
    html.push_str(&format!("<img src=\"{}\" /></article>", escape_html(image_url)));

    Card {
        bundle_id: Some(bundle_id.to_string()),
        title: Some(COVER_TITLE.to_string()),
        is_bundle_cover: Some(true),
        notification: Some(Notification::default_level()),
        html: Some(html),
        ..Card::default()
    }
}

/// Pinned card whose refresh action is validated against `marker_id`.
pub fn refresh_card(bundle_id: &str, marker_id: &str) -> Card {
    Card {
        bundle_id: Some(bundle_id.to_string()),
        source_item_id: Some(marker_id.to_string()),
        title: Some(REFRESH_TITLE.to_string()),
        is_pinned: Some(true),
        html: Some(
            "<article><section><p class=\"text-auto-size\">Refresh your feed</p></section></article>"
                .to_string(),
        ),
        menu_items: vec![MenuItem::custom(REFRESH_ACTION_ID, "Refresh", None)],
        ..Card::default()
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Link, Origin};

    fn entry() -> Entry {
        Entry {
            id: "e1".into(),
            title: Some("Cats & <Batteries>".into()),
            origin: Some(Origin {
                title: Some("Pet Weekly".into()),
                ..Origin::default()
            }),
            alternate: vec![Link {
                href: "http://example.com/cats".into(),
            }],
            ..Entry::default()
        }
    }

    #[test]
    fn entry_card_escapes_text_and_links_out() {
        let card = entry_card("b1", "u1|~|e1", &entry(), Some("http://img/c.png"));

        let html = card.html.unwrap();
        assert!(html.contains("<h1>Cats &amp; &lt;Batteries&gt;</h1>"));
        assert!(html.contains("<h2><i>Pet Weekly</i></h2>"));
        assert!(html.contains(r#"<img src="http://img/c.png" />"#));
        assert_eq!(card.source_item_id.as_deref(), Some("u1|~|e1"));
        assert_eq!(card.title, None);
        assert_eq!(card.menu_items[0].action, MenuAction::OpenUri);
        assert_eq!(card.menu_items[1].id.as_deref(), Some(SAVE_ACTION_ID));
        assert_eq!(card.menu_items[2].action, MenuAction::Delete);
    }

    #[test]
    fn entry_without_link_or_image_is_text_only() {
        let e = Entry {
            alternate: vec![],
            ..entry()
        };
        let card = entry_card("b1", "u1|~|e1", &e, None);
        assert!(!card.html.unwrap().contains("<img"));
        assert_eq!(card.menu_items.len(), 2);
    }

    #[test]
    fn sentinel_cards_are_recognised_by_title() {
        let cover = cover_card("b1", &[], "http://img/logo.png");
        let refresh = refresh_card("b1", "m1");

        assert_eq!(role_of(&cover), CardRole::Cover);
        assert_eq!(role_of(&refresh), CardRole::Refresh);
        assert_eq!(role_of(&Card::default()), CardRole::Other);
        assert_eq!(cover.is_bundle_cover, Some(true));
        assert_eq!(refresh.source_item_id.as_deref(), Some("m1"));
        assert_eq!(refresh.menu_items[0].id.as_deref(), Some(REFRESH_ACTION_ID));
    }

    #[test]
    fn cover_lists_first_three_category_labels() {
        let cats: Vec<Category> = ["Tech", "", "News", "Cats", "Dogs"]
            .iter()
            .map(|l| Category {
                id: format!("user/u1/category/{l}"),
                label: l.to_string(),
            })
            .collect();
        let html = cover_card("b1", &cats, "http://img/logo.png").html.unwrap();
        assert!(html.contains("<p>Tech &middot; News &middot; Cats</p>"));
        assert!(!html.contains("Dogs"));
    }
}
