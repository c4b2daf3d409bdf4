//! The index page: who is signed in, feed connection, recent cards, and the operation forms.

use tracing::info;

use crate::crypto::SignedPurpose;
use crate::error::AppError;
use crate::providers::OAuthProvider;
use crate::store::Service;
use crate::sync::cards::escape_html;
use crate::timeline::{Card, Contact, TimelineClient};
use crate::AppState;

pub struct IndexView {
    pub user_id: String,
    pub message: Option<String>,
    pub feed_connected: bool,
    pub feed_connect_url: String,
    pub contact: Option<Contact>,
    pub cards: Vec<Card>,
    pub timeline_subscribed: bool,
    pub location_subscribed: bool,
}

impl IndexView {
    pub async fn load(
        state: &AppState,
        timeline: &TimelineClient,
        user_id: &str,
        message: Option<String>,
    ) -> Result<Self, AppError> {
        let contact = match timeline.get_contact(&state.config.contact_id).await {
            Ok(contact) => Some(contact),
            Err(e) if e.is_not_found() => {
                info!("Unable to find contact {}", state.config.contact_id);
                None
            }
            Err(e) => return Err(e),
        };

        let cards = timeline.list_cards(Some(3)).await?;
        let subscriptions = timeline.list_subscriptions().await?;

        let feed_connected = state
            .store
            .get_credential(Service::Feed, user_id)
            .await?
            .is_some();
        let feed_state = state.crypto.sign(SignedPurpose::FeedState, user_id)?;

        Ok(Self {
            user_id: user_id.to_string(),
            message,
            feed_connected,
            feed_connect_url: state
                .feed_auth
                .auth_url(&feed_state, &state.config.feed_callback_url()),
            contact,
            cards,
            timeline_subscribed: subscriptions.iter().any(|s| s.collection == "timeline"),
            location_subscribed: subscriptions.iter().any(|s| s.collection == "locations"),
        })
    }
}

pub fn render_index(view: &IndexView) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>glassfeed</title></head><body>",
    );

    html.push_str(&format!(
        "<header><p>Signed in as <b>{}</b> &middot; <a href=\"/signout\">Sign out</a></p></header>",
        escape_html(&view.user_id)
    ));

    if let Some(message) = &view.message {
        html.push_str(&format!("<div class=\"flash\">{}</div>", escape_html(message)));
    }

    html.push_str("<section><h2>Feed</h2>");
    if view.feed_connected {
        html.push_str("<p>Feed account connected. <a href=\"/feeds\">Refresh timeline now</a></p>");
    }
    html.push_str(&format!(
        "<p><a href=\"{}\">{}</a></p></section>",
        escape_html(&view.feed_connect_url),
        if view.feed_connected {
            "Reconnect feed account"
        } else {
            "Connect your feed account"
        }
    ));

    html.push_str("<section><h2>Recent cards</h2><ul>");
    if view.cards.is_empty() {
        html.push_str("<li>No cards on the timeline.</li>");
    }
    for card in &view.cards {
        let label = card
            .text
            .as_deref()
            .or(card.title.as_deref())
            .unwrap_or("(html card)");
        html.push_str(&format!(
            "<li>{} {}</li>",
            escape_html(label),
            operation_form(
                "deleteTimelineItem",
                "Delete",
                &[("itemId", card.id.as_deref().unwrap_or_default())]
            )
        ));
    }
    html.push_str("</ul></section>");

    html.push_str("<section><h2>Subscriptions</h2>");
    for (collection, subscribed) in [
        ("timeline", view.timeline_subscribed),
        ("locations", view.location_subscribed),
    ] {
        let form = if subscribed {
            operation_form(
                "deleteSubscription",
                &format!("Unsubscribe from {collection}"),
                &[("subscriptionId", collection)],
            )
        } else {
            operation_form(
                "insertSubscription",
                &format!("Subscribe to {collection}"),
                &[("collection", collection)],
            )
        };
        html.push_str(&form);
    }
    html.push_str("</section>");

    html.push_str("<section><h2>Contact</h2>");
    match &view.contact {
        Some(contact) => {
            let id = contact.id.as_deref().unwrap_or_default();
            html.push_str(&format!(
                "<p>{}</p>{}",
                escape_html(contact.display_name.as_deref().unwrap_or(id)),
                operation_form("deleteContact", "Delete contact", &[("id", id)])
            ));
        }
        None => html.push_str(
            "<form method=\"post\" action=\"/\"><input type=\"hidden\" name=\"operation\" value=\"insertContact\">\
             <input name=\"id\" placeholder=\"id\"><input name=\"name\" placeholder=\"name\">\
             <input name=\"imageUrl\" placeholder=\"image url\"><button>Insert contact</button></form>",
        ),
    }
    html.push_str("</section>");

    html.push_str(
        "<section><h2>Cards</h2>\
         <form method=\"post\" action=\"/\"><input type=\"hidden\" name=\"operation\" value=\"insertItem\">\
         <textarea name=\"message\"></textarea><label><input type=\"checkbox\" name=\"html\">HTML</label>\
         <input name=\"imageUrl\" placeholder=\"image url\"><button>Insert card</button></form>",
    );
    html.push_str(&operation_form("insertPaginatedItem", "Insert paginated card", &[]));
    html.push_str(&operation_form("insertItemWithAction", "Insert card with reply", &[]));
    html.push_str(&operation_form("insertItemAllUsers", "Send card to all users", &[]));
    html.push_str("</section></body></html>");

    html
}

fn operation_form(operation: &str, label: &str, fields: &[(&str, &str)]) -> String {
    let mut form = format!(
        "<form method=\"post\" action=\"/\"><input type=\"hidden\" name=\"operation\" value=\"{operation}\">"
    );
    for (name, value) in fields {
        form.push_str(&format!(
            "<input type=\"hidden\" name=\"{name}\" value=\"{}\">",
            escape_html(value)
        ));
    }
    form.push_str(&format!("<button>{}</button></form>", escape_html(label)));
    form
}
