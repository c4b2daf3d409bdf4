//! Form operations posted from the index page.

use serde::Deserialize;
use tracing::info;

use crate::accounts;
use crate::error::AppError;
use crate::store::Service;
use crate::sync::batch::run_batch;
use crate::timeline::media::fetch_attachment;
use crate::timeline::{
    Card, Command, Contact, MenuAction, MenuItem, Notification, Subscription, TimelineClient,
};
use crate::AppState;

const PAGINATED_HTML: &str = "<article class='auto-paginate'>\
<h2 class='blue text-large'>Did you know...?</h2>\
<p>Cats are <em class='yellow'>solar-powered.</em> The time they spend \
napping in direct sunlight is necessary to regenerate their internal \
batteries. Cats that do not receive sufficient charge may exhibit the \
following symptoms: lethargy, irritability, and disdainful glares. Cats \
will reactivate on their own automatically after a complete charge \
cycle; it is recommended that they be left undisturbed during this \
process to maximize your enjoyment of your cat.</p><br/><p>\
For more cat maintenance tips, tap to view the website!</p>\
</article>";

const PAGINATED_LINK: &str = "https://www.google.com/search?q=cat+maintenance+tips";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InsertSubscription,
    DeleteSubscription,
    InsertItem,
    InsertPaginatedItem,
    InsertItemWithAction,
    InsertItemAllUsers,
    InsertContact,
    DeleteContact,
    DeleteTimelineItem,
}

impl Operation {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "insertSubscription" => Operation::InsertSubscription,
            "deleteSubscription" => Operation::DeleteSubscription,
            "insertItem" => Operation::InsertItem,
            "insertPaginatedItem" => Operation::InsertPaginatedItem,
            "insertItemWithAction" => Operation::InsertItemWithAction,
            "insertItemAllUsers" => Operation::InsertItemAllUsers,
            "insertContact" => Operation::InsertContact,
            "deleteContact" => Operation::DeleteContact,
            "deleteTimelineItem" => Operation::DeleteTimelineItem,
            _ => return None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationForm {
    #[serde(default)]
    pub operation: String,
    pub collection: Option<String>,
    pub subscription_id: Option<String>,
    pub message: Option<String>,
    pub html: Option<String>,
    pub image_url: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub item_id: Option<String>,
}

/// Run the form's operation and return the flash message to show.
pub async fn run(
    state: &AppState,
    timeline: &TimelineClient,
    user_id: &str,
    form: &OperationForm,
) -> Result<String, AppError> {
    let Some(op) = Operation::parse(&form.operation) else {
        return Ok(format!("I don't know how to {}", form.operation));
    };

    match op {
        Operation::InsertSubscription => {
            let collection = non_empty(&form.collection).unwrap_or("timeline");
            timeline
                .insert_subscription(&Subscription {
                    id: None,
                    collection: collection.to_string(),
                    user_token: user_id.to_string(),
                    callback_url: state.config.notify_callback_url.clone(),
                })
                .await?;
            Ok("Application is now subscribed to updates.".into())
        }
        Operation::DeleteSubscription => {
            let id = required(&form.subscription_id, "subscriptionId")?;
            timeline.delete_subscription(id).await?;
            Ok("Application has been unsubscribed.".into())
        }
        Operation::InsertItem => {
            insert_item(state, timeline, form).await?;
            Ok("A timeline item has been inserted.".into())
        }
        Operation::InsertPaginatedItem => {
            info!("Inserting paginated timeline item");
            timeline
                .insert_card(&Card {
                    html: Some(PAGINATED_HTML.into()),
                    notification: Some(Notification::default_level()),
                    menu_items: vec![MenuItem::open_uri(PAGINATED_LINK)],
                    ..Card::default()
                })
                .await?;
            Ok("A timeline item has been inserted.".into())
        }
        Operation::InsertItemWithAction => {
            info!("Inserting timeline item with reply action");
            timeline.insert_card(&reply_card()).await?;
            Ok("A timeline item with action has been inserted.".into())
        }
        Operation::InsertItemAllUsers => broadcast(state).await,
        Operation::InsertContact => insert_contact(state, timeline, form).await,
        Operation::DeleteContact => {
            timeline.delete_contact(required(&form.id, "id")?).await?;
            Ok("Contact has been deleted.".into())
        }
        Operation::DeleteTimelineItem => {
            info!("Deleting timeline item");
            timeline.delete_card(required(&form.item_id, "itemId")?).await?;
            Ok("A timeline item has been deleted.".into())
        }
    }
}

async fn insert_item(
    state: &AppState,
    timeline: &TimelineClient,
    form: &OperationForm,
) -> Result<(), AppError> {
    info!("Inserting timeline item");
    let message = form.message.clone().unwrap_or_default();
    let mut card = Card {
        notification: Some(Notification::default_level()),
        ..Card::default()
    };
    if form.html.as_deref() == Some("on") {
        card.html = Some(message);
    } else {
        card.text = Some(message);
    }

    match non_empty(&form.image_url) {
        Some(url) => {
            let url = state.config.full_url(url);
            let media =
                fetch_attachment(&state.http, &url, state.config.image_fetch_timeout).await?;
            timeline.insert_card_with_media(&card, &media).await?;
        }
        None => {
            timeline.insert_card(&card).await?;
        }
    }
    Ok(())
}

fn reply_card() -> Card {
    Card {
        creator: Some(Contact {
            id: Some("GLASSFEED".into()),
            display_name: Some("glassfeed".into()),
            ..Contact::default()
        }),
        text: Some("Tell me what you had for lunch :)".into()),
        notification: Some(Notification::default_level()),
        menu_items: vec![MenuItem::new(MenuAction::Reply)],
        ..Card::default()
    }
}

/// Send one card to every connected timeline user.
async fn broadcast(state: &AppState) -> Result<String, AppError> {
    info!("Inserting timeline item to all users");
    let users = state.store.list_users(Service::Timeline).await?;
    if users.len() > state.config.broadcast_user_limit {
        return Ok(format!(
            "Total user count is {}. Aborting broadcast to save your quota",
            users.len()
        ));
    }

    let card = Card {
        text: Some("Hello Everyone!".into()),
        notification: Some(Notification::default_level()),
        ..Card::default()
    };

    let inserts: Vec<_> = users
        .into_iter()
        .map(|user| {
            let card = &card;
            (user.clone(), async move {
                let timeline = accounts::timeline_client(state, &user)
                    .await?
                    .ok_or_else(|| AppError::NotFound("timeline credential".into()))?;
                timeline.insert_card(card).await
            })
        })
        .collect();

    let (outcome, _) = run_batch("broadcast card", inserts).await;
    Ok(format!(
        "Successfully sent cards to {} users ({} failed).",
        outcome.success, outcome.failure
    ))
}

async fn insert_contact(
    state: &AppState,
    timeline: &TimelineClient,
    form: &OperationForm,
) -> Result<String, AppError> {
    info!("Inserting contact");
    let (Some(name), Some(image_url)) = (non_empty(&form.name), non_empty(&form.image_url)) else {
        return Ok("Must specify imageUrl and name to insert contact".into());
    };

    timeline
        .insert_contact(&Contact {
            id: form.id.clone(),
            display_name: Some(name.to_string()),
            image_urls: vec![state.config.full_url(image_url)],
            accept_commands: vec![Command {
                kind: "TAKE_A_NOTE".into(),
            }],
        })
        .await?;
    Ok(format!("Inserted contact: {name}"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    non_empty(value).ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}
