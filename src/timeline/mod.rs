//! Timeline service: card/subscription/contact types, the REST client and media download.

mod client;
pub mod media;
mod types;

pub use client::TimelineClient;
pub use types::{
    Attachment, Card, Command, Contact, MenuAction, MenuItem, MenuValue, Notification,
    Subscription,
};
