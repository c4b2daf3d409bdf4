//! Feed service: entry types, the REST client and image selection.

mod client;
pub mod image;
mod types;

pub use client::{all_stream_id, saved_tag_id, FeedClient};
pub use types::{Category, Content, Entry, Link, Origin, Profile, StreamContents, Thumbnail, Visual};
