mod feed;
mod timeline;
mod traits;

pub use feed::FeedProvider;
pub use timeline::TimelineProvider;
pub use traits::{OAuthProvider, TokenSet};
