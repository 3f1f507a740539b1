pub mod reddit;
pub mod rss;

pub use reddit::RedditProvider;
pub use rss::RssProvider;
