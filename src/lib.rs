//! gator - a multi-user RSS/Atom feed aggregator.
//!
//! Users register, follow feeds, and a background loop polls the stalest
//! feed on every tick, storing new entries as posts deduplicated by URL.

pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod session;

pub use command::{build_registry, CommandContext, CommandRegistry, Console};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{FeedParser, FetchScheduler, HttpFeedParser, PostIngester, RawFeed, RawItem};
pub use session::Session;
