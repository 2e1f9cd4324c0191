//! Command dispatch for gator.
//!
//! Commands are looked up by name in a [`CommandRegistry`]. Commands that act
//! on behalf of the current user are wrapped with [`require_user`].

mod auth;
mod duration;
mod handlers;
mod registry;

pub use auth::{require_user, resolve_current_user, RequireUser, UserHandler};
pub use duration::parse_interval;
pub use handlers::DEFAULT_BROWSE_LIMIT;
pub use registry::{CommandContext, CommandRegistry, Console, Handler};

use handlers::{
    AddFeed, Agg, Browse, Feeds, Follow, Following, Help, Login, Register, Reset, Unfollow, Users,
};

/// Build the registry of built-in commands.
pub fn build_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register("register", Register);
    registry.register("login", Login);
    registry.register("reset", Reset);
    registry.register("users", Users);
    registry.register("agg", Agg);
    registry.register("addfeed", require_user(AddFeed));
    registry.register("feeds", Feeds);
    registry.register("follow", require_user(Follow));
    registry.register("unfollow", require_user(Unfollow));
    registry.register("following", require_user(Following));
    registry.register("browse", require_user(Browse));

    let mut names = registry.names().to_vec();
    names.push("help".to_string());
    registry.register("help", Help { names });

    registry
}
