//! Built-in commands.

use async_trait::async_trait;
use tracing::info;

use super::auth::UserHandler;
use super::duration::parse_interval;
use super::registry::{CommandContext, Handler};
use crate::db::{NewUser, User, UserRepository};
use crate::feed::{
    validate_url, Feed, FeedFollowRepository, FeedRepository, FetchScheduler, NewFeed,
    PostRepository,
};
use crate::{GatorError, Result};

/// Posts shown by `browse` without a limit argument.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

fn usage(text: &str) -> GatorError {
    GatorError::Validation(format!("usage: {text}"))
}

/// Return the single argument or a usage error.
fn one_arg<'a>(args: &'a [String], text: &str) -> Result<&'a str> {
    match args {
        [arg] => Ok(arg.as_str()),
        _ => Err(usage(text)),
    }
}

fn no_args(args: &[String], text: &str) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(usage(text))
    }
}

async fn feed_by_url(ctx: &CommandContext, url: &str) -> Result<Feed> {
    FeedRepository::new(ctx.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))
}

/// `register <name>`: create a user and make it current.
pub struct Register;

#[async_trait]
impl Handler for Register {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        let new_user = NewUser::new(one_arg(args, "register <name>")?);
        new_user.validate().map_err(GatorError::Validation)?;

        let user = UserRepository::new(ctx.db.pool()).create(&new_user).await?;
        ctx.session.lock().await.set_user(&user.name)?;

        info!(user_id = user.id, "Registered user {}", user.name);
        ctx.console.println(format!("User {} was created", user.name));
        Ok(())
    }
}

/// `login <name>`: make an existing user current.
pub struct Login;

#[async_trait]
impl Handler for Login {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        let name = one_arg(args, "login <name>")?;

        let user = UserRepository::new(ctx.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::UserNotFound(name.to_string()))?;
        ctx.session.lock().await.set_user(&user.name)?;

        ctx.console
            .println(format!("Current user set to {}", user.name));
        Ok(())
    }
}

/// `reset`: delete every user, and with them all feeds, follows and posts.
pub struct Reset;

#[async_trait]
impl Handler for Reset {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        no_args(args, "reset")?;

        let deleted = UserRepository::new(ctx.db.pool()).delete_all().await?;

        info!("Reset: deleted {} user(s)", deleted);
        ctx.console
            .println(format!("Database reset: {deleted} user(s) deleted"));
        Ok(())
    }
}

/// `users`: list users, marking the current one.
pub struct Users;

#[async_trait]
impl Handler for Users {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        no_args(args, "users")?;

        let current = ctx.current_user_name().await;
        for user in UserRepository::new(ctx.db.pool()).list_all().await? {
            if current.as_deref() == Some(user.name.as_str()) {
                ctx.console.println(format!("* {} (current)", user.name));
            } else {
                ctx.console.println(format!("* {}", user.name));
            }
        }
        Ok(())
    }
}

/// `agg <interval>`: fetch feeds every interval until cancelled.
pub struct Agg;

#[async_trait]
impl Handler for Agg {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        let input = one_arg(args, "agg <interval>  (e.g. 30s, 1m, 1h)")?;
        let period = parse_interval(input)?;

        ctx.console
            .println(format!("Collecting feeds every {}", input.trim()));

        FetchScheduler::new(ctx.db.clone(), ctx.parser.clone(), period)
            .with_max_items(ctx.config.aggregator.max_items_per_fetch)
            .run(ctx.cancel.clone())
            .await
    }
}

/// `addfeed <name> <url>`: add a feed owned by the caller and follow it.
pub struct AddFeed;

#[async_trait]
impl UserHandler for AddFeed {
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()> {
        let [name, url] = args else {
            return Err(usage("addfeed <name> <url>"));
        };
        if name.trim().is_empty() {
            return Err(GatorError::Validation("feed name must not be empty".into()));
        }
        validate_url(url)?;

        let feed = FeedRepository::new(ctx.db.pool())
            .create(&NewFeed::new(name.trim(), url, user.id))
            .await?;
        FeedFollowRepository::new(ctx.db.pool())
            .create(user.id, feed.id)
            .await?;

        info!(feed_id = feed.id, user_id = user.id, "Added feed {}", feed.url);
        ctx.console
            .println(format!("Feed {} ({}) added and followed", feed.name, feed.url));
        Ok(())
    }
}

/// `feeds`: list every feed with its owner.
pub struct Feeds;

#[async_trait]
impl Handler for Feeds {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        no_args(args, "feeds")?;

        for entry in FeedRepository::new(ctx.db.pool()).list_all().await? {
            ctx.console.println(format!(
                "* {} {} (added by {})",
                entry.feed.name, entry.feed.url, entry.owner_name
            ));
        }
        Ok(())
    }
}

/// `follow <url>`: follow an existing feed.
pub struct Follow;

#[async_trait]
impl UserHandler for Follow {
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()> {
        let url = one_arg(args, "follow <url>")?;
        let feed = feed_by_url(ctx, url).await?;

        FeedFollowRepository::new(ctx.db.pool())
            .create(user.id, feed.id)
            .await
            .map_err(|e| match e {
                GatorError::Conflict(_) => {
                    GatorError::Conflict(format!("{} already follows {}", user.name, feed.url))
                }
                other => other,
            })?;

        ctx.console
            .println(format!("{} now follows {}", user.name, feed.name));
        Ok(())
    }
}

/// `unfollow <url>`: stop following a feed.
pub struct Unfollow;

#[async_trait]
impl UserHandler for Unfollow {
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()> {
        let url = one_arg(args, "unfollow <url>")?;
        let feed = feed_by_url(ctx, url).await?;

        let deleted = FeedFollowRepository::new(ctx.db.pool())
            .delete(user.id, feed.id)
            .await?;
        if !deleted {
            return Err(GatorError::NotFound(format!(
                "follow of {} by {}",
                feed.url, user.name
            )));
        }

        ctx.console
            .println(format!("{} unfollowed {}", user.name, feed.name));
        Ok(())
    }
}

/// `following`: list feeds the caller follows.
pub struct Following;

#[async_trait]
impl UserHandler for Following {
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()> {
        no_args(args, "following")?;

        for followed in FeedFollowRepository::new(ctx.db.pool())
            .list_for_user(user.id)
            .await?
        {
            ctx.console.println(format!("* {}", followed.feed_name));
        }
        Ok(())
    }
}

/// `browse [limit]`: newest posts from followed feeds.
pub struct Browse;

#[async_trait]
impl UserHandler for Browse {
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()> {
        let limit = match args {
            [] => DEFAULT_BROWSE_LIMIT,
            [raw] => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    GatorError::Validation(format!("limit must be a positive integer, got {raw:?}"))
                })?,
            _ => return Err(usage("browse [limit]")),
        };

        let posts = PostRepository::new(ctx.db.pool())
            .list_recent_for_user(user.id, limit)
            .await?;
        if posts.is_empty() {
            ctx.console.println("No posts yet");
            return Ok(());
        }

        for post in posts {
            ctx.console.println(format!(
                "{} {}",
                post.published_at.format("%Y-%m-%d %H:%M"),
                post.title
            ));
            ctx.console.println(format!("    {}", post.url));
            if !post.description.is_empty() {
                ctx.console.println(format!("    {}", post.description));
            }
        }
        Ok(())
    }
}

/// `help`: list commands in registration order.
pub struct Help {
    pub(super) names: Vec<String>,
}

#[async_trait]
impl Handler for Help {
    async fn call(&self, ctx: &CommandContext, _args: &[String]) -> Result<()> {
        ctx.console.println("Commands:");
        for name in &self.names {
            ctx.console.println(format!("  {name}"));
        }
        Ok(())
    }
}
