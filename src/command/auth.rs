//! Current-user gate for commands.
//!
//! This is a name lookup against the session, not a credential check.

use async_trait::async_trait;

use super::registry::{CommandContext, Handler};
use crate::db::{User, UserRepository};
use crate::{GatorError, Result};

/// A command that needs the current user.
#[async_trait]
pub trait UserHandler: Send + Sync {
    /// Run the command on behalf of `user`.
    async fn call(&self, ctx: &CommandContext, args: &[String], user: User) -> Result<()>;
}

/// Wraps a [`UserHandler`] so it only runs with a resolved current user.
pub struct RequireUser<H> {
    inner: H,
}

impl<H: UserHandler> RequireUser<H> {
    /// Wrap `inner`.
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    /// Run the wrapped handler for an already resolved user.
    pub async fn invoke(&self, ctx: &CommandContext, user: User, args: &[String]) -> Result<()> {
        self.inner.call(ctx, args, user).await
    }
}

/// Gate `handler` on the session's current user.
pub fn require_user<H: UserHandler>(handler: H) -> RequireUser<H> {
    RequireUser::new(handler)
}

/// Look up the session's current user.
///
/// Fails with `NoCurrentUser` when the session names nobody and with
/// `UserNotFound` when the name is not registered.
pub async fn resolve_current_user(ctx: &CommandContext) -> Result<User> {
    let name = ctx
        .current_user_name()
        .await
        .ok_or(GatorError::NoCurrentUser)?;

    UserRepository::new(ctx.db.pool())
        .get_by_name(&name)
        .await?
        .ok_or(GatorError::UserNotFound(name))
}

#[async_trait]
impl<H: UserHandler> Handler for RequireUser<H> {
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        let user = resolve_current_user(ctx).await?;
        self.invoke(ctx, user, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::registry::{CommandRegistry, Console};
    use crate::config::Config;
    use crate::db::{Database, NewUser};
    use crate::feed::{FeedParser, RawFeed};
    use crate::session::Session;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NullParser;

    #[async_trait]
    impl FeedParser for NullParser {
        async fn fetch(&self, _url: &str) -> Result<RawFeed> {
            Ok(RawFeed::default())
        }
    }

    struct WhoAmI {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UserHandler for WhoAmI {
        async fn call(&self, ctx: &CommandContext, _args: &[String], user: User) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.console.println(user.name);
            Ok(())
        }
    }

    async fn setup(
        current_user: Option<&str>,
    ) -> (CommandContext, CommandRegistry, Arc<AtomicUsize>, TempDir) {
        let db = Database::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::load(dir.path().join("session.json")).unwrap();
        if let Some(name) = current_user {
            session.set_user(name).unwrap();
        }
        let ctx = CommandContext::new(db, session, Arc::new(NullParser), Config::default())
            .with_console(Console::captured());

        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(
            "whoami",
            require_user(WhoAmI {
                calls: calls.clone(),
            }),
        );
        (ctx, registry, calls, dir)
    }

    #[tokio::test]
    async fn test_no_current_user() {
        let (ctx, registry, calls, _dir) = setup(None).await;

        let result = registry.run(&ctx, "whoami", &[]).await;

        assert!(matches!(result, Err(GatorError::NoCurrentUser)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_current_user_not_registered() {
        let (ctx, registry, calls, _dir) = setup(Some("ghost")).await;

        let result = registry.run(&ctx, "whoami", &[]).await;

        assert!(matches!(result, Err(GatorError::UserNotFound(name)) if name == "ghost"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolved_user_is_passed_through() {
        let (ctx, registry, calls, _dir) = setup(Some("alice")).await;
        UserRepository::new(ctx.db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();

        registry.run(&ctx, "whoami", &[]).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.console.lines(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_resolve_current_user() {
        let (ctx, _registry, _calls, _dir) = setup(Some("alice")).await;
        let created = UserRepository::new(ctx.db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();

        let user = resolve_current_user(&ctx).await.unwrap();
        assert_eq!(user, created);
    }
}
