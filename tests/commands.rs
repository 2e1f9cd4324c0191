//! Command tests for gator.
//!
//! Every command is run through the registry, the way `main` runs it.

mod common;

use common::{TestEnv, DATE};
use gator::feed::{FeedFollowRepository, FeedRepository, RawItem};
use gator::{GatorError, Session, UserRepository};

#[tokio::test]
async fn test_register_sets_current_user() {
    let env = TestEnv::new().await;

    let out = env.output("register", &["alice"]).await;
    assert_eq!(out, vec!["User alice was created"]);

    assert_eq!(env.ctx.current_user_name().await.as_deref(), Some("alice"));

    // Persisted to the session file
    let reloaded = Session::load(env.session_path()).unwrap();
    assert_eq!(reloaded.current_user_name(), Some("alice"));
}

#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();

    let result = env.run("register", &["alice"]).await;
    assert!(matches!(result, Err(GatorError::Conflict(_))));
}

#[tokio::test]
async fn test_register_validates_arguments() {
    let env = TestEnv::new().await;

    assert!(matches!(
        env.run("register", &[]).await,
        Err(GatorError::Validation(_))
    ));
    assert!(matches!(
        env.run("register", &["a", "b"]).await,
        Err(GatorError::Validation(_))
    ));
    assert!(matches!(
        env.run("register", &[""]).await,
        Err(GatorError::Validation(_))
    ));
    assert!(env.ctx.current_user_name().await.is_none());
}

#[tokio::test]
async fn test_login_requires_existing_user() {
    let env = TestEnv::new().await;

    let result = env.run("login", &["bob"]).await;
    assert!(matches!(result, Err(GatorError::UserNotFound(name)) if name == "bob"));
    assert!(env.ctx.current_user_name().await.is_none());

    env.run("register", &["bob"]).await.unwrap();
    env.run("register", &["carol"]).await.unwrap();
    let out = env.output("login", &["bob"]).await;
    assert_eq!(out, vec!["Current user set to bob"]);
    assert_eq!(env.ctx.current_user_name().await.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_users_marks_current() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("register", &["bob"]).await.unwrap();

    let out = env.output("users", &[]).await;
    assert_eq!(out, vec!["* alice", "* bob (current)"]);
}

#[tokio::test]
async fn test_reset_deletes_everything() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();

    let out = env.output("reset", &[]).await;
    assert_eq!(out, vec!["Database reset: 1 user(s) deleted"]);

    let pool = env.ctx.db.pool();
    assert!(UserRepository::new(pool).list_all().await.unwrap().is_empty());
    assert_eq!(FeedRepository::new(pool).count().await.unwrap(), 0);
    assert!(env.output("users", &[]).await.is_empty());
}

#[tokio::test]
async fn test_unknown_command() {
    let env = TestEnv::new().await;
    let result = env.run("frobnicate", &[]).await;
    assert!(matches!(result, Err(GatorError::UnknownCommand(name)) if name == "frobnicate"));
}

#[tokio::test]
async fn test_gated_commands_need_current_user() {
    let env = TestEnv::new().await;

    for (command, args) in [
        ("addfeed", vec!["Blog", "http://x/feed"]),
        ("follow", vec!["http://x/feed"]),
        ("unfollow", vec!["http://x/feed"]),
        ("following", vec![]),
        ("browse", vec![]),
    ] {
        let result = env.run(command, &args).await;
        assert!(
            matches!(result, Err(GatorError::NoCurrentUser)),
            "{command} should require a current user"
        );
    }
    assert_eq!(FeedRepository::new(env.ctx.db.pool()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_gated_command_with_deleted_user() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("reset", &[]).await.unwrap();

    let result = env.run("addfeed", &["Blog", "http://x/feed"]).await;
    assert!(matches!(result, Err(GatorError::UserNotFound(name)) if name == "alice"));
    assert_eq!(FeedRepository::new(env.ctx.db.pool()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_addfeed_creates_and_follows() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();

    let out = env.output("addfeed", &["Blog", "http://x/feed"]).await;
    assert_eq!(out, vec!["Feed Blog (http://x/feed) added and followed"]);

    assert_eq!(env.output("following", &[]).await, vec!["* Blog"]);
    assert_eq!(
        env.output("feeds", &[]).await,
        vec!["* Blog http://x/feed (added by alice)"]
    );
}

#[tokio::test]
async fn test_addfeed_rejects_bad_url() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();

    for url in ["not a url", "ftp://x/feed", "file:///etc/passwd"] {
        let result = env.run("addfeed", &["Blog", url]).await;
        assert!(
            matches!(result, Err(GatorError::Validation(_))),
            "{url} should be rejected"
        );
    }
    assert!(matches!(
        env.run("addfeed", &["Blog"]).await,
        Err(GatorError::Validation(_))
    ));
}

#[tokio::test]
async fn test_addfeed_duplicate_url_conflicts() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();

    let result = env.run("addfeed", &["Other", "http://x/feed"]).await;
    assert!(matches!(result, Err(GatorError::Conflict(_))));
}

#[tokio::test]
async fn test_follow_is_unique() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();
    env.run("register", &["bob"]).await.unwrap();

    let out = env.output("follow", &["http://x/feed"]).await;
    assert_eq!(out, vec!["bob now follows Blog"]);

    let result = env.run("follow", &["http://x/feed"]).await;
    assert!(matches!(result, Err(GatorError::Conflict(_))));

    let pool = env.ctx.db.pool();
    let bob = UserRepository::new(pool).get_by_name("bob").await.unwrap().unwrap();
    let feed = FeedRepository::new(pool)
        .get_by_url("http://x/feed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        FeedFollowRepository::new(pool)
            .count_pair(bob.id, feed.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_follow_unknown_feed() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();

    let result = env.run("follow", &["http://nowhere/feed"]).await;
    assert!(matches!(result, Err(GatorError::NotFound(_))));
}

#[tokio::test]
async fn test_unfollow() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();

    let out = env.output("unfollow", &["http://x/feed"]).await;
    assert_eq!(out, vec!["alice unfollowed Blog"]);
    assert!(env.output("following", &[]).await.is_empty());

    let result = env.run("unfollow", &["http://x/feed"]).await;
    assert!(matches!(result, Err(GatorError::NotFound(_))));
}

#[tokio::test]
async fn test_browse_arguments() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();

    assert_eq!(env.output("browse", &[]).await, vec!["No posts yet"]);
    for bad in ["0", "-1", "two"] {
        assert!(
            matches!(env.run("browse", &[bad]).await, Err(GatorError::Validation(_))),
            "{bad} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_browse_default_limit() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();
    env.parser.serve(
        "http://x/feed",
        vec![
            RawItem::new("First", "http://x/1", "Mon, 02 Jan 2006 10:00:00 +0000"),
            RawItem::new("Second", "http://x/2", "Mon, 02 Jan 2006 11:00:00 +0000"),
            RawItem::new("Third", "http://x/3", "Mon, 02 Jan 2006 12:00:00 +0000"),
        ],
    );

    let scheduler = gator::FetchScheduler::new(
        env.ctx.db.clone(),
        env.parser.clone(),
        std::time::Duration::from_secs(60),
    );
    scheduler.tick().await;

    let out = env.output("browse", &[]).await;
    assert_eq!(
        out,
        vec![
            "2006-01-02 12:00 Third",
            "    http://x/3",
            "2006-01-02 11:00 Second",
            "    http://x/2",
        ]
    );
}

#[tokio::test]
async fn test_agg_rejects_bad_interval() {
    let env = TestEnv::new().await;

    for bad in ["0s", "-1m", "soon"] {
        assert!(
            matches!(env.run("agg", &[bad]).await, Err(GatorError::Validation(_))),
            "{bad} should be rejected"
        );
    }
    assert!(matches!(
        env.run("agg", &[]).await,
        Err(GatorError::Validation(_))
    ));
    assert!(env.parser.calls().is_empty());
}

#[tokio::test]
async fn test_agg_runs_until_cancelled() {
    let env = TestEnv::new().await;
    env.run("register", &["alice"]).await.unwrap();
    env.run("addfeed", &["Blog", "http://x/feed"]).await.unwrap();
    env.parser
        .serve("http://x/feed", vec![RawItem::new("Hello", "http://x/hello", DATE)]);
    env.ctx.console.clear();

    let cancel = env.ctx.cancel.clone();
    let (result, _) = tokio::join!(env.run("agg", &["10ms"]), async {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();
    });

    result.unwrap();
    assert_eq!(env.ctx.console.lines()[0], "Collecting feeds every 10ms");
    assert!(env.parser.calls().len() >= 2);
    assert_eq!(
        gator::feed::PostRepository::new(env.ctx.db.pool())
            .count()
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_help_lists_commands() {
    let env = TestEnv::new().await;
    let out = env.output("help", &[]).await;
    assert_eq!(out[0], "Commands:");
    assert!(out.contains(&"  register".to_string()));
    assert!(out.contains(&"  browse".to_string()));
    assert_eq!(out.last().map(String::as_str), Some("  help"));
}
