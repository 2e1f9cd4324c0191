//! Test helpers for command-level tests.
//!
//! Provides a TestEnv wiring an in-memory database, a session file in a
//! temporary directory, a captured console and a stub feed parser.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use gator::feed::{FeedParser, RawFeed, RawItem};
use gator::{build_registry, CommandContext, CommandRegistry, Config, Console, Database, Session};
use gator::{GatorError, Result};

/// RFC 2822 date accepted by the ingester.
pub const DATE: &str = "Mon, 02 Jan 2006 15:04:05 +0000";

/// Feed parser serving canned items per URL.
#[derive(Default)]
pub struct StubParser {
    feeds: Mutex<HashMap<String, Vec<RawItem>>>,
    calls: Mutex<Vec<String>>,
}

impl StubParser {
    /// Serve `items` for `url`. Unknown URLs fail to fetch.
    pub fn serve(&self, url: &str, items: Vec<RawItem>) {
        self.feeds.lock().unwrap().insert(url.to_string(), items);
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedParser for StubParser {
    async fn fetch(&self, url: &str) -> Result<RawFeed> {
        self.calls.lock().unwrap().push(url.to_string());
        let items = self
            .feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| GatorError::Fetch(format!("HTTP error: 404 for {url}")))?;
        Ok(RawFeed {
            title: "stub".to_string(),
            items,
        })
    }
}

/// A ready-to-use command environment.
pub struct TestEnv {
    pub ctx: CommandContext,
    pub registry: CommandRegistry,
    pub parser: Arc<StubParser>,
    pub dir: TempDir,
}

impl TestEnv {
    /// Create an environment with no session file and an empty database.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(dir.path().join("gatorconfig.json")).unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let parser = Arc::new(StubParser::default());

        let ctx = CommandContext::new(db, session, parser.clone(), Config::default())
            .with_console(Console::captured());

        Self {
            ctx,
            registry: build_registry(),
            parser,
            dir,
        }
    }

    /// Run a command with string arguments.
    pub async fn run(&self, command: &str, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.registry.run(&self.ctx, command, &args).await
    }

    /// Run a command, expecting success, and return the lines it printed.
    pub async fn output(&self, command: &str, args: &[&str]) -> Vec<String> {
        self.ctx.console.clear();
        self.run(command, args)
            .await
            .unwrap_or_else(|e| panic!("{command} {args:?} failed: {e}"));
        self.ctx.console.lines()
    }

    /// Path of the session file.
    pub fn session_path(&self) -> std::path::PathBuf {
        self.dir.path().join("gatorconfig.json")
    }
}
