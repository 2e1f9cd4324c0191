//! Command registry and the context handlers run in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::db::Database;
use crate::feed::FeedParser;
use crate::session::Session;
use crate::{GatorError, Result};

/// Where command output goes.
///
/// Normally stdout. Tests use a captured console to inspect output.
#[derive(Debug, Clone, Default)]
pub struct Console {
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl Console {
    /// Console printing to stdout.
    pub fn stdout() -> Self {
        Self { captured: None }
    }

    /// Console recording lines in memory.
    pub fn captured() -> Self {
        Self {
            captured: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Print one line.
    pub fn println(&self, line: impl Into<String>) {
        let line = line.into();
        match &self.captured {
            Some(buf) => {
                if let Ok(mut buf) = buf.lock() {
                    buf.push(line);
                }
            }
            None => println!("{line}"),
        }
    }

    /// Lines recorded so far. Always empty for stdout.
    pub fn lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .and_then(|buf| buf.lock().ok().map(|b| b.clone()))
            .unwrap_or_default()
    }

    /// Forget recorded lines.
    pub fn clear(&self) {
        if let Some(Ok(mut buf)) = self.captured.as_ref().map(|b| b.lock()) {
            buf.clear();
        }
    }
}

/// Everything a command handler may touch.
pub struct CommandContext {
    /// Open database.
    pub db: Database,
    /// Session state; commands that change the current user rewrite it.
    pub session: tokio::sync::Mutex<Session>,
    /// Feed parser used by `agg`.
    pub parser: Arc<dyn FeedParser>,
    /// Application configuration.
    pub config: Config,
    /// Output sink.
    pub console: Console,
    /// Cancels long-running commands.
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a context printing to stdout with a fresh cancellation token.
    pub fn new(
        db: Database,
        session: Session,
        parser: Arc<dyn FeedParser>,
        config: Config,
    ) -> Self {
        Self {
            db,
            session: tokio::sync::Mutex::new(session),
            parser,
            config,
            console: Console::stdout(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the output sink.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Replace the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Name of the session's current user, if any.
    pub async fn current_user_name(&self) -> Option<String> {
        self.session.lock().await.current_user_name().map(str::to_string)
    }
}

/// A named command.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Run the command with its arguments (command name excluded).
    async fn call(&self, ctx: &CommandContext, args: &[String]) -> Result<()>;
}

/// Ordered mapping from command names to handlers.
#[derive(Default)]
pub struct CommandRegistry {
    names: Vec<String>,
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    ///
    /// Re-registering a name replaces its handler and keeps its position.
    pub fn register(&mut self, name: impl Into<String>, handler: impl Handler + 'static) {
        let name = name.into();
        if !self.handlers.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.handlers.insert(name, Arc::new(handler));
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Run the handler registered under `name`.
    ///
    /// Fails with `UnknownCommand` if there is none. Handler errors are
    /// returned as-is.
    pub async fn run(&self, ctx: &CommandContext, name: &str, args: &[String]) -> Result<()> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| GatorError::UnknownCommand(name.to_string()))?;

        debug!(command = name, ?args, "Running command");
        handler.call(ctx, args).await
    }
}
