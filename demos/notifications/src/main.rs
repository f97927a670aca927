//! Notification Center Demo
//!
//! A small notification center wired on an EventFlow broker:
//!
//! ```text
//! emit ──▶ timing ──▶ mute filter ──▶ spam filter ──▶ [logger] ──▶ inbox, audit
//!                                                                    │
//!                                                        emit inbox:unread ──▶ badge
//! ```
//!
//! - The **inbox** counts messages for the signed-in user and republishes the
//!   unread count (a re-entrant emit).
//! - The **badge** keeps the latest unread count as local state.
//! - The **spam filter** fails on every Nth message; what happens next is up
//!   to the error policy.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package notifications
//! cargo run --package notifications -- --logger --policy middleware=stop --policy emit=stop
//! EVENTFLOW_LOGGING__LEVEL=debug cargo run --package notifications
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use eventflow::context::{Emitter, EventListenerHook, EventState};
use eventflow::prelude::*;
use eventflow::runtime::validate_config;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{debug, info, warn};

const CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub from: String,
    pub to: u64,
    pub body: String,
    pub sent_at: OffsetDateTime,
}

#[derive(EventMap)]
#[event_map(crate = "eventflow::core")]
pub struct NotificationEvents {
    /// A user signed in.
    #[event(name = "user:login")]
    user_login: User,
    /// A message arrived for some user.
    #[event(name = "message:received")]
    message_received: Message,
    /// The signed-in user's unread count changed.
    #[event(name = "inbox:unread")]
    unread_count: u32,
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "notifications", about = "EventFlow notification center demo")]
struct Cli {
    /// Configuration file (default: search for eventflow.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(short, long, default_value = "development")]
    profile: String,

    /// Override an error policy slot, e.g. `--policy listener=stop`
    #[arg(long = "policy", value_name = "KIND=MODE")]
    policies: Vec<String>,

    /// Inject the logger middleware
    #[arg(long)]
    logger: bool,

    /// Number of messages to deliver
    #[arg(short = 'n', long, default_value_t = 6)]
    messages: u32,

    /// Flag every Nth message as spam (0 disables the filter)
    #[arg(long, default_value_t = 3)]
    reject_every: u32,
}

// ============================================================================
// Middleware
// ============================================================================

fn timing() -> Arc<dyn Middleware> {
    Arc::new(from_fn(|event, next| {
        let started = Instant::now();
        let result = next.run(event);
        debug!(event = event.name(), elapsed = ?started.elapsed(), "Dispatch finished");
        result?;
        Ok(())
    }))
}

/// Drops messages from muted senders before any listener sees them.
fn mute_filter(muted: Vec<String>) -> Arc<dyn Middleware> {
    Arc::new(from_fn(move |event, next| {
        if let Some(message) = event.payload_as::<Message>()
            && muted.contains(&message.from)
        {
            debug!(from = %message.from, "Muted sender");
            return Ok(());
        }
        next.run(event)?;
        Ok(())
    }))
}

/// Fails on every `every`th message.
fn spam_filter(every: u32) -> Arc<dyn Middleware> {
    let seen = AtomicU32::new(0);
    Arc::new(from_fn(move |event, next| {
        if let Some(message) = event.payload_as::<Message>() {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            if every > 0 && n % every == 0 {
                return Err(format!("message from {} flagged as spam", message.from).into());
            }
        }
        next.run(event)?;
        Ok(())
    }))
}

// ============================================================================
// Components
// ============================================================================

/// Unread badge, re-rendered on every `inbox:unread`.
struct Badge {
    unread: EventState<UnreadCount>,
}

impl Badge {
    fn mount(scope: &Scope) -> Result<Self> {
        Ok(Self {
            unread: use_event_state(scope, UnreadCount, 0)?,
        })
    }

    fn render(&self) -> String {
        format!(
            "[{} unread | {} renders]",
            self.unread.get(),
            self.unread.renders()
        )
    }
}

/// Counts messages for one user and republishes the unread count.
struct Inbox {
    emitter: Emitter<NotificationEvents>,
    hook: EventListenerHook<MessageReceived, u64>,
}

impl Inbox {
    fn mount(scope: &Scope, user_id: u64) -> Result<Self> {
        let emitter = use_emit::<NotificationEvents>(scope)?;
        let listener = Self::listener(emitter.clone(), user_id);
        let hook = use_event_listener(scope, MessageReceived, listener, user_id)?;
        Ok(Self { emitter, hook })
    }

    fn listener(emitter: Emitter<NotificationEvents>, user_id: u64) -> Listener<MessageReceived> {
        let unread = AtomicU32::new(0);
        Listener::new(move |message: &Message| -> Result<()> {
            if message.to != user_id {
                return Ok(());
            }
            let count = unread.fetch_add(1, Ordering::SeqCst) + 1;
            emitter
                .emit(UnreadCount, count)
                .context("failed to publish unread count")?;
            Ok(())
        })
    }

    fn switch_user(&mut self, user_id: u64) {
        let listener = Self::listener(self.emitter.clone(), user_id);
        if self.hook.update_with(user_id, listener) {
            info!(user_id, "Inbox switched user");
        }
    }

    fn unmount(mut self) {
        self.hook.unmount();
    }
}

fn audit(message: &Message) -> Result<(), BoxError> {
    if message.body.trim().is_empty() {
        return Err(format!("empty message from {}", message.from).into());
    }
    info!(
        at = %message.sent_at.format(CLOCK)?,
        from = %message.from,
        to = message.to,
        "{}",
        message.body
    );
    Ok(())
}

fn compose(from: &str, to: u64, body: impl Into<String>) -> Message {
    Message {
        from: from.to_string(),
        to,
        body: body.into(),
        sent_at: OffsetDateTime::now_utc(),
    }
}

fn deliver(emitter: &Emitter<NotificationEvents>, badge: &Badge, message: Message) {
    if let Err(err) = emitter.emit(MessageReceived, message) {
        warn!(kind = %err.kind(), "Delivery failed: {err}");
    }
    info!("{}", badge.render());
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().profile(&cli.profile);
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;

    for policy in &cli.policies {
        let Some((kind, mode)) = policy.split_once('=') else {
            bail!("invalid --policy {policy:?}, expected KIND=MODE");
        };
        config.broker.set_policy(kind, mode)?;
    }
    if cli.logger {
        config.broker.logger = true;
    }
    validate_config(&config)?;
    LoggingBuilder::from_config(&config.logging).init();

    let mut options = config
        .broker
        .to_options()
        .middleware(timing())
        .middleware(mute_filter(vec!["spambot".to_string()]))
        .middleware(spam_filter(cli.reject_every));
    if config.broker.logger {
        options = options.logger_middleware(
            LoggerMiddleware::new()
                .with_custom(|event| debug!(event = event.name(), "Logger callback")),
        );
    }
    let broker = create_event_broker::<NotificationEvents>(options);
    info!(policy = ?broker.error_policy(), "Broker ready");

    // Component tree: app ─▶ header (badge), inbox
    let app = Scope::root().provide(broker.clone());
    let header = app.child();
    let badge = Badge::mount(&header)?;
    let mut inbox = Inbox::mount(&app, 1)?;
    let _welcome = use_listen_once(&app, UserLogin, |user: &User| {
        info!(user = %user.name, "Welcome back!");
    })?;
    broker.on(MessageReceived, audit);

    let emitter = use_emit::<NotificationEvents>(&app)?;
    emitter.emit(UserLogin, User { id: 1, name: "ada".to_string() })?;
    emitter.emit(UserLogin, User { id: 1, name: "ada".to_string() })?;

    for i in 1..=cli.messages {
        let message = match i {
            2 => compose("spambot", 1, "cheap watches"),
            4 => compose("grace", 1, ""),
            _ => compose("grace", 1, format!("hello #{i}")),
        };
        deliver(&emitter, &badge, message);
    }

    inbox.switch_user(2);
    emitter.emit(UserLogin, User { id: 2, name: "grace".to_string() })?;
    deliver(&emitter, &badge, compose("ada", 2, "welcome aboard"));
    deliver(&emitter, &badge, compose("ada", 1, "still there?"));

    inbox.unmount();
    info!(
        listeners = broker.listener_count(MessageReceived),
        events = ?broker.event_names(),
        "Inbox unmounted"
    );
    Ok(())
}
