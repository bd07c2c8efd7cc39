use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use teloxide::prelude::*;
use teloxide::types::{Chat, User};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use relaybot::config::Config;
use relaybot::relay::{ChatContext, EndpointPool, ResponseEngine};
use relaybot::replies::{self, StatusReport};
use relaybot::util::{format_user_info, is_valid_message, parse_command, sanitize_text};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
enum Command {
    #[command(description = "welcome message and bot introduction")]
    Start,
    #[command(description = "show this help message")]
    Help,
    #[command(description = "display bot status and uptime")]
    Status,
    #[command(description = "echo your message back")]
    Echo(String),
    #[command(description = "forget our conversation so far")]
    Reset,
}

struct BotState {
    engine: ResponseEngine,
    started: DateTime<Local>,
    messages_processed: AtomicU64,
}

impl BotState {
    fn new(config: &Config, pool: EndpointPool) -> Self {
        Self {
            engine: ResponseEngine::new(Arc::new(pool), config.remote_config()),
            started: Local::now(),
            messages_processed: AtomicU64::new(0),
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "relaybot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "relaybot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into())),
        )
        .init();

    info!("🚀 Starting relaybot...");
    info!("Loaded config from {config_path}");
    info!("{} endpoint(s), request timeout {:?}", config.endpoints.len(), config.request_timeout);

    let pool = match EndpointPool::new(config.endpoints.clone()) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let state = Arc::new(BotState::new(&config, pool));

    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped.");
}

fn chat_context(chat: &Chat) -> ChatContext {
    if chat.is_group() || chat.is_supergroup() {
        ChatContext::Group
    } else {
        ChatContext::Private
    }
}

fn describe(user: Option<&User>) -> String {
    match user {
        Some(u) => format_user_info(u.id.0, u.username.as_deref(), &u.first_name, u.last_name.as_deref()),
        None => "Unknown User".to_string(),
    }
}

async fn reply(bot: &Bot, msg: &Message, text: impl Into<String>) {
    if let Err(e) = bot.send_message(msg.chat.id, text.into()).await {
        warn!("Failed to send reply to chat {}: {e}", msg.chat.id);
    }
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let user = msg.from.as_ref();
    let who = describe(user);

    match cmd {
        Command::Start => {
            let first_name = user.map(|u| u.first_name.as_str()).unwrap_or("there");
            reply(&bot, &msg, replies::welcome(first_name)).await;
            info!("Start command received from {who}");
        }
        Command::Help => {
            reply(&bot, &msg, replies::help(&Command::descriptions().to_string())).await;
            info!("Help command received from {who}");
        }
        Command::Status => {
            let report = StatusReport {
                started: state.started,
                now: Local::now(),
                messages_processed: state.messages_processed.load(Ordering::Relaxed),
                stats: state.engine.stats(),
            };
            reply(&bot, &msg, replies::status(&report)).await;
            info!("Status command received from {who}");
        }
        Command::Echo(text) => {
            reply(&bot, &msg, replies::echo(&text)).await;
            info!("Echo command received from {who}: {}", sanitize_text(&text));
        }
        Command::Reset => {
            let user_id = user.map(|u| u.id.0.to_string()).unwrap_or_default();
            let cleared = state.engine.clear_history(&user_id);
            reply(&bot, &msg, replies::reset(cleared)).await;
            info!("Reset command received from {who} (had history: {cleared})");
        }
    }

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let who = describe(Some(user));

    if let Some(command) = msg.text().and_then(parse_command) {
        info!("Ignoring unknown command /{command} from {who}");
        return Ok(());
    }

    let text = msg.text();
    if !is_valid_message(text) {
        if text.is_some() {
            reply(&bot, &msg, replies::INVALID_MESSAGE).await;
        }
        return Ok(());
    }
    let text = text.unwrap_or_default();

    state.messages_processed.fetch_add(1, Ordering::Relaxed);

    let context = chat_context(&msg.chat);
    let response = state
        .engine
        .generate_response(text, &user.id.0.to_string(), context)
        .await;
    reply(&bot, &msg, response).await;

    let preview: String = text.chars().take(50).collect();
    info!("Message from {who} ({}): \"{}\"", context.as_str(), sanitize_text(&preview));

    Ok(())
}
