//! Fixed texts for bot commands.

use chrono::{DateTime, Local};

use crate::relay::Stats;
use crate::util::format_uptime;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const INVALID_MESSAGE: &str =
    "I received your message, but it seems to be empty or invalid. Please try again!";

pub fn welcome(first_name: &str) -> String {
    format!(
        "🤖 Welcome to the 24/7 Bot!\n\n\
         Hello {first_name}! 👋\n\n\
         I'm your friendly bot that's available around the clock to help you.\n\n\
         Available Commands:\n\
         • /start - Show this welcome message\n\
         • /help - Get help and available commands\n\
         • /status - Check bot status\n\
         • /echo <message> - Echo your message back\n\
         • /reset - Forget our conversation so far\n\n\
         You can also just send me any message and I'll respond!"
    )
}

pub fn help(commands: &str) -> String {
    format!(
        "🆘 Bot Help & Commands\n\n\
         {commands}\n\n\
         Message Handling:\n\
         Send me any text message and I'll reply. When the remote model is \
         unavailable I still answer with a quick built-in reply.\n\n\
         Bot Status: Online ✅"
    )
}

/// Everything the /status command reports.
pub struct StatusReport {
    pub started: DateTime<Local>,
    pub now: DateTime<Local>,
    pub messages_processed: u64,
    pub stats: Stats,
}

pub fn status(report: &StatusReport) -> String {
    let uptime = format_uptime(report.now - report.started);
    format!(
        "📊 Bot Status Report\n\n\
         🟢 Status: Online and Running\n\
         ⏰ Uptime: {uptime}\n\
         🕐 Started: {}\n\
         💬 Messages Processed: {}\n\
         🤖 Bot Version: {VERSION}\n\n\
         Conversations: {}\n\
         Endpoint: {} ({} configured)",
        report.started.format("%Y-%m-%d %H:%M:%S"),
        report.messages_processed,
        report.stats.active_conversations,
        report.stats.current_endpoint,
        report.stats.total_endpoints,
    )
}

pub fn echo(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        "Usage: /echo <message>\n\nExample: /echo Hello World!".to_string()
    } else {
        format!("🔄 Echo: {text}")
    }
}

pub fn reset(had_history: bool) -> String {
    if had_history {
        "🧹 Done! I've forgotten our conversation so far.".to_string()
    } else {
        "There was nothing to forget - we're starting fresh anyway.".to_string()
    }
}
