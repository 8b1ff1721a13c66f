use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SlackContext;

static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" [|\-] ").expect("Invalid regex"));
static THREAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Thread in #([\w-]+)").expect("Invalid regex"));
static CHANNEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#([\w-]+)").expect("Invalid regex"));
static DM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([\w.-]+)").expect("Invalid regex"));
static MESSAGE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w.-]+)\s{2,}(\d{1,2}:\d{2}(?:\s*[AP]M)?)\s*$").expect("Invalid regex")
});

const CHAT_CLIENTS: &[&str] = &["Slack"];

pub fn is_chat_client(app_name: &str) -> bool {
    CHAT_CLIENTS.contains(&app_name)
}

/// Parses titles such as `#chan | Workspace`, `#chan - Workspace`,
/// `@user | Workspace` and `Thread in #chan | Workspace`.
pub fn parse_slack_title(title: &str) -> SlackContext {
    let mut context = SlackContext::default();

    let Some(separator) = SEPARATOR_RE.find(title) else {
        return context;
    };
    let left = &title[..separator.start()];
    context.workspace = Some(title[separator.end()..].trim().to_string());

    if let Some(caps) = THREAD_RE.captures(left) {
        context.channel = Some(caps[1].to_string());
        context.is_thread = true;
    } else if let Some(caps) = CHANNEL_RE.captures(left) {
        context.channel = Some(caps[1].to_string());
    } else if let Some(caps) = DM_RE.captures(left) {
        context.dm_user = Some(caps[1].to_string());
    }

    context
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackMessage {
    pub username: String,
    pub timestamp: String,
    pub content: String,
}

/// Groups OCR lines into messages, starting a new one at every
/// `username  HH:MM[ AM/PM]` header line.
pub fn extract_conversations(ocr_text: &str) -> Vec<SlackMessage> {
    let mut messages = Vec::new();
    let mut current: Option<SlackMessage> = None;

    for line in ocr_text.lines() {
        let line = line.trim();
        if let Some(caps) = MESSAGE_HEADER_RE.captures(line) {
            messages.extend(current.take());
            current = Some(SlackMessage {
                username: caps[1].to_string(),
                timestamp: caps[2].to_string(),
                content: String::new(),
            });
        } else if let Some(message) = current.as_mut() {
            if line.is_empty() {
                continue;
            }
            if !message.content.is_empty() {
                message.content.push('\n');
            }
            message.content.push_str(line);
        }
    }

    messages.extend(current);
    messages
}
