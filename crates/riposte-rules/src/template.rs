// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{placeholder}` template rendering for text action payloads.
//!
//! Supported placeholders: `{sender}` (sender display name, falling back to
//! the sender id), `{text}` (the triggering message text), `{chat}` (chat
//! display name, falling back to the chat id), plus any key present in the
//! message's metadata map. Unknown placeholders are left intact.

use riposte_core::types::Message;

/// Render an action payload template against the triggering message.
pub fn render(template: &str, message: &Message) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) => {
                let name = &after_open[..close];
                match resolve(name, message) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // Unterminated brace: emit the remainder verbatim.
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve(name: &str, message: &Message) -> Option<String> {
    match name {
        "sender" => Some(
            message
                .metadata
                .get("sender_name")
                .cloned()
                .unwrap_or_else(|| message.sender_id.clone()),
        ),
        "text" => Some(message.text.clone()),
        "chat" => Some(
            message
                .metadata
                .get("chat_name")
                .cloned()
                .unwrap_or_else(|| message.chat_id.0.clone()),
        ),
        other => message.metadata.get(other).cloned(),
    }
}
