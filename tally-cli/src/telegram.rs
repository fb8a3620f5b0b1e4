//! Minimal Telegram Bot API client: long polling plus the few methods the bot needs.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix time
    pub date: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Something the conversation wants done in the chat.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Delete {
        chat_id: i64,
        message_id: i64,
    },
}

pub struct Bot {
    client: reqwest::Client,
    base: String,
}

impl Bot {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{API_BASE}/bot{token}"),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let resp = self
            .client
            .post(format!("{}/{method}", self.base))
            .timeout(timeout)
            .json(&params)
            .send()
            .await
            .with_context(|| format!("telegram {method}"))?;

        let status = resp.status();
        let body: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("telegram {method}: decode response (HTTP {status})"))?;

        if !body.ok {
            bail!(
                "telegram {method} failed: {}",
                body.description.unwrap_or_else(|| format!("HTTP {status}"))
            );
        }
        body.result
            .ok_or_else(|| anyhow::anyhow!("telegram {method}: empty result"))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let params = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        // The HTTP timeout has to outlive the server-side poll
        self.call("getUpdates", params, Duration::from_secs(timeout_secs + 10))
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(kb) = keyboard {
            params["reply_markup"] = serde_json::to_value(kb)?;
        }
        self.call("sendMessage", params, request_timeout()).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(kb) = keyboard {
            params["reply_markup"] = serde_json::to_value(kb)?;
        }
        // Returns either the edited Message or `true`
        let _: serde_json::Value = self.call("editMessageText", params, request_timeout()).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let params = json!({ "callback_query_id": callback_query_id });
        let _: bool = self.call("answerCallbackQuery", params, request_timeout()).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let params = json!({ "chat_id": chat_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", params, request_timeout()).await?;
        Ok(())
    }

    pub async fn perform(&self, action: &Action) -> Result<()> {
        match action {
            Action::Send {
                chat_id,
                text,
                keyboard,
            } => {
                self.send_message(*chat_id, text, keyboard.as_ref()).await?;
            }
            Action::Edit {
                chat_id,
                message_id,
                text,
                keyboard,
            } => {
                self.edit_message_text(*chat_id, *message_id, text, keyboard.as_ref())
                    .await?;
            }
            Action::Delete {
                chat_id,
                message_id,
            } => {
                self.delete_message(*chat_id, *message_id).await?;
            }
        }
        Ok(())
    }
}

fn request_timeout() -> Duration {
    Duration::from_secs(30)
}
