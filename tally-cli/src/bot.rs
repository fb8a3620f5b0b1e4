//! Chat conversation: menus, manual entries and pasted-notification imports.
//!
//! `Conversation` turns incoming updates into `Action`s and never touches the
//! network itself; `run` owns the Telegram client and the polling loop.

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tally_core::{currency_from_source, Catalog, LedgerRow, ManualEntry, RowContext};
use tally_ingest::parse_notifications;
use tally_ledger::{Ledger, LedgerError, Reconnecting, SheetsLedger};

use crate::config::{KeyboardLayout, Settings};
use crate::keyboard;
use crate::session::Session;
use crate::telegram::{Action, Bot, InlineKeyboardMarkup, Update};

const PICK_CATEGORY: &str = "Выбери категорию:";
const NO_SOURCE_LINE: &str = "Источник не выбран. Валюта не определена.";

#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub layout: KeyboardLayout,
    pub sms_excerpt_chars: usize,
    pub fallback_currency: String,
    pub timezone: Tz,
}

impl From<&Settings> for ConversationOptions {
    fn from(s: &Settings) -> Self {
        Self {
            layout: s.layout,
            sms_excerpt_chars: s.sms_excerpt_chars,
            fallback_currency: s.fallback_currency.clone(),
            timezone: s.timezone,
        }
    }
}

pub struct Conversation<L> {
    ledger: Reconnecting<L>,
    catalog: Arc<Catalog>,
    sessions: HashMap<i64, Session>,
    opts: ConversationOptions,
}

impl<L: Ledger> Conversation<L> {
    pub fn new(ledger: L, opts: ConversationOptions) -> Self {
        Self {
            ledger: Reconnecting::new(ledger),
            catalog: Arc::new(Catalog::default()),
            sessions: HashMap::new(),
            opts,
        }
    }

    pub fn ledger(&self) -> &L {
        self.ledger.inner()
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        self.ledger.inner_mut()
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn session(&self, chat_id: i64) -> Option<&Session> {
        self.sessions.get(&chat_id)
    }

    /// Open the ledger and load the first catalog snapshot.
    pub async fn connect(&mut self) -> Result<(), LedgerError> {
        self.ledger.reconnect().await?;
        self.reload().await
    }

    /// Swap in a fresh catalog; on failure the previous one stays.
    pub async fn reload(&mut self) -> Result<(), LedgerError> {
        let catalog = self.ledger.load_catalog().await?;
        info!(
            categories = catalog.categories.len(),
            sources = catalog.sources.len(),
            "catalog reloaded"
        );
        self.catalog = Arc::new(catalog);
        Ok(())
    }

    pub async fn handle_update(&mut self, update: &Update, now: DateTime<Tz>) -> Vec<Action> {
        if let Some(cb) = &update.callback_query {
            let (Some(msg), Some(data)) = (&cb.message, &cb.data) else {
                return Vec::new();
            };
            return self.on_callback(msg.chat.id, msg.message_id, data);
        }

        let Some(msg) = &update.message else {
            return Vec::new();
        };
        let Some(text) = msg.text.as_deref() else {
            return Vec::new();
        };
        let first_name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or("");

        match command_name(text) {
            Some("start") => self.on_start(msg.chat.id, first_name),
            Some("reboot") => self.on_reboot(msg.chat.id, first_name).await,
            Some(other) => {
                debug!(command = other, "ignoring unknown command");
                Vec::new()
            }
            None => {
                let date = message_date(msg.date, &self.opts.timezone)
                    .unwrap_or_else(|| now.date_naive());
                self.on_text(msg.chat.id, msg.message_id, text, date, now.year())
                    .await
            }
        }
    }

    fn source_line(&self, source: Option<&str>) -> String {
        match source {
            Some(s) => format!(
                "Источник: {s} (Валюта: {})",
                currency_from_source(s, &self.opts.fallback_currency)
            ),
            None => NO_SOURCE_LINE.to_string(),
        }
    }

    fn categories_keyboard(&self, source: Option<&str>) -> InlineKeyboardMarkup {
        keyboard::categories(&self.catalog, source, &self.opts.layout)
    }

    fn on_start(&mut self, chat_id: i64, first_name: &str) -> Vec<Action> {
        if self.catalog.sources.is_empty() {
            return vec![send(
                chat_id,
                "Список источников пуст. Пожалуйста, заполните источники в Google Таблице \
(лист 'system', колонка F) и выполните /reboot.",
                None,
            )];
        }

        let session = self.sessions.entry(chat_id).or_default();
        if session.source.is_none() {
            session.source = self.catalog.first_source().map(str::to_string);
        }
        let source = session.source.clone();

        let text = format!(
            "Привет, {first_name}!\nВыбери действие:\nТекущий {}",
            lowercase_first(&self.source_line(source.as_deref()))
        );
        vec![send(
            chat_id,
            &text,
            Some(self.categories_keyboard(source.as_deref())),
        )]
    }

    async fn on_reboot(&mut self, chat_id: i64, first_name: &str) -> Vec<Action> {
        if let Err(e) = self.reload().await {
            error!(error = %e, "catalog reload failed");
            return vec![send(
                chat_id,
                &format!("Ошибка при обновлении данных из таблицы: {e}"),
                None,
            )];
        }

        let session = self.sessions.entry(chat_id).or_default();
        let stale = match &session.source {
            Some(s) => !self.catalog.has_source(s),
            None => true,
        };
        if stale {
            session.source = self.catalog.first_source().map(str::to_string);
        }

        let mut actions = vec![send(
            chat_id,
            "Данные клавиатуры (категории, подкатегории, источники) успешно обновлены.",
            None,
        )];
        actions.extend(self.on_start(chat_id, first_name));
        actions
    }

    fn on_callback(&mut self, chat_id: i64, message_id: i64, data: &str) -> Vec<Action> {
        let session = self.sessions.entry(chat_id).or_default();
        let source = session.source.clone();
        let edit = |text: String, kb: InlineKeyboardMarkup| Action::Edit {
            chat_id,
            message_id,
            text,
            keyboard: Some(kb),
        };

        if let Some(category) = data.strip_prefix(keyboard::CATEGORY_PREFIX) {
            session.category = Some(category.to_string());
            let Some(src) = source.as_deref() else {
                return vec![edit(
                    "Сначала выберите ИСТОЧНИК.\nЗатем выберите категорию.".to_string(),
                    self.categories_keyboard(None),
                )];
            };
            let text = format!(
                "{}\nКатегория: {category}\n\nВыберите подкатегорию:",
                self.source_line(Some(src))
            );
            return vec![edit(
                text,
                keyboard::subcategories(&self.catalog, category, &self.opts.layout),
            )];
        }

        if let Some(subcategory) = data.strip_prefix(keyboard::SUBCATEGORY_PREFIX) {
            session.subcategory = Some(subcategory.to_string());
            let category = session
                .category
                .clone()
                .unwrap_or_else(|| "Не выбрана".to_string());
            let Some(src) = source.as_deref() else {
                return vec![edit(
                    "Ошибка: Источник не выбран. Пожалуйста, вернитесь и выберите источник."
                        .to_string(),
                    self.categories_keyboard(None),
                )];
            };
            let text = format!(
                "Источник: {src}\nКатегория: {category}\nПодкатегория: {subcategory}\nВалюта: {}\n\n\
ВНЕСИТЕ СУММУ И КОММЕНТАРИЙ (ЧЕРЕЗ ПРОБЕЛ):",
                currency_from_source(src, &self.opts.fallback_currency)
            );
            return vec![edit(
                text,
                keyboard::subcategories(&self.catalog, &category, &self.opts.layout),
            )];
        }

        if let Some(name) = data.strip_prefix(keyboard::SET_SOURCE_PREFIX) {
            session.source = Some(name.to_string());
            session.clear_selection();
            let text = format!(
                "Источник '{name}' выбран (Валюта: {}).\n{PICK_CATEGORY}",
                currency_from_source(name, &self.opts.fallback_currency)
            );
            return vec![edit(text, self.categories_keyboard(Some(name)))];
        }

        match data {
            keyboard::BACK_TO_CATEGORIES | keyboard::BACK_TO_CATEGORIES_FROM_SOURCE => {
                session.clear_selection();
            }
            keyboard::SMS_BACK => {
                session.sms_mode = false;
            }
            keyboard::CHANGE_SOURCE => {
                if self.catalog.sources.is_empty() {
                    return vec![edit(
                        "Список источников пуст. Невозможно выбрать источник. Заполните Google Таблицу."
                            .to_string(),
                        self.categories_keyboard(source.as_deref()),
                    )];
                }
                return vec![edit(
                    "Выберите источник:".to_string(),
                    keyboard::sources(&self.catalog, &self.opts.layout),
                )];
            }
            keyboard::SMS => {
                let Some(src) = source.as_deref() else {
                    return vec![edit(
                        "Пожалуйста, сначала выберите ИСТОЧНИК.\nЗатем нажмите кнопку 'СМС' снова."
                            .to_string(),
                        self.categories_keyboard(None),
                    )];
                };
                session.sms_mode = true;
                let text = format!("{}\nВставьте скопированные СМС:", self.source_line(Some(src)));
                return vec![edit(text, keyboard::sms_back())];
            }
            other => {
                debug!(data = other, "ignoring unknown callback");
                return Vec::new();
            }
        }

        let text = format!("{}\n{PICK_CATEGORY}", self.source_line(source.as_deref()));
        vec![edit(text, self.categories_keyboard(source.as_deref()))]
    }

    async fn on_text(
        &mut self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        date: NaiveDate,
        current_year: i32,
    ) -> Vec<Action> {
        let session = self.sessions.entry(chat_id).or_default().clone();
        let Some(source) = session.source.clone() else {
            return vec![send(
                chat_id,
                "Ошибка: Источник не выбран. Пожалуйста, выберите источник через меню.",
                Some(self.categories_keyboard(None)),
            )];
        };

        if session.sms_mode {
            self.import_notifications(chat_id, message_id, text, &source, current_year)
                .await
        } else {
            self.record_manual(chat_id, text, &session, &source, date).await
        }
    }

    async fn import_notifications(
        &mut self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        source: &str,
        current_year: i32,
    ) -> Vec<Action> {
        let records = match parse_notifications(text, current_year) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "notification parse failed");
                return vec![send(chat_id, &format!("Ошибка при разборе СМС: {e}"), None)];
            }
        };

        let menu = Some(self.categories_keyboard(Some(source)));

        if records.is_empty() {
            self.set_sms_mode(chat_id, false);
            return vec![
                send(
                    chat_id,
                    "Не удалось распознать транзакции в СМС. Пожалуйста, проверьте формат.",
                    None,
                ),
                send(
                    chat_id,
                    &format!("{}\n{PICK_CATEGORY}", self.source_line(Some(source))),
                    menu,
                ),
            ];
        }

        let existing_rows = match self.ledger.row_count().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "fact sheet unavailable for import");
                return vec![send(
                    chat_id,
                    "Ошибка при записи данных из СМС. Не удалось подключиться к таблице.",
                    None,
                )];
            }
        };
        // the sheet is reachable, so the paste counts as handled
        self.set_sms_mode(chat_id, false);

        let currency = currency_from_source(source, &self.opts.fallback_currency);
        let ctx = RowContext {
            source,
            currency: &currency,
            existing_rows,
        };
        let rows =
            LedgerRow::from_notifications(&records, text, self.opts.sms_excerpt_chars, &ctx);
        if rows.is_empty() {
            return vec![send(
                chat_id,
                "Не найдено корректных транзакций для записи из СМС.",
                menu,
            )];
        }

        if let Err(e) = self.ledger.append_rows(&rows).await {
            error!(error = %e, "append of imported rows failed");
            return vec![send(
                chat_id,
                "Произошла ошибка при записи данных из СМС в таблицу.",
                None,
            )];
        }
        info!(count = rows.len(), source, "imported notifications");

        vec![
            Action::Delete {
                chat_id,
                message_id,
            },
            send(
                chat_id,
                &format!(
                    "Записаны {} транзакций из СМС (Источник: {source}, Валюта: {currency}).",
                    rows.len()
                ),
                menu,
            ),
        ]
    }

    async fn record_manual(
        &mut self,
        chat_id: i64,
        text: &str,
        session: &Session,
        source: &str,
        date: NaiveDate,
    ) -> Vec<Action> {
        let menu = Some(self.categories_keyboard(Some(source)));
        let missing = session.missing_for_manual();
        let (Some(category), Some(subcategory)) = (&session.category, &session.subcategory) else {
            let list: Vec<String> = missing.iter().map(|m| format!("- {m}")).collect();
            let text = format!(
                "Пожалуйста, сначала выберите:\n{}\nТекущий {}",
                list.join("\n"),
                lowercase_first(&self.source_line(Some(source)))
            );
            return vec![send(chat_id, &text, menu)];
        };

        let currency = currency_from_source(source, &self.opts.fallback_currency);
        let entry = match ManualEntry::parse(text) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "rejected manual entry");
                let text = format!(
                    "Неверный формат суммы. Пожалуйста, введите сумму (число) и комментарий через пробел.\n\
Источник: {source} (Валюта: {currency})\nКатегория: {category}\nПодкатегория: {subcategory}"
                );
                let subs = keyboard::subcategories(&self.catalog, category, &self.opts.layout);
                return vec![send(chat_id, &text, Some(subs))];
            }
        };

        let existing_rows = match self.ledger.row_count().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "fact sheet unavailable for manual entry");
                return vec![send(
                    chat_id,
                    "Ошибка при записи данных. Не удалось подключиться к таблице.",
                    None,
                )];
            }
        };

        let ctx = RowContext {
            source,
            currency: &currency,
            existing_rows,
        };
        let row = LedgerRow::manual(date, category, subcategory, entry.amount, &entry.comment, &ctx);
        if let Err(e) = self.ledger.append_rows(std::slice::from_ref(&row)).await {
            error!(error = %e, "append of manual row failed");
            return vec![send(
                chat_id,
                "Произошла ошибка при записи данных в таблицу.",
                None,
            )];
        }
        info!(amount = entry.amount, %category, source, "recorded manual entry");

        let text = format!(
            "Данные успешно записаны.\nИсточник: {source}\nКатегория: {category}\n\
Подкатегория: {subcategory}\nСумма: {} {currency}\nКомментарий: {}",
            entry.amount, entry.comment
        );
        vec![send(chat_id, &text, menu)]
    }

    fn set_sms_mode(&mut self, chat_id: i64, on: bool) {
        self.sessions.entry(chat_id).or_default().sms_mode = on;
    }
}

fn send(chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> Action {
    Action::Send {
        chat_id,
        text: text.to_string(),
        keyboard,
    }
}

/// `/start@tally_bot args` -> `start`
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?.strip_prefix('/')?;
    Some(first.split('@').next().unwrap_or(first))
}

fn message_date(unix: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(unix, 0).map(|t| t.with_timezone(tz).date_naive())
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Connect to the spreadsheet and serve the bot until Ctrl-C.
pub async fn run(settings: Settings) -> Result<()> {
    let bot = Bot::new(&settings.telegram_token);
    let ledger = SheetsLedger::new(settings.sheets.clone());
    let mut conversation = Conversation::new(ledger, ConversationOptions::from(&settings));

    // Keep serving with an empty menu; /reboot retries the load
    if let Err(e) = conversation.connect().await {
        error!(error = %e, "could not open spreadsheet at startup");
    }

    info!("polling for updates");
    let mut offset = 0;
    loop {
        let updates = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
            r = bot.get_updates(offset, settings.poll_timeout_secs) => r,
        };

        let updates = match updates {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = update.update_id + 1;
            if let Some(cb) = &update.callback_query {
                if let Err(e) = bot.answer_callback_query(&cb.id).await {
                    warn!(error = %e, "answerCallbackQuery failed");
                }
            }

            let now = Utc::now().with_timezone(&settings.timezone);
            for action in conversation.handle_update(&update, now).await {
                if let Err(e) = bot.perform(&action).await {
                    warn!(error = %e, ?action, "telegram action failed");
                }
            }
        }
    }
}
