use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use tally_ledger::{Credentials, SheetsSettings};

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sheets: SheetsSection,
    pub bot: BotSection,
    pub currency: CurrencySection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsSection {
    /// Overridden by SPREADSHEET_ID
    pub spreadsheet_id: Option<String>,
    pub fact_sheet: String,
    pub system_sheet: String,
    /// Service-account JSON key. Overridden by GOOGLE_APPLICATION_CREDENTIALS_PATH
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSection {
    pub poll_timeout_secs: u64,
    /// How much of a pasted SMS goes into each row's comment
    pub sms_excerpt_chars: usize,
    pub categories_per_row: usize,
    pub subcategories_per_row: usize,
    pub sources_per_row: usize,
    /// IANA timezone for "today" and the current year
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencySection {
    /// Used when a source name is too short to end in a currency code
    pub fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheets: SheetsSection {
                spreadsheet_id: None,
                fact_sheet: "fact".to_string(),
                system_sheet: "system".to_string(),
                credentials_path: None,
            },
            bot: BotSection {
                poll_timeout_secs: 30,
                sms_excerpt_chars: 30,
                categories_per_row: 3,
                subcategories_per_row: 2,
                sources_per_row: 2,
                timezone: "Asia/Tashkent".to_string(),
            },
            currency: CurrencySection {
                fallback: tally_core::FALLBACK_CURRENCY.to_string(),
            },
            log: LogSection {
                filter: default_log_filter().to_string(),
            },
        }
    }
}

pub fn default_log_filter() -> &'static str {
    "tally=info,warn"
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Secrets and ids that only ever come from the environment.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub telegram_token: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub service_account_email: Option<String>,
    pub private_key: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl Env {
    pub fn from_process() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            telegram_token: var("TELEGRAM_TOKEN"),
            spreadsheet_id: var("SPREADSHEET_ID"),
            service_account_email: var("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            private_key: var("GOOGLE_PRIVATE_KEY").map(|k| unescape_newlines(&k)),
            credentials_path: var("GOOGLE_APPLICATION_CREDENTIALS_PATH").map(PathBuf::from),
        }
    }
}

/// Private keys pasted into env files usually carry literal `\n`.
pub fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Fully resolved, immutable runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub sheets: SheetsSettings,
    pub timezone: Tz,
    pub poll_timeout_secs: u64,
    pub sms_excerpt_chars: usize,
    pub layout: KeyboardLayout,
    pub fallback_currency: String,
}

#[derive(Debug, Clone, Copy)]
pub struct KeyboardLayout {
    pub categories_per_row: usize,
    pub subcategories_per_row: usize,
    pub sources_per_row: usize,
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        self.bot
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {}", self.bot.timezone))
    }

    pub fn layout(&self) -> KeyboardLayout {
        KeyboardLayout {
            categories_per_row: self.bot.categories_per_row.max(1),
            subcategories_per_row: self.bot.subcategories_per_row.max(1),
            sources_per_row: self.bot.sources_per_row.max(1),
        }
    }

    /// Merge file config with environment, failing on anything the bot can't run without.
    pub fn resolve(&self, env: &Env) -> Result<Settings> {
        let Some(telegram_token) = env.telegram_token.clone() else {
            bail!("TELEGRAM_TOKEN is not set");
        };

        let Some(spreadsheet_id) = env
            .spreadsheet_id
            .clone()
            .or_else(|| self.sheets.spreadsheet_id.clone())
        else {
            bail!("SPREADSHEET_ID is not set (env or [sheets].spreadsheet_id)");
        };

        let credentials = match (
            env.credentials_path
                .clone()
                .or_else(|| self.sheets.credentials_path.clone()),
            &env.service_account_email,
            &env.private_key,
        ) {
            (Some(path), _, _) if path.exists() => Credentials::KeyFile(path),
            (_, Some(email), Some(key)) => Credentials::ServiceAccount {
                client_email: email.clone(),
                private_key: key.clone(),
            },
            (Some(path), _, _) => bail!("credentials file not found: {}", path.display()),
            _ => bail!(
                "no Google credentials: set GOOGLE_APPLICATION_CREDENTIALS_PATH or \
GOOGLE_SERVICE_ACCOUNT_EMAIL + GOOGLE_PRIVATE_KEY"
            ),
        };

        Ok(Settings {
            telegram_token,
            sheets: SheetsSettings {
                spreadsheet_id,
                fact_sheet: self.sheets.fact_sheet.clone(),
                system_sheet: self.sheets.system_sheet.clone(),
                credentials,
            },
            timezone: self.timezone()?,
            poll_timeout_secs: self.bot.poll_timeout_secs,
            sms_excerpt_chars: self.bot.sms_excerpt_chars,
            layout: self.layout(),
            fallback_currency: self.currency.fallback.clone(),
        })
    }
}
