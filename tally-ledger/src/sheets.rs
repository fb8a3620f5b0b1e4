//! Google Sheets ledger via the Sheets v4 API and a service account.

use google_sheets4::api::ValueRange;
use google_sheets4::{oauth2, Sheets};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

use tally_core::{Catalog, LedgerRow};

use crate::error::LedgerError;
use crate::store::Ledger;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CERTS_URI: &str = "https://www.googleapis.com/oauth2/v1/certs";
const ROBOT_CERTS_URI: &str = "https://www.googleapis.com/robot/v1/metadata/x509";

type Hub = Sheets<HttpsConnector<HttpConnector>>;

/// Where the service-account key comes from.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A downloaded service-account JSON key
    KeyFile(PathBuf),
    /// Email and PEM key taken from the environment
    ServiceAccount {
        client_email: String,
        private_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    pub fact_sheet: String,
    pub system_sheet: String,
    pub credentials: Credentials,
}

pub struct SheetsLedger {
    settings: SheetsSettings,
    hub: Option<Hub>,
}

impl SheetsLedger {
    /// Create an unconnected ledger; the first call or `reconnect` opens it.
    pub fn new(settings: SheetsSettings) -> Self {
        Self { settings, hub: None }
    }

    pub fn is_connected(&self) -> bool {
        self.hub.is_some()
    }

    fn hub(&self) -> Result<&Hub, LedgerError> {
        self.hub.as_ref().ok_or(LedgerError::NotConnected)
    }

    fn fact_range(&self) -> String {
        a1_range(&self.settings.fact_sheet, "A:H")
    }

    fn system_range(&self) -> String {
        a1_range(&self.settings.system_sheet, "A:F")
    }

    async fn read_values(&self, range: &str) -> Result<Vec<Vec<Value>>, LedgerError> {
        let (_, vr) = self
            .hub()?
            .spreadsheets()
            .values_get(&self.settings.spreadsheet_id, range)
            .doit()
            .await
            .map_err(map_api_error)?;
        Ok(vr.values.unwrap_or_default())
    }
}

impl Ledger for SheetsLedger {
    async fn load_catalog(&mut self) -> Result<Catalog, LedgerError> {
        let range = self.system_range();
        let rows: Vec<Vec<String>> = self
            .read_values(&range)
            .await?
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let catalog = Catalog::from_rows(&rows);
        info!(
            categories = catalog.categories.len(),
            sources = catalog.sources.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    async fn row_count(&mut self) -> Result<usize, LedgerError> {
        let range = self.fact_range();
        Ok(self.read_values(&range).await?.len())
    }

    async fn append_rows(&mut self, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = self.fact_range();
        let body = ValueRange {
            values: Some(rows.iter().map(row_cells).collect()),
            ..Default::default()
        };
        self.hub()?
            .spreadsheets()
            .values_append(body, &self.settings.spreadsheet_id, &range)
            .value_input_option("USER_ENTERED")
            .insert_data_option("INSERT_ROWS")
            .doit()
            .await
            .map_err(map_api_error)?;
        debug!(count = rows.len(), "appended rows");
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), LedgerError> {
        self.hub = None;
        let hub = build_hub(&self.settings.credentials).await?;
        // Probe the spreadsheet so a bad id fails here rather than mid-write
        hub.spreadsheets()
            .get(&self.settings.spreadsheet_id)
            .doit()
            .await
            .map_err(map_api_error)?;
        self.hub = Some(hub);
        info!(spreadsheet = %self.settings.spreadsheet_id, "opened spreadsheet");
        Ok(())
    }
}

async fn service_account_key(creds: &Credentials) -> Result<oauth2::ServiceAccountKey, LedgerError> {
    match creds {
        Credentials::KeyFile(path) => oauth2::read_service_account_key(path)
            .await
            .map_err(|e| LedgerError::Auth(format!("read {}: {e}", path.display()))),
        Credentials::ServiceAccount {
            client_email,
            private_key,
        } => {
            let info = json!({
                "type": "service_account",
                "private_key": private_key,
                "client_email": client_email,
                "auth_uri": AUTH_URI,
                "token_uri": TOKEN_URI,
                "auth_provider_x509_cert_url": CERTS_URI,
                "client_x509_cert_url": format!("{ROBOT_CERTS_URI}/{}", client_email.replace('@', "%40")),
            });
            serde_json::from_value(info).map_err(|e| LedgerError::Auth(e.to_string()))
        }
    }
}

async fn build_hub(creds: &Credentials) -> Result<Hub, LedgerError> {
    let key = service_account_key(creds).await?;
    let auth = oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| LedgerError::Auth(e.to_string()))?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Ok(Sheets::new(hyper::Client::builder().build(connector), auth))
}

fn map_api_error(err: google_sheets4::Error) -> LedgerError {
    use google_sheets4::Error;
    match err {
        Error::HttpError(e) => LedgerError::Transport(e.to_string()),
        Error::Io(e) => LedgerError::Transport(e.to_string()),
        Error::MissingToken(e) => LedgerError::Transport(format!("token refresh: {e}")),
        Error::Failure(resp)
            if resp.status().is_server_error() || resp.status().as_u16() == 401 =>
        {
            LedgerError::Transport(format!("HTTP {}", resp.status()))
        }
        other => LedgerError::Rejected(other.to_string()),
    }
}

/// `'Sheet name'!A:H`, quoting the sheet name.
fn a1_range(sheet: &str, cols: &str) -> String {
    format!("'{}'!{cols}", sheet.replace('\'', "''"))
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn row_cells(row: &LedgerRow) -> Vec<Value> {
    vec![
        json!(row.date_cell()),
        json!(row.category),
        json!(row.subcategory),
        json!(row.amount),
        json!(row.balance_formula),
        json!(row.comment),
        json!(row.currency),
        json!(row.source),
    ]
}
