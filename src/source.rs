use crate::error::{BalanceSheetError, Result};
use crate::schema::FetchResponse;
use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_ENDPOINT: &str = "api/BalanceSheet/GetLedgerHeads";
const DEFAULT_MAX_RETRIES: usize = 2;

/// Fetches ledger-head rows from the ERP API.
#[derive(Clone)]
pub struct HttpRowSource {
    client: Client,
    base_url: String,
    endpoint: String,
    max_retries: usize,
}

impl HttpRowSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    /// Fetches the balance sheet rows, optionally as on a given date.
    /// Server errors and transport failures are retried with a linear
    /// back-off; client errors are returned immediately.
    pub async fn fetch(&self, as_of: Option<NaiveDate>) -> Result<FetchResponse> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(as_of).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    attempt += 1;
                    warn!("Ledger fetch attempt {} failed: {}; retrying", attempt, err);
                    sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, as_of: Option<NaiveDate>) -> Result<FetchResponse> {
        let url = self.url();
        debug!("Fetching ledger heads from {}", url);

        let mut request = self.client.get(&url);
        if let Some(date) = as_of {
            request = request.query(&[("asOnDate", date.format("%Y-%m-%d").to_string())]);
        }

        let res = request.send().await?;
        let status = res.status();

        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            return Err(BalanceSheetError::ApiStatus {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let mut body: FetchResponse = res.json().await?;
        if body.as_of.is_none() {
            body.as_of = as_of;
        }
        Ok(body)
    }
}

fn is_transient(err: &BalanceSheetError) -> bool {
    match err {
        BalanceSheetError::HttpError(e) => e.is_timeout() || e.is_connect(),
        BalanceSheetError::ApiStatus { status, .. } => *status >= 500,
        _ => false,
    }
}
