//! Hosted checkout and billing-portal sessions.
//!
//! Requests are form-encoded and authenticated with the secret key as a
//! bearer token. The client is blocking; the desktop app calls it from its
//! worker thread.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::{error, info};

use super::BillingError;
use crate::config::{BillingConfig, Config};
use crate::models::Account;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentsClient {
    client: Client,
    api_base_url: String,
    secret_key: String,
}

impl PaymentsClient {
    pub fn new(api_base_url: &str, secret_key: String) -> Result<Self, BillingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BillingError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Client for the configured provider. Fails when `PAYMENTS_SECRET_KEY`
    /// is unset.
    pub fn from_config(config: &Config) -> Result<Self, BillingError> {
        let key = config
            .payments_secret_key
            .clone()
            .ok_or_else(|| BillingError::NotConfigured("PAYMENTS_SECRET_KEY is not set".into()))?;
        Self::new(&config.billing.api_base_url, key)
    }

    /// Starts a subscription checkout for `account`. The account id travels
    /// as `client_reference_id` and in metadata so webhooks can find it.
    pub fn create_checkout_session(
        &self,
        account: &Account,
        billing: &BillingConfig,
    ) -> Result<CheckoutSession, BillingError> {
        if billing.pro_price_id.trim().is_empty() {
            return Err(BillingError::NotConfigured("billing.pro_price_id is empty".into()));
        }
        let form = checkout_form(account, billing);
        let session: CheckoutSession = self.post("checkout/sessions", &form)?;
        info!(account_id = account.id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Opens the provider's self-service portal for an existing customer.
    pub fn create_portal_session(&self, account: &Account, return_url: &str) -> Result<PortalSession, BillingError> {
        let customer = account.billing_customer_id.as_deref().ok_or(BillingError::NoCustomer)?;
        let form = vec![
            ("customer".to_string(), customer.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        let session: PortalSession = self.post("billing_portal/sessions", &form)?;
        info!(account_id = account.id, session_id = %session.id, "billing portal session created");
        Ok(session)
    }

    fn post<T: serde::de::DeserializeOwned>(&self, path: &str, form: &[(String, String)]) -> Result<T, BillingError> {
        let url = format!("{}/{path}", self.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .map_err(|e| {
                error!(%url, error = %e, "payments request failed (transport)");
                BillingError::Request(e.to_string())
            })?;
        let response = check_status(response)?;
        response
            .json::<T>()
            .map_err(|e| BillingError::Request(format!("failed to parse response body: {e}")))
    }
}

pub(crate) fn checkout_form(account: &Account, billing: &BillingConfig) -> Vec<(String, String)> {
    let id = account.id.to_string();
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", billing.pro_price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", billing.success_url.clone()),
        ("cancel_url", billing.cancel_url.clone()),
        ("client_reference_id", id.clone()),
        ("metadata[account_id]", id.clone()),
        ("subscription_data[metadata][account_id]", id),
    ];
    match &account.billing_customer_id {
        Some(customer) => form.push(("customer", customer.clone())),
        None => form.push(("customer_email", account.email.clone())),
    }
    form.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn check_status(response: Response) -> Result<Response, BillingError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => match env.error.kind {
            Some(kind) => format!("{} [{kind}]", env.error.message),
            None => env.error.message,
        },
        Err(_) => body,
    };
    error!(%status, %message, "payments API returned an error");
    Err(BillingError::Api { status: status.as_u16(), message })
}
