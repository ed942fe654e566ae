//! Subscription billing through a Stripe-compatible payments API.
//!
//! [`payments`] creates hosted checkout and billing-portal sessions for the
//! desktop app. [`webhook`] verifies and applies the provider's subscription
//! lifecycle events; the `flashcards-webhook` binary serves it over HTTP.

pub mod payments;
pub mod pricing;
pub mod webhook;

use thiserror::Error;

pub use payments::{CheckoutSession, PaymentsClient, PortalSession};
pub use pricing::{format_price, Plan};
pub use webhook::{apply_event, parse_event, verify_signature, EventOutcome, WebhookEvent};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BillingError {
    #[error("billing is not configured: {0}")]
    NotConfigured(String),
    #[error("no billing account yet; upgrade first")]
    NoCustomer,
    #[error("payments request failed: {0}")]
    Request(String),
    #[error("payments API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}
