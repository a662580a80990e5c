//! Invoice notification collaborator (WhatsApp-style delivery).
//!
//! Delivery is fire-and-forget: a failed send is logged and reported but
//! never rolls back or blocks a completed payment.

use crate::domain::Money;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct InvoicePayload<'a> {
    bill: &'a str,
    customer: Option<&'a str>,
    phone: &'a str,
    total: String,
}

pub struct Notifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl Notifier {
    pub fn new(url: Option<String>) -> Self {
        Notifier {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// True when a delivery endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Send an invoice message. Returns whether delivery succeeded.
    pub async fn send_invoice(
        &self,
        bill_number: &str,
        customer_name: Option<&str>,
        phone: &str,
        total: Money,
    ) -> bool {
        let Some(url) = &self.url else {
            return false;
        };

        let payload = InvoicePayload {
            bill: bill_number,
            customer: customer_name,
            phone,
            total: total.to_canonical_string(),
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(bill = %bill_number, "invoice notification sent");
                true
            }
            Ok(response) => {
                warn!(bill = %bill_number, status = %response.status(), "invoice notification rejected");
                false
            }
            Err(err) => {
                warn!(bill = %bill_number, error = %err, "invoice notification failed");
                false
            }
        }
    }
}
