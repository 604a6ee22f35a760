//! Minimal Stripe PaymentIntent client used by the deposit flow.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use crate::config::StripeSettings;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn owner(&self) -> Option<i64> {
        self.metadata.get("user_id").and_then(|id| id.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    settings: StripeSettings,
}

impl StripeClient {
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn ensure_configured(&self) -> ServiceResult<()> {
        if self.settings.secret_key.is_empty() {
            return Err(ServiceError::Payment("Stripe is not configured".into()));
        }
        Ok(())
    }

    pub async fn create_payment_intent(&self, user_id: i64, amount_cents: i64) -> ServiceResult<PaymentIntent> {
        self.ensure_configured()?;

        let resp = self
            .http
            .post(format!("{}/payment_intents", self.settings.api_base))
            .bearer_auth(&self.settings.secret_key)
            .form(&intent_params(user_id, amount_cents, &self.settings.currency))
            .send()
            .await?;

        let intent: PaymentIntent = parse(resp).await?;
        info!(user_id, intent = %intent.id, amount_cents, "Payment intent created");
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> ServiceResult<PaymentIntent> {
        self.ensure_configured()?;

        if intent_id.is_empty() || !intent_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ServiceError::bad_request("Invalid payment intent id"));
        }

        let resp = self
            .http
            .get(format!("{}/payment_intents/{intent_id}", self.settings.api_base))
            .bearer_auth(&self.settings.secret_key)
            .send()
            .await?;

        parse(resp).await
    }
}

fn intent_params(user_id: i64, amount_cents: i64, currency: &str) -> Vec<(&'static str, String)> {
    vec![
        ("amount", amount_cents.to_string()),
        ("currency", currency.to_owned()),
        ("payment_method_types[]", "card".to_owned()),
        ("metadata[user_id]", user_id.to_string()),
        ("metadata[purpose]", "deposit".to_owned()),
    ]
}

async fn parse(resp: reqwest::Response) -> ServiceResult<PaymentIntent> {
    if resp.status().is_success() {
        return Ok(resp.json::<PaymentIntent>().await?);
    }

    let status = resp.status();
    let message = resp
        .json::<StripeErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error.message)
        .unwrap_or_else(|| format!("Stripe returned {status}"));

    if status.is_client_error() {
        Err(ServiceError::bad_request(message))
    } else {
        Err(ServiceError::Payment(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_params_carry_owner() {
        let params = intent_params(42, 2500, "usd");
        assert!(params.contains(&("amount", "2500".to_owned())));
        assert!(params.contains(&("metadata[user_id]", "42".to_owned())));
    }

    #[test]
    fn reads_owner_from_metadata() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "amount": 1000,
            "currency": "usd",
            "status": "succeeded",
            "client_secret": "pi_123_secret",
            "metadata": { "user_id": "7" }
        }))
        .unwrap();

        assert!(intent.succeeded());
        assert_eq!(intent.owner(), Some(7));
    }

    #[actix_web::test]
    async fn unconfigured_client_refuses() {
        let client = StripeClient::new(StripeSettings {
            secret_key: String::new(),
            api_base: "https://api.stripe.com/v1".into(),
            currency: "usd".into(),
        });

        let err = client.create_payment_intent(1, 1000).await.unwrap_err();
        assert!(matches!(err, ServiceError::Payment(_)));
    }
}
