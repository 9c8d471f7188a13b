//! Stripe payment-intent payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Third-party keys the backend uses on the caller's behalf
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaasKeys {
    pub stripe_key: String,
    #[serde(rename = "sendgrid_key", default, skip_serializing_if = "String::is_empty")]
    pub send_grid_key: String,
}

/// Optional receipt e-mail sent through SendGrid after a payment change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub sender_email_address: String,
    pub sender_name: String,
    pub to_email_address: String,
    pub to_email_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub keys: SaasKeys,
    /// Amount in the currency's major unit
    pub amount: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub use_automatic_payment_method: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(flatten)]
    pub receipt: Option<Receipt>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPaymentIntentRequest {
    pub keys: SaasKeys,
    #[serde(rename = "id")]
    pub payment_intent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePaymentIntentRequest {
    pub keys: SaasKeys,
    #[serde(rename = "id")]
    pub payment_intent_id: String,
    /// Amount to capture; the full authorized amount when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_funds: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPaymentIntentRequest {
    pub keys: SaasKeys,
    #[serde(rename = "id")]
    pub payment_intent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPaymentIntentsRequest {
    pub keys: SaasKeys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_records_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_after_record: Option<String>,
}

/// A Stripe payment intent as relayed by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentList {
    #[serde(default)]
    pub items: Vec<PaymentIntent>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
