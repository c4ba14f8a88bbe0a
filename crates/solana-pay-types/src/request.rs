//! Payment Request value object.
//!
//! A [`PaymentRequest`] describes a transfer intent: who gets paid, how much,
//! in which asset, and which correlation data travels with the payment. It is
//! validated once when built and never mutated afterwards. Deriving a
//! modified request goes through [`PaymentRequest::to_builder`], which
//! re-runs validation.
//!
//! ```rust
//! use solana_pay_types::request::PaymentRequest;
//!
//! let request = PaymentRequest::builder("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
//!     .amount("0.01")
//!     .label("Coffee Shop")
//!     .build()
//!     .unwrap();
//! assert_eq!(request.amount().unwrap().to_string(), "0.01");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::units::UnitsError;
use crate::util::money_amount::MoneyAmount;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PaymentRequestError {
    #[error("Recipient is required")]
    MissingRecipient,
    #[error("Invalid {field} address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[source] UnitsError),
}

/// The recipient-less part of a payment request.
///
/// Transaction-request discovery links carry these parameters without a
/// recipient, the server decides who gets paid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentParams {
    amount: Option<MoneyAmount>,
    token: Option<Address>,
    references: Vec<Address>,
    label: Option<String>,
    message: Option<String>,
    memo: Option<String>,
}

impl PaymentParams {
    pub fn amount(&self) -> Option<MoneyAmount> {
        self.amount
    }

    /// Mint of the token to transfer. `None` means the native coin.
    pub fn token(&self) -> Option<&Address> {
        self.token.as_ref()
    }

    /// Reference addresses in the order they were given.
    pub fn references(&self) -> &[Address] {
        &self.references
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn is_native(&self) -> bool {
        self.token.is_none()
    }
}

/// A validated, immutable transfer intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaymentRequestJson", into = "PaymentRequestJson")]
pub struct PaymentRequest {
    recipient: Address,
    params: PaymentParams,
}

impl PaymentRequest {
    pub fn builder(recipient: impl Into<String>) -> PaymentRequestBuilder {
        PaymentRequestBuilder {
            recipient: Some(recipient.into()),
            ..PaymentRequestBuilder::default()
        }
    }

    /// Starts a builder pre-filled with this request's fields.
    pub fn to_builder(&self) -> PaymentRequestBuilder {
        PaymentRequestBuilder {
            recipient: Some(self.recipient.to_string()),
            ..PaymentRequestBuilder::from_params(&self.params)
        }
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn params(&self) -> &PaymentParams {
        &self.params
    }

    pub fn amount(&self) -> Option<MoneyAmount> {
        self.params.amount
    }

    pub fn token(&self) -> Option<&Address> {
        self.params.token()
    }

    pub fn references(&self) -> &[Address] {
        self.params.references()
    }

    pub fn label(&self) -> Option<&str> {
        self.params.label()
    }

    pub fn message(&self) -> Option<&str> {
        self.params.message()
    }

    pub fn memo(&self) -> Option<&str> {
        self.params.memo()
    }

    pub fn is_native(&self) -> bool {
        self.params.is_native()
    }
}

impl fmt::Display for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentRequest(recipient={}", self.recipient)?;
        if let Some(amount) = &self.params.amount {
            write!(f, ", amount={amount}")?;
        }
        if let Some(token) = &self.params.token {
            write!(f, ", token={token}")?;
        }
        if !self.params.references.is_empty() {
            write!(f, ", references={} items", self.params.references.len())?;
        }
        if let Some(label) = &self.params.label {
            write!(f, ", label={label:?}")?;
        }
        if let Some(message) = &self.params.message {
            write!(f, ", message={message:?}")?;
        }
        if let Some(memo) = &self.params.memo {
            write!(f, ", memo={memo:?}")?;
        }
        f.write_str(")")
    }
}

/// Collects raw fields and validates them all at once.
///
/// Amounts are accepted as text (or anything with a `Display` impl, such as
/// [`MoneyAmount`]) and parsed strictly on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PaymentRequestBuilder {
    recipient: Option<String>,
    amount: Option<String>,
    token: Option<String>,
    references: Vec<String>,
    label: Option<String>,
    message: Option<String>,
    memo: Option<String>,
}

impl PaymentRequestBuilder {
    /// A builder for the recipient-less parameters of a discovery link.
    pub fn params() -> Self {
        Self::default()
    }

    fn from_params(params: &PaymentParams) -> Self {
        Self {
            recipient: None,
            amount: params.amount.map(|a| a.to_string()),
            token: params.token.as_ref().map(|t| t.to_string()),
            references: params.references.iter().map(|r| r.to_string()).collect(),
            label: params.label.clone(),
            message: params.message.clone(),
            memo: params.memo.clone(),
        }
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn amount(mut self, amount: impl ToString) -> Self {
        self.amount = Some(amount.to_string());
        self
    }

    pub fn clear_amount(mut self) -> Self {
        self.amount = None;
        self
    }

    pub fn token(mut self, mint: impl Into<String>) -> Self {
        self.token = Some(mint.into());
        self
    }

    /// Appends one reference, keeping insertion order.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    /// Replaces all references.
    pub fn references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Validates every field and returns the immutable request.
    pub fn build(self) -> Result<PaymentRequest, PaymentRequestError> {
        let recipient = match self.recipient.as_deref() {
            None | Some("") => return Err(PaymentRequestError::MissingRecipient),
            Some(value) => parse_address("recipient", value)?,
        };
        let params = self.build_params()?;
        Ok(PaymentRequest { recipient, params })
    }

    /// Validates everything except the recipient, which is ignored.
    pub fn build_params(self) -> Result<PaymentParams, PaymentRequestError> {
        let amount = self
            .amount
            .as_deref()
            .map(MoneyAmount::parse)
            .transpose()
            .map_err(PaymentRequestError::InvalidAmount)?;
        let token = self
            .token
            .as_deref()
            .map(|t| parse_address("spl-token", t))
            .transpose()?;
        let references = self
            .references
            .iter()
            .map(|r| parse_address("reference", r))
            .collect::<Result<Vec<_>, _>>()?;
        // An empty text field encodes to nothing, so it is stored as absent.
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        Ok(PaymentParams {
            amount,
            token,
            references,
            label: non_empty(self.label),
            message: non_empty(self.message),
            memo: non_empty(self.memo),
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, PaymentRequestError> {
    Address::parse(value).map_err(|_| PaymentRequestError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

/// JSON shape used in merchant configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestJson {
    recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount: Option<MoneyAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spl_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

impl TryFrom<PaymentRequestJson> for PaymentRequest {
    type Error = PaymentRequestError;

    fn try_from(value: PaymentRequestJson) -> Result<Self, Self::Error> {
        let mut builder = PaymentRequest::builder(value.recipient).references(value.references);
        if let Some(amount) = value.amount {
            builder = builder.amount(amount);
        }
        if let Some(token) = value.spl_token {
            builder = builder.token(token);
        }
        builder.label = value.label;
        builder.message = value.message;
        builder.memo = value.memo;
        builder.build()
    }
}

impl From<PaymentRequest> for PaymentRequestJson {
    fn from(value: PaymentRequest) -> Self {
        let PaymentRequest { recipient, params } = value;
        PaymentRequestJson {
            recipient: recipient.to_string(),
            amount: params.amount,
            spl_token: params.token.map(|t| t.to_string()),
            references: params.references.iter().map(|r| r.to_string()).collect(),
            label: params.label,
            message: params.message,
            memo: params.memo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const REF_A: &str = "7XSvJnS19TodrQJSbjUR6tEGwmYyL1i9FX7Z5ZQHc53W";
    const REF_B: &str = "GvHeR432g7MjN9uKyX3Dzg66TqwrEWgANLnnFZXMeyyj";

    #[test]
    fn test_build_full_request() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1.50")
            .token(USDC)
            .reference(REF_A)
            .reference(REF_B)
            .label("Coffee Shop")
            .message("Thanks!")
            .memo("order-42")
            .build()
            .unwrap();
        assert_eq!(request.recipient().as_str(), RECIPIENT);
        assert_eq!(request.amount().unwrap().to_string(), "1.5");
        assert_eq!(request.token().unwrap().as_str(), USDC);
        let refs: Vec<&str> = request.references().iter().map(|r| r.as_str()).collect();
        assert_eq!(refs, vec![REF_A, REF_B]);
        assert_eq!(request.memo(), Some("order-42"));
        assert!(!request.is_native());
    }

    #[test]
    fn test_missing_recipient() {
        assert_eq!(
            PaymentRequest::builder("").build(),
            Err(PaymentRequestError::MissingRecipient)
        );
        assert_eq!(
            PaymentRequestBuilder::params().amount("1").build(),
            Err(PaymentRequestError::MissingRecipient)
        );
    }

    #[test]
    fn test_invalid_fields_name_the_field() {
        let err = PaymentRequest::builder("bad").build().unwrap_err();
        assert!(matches!(
            err,
            PaymentRequestError::InvalidAddress { field: "recipient", .. }
        ));
        let err = PaymentRequest::builder(RECIPIENT)
            .reference("0OIl")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentRequestError::InvalidAddress { field: "reference", .. }
        ));
        let err = PaymentRequest::builder(RECIPIENT)
            .amount("-5")
            .build()
            .unwrap_err();
        assert_eq!(err, PaymentRequestError::InvalidAmount(UnitsError::Negative));
    }

    #[test]
    fn test_to_builder_derives_new_request() {
        let original = PaymentRequest::builder(RECIPIENT)
            .amount("2")
            .reference(REF_A)
            .build()
            .unwrap();
        let changed = original.to_builder().amount("3").build().unwrap();
        assert_eq!(original.amount().unwrap().to_string(), "2");
        assert_eq!(changed.amount().unwrap().to_string(), "3");
        assert_eq!(changed.references(), original.references());
        assert_eq!(changed.recipient(), original.recipient());
    }

    #[test]
    fn test_json_uses_spl_token_key() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("0.5")
            .token(USDC)
            .build()
            .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["splToken"], USDC);
        assert_eq!(json["amount"], "0.5");
        assert!(json.get("memo").is_none());
        let back: PaymentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_json_validates_on_deserialize() {
        let json = serde_json::json!({ "recipient": RECIPIENT, "splToken": "nope" });
        assert!(serde_json::from_value::<PaymentRequest>(json).is_err());
    }

    #[test]
    fn test_display_summarizes() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .reference(REF_A)
            .build()
            .unwrap();
        let text = request.to_string();
        assert!(text.contains("amount=1"));
        assert!(text.contains("references=1 items"));
    }
}
