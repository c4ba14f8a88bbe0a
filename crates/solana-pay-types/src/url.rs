//! Solana Pay URL encoding and decoding.
//!
//! Two URL shapes exist:
//!
//! - Transfer requests: `solana:<recipient>?amount=..&spl-token=..&reference=..&label=..&message=..&memo=..`
//! - Transaction-request discovery links: `https://merchant.example/tx?label=..`, with no
//!   recipient; the wallet asks the server for a transaction instead.
//!
//! Query values are percent-encoded with `%20` for spaces. Absent fields are
//! left out of the URL rather than encoded as empty values.

use ::url::Url;

use crate::request::{PaymentParams, PaymentRequest, PaymentRequestBuilder, PaymentRequestError};

pub const SOLANA_SCHEME: &str = "solana";
pub const HTTPS_SCHEME: &str = "https";

pub const PARAM_AMOUNT: &str = "amount";
pub const PARAM_SPL_TOKEN: &str = "spl-token";
pub const PARAM_REFERENCE: &str = "reference";
pub const PARAM_LABEL: &str = "label";
pub const PARAM_MESSAGE: &str = "message";
pub const PARAM_MEMO: &str = "memo";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL must be a non-empty string")]
    Empty,
    #[error("Malformed URL {url:?}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("Unsupported URL scheme {0:?}, expected 'solana' or 'https'")]
    UnsupportedScheme(String),
    #[error("solana: URL requires a recipient")]
    MissingRecipient,
    #[error("Invalid parameters in URL: {0}")]
    InvalidParameter(#[from] PaymentRequestError),
}

/// A decoded Solana Pay URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolanaPayUrl {
    /// A `solana:` URL naming the recipient directly.
    Transfer(PaymentRequest),
    /// An `https:` discovery link; the transaction comes from `link`.
    TransactionRequest { link: Url, params: PaymentParams },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Transfer,
    TransactionRequest,
}

fn query_pairs(params: &PaymentParams) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(amount) = params.amount() {
        pairs.push((PARAM_AMOUNT, amount.to_string()));
    }
    if let Some(token) = params.token() {
        pairs.push((PARAM_SPL_TOKEN, token.to_string()));
    }
    for reference in params.references() {
        pairs.push((PARAM_REFERENCE, reference.to_string()));
    }
    let text_fields = [
        (PARAM_LABEL, params.label()),
        (PARAM_MESSAGE, params.message()),
        (PARAM_MEMO, params.memo()),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            pairs.push((key, value.to_string()));
        }
    }
    pairs
}

fn encode_query(params: &PaymentParams) -> String {
    query_pairs(params)
        .into_iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encodes a transfer request as a `solana:` URL.
pub fn encode_url(request: &PaymentRequest) -> String {
    let query = encode_query(request.params());
    let mut url = format!("{SOLANA_SCHEME}:{}", request.recipient());
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

/// Encodes recipient-less parameters onto an `https` transaction-request endpoint.
///
/// Query parameters already present on `base` are kept in front.
pub fn encode_https_url(params: &PaymentParams, base: &str) -> Result<String, UrlError> {
    let base = base.trim();
    if base.is_empty() {
        return Err(UrlError::Empty);
    }
    let link = Url::parse(base).map_err(|e| UrlError::Malformed {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if link.scheme() != HTTPS_SCHEME {
        return Err(UrlError::UnsupportedScheme(link.scheme().to_string()));
    }
    if link.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::Malformed {
            url: base.to_string(),
            reason: "missing host".to_string(),
        });
    }
    let query = encode_query(params);
    if query.is_empty() {
        return Ok(base.to_string());
    }
    // The query goes before any fragment.
    let (head, fragment) = match base.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (base, None),
    };
    let separator = if head.contains('?') { '&' } else { '?' };
    let mut encoded = format!("{head}{separator}{query}");
    if let Some(fragment) = fragment {
        encoded.push('#');
        encoded.push_str(fragment);
    }
    Ok(encoded)
}

/// Splits `scheme:rest` and lowercases the scheme.
fn split_scheme(url: &str) -> Result<(String, &str), UrlError> {
    let (scheme, rest) = url.split_once(':').ok_or_else(|| UrlError::Malformed {
        url: url.to_string(),
        reason: "missing scheme".to_string(),
    })?;
    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(UrlError::Malformed {
            url: url.to_string(),
            reason: "invalid scheme".to_string(),
        });
    }
    Ok((scheme.to_ascii_lowercase(), rest))
}

/// Reads the query into a builder: first value wins for scalars, every
/// `reference` is kept in order, empty values count as absent.
fn params_from_query(query: &str, mut builder: PaymentRequestBuilder) -> PaymentRequestBuilder {
    let mut seen_amount = false;
    let mut seen_token = false;
    let mut seen_label = false;
    let mut seen_message = false;
    let mut seen_memo = false;
    for (key, value) in ::url::form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        let value = value.into_owned();
        match key.as_ref() {
            PARAM_AMOUNT if !seen_amount => {
                seen_amount = true;
                builder = builder.amount(value);
            }
            PARAM_SPL_TOKEN if !seen_token => {
                seen_token = true;
                builder = builder.token(value);
            }
            PARAM_REFERENCE => builder = builder.reference(value),
            PARAM_LABEL if !seen_label => {
                seen_label = true;
                builder = builder.label(value);
            }
            PARAM_MESSAGE if !seen_message => {
                seen_message = true;
                builder = builder.message(value);
            }
            PARAM_MEMO if !seen_memo => {
                seen_memo = true;
                builder = builder.memo(value);
            }
            _ => {}
        }
    }
    builder
}

/// Decodes a `solana:` or `https:` Solana Pay URL.
pub fn parse_url(url: &str) -> Result<SolanaPayUrl, UrlError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlError::Empty);
    }
    let (scheme, rest) = split_scheme(url)?;
    match scheme.as_str() {
        SOLANA_SCHEME => {
            let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
            let path = path.split('#').next().unwrap_or_default();
            let recipient = path.trim_start_matches("//").trim_end_matches('/');
            if recipient.is_empty() {
                return Err(UrlError::MissingRecipient);
            }
            let query = query.split('#').next().unwrap_or_default();
            let recipient = urlencoding::decode(recipient).map_err(|e| UrlError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let request =
                params_from_query(query, PaymentRequest::builder(recipient.into_owned())).build()?;
            #[cfg(feature = "telemetry")]
            tracing::debug!(recipient = %request.recipient(), "Parsed transfer URL");
            Ok(SolanaPayUrl::Transfer(request))
        }
        HTTPS_SCHEME => {
            let link = Url::parse(url).map_err(|e| UrlError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let params =
                params_from_query(link.query().unwrap_or_default(), PaymentRequestBuilder::params())
                    .build_params()?;
            Ok(SolanaPayUrl::TransactionRequest { link, params })
        }
        other => Err(UrlError::UnsupportedScheme(other.to_string())),
    }
}

/// Returns `true` if the URL decodes cleanly.
pub fn validate_url(url: &str) -> bool {
    parse_url(url).is_ok()
}

/// Classifies a URL by scheme without validating its parameters.
pub fn url_kind(url: &str) -> Result<UrlKind, UrlError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlError::Empty);
    }
    let (scheme, _) = split_scheme(url)?;
    match scheme.as_str() {
        SOLANA_SCHEME => Ok(UrlKind::Transfer),
        HTTPS_SCHEME => Ok(UrlKind::TransactionRequest),
        other => Err(UrlError::UnsupportedScheme(other.to_string())),
    }
}
