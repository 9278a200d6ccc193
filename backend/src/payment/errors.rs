use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from payment provider: {0}")]
    InvalidResponse(String),

    #[error("payment provider did not answer within {0} ms")]
    Timeout(u64),

    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum WebhookError {
    /// Server-side misconfiguration, not the sender's fault.
    #[error("webhook signing secret is not configured")]
    MissingSecret,

    #[error("missing signature header")]
    MissingSignature,

    #[error("invalid signature header: {0}")]
    MalformedSignature(&'static str),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("webhook timestamp outside tolerance")]
    StaleTimestamp,

    #[error("malformed event payload: {0}")]
    MalformedPayload(String),
}
