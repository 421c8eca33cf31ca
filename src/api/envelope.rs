//! Response envelope
//!
//! Every API response is wrapped as
//! `{"success": bool, "errors": [...], "messages": [...], "result": T}`,
//! with list endpoints adding a `result_info` block describing pagination.

use crate::error::{ApiFailure, Error};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `(code, message)` pair from the `errors` or `messages` arrays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub code: i64,
    pub message: String,
}

impl std::fmt::Display for ResponseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Pagination metadata of a list response
///
/// Page-based endpoints fill `page`/`total_pages`/`total_count`, cursor-based
/// endpoints fill `cursor`. Both report `count` and `per_page`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Wire form of the envelope with `result` left undecoded
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ResponseInfo>,
    #[serde(default)]
    messages: Vec<ResponseInfo>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

/// Decoded response envelope
///
/// `result` is only decoded into `T` when `success` is true; a failed
/// envelope never has a result, whatever the body carried.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub success: bool,
    pub errors: Vec<ResponseInfo>,
    pub messages: Vec<ResponseInfo>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a response body
    pub fn parse(body: &str) -> Result<Self, Error> {
        let raw: RawEnvelope = serde_json::from_str(body)?;
        Self::from_raw(raw)
    }

    /// Decode an already parsed JSON document
    pub fn from_value(body: Value) -> Result<Self, Error> {
        let raw: RawEnvelope = serde_json::from_value(body)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEnvelope) -> Result<Self, Error> {
        let result = match raw.result {
            Some(value) if raw.success => Some(serde_json::from_value(value)?),
            _ => None,
        };
        Ok(Self {
            success: raw.success,
            errors: raw.errors,
            messages: raw.messages,
            result,
            result_info: raw.result_info,
        })
    }
}

/// Provider errors carried by a body, if it is an envelope at all
pub fn errors_of(body: &str) -> Vec<ResponseInfo> {
    serde_json::from_str::<RawEnvelope>(body)
        .map(|raw| raw.errors)
        .unwrap_or_default()
}

impl<T> Envelope<T> {
    /// Fail with the envelope's errors when `success` is false
    fn check(&self) -> Result<(), Error> {
        if self.success {
            return Ok(());
        }
        for message in &self.messages {
            tracing::debug!("API message: {}", message);
        }
        Err(Error::Api(ApiFailure::new(self.errors.clone())))
    }

    /// Unwrap a required `result`
    pub fn into_result(self) -> Result<T, Error> {
        self.check()?;
        self.result.ok_or_else(|| Error::Transport {
            status: None,
            errors: Vec::new(),
            message: "response envelope has no result".to_string(),
        })
    }

    /// Unwrap a `result` that may legitimately be null (e.g. deletes)
    pub fn into_option(self) -> Result<Option<T>, Error> {
        self.check()?;
        Ok(self.result)
    }

    /// Unwrap `result` and `result_info` together
    pub fn into_parts(self) -> Result<(Option<T>, Option<ResultInfo>), Error> {
        self.check()?;
        Ok((self.result, self.result_info))
    }
}

impl<T> Envelope<Vec<T>> {
    /// Unwrap a list result together with its pagination metadata
    ///
    /// A missing or null `result` on a list endpoint means an empty page.
    pub fn into_page(self) -> Result<(Vec<T>, Option<ResultInfo>), Error> {
        let (result, info) = self.into_parts()?;
        Ok((result.unwrap_or_default(), info))
    }
}
