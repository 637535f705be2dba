use std::fmt;

use serde_json::Value;

use crate::classify::device::DeviceAuthState;
use crate::classify::normalized::NormalizedError;

/// Everything extracted from a classified error body.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ApiErrorDetails {
    pub http_status: u16,
    pub error_type: String,
    pub message: String,
    pub code: Option<i64>,
    pub subcode: Option<i64>,
    pub is_transient: Option<bool>,
    pub trace_id: Option<String>,
    pub user_title: Option<String>,
    pub user_message: Option<String>,
    /// The `error` value as received.
    pub raw: Value,
}

impl ApiErrorDetails {
    pub fn new(error: NormalizedError, error_type: &str, http_status: u16, raw: Value) -> Self {
        let NormalizedError {
            message,
            code,
            subcode,
            is_transient,
            trace_id,
            user_title,
            user_message,
            description,
            ..
        } = error;
        Self {
            http_status,
            error_type: error_type.to_string(),
            message,
            code,
            subcode,
            is_transient,
            trace_id,
            user_title,
            user_message: user_message.or(description),
            raw,
        }
    }
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)?;
        if let Some(code) = self.code {
            write!(f, " (code {code}")?;
            if let Some(subcode) = self.subcode {
                write!(f, ", subcode {subcode}")?;
            }
            f.write_str(")")?;
        }
        if let Some(trace_id) = &self.trace_id {
            write!(f, " [trace {trace_id}]")?;
        }
        Ok(())
    }
}

/// A device-login poll answered with one of the known pending/terminal states.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("device authorization {state}: {message}")]
pub struct DeviceAuthException {
    pub state: DeviceAuthState,
    pub message: String,
    /// The OAuth error the state was derived from.
    pub oauth: ApiErrorDetails,
}

impl DeviceAuthException {
    pub fn new(state: DeviceAuthState, oauth: ApiErrorDetails) -> Self {
        Self {
            state,
            message: oauth.message.clone(),
            oauth,
        }
    }
}

/// Classified outcome of an error response. Exactly one variant is produced
/// per classification.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiException {
    #[error("OAuth error: {0}")]
    OAuth(ApiErrorDetails),

    #[error(transparent)]
    DeviceAuthorization(DeviceAuthException),

    #[error("permission error: {0}")]
    Permission(ApiErrorDetails),

    #[error("rate limit reached: {0}")]
    RateLimit(ApiErrorDetails),

    #[error("query parse error: {0}")]
    QueryParse(ApiErrorDetails),

    #[error("graph error: {0}")]
    Graph(ApiErrorDetails),

    /// Non-success response whose body is not JSON or has no `error` object.
    #[error("unparseable error response (HTTP {status})")]
    ResponseErrorJsonParsing { status: u16, body: String },
}

impl ApiException {
    pub fn details(&self) -> Option<&ApiErrorDetails> {
        match self {
            Self::OAuth(details)
            | Self::Permission(details)
            | Self::RateLimit(details)
            | Self::QueryParse(details)
            | Self::Graph(details) => Some(details),
            Self::DeviceAuthorization(device) => Some(&device.oauth),
            Self::ResponseErrorJsonParsing { .. } => None,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::ResponseErrorJsonParsing { status, .. } => *status,
            other => other.details().map_or(0, |d| d.http_status),
        }
    }

    /// The API's own retry hint, passed through untouched.
    pub fn is_transient(&self) -> Option<bool> {
        self.details().and_then(|d| d.is_transient)
    }

    pub fn code(&self) -> Option<i64> {
        self.details().and_then(|d| d.code)
    }

    pub fn subcode(&self) -> Option<i64> {
        self.details().and_then(|d| d.subcode)
    }

    pub fn device_auth_state(&self) -> Option<DeviceAuthState> {
        match self {
            Self::DeviceAuthorization(device) => Some(device.state),
            _ => None,
        }
    }

    /// Short stable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OAuth(_) => "oauth",
            Self::DeviceAuthorization(device) => match device.state {
                DeviceAuthState::Pending => "device_pending",
                DeviceAuthState::Declined => "device_declined",
                DeviceAuthState::SlowDown => "device_slow_down",
                DeviceAuthState::CodeExpired => "device_code_expired",
            },
            Self::Permission(_) => "permission",
            Self::RateLimit(_) => "rate_limit",
            Self::QueryParse(_) => "query_parse",
            Self::Graph(_) => "graph",
            Self::ResponseErrorJsonParsing { .. } => "response_error_json_parsing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details() -> ApiErrorDetails {
        ApiErrorDetails::new(
            NormalizedError {
                error_type: "ignored".to_string(),
                message: "Invalid OAuth access token.".to_string(),
                code: Some(190),
                subcode: Some(460),
                is_transient: Some(true),
                trace_id: Some("Fx1".to_string()),
                ..NormalizedError::default()
            },
            "OAuthException",
            400,
            json!({"code": 190}),
        )
    }

    #[test]
    fn details_take_the_resolved_type() {
        assert_eq!(details().error_type, "OAuthException");
    }

    #[test]
    fn display_includes_codes_and_trace() {
        assert_eq!(
            ApiException::OAuth(details()).to_string(),
            "OAuth error: OAuthException: Invalid OAuth access token. (code 190, subcode 460) [trace Fx1]"
        );
    }

    #[test]
    fn accessors_reach_through_device_variant() {
        let exception = ApiException::DeviceAuthorization(DeviceAuthException::new(
            DeviceAuthState::Pending,
            details(),
        ));
        assert_eq!(exception.http_status(), 400);
        assert_eq!(exception.is_transient(), Some(true));
        assert_eq!(exception.code(), Some(190));
        assert_eq!(exception.subcode(), Some(460));
        assert_eq!(
            exception.device_auth_state(),
            Some(DeviceAuthState::Pending)
        );
        assert_eq!(exception.kind(), "device_pending");
        assert_eq!(
            exception.to_string(),
            "device authorization pending: Invalid OAuth access token."
        );
    }

    #[test]
    fn parsing_failure_has_no_details() {
        let exception = ApiException::ResponseErrorJsonParsing {
            status: 502,
            body: "<html>".to_string(),
        };
        assert_eq!(exception.details(), None);
        assert_eq!(exception.http_status(), 502);
        assert_eq!(exception.is_transient(), None);
        assert_eq!(
            exception.to_string(),
            "unparseable error response (HTTP 502)"
        );
    }

    #[test]
    fn description_fills_missing_user_message() {
        let details = ApiErrorDetails::new(
            NormalizedError {
                message: "slow_down".to_string(),
                description: Some("Wait 5 seconds".to_string()),
                ..NormalizedError::default()
            },
            "OAuthException",
            400,
            json!("slow_down"),
        );
        assert_eq!(details.user_message.as_deref(), Some("Wait 5 seconds"));
    }
}
