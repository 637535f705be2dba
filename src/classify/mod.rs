pub mod device;
pub mod exception;
pub mod normalized;

use std::ops::RangeInclusive;

use serde_json::Value;

use crate::error::Error;
use crate::mapping::{Mapper, is_absent_object};
use device::classify_device_auth;

pub use device::DeviceAuthState;
pub use exception::{ApiErrorDetails, ApiException, DeviceAuthException};
pub use normalized::NormalizedError;

pub const OAUTH_EXCEPTION_TYPE: &str = "OAuthException";
pub const QUERY_PARSE_EXCEPTION_TYPE: &str = "QueryParseException";
pub const PERMISSION_EXCEPTION_TYPE: &str = "PermissionException";
pub const RATE_LIMIT_EXCEPTION_TYPE: &str = "RateLimitException";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Type assumed for errors that carry no `type`.
    pub default_error_type: String,
    /// Also match rules on numeric error codes, not only on `type`.
    pub match_codes: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            default_error_type: OAUTH_EXCEPTION_TYPE.to_string(),
            match_codes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    OAuth,
    QueryParse,
    Permission,
    RateLimit,
}

struct ClassifierRule {
    error_type: &'static str,
    codes: &'static [RangeInclusive<i64>],
    kind: RuleKind,
}

impl ClassifierRule {
    fn matches(&self, error_type: &str, code: Option<i64>, match_codes: bool) -> bool {
        error_type == self.error_type
            || (match_codes && code.is_some_and(|c| self.codes.iter().any(|r| r.contains(&c))))
    }
}

// First match wins. Anything unmatched is a generic graph error.
const RULES: &[ClassifierRule] = &[
    ClassifierRule {
        error_type: OAUTH_EXCEPTION_TYPE,
        codes: &[102..=102, 190..=190],
        kind: RuleKind::OAuth,
    },
    ClassifierRule {
        error_type: QUERY_PARSE_EXCEPTION_TYPE,
        codes: &[],
        kind: RuleKind::QueryParse,
    },
    ClassifierRule {
        error_type: PERMISSION_EXCEPTION_TYPE,
        codes: &[10..=10, 200..=299],
        kind: RuleKind::Permission,
    },
    ClassifierRule {
        error_type: RATE_LIMIT_EXCEPTION_TYPE,
        codes: &[4..=4, 17..=17, 32..=32, 613..=613],
        kind: RuleKind::RateLimit,
    },
];

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Turns error-shaped response bodies into [`ApiException`]s.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    mapper: Mapper,
    options: ClassifierOptions,
}

impl ErrorClassifier {
    pub fn new(options: ClassifierOptions) -> Self {
        Self {
            mapper: Mapper::default(),
            options,
        }
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// `Ok(())` when the body carries no error and the status is a success.
    pub fn classify(&self, body: &Value, http_status: u16) -> Result<(), ApiException> {
        let error = body.get("error").filter(|e| !is_absent_object(e));

        let Some(error) = error else {
            if is_success(http_status) {
                return Ok(());
            }
            tracing::debug!(http_status, "error status without an error object");
            return Err(ApiException::ResponseErrorJsonParsing {
                status: http_status,
                body: body.to_string(),
            });
        };

        let normalized = match NormalizedError::from_response(&self.mapper, error, body) {
            Ok(normalized) => normalized,
            Err(err) => {
                tracing::debug!(http_status, error = %err, "error object does not map");
                return Err(ApiException::ResponseErrorJsonParsing {
                    status: http_status,
                    body: body.to_string(),
                });
            }
        };

        Err(self.resolve(normalized, http_status, error.clone()))
    }

    /// Parse `text` and classify it. A body that is not JSON is an
    /// [`ApiException::ResponseErrorJsonParsing`] for error statuses and a
    /// plain JSON error otherwise.
    pub fn classify_text(&self, text: &str, http_status: u16) -> Result<Value, Error> {
        let body: Value = match serde_json::from_str(text) {
            Ok(body) => body,
            Err(_) if !is_success(http_status) => {
                return Err(ApiException::ResponseErrorJsonParsing {
                    status: http_status,
                    body: text.to_string(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        };
        self.classify(&body, http_status)?;
        Ok(body)
    }

    /// Pick the exception variant for an already normalized error.
    pub fn resolve(&self, error: NormalizedError, http_status: u16, raw: Value) -> ApiException {
        let error_type = error
            .effective_type(&self.options.default_error_type)
            .to_string();
        let rule = RULES
            .iter()
            .find(|rule| rule.matches(&error_type, error.code, self.options.match_codes));

        let Some(rule) = rule else {
            tracing::debug!(
                error_type = error_type.as_str(),
                code = ?error.code,
                "no dedicated rule, generic graph error"
            );
            return ApiException::Graph(ApiErrorDetails::new(error, &error_type, http_status, raw));
        };
        tracing::debug!(
            error_type = error_type.as_str(),
            code = ?error.code,
            kind = ?rule.kind,
            "classified error"
        );

        if rule.kind == RuleKind::OAuth
            && let Some(state) = classify_device_auth(&error)
        {
            let details = ApiErrorDetails::new(error, &error_type, http_status, raw);
            return ApiException::DeviceAuthorization(DeviceAuthException::new(state, details));
        }

        let details = ApiErrorDetails::new(error, &error_type, http_status, raw);
        match rule.kind {
            RuleKind::OAuth => ApiException::OAuth(details),
            RuleKind::QueryParse => ApiException::QueryParse(details),
            RuleKind::Permission => ApiException::Permission(details),
            RuleKind::RateLimit => ApiException::RateLimit(details),
        }
    }
}
