use serde_json::Value;

use crate::error::MapError;
use crate::mapping::Mapper;
use crate::mapping::directives::{FieldBinding, Mappable, TypeDirectives};

/// The `error` object of a Graph response, mapped through its own
/// binding directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedError {
    /// Empty when the payload carries no `type`; the classifier substitutes
    /// its configured default.
    pub error_type: String,
    pub message: String,
    pub code: Option<i64>,
    pub subcode: Option<i64>,
    pub is_transient: Option<bool>,
    pub trace_id: Option<String>,
    pub user_title: Option<String>,
    pub user_message: Option<String>,
    /// OAuth 2 `error_description`, only present for string-shaped errors.
    pub description: Option<String>,
}

impl Mappable for NormalizedError {
    fn directives() -> TypeDirectives<Self> {
        TypeDirectives::new()
            .bind(
                FieldBinding::scalar("error_type", |e: &mut Self, v: String| e.error_type = v)
                    .from_key("type"),
            )
            .bind(FieldBinding::scalar("message", |e: &mut Self, v: String| e.message = v))
            .bind(FieldBinding::scalar("code", |e: &mut Self, v: i64| e.code = Some(v)))
            .bind(
                FieldBinding::scalar("subcode", |e: &mut Self, v: i64| e.subcode = Some(v))
                    .from_key("error_subcode")
                    .or_key("subcode"),
            )
            .bind(
                FieldBinding::scalar("is_transient", |e: &mut Self, v: bool| {
                    e.is_transient = Some(v);
                }),
            )
            .bind(
                FieldBinding::scalar("trace_id", |e: &mut Self, v: String| e.trace_id = Some(v))
                    .from_key("fbtrace_id"),
            )
            .bind(
                FieldBinding::scalar("user_title", |e: &mut Self, v: String| {
                    e.user_title = Some(v);
                })
                .from_key("error_user_title"),
            )
            .bind(
                FieldBinding::scalar("user_message", |e: &mut Self, v: String| {
                    e.user_message = Some(v);
                })
                .from_key("error_user_msg"),
            )
            .hook("trim_error_type", Self::trim_error_type)
    }
}

impl NormalizedError {
    fn trim_error_type(&mut self) {
        let trimmed = self.error_type.trim();
        if trimmed.len() != self.error_type.len() {
            self.error_type = trimmed.to_string();
        }
    }

    /// Normalize the value found under a response's `error` key.
    ///
    /// Graph errors are objects. OAuth 2 endpoints answer with
    /// `{"error": "authorization_pending", "error_description": ".."}`;
    /// the string becomes the message. Any other shape is a mismatch.
    pub fn from_response(
        mapper: &Mapper,
        error: &Value,
        response: &Value,
    ) -> Result<Self, MapError> {
        match error {
            Value::String(code) => Ok(Self {
                message: code.clone(),
                description: response
                    .get("error_description")
                    .and_then(Value::as_str)
                    .map(String::from),
                ..Self::default()
            }),
            Value::Object(_) => mapper.map(error),
            other => Err(MapError::mismatch("error object", other)),
        }
    }

    /// `error_type`, or `default` when the payload had none.
    pub fn effective_type<'a>(&'a self, default: &'a str) -> &'a str {
        if self.error_type.is_empty() {
            default
        } else {
            &self.error_type
        }
    }
}
