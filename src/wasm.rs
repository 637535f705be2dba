use wasm_bindgen::prelude::*;

use crate::classify::{ApiException, ErrorClassifier, device};
use crate::error::Error;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = JSON)]
    fn parse(s: &str) -> JsValue;
}

fn to_js(value: &serde_json::Value) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json_str) => parse(&json_str),
        Err(_) => JsValue::NULL,
    }
}

fn exception_to_json(exception: &ApiException) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "kind": exception.kind(),
        "message": exception.to_string(),
        "httpStatus": exception.http_status(),
        "code": exception.code(),
        "subcode": exception.subcode(),
        "isTransient": exception.is_transient(),
    });
    if let Some(state) = exception.device_auth_state() {
        obj["deviceAuthState"] = serde_json::Value::String(state.as_ref().to_string());
        obj["keepPolling"] = serde_json::Value::Bool(state.keep_polling());
    }
    if let Some(details) = exception.details() {
        obj["errorType"] = serde_json::Value::String(details.error_type.clone());
        obj["traceId"] = details
            .trace_id
            .clone()
            .map_or(serde_json::Value::Null, serde_json::Value::String);
        obj["userMessage"] = details
            .user_message
            .clone()
            .map_or(serde_json::Value::Null, serde_json::Value::String);
    }
    obj
}

/// Classify a raw response body. Returns `null` for a non-error response,
/// otherwise an object describing the exception.
#[wasm_bindgen(js_name = classifyError)]
pub fn classify_error(body: &str, http_status: u16) -> JsValue {
    match ErrorClassifier::default().classify_text(body, http_status) {
        Ok(_) => JsValue::NULL,
        Err(Error::Api(exception)) => to_js(&exception_to_json(&exception)),
        Err(err) => error_result(&err.to_string()),
    }
}

/// Device-login state for a poll error's message and subcode, or `null`.
#[wasm_bindgen(js_name = parseDeviceAuthState)]
pub fn parse_device_auth_state(message: &str, subcode: Option<f64>) -> Option<String> {
    device::device_auth_state(message, subcode.map(|s| s as i64)).map(|s| s.to_string())
}

/// Full error details as a plain JS object, via serde.
#[wasm_bindgen(js_name = errorDetails)]
pub fn error_details(body: &str, http_status: u16) -> Result<JsValue, JsValue> {
    let details = match ErrorClassifier::default().classify_text(body, http_status) {
        Ok(_) => return Ok(JsValue::NULL),
        Err(Error::Api(exception)) => exception.details().cloned(),
        Err(err) => return Err(JsValue::from_str(&err.to_string())),
    };
    serde_wasm_bindgen::to_value(&details).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn error_result(msg: &str) -> JsValue {
    let obj = serde_json::json!({"error": msg});
    to_js(&obj)
}
