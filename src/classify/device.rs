use crate::classify::normalized::NormalizedError;

pub const AUTHORIZATION_PENDING_SUBCODE: i64 = 1_349_174;
pub const SLOW_DOWN_SUBCODE: i64 = 1_349_172;
pub const CODE_EXPIRED_SUBCODE: i64 = 1_349_152;

/// State of a device-login poll reported through an OAuth error.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceAuthState {
    /// The user has not approved the code yet.
    Pending,
    Declined,
    /// Polled faster than the advertised interval.
    SlowDown,
    CodeExpired,
}

impl DeviceAuthState {
    /// Whether the caller should poll again (after waiting).
    pub fn keep_polling(self) -> bool {
        matches!(self, Self::Pending | Self::SlowDown)
    }
}

struct DeviceAuthRule {
    message: &'static str,
    subcode: Option<i64>,
    state: DeviceAuthState,
}

// Older API versions signal the state in `message`, newer ones in
// `error_subcode`. Evaluated top to bottom.
const DEVICE_AUTH_RULES: &[DeviceAuthRule] = &[
    DeviceAuthRule {
        message: "authorization_pending",
        subcode: Some(AUTHORIZATION_PENDING_SUBCODE),
        state: DeviceAuthState::Pending,
    },
    DeviceAuthRule {
        message: "authorization_declined",
        subcode: None,
        state: DeviceAuthState::Declined,
    },
    DeviceAuthRule {
        message: "slow_down",
        subcode: Some(SLOW_DOWN_SUBCODE),
        state: DeviceAuthState::SlowDown,
    },
    DeviceAuthRule {
        message: "code_expired",
        subcode: Some(CODE_EXPIRED_SUBCODE),
        state: DeviceAuthState::CodeExpired,
    },
];

impl DeviceAuthRule {
    fn matches(&self, message: &str, subcode: Option<i64>) -> bool {
        message == self.message || (self.subcode.is_some() && subcode == self.subcode)
    }
}

pub fn device_auth_state(message: &str, subcode: Option<i64>) -> Option<DeviceAuthState> {
    DEVICE_AUTH_RULES
        .iter()
        .find(|rule| rule.matches(message, subcode))
        .map(|rule| rule.state)
}

/// Second-stage classification of an OAuth error. `None` means the error is
/// not a device-login state and stays a plain OAuth error.
pub fn classify_device_auth(error: &NormalizedError) -> Option<DeviceAuthState> {
    device_auth_state(&error.message, error.subcode)
}
