use crate::classify::ApiException;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiException),

    #[error("mapping error: {0}")]
    Mapping(#[from] MapError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to convert one JSON value into the field it is bound to.
///
/// `path` locates the offending value from the root of the mapped document,
/// e.g. `$`, `from.name` or `data[1].like_count`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("type mismatch at `{path}`: expected {expected}, got {raw}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        raw: String,
    },

    #[error("unknown {enum_type} variant at `{path}`: {raw:?}")]
    UnknownEnumVariant {
        path: String,
        enum_type: &'static str,
        raw: String,
    },
}

pub(crate) const ROOT_PATH: &str = "$";

impl MapError {
    pub(crate) fn mismatch(expected: &'static str, raw: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            path: ROOT_PATH.to_string(),
            expected,
            raw: raw.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::TypeMismatch { path, .. } | Self::UnknownEnumVariant { path, .. } => path,
        }
    }

    /// Prefix the error location with the field it was raised under.
    pub(crate) fn in_field(self, field: &str) -> Self {
        self.rebase(|rest| {
            if rest.is_empty() {
                field.to_string()
            } else if rest.starts_with('[') {
                format!("{field}{rest}")
            } else {
                format!("{field}.{rest}")
            }
        })
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        self.rebase(|rest| {
            if rest.is_empty() || rest.starts_with('[') {
                format!("[{index}]{rest}")
            } else {
                format!("[{index}].{rest}")
            }
        })
    }

    fn rebase(self, join: impl FnOnce(&str) -> String) -> Self {
        let relative = |path: &str| -> String {
            path.strip_prefix(ROOT_PATH)
                .map(|rest| rest.trim_start_matches('.').to_string())
                .unwrap_or_else(|| path.to_string())
        };
        match self {
            Self::TypeMismatch {
                path,
                expected,
                raw,
            } => Self::TypeMismatch {
                path: join(&relative(&path)),
                expected,
                raw,
            },
            Self::UnknownEnumVariant {
                path,
                enum_type,
                raw,
            } => Self::UnknownEnumVariant {
                path: join(&relative(&path)),
                enum_type,
                raw,
            },
        }
    }
}
