#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod classify;
pub mod error;
pub mod mapping;
pub mod response;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use classify::device::{classify_device_auth, device_auth_state};
pub use classify::{
    ApiErrorDetails, ApiException, ClassifierOptions, DeviceAuthException, DeviceAuthState,
    ErrorClassifier, NormalizedError,
};
pub use error::{Error, MapError};
pub use mapping::convert::FromJson;
pub use mapping::directives::{
    FieldBinding, FieldShape, Mappable, TypeDirectives, directives_for, registered_types,
};
pub use mapping::{Mapped, Mapper, MapperOptions, MappingContext, MappingPolicy};
pub use response::{ProcessorOptions, ResponseProcessor};
pub use types::{Connection, Cursors, DeviceCode, Paging};
