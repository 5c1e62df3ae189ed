mod cents;
mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError, DEFAULT_CURRENCY_CODE};
pub use helpers::{parse_boolean_flag, parse_env_value};
pub use secret::Secret;
