//! Types shared by the PTT engine and server crates.
mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY};
pub use secret::Secret;
