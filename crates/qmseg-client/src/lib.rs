pub mod commands;
pub mod config;
pub mod contracts;
pub mod error;
pub mod segmentation;
pub mod setup;
pub mod sink;
pub mod source;
pub mod state;

pub use contracts::envelope::{ErrorEnvelope, SuccessEnvelope, error_envelope};
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
