//! Shared foundation for the Argus detection engine: the normalized
//! event model, evaluation windows, environments, severity, engine
//! configuration from env vars, and the in-memory audit log.

pub mod audit;
pub mod config;
pub mod environment;
pub mod error;
pub mod event;
pub mod severity;
pub mod window;

pub use audit::*;
pub use config::{load_dotenv, EngineConfig, SmtpConfig};
pub use environment::Environment;
pub use error::*;
pub use event::*;
pub use severity::Severity;
pub use window::EvalWindow;
