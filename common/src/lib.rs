pub mod api;
pub mod config;
pub mod logger;
pub mod time;
pub mod validator;

#[cfg(feature = "tokio")]
pub mod tokio;
