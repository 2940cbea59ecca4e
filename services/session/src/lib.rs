//! Client-side session management for the storefront API
//!
//! This crate keeps the JWT access/refresh token pair of a storefront user,
//! verifies and silently refreshes it against the API, and exposes the
//! resulting authentication state to view code.
//!
//! ```rust,no_run
//! use session::{ApiConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SessionManager::from_config(ApiConfig::from_env()?)?;
//!     let status = manager.check_authenticated().await;
//!     println!("status: {:?}, user: {:?}", status, manager.user());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod models;
pub mod session;

pub use client::AuthApi;
pub use config::ApiConfig;
pub use error::{SessionError, SessionResult};
pub use models::{AuthStatus, RequestOutcome, Session, User};
pub use session::SessionManager;
