//! Session client models

pub mod account;
pub mod session;
pub mod token;
pub mod user;

// Re-export for convenience
pub use account::{AccountActivation, EmailRequest, EmailResetConfirm, PasswordResetConfirm};
pub use session::{AuthStatus, RequestOutcome, Session};
pub use token::{ApiErrorBody, LoginResponse, RefreshRequest, RefreshedTokens, VerifyRequest};
pub use user::{LoginCredentials, NewUser, User};
