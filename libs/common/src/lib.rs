//! Common library for the storefront session client
//!
//! This crate provides the durable key-value substrate the session layer
//! persists credentials into, along with its error type.
//!
//! ```rust,no_run
//! use common::store::{CredentialStore, FileStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::open(".storefront-session.json")?;
//!     store.set("access", "token")?;
//!     println!("access = {:?}", store.get("access")?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{CredentialStore, FileStore, MemoryStore};
