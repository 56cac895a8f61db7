//! A small Rust client for the Pluvia hydrological and meteorological data API.
//!
//! The client keeps a bearer token in a local file, reuses it while it is valid and
//! exchanges the configured username/password for a new one when it has expired.
//! Every request re-checks the token first.
//!
//! ## Quick start
//! - Configure credentials via environment variables (`PLUVIA_USERNAME`,
//!   `PLUVIA_PASSWORD`) or a `.pluviarc` file (current directory or home directory).
//! - Call [`Client::authenticate`] once, then pass the session to data calls.
//!
//! ```no_run
//! use pluvia::{Client, Mode};
//!
//! fn main() -> pluvia::Result<()> {
//!     let client = Client::from_env()?;
//!     let mut session = client.authenticate(None)?;
//!     let daily = client.mode_id(&mut session, Mode::Daily)?;
//!     println!("Daily mode id: {daily}");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod auth;
mod client;
mod config;
mod error;
mod resolver;
mod settings;
mod store;
mod token;
mod util;

pub use auth::{AuthSession, Authenticator, LoginData, default_token_headers};
pub use client::{CHUNK_SIZE, Client};
pub use config::{ClientConfig, ConfigOverrides, DEFAULT_TIMEOUT, DEFAULT_URL};
pub use error::{Error, Result};
pub use resolver::{ReferenceEntry, find_id};
pub use settings::{
    Described, FileKind, ForecastModel, FormatDefaults, Mode, PrecipitationSource, UnknownName,
};
pub use store::{CredentialRecord, CredentialStore};
pub use token::{EXPIRES_FORMAT, is_valid, is_valid_at, parse_expiry};
