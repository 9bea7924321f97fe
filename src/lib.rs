//! Data-access core for a tabletop card-game session tracker.
//!
//! Users register accounts, name the commander decks they pilot, and record
//! each game's outcome; the crate owns everything between that intent and
//! the SQLite file: credential and session handling ([`CredentialService`]),
//! ownership-scoped repositories and statistics behind a single [`Store`]
//! facade, and the validation and error taxonomy both share. HTTP routing
//! and serialization live a layer above.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod validation;

pub use auth::{Claims, CredentialService};
pub use config::Config;
pub use db::Store;
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber: `RUST_LOG` wins, the configured
/// level is the fallback. Calling it again keeps the first subscriber, so
/// tests can call it freely.
pub fn init_logging(config: &config::GeneralConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
