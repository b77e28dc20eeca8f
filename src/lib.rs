pub mod answers;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod images;
pub mod recommend;
pub mod scoring;
pub mod store;

pub use answers::AnswerSet;
pub use catalog::{Catalog, CatalogItem};
pub use scoring::{Pick, Scorer};

/// Load `.env` from the working directory if present
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Tracing to stderr with an env filter, falling back to `default_filter`
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
