use anyhow::Result;
use car_match::{
    config::{Config, DEFAULT_LOG_FILTER},
    http::start_http_server,
    init_tracing, load_env,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing(DEFAULT_LOG_FILTER);

    let config = Config::load()?;
    info!(
        "Starting car-match recommendation service (llm={}, store={})",
        config.llm_available(),
        config.runtime.supabase_url.is_some()
    );

    start_http_server(config).await
}
