//! Rollcall server binary.
//!
//! Configuration comes from the environment (and `.env`); see
//! [`ServerConfig::from_env`].

use rollcall::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RollcallError> {
    let config = ServerConfig::from_env()?;

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        bind = %config.bind_address,
        client_url = %config.client_url,
        lifetime_secs = config.session.lifetime.as_secs(),
        rotation_secs = config.session.rotation_period.as_secs(),
        "configuration loaded"
    );

    match config.teacher_api_token.clone() {
        Some(token) => serve(&config, StaticTokenAuthenticator::new(token)).await,
        None => {
            warn!("TEACHER_API_TOKEN not set, start and stop are open to every caller");
            serve(&config, OpenAccess).await
        }
    }
}

async fn serve<A: Authenticator>(config: &ServerConfig, auth: A) -> Result<(), RollcallError> {
    let server = RollcallServerBuilder::from_config(config).build(auth).await?;
    info!(addr = %server.local_addr()?, "listening");
    server.run().await
}
