use dotenvy::dotenv;
use snafu::ResultExt as _;
use tokio::net::TcpListener;

use learnpath::api::{self, App};
use learnpath::config::Config;
use learnpath::error::{ApplicationError, BindAddressSnafu, WebServerSnafu};
use learnpath::logger;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let app = App::from_config(&config).await?;
    let router = api::router(app);

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu {
            address: config.host,
        })?;
    tracing::info!(address = %config.host, "listening");

    axum::serve(listener, router).await.context(WebServerSnafu)
}
