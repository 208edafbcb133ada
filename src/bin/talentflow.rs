//! Runs the matching engine's periodic jobs until SIGINT or SIGTERM.
//!
//! Engine settings come from command-line flags or their `TALENTFLOW_*`
//! variables (see `talentflow --help` and [`talentflow::config`]). The rest
//! comes from the environment:
//!
//! - `DATABASE_URL` selects the `PostgreSQL` store; without it records live
//!   in memory for the lifetime of the process.
//! - `GOOGLE_API_KEY` enables the Gemini extension oracle; without it every
//!   extension request is rejected.
//! - `TALENTFLOW_GEMINI_MODEL` overrides the Gemini model.
//! - `RUST_LOG` controls log filtering (default `info`).

use clap::Parser;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use std::env;
use std::sync::Arc;
use talentflow::{
    config::{EngineArgs, EngineConfig},
    driver::{PeriodicDriver, install_shutdown_handler},
    matching::{
        adapters::{
            GeminiExtensionOracle, HashEmbedder, StaticOracle, memory::InMemoryMatchingStore,
            postgres::PostgresMatchingStore,
        },
        ports::{ExtensionOracle, MatchingStore},
        services::{ExpirationReaper, ExtensionArbiter, IntakeService, MatchingEngine},
    },
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::try_from(EngineArgs::parse())?;
    info!(
        threshold = %config.threshold(),
        reject_policy = %config.reject_policy(),
        "configuration loaded"
    );

    match env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = Pool::builder().build(ConnectionManager::<PgConnection>::new(url))?;
            let store = PostgresMatchingStore::new(pool);
            store.apply_schema().await?;
            info!("using PostgreSQL store");
            with_oracle(Arc::new(store), &config).await
        }
        Err(_) => {
            warn!("DATABASE_URL not set; records are kept in memory only");
            with_oracle(Arc::new(InMemoryMatchingStore::new()), &config).await
        }
    }
}

async fn with_oracle<S>(store: Arc<S>, config: &EngineConfig) -> Result<(), BoxError>
where
    S: MatchingStore + 'static,
{
    match env::var("GOOGLE_API_KEY") {
        Ok(api_key) => {
            let mut oracle = GeminiExtensionOracle::new(api_key);
            if let Ok(model) = env::var("TALENTFLOW_GEMINI_MODEL") {
                oracle = oracle.with_model(model);
            }
            info!("using Gemini extension oracle");
            run(store, Arc::new(oracle), config).await
        }
        Err(_) => {
            warn!("GOOGLE_API_KEY not set; every extension request will be rejected");
            run(store, Arc::new(StaticOracle::rejecting()), config).await
        }
    }
}

async fn run<S, O>(store: Arc<S>, oracle: Arc<O>, config: &EngineConfig) -> Result<(), BoxError>
where
    S: MatchingStore + 'static,
    O: ExtensionOracle + 'static,
{
    let clock = Arc::new(DefaultClock);

    let intake = IntakeService::new(
        Arc::clone(&store),
        Arc::new(HashEmbedder::default()),
        Arc::clone(&clock),
    );
    intake.seed_demo_data().await?;

    let matching = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), config);
    let extension = ExtensionArbiter::new(Arc::clone(&store), oracle, Arc::clone(&clock), config);
    let expiration = ExpirationReaper::new(store, clock);

    let driver = PeriodicDriver::new()
        .with_job(Arc::new(matching), config.match_interval())
        .with_job(Arc::new(extension), config.extension_interval())
        .with_job(Arc::new(expiration), config.expiry_interval());

    let shutdown = install_shutdown_handler()?;
    driver.run(shutdown).await;
    Ok(())
}
