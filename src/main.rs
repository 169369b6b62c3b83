//! QuizForge server entrypoint.
//!
//! Loads configuration, wires the production adapters into the application
//! context, spawns the background worker pool, and serves the HTTP API.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use quizforge::adapters::ai::{OpenAiConfig, OpenAiProvider};
use quizforge::adapters::auth::{JwtConfig, JwtVerifier};
use quizforge::adapters::http::api_router;
use quizforge::adapters::lock::RedisEntityLock;
use quizforge::adapters::parser::PlainTextParser;
use quizforge::adapters::queue::RedisWorkQueue;
use quizforge::adapters::record_store::HttpRecordStore;
use quizforge::adapters::search::{HttpSearchIndex, SearchIndexConfig};
use quizforge::adapters::storage::FsObjectStorage;
use quizforge::adapters::templates::YamlTemplateStore;
use quizforge::application::jobs::worker::spawn_pool;
use quizforge::application::{AppContext, GenerationSettings, LockSettings, Ports};
use quizforge::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    let store = Arc::new(HttpRecordStore::new(
        quizforge::adapters::record_store::RecordStoreConfig {
            base_url: config.record_store.url.clone(),
            service_token: SecretString::from(config.record_store.service_token.clone()),
            timeout: config.record_store.timeout(),
        },
    )?);

    let search = Arc::new(HttpSearchIndex::new(SearchIndexConfig {
        base_url: config.search.url.clone(),
        api_key: SecretString::from(config.search.api_key.clone()),
        timeout: config.search.timeout(),
    })?);

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    let queue = Arc::new(RedisWorkQueue::new(
        redis_conn.clone(),
        config.redis.queue_key.clone(),
    ));
    let entity_lock = Arc::new(
        RedisEntityLock::new(redis_conn).with_key_prefix(config.redis.lock_prefix.clone()),
    );

    let provider = Arc::new(OpenAiProvider::new(
        OpenAiConfig::new(config.ai.api_key.clone())
            .with_model(config.ai.model.clone())
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout()),
    )?);
    let templates = Arc::new(YamlTemplateStore::from_file(Path::new(
        &config.ai.template_path,
    ))?);

    let verifier = Arc::new(JwtVerifier::new(&JwtConfig {
        secret: SecretString::from(config.auth.jwt_secret.clone()),
        issuer: config.auth.issuer.clone(),
    }));

    let ports = Ports {
        store,
        search,
        queue,
        provider,
        templates,
        parser: Arc::new(PlainTextParser::new()),
        storage: Arc::new(FsObjectStorage::new(&config.storage.root)),
        entity_lock,
        verifier,
    };
    let generation = GenerationSettings {
        template_label: config.ai.template_label.clone(),
        rates: config.ai.rates(),
        max_tokens: Some(config.ai.max_tokens),
        temperature: Some(config.ai.temperature),
    };
    let lock_settings = LockSettings {
        ttl: config.jobs.lock_ttl(),
        wait_timeout: config.jobs.lock_wait_timeout(),
        poll_interval: config.jobs.lock_poll_interval(),
    };
    let ctx = AppContext::new(ports, generation, lock_settings);

    let workers = spawn_pool(Arc::clone(&ctx), config.jobs.worker_count);
    tracing::info!(count = workers.len(), "worker pool started");

    let app = api_router(ctx).layer(
        ServiceBuilder::new().layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        ))),
    );
    let addr = config.server.socket_addr();
    tracing::info!(%addr, environment = ?config.server.environment, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
