use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use redisq_core::config::{ENV_MAX_DELIVERY, ENV_QUEUE_KEY, ENV_TIMEOUT_SECS};
use redisq_core::impls::InMemoryListStore;
use redisq_core::telemetry;
use redisq_core::typed::{Handler, TypedCallback};
use redisq_core::{CallbackError, CallbackResult, Consumer, Publisher, QueueConfig, TaskMeta};

#[derive(Debug, Parser)]
#[command(name = "redisq", version, about = "At-least-once work queue over Redis lists")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Append one task (JSON body) to the queue tail.
    Publish {
        #[command(flatten)]
        queue: QueueArgs,

        /// Task body as JSON, e.g. '{"to": "user@example.com"}'.
        body: String,

        /// Task name; generated as <timestamp>_<n> when omitted.
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Print every task as one JSON line and acknowledge it. Stops on SIGINT/SIGTERM.
    Consume {
        #[command(flatten)]
        queue: QueueArgs,

        /// Stop after this many deliveries (at least 1).
        #[arg(long)]
        limit: Option<NonZeroUsize>,
    },

    /// Run an in-memory round trip: a handler fails a few times, then succeeds.
    Demo {
        /// How many deliveries fail (Requeue) before the handler succeeds.
        #[arg(long, default_value_t = 2)]
        failures: u32,
    },
}

#[derive(Debug, Args)]
struct QueueArgs {
    /// Queue key (falls back to REDISQ_QUEUE_KEY).
    #[arg(long)]
    queue: Option<String>,

    /// Deliveries before a requeued task is discarded (falls back to REDISQ_MAX_DELIVERY).
    #[arg(long)]
    max_delivery: Option<u32>,

    /// Blocking-pop timeout in seconds (falls back to REDISQ_TIMEOUT_SECS).
    #[arg(long)]
    timeout: Option<f64>,

    #[arg(long, env = "REDISQ_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,
}

impl QueueArgs {
    /// Flags win over environment variables.
    fn config(&self) -> anyhow::Result<QueueConfig> {
        let mut overrides: HashMap<&str, String> = HashMap::new();
        if let Some(queue) = &self.queue {
            overrides.insert(ENV_QUEUE_KEY, queue.clone());
        }
        if let Some(max_delivery) = self.max_delivery {
            overrides.insert(ENV_MAX_DELIVERY, max_delivery.to_string());
        }
        if let Some(timeout) = self.timeout {
            overrides.insert(ENV_TIMEOUT_SECS, timeout.to_string());
        }

        QueueConfig::from_lookup(|name| {
            overrides
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
        })
        .context("invalid queue configuration")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloPayload {
    name: String,
}

struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<HelloPayload> for HelloHandler {
    async fn handle(
        &self,
        payload: HelloPayload,
        meta: &TaskMeta,
        name: &str,
    ) -> Result<CallbackResult, CallbackError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            println!("{name}: intentional failure (left={left}), requeue");
            return Ok(CallbackResult::Requeue);
        }

        println!(
            "{name}: Hello, {}! (delivery={}, retry={})",
            payload.name,
            meta.delivery_count() + 1,
            meta.retry_count()
        );
        // デモなのでここでループを止める
        Ok(CallbackResult::Stop)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(&telemetry::log_level_from_env())?;

    let cli = Cli::parse();
    match cli.command {
        Command::Publish { queue, body, name } => publish(queue, &body, &name).await,
        Command::Consume { queue, limit } => consume(queue, limit).await,
        Command::Demo { failures } => demo(failures).await,
    }
}

#[cfg(feature = "redis")]
async fn publish(args: QueueArgs, body: &str, name: &str) -> anyhow::Result<()> {
    use redisq_core::impls::RedisListStore;

    let config = args.config()?;
    let body: serde_json::Value = serde_json::from_str(body).context("body is not valid JSON")?;
    let store = RedisListStore::open(&args.redis_url).await?;
    let publisher = Publisher::new(store, config.queue_key());

    let envelope = publisher.publish_named(body, name).await?;
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

#[cfg(feature = "redis")]
async fn consume(args: QueueArgs, limit: Option<NonZeroUsize>) -> anyhow::Result<()> {
    use redisq_core::callback_fn;
    use redisq_core::impls::RedisListStore;
    use tracing::info;

    let config = args.config()?;
    let store = RedisListStore::open(&args.redis_url).await?;
    let consumer = Consumer::new(store, config);
    consumer.shutdown().listen_for_signals();

    let delivered = Arc::new(AtomicU32::new(0));
    let callback = callback_fn(move |body, meta, name| {
        let line = serde_json::json!({"name": name, "body": body, "meta": meta});
        println!("{line}");
        let n = delivered.fetch_add(1, Ordering::Relaxed) as usize + 1;
        let done = limit.is_some_and(|limit| n >= limit.get());
        Ok::<_, CallbackError>(if done { CallbackResult::Stop } else { CallbackResult::Ack })
    });

    let report = consumer.consume(&callback).await?;
    info!(
        delivered = report.delivered,
        acked = report.acked,
        requeued = report.requeued,
        discarded = report.discarded,
        corrupt = report.corrupt,
        "consumer finished"
    );
    Ok(())
}

#[cfg(not(feature = "redis"))]
async fn publish(_args: QueueArgs, _body: &str, _name: &str) -> anyhow::Result<()> {
    anyhow::bail!("redisq was built without the `redis` feature")
}

#[cfg(not(feature = "redis"))]
async fn consume(_args: QueueArgs, _limit: Option<NonZeroUsize>) -> anyhow::Result<()> {
    anyhow::bail!("redisq was built without the `redis` feature")
}

/// Enough deliveries for `failures` requeues plus the successful one.
fn demo_config(failures: u32) -> QueueConfig {
    QueueConfig::new("demo")
        .with_max_delivery(failures.saturating_add(1))
        .with_timeout(Duration::from_secs(1))
}

async fn demo(failures: u32) -> anyhow::Result<()> {
    // (A) store と publisher / consumer を用意
    let store = Arc::new(InMemoryListStore::new());
    let config = demo_config(failures);
    let publisher = Publisher::new(store.clone(), config.queue_key());
    let consumer = Consumer::new(store.clone(), config);
    consumer.shutdown().listen_for_signals();

    // (B) タスク投入
    let envelope = publisher
        .publish_typed(&HelloPayload { name: "redisq".to_string() }, "")
        .await?;
    println!("published task: {}", envelope.name());

    // (C) handler が Stop を返すまで consume
    let report = consumer
        .consume(&TypedCallback::new(HelloHandler::new(failures)))
        .await?;
    println!("report: {}", serde_json::to_string(&report)?);
    println!("left in queue: {}", store.len("demo").await);
    Ok(())
}
