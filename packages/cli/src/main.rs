//! Burst drain: run every ready job in the configured queues once, then exit.

use std::error::Error;
use std::time::Duration;

use api::{BrokerConfig, JobRequest, demo_handlers, get_statistics, init_broker};
use broker::{WorkerMessage, rpc, spawn_worker_actor};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "queue-drain", about = "Drain task queues once in burst mode")]
struct Cli {
    /// Queue to drain; repeat for several. Defaults to every configured queue.
    #[arg(short, long = "queue")]
    queues: Vec<String>,

    /// Worker name. Defaults to one derived from the queue names.
    #[arg(short, long)]
    name: Option<String>,

    /// Enqueue a few demo jobs before draining.
    #[arg(long)]
    demo: bool,

    /// Print queue statistics as JSON after the drain.
    #[arg(long)]
    stats: bool,

    /// Seconds to wait for the drain to finish.
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = BrokerConfig::from_env()?;
    let broker = init_broker(&config, demo_handlers()?).await?;

    let queue_names: Vec<String> = if cli.queues.is_empty() {
        config.queues.names().to_vec()
    } else {
        cli.queues.clone()
    };

    if cli.demo {
        let first = queue_names.first().ok_or("no queues to drain")?;
        let queue = broker.get_queue(first);
        queue
            .enqueue(JobRequest::new("echo").with_args(vec![json!("hello")]))
            .await?;
        queue
            .enqueue(JobRequest::new("sleep").with_kwarg("seconds", json!(0)))
            .await?;
        queue.enqueue(JobRequest::new("fail")).await?;
    }

    let names: Vec<&str> = queue_names.iter().map(String::as_str).collect();
    let worker = broker.create_worker(&names, cli.name.as_deref());
    let (actor, handle) = spawn_worker_actor(worker).await?;

    let reply = rpc::call(
        &actor,
        |reply| WorkerMessage::Work { burst: true, reply },
        Some(Duration::from_secs(cli.timeout)),
    )
    .await?;
    let report = match reply {
        rpc::CallResult::Success(result) => result?,
        rpc::CallResult::Timeout => return Err("drain timed out".into()),
        rpc::CallResult::SenderError => return Err("worker stopped before replying".into()),
    };
    actor.send_message(WorkerMessage::Shutdown)?;
    handle.await?;

    tracing::info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Burst drain complete"
    );

    if cli.stats {
        let stats = get_statistics(&broker, &config.queues).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
