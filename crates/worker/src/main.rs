use clap::Parser;
use serde_json::Value;
use sluice_core::PipelineConfig;
use sluice_db::models::WorkItemStatus;
use sluice_db::repositories::WorkItemRepo;
use sluice_db::DbPool;
use sluice_pipeline::{default_chain, run_chain, JobContext};
use sluice_worker::cli::{Cli, Command, QueueCommand};
use sluice_worker::executor::{ItemOutcome, ParallelExecutor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match cli.command {
        Command::Jobs => jobs(),
        Command::Run {
            input,
            start_from,
            stop_after,
        } => run(config, input, start_from, stop_after).await,
        Command::RunAll {
            files,
            from_queue,
            limit,
            max_workers,
        } => run_all(config, files, from_queue, limit, max_workers).await,
        Command::Queue(queue_command) => queue(config, queue_command).await,
    }
}

async fn open_store(config: &PipelineConfig) -> anyhow::Result<DbPool> {
    let pool = sluice_db::create_pool(&config.database_url).await?;
    sluice_db::run_migrations(&pool).await?;
    Ok(pool)
}

fn jobs() -> anyhow::Result<()> {
    let chain = default_chain()?;
    println!("Available steps:");
    for (i, name) in chain.names().iter().enumerate() {
        println!("  {}. {name}", i + 1);
    }
    Ok(())
}

async fn run(
    config: PipelineConfig,
    input: String,
    start_from: Option<String>,
    stop_after: Option<String>,
) -> anyhow::Result<()> {
    let pool = open_store(&config).await?;

    // The finalize step takes a batch id; everything else takes a file path.
    let initial = if start_from.as_deref() == Some("finalize") {
        let batch_id: i64 = input.parse().map_err(|_| {
            anyhow::anyhow!("the finalize step requires an integer batch id, got: {input}")
        })?;
        Value::from(batch_id)
    } else {
        Value::String(input)
    };

    let chain = default_chain()?;
    let ctx = JobContext::new(config, pool.clone());
    let result = run_chain(
        &chain,
        &ctx,
        initial,
        start_from.as_deref(),
        stop_after.as_deref(),
    )
    .await?;
    pool.close().await;

    if result.success {
        println!("Chain completed successfully.");
        if let Some(output) = result.output {
            println!("Result: {output}");
        }
        Ok(())
    } else {
        println!(
            "Chain failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
}

async fn run_all(
    config: PipelineConfig,
    files: Vec<String>,
    from_queue: bool,
    limit: Option<i64>,
    max_workers: Option<usize>,
) -> anyhow::Result<()> {
    if from_queue && !files.is_empty() {
        anyhow::bail!("cannot combine --from-queue with input files");
    }
    if !from_queue && files.is_empty() {
        anyhow::bail!("provide input files or --from-queue");
    }
    if limit.is_some() && !from_queue {
        tracing::warn!("--limit only applies with --from-queue, ignoring");
    }

    let pool = open_store(&config).await?;
    let executor = ParallelExecutor::new(config, max_workers);
    println!("Workers: {}", executor.workers());

    let progress = |completed: usize, total: usize, outcome: &ItemOutcome| {
        let marker = if outcome.success { "ok" } else { "FAILED" };
        println!("  [{completed}/{total}] {marker} {}", outcome.file_path);
        if let Some(error) = &outcome.error {
            println!("      {error}");
        }
    };

    let outcome = if from_queue {
        executor.run_queue(&pool, limit, Some(&progress)).await?
    } else {
        executor.run_files(&files, Some(&progress)).await
    };
    pool.close().await;

    println!();
    println!("Total:     {}", outcome.total);
    println!("Succeeded: {}", outcome.succeeded);
    println!("Failed:    {}", outcome.failed);
    println!("Success rate: {:.1}%", outcome.success_rate());

    if outcome.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn queue(config: PipelineConfig, command: QueueCommand) -> anyhow::Result<()> {
    let pool = open_store(&config).await?;

    match command {
        QueueCommand::Add { files, priority } => {
            for file in &files {
                let item = WorkItemRepo::enqueue(&pool, file, priority).await?;
                println!(
                    "  added #{}: {} (priority {})",
                    item.id, item.file_path, item.priority
                );
            }
            println!("Enqueued {} item(s).", files.len());
        }
        QueueCommand::List { status, limit } => {
            let items = match status {
                Some(status) => {
                    WorkItemRepo::list_by_status(&pool, status.into(), limit).await?
                }
                None => WorkItemRepo::list_recent(&pool, limit).await?,
            };

            if items.is_empty() {
                println!("No queue items found.");
            } else {
                println!("{:<6} {:<12} {:<8} file", "id", "status", "priority");
                for item in &items {
                    let status_name = WorkItemStatus::from_id(item.status_id)
                        .map(|s| s.name())
                        .unwrap_or("unknown");
                    println!(
                        "{:<6} {:<12} {:<8} {}",
                        item.id, status_name, item.priority, item.file_path
                    );
                }
                println!();
                println!("{} item(s).", items.len());
            }
        }
        QueueCommand::Clear { status } => {
            let deleted = WorkItemRepo::clear(&pool, status.map(Into::into)).await?;
            println!("Deleted {deleted} item(s).");
        }
        QueueCommand::RetryFailed => {
            let reset = WorkItemRepo::reset_failed(&pool).await?;
            println!("Reset {reset} failed item(s) to pending.");
        }
    }

    pool.close().await;
    Ok(())
}
