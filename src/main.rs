use axum::{Router, extract::Extension};
use partition_query::config::NodeOptions;
use partition_query::executor::handlers::task_routes;
use partition_query::executor::pool::BoundedTaskPool;
use partition_query::executor::registry::{TaskHandlerRegistry, register_builtin_handlers};
use partition_query::executor::service::TaskService;
use partition_query::query::executor::PartitionScanExecutor;
use partition_query::query::handlers::query_routes;
use partition_query::storage::handlers::map_routes;
use partition_query::storage::memory::PartitionedStore;
use partition_query::storage::partitioner::PartitionManager;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let options = match NodeOptions::parse(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "Usage: {} --bind <addr:port> [--partitions <n>] [--workers <n>] \
                 [--timeout-secs <n>] [--finished-task-limit <n>]",
                args[0]
            );
            eprintln!("Example: {} --bind 127.0.0.1:6000 --workers 8", args[0]);
            std::process::exit(1);
        }
    };
    let engine = &options.engine;

    tracing::info!("Starting node on {}", options.bind_addr);
    tracing::info!(
        "Engine: {} partitions, {} workers, query timeout {:?}",
        engine.partition_count,
        engine.pool_capacity,
        engine.query_timeout
    );

    // 1. Storage layer:
    let partitioner = Arc::new(PartitionManager::new(engine.partition_count));
    let store = Arc::new(PartitionedStore::new(partitioner));

    // 2. Scan executor, on a pool of its own:
    let scan_pool = BoundedTaskPool::new(engine.pool_capacity);
    let executor = Arc::new(PartitionScanExecutor::from_config(
        store.clone(),
        scan_pool.clone(),
        engine,
    ));

    // 3. Remote tasks:
    let registry = TaskHandlerRegistry::new();
    register_builtin_handlers(&registry);
    tracing::info!("Task handlers: {}", registry.list_handlers().join(", "));
    let tasks = TaskService::with_finished_limit(
        registry,
        BoundedTaskPool::new(engine.pool_capacity),
        engine.finished_task_limit,
    );

    // 4. Spawn stats reporter:
    let stats_store = store.clone();
    let stats_tasks = tasks.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

        loop {
            interval.tick().await;
            let (submitted, running, completed, cancelled, failed) =
                stats_tasks.task_state_counts();
            tracing::info!(
                "Node stats: {} collections, tasks submitted={} running={} completed={} \
                 cancelled={} failed={}",
                stats_store.collection_names().len(),
                submitted,
                running,
                completed,
                cancelled,
                failed
            );
            tracing::info!(
                "Pools: scan {}/{} slots free, tasks {}/{} slots free",
                scan_pool.available_slots(),
                scan_pool.capacity(),
                stats_tasks.pool().available_slots(),
                stats_tasks.pool().capacity()
            );
        }
    });

    // 5. HTTP Router:
    let app = Router::new()
        .merge(map_routes())
        .merge(query_routes())
        .merge(task_routes())
        .layer(Extension(store))
        .layer(Extension(executor))
        .layer(Extension(tasks));

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", options.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(options.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
