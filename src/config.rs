//! Engine and node configuration.
//!
//! `EngineConfig` holds the knobs of the scan engine itself; `NodeOptions` adds what the
//! `queryd` binary needs to come up (bind address) and is parsed from the command line.

use anyhow::{Result, bail};
use std::net::SocketAddr;
use std::time::Duration;

/// Deadline applied to a whole scan when the caller does not choose one.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PARTITION_COUNT: u32 = 271;
/// Finished tasks a node keeps queryable before forgetting the oldest.
pub const DEFAULT_FINISHED_TASK_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of partitions the key space is split into.
    pub partition_count: u32,
    /// Worker slots of the bounded task pool.
    pub pool_capacity: usize,
    /// Single shared deadline for all per-partition tasks of one request.
    pub query_timeout: Duration,
    /// Finished remote tasks kept for status queries.
    pub finished_task_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_count: DEFAULT_PARTITION_COUNT,
            pool_capacity: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            finished_task_limit: DEFAULT_FINISHED_TASK_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_partition_count(mut self, partition_count: u32) -> Self {
        self.partition_count = partition_count;
        self
    }

    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_finished_task_limit(mut self, finished_task_limit: usize) -> Self {
        self.finished_task_limit = finished_task_limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            bail!("partition count must be at least 1");
        }
        if self.pool_capacity == 0 {
            bail!("pool capacity must be at least 1");
        }
        if self.finished_task_limit == 0 {
            bail!("finished task limit must be at least 1");
        }
        Ok(())
    }
}

/// Everything `queryd` needs to start.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub bind_addr: SocketAddr,
    pub engine: EngineConfig,
}

impl NodeOptions {
    /// Parses `--bind <addr:port> [--partitions <n>] [--workers <n>] [--timeout-secs <n>]
    /// [--finished-task-limit <n>]`.
    ///
    /// `args[0]` is the program name, as in `std::env::args()`.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut bind_addr: Option<SocketAddr> = None;
        let mut engine = EngineConfig::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    bind_addr = Some(flag_value(args, i)?.parse()?);
                    i += 2;
                }
                "--partitions" => {
                    engine.partition_count = flag_value(args, i)?.parse()?;
                    i += 2;
                }
                "--workers" => {
                    engine.pool_capacity = flag_value(args, i)?.parse()?;
                    i += 2;
                }
                "--timeout-secs" => {
                    engine.query_timeout = Duration::from_secs(flag_value(args, i)?.parse()?);
                    i += 2;
                }
                "--finished-task-limit" => {
                    engine.finished_task_limit = flag_value(args, i)?.parse()?;
                    i += 2;
                }
                other => {
                    tracing::warn!("Ignoring unknown argument {}", other);
                    i += 1;
                }
            }
        }

        let bind_addr = bind_addr.ok_or_else(|| anyhow::anyhow!("--bind is required"))?;
        engine.validate()?;

        Ok(Self { bind_addr, engine })
    }
}

fn flag_value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing value for {}", args[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.partition_count, 271);
        assert_eq!(config.query_timeout, Duration::from_secs(300));
        assert!(config.pool_capacity >= 1);
        assert_eq!(config.finished_task_limit, 10_000);
        assert!(config.with_finished_task_limit(0).validate().is_err());
    }

    #[test]
    fn test_parse_all_flags() {
        let options = NodeOptions::parse(&args(&[
            "queryd",
            "--bind",
            "127.0.0.1:7000",
            "--partitions",
            "16",
            "--workers",
            "3",
            "--timeout-secs",
            "9",
            "--finished-task-limit",
            "50",
        ]))
        .unwrap();

        assert_eq!(options.bind_addr.port(), 7000);
        assert_eq!(options.engine.partition_count, 16);
        assert_eq!(options.engine.pool_capacity, 3);
        assert_eq!(options.engine.query_timeout, Duration::from_secs(9));
        assert_eq!(options.engine.finished_task_limit, 50);
    }

    #[test]
    fn test_parse_requires_bind() {
        let result = NodeOptions::parse(&args(&["queryd", "--workers", "2"]));
        assert!(result.unwrap_err().to_string().contains("--bind"));
    }

    #[test]
    fn test_parse_rejects_zero_workers() {
        let result = NodeOptions::parse(&args(&[
            "queryd",
            "--bind",
            "127.0.0.1:1",
            "--workers",
            "0",
        ]));
        assert!(result.is_err());

        let result = NodeOptions::parse(&args(&[
            "queryd",
            "--bind",
            "127.0.0.1:1",
            "--finished-task-limit",
            "0",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_missing_value() {
        let result = NodeOptions::parse(&args(&["queryd", "--bind"]));
        assert!(result.unwrap_err().to_string().contains("missing value"));
    }
}
