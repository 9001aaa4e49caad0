//! Replay command implementation.

use async_trait::async_trait;
use std::path::Path;
use xdcstore_engine::{
    ApplyOutcome, CatalogClient, ClientConfig, EngineError, EngineResult, HostChannel,
};
use xdcstore_protocol::HostRequest;

/// Prints outbound requests instead of sending them.
#[derive(Debug, Default)]
pub struct PrintingChannel;

#[async_trait]
impl HostChannel for PrintingChannel {
    async fn send(&self, request: &HostRequest) -> EngineResult<()> {
        println!("-> {}", request.to_json());
        Ok(())
    }
}

/// Counts of replay outcomes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Lines handled.
    pub messages: usize,
    /// Catalog changes committed.
    pub applied: usize,
    /// Flag-only changes.
    pub flags: usize,
    /// Catalog updates rejected.
    pub rejected: usize,
    /// Messages dropped.
    pub ignored: usize,
    /// Messages that failed.
    pub failed: usize,
}

impl ReplayStats {
    fn record(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied(_) => self.applied += 1,
            ApplyOutcome::FlagsUpdated(_) => self.flags += 1,
            ApplyOutcome::Rejected(_) => self.rejected += 1,
            ApplyOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// Runs the replay command.
pub async fn run(
    path: &Path,
    file: &Path,
    stop_on_error: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = tokio::fs::read_to_string(file).await?;
    let client = CatalogClient::open_dir(path, PrintingChannel, ClientConfig::new()).await?;

    let stats = replay(&client, &input, stop_on_error).await?;

    println!();
    println!("Replayed {} messages", stats.messages);
    println!("  Applied:  {}", stats.applied);
    println!("  Flags:    {}", stats.flags);
    println!("  Rejected: {}", stats.rejected);
    println!("  Ignored:  {}", stats.ignored);
    println!("  Failed:   {}", stats.failed);
    println!(
        "Catalog holds {} entries at serial {}",
        client.entries().len(),
        client.cursor().last_applied_serial
    );
    Ok(())
}

/// Feeds every non-blank line of `input` that is not a `#` comment.
pub async fn replay<S, K, C>(
    client: &CatalogClient<S, K, C>,
    input: &str,
    stop_on_error: bool,
) -> Result<ReplayStats, EngineError>
where
    S: xdcstore_storage::CatalogStore,
    K: xdcstore_storage::ScalarStore,
    C: HostChannel,
{
    let mut stats = ReplayStats::default();
    for (number, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        stats.messages += 1;
        match client.handle_text(line).await {
            Ok(outcome) => {
                println!("{:>5}: {:?}", number + 1, outcome);
                stats.record(&outcome);
            }
            Err(err) => {
                println!("{:>5}: ERROR: {}", number + 1, err);
                stats.failed += 1;
                if stop_on_error {
                    return Err(err);
                }
            }
        }
    }
    Ok(stats)
}
