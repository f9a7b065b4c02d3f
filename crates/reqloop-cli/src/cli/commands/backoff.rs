//! `reqloop backoff`: print the delay before each retry.

use anyhow::Result;
use reqloop_core::config::ReqloopConfig;
use reqloop_core::retry::{BackoffPolicy, FailureKind};
use reqloop_core::transport::TransportErrorKind;

pub async fn run_backoff(cfg: &ReqloopConfig, throttled: bool, attempts: u32) -> Result<()> {
    let policy = cfg.backoff.clone().unwrap_or_default().to_policy();
    let kind = if throttled {
        FailureKind::Throttling
    } else {
        FailureKind::Transport(TransportErrorKind::Timeout)
    };
    println!("  {:>7}  {:>9}", "Attempt", "Delay(ms)");
    println!("  {}  {}", "-------", "---------");
    for (attempt, delay) in schedule(&policy, kind, attempts) {
        println!("  {:>7}  {:>9}", attempt, delay);
    }
    Ok(())
}

/// Delay in milliseconds before the retry that follows each failed attempt.
fn schedule(policy: &dyn BackoffPolicy, kind: FailureKind, attempts: u32) -> Vec<(u32, u128)> {
    (1..=attempts)
        .map(|attempt| (attempt, policy.delay(attempt, kind).as_millis()))
        .collect()
}
