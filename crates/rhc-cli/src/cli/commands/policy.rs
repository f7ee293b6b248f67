//! `rhc policy` – show the retry policy a method gets.

use anyhow::Result;
use rhc_core::config::RhcConfig;
use rhc_core::http::Method;
use rhc_core::retry::OUTER_MAX_RETRIES;

pub fn run_policy(cfg: &RhcConfig, method: &str) -> Result<()> {
    let method: Method = method.parse()?;
    let policies = cfg.retry_or_default().policies()?;
    let policy = policies.for_method(method);
    let schedule: Vec<String> = policy
        .schedule
        .delays()
        .iter()
        .map(|d| format!("{:?}", d))
        .collect();

    println!("method:              {}", method);
    println!("policy:              {:?}", policies.kind_for(method));
    println!("backoff schedule:    [{}]", schedule.join(", "));
    println!("transient retries:   {}", policy.max_transient_retries());
    println!("429 retries:         {}", OUTER_MAX_RETRIES);
    println!("per-attempt timeout: {}", fmt_opt(policy.retry_timeout));
    println!("call deadline:       {}", fmt_opt(policy.call_timeout));
    Ok(())
}

fn fmt_opt(d: Option<std::time::Duration>) -> String {
    d.map(|d| format!("{:?}", d))
        .unwrap_or_else(|| "none".to_string())
}
