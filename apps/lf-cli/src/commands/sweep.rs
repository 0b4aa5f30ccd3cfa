// sweep.rs — One-shot deadline sweep and the recurring sweep daemon.
//
// The daemon runs sweeps on a tokio interval until Ctrl-C. A failed pass is
// not retried early; the next tick sweeps everything again. The store
// re-reads tenant documents on every access, so leads and tenants written by
// other `leadflow` processes after startup are swept too.

use std::time::Duration;

use lf_engine::{Engine, EngineConfig, SweepReport};

pub fn execute_once(config: &EngineConfig) -> anyhow::Result<()> {
    let engine = Engine::open(config)?;
    let reports = engine.sweep_all();
    if reports.is_empty() {
        println!("No tenants to sweep.");
    }
    for report in &reports {
        print_report(report);
    }
    Ok(())
}

pub fn execute_daemon(config: &EngineConfig, interval_secs: Option<u64>) -> anyhow::Result<()> {
    let secs = interval_secs.unwrap_or(config.sweep_interval_secs);
    if secs == 0 {
        anyhow::bail!("--interval-secs must be positive");
    }
    let engine = Engine::open(config)?;

    tracing::info!(interval_secs = secs, data_dir = %config.data_dir.display(), "sweep daemon starting");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Sweeps take the store lock; keep them off the runtime's workers.
                    let reports = tokio::task::block_in_place(|| engine.sweep_all());
                    for report in reports.iter().filter(|r| !r.is_quiet()) {
                        tracing::info!(
                            tenant_id = %report.tenant_id,
                            opened = report.deadlines_opened,
                            overdue = report.deadlines_overdue,
                            failures = report.failures_created,
                            deactivated = report.users_deactivated,
                            errors = report.errors,
                            "sweep pass"
                        );
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    tracing::info!("sweep daemon shutting down");
                    break;
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn print_report(report: &SweepReport) {
    println!("Tenant {}", report.tenant_id);
    println!("  Deadlines opened:  {}", report.deadlines_opened);
    println!("  Deadlines overdue: {}", report.deadlines_overdue);
    println!("  Failures created:  {}", report.failures_created);
    println!("  Users deactivated: {}", report.users_deactivated);
    if report.errors > 0 {
        println!("  Leads with errors: {}", report.errors);
    }
}
