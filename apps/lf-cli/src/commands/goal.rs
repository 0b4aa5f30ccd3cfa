// goal.rs — Goal subcommands: plan, target, pin, report, check.

use clap::Subcommand;
use rust_decimal::Decimal;
use uuid::Uuid;

use lf_engine::{Engine, EngineConfig, GoalReport};
use lf_store::{GoalPeriod, GoalSubject, MetricKey};

use super::{parse_time, print_json, Scope};

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a goal plan.
    Plan {
        /// Plan name.
        name: String,
        /// weekly, monthly, quarterly, yearly, or custom.
        #[arg(long, default_value = "monthly")]
        period: GoalPeriod,
        /// Window start (YYYY-MM-DD or RFC 3339).
        #[arg(long)]
        starts: String,
        /// Window end (YYYY-MM-DD or RFC 3339).
        #[arg(long)]
        ends: String,
    },
    /// Add a target to a plan. Give exactly one of --user, --team, --all.
    Target {
        /// Plan ID.
        plan: Uuid,
        #[arg(long, conflicts_with_all = ["team", "all"])]
        user: Option<Uuid>,
        #[arg(long, conflicts_with = "all")]
        team: Option<Uuid>,
        #[arg(long)]
        all: bool,
        /// leads_created, leads_closed, revenue, meetings, or calls.
        #[arg(long)]
        metric: MetricKey,
        /// Value that counts as 100%.
        #[arg(long)]
        value: Decimal,
        /// Bonus paid to each recipient on reaching the target.
        #[arg(long)]
        bonus: Option<Decimal>,
    },
    /// Pin a plan (unpins every other plan).
    Pin {
        /// Plan ID.
        plan: Uuid,
    },
    /// Show progress against every target in a plan.
    Report {
        /// Plan ID.
        plan: Uuid,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Re-evaluate the targets that concern a user.
    Check {
        /// User ID.
        user: Uuid,
    },
}

pub fn execute(cmd: &GoalCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let engine = Engine::open(config)?;

    match cmd {
        GoalCommands::Plan {
            name,
            period,
            starts,
            ends,
        } => {
            let plan =
                engine.create_plan(tenant, name, *period, parse_time(starts)?, parse_time(ends)?)?;
            println!("Plan created: {}", plan.plan_id);
            println!("  Window: {} .. {}", plan.starts_at, plan.ends_at);
            Ok(())
        }
        GoalCommands::Target {
            plan,
            user,
            team,
            all,
            metric,
            value,
            bonus,
        } => {
            let subject = match (user, team, all) {
                (Some(user), None, false) => GoalSubject::User(*user),
                (None, Some(team), false) => GoalSubject::Team(*team),
                (None, None, true) => GoalSubject::All,
                _ => anyhow::bail!("give exactly one of --user, --team, --all"),
            };
            let target = engine.add_target(tenant, *plan, subject, *metric, *value, *bonus)?;
            println!("Target added: {}", target.target_id);
            Ok(())
        }
        GoalCommands::Pin { plan } => {
            engine.pin_plan(tenant, *plan)?;
            println!("Plan pinned: {}", plan);
            Ok(())
        }
        GoalCommands::Report { plan, json } => {
            let report = engine.build_goal_report(tenant, *plan)?;
            if *json {
                print_json(&report)
            } else {
                print_report(&report);
                Ok(())
            }
        }
        GoalCommands::Check { user } => {
            let outcomes = engine.check_achievement(tenant, *user)?;
            if outcomes.is_empty() {
                println!("No current targets concern {}.", user);
            }
            for outcome in outcomes {
                let e = &outcome.evaluation;
                let note = if outcome.crossed {
                    " (achieved now)"
                } else if outcome.rearmed {
                    " (re-armed)"
                } else {
                    ""
                };
                println!(
                    "{} {}: {} / {} ({}%){}",
                    e.target_id, e.metric, e.actual_value, e.target_value, e.score, note
                );
            }
            Ok(())
        }
    }
}

fn print_report(report: &GoalReport) {
    println!("Plan: {} ({})", report.plan.name, report.plan.plan_id);
    println!(
        "Period progress: {}%",
        (report.period_progress * Decimal::ONE_HUNDRED).round_dp(1)
    );
    if report.rows.is_empty() {
        println!("No targets.");
        return;
    }
    println!();
    println!(
        "{:<14} {:<16} {:>10} {:>10} {:>7}  STATUS",
        "SUBJECT", "METRIC", "ACTUAL", "TARGET", "SCORE"
    );
    for row in &report.rows {
        let subject = match row.subject {
            GoalSubject::User(_) => "user",
            GoalSubject::Team(_) => "team",
            GoalSubject::All => "all",
        };
        println!(
            "{:<14} {:<16} {:>10} {:>10} {:>7}  {:?}",
            subject,
            row.metric.to_string(),
            row.actual_value,
            row.target_value,
            row.score.round_dp(1),
            row.status
        );
    }
}
