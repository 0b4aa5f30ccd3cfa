// lifecycle_flow.rs — End-to-end behavior of the engine facade.
//
// Every test drives the Engine the way a request handler or scheduler
// would, with a FixedClock for deadlines and in-memory notifier and ledger
// doubles to observe side effects.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use lf_engine::{
    Answers, CatalogRegistry, Clock, Engine, EngineConfig, EngineError, ErrorKind, EventDispatcher,
    FixedClock, MemoryLedger, MemoryNotifier,
};
use lf_events::{LedgerEntryType, NotificationLevel, NotifyTarget};
use lf_lifecycle::LifecycleError;
use lf_store::{
    CallLog, DeadlineStatus, ExtensionStatus, FailureStatus, FailureType, GoalPeriod, GoalSubject,
    LeadStatus, MetricKey, Role, Store, StoreError, UserStatus,
};

struct Harness {
    engine: Engine,
    clock: Arc<FixedClock>,
    ledger: Arc<MemoryLedger>,
    notifier: Arc<MemoryNotifier>,
    tenant: Uuid,
    owner: Uuid,
    leader: Uuid,
    seller: Uuid,
    team: Uuid,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn harness() -> Harness {
    let store = Arc::new(Store::in_memory());
    let ledger = Arc::new(MemoryLedger::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let mut dispatcher = EventDispatcher::new(ledger.clone());
    dispatcher.add_notifier(notifier.clone());
    let clock = Arc::new(FixedClock::new(start()));
    let engine = Engine::new(
        store,
        Arc::new(CatalogRegistry::default()),
        dispatcher,
        clock.clone(),
    );

    let tenant = Uuid::new_v4();
    let owner = engine.add_user(tenant, "Olga", vec![Role::Owner], None).unwrap();
    let leader = engine
        .add_user(tenant, "Lars", vec![Role::TeamLeader, Role::Sales], None)
        .unwrap();
    let team = engine.add_team(tenant, "North", Some(leader.user_id)).unwrap();
    let seller = engine
        .add_user(tenant, "Sam", vec![Role::Sales], Some(team.team_id))
        .unwrap();

    Harness {
        engine,
        clock,
        ledger,
        notifier,
        tenant,
        owner: owner.user_id,
        leader: leader.user_id,
        seller: seller.user_id,
        team: team.team_id,
    }
}

fn answers(pairs: &[(&str, serde_json::Value)]) -> Option<Answers> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

fn stage_answers(stage: &str) -> Option<Answers> {
    match stage {
        "call" => answers(&[("outcome", json!("interested"))]),
        "meeting" => answers(&[("meeting_date", json!("2026-03-04"))]),
        "site_visit" => answers(&[("visit_date", json!("2026-03-06"))]),
        "closing" => answers(&[("amount", json!(12000)), ("contract_date", json!("2026-03-08"))]),
        _ => None,
    }
}

impl Harness {
    fn lead_for_seller(&self) -> Uuid {
        self.engine
            .create_lead(self.tenant, "Acme Corp", Some(self.seller), self.seller)
            .unwrap()
            .lead_id
    }

    fn advance_to(&self, lead_id: Uuid, stages: &[&str]) {
        for stage in stages {
            self.engine
                .transition_lead(self.tenant, lead_id, stage, self.seller, stage_answers(stage))
                .unwrap();
        }
    }

    fn active_deadlines(&self, lead_id: Uuid) -> usize {
        self.engine.store().read(self.tenant, |r| {
            r.deadlines
                .iter()
                .filter(|d| d.lead_id == lead_id && d.status == DeadlineStatus::Active)
                .count()
        })
    }

    fn lead_status(&self, lead_id: Uuid) -> LeadStatus {
        self.engine
            .lead_snapshot(self.tenant, lead_id)
            .unwrap()
            .lead
            .status
    }

    /// Insert call rows without the follow-up achievement check.
    fn insert_calls(&self, n: usize) {
        let now = self.clock.now();
        self.engine
            .store()
            .transact(self.tenant, |r| {
                for _ in 0..n {
                    r.calls.push(CallLog {
                        call_id: Uuid::new_v4(),
                        lead_id: None,
                        caller_id: self.seller,
                        team_id: Some(self.team),
                        duration_secs: 60,
                        created_at: now,
                    });
                }
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    fn calls_target(&self, target: i64, bonus: i64) -> Uuid {
        let plan = self
            .engine
            .create_plan(
                self.tenant,
                "March",
                GoalPeriod::Monthly,
                start() - Duration::days(1),
                start() + Duration::days(29),
            )
            .unwrap();
        self.engine
            .add_target(
                self.tenant,
                plan.plan_id,
                GoalSubject::User(self.seller),
                MetricKey::Calls,
                Decimal::from(target),
                Some(Decimal::from(bonus)),
            )
            .unwrap()
            .target_id
    }

    fn bonuses(&self) -> Vec<Decimal> {
        self.ledger
            .entries()
            .into_iter()
            .filter(|e| e.entry_type == LedgerEntryType::GoalBonus)
            .map(|e| e.amount)
            .collect()
    }
}

// ── stage ordering ──────────────────────────────────────────────────────

#[test]
fn stages_must_be_entered_in_order() {
    let h = harness();
    let lead = h.lead_for_seller();

    let err = h
        .engine
        .transition_lead(h.tenant, lead, "meeting", h.seller, stage_answers("meeting"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    h.advance_to(lead, &["call"]);
    for skip in ["site_visit", "closing"] {
        let err = h
            .engine
            .transition_lead(h.tenant, lead, skip, h.seller, stage_answers(skip))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition, "call -> {}", skip);
        assert!(err.to_string().contains("invalid transition between stages"));
    }
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("call".to_string()));

    h.advance_to(lead, &["meeting", "site_visit", "closing"]);
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("closing".to_string()));
}

#[test]
fn missing_required_answer_leaves_stage_unchanged() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call", "meeting", "site_visit"]);

    let err = h
        .engine
        .transition_lead(
            h.tenant,
            lead,
            "closing",
            h.seller,
            answers(&[("amount", json!(5000))]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("contract_date"));
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("site_visit".to_string()));

    let err = h
        .engine
        .transition_lead(h.tenant, lead, "closing", h.seller, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let history = h.engine.lead_snapshot(h.tenant, lead).unwrap().history;
    assert_eq!(history.len(), 3);
}

// ── deadlines ───────────────────────────────────────────────────────────

#[test]
fn one_active_deadline_with_a_single_rolling_budget() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);
    let first_due = h
        .engine
        .lead_snapshot(h.tenant, lead)
        .unwrap()
        .active_deadline
        .unwrap()
        .due_at;
    assert_eq!(first_due, start() + Duration::days(7));

    h.clock.advance(Duration::days(2));
    h.advance_to(lead, &["meeting"]);
    h.engine.run_deadline_sweep(h.tenant);
    h.advance_to(lead, &["site_visit"]);
    h.engine.run_deadline_sweep(h.tenant);

    assert_eq!(h.active_deadlines(lead), 1);
    let snapshot = h.engine.lead_snapshot(h.tenant, lead).unwrap();
    assert_eq!(snapshot.active_deadline.unwrap().due_at, first_due);

    h.advance_to(lead, &["closing"]);
    assert_eq!(h.active_deadlines(lead), 0);
}

#[test]
fn overdue_sweep_fails_lead_and_deactivates_sales_owner() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);

    h.clock.advance(Duration::days(8));
    let report = h.engine.run_deadline_sweep(h.tenant);
    assert_eq!(report.deadlines_overdue, 1);
    assert_eq!(report.failures_created, 1);
    assert_eq!(report.users_deactivated, 1);

    let snapshot = h.engine.lead_snapshot(h.tenant, lead).unwrap();
    assert_eq!(snapshot.lead.status, LeadStatus::Failed);
    assert_eq!(snapshot.lead.assigned_user_id, None);
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failures[0].failure_type, FailureType::Overdue);
    assert_eq!(snapshot.failures[0].status, FailureStatus::Pending);
    assert!(snapshot.failures[0].reason.is_none());

    let seller_status = h
        .engine
        .store()
        .read(h.tenant, |r| r.users.get(&h.seller).map(|u| u.status));
    assert_eq!(seller_status, Some(UserStatus::Inactive));

    let broadcasts = h.notifier.sent_to(&NotifyTarget::Role(Role::Owner));
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].level, NotificationLevel::Danger);

    // A second pass finds nothing new.
    let again = h.engine.run_deadline_sweep(h.tenant);
    assert!(again.is_quiet());
    assert_eq!(h.engine.lead_snapshot(h.tenant, lead).unwrap().failures.len(), 1);
}

#[test]
fn failed_lead_is_frozen_until_failure_resolved() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);
    h.clock.advance(Duration::days(8));
    h.engine.run_deadline_sweep(h.tenant);

    let err = h
        .engine
        .transition_lead(h.tenant, lead, "meeting", h.owner, stage_answers("meeting"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let failure_id = h.engine.lead_snapshot(h.tenant, lead).unwrap().failures[0].failure_id;
    assert_eq!(
        h.engine
            .resolve_failure(h.tenant, failure_id, h.owner, "  ")
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    let resolved = h
        .engine
        .resolve_failure(h.tenant, failure_id, h.owner, "client went silent")
        .unwrap();
    assert_eq!(resolved.status, FailureStatus::Resolved);
    assert_eq!(resolved.resolved_by, Some(h.owner));
}

// ── undo ────────────────────────────────────────────────────────────────

#[test]
fn undo_is_single_level() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call", "meeting"]);

    let undone = h.engine.undo_last_transition(h.tenant, lead, h.seller).unwrap();
    assert_eq!(undone.to_state, "call");
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("call".to_string()));
    assert_eq!(h.active_deadlines(lead), 1);

    let err = h
        .engine
        .undo_last_transition(h.tenant, lead, h.seller)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Lifecycle(LifecycleError::AlreadyUndone { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("call".to_string()));
}

#[test]
fn nothing_to_undo_on_initial_entry() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);
    let err = h
        .engine
        .undo_last_transition(h.tenant, lead, h.seller)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Lifecycle(LifecycleError::NothingToUndo(_))
    ));
}

// ── extensions ──────────────────────────────────────────────────────────

#[test]
fn extension_hours_are_capped_per_lead_and_stage() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);

    let first = h
        .engine
        .request_extension(h.tenant, lead, "call", h.seller, 48, "client travelling")
        .unwrap();
    assert_eq!(first.status, ExtensionStatus::Pending);
    assert_eq!(h.notifier.sent_to(&NotifyTarget::User(h.leader)).len(), 1);

    let err = h
        .engine
        .request_extension(h.tenant, lead, "call", h.seller, 30, "more time")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert!(err.to_string().contains("72h cap"));
    let count = h.engine.lead_snapshot(h.tenant, lead).unwrap().extensions.len();
    assert_eq!(count, 1);

    let approved = h
        .engine
        .approve_extension(h.tenant, first.extension_id, h.leader)
        .unwrap();
    assert_eq!(approved.status, ExtensionStatus::Approved);
    let due = h
        .engine
        .lead_snapshot(h.tenant, lead)
        .unwrap()
        .active_deadline
        .unwrap()
        .due_at;
    assert_eq!(due, start() + Duration::days(7) + Duration::hours(48));

    let decided = h.notifier.sent_to(&NotifyTarget::User(h.seller));
    assert!(decided.iter().any(|n| n.title == "Extension approved"));

    h.engine
        .request_extension(h.tenant, lead, "call", h.seller, 24, "final push")
        .unwrap();
    assert!(h
        .engine
        .request_extension(h.tenant, lead, "call", h.seller, 1, "one more hour")
        .is_err());
}

#[test]
fn extensions_are_only_granted_for_the_current_stage() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);

    for stage in ["meeting", "site_visit", "closing"] {
        let err = h
            .engine
            .request_extension(h.tenant, lead, stage, h.seller, 72, "spread the budget")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", stage);
    }
    let ext = h
        .engine
        .request_extension(h.tenant, lead, "call", h.seller, 72, "client travelling")
        .unwrap();
    h.engine
        .approve_extension(h.tenant, ext.extension_id, h.leader)
        .unwrap();

    let snapshot = h.engine.lead_snapshot(h.tenant, lead).unwrap();
    assert_eq!(snapshot.extensions.len(), 1);
    assert_eq!(
        snapshot.active_deadline.unwrap().due_at,
        start() + Duration::days(7) + Duration::hours(72)
    );
}

#[test]
fn decided_extension_cannot_be_decided_again() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);
    let ext = h
        .engine
        .request_extension(h.tenant, lead, "call", h.seller, 12, "holiday")
        .unwrap();

    let rejected = h
        .engine
        .reject_extension(h.tenant, ext.extension_id, h.leader, "no")
        .unwrap();
    assert_eq!(rejected.status, ExtensionStatus::Rejected);
    let due = h
        .engine
        .lead_snapshot(h.tenant, lead)
        .unwrap()
        .active_deadline
        .unwrap()
        .due_at;
    assert_eq!(due, start() + Duration::days(7));

    let err = h
        .engine
        .approve_extension(h.tenant, ext.extension_id, h.leader)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
}

// ── goals ───────────────────────────────────────────────────────────────

#[test]
fn bonus_is_paid_once_at_the_crossing() {
    let h = harness();
    h.calls_target(10, 500);

    for _ in 0..9 {
        h.engine
            .record_call(h.tenant, h.seller, None, 120)
            .unwrap();
    }
    assert!(h.bonuses().is_empty());

    h.engine.record_call(h.tenant, h.seller, None, 120).unwrap();
    assert_eq!(h.bonuses(), vec![Decimal::from(500)]);
    let achieved = h.notifier.sent_to(&NotifyTarget::User(h.seller));
    assert!(achieved.iter().any(|n| n.title == "Goal achieved"));

    h.engine.record_call(h.tenant, h.seller, None, 120).unwrap();
    let outcomes = h.engine.check_achievement(h.tenant, h.seller).unwrap();
    assert!(outcomes.iter().all(|o| !o.crossed));
    assert_eq!(h.bonuses().len(), 1);
}

#[test]
fn target_rearms_after_dropping_below_and_pays_again() {
    let h = harness();
    let target = h.calls_target(3, 100);
    h.insert_calls(3);

    let first = h.engine.check_achievement(h.tenant, h.seller).unwrap();
    assert!(first.iter().any(|o| o.crossed));
    assert_eq!(h.bonuses().len(), 1);

    // A call row is withdrawn, so the ratio falls back under 1.
    h.engine
        .store()
        .transact(h.tenant, |r| {
            r.calls.pop();
            Ok::<_, StoreError>(())
        })
        .unwrap();
    let dropped = h.engine.check_achievement(h.tenant, h.seller).unwrap();
    assert!(dropped.iter().any(|o| o.rearmed));
    let achieved_at = h
        .engine
        .store()
        .read(h.tenant, |r| r.targets.get(&target).and_then(|t| t.achieved_at));
    assert!(achieved_at.is_none());

    h.engine.record_call(h.tenant, h.seller, None, 30).unwrap();
    assert_eq!(h.bonuses(), vec![Decimal::from(100), Decimal::from(100)]);
}

#[test]
fn goal_report_scores_rows_against_period_progress() {
    let h = harness();
    let plan = h
        .engine
        .create_plan(
            h.tenant,
            "Sprint",
            GoalPeriod::Custom,
            start(),
            start() + Duration::days(10),
        )
        .unwrap();
    h.engine
        .add_target(
            h.tenant,
            plan.plan_id,
            GoalSubject::Team(h.team),
            MetricKey::Meetings,
            Decimal::from(4),
            None,
        )
        .unwrap();
    h.engine
        .add_target(
            h.tenant,
            plan.plan_id,
            GoalSubject::All,
            MetricKey::LeadsCreated,
            Decimal::from(10),
            None,
        )
        .unwrap();

    h.clock.advance(Duration::days(5));
    h.engine
        .record_meeting(h.tenant, h.seller, None, "Kickoff", h.clock.now())
        .unwrap();
    h.engine
        .record_meeting(h.tenant, h.leader, None, "Review", h.clock.now())
        .unwrap();
    h.lead_for_seller();

    let report = h.engine.build_goal_report(h.tenant, plan.plan_id).unwrap();
    assert_eq!(report.period_progress, Decimal::new(5, 1));
    assert_eq!(report.rows.len(), 2);

    let meetings = report
        .rows
        .iter()
        .find(|r| r.metric == MetricKey::Meetings)
        .unwrap();
    // Only the seller's meeting counts: the leader has no team.
    assert_eq!(meetings.actual_value, Decimal::from(1));
    assert_eq!(meetings.status, lf_engine::TargetStatus::Danger);

    let leads = report
        .rows
        .iter()
        .find(|r| r.metric == MetricKey::LeadsCreated)
        .unwrap();
    assert_eq!(leads.actual_value, Decimal::from(1));
}

#[test]
fn approved_closure_counts_toward_revenue() {
    let h = harness();
    let plan = h
        .engine
        .create_plan(
            h.tenant,
            "Q1",
            GoalPeriod::Quarterly,
            start() - Duration::days(60),
            start() + Duration::days(30),
        )
        .unwrap();
    h.engine
        .add_target(
            h.tenant,
            plan.plan_id,
            GoalSubject::User(h.seller),
            MetricKey::Revenue,
            Decimal::from(10000),
            Some(Decimal::from(250)),
        )
        .unwrap();

    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call", "meeting", "site_visit", "closing"]);
    let closings = h.notifier.sent_to(&NotifyTarget::Role(Role::Owner));
    assert!(closings.iter().any(|n| n.title == "Deal closed: Acme Corp"));
    assert!(h.bonuses().is_empty());

    let closure_id = h.engine.store().read(h.tenant, |r| {
        r.closures
            .iter()
            .find(|c| c.lead_id == lead)
            .map(|c| c.closure_id)
    });
    let closure = h
        .engine
        .approve_closure(h.tenant, closure_id.unwrap(), h.owner)
        .unwrap();
    assert_eq!(closure.amount, Decimal::from(12000));
    assert_eq!(h.bonuses(), vec![Decimal::from(250)]);

    let err = h
        .engine
        .approve_closure(h.tenant, closure.closure_id, h.owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
}

#[test]
fn surrender_voids_the_deadline() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call"]);

    assert_eq!(
        h.engine
            .surrender_lead(h.tenant, lead, h.seller, "")
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    let failure = h
        .engine
        .surrender_lead(h.tenant, lead, h.seller, "budget cut")
        .unwrap();
    assert_eq!(failure.failure_type, FailureType::Surrender);
    assert_eq!(failure.reason.as_deref(), Some("budget cut"));

    let snapshot = h.engine.lead_snapshot(h.tenant, lead).unwrap();
    assert_eq!(snapshot.lead.status, LeadStatus::Failed);
    assert!(snapshot.active_deadline.is_none());
    assert!(!h.notifier.sent_to(&NotifyTarget::Team(h.team)).is_empty());
}

// ── concurrency ─────────────────────────────────────────────────────────

#[test]
fn racing_achievement_checks_pay_once() {
    let h = harness();
    h.calls_target(3, 100);
    h.insert_calls(3);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                h.engine.check_achievement(h.tenant, h.seller).unwrap();
            });
        }
    });

    assert_eq!(h.bonuses(), vec![Decimal::from(100)]);
}

#[test]
fn racing_initial_transitions_open_one_deadline() {
    let h = harness();
    let lead = h.lead_for_seller();

    let successes = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    h.engine
                        .transition_lead(h.tenant, lead, "call", h.seller, stage_answers("call"))
                        .is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| matches!(joined, Ok(true)))
            .count()
    });

    assert_eq!(successes, 1);
    assert_eq!(h.active_deadlines(lead), 1);
}

#[test]
fn closing_amount_must_be_a_real_number() {
    let h = harness();
    let lead = h.lead_for_seller();
    h.advance_to(lead, &["call", "meeting", "site_visit"]);

    for amount in ["NaN", "inf", "-12000"] {
        let err = h
            .engine
            .transition_lead(
                h.tenant,
                lead,
                "closing",
                h.seller,
                answers(&[("amount", json!(amount)), ("contract_date", json!("2026-03-08"))]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", amount);
    }
    assert_eq!(h.lead_status(lead), LeadStatus::InStage("site_visit".to_string()));
    assert!(h.engine.store().read(h.tenant, |r| r.closures.is_empty()));

    h.engine
        .transition_lead(
            h.tenant,
            lead,
            "closing",
            h.seller,
            answers(&[("amount", json!("1.2e4")), ("contract_date", json!("2026-03-08"))]),
        )
        .unwrap();
    let amount = h.engine.store().read(h.tenant, |r| r.closures[0].amount);
    assert_eq!(amount, Decimal::from(12000));
}

// ── file-backed engine ──────────────────────────────────────────────────

#[test]
fn file_backed_engine_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::for_project(dir.path());
    let tenant = Uuid::new_v4();

    let (lead_id, seller_id) = {
        let engine = Engine::open(&config).unwrap();
        let seller = engine
            .add_user(tenant, "Sam", vec![Role::Sales], None)
            .unwrap();
        let lead = engine
            .create_lead(tenant, "Globex", Some(seller.user_id), seller.user_id)
            .unwrap();
        engine
            .transition_lead(tenant, lead.lead_id, "call", seller.user_id, stage_answers("call"))
            .unwrap();
        (lead.lead_id, seller.user_id)
    };

    let engine = Engine::open(&config).unwrap();
    let snapshot = engine.lead_snapshot(tenant, lead_id).unwrap();
    assert_eq!(snapshot.lead.status, LeadStatus::InStage("call".to_string()));
    assert_eq!(snapshot.lead.assigned_user_id, Some(seller_id));
    assert!(snapshot.active_deadline.is_some());
    assert_eq!(engine.store().tenant_ids(), vec![tenant]);
}

#[test]
fn long_running_engine_sees_and_keeps_other_processes_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::for_project(dir.path());
    let tenant = Uuid::new_v4();

    // Opened before anything exists, the way the sweep daemon starts.
    let daemon = Engine::open(&config).unwrap();
    assert!(daemon.store().tenant_ids().is_empty());

    let cli = Engine::open(&config).unwrap();
    let seller = cli.add_user(tenant, "Sam", vec![Role::Sales], None).unwrap();
    let plan = cli
        .create_plan(
            tenant,
            "Always",
            GoalPeriod::Custom,
            Utc::now() - Duration::days(1),
            Utc::now() + Duration::days(30),
        )
        .unwrap();
    cli.add_target(
        tenant,
        plan.plan_id,
        GoalSubject::User(seller.user_id),
        MetricKey::Calls,
        Decimal::from(100),
        None,
    )
    .unwrap();
    let lead = cli
        .create_lead(tenant, "Globex", Some(seller.user_id), seller.user_id)
        .unwrap();
    cli.transition_lead(tenant, lead.lead_id, "call", seller.user_id, stage_answers("call"))
        .unwrap();

    let reports = daemon.sweep_all();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tenant_id, tenant);

    let reopened = Engine::open(&config).unwrap();
    let snapshot = reopened.lead_snapshot(tenant, lead.lead_id).unwrap();
    assert_eq!(snapshot.lead.status, LeadStatus::InStage("call".to_string()));
    assert!(snapshot.active_deadline.is_some());
    assert_eq!(snapshot.history.len(), 1);
}

#[test]
fn unknown_lead_is_not_found() {
    let h = harness();
    let err = h
        .engine
        .transition_lead(h.tenant, Uuid::new_v4(), "call", h.seller, stage_answers("call"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.engine.lead_snapshot(h.tenant, Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
