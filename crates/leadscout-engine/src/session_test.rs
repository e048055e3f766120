use super::*;
use crate::fake::{post, prospect, quota, FakeBackend};
use crate::queue::DrawerState;
use crate::triage::Confirmation;
use leadscout_core::PostStatus;

fn config() -> SessionConfig {
    SessionConfig {
        brand_id: Uuid::new_v4(),
        brand_name: "Acme".to_string(),
        brand_offerings: vec!["invoice automation".to_string()],
        limits: Limits::default(),
        operation_timeout: Duration::from_millis(500),
        failure_policy: FailurePolicy::MarkUnconfirmed,
    }
}

fn invoices_prospect() -> Prospect {
    let mut p = prospect(
        "Freelancers get paid late",
        &["invoice reminder", "late payment", "polite nudge", "dunning"],
    );
    p.keywords_to_engaged_count
        .insert("invoice reminder".to_string(), 5);
    p.keywords_to_engaged_count.insert("polite nudge".to_string(), 3);
    p.sourced_reddit_posts = vec![
        post("t3_a", "alice", 1_700_000_000),
        post("t3_b", "bob", 1_700_000_100),
    ];
    p
}

async fn session_with(prospects: Vec<Prospect>) -> Session<FakeBackend> {
    let backend = FakeBackend::new();
    backend.state().prospects = prospects;
    let mut session = Session::new(backend, config());
    session.refresh().await.unwrap();
    session
}

#[test]
fn config_from_app_config_carries_limits_and_policy() {
    let app = AppConfig {
        api_base_url: "https://api.leadscout.test".to_string(),
        api_token: None,
        env: leadscout_core::Environment::Test,
        request_timeout_secs: 12,
        user_agent: "leadscout-test".to_string(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
        triage_failure_policy: FailurePolicy::Rollback,
        limits: Limits::default(),
    };
    let brand_id = Uuid::new_v4();
    let cfg = SessionConfig::from_app_config(&app, brand_id, "Acme", vec![]);
    assert_eq!(cfg.brand_id, brand_id);
    assert_eq!(cfg.operation_timeout, Duration::from_secs(12));
    assert_eq!(cfg.failure_policy, FailurePolicy::Rollback);
    assert_eq!(cfg.limits.max_keywords_per_prospect, 30);

    let retrying = AppConfig {
        max_retries: 2,
        retry_backoff_base_ms: 400,
        ..app
    };
    let cfg = SessionConfig::from_app_config(&retrying, brand_id, "Acme", vec![]);
    // Three 12 s attempts plus back-off sleeps of at most 500 ms and 1 s.
    assert_eq!(cfg.operation_timeout, Duration::from_millis(37_500));
}

#[tokio::test]
async fn refresh_builds_boards() {
    let p = invoices_prospect();
    let id = p.id;
    let session = session_with(vec![p]).await;
    assert_eq!(session.prospects().count(), 1);
    let counts = session.post_counts(id).unwrap();
    assert_eq!(counts.pending, 2);
    assert_eq!(session.pending_stack(id)[0].thing_id, "t3_b");
}

#[tokio::test]
async fn open_keyword_job_preselects_ranked_keywords() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;

    let job = session.open_keyword_job(id).unwrap();
    assert_eq!(
        job.keywords,
        vec!["invoice reminder", "polite nudge", "late payment"]
    );
    assert_eq!(job.brand_name, "Acme");
    assert_eq!(session.queue().drawer(), DrawerState::Open);

    let err = session.open_keyword_job(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn add_keyword_creates_job_lazily() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    assert!(session.queue().is_empty());

    assert!(session.add_keyword(id, "  Chase Clients ").unwrap());
    assert!(!session.add_keyword(id, "chase clients").unwrap());
    let job = session.queue().get_job(id).unwrap();
    assert_eq!(job.keywords.last().map(String::as_str), Some("chase clients"));
    assert_eq!(job.new_unique_keywords(), vec!["chase clients"]);

    let err = session.add_keyword(id, "   ").unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::EmptyKeyword)));
}

#[tokio::test]
async fn create_prospect_enforces_brand_limit_locally() {
    let mut session = session_with(vec![
        prospect("one", &[]),
        prospect("two", &[]),
        prospect("three", &[]),
    ])
    .await;

    let err = session
        .create_prospect("four", &["saas"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::ProspectLimit { existing: 3, max: 3 })
    ));
    assert_eq!(session.backend().state().prospects.len(), 3);
}

#[tokio::test]
async fn create_prospect_normalizes_keywords_and_caches() {
    let mut session = session_with(vec![]).await;
    let created = session
        .create_prospect("  Late invoices ", &["Invoice Reminder", "invoice reminder", "Dunning"])
        .await
        .unwrap();
    assert_eq!(created.problem_to_solve, "Late invoices");
    assert_eq!(created.keywords, vec!["invoice reminder", "dunning"]);
    let id = created.id;
    assert!(session.board(id).is_some());
    assert_eq!(session.prospects().count(), 1);
}

#[tokio::test]
async fn delete_keywords_updates_cache_and_queued_job() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.open_keyword_job(id).unwrap();
    session.queue_mut().close();

    let removed = session
        .delete_keywords(id, &["Invoice Reminder", "unknown"])
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let cached = session.prospect(id).unwrap();
    assert!(!cached.keywords.contains(&"invoice reminder".to_string()));
    assert!(!cached.keywords_to_engaged_count.contains_key("invoice reminder"));

    let job = session.queue().get_job(id).unwrap();
    assert!(!job.keywords.contains(&"invoice reminder".to_string()));
    assert_eq!(job.existing_prospect_keywords.len(), 3);
    assert_eq!(session.queue().drawer(), DrawerState::Closed);

    let state = session.backend().state();
    assert_eq!(state.deleted_keywords.len(), 1);
    assert_eq!(
        state.deleted_keywords[0].keywords,
        vec!["invoice reminder", "unknown"]
    );
}

#[tokio::test]
async fn delete_keywords_matches_mixed_case_cache() {
    let mut p = prospect("Pricing pages", &["SaaS", "Pricing"]);
    p.keywords_to_engaged_count.insert("SaaS".to_string(), 2);
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.open_keyword_job(id).unwrap();
    assert!(!session.add_keyword(id, "saas").unwrap());
    assert_eq!(session.queue().get_job(id).unwrap().total_keywords(), 2);

    let removed = session.delete_keywords(id, &["SaaS"]).await.unwrap();
    assert_eq!(removed, 1);

    let cached = session.prospect(id).unwrap();
    assert_eq!(cached.keywords, vec!["Pricing"]);
    assert!(cached.keywords_to_engaged_count.is_empty());

    let job = session.queue().get_job(id).unwrap();
    assert_eq!(job.keywords, vec!["pricing"]);
    assert_eq!(job.existing_prospect_keywords, vec!["pricing"]);
    assert_eq!(
        session.backend().state().deleted_keywords[0].keywords,
        vec!["saas"]
    );
}

#[tokio::test]
async fn delete_prospect_cascades_locally() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.open_keyword_job(id).unwrap();

    session.delete_prospect(id).await.unwrap();
    assert!(session.prospect(id).is_none());
    assert!(session.board(id).is_none());
    assert!(session.queue().get_job(id).is_none());
    assert_eq!(session.backend().state().deleted_prospects, vec![id]);

    // Already gone on the backend: still succeeds.
    session.delete_prospect(id).await.unwrap();
}

#[tokio::test]
async fn submit_queue_sends_batch_and_refreshes() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.open_keyword_job(id).unwrap();

    let outcome = session.submit_queue().await.unwrap();
    assert!(matches!(
        outcome,
        BatchSubmissionOutcome::Submitted {
            jobs: 1,
            accepted: 1,
            estimated_posts: 300
        }
    ));
    assert!(session.queue().is_empty());
    assert_eq!(session.queue().drawer(), DrawerState::Closed);
    assert_eq!(session.quota_gate().remaining_jobs(), Some(90));
    assert_eq!(session.backend().state().submitted.len(), 1);
}

#[tokio::test]
async fn upgrade_retries_submission_exactly_once() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.backend().state().quota = quota(100, 100);
    session.open_keyword_job(id).unwrap();

    let outcome = session
        .submit_queue_with_upgrade(|signal| {
            assert_eq!(signal.used_jobs, 100);
            session_upgrade()
        })
        .await;
    // The fake still reports an exhausted quota after the "upgrade".
    assert!(matches!(outcome, Err(EngineError::Quota { .. })));
    assert_eq!(session.backend().state().quota_checks, 2);
    assert_eq!(session.queue().len(), 1);
}

async fn session_upgrade() -> bool {
    true
}

#[tokio::test]
async fn declined_upgrade_does_not_retry() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.backend().state().quota = quota(100, 100);
    session.open_keyword_job(id).unwrap();

    let err = session
        .submit_queue_with_upgrade(|_| async { false })
        .await
        .unwrap_err();
    assert!(err.is_access_denied());
    assert_eq!(session.backend().state().quota_checks, 1);
}

#[tokio::test]
async fn triage_and_retry_across_boards() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.backend().state().post_action_failures = 1;

    session
        .triage(id, "t3_a", TriageAction::Queue)
        .await
        .unwrap_err();
    let board = session.board(id).unwrap();
    assert_eq!(board.post("t3_a").unwrap().status, PostStatus::Actioned);
    assert!(matches!(
        board.confirmation("t3_a"),
        Some(Confirmation::Unconfirmed { .. })
    ));
    let cached = session.prospect(id).unwrap();
    assert_eq!(cached.find_post("t3_a").unwrap().status, PostStatus::Actioned);
    assert_eq!(Some(cached.post_counts()), session.post_counts(id));

    // A refresh must not undo the unconfirmed swipe.
    session.refresh().await.unwrap();
    assert_eq!(
        session.board(id).unwrap().post("t3_a").unwrap().status,
        PostStatus::Actioned
    );
    assert_eq!(
        session.prospect(id).unwrap().post_counts(),
        session.post_counts(id).unwrap()
    );

    let report = session.retry_unconfirmed().await;
    assert_eq!(report.confirmed, 1);
    assert_eq!(session.post_counts(id).unwrap().actioned, 1);

    let err = session
        .triage(Uuid::new_v4(), "t3_a", TriageAction::Queue)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn triage_drops_vanished_post_from_cached_prospect() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.backend().state().post_action_not_found = true;

    session
        .triage(id, "t3_a", TriageAction::Ignore)
        .await
        .unwrap_err();
    let cached = session.prospect(id).unwrap();
    assert!(cached.find_post("t3_a").is_none());
    assert_eq!(cached.post_counts().total, 1);
    assert_eq!(Some(cached.post_counts()), session.post_counts(id));
}

#[tokio::test]
async fn unlimited_backend_quota_uses_configured_monthly_limit() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.backend().state().quota = leadscout_client::QuotaResponse {
        has_access: true,
        remaining_jobs: 0,
        used_jobs: 5,
        monthly_limit: 0,
    };
    session.open_keyword_job(id).unwrap();

    session.submit_queue().await.unwrap();
    assert_eq!(session.quota_gate().remaining_jobs(), Some(95));
}

#[tokio::test]
async fn refresh_drops_jobs_for_vanished_prospects() {
    let p = invoices_prospect();
    let id = p.id;
    let mut session = session_with(vec![p]).await;
    session.open_keyword_job(id).unwrap();

    session.backend().state().prospects.clear();
    assert_eq!(session.refresh().await.unwrap(), 0);
    assert!(session.queue().is_empty());
    assert!(session.board(id).is_none());
}

#[tokio::test]
async fn notify_explains_quota_denial() {
    let session = session_with(vec![]).await;
    let n = session.notify(&EngineError::Quota {
        remaining_jobs: 0,
        used_jobs: 100,
        monthly_limit: 100,
    });
    assert_eq!(n.action, Some(crate::notification::SuggestedAction::UpgradePlan));
    assert!(n.paywall.is_some());
}
