#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use {
    castellan_engine::{
        AttemptRecord, AttemptSignals, CastellanConfig, ChallengeProof, ChallengeState,
        InMemoryHistory, MemorySink, Policy, PolicyAction, ResolvedLocation, RiskEngine,
        RiskLevel, StaticNetworkIntel, VerificationMethod, VerifyOutcome,
    },
    chrono::{DateTime, Duration, TimeZone, Utc},
};

// Tuesday 2025-06-10, inside the default 08:00-18:00 UTC window.
fn weekday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap()
}

// Same Tuesday, 03:00 UTC.
fn before_dawn() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 3, 0, 0).unwrap()
}

/// Alice signed in successfully a week earlier from Paris on her usual
/// device.
fn enrolled_history() -> Arc<InMemoryHistory> {
    let history = Arc::new(InMemoryHistory::new());
    history.record_attempt(AttemptRecord {
        subject_id: "alice".into(),
        succeeded: true,
        device_fingerprint: Some("fp-known".into()),
        country: Some("FR".into()),
        latitude: Some(48.8566),
        longitude: Some(2.3522),
        observed_at: Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap(),
    });
    history
}

fn engine_over(history: Arc<InMemoryHistory>) -> RiskEngine {
    RiskEngine::new(
        CastellanConfig::default(),
        history,
        Arc::new(StaticNetworkIntel::default()),
    )
    .unwrap()
}

fn signals(at: DateTime<Utc>, fingerprint: &str, country: &str) -> AttemptSignals {
    AttemptSignals {
        source_ip: Some("198.51.100.10".parse().unwrap()),
        device_fingerprint: Some(fingerprint.into()),
        location: Some(ResolvedLocation {
            country: Some(country.into()),
            region: None,
            latitude: None,
            longitude: None,
        }),
        ..AttemptSignals::new("alice", at)
    }
}

fn factor_names(factors: &[castellan_engine::RiskFactor]) -> Vec<&str> {
    factors.iter().map(|f| f.factor_name.as_str()).collect()
}

#[tokio::test]
async fn quiet_context_scores_zero_and_allows() {
    let engine = engine_over(enrolled_history());

    let decision = engine
        .evaluate(signals(weekday_afternoon(), "fp-known", "FR"))
        .await
        .unwrap();

    assert_eq!(decision.score, 0);
    assert_eq!(decision.level, RiskLevel::Low);
    assert_eq!(decision.action, PolicyAction::Allow);
    assert!(decision.factors.is_empty());
    assert_eq!(decision.matched_policy_name.as_deref(), Some("low_risk_allow"));
}

#[tokio::test]
async fn unknown_location_alone_stays_below_the_stepup_band() {
    let engine = engine_over(enrolled_history());

    let decision = engine
        .evaluate(signals(weekday_afternoon(), "fp-known", "JP"))
        .await
        .unwrap();

    assert_eq!(decision.score, 30);
    assert_eq!(decision.action, PolicyAction::Allow);
    assert_eq!(factor_names(&decision.factors), vec!["new_location"]);
}

#[tokio::test]
async fn unknown_device_outside_hours_still_allows() {
    let engine = engine_over(enrolled_history());

    let decision = engine
        .evaluate(signals(before_dawn(), "fp-fresh", "FR"))
        .await
        .unwrap();

    assert_eq!(decision.score, 35);
    assert_eq!(decision.action, PolicyAction::Allow);
    let names = factor_names(&decision.factors);
    assert!(names.contains(&"unknown_device"));
    assert!(names.contains(&"outside_hours"));
}

#[tokio::test]
async fn stacked_unknowns_with_repeated_failures_deny() {
    let history = enrolled_history();
    for minute in [0, 10, 20] {
        history.record_attempt(AttemptRecord {
            subject_id: "alice".into(),
            succeeded: false,
            device_fingerprint: None,
            country: None,
            latitude: None,
            longitude: None,
            observed_at: Utc.with_ymd_and_hms(2025, 6, 10, 13, minute, 0).unwrap(),
        });
    }
    let engine = engine_over(history);

    let decision = engine
        .evaluate(signals(weekday_afternoon(), "fp-fresh", "JP"))
        .await
        .unwrap();

    assert_eq!(decision.score, 75);
    assert_eq!(decision.level, RiskLevel::High);
    assert_eq!(decision.action, PolicyAction::Deny);
    assert_eq!(decision.matched_policy_name.as_deref(), Some("high_risk_deny"));
}

#[tokio::test]
async fn medium_risk_runs_the_full_stepup_flow() {
    let engine = engine_over(enrolled_history());

    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    assert_eq!(decision.score, 45);
    assert_eq!(decision.action, PolicyAction::Stepup);
    assert_eq!(
        decision.matched_policy_name.as_deref(),
        Some("medium_risk_stepup")
    );

    let handle = engine.create_challenge("alice", &decision).await.unwrap();
    assert_eq!(handle.subject_id, "alice");
    assert_eq!(handle.assessment.score, 45);

    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    let outcome = engine
        .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &proof)
        .await;
    assert_eq!(outcome, VerifyOutcome::Verified);

    let record = engine.challenge(&handle.challenge_id).unwrap();
    assert_eq!(record.state, ChallengeState::Verified);
    assert_eq!(record.verification_method, Some(VerificationMethod::Otp));
}

#[tokio::test]
async fn a_correct_proof_after_the_ttl_reports_expired() {
    let engine = engine_over(enrolled_history());

    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    let handle = engine.create_challenge("alice", &decision).await.unwrap();

    let late = handle.expires_at + Duration::seconds(1);
    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    let outcome = engine
        .verify_challenge_at(&handle.challenge_id, VerificationMethod::Otp, &proof, late)
        .await;
    assert_eq!(outcome, VerifyOutcome::Expired);

    let record = engine.challenge(&handle.challenge_id).unwrap();
    assert_eq!(record.state, ChallengeState::Expired);
}

#[tokio::test]
async fn evaluation_is_deterministic_for_identical_signals() {
    let engine = engine_over(enrolled_history());
    let attempt = signals(before_dawn(), "fp-fresh", "JP");

    let first = engine.evaluate(attempt.clone()).await.unwrap();
    let second = engine.evaluate(attempt).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn verification_succeeds_at_most_once() {
    let engine = engine_over(enrolled_history());
    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    let handle = engine.create_challenge("alice", &decision).await.unwrap();

    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    assert_eq!(
        engine
            .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &proof)
            .await,
        VerifyOutcome::Verified
    );
    assert_eq!(
        engine
            .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &proof)
            .await,
        VerifyOutcome::AlreadyUsed
    );
}

#[tokio::test]
async fn a_policy_ahead_of_the_defaults_overrides_them() {
    let engine = engine_over(enrolled_history());

    // Unconditional deny slotted ahead of the seeded bands, as during an
    // incident. The seeds stay installed but become unreachable, which the
    // write reports.
    let diagnostics =
        engine.upsert_policy(Policy::new("lockdown", PolicyAction::Deny).with_priority(1));
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics.iter().all(|d| {
        d.severity == castellan_engine::Severity::Warning && d.message.contains("lockdown")
    }));
    assert_eq!(engine.policy_snapshot().len(), 4);

    let decision = engine
        .evaluate(signals(weekday_afternoon(), "fp-known", "FR"))
        .await
        .unwrap();
    assert_eq!(decision.score, 0);
    assert_eq!(decision.action, PolicyAction::Deny);
    assert_eq!(decision.matched_policy_name.as_deref(), Some("lockdown"));
}

#[tokio::test]
async fn the_audit_stream_records_the_whole_flow() {
    let mut engine = engine_over(enrolled_history());
    let sink = Arc::new(MemorySink::new());
    engine.register_sink(sink.clone());

    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    let handle = engine.create_challenge("alice", &decision).await.unwrap();

    let wrong = ChallengeProof::Otp {
        code: "000000".into(),
    };
    engine
        .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &wrong)
        .await;
    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    engine
        .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &proof)
        .await;

    assert_eq!(sink.events_of_kind("risk_evaluated").len(), 1);
    assert_eq!(sink.events_of_kind("stepup_created").len(), 1);
    assert_eq!(sink.events_of_kind("stepup_failed").len(), 1);
    assert_eq!(sink.events_of_kind("stepup_verified").len(), 1);

    // The evaluation event carries the full factor breakdown with evidence.
    let evaluated = sink.events_of_kind("risk_evaluated").remove(0);
    match evaluated {
        castellan_engine::AuditEvent::RiskEvaluated { factors, .. } => {
            assert_eq!(factors.len(), 2);
            assert!(factors.iter().all(|f| !f.evidence.is_empty()));
        },
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_challenges_refuse_proofs_and_are_audited() {
    let mut engine = engine_over(enrolled_history());
    let sink = Arc::new(MemorySink::new());
    engine.register_sink(sink.clone());

    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    let handle = engine.create_challenge("alice", &decision).await.unwrap();

    engine.cancel_challenge(&handle.challenge_id).await;
    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    assert_eq!(
        engine
            .verify_challenge(&handle.challenge_id, VerificationMethod::Otp, &proof)
            .await,
        VerifyOutcome::AlreadyUsed
    );
    assert_eq!(sink.events_of_kind("stepup_cancelled").len(), 1);
}

#[tokio::test]
async fn expiry_does_not_depend_on_the_sweep() {
    let engine = engine_over(enrolled_history());
    let decision = engine
        .evaluate(signals(before_dawn(), "fp-known", "JP"))
        .await
        .unwrap();
    let handle = engine.create_challenge("alice", &decision).await.unwrap();

    // No evict call in between; the read alone observes the deadline.
    let late = handle.expires_at + Duration::seconds(1);
    let proof = ChallengeProof::Otp {
        code: handle.otp_code.clone(),
    };
    assert_eq!(
        engine
            .verify_challenge_at(&handle.challenge_id, VerificationMethod::Otp, &proof, late)
            .await,
        VerifyOutcome::Expired
    );

    // The sweep afterwards reclaims the record entirely.
    assert_eq!(engine.evict_expired_at(late), 1);
    assert!(engine.challenge(&handle.challenge_id).is_none());
}
