//! Evaluation pipeline facade.
//!
//! Wires the signal collector, risk scorer, policy store, challenge
//! coordinator and audit pipeline behind the engine operations. All shared
//! state lives in the collaborators; the engine orchestrates, logs, and
//! counts.

use std::{sync::Arc, time::Instant};

use {
    chrono::{DateTime, Utc},
    tracing::{debug, info, warn},
};

use {
    castellan_audit::{AuditEvent, AuditPipeline, AuditSink, TracingSink},
    castellan_config::{CastellanConfig, Diagnostic, LevelThresholds, Severity},
    castellan_metrics::{
        counter, decision as decision_metrics, evaluation as evaluation_metrics, gauge, histogram,
        labels, policy as policy_metrics, stepup as stepup_metrics,
    },
    castellan_policy::{Policy, PolicyDecision, PolicySnapshot, PolicyStore, decide},
    castellan_risk::{RiskAssessment, RiskScorer},
    castellan_signals::{AttemptSignals, NetworkIntel, Result, SignalCollector, SubjectHistory},
    castellan_stepup::{
        CancelOutcome, ChallengeCoordinator, ChallengeHandle, ChallengeProof, StepUpChallenge,
        VerificationMethod, VerifyOutcome,
    },
};

/// One engine per deployment: evaluates attempts, manages step-up
/// challenges, and mirrors every decision onto the audit pipeline.
///
/// Evaluation is read-only against the collaborators, so any number of
/// attempts may run concurrently; the challenge map is the only mutable
/// state and serializes per challenge id.
pub struct RiskEngine {
    collector: SignalCollector,
    scorer: RiskScorer,
    thresholds: LevelThresholds,
    policies: PolicyStore,
    challenges: ChallengeCoordinator,
    audit: AuditPipeline,
}

impl RiskEngine {
    /// Build an engine from configuration and the two required
    /// collaborators.
    ///
    /// Fails when the configured business-hours timezone is not a known
    /// IANA name. When `audit.log_events` is set, a [`TracingSink`] is
    /// registered up front; more sinks can be added with
    /// [`register_sink`](Self::register_sink).
    pub fn new(
        config: CastellanConfig,
        history: Arc<dyn SubjectHistory>,
        intel: Arc<dyn NetworkIntel>,
    ) -> Result<Self> {
        let collector = SignalCollector::new(config.risk.clone(), history, intel)?;
        let scorer = RiskScorer::new(config.risk.clone());
        let policies = PolicyStore::new(&config.policy);
        let challenges = ChallengeCoordinator::new(config.stepup);

        let mut audit = AuditPipeline::new();
        if config.audit.log_events {
            audit.register(Arc::new(TracingSink));
        }

        Ok(Self {
            collector,
            scorer,
            thresholds: config.risk.thresholds,
            policies,
            challenges,
            audit,
        })
    }

    /// Add an audit sink. Sinks receive every event from this point on.
    pub fn register_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.audit.register(sink);
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    /// Score one authentication attempt and decide on it.
    ///
    /// Fails only when the history collaborator does; every other signal
    /// gap degrades the assessment instead. The decision is final for this
    /// attempt: re-evaluating the same signals against the same policy
    /// snapshot yields the same decision.
    pub async fn evaluate(&self, signals: AttemptSignals) -> Result<PolicyDecision> {
        let started = Instant::now();

        let context = self.collector.collect(signals).await?;
        let assessment = self.scorer.score(&context);
        let snapshot = self.policies.snapshot();
        let decision = decide(&assessment, &context, &snapshot);

        counter!(
            evaluation_metrics::EVALUATIONS_TOTAL,
            labels::ACTION => decision.action.as_str(),
            labels::LEVEL => decision.level.as_str()
        )
        .increment(1);
        histogram!(evaluation_metrics::SCORE).record(f64::from(decision.score));
        for factor in &decision.factors {
            counter!(evaluation_metrics::FACTORS_TOTAL, labels::FACTOR => factor.factor_name.clone())
                .increment(1);
        }
        if assessment.is_degraded() {
            counter!(evaluation_metrics::DEGRADED_TOTAL).increment(1);
        }
        match decision.matched_policy_name.as_deref() {
            Some(name) => {
                counter!(decision_metrics::POLICY_MATCHED_TOTAL, labels::POLICY => name.to_string())
                    .increment(1)
            },
            None => counter!(decision_metrics::FALLBACK_TOTAL).increment(1),
        }
        histogram!(evaluation_metrics::DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        info!(
            subject_id = %context.subject_id,
            score = decision.score,
            level = decision.level.as_str(),
            action = decision.action.as_str(),
            policy = ?decision.matched_policy_name,
            "attempt evaluated"
        );

        self.audit
            .emit(AuditEvent::RiskEvaluated {
                subject_id: context.subject_id.clone(),
                timestamp: context.timestamp,
                score: decision.score,
                level: decision.level,
                action: decision.action,
                matched_policy: decision.matched_policy_name.clone(),
                factors: decision.factors.clone(),
                degradations: assessment.degradations.clone(),
            })
            .await;

        Ok(decision)
    }

    // ── Step-up lifecycle ───────────────────────────────────────────────

    /// Open a step-up challenge for a subject whose decision demands one.
    ///
    /// Returns `None` for decisions that do not require step-up; a
    /// challenge must never exist for an attempt that was allowed or denied
    /// outright.
    pub async fn create_challenge(
        &self,
        subject_id: &str,
        decision: &PolicyDecision,
    ) -> Option<ChallengeHandle> {
        self.create_challenge_at(subject_id, decision, Utc::now()).await
    }

    /// Clock-explicit variant of [`create_challenge`](Self::create_challenge).
    pub async fn create_challenge_at(
        &self,
        subject_id: &str,
        decision: &PolicyDecision,
        now: DateTime<Utc>,
    ) -> Option<ChallengeHandle> {
        if !decision.requires_stepup() {
            debug!(
                subject_id,
                action = decision.action.as_str(),
                "challenge refused: decision does not require step-up"
            );
            return None;
        }

        let assessment =
            RiskAssessment::from_factors(decision.factors.clone(), &self.thresholds, Vec::new());
        let handle = self.challenges.create_at(subject_id, &assessment, now);

        counter!(stepup_metrics::CHALLENGES_CREATED_TOTAL).increment(1);
        self.update_pending_gauge();
        info!(
            subject_id,
            challenge_id = %handle.challenge_id,
            score = decision.score,
            expires_at = %handle.expires_at,
            "step-up challenge created"
        );

        self.audit
            .emit(AuditEvent::StepUpCreated {
                subject_id: subject_id.to_string(),
                challenge_id: handle.challenge_id.clone(),
                score: decision.score,
                level: decision.level,
                factors: decision.factors.clone(),
                expires_at: handle.expires_at,
            })
            .await;

        Some(handle)
    }

    /// Check a proof against a pending challenge.
    ///
    /// Fails closed: the outcome names the reason, and only a structurally
    /// valid proof of the declared method moves the challenge to
    /// `verified`.
    pub async fn verify_challenge(
        &self,
        challenge_id: &str,
        method: VerificationMethod,
        proof: &ChallengeProof,
    ) -> VerifyOutcome {
        self.verify_challenge_at(challenge_id, method, proof, Utc::now()).await
    }

    /// Clock-explicit variant of [`verify_challenge`](Self::verify_challenge).
    pub async fn verify_challenge_at(
        &self,
        challenge_id: &str,
        method: VerificationMethod,
        proof: &ChallengeProof,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        let outcome = self.challenges.verify_at(challenge_id, method, proof, now);
        counter!(stepup_metrics::VERIFICATIONS_TOTAL, labels::OUTCOME => outcome.kind())
            .increment(1);
        self.update_pending_gauge();

        let record = self.challenges.get_at(challenge_id, now);
        match outcome {
            VerifyOutcome::Verified => {
                if let Some(record) = &record {
                    let elapsed = (now - record.created_at).num_milliseconds() as f64 / 1000.0;
                    histogram!(stepup_metrics::TIME_TO_VERIFY_SECONDS, labels::METHOD => method.as_str())
                        .record(elapsed);
                    info!(
                        challenge_id,
                        subject_id = %record.subject_id,
                        method = method.as_str(),
                        "step-up challenge verified"
                    );
                    self.audit
                        .emit(AuditEvent::StepUpVerified {
                            subject_id: record.subject_id.clone(),
                            challenge_id: challenge_id.to_string(),
                            method,
                            score: record.original_risk_assessment.total_score,
                            level: record.original_risk_assessment.level,
                            factors: record.original_risk_assessment.factors.clone(),
                        })
                        .await;
                }
            },
            VerifyOutcome::Expired => {
                if let Some(record) = &record {
                    info!(
                        challenge_id,
                        subject_id = %record.subject_id,
                        "step-up challenge expired"
                    );
                    self.audit
                        .emit(AuditEvent::StepUpExpired {
                            subject_id: record.subject_id.clone(),
                            challenge_id: challenge_id.to_string(),
                            score: record.original_risk_assessment.total_score,
                            level: record.original_risk_assessment.level,
                            factors: record.original_risk_assessment.factors.clone(),
                            expired_at: record.expires_at,
                        })
                        .await;
                }
            },
            VerifyOutcome::NotFound
            | VerifyOutcome::AlreadyUsed
            | VerifyOutcome::MethodMismatch
            | VerifyOutcome::InvalidProof => {
                warn!(
                    challenge_id,
                    outcome = outcome.kind(),
                    "step-up verification failed"
                );
                self.audit
                    .emit(AuditEvent::StepUpFailed {
                        subject_id: record.as_ref().map(|r| r.subject_id.clone()),
                        challenge_id: challenge_id.to_string(),
                        reason: outcome.kind().to_string(),
                    })
                    .await;
            },
        }

        outcome
    }

    /// Cancel a pending challenge. Idempotent: cancelling a settled or
    /// unknown challenge reports so without side effects.
    pub async fn cancel_challenge(&self, challenge_id: &str) -> CancelOutcome {
        self.cancel_challenge_at(challenge_id, Utc::now()).await
    }

    /// Clock-explicit variant of [`cancel_challenge`](Self::cancel_challenge).
    pub async fn cancel_challenge_at(
        &self,
        challenge_id: &str,
        now: DateTime<Utc>,
    ) -> CancelOutcome {
        let outcome = self.challenges.cancel_at(challenge_id, now);
        match outcome {
            CancelOutcome::Cancelled => {
                counter!(stepup_metrics::CANCELLATIONS_TOTAL).increment(1);
                self.update_pending_gauge();
                let subject_id = self
                    .challenges
                    .get_at(challenge_id, now)
                    .map(|record| record.subject_id);
                info!(challenge_id, subject_id = ?subject_id, "step-up challenge cancelled");
                self.audit
                    .emit(AuditEvent::StepUpCancelled {
                        subject_id,
                        challenge_id: challenge_id.to_string(),
                    })
                    .await;
            },
            CancelOutcome::AlreadyTerminal => {
                debug!(challenge_id, "cancel on a settled challenge, nothing to do");
            },
            CancelOutcome::NotFound => {
                debug!(challenge_id, "cancel on an unknown challenge id");
            },
        }
        outcome
    }

    /// Read one challenge record. Observing an elapsed deadline marks the
    /// record `expired` first.
    #[must_use]
    pub fn challenge(&self, challenge_id: &str) -> Option<StepUpChallenge> {
        self.challenges.get(challenge_id)
    }

    /// Reclaim challenge records past their deadline. Correctness never
    /// depends on this running; expiry is enforced on every read.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    /// Clock-explicit variant of [`evict_expired`](Self::evict_expired).
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.challenges.evict_expired_at(now);
        if evicted > 0 {
            counter!(stepup_metrics::EVICTIONS_TOTAL).increment(evicted as u64);
            debug!(evicted, "expired challenge records evicted");
        }
        self.update_pending_gauge();
        evicted
    }

    // ── Policy administration ───────────────────────────────────────────

    /// The policy set evaluations currently run against.
    #[must_use]
    pub fn policy_snapshot(&self) -> Arc<PolicySnapshot> {
        self.policies.snapshot()
    }

    /// Swap the whole policy set. Diagnostics report anything rejected or
    /// suspicious; accepted policies are live for the next evaluation.
    pub fn replace_policies(&self, policies: Vec<Policy>) -> Vec<Diagnostic> {
        let diagnostics = self.policies.replace_all(policies);
        self.record_policy_write("replace", &diagnostics);
        diagnostics
    }

    /// Insert or update one policy by name.
    pub fn upsert_policy(&self, policy: Policy) -> Vec<Diagnostic> {
        let diagnostics = self.policies.upsert(policy);
        self.record_policy_write("upsert", &diagnostics);
        diagnostics
    }

    /// Remove one policy by name. Returns whether it existed.
    pub fn remove_policy(&self, name: &str) -> bool {
        let removed = self.policies.remove(name);
        if removed {
            self.record_policy_write("remove", &[]);
        }
        removed
    }

    /// Load a policy document from JSON, rejecting malformed entries
    /// per-element.
    pub fn load_policies_json(&self, json: &str) -> Vec<Diagnostic> {
        let diagnostics = self.policies.load_json(json);
        self.record_policy_write("load", &diagnostics);
        diagnostics
    }

    fn record_policy_write(&self, operation: &'static str, diagnostics: &[Diagnostic]) {
        counter!(policy_metrics::WRITES_TOTAL, labels::OPERATION => operation).increment(1);
        let rejections = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        if rejections > 0 {
            counter!(policy_metrics::REJECTIONS_TOTAL).increment(rejections as u64);
        }
        gauge!(policy_metrics::LOADED).set(self.policies.snapshot().len() as f64);
    }

    fn update_pending_gauge(&self) {
        gauge!(stepup_metrics::CHALLENGES_PENDING).set(self.challenges.pending_len() as f64);
    }
}
