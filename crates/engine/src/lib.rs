//! Decision engine for passwordless authentication attempts.
//!
//! [`RiskEngine`] is the single entry point: it collects signals into a
//! per-attempt context, scores the context against the configured risk
//! factors, matches the active policy set, and manages the step-up
//! challenge lifecycle that medium-risk decisions demand. Everything an
//! integrator needs is re-exported here.

mod engine;

pub use engine::RiskEngine;

pub use {
    castellan_audit::{AuditEvent, AuditPipeline, AuditSink, MemorySink, TracingSink},
    castellan_config::{CastellanConfig, Diagnostic, Severity},
    castellan_policy::{Condition, Policy, PolicyAction, PolicyDecision},
    castellan_risk::{RiskAssessment, RiskFactor, RiskLevel},
    castellan_signals::{
        AttemptRecord, AttemptSignals, Error, InMemoryHistory, NetworkIntel, ResolvedLocation,
        Result, SqliteHistory, StaticNetworkIntel, SubjectHistory,
    },
    castellan_stepup::{
        CancelOutcome, ChallengeHandle, ChallengeProof, ChallengeState, StepUpChallenge,
        VerificationMethod, VerifyOutcome,
    },
};
