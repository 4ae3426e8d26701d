//! Metric name and label definitions.
//!
//! This module defines all metric names and common label keys used throughout
//! castellan. Centralizing these definitions ensures consistency and makes it
//! easier to document what metrics are available.

/// Risk evaluation metrics
pub mod evaluation {
    /// Total number of risk evaluations performed, by action and level
    pub const EVALUATIONS_TOTAL: &str = "castellan_evaluations_total";
    /// Evaluation duration in seconds (signal collection through decision)
    pub const DURATION_SECONDS: &str = "castellan_evaluation_duration_seconds";
    /// Distribution of computed risk scores
    pub const SCORE: &str = "castellan_evaluation_score";
    /// Triggered factor occurrences, by factor name
    pub const FACTORS_TOTAL: &str = "castellan_evaluation_factors_total";
    /// Evaluations that ran on degraded signals
    pub const DEGRADED_TOTAL: &str = "castellan_evaluations_degraded_total";
}

/// Policy decision metrics
pub mod decision {
    /// Decisions resolved by a matching policy, by policy name
    pub const POLICY_MATCHED_TOTAL: &str = "castellan_decision_policy_matched_total";
    /// Decisions resolved by the level fallback (no policy matched)
    pub const FALLBACK_TOTAL: &str = "castellan_decision_fallback_total";
}

/// Policy store metrics
pub mod policy {
    /// Number of policies currently loaded
    pub const LOADED: &str = "castellan_policies_loaded";
    /// Accepted store writes, by operation
    pub const WRITES_TOTAL: &str = "castellan_policy_writes_total";
    /// Policies rejected during validation
    pub const REJECTIONS_TOTAL: &str = "castellan_policy_rejections_total";
}

/// Step-up challenge metrics
pub mod stepup {
    /// Challenges created
    pub const CHALLENGES_CREATED_TOTAL: &str = "castellan_stepup_challenges_created_total";
    /// Challenges currently pending
    pub const CHALLENGES_PENDING: &str = "castellan_stepup_challenges_pending";
    /// Verification attempts, by outcome
    pub const VERIFICATIONS_TOTAL: &str = "castellan_stepup_verifications_total";
    /// Challenges cancelled
    pub const CANCELLATIONS_TOTAL: &str = "castellan_stepup_cancellations_total";
    /// Records removed by the eviction sweep
    pub const EVICTIONS_TOTAL: &str = "castellan_stepup_evictions_total";
    /// Seconds between challenge creation and successful verification
    pub const TIME_TO_VERIFY_SECONDS: &str = "castellan_stepup_time_to_verify_seconds";
}

/// Audit pipeline metrics
pub mod audit {
    /// Audit events emitted, by event kind
    pub const EVENTS_TOTAL: &str = "castellan_audit_events_total";
    /// Sink record failures, by sink name
    pub const SINK_ERRORS_TOTAL: &str = "castellan_audit_sink_errors_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const ACTION: &str = "action";
    pub const LEVEL: &str = "level";
    pub const FACTOR: &str = "factor";
    pub const POLICY: &str = "policy";
    pub const OUTCOME: &str = "outcome";
    pub const METHOD: &str = "method";
    pub const OPERATION: &str = "operation";
    pub const EVENT: &str = "event";
    pub const SINK: &str = "sink";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Evaluation duration buckets (in seconds)
    /// Covers 100µs to 1s (the pipeline is in-memory and fast)
    pub static EVALUATION_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
        ]
    });

    /// Risk score buckets
    /// Aligned to the level boundaries at 40 and 75
    pub static SCORE: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 75.0, 85.0, 100.0]
    });

    /// Time-to-verify buckets (in seconds)
    /// Covers 1s to the 900s challenge lifetime
    pub static TIME_TO_VERIFY: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]
    });
}

/// Register help text and units for every metric with the installed recorder.
///
/// Safe to call before a recorder is installed (the facade discards the
/// descriptions in that case).
pub fn describe_metrics() {
    use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        evaluation::EVALUATIONS_TOTAL,
        Unit::Count,
        "Total risk evaluations performed, labeled by action and level"
    );
    describe_histogram!(
        evaluation::DURATION_SECONDS,
        Unit::Seconds,
        "Time spent collecting signals, scoring, and deciding"
    );
    describe_histogram!(
        evaluation::SCORE,
        Unit::Count,
        "Distribution of computed risk scores (0-100)"
    );
    describe_counter!(
        evaluation::FACTORS_TOTAL,
        Unit::Count,
        "Triggered risk factor occurrences, labeled by factor name"
    );
    describe_counter!(
        evaluation::DEGRADED_TOTAL,
        Unit::Count,
        "Evaluations that ran on degraded signals"
    );

    describe_counter!(
        decision::POLICY_MATCHED_TOTAL,
        Unit::Count,
        "Decisions resolved by a matching policy, labeled by policy name"
    );
    describe_counter!(
        decision::FALLBACK_TOTAL,
        Unit::Count,
        "Decisions resolved by the risk-level fallback"
    );

    describe_gauge!(policy::LOADED, Unit::Count, "Policies currently loaded");
    describe_counter!(
        policy::WRITES_TOTAL,
        Unit::Count,
        "Accepted policy store writes, labeled by operation"
    );
    describe_counter!(
        policy::REJECTIONS_TOTAL,
        Unit::Count,
        "Policies rejected during validation"
    );

    describe_counter!(
        stepup::CHALLENGES_CREATED_TOTAL,
        Unit::Count,
        "Step-up challenges created"
    );
    describe_gauge!(
        stepup::CHALLENGES_PENDING,
        Unit::Count,
        "Step-up challenges currently pending"
    );
    describe_counter!(
        stepup::VERIFICATIONS_TOTAL,
        Unit::Count,
        "Step-up verification attempts, labeled by outcome"
    );
    describe_counter!(
        stepup::CANCELLATIONS_TOTAL,
        Unit::Count,
        "Step-up challenges cancelled"
    );
    describe_counter!(
        stepup::EVICTIONS_TOTAL,
        Unit::Count,
        "Challenge records removed by the eviction sweep"
    );
    describe_histogram!(
        stepup::TIME_TO_VERIFY_SECONDS,
        Unit::Seconds,
        "Seconds between challenge creation and successful verification"
    );

    describe_counter!(
        audit::EVENTS_TOTAL,
        Unit::Count,
        "Audit events emitted, labeled by event kind"
    );
    describe_counter!(
        audit::SINK_ERRORS_TOTAL,
        Unit::Count,
        "Audit sink record failures, labeled by sink name"
    );
}
