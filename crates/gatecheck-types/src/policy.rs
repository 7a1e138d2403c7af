//! Stage policy and configuration
//!
//! Per-stage blocking/fail-open policy is encoded as data so it stays
//! auditable and testable instead of being scattered across catch sites.
//! The numeric tolerance and UX threshold are product policy, so both are
//! configuration rather than constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Verification pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Deterministic smoke tests against the deployed artifact
    Smoke,
    /// Semantic fidelity against the original request
    Fidelity,
    /// Structural lint of the UI contract
    Contract,
    /// Headless-browser probe
    Visual,
    /// Adversarial UX scoring
    Ux,
}

impl Stage {
    /// Per-stage policy table
    ///
    /// Deterministic stages fail closed; judge-mediated stages fail open so
    /// an unavailable judge can never reject a build; the visual probe
    /// never blocks because browser automation is the flakiest stage.
    #[must_use]
    pub fn policy(self) -> StagePolicy {
        match self {
            Stage::Smoke => StagePolicy {
                blocking: true,
                fail_open: false,
            },
            Stage::Fidelity => StagePolicy {
                blocking: true,
                fail_open: true,
            },
            Stage::Contract => StagePolicy {
                blocking: true,
                fail_open: false,
            },
            Stage::Visual => StagePolicy {
                blocking: false,
                fail_open: true,
            },
            Stage::Ux => StagePolicy {
                blocking: true,
                fail_open: true,
            },
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Smoke => "smoke",
            Stage::Fidelity => "fidelity",
            Stage::Contract => "contract",
            Stage::Visual => "visual",
            Stage::Ux => "ux",
        };
        write!(f, "{s}")
    }
}

/// How a stage participates in the combined verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicy {
    /// Stage failure fails the combined verdict
    pub blocking: bool,
    /// Stage-internal error defaults to pass instead of blocking
    pub fail_open: bool,
}

/// Numeric comparison tolerance for the result matcher
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchTolerance {
    /// Relative tolerance as a fraction of the expected value
    pub relative: f64,
    /// Absolute tolerance floor
    pub absolute: f64,
}

impl Default for MatchTolerance {
    fn default() -> Self {
        Self {
            relative: 0.2,
            absolute: 5.0,
        }
    }
}

impl MatchTolerance {
    /// Allowed absolute deviation for an expected value
    #[inline]
    #[must_use]
    pub fn allowance(&self, expected: f64) -> f64 {
        (expected.abs() * self.relative).max(self.absolute)
    }
}

/// QA pipeline configuration
#[derive(Debug, Clone)]
pub struct QaConfig {
    /// Numeric tolerance for pattern matching
    pub tolerance: MatchTolerance,
    /// UX pass threshold on the 1-10 mean
    pub ux_pass_threshold: f64,
    /// Invocation attempts per smoke case before recording failure
    pub invoke_attempts: u32,
    /// Linear backoff unit between invocation attempts
    pub backoff_unit: Duration,
    /// Cold-start settling delay before an artifact's first call
    pub settle_delay: Duration,
    /// Timeout applied to every external call
    pub call_timeout: Duration,
}

impl QaConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With UX pass threshold
    #[inline]
    #[must_use]
    pub fn with_ux_threshold(mut self, threshold: f64) -> Self {
        self.ux_pass_threshold = threshold;
        self
    }

    /// With numeric tolerance
    #[inline]
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: MatchTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            tolerance: MatchTolerance::default(),
            ux_pass_threshold: 6.0,
            invoke_attempts: 3,
            backoff_unit: Duration::from_secs(2),
            settle_delay: Duration::from_secs(1),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry controller configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per chain before escalation
    pub max_cycles: u32,
}

impl RetryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max cycles
    #[inline]
    #[must_use]
    pub fn with_max_cycles(mut self, max: u32) -> Self {
        self.max_cycles = max;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_cycles: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table() {
        assert!(Stage::Smoke.policy().blocking);
        assert!(!Stage::Smoke.policy().fail_open);
        assert!(Stage::Fidelity.policy().fail_open);
        assert!(!Stage::Visual.policy().blocking);
        assert!(Stage::Ux.policy().blocking);
        assert!(Stage::Ux.policy().fail_open);
    }

    #[test]
    fn tolerance_allowance_floor() {
        let tol = MatchTolerance::default();
        // 20% of 20 is 4, below the absolute floor of 5
        assert!((tol.allowance(20.0) - 5.0).abs() < f64::EPSILON);
        // 20% of 100 is 20, above the floor
        assert!((tol.allowance(100.0) - 20.0).abs() < f64::EPSILON);
        // Negative expected values use magnitude
        assert!((tol.allowance(-100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn config_defaults() {
        let qa = QaConfig::new();
        assert_eq!(qa.invoke_attempts, 3);
        assert_eq!(qa.backoff_unit, Duration::from_secs(2));
        assert!((qa.ux_pass_threshold - 6.0).abs() < f64::EPSILON);

        let retry = RetryConfig::new();
        assert_eq!(retry.max_cycles, 5);
    }
}
