//! Exception-type resolution.
//!
//! Strict priority chain, first hit wins:
//! 1. the type named by the anomaly detector
//! 2. the category of the first `high` finding, in list order
//! 3. `high_risk` when the risk score exceeds the threshold
//! 4. `general_exception`

use depotwatch_ai::{AnomalyCheck, OrderAnalysis};

use crate::rule::Priority;

pub const HIGH_RISK: &str = "high_risk";
pub const GENERAL_EXCEPTION: &str = "general_exception";

/// Which link of the chain produced the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Detector,
    HighSeverityFinding,
    RiskThreshold,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub exception_type: String,
    pub source: ClassificationSource,
}

impl Classification {
    /// Result priority when no rule fired.
    pub fn baseline_priority(&self) -> Priority {
        match self.source {
            ClassificationSource::HighSeverityFinding | ClassificationSource::RiskThreshold => {
                Priority::High
            }
            ClassificationSource::Detector => Priority::Medium,
            ClassificationSource::Fallback => Priority::Low,
        }
    }
}

pub fn classify(
    check: &AnomalyCheck,
    analysis: &OrderAnalysis,
    high_risk_threshold: f64,
) -> Classification {
    if let Some(t) = &check.anomaly_type {
        return Classification {
            exception_type: t.clone(),
            source: ClassificationSource::Detector,
        };
    }

    if let Some(finding) = analysis.first_high() {
        return Classification {
            exception_type: finding.category.clone(),
            source: ClassificationSource::HighSeverityFinding,
        };
    }

    if analysis.risk_score > high_risk_threshold {
        return Classification {
            exception_type: HIGH_RISK.to_string(),
            source: ClassificationSource::RiskThreshold,
        };
    }

    Classification {
        exception_type: GENERAL_EXCEPTION.to_string(),
        source: ClassificationSource::Fallback,
    }
}
