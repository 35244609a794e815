// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error taxonomy for the fairness evaluation stages

/// Errors raised by the fairness evaluation core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FairnessError {
    #[error("Invalid tau: {0} (must be in (0.0, 1.0])")]
    InvalidTau(f64),

    #[error("{stage}: no requested fairness measure matches the configuration")]
    EmptyMeasureSelection { stage: &'static str },

    #[error("{stage}: input group value table has no rows")]
    EmptyInput { stage: &'static str },

    #[error("{stage}: no requested fairness measure found in input columns (missing: {})", .missing.join(", "))]
    NoApplicableMeasures {
        stage: &'static str,
        missing: Vec<String>,
    },
}

impl FairnessError {
    /// True for errors the caller can fix by changing the configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FairnessError::InvalidTau(_) | FairnessError::EmptyMeasureSelection { .. }
        )
    }
}

/// Check that tau lies in (0.0, 1.0]
pub fn validate_tau(tau: f64) -> Result<f64, FairnessError> {
    if tau > 0.0 && tau <= 1.0 {
        Ok(tau)
    } else {
        Err(FairnessError::InvalidTau(tau))
    }
}
