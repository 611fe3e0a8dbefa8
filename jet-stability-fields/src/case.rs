use crate::error::{FieldError, Result};
use std::fmt;

/// Stability datasets exist for Strouhal numbers on this grid of tenths.
const STROUHAL_STEP: f64 = 0.1;
const STROUHAL_TOLERANCE: f64 = 1e-6;

/// The (case, forcing frequency) pair that selects one stability dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaseSelector {
    case_id: usize,
    strouhal: f64,
}

impl CaseSelector {
    pub fn new(case_id: i64, strouhal: f64) -> Result<Self> {
        let case_id = validate_case_id(case_id)?;
        if !strouhal.is_finite() || strouhal <= 0.0 {
            return Err(FieldError::invalid(format!(
                "Strouhal number must be a positive number, got {}",
                strouhal
            )));
        }
        let steps = strouhal / STROUHAL_STEP;
        if (steps - steps.round()).abs() > STROUHAL_TOLERANCE {
            return Err(FieldError::invalid(format!(
                "Strouhal number {} is not a multiple of {}",
                strouhal, STROUHAL_STEP
            )));
        }
        Ok(Self { case_id, strouhal })
    }

    pub fn case_id(&self) -> usize {
        self.case_id
    }

    pub fn strouhal(&self) -> f64 {
        self.strouhal
    }

    /// Directory tag of the frequency, `St04` for 0.4 and `St10` for 1.0.
    pub fn strouhal_tag(&self) -> String {
        format!("St{:02}", (self.strouhal / STROUHAL_STEP).round() as u64)
    }
}

impl fmt::Display for CaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {} at St={}", self.case_id, self.strouhal)
    }
}

/// Case ids are 1-based positive integers.
pub fn validate_case_id(case_id: i64) -> Result<usize> {
    if case_id <= 0 {
        return Err(FieldError::invalid(format!(
            "case id must be a positive integer, got {}",
            case_id
        )));
    }
    Ok(case_id as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strouhal_directory_tags() {
        assert_eq!(CaseSelector::new(1, 0.4).unwrap().strouhal_tag(), "St04");
        assert_eq!(CaseSelector::new(1, 1.0).unwrap().strouhal_tag(), "St10");
        assert_eq!(CaseSelector::new(3, 0.3).unwrap().strouhal_tag(), "St03");
    }

    #[test]
    fn rejects_bad_selectors() {
        assert!(matches!(
            CaseSelector::new(0, 0.4),
            Err(FieldError::InvalidArgument(_))
        ));
        assert!(matches!(
            CaseSelector::new(-3, 0.4),
            Err(FieldError::InvalidArgument(_))
        ));
        assert!(CaseSelector::new(1, 0.0).is_err());
        assert!(CaseSelector::new(1, -0.4).is_err());
        assert!(CaseSelector::new(1, f64::NAN).is_err());
    }

    #[test]
    fn frequencies_between_tenths_are_rejected() {
        for st in [0.45, 0.41, 0.04, 1.05] {
            assert!(matches!(
                CaseSelector::new(1, st),
                Err(FieldError::InvalidArgument(_))
            ));
        }
        // Products like 0.7 / 0.1 land a few ulps off the integer.
        assert_eq!(CaseSelector::new(1, 0.7).unwrap().strouhal_tag(), "St07");
        assert_eq!(CaseSelector::new(1, 2.3).unwrap().strouhal_tag(), "St23");
    }
}
