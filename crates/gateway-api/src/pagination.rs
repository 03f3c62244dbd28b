// Pagination bounds shared by every list endpoint (C12: limit in [1,1000],
// offset >= 0). Out-of-range values are a validation error, not a clamp —
// silently clamping would violate the "concatenation of pages equals the
// full result set" testable property.

use gateway_core::validation::ValidationFailure;
use gateway_core::GatewayError;
use serde::Deserialize;

const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

impl PageParams {
    pub fn validate(&self) -> Result<(), GatewayError> {
        let mut failures = Vec::new();
        if self.limit < 1 || self.limit > MAX_LIMIT {
            failures.push(ValidationFailure::invalid_format(
                "limit",
                format!("must be between 1 and {MAX_LIMIT}"),
            ));
        }
        if self.offset < 0 {
            failures.push(ValidationFailure::invalid_format(
                "offset",
                "must be non-negative",
            ));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::validation(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_limit() {
        let page = PageParams { limit: 0, offset: 0 };
        assert!(page.validate().is_err());
    }

    #[test]
    fn rejects_limit_over_max() {
        let page = PageParams { limit: 1001, offset: 0 };
        assert!(page.validate().is_err());
    }

    #[test]
    fn rejects_negative_offset() {
        let page = PageParams { limit: 10, offset: -1 };
        assert!(page.validate().is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(PageParams { limit: 1, offset: 0 }.validate().is_ok());
        assert!(PageParams { limit: 1000, offset: 0 }.validate().is_ok());
    }
}
