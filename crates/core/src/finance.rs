//! Loan instalment arithmetic for listing price breakdowns.

use crate::error::{EstateError, EstateResult};
use serde::Serialize;

/// Equated monthly instalment breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Emi {
    pub monthly: f64,
    pub total_payable: f64,
    pub total_interest: f64,
}

/// `P·r·(1+r)^n / ((1+r)^n − 1)` with `r` the monthly rate.
///
/// A zero rate degenerates to `P / n`.
pub fn emi(principal: f64, annual_rate_percent: f64, months: u32) -> EstateResult<Emi> {
    if months == 0 {
        return Err(EstateError::InvalidInput("tenure must be at least one month".into()));
    }
    if !principal.is_finite() || principal < 0.0 {
        return Err(EstateError::InvalidInput(format!(
            "principal must be a non-negative amount, got {principal}"
        )));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(EstateError::InvalidInput(format!(
            "interest rate must be non-negative, got {annual_rate_percent}"
        )));
    }

    let n = f64::from(months);
    let r = annual_rate_percent / 12.0 / 100.0;
    let monthly = if r == 0.0 {
        principal / n
    } else {
        let growth = (1.0 + r).powf(n);
        principal * r * growth / (growth - 1.0)
    };
    let total_payable = monthly * n;

    Ok(Emi {
        monthly,
        total_payable,
        total_interest: total_payable - principal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn standard_home_loan() {
        // 50 lakh at 8.5% over 20 years.
        let e = emi(5_000_000.0, 8.5, 240).unwrap();
        assert!((e.monthly - 43_391.0).abs() < 1.0, "monthly = {}", e.monthly);
        assert!(close(e.total_interest, e.total_payable - 5_000_000.0));
    }

    #[test]
    fn zero_rate_is_straight_division() {
        let e = emi(12_000.0, 0.0, 12).unwrap();
        assert!(close(e.monthly, 1_000.0));
        assert!(close(e.total_interest, 0.0));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(emi(1_000.0, 5.0, 0).is_err());
        assert!(emi(-1.0, 5.0, 12).is_err());
        assert!(emi(1_000.0, -0.5, 12).is_err());
        assert!(emi(f64::NAN, 5.0, 12).is_err());
    }
}
