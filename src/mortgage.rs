use crate::projection::{compound_factor, log_growth, monthly_rate};
use chrono::{Local, Months, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortgageParams {
    pub home_price: f64,
    /// Expected to be at most `home_price`; not enforced.
    pub down_payment: f64,
    pub annual_rate_percent: f64,
    pub years: u32,
    pub custom_payment: Option<f64>,
    pub use_custom_payment: bool,
}

impl Default for MortgageParams {
    fn default() -> Self {
        Self {
            home_price: 350_000.0,
            down_payment: 70_000.0,
            annual_rate_percent: 6.5,
            years: 30,
            custom_payment: None,
            use_custom_payment: false,
        }
    }
}

impl MortgageParams {
    pub fn principal(&self) -> f64 {
        self.home_price - self.down_payment
    }

    pub fn term_months(&self) -> u32 {
        self.years.saturating_mul(12)
    }

    /// The override in effect, if any.
    pub fn active_custom_payment(&self) -> Option<f64> {
        if self.use_custom_payment {
            self.custom_payment.filter(|p| p.is_finite())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amortization {
    pub principal: f64,
    /// Payment from the amortization formula, before any override.
    pub formula_payment: f64,
    pub monthly_payment: f64,
    /// True when an enabled custom payment replaced the formula payment.
    pub custom_payment_active: bool,
    pub total_paid: f64,
    pub total_interest: f64,
    pub payoff_date: NaiveDate,
    /// Average principal share of one payment, `monthly_payment * principal / total_paid`.
    pub principal_portion: f64,
    /// Average interest share of one payment, `monthly_payment * total_interest / total_paid`.
    pub interest_portion: f64,
}

impl Amortization {
    pub fn uses_custom_payment(&self) -> bool {
        self.custom_payment_active
    }
}

pub fn compute_amortization(params: &MortgageParams) -> Amortization {
    amortize_from(params, Local::now().naive_local().date())
}

pub fn amortize_from(params: &MortgageParams, start: NaiveDate) -> Amortization {
    let principal = params.principal();
    let months = params.term_months();
    let formula_payment = formula_payment(principal, params.annual_rate_percent, months);
    let custom_payment = params.active_custom_payment();
    let monthly_payment = custom_payment.unwrap_or(formula_payment);

    let n = f64::from(months);
    let total_paid = monthly_payment * n;
    let total_interest = total_paid - principal;

    // Not a per-month schedule row: the split is the lifetime ratio applied to one payment.
    let (principal_portion, interest_portion) = if total_paid == 0.0 {
        (0.0, 0.0)
    } else {
        (
            monthly_payment * (principal / total_paid),
            monthly_payment * (total_interest / total_paid),
        )
    };

    Amortization {
        principal,
        formula_payment,
        monthly_payment,
        custom_payment_active: custom_payment.is_some(),
        total_paid,
        total_interest,
        payoff_date: payoff_date(start, months),
        principal_portion,
        interest_portion,
    }
}

/// Level payment that retires `principal` over `months` at the given annual rate.
pub fn formula_payment(principal: f64, annual_rate_percent: f64, months: u32) -> f64 {
    if months == 0 {
        return 0.0;
    }
    let r = monthly_rate(annual_rate_percent);
    if r == 0.0 {
        return principal / f64::from(months);
    }
    // r(1+r)^n / ((1+r)^n - 1) rewritten as r / (1 - (1+r)^-n) so tiny rates
    // don't cancel and huge ones don't overflow.
    let discount = match log_growth(r, u64::from(months)) {
        Some(x) => -(-x).exp_m1(),
        None => {
            let growth = compound_factor(r, u64::from(months));
            (growth - 1.0) / growth
        }
    };
    if discount == 0.0 || !discount.is_finite() {
        return principal / f64::from(months);
    }
    principal * r / discount
}

/// `start` moved forward by `months` calendar months; day clamps to the end of shorter months.
pub fn payoff_date(start: NaiveDate, months: u32) -> NaiveDate {
    start.checked_add_months(Months::new(months)).unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn default_mortgage_matches_known_values() {
        let start = date(2024, 3, 15);
        let a = amortize_from(&MortgageParams::default(), start);
        assert_eq!(a.principal, 280_000.0);
        assert_approx_tol(a.monthly_payment, 1769.79, 0.01);
        assert_approx_tol(a.total_paid, 637_124.57, 0.05);
        assert_approx_tol(a.total_interest, 357_124.57, 0.05);
        assert_eq!(a.payoff_date, date(2054, 3, 15));
        assert!(!a.uses_custom_payment());
    }

    #[test]
    fn split_uses_lifetime_ratio() {
        let a = amortize_from(&MortgageParams::default(), date(2024, 1, 1));
        // 280000 / 360 payments.
        assert_approx_tol(a.principal_portion, 280_000.0 / 360.0, 1e-6);
        assert_approx_tol(a.principal_portion + a.interest_portion, a.monthly_payment, 1e-6);
    }

    #[test]
    fn zero_rate_divides_principal_evenly() {
        let params = MortgageParams {
            home_price: 240_000.0,
            down_payment: 0.0,
            annual_rate_percent: 0.0,
            years: 20,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        assert_eq!(a.monthly_payment, 240_000.0 / 240.0);
        assert_eq!(a.total_interest, 0.0);
        assert_eq!(a.interest_portion, 0.0);
    }

    #[test]
    fn enabled_override_replaces_payment() {
        let params = MortgageParams {
            custom_payment: Some(2500.0),
            use_custom_payment: true,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        assert_eq!(a.monthly_payment, 2500.0);
        assert_eq!(a.total_paid, 2500.0 * 360.0);
        assert_eq!(a.total_interest, 2500.0 * 360.0 - 280_000.0);
        assert!(a.uses_custom_payment());
        assert_approx_tol(a.formula_payment, 1769.79, 0.01);
    }

    #[test]
    fn override_equal_to_formula_still_counts_as_custom() {
        let base = amortize_from(&MortgageParams::default(), date(2024, 1, 1));
        let params = MortgageParams {
            custom_payment: Some(base.formula_payment),
            use_custom_payment: true,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        assert_eq!(a.monthly_payment, base.monthly_payment);
        assert!(a.uses_custom_payment());
        assert!(!base.uses_custom_payment());
    }

    #[test]
    fn tiny_rate_stays_finite() {
        let params = MortgageParams {
            annual_rate_percent: 1e-15,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        assert_approx_tol(a.monthly_payment, 280_000.0 / 360.0, 1e-6);
        assert_approx_tol(a.total_interest, 0.0, 1e-6);
        assert!(a.principal_portion.is_finite());
        assert!(a.interest_portion.is_finite());
        assert_approx_tol(a.principal_portion, 280_000.0 / 360.0, 1e-6);
    }

    #[test]
    fn huge_rate_stays_finite() {
        let params = MortgageParams {
            annual_rate_percent: 50_000.0,
            years: 40,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        // Interest-only in the limit: principal * monthly rate.
        assert_approx_tol(a.monthly_payment, 280_000.0 * 50_000.0 / 100.0 / 12.0, 1e-3);
        assert!(a.total_interest.is_finite());
        assert!(a.interest_portion.is_finite());
    }

    #[test]
    fn disabled_or_missing_override_is_ignored() {
        let disabled = MortgageParams {
            custom_payment: Some(2500.0),
            use_custom_payment: false,
            ..MortgageParams::default()
        };
        let missing = MortgageParams {
            custom_payment: None,
            use_custom_payment: true,
            ..MortgageParams::default()
        };
        let start = date(2024, 1, 1);
        let base = amortize_from(&MortgageParams::default(), start);
        assert_eq!(amortize_from(&disabled, start), base);
        assert_eq!(amortize_from(&missing, start), base);
    }

    #[test]
    fn negative_principal_propagates() {
        let params = MortgageParams {
            home_price: 100_000.0,
            down_payment: 150_000.0,
            ..MortgageParams::default()
        };
        let a = amortize_from(&params, date(2024, 1, 1));
        assert_eq!(a.principal, -50_000.0);
        assert!(a.monthly_payment < 0.0);
    }

    #[test]
    fn zero_term_pays_nothing() {
        let params = MortgageParams {
            years: 0,
            ..MortgageParams::default()
        };
        let start = date(2024, 6, 30);
        let a = amortize_from(&params, start);
        assert_eq!(a.monthly_payment, 0.0);
        assert_eq!(a.total_paid, 0.0);
        assert_eq!(a.principal_portion, 0.0);
        assert_eq!(a.payoff_date, start);
    }

    #[test]
    fn payoff_date_clamps_day_of_month() {
        assert_eq!(payoff_date(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(payoff_date(date(2023, 11, 15), 14), date(2025, 1, 15));
        assert_eq!(payoff_date(date(2024, 2, 29), 12), date(2025, 2, 28));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_payoff_keeps_month_and_adds_years(
            year in 1950i32..2100,
            month in 1u32..13,
            day in 1u32..29,
            years in 0u32..50
        ) {
            let start = date(year, month, day);
            let end = payoff_date(start, years * 12);
            prop_assert_eq!(end.year(), year + years as i32);
            prop_assert_eq!(end.month(), month);
            prop_assert_eq!(end.day(), day);
        }

        #[test]
        fn prop_payment_and_split_are_never_nan(
            price in 0u32..2_000_000,
            down in 0u32..2_000_000,
            rate_exp in -20i32..5,
            rate_mantissa in 1u32..1000,
            negative in proptest::bool::ANY,
            years in 1u32..50
        ) {
            let rate = rate_mantissa as f64 * 10f64.powi(rate_exp);
            let params = MortgageParams {
                home_price: price as f64,
                down_payment: down as f64,
                annual_rate_percent: if negative { -rate.min(99.0) } else { rate },
                years,
                ..MortgageParams::default()
            };
            let a = amortize_from(&params, date(2024, 1, 1));
            prop_assert!(a.monthly_payment.is_finite());
            prop_assert!(a.total_interest.is_finite());
            prop_assert!(!a.principal_portion.is_nan());
            prop_assert!(!a.interest_portion.is_nan());
        }

        #[test]
        fn prop_zero_rate_has_no_interest(
            price in 1u32..2_000_000,
            down_pct in 0u32..100,
            years in 1u32..40
        ) {
            let price = price as f64;
            let params = MortgageParams {
                home_price: price,
                down_payment: (price * down_pct as f64 / 100.0).floor(),
                annual_rate_percent: 0.0,
                years,
                ..MortgageParams::default()
            };
            let a = amortize_from(&params, date(2024, 1, 1));
            prop_assert_eq!(a.monthly_payment, params.principal() / (years as f64 * 12.0));
            prop_assert!(a.total_interest.abs() < 1e-6);
        }
    }
}
