//! Compound-interest projection for a lump sum plus a fixed monthly contribution.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentParams {
    pub initial_principal: f64,
    pub monthly_contribution: f64,
    pub annual_rate_percent: f64,
    pub years: u32,
}

impl Default for InvestmentParams {
    fn default() -> Self {
        Self {
            initial_principal: 5000.0,
            monthly_contribution: 500.0,
            annual_rate_percent: 7.0,
            years: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Value of the initial principal after compounding.
    pub fv_initial: f64,
    /// Value of the contribution stream after compounding.
    pub fv_contributions: f64,
    pub total: f64,
    pub total_invested: f64,
    pub interest_earned: f64,
    /// `total / total_invested`, or 0 when nothing was invested.
    pub growth_multiple: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearPoint {
    pub year: u32,
    pub total: f64,
    pub total_invested: f64,
}

pub fn compute_projection(params: &InvestmentParams) -> Projection {
    project_months(params, u64::from(params.years) * 12)
}

/// Most points [`yearly_balances`] returns, however long the horizon.
pub const MAX_CHART_POINTS: u32 = 100;

/// End-of-year balances across `1..=params.years`. Long horizons are sampled
/// at an even stride; the final year is always included.
pub fn yearly_balances(params: &InvestmentParams) -> Vec<YearPoint> {
    if params.years == 0 {
        return Vec::new();
    }
    let stride = params.years.div_ceil(MAX_CHART_POINTS);
    let mut years: Vec<u32> = (stride..=params.years).step_by(stride as usize).collect();
    if years.last() != Some(&params.years) {
        years.push(params.years);
    }

    years
        .into_iter()
        .map(|year| {
            let p = project_months(params, u64::from(year) * 12);
            YearPoint {
                year,
                total: p.total,
                total_invested: p.total_invested,
            }
        })
        .collect()
}

fn project_months(params: &InvestmentParams, months: u64) -> Projection {
    let r = monthly_rate(params.annual_rate_percent);
    let n = months as f64;
    let growth = compound_factor(r, months);
    let excess = compound_excess(r, months);

    let fv_initial = params.initial_principal * growth;
    let fv_contributions = if r == 0.0 || excess == 0.0 {
        params.monthly_contribution * n
    } else {
        params.monthly_contribution * excess / r
    };
    let total = fv_initial + fv_contributions;
    let total_invested = params.initial_principal + params.monthly_contribution * n;
    let growth_multiple = if total_invested == 0.0 {
        0.0
    } else {
        total / total_invested
    };

    Projection {
        fv_initial,
        fv_contributions,
        total,
        total_invested,
        interest_earned: total - total_invested,
        growth_multiple,
    }
}

pub(crate) fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// `n * ln(1 + r)`, or `None` when `1 + r` is not positive.
pub(crate) fn log_growth(r: f64, months: u64) -> Option<f64> {
    (r > -1.0).then(|| months as f64 * r.ln_1p())
}

/// `(1 + r)^n`.
pub(crate) fn compound_factor(r: f64, months: u64) -> f64 {
    match log_growth(r, months) {
        Some(x) => x.exp(),
        None => (1.0 + r).powf(months as f64),
    }
}

/// `(1 + r)^n - 1` without losing small rates to cancellation.
pub(crate) fn compound_excess(r: f64, months: u64) -> f64 {
    match log_growth(r, months) {
        Some(x) => x.exp_m1(),
        None => compound_factor(r, months) - 1.0,
    }
}
