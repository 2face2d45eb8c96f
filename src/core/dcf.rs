const IRR_LOWER_BOUND: f64 = -0.999;
const IRR_UPPER_BOUND: f64 = 10.0;
const IRR_MAX_ITERATIONS: u32 = 100;
const IRR_NPV_TOLERANCE: f64 = 1e-6;

pub fn npv(rate_percent: f64, cashflows: &[f64]) -> f64 {
    npv_at_rate(rate_percent / 100.0, cashflows)
}

fn npv_at_rate(rate: f64, cashflows: &[f64]) -> f64 {
    cashflows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

// None means the bounds do not bracket a sign change; that is a displayable
// "unavailable" outcome, not an error.
pub fn irr(cashflows: &[f64]) -> Option<f64> {
    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut npv_lo = npv_at_rate(lo, cashflows);
    let npv_hi = npv_at_rate(hi, cashflows);
    if !npv_lo.is_finite() || !npv_hi.is_finite() || npv_lo * npv_hi > 0.0 {
        return None;
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        let npv_mid = npv_at_rate(mid, cashflows);
        if npv_mid.abs() < IRR_NPV_TOLERANCE {
            return Some(mid);
        }
        if npv_lo * npv_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            npv_lo = npv_mid;
        }
    }
    Some((lo + hi) * 0.5)
}

pub fn real_irr(cashflows: &[f64], cpi: f64) -> Option<f64> {
    let deflator = 1.0 + cpi.max(0.0);
    let deflated: Vec<f64> = cashflows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / deflator.powi(t as i32))
        .collect();
    irr(&deflated)
}

// Operating payback: the caller passes flows before terminal sale proceeds are
// folded in, so a big exit never masks years of negative carry.
pub fn payback_year(operating_cashflows: &[f64]) -> Option<u32> {
    let mut running = 0.0;
    for (t, cf) in operating_cashflows.iter().enumerate() {
        running += cf;
        if t >= 1 && running >= 0.0 {
            return Some(t as u32);
        }
    }
    None
}
