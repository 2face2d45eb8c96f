use super::types::{AmortizationYear, RepaymentType};

pub fn amortize(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    repayment_type: RepaymentType,
) -> Vec<AmortizationYear> {
    let principal = principal.max(0.0);
    let term_years = term_years.max(1);
    let monthly_rate = annual_rate_percent.max(0.0) / 1200.0;
    let total_months = (term_years * 12) as f64;

    // Constant payment for the whole term; no mid-term rate change is modeled.
    let annuity_payment = if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(total_months);
        principal * (monthly_rate * growth) / (growth - 1.0)
    } else {
        principal / total_months
    };

    let mut balance = principal;
    let mut schedule = Vec::with_capacity(term_years as usize);
    for year in 1..=term_years {
        let mut interest_paid = 0.0;
        let mut principal_paid = 0.0;
        let mut total_payment = 0.0;
        for _ in 0..12 {
            let interest = balance * monthly_rate;
            let principal_component = match repayment_type {
                RepaymentType::InterestOnly => 0.0,
                RepaymentType::Repayment => (annuity_payment - interest).clamp(0.0, balance),
            };
            interest_paid += interest;
            principal_paid += principal_component;
            total_payment += interest + principal_component;
            balance = (balance - principal_component).max(0.0);
        }
        schedule.push(AmortizationYear {
            year,
            interest_paid,
            principal_paid,
            total_payment,
            ending_balance: balance,
        });
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn interest_only_annual_interest_matches_hand_calculation() {
        // 300k at 75% LTV -> 225k loan; 5.5% -> 12,375 interest = repayment
        let schedule = amortize(225_000.0, 5.5, 25, RepaymentType::InterestOnly);
        assert_eq!(schedule.len(), 25);
        let first = schedule[0];
        assert_approx_tol(first.interest_paid, 12_375.0, 1e-6);
        assert_approx_tol(first.total_payment, 12_375.0, 1e-6);
        assert_approx_tol(first.principal_paid, 0.0, 1e-12);
        assert_approx_tol(first.ending_balance, 225_000.0, 1e-9);
    }

    #[test]
    fn interest_only_balance_never_declines() {
        let schedule = amortize(180_000.0, 4.0, 30, RepaymentType::InterestOnly);
        for year in &schedule {
            assert_approx_tol(year.ending_balance, 180_000.0, 1e-9);
        }
    }

    #[test]
    fn repayment_schedule_retires_the_full_principal() {
        let principal = 225_000.0;
        let schedule = amortize(principal, 5.5, 25, RepaymentType::Repayment);
        assert_eq!(schedule.len(), 25);
        let repaid: f64 = schedule.iter().map(|y| y.principal_paid).sum();
        assert_approx_tol(repaid, principal, 0.01);
        assert_approx_tol(schedule.last().unwrap().ending_balance, 0.0, 0.01);
    }

    #[test]
    fn repayment_balance_follows_principal_recurrence() {
        let schedule = amortize(100_000.0, 6.0, 20, RepaymentType::Repayment);
        let mut balance = 100_000.0;
        for year in &schedule {
            balance = (balance - year.principal_paid).max(0.0);
            assert_approx_tol(year.ending_balance, balance, 1e-6);
        }
    }

    #[test]
    fn zero_rate_repayment_is_straight_line() {
        let schedule = amortize(120_000.0, 0.0, 10, RepaymentType::Repayment);
        for year in &schedule {
            assert_approx_tol(year.principal_paid, 12_000.0, 1e-6);
            assert_approx_tol(year.interest_paid, 0.0, 1e-12);
        }
        assert_approx_tol(schedule.last().unwrap().ending_balance, 0.0, 1e-6);
    }

    #[test]
    fn negative_rate_is_floored_at_zero() {
        let schedule = amortize(60_000.0, -3.0, 5, RepaymentType::Repayment);
        assert_approx_tol(schedule[0].interest_paid, 0.0, 1e-12);
        assert_approx_tol(schedule[0].principal_paid, 12_000.0, 1e-6);
    }

    proptest! {
        #[test]
        fn prop_schedule_length_equals_term(
            principal in 0u32..1_000_000,
            rate_bp in 0u32..1_500,
            term in 1u32..41,
        ) {
            let repay = amortize(principal as f64, rate_bp as f64 / 100.0, term, RepaymentType::Repayment);
            let io = amortize(principal as f64, rate_bp as f64 / 100.0, term, RepaymentType::InterestOnly);
            prop_assert!(repay.len() == term as usize);
            prop_assert!(io.len() == term as usize);
        }

        #[test]
        fn prop_repayment_principal_components_sum_to_principal(
            principal in 1u32..1_000_000,
            rate_bp in 0u32..1_500,
            term in 1u32..41,
        ) {
            let principal = principal as f64;
            let schedule = amortize(principal, rate_bp as f64 / 100.0, term, RepaymentType::Repayment);
            let repaid: f64 = schedule.iter().map(|y| y.principal_paid).sum();
            prop_assert!((repaid - principal).abs() <= principal * 1e-9 + 0.01);
            prop_assert!(schedule.last().unwrap().ending_balance.abs() <= principal * 1e-9 + 0.01);
        }

        #[test]
        fn prop_balances_are_non_negative_and_non_increasing(
            principal in 0u32..1_000_000,
            rate_bp in 0u32..1_500,
            term in 1u32..41,
        ) {
            let schedule = amortize(principal as f64, rate_bp as f64 / 100.0, term, RepaymentType::Repayment);
            let mut previous = principal as f64;
            for year in &schedule {
                prop_assert!(year.ending_balance >= 0.0);
                prop_assert!(year.ending_balance <= previous + 1e-9);
                previous = year.ending_balance;
            }
        }
    }
}
