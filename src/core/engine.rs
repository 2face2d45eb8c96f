use super::dcf;
use super::mortgage::amortize;
use super::tax;
use super::types::{
    AmortizationYear, AnalysisMode, DepositKind, FirstYearSummary, IrrBucket, PnlYear,
    ProjectionResult, SaleOutcome, ScenarioInputs, SensitivityGrid, YearRow,
};

const GROWTH_OFFSETS: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];
const RATE_OFFSETS: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];
const DEPOSIT_OFFSETS: [f64; 5] = [-10.0, -5.0, 0.0, 5.0, 10.0];

const BUCKET_COLD_BELOW: f64 = 0.02;
const BUCKET_HOT_FROM: f64 = 0.08;

#[derive(Debug, Clone, Copy)]
struct YearFlow {
    year: u32,
    value_end: f64,
    income: f64,
    opex: f64,
    interest: f64,
    principal: f64,
    total_payment: f64,
    tax: f64,
    capex: f64,
    net: f64,
    noi: f64,
}

#[derive(Debug)]
struct Projection {
    cashflows: Vec<f64>,
    operating_cashflows: Vec<f64>,
    years: Vec<YearFlow>,
    schedule: Vec<AmortizationYear>,
    cash_invested: f64,
    sdlt: f64,
    loan: f64,
    sale: Option<SaleOutcome>,
    held_equity: Option<f64>,
}

pub fn evaluate(inputs: &ScenarioInputs) -> ProjectionResult {
    let inputs = inputs.clone().normalized();
    let base = project(&inputs);

    let nominal_irr = dcf::irr(&base.cashflows);
    let real_irr = dcf::real_irr(&base.cashflows, inputs.cpi);
    let npv = dcf::npv(inputs.discount_rate_percent, &base.cashflows);
    let payback_year = dcf::payback_year(&base.operating_cashflows);

    let growth_rent_grid = growth_rent_grid(&inputs);
    let rate_deposit_grid = rate_deposit_grid(&inputs);

    let (pnl_years, first_year) = match inputs.mode {
        AnalysisMode::BuyToLet => (
            pnl_rows(&base),
            Some(first_year_summary(&inputs, &base)),
        ),
        AnalysisMode::OwnerOccupier => (Vec::new(), None),
    };

    ProjectionResult {
        nominal_irr,
        real_irr,
        npv,
        cash_invested: base.cash_invested,
        sdlt: base.sdlt,
        loan_amount: base.loan,
        payback_year,
        sale: base.sale,
        held_equity: base.held_equity,
        export_rows: export_rows(&base),
        cashflows: base.cashflows,
        schedule: base.schedule,
        pnl_years,
        first_year,
        growth_rent_grid,
        rate_deposit_grid,
    }
}

pub fn irr_bucket(irr: Option<f64>) -> IrrBucket {
    match irr {
        None => IrrBucket::Neutral,
        Some(r) if r < BUCKET_COLD_BELOW => IrrBucket::Cold,
        Some(r) if r < BUCKET_HOT_FROM => IrrBucket::Mid,
        Some(_) => IrrBucket::Hot,
    }
}

fn project(inputs: &ScenarioInputs) -> Projection {
    let sdlt = tax::compute_sdlt(inputs.price, inputs.buyer_type, inputs.surcharge_refund);
    let loan = inputs.loan_amount();
    let schedule = amortize(
        loan,
        inputs.apr_percent,
        inputs.term_years,
        inputs.repayment_type,
    );

    let cash_invested =
        inputs.deposit_amount() + inputs.other_purchase_costs + inputs.upfront_fee() + sdlt;

    let mut operating_cashflows = Vec::with_capacity(schedule.len() + 1);
    operating_cashflows.push(-cash_invested);
    let mut years = Vec::with_capacity(schedule.len());

    for debt_year in &schedule {
        let flow = project_year(inputs, debt_year);
        operating_cashflows.push(flow.net);
        years.push(flow);
    }

    let final_value = inputs.price * (1.0 + inputs.hpi_growth).powi(inputs.term_years as i32);
    let redemption_balance = schedule
        .last()
        .map(|y| y.ending_balance)
        .unwrap_or(loan);

    let mut cashflows = operating_cashflows.clone();
    let (sale, held_equity) = if inputs.sell_at_end {
        let agent_fee = final_value * inputs.agent_fee;
        let selling_costs = agent_fee + agent_fee * inputs.agent_vat + inputs.sale_legal_cost;
        let basis = inputs.price
            + sdlt
            + inputs.upfront_fee()
            + inputs.other_purchase_costs
            + inputs.total_capex();
        let cgt = tax::compute_cgt_on_sale(
            final_value,
            selling_costs,
            basis,
            inputs.prr_on,
            inputs.term_years as f64,
            inputs.cgt_rate_mode,
            inputs.cgt_allowance,
        );
        let net_proceeds = (final_value - selling_costs - redemption_balance - cgt).max(0.0);
        if let Some(last) = cashflows.last_mut() {
            *last += net_proceeds;
        }
        (
            Some(SaleOutcome {
                final_value,
                selling_costs,
                cgt,
                redemption_balance,
                net_proceeds,
            }),
            None,
        )
    } else {
        (None, Some(final_value - redemption_balance))
    };

    Projection {
        cashflows,
        operating_cashflows,
        years,
        schedule,
        cash_invested,
        sdlt,
        loan,
        sale,
        held_equity,
    }
}

fn project_year(inputs: &ScenarioInputs, debt_year: &AmortizationYear) -> YearFlow {
    let year = debt_year.year;
    let rent_growth = (1.0 + inputs.rent_inflation).powi(year as i32 - 1);
    let value_start = inputs.price * (1.0 + inputs.hpi_growth).powi(year as i32 - 1);
    let value_end = inputs.price * (1.0 + inputs.hpi_growth).powi(year as i32);
    let capex = inputs.capex_in_year(year);

    match inputs.mode {
        AnalysisMode::OwnerOccupier => {
            // Counterfactual rent saved against the full carrying cost of owning.
            // Principal repayments build equity, so they are not a cost here.
            let rent_saved = inputs.owner_monthly_rent * 12.0 * rent_growth;
            let upkeep = value_start * inputs.maintenance_pct_of_value
                + inputs.service_charge
                + inputs.insurance
                + inputs.ground_rent;
            let owning_cost = debt_year.interest_paid + upkeep;
            YearFlow {
                year,
                value_end,
                income: rent_saved,
                opex: upkeep,
                interest: debt_year.interest_paid,
                principal: debt_year.principal_paid,
                total_payment: debt_year.total_payment,
                tax: 0.0,
                capex,
                net: rent_saved - owning_cost - capex,
                noi: 0.0,
            }
        }
        AnalysisMode::BuyToLet => {
            let collected_rent =
                inputs.monthly_rent * 12.0 * rent_growth * (1.0 - inputs.voids);
            let operating_costs = collected_rent * inputs.management + inputs.compliance_cost;
            let noi = collected_rent - operating_costs;
            let tax = btl_tax(inputs, noi, debt_year.interest_paid);
            YearFlow {
                year,
                value_end,
                income: collected_rent,
                opex: operating_costs,
                interest: debt_year.interest_paid,
                principal: debt_year.principal_paid,
                total_payment: debt_year.total_payment,
                tax,
                capex,
                net: noi - debt_year.total_payment - tax - capex,
                noi,
            }
        }
    }
}

fn btl_tax(inputs: &ScenarioInputs, noi: f64, interest: f64) -> f64 {
    if inputs.section24 {
        let taxable_base = noi.max(0.0);
        let credit = 0.20 * interest.min(taxable_base);
        (taxable_base * inputs.landlord_tax_band - credit).max(0.0)
    } else {
        (noi - interest).max(0.0) * inputs.landlord_tax_band
    }
}

fn first_year_summary(inputs: &ScenarioInputs, projection: &Projection) -> FirstYearSummary {
    let Some(first) = projection.years.first() else {
        return FirstYearSummary {
            net_cash_after_tax: 0.0,
            incremental_tax: 0.0,
            section24_credit: 0.0,
            net_yield_on_price: 0.0,
            cash_on_cash: 0.0,
            cap_rate: 0.0,
        };
    };

    let baseline_tax = tax::income_tax(inputs.landlord_salary);
    let (incremental_tax, section24_credit) = if inputs.section24 {
        let profit = first.noi.max(0.0);
        let with_property = tax::income_tax(inputs.landlord_salary + profit);
        let credit = 0.20 * first.interest.min(profit).max(0.0);
        ((with_property - baseline_tax - credit).max(0.0), credit)
    } else {
        let profit = (first.noi - first.interest).max(0.0);
        let with_property = tax::income_tax(inputs.landlord_salary + profit);
        ((with_property - baseline_tax).max(0.0), 0.0)
    };

    let net_cash_after_tax = first.income - first.opex - first.total_payment - incremental_tax;
    let net_yield_on_price = if inputs.price > 0.0 {
        net_cash_after_tax / inputs.price
    } else {
        0.0
    };
    let cash_on_cash = if projection.cash_invested > 0.0 {
        net_cash_after_tax / projection.cash_invested
    } else {
        0.0
    };
    let cap_rate = if inputs.price > 0.0 {
        first.noi.max(0.0) / inputs.price
    } else {
        0.0
    };

    FirstYearSummary {
        net_cash_after_tax,
        incremental_tax,
        section24_credit,
        net_yield_on_price,
        cash_on_cash,
        cap_rate,
    }
}

fn pnl_rows(projection: &Projection) -> Vec<PnlYear> {
    projection
        .years
        .iter()
        .map(|y| PnlYear {
            year: y.year,
            collected_rent: y.income,
            operating_costs: y.opex,
            noi: y.noi,
            interest: y.interest,
            total_payment: y.total_payment,
            tax: y.tax,
            capex: y.capex,
            net: y.net,
        })
        .collect()
}

fn export_rows(projection: &Projection) -> Vec<YearRow> {
    projection
        .years
        .iter()
        .zip(&projection.schedule)
        .map(|(flow, debt)| YearRow {
            year: flow.year,
            value: to_whole(flow.value_end),
            debt_balance: to_whole(debt.ending_balance),
            income: to_whole(flow.income),
            opex: to_whole(flow.opex),
            interest: to_whole(flow.interest),
            principal: to_whole(flow.principal),
            tax: to_whole(flow.tax),
            capex: to_whole(flow.capex),
            net: to_whole(flow.net),
        })
        .collect()
}

fn to_whole(value: f64) -> i64 {
    value.round() as i64
}

fn cell_irr(inputs: &ScenarioInputs) -> Option<f64> {
    dcf::irr(&project(inputs).cashflows)
}

// Each cell is an independent full re-run with one perturbed pair; at 25 cells
// of O(term) arithmetic there is nothing worth caching.
fn growth_rent_grid(base: &ScenarioInputs) -> SensitivityGrid {
    let row_values: Vec<f64> = GROWTH_OFFSETS
        .iter()
        .map(|d| (base.hpi_growth * 100.0 + d).max(0.0))
        .collect();
    let col_values: Vec<f64> = GROWTH_OFFSETS
        .iter()
        .map(|d| (base.rent_inflation * 100.0 + d).max(0.0))
        .collect();

    let cells = row_values
        .iter()
        .map(|&growth| {
            col_values
                .iter()
                .map(|&rent_inflation| {
                    let mut perturbed = base.clone();
                    perturbed.hpi_growth = growth / 100.0;
                    perturbed.rent_inflation = rent_inflation / 100.0;
                    cell_irr(&perturbed)
                })
                .collect()
        })
        .collect();

    SensitivityGrid {
        row_axis: "hpiGrowthPercent".to_string(),
        col_axis: "rentInflationPercent".to_string(),
        row_values,
        col_values,
        cells,
    }
}

fn rate_deposit_grid(base: &ScenarioInputs) -> SensitivityGrid {
    let row_values: Vec<f64> = RATE_OFFSETS
        .iter()
        .map(|d| (base.apr_percent + d).max(0.0))
        .collect();
    let col_values: Vec<f64> = DEPOSIT_OFFSETS
        .iter()
        .map(|d| (base.deposit_percent() + d).clamp(0.0, 90.0))
        .collect();

    let cells = row_values
        .iter()
        .map(|&apr| {
            col_values
                .iter()
                .map(|&deposit_percent| {
                    let mut perturbed = base.clone();
                    perturbed.apr_percent = apr;
                    perturbed.deposit_kind = DepositKind::PercentOfPrice;
                    perturbed.deposit_value = deposit_percent;
                    cell_irr(&perturbed)
                })
                .collect()
        })
        .collect();

    SensitivityGrid {
        row_axis: "aprPercent".to_string(),
        col_axis: "depositPercent".to_string(),
        row_values,
        col_values,
        cells,
    }
}
