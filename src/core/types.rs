use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnalysisMode {
    OwnerOccupier,
    BuyToLet,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RepaymentType {
    Repayment,
    InterestOnly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuyerType {
    Standard,
    FirstTimeBuyer,
    Additional,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CgtRateMode {
    Flat18,
    Flat24,
    Blended,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DepositKind {
    PercentOfPrice,
    FixedAmount,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeeTreatment {
    Upfront,
    AddToLoan,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapexEvent {
    pub year: u32,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct ScenarioInputs {
    pub price: f64,
    pub deposit_kind: DepositKind,
    pub deposit_value: f64,
    pub product_fee: f64,
    pub fee_treatment: FeeTreatment,
    pub other_purchase_costs: f64,
    pub repayment_type: RepaymentType,
    pub apr_percent: f64,
    pub term_years: u32,
    pub hpi_growth: f64,
    pub rent_inflation: f64,
    pub cpi: f64,
    pub discount_rate_percent: f64,
    pub sell_at_end: bool,
    pub agent_fee: f64,
    pub agent_vat: f64,
    pub sale_legal_cost: f64,
    pub buyer_type: BuyerType,
    pub surcharge_refund: bool,
    pub cgt_rate_mode: CgtRateMode,
    pub cgt_allowance: f64,
    pub prr_on: bool,
    pub mode: AnalysisMode,
    pub owner_monthly_rent: f64,
    pub maintenance_pct_of_value: f64,
    pub service_charge: f64,
    pub insurance: f64,
    pub ground_rent: f64,
    pub monthly_rent: f64,
    pub voids: f64,
    pub management: f64,
    pub compliance_cost: f64,
    pub landlord_tax_band: f64,
    pub section24: bool,
    pub landlord_salary: f64,
    pub capex: Vec<CapexEvent>,
}

impl ScenarioInputs {
    // Invalid values are coerced rather than rejected: fractions clamp to their
    // domain, money floors at zero, the term floors at one year.
    pub fn normalized(mut self) -> Self {
        self.price = floor_money(self.price);
        self.deposit_value = match self.deposit_kind {
            DepositKind::PercentOfPrice => clamp_percent(self.deposit_value),
            DepositKind::FixedAmount => floor_money(self.deposit_value),
        };
        self.product_fee = floor_money(self.product_fee);
        self.other_purchase_costs = floor_money(self.other_purchase_costs);
        self.apr_percent = clamp_percent(self.apr_percent);
        self.term_years = self.term_years.max(1);
        self.hpi_growth = clamp_fraction(self.hpi_growth);
        self.rent_inflation = clamp_fraction(self.rent_inflation);
        self.cpi = clamp_fraction(self.cpi);
        self.discount_rate_percent = clamp_percent(self.discount_rate_percent);
        self.agent_fee = clamp_fraction(self.agent_fee);
        self.agent_vat = clamp_fraction(self.agent_vat);
        self.sale_legal_cost = floor_money(self.sale_legal_cost);
        self.cgt_allowance = floor_money(self.cgt_allowance);
        self.owner_monthly_rent = floor_money(self.owner_monthly_rent);
        self.maintenance_pct_of_value = clamp_fraction(self.maintenance_pct_of_value);
        self.service_charge = floor_money(self.service_charge);
        self.insurance = floor_money(self.insurance);
        self.ground_rent = floor_money(self.ground_rent);
        self.monthly_rent = floor_money(self.monthly_rent);
        self.voids = clamp_fraction(self.voids);
        self.management = clamp_fraction(self.management);
        self.compliance_cost = floor_money(self.compliance_cost);
        self.landlord_tax_band = clamp_fraction(self.landlord_tax_band);
        self.landlord_salary = floor_money(self.landlord_salary);
        for event in &mut self.capex {
            event.amount = floor_money(event.amount);
        }
        self
    }

    pub fn deposit_amount(&self) -> f64 {
        match self.deposit_kind {
            DepositKind::PercentOfPrice => self.price * self.deposit_value / 100.0,
            DepositKind::FixedAmount => self.deposit_value.min(self.price),
        }
    }

    pub fn deposit_percent(&self) -> f64 {
        match self.deposit_kind {
            DepositKind::PercentOfPrice => self.deposit_value,
            DepositKind::FixedAmount if self.price > 0.0 => {
                (self.deposit_value.min(self.price) / self.price) * 100.0
            }
            DepositKind::FixedAmount => 0.0,
        }
    }

    // A fee added to the loan raises the opening balance instead of the day-one
    // outlay; it is recovered through the larger redemption figure at sale.
    pub fn loan_amount(&self) -> f64 {
        let base = (self.price - self.deposit_amount()).max(0.0);
        match self.fee_treatment {
            FeeTreatment::AddToLoan => base + self.product_fee,
            FeeTreatment::Upfront => base,
        }
    }

    pub fn upfront_fee(&self) -> f64 {
        match self.fee_treatment {
            FeeTreatment::Upfront => self.product_fee,
            FeeTreatment::AddToLoan => 0.0,
        }
    }

    // Duplicate capex entries for the same year are summed.
    pub fn capex_in_year(&self, year: u32) -> f64 {
        self.capex
            .iter()
            .filter(|e| e.year == year)
            .map(|e| e.amount)
            .sum()
    }

    pub fn total_capex(&self) -> f64 {
        self.capex.iter().map(|e| e.amount).sum()
    }
}

fn floor_money(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationYear {
    pub year: u32,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub total_payment: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlYear {
    pub year: u32,
    pub collected_rent: f64,
    pub operating_costs: f64,
    pub noi: f64,
    pub interest: f64,
    pub total_payment: f64,
    pub tax: f64,
    pub capex: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstYearSummary {
    pub net_cash_after_tax: f64,
    pub incremental_tax: f64,
    pub section24_credit: f64,
    pub net_yield_on_price: f64,
    pub cash_on_cash: f64,
    pub cap_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub final_value: f64,
    pub selling_costs: f64,
    pub cgt: f64,
    pub redemption_balance: f64,
    pub net_proceeds: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year: u32,
    pub value: i64,
    pub debt_balance: i64,
    pub income: i64,
    pub opex: i64,
    pub interest: i64,
    pub principal: i64,
    pub tax: i64,
    pub capex: i64,
    pub net: i64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IrrBucket {
    Cold,
    Mid,
    Hot,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityGrid {
    pub row_axis: String,
    pub col_axis: String,
    pub row_values: Vec<f64>,
    pub col_values: Vec<f64>,
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub nominal_irr: Option<f64>,
    pub real_irr: Option<f64>,
    pub npv: f64,
    pub cash_invested: f64,
    pub sdlt: f64,
    pub loan_amount: f64,
    pub payback_year: Option<u32>,
    pub sale: Option<SaleOutcome>,
    pub held_equity: Option<f64>,
    pub cashflows: Vec<f64>,
    pub schedule: Vec<AmortizationYear>,
    pub pnl_years: Vec<PnlYear>,
    pub first_year: Option<FirstYearSummary>,
    pub growth_rent_grid: SensitivityGrid,
    pub rate_deposit_grid: SensitivityGrid,
    pub export_rows: Vec<YearRow>,
}
