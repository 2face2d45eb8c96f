mod dcf;
mod engine;
mod mortgage;
mod tax;
mod types;

pub use dcf::{irr, npv, payback_year, real_irr};
pub use engine::{evaluate, irr_bucket};
pub use mortgage::amortize;
pub use tax::{compute_cgt_on_sale, compute_sdlt, income_tax, personal_allowance};
pub use types::{
    AmortizationYear, AnalysisMode, BuyerType, CapexEvent, CgtRateMode, DepositKind, FeeTreatment,
    FirstYearSummary, IrrBucket, PnlYear, ProjectionResult, RepaymentType, SaleOutcome,
    ScenarioInputs, SensitivityGrid, YearRow,
};
