use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AnalysisMode, BuyerType, CapexEvent, CgtRateMode, DepositKind, FeeTreatment, IrrBucket,
    ProjectionResult, RepaymentType, ScenarioInputs, YearRow, evaluate, irr_bucket,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAnalysisMode {
    OwnerOccupier,
    BuyToLet,
}

impl From<CliAnalysisMode> for AnalysisMode {
    fn from(value: CliAnalysisMode) -> Self {
        match value {
            CliAnalysisMode::OwnerOccupier => AnalysisMode::OwnerOccupier,
            CliAnalysisMode::BuyToLet => AnalysisMode::BuyToLet,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRepaymentType {
    Repayment,
    InterestOnly,
}

impl From<CliRepaymentType> for RepaymentType {
    fn from(value: CliRepaymentType) -> Self {
        match value {
            CliRepaymentType::Repayment => RepaymentType::Repayment,
            CliRepaymentType::InterestOnly => RepaymentType::InterestOnly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliBuyerType {
    Standard,
    FirstTimeBuyer,
    Additional,
}

impl From<CliBuyerType> for BuyerType {
    fn from(value: CliBuyerType) -> Self {
        match value {
            CliBuyerType::Standard => BuyerType::Standard,
            CliBuyerType::FirstTimeBuyer => BuyerType::FirstTimeBuyer,
            CliBuyerType::Additional => BuyerType::Additional,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCgtRateMode {
    Flat18,
    Flat24,
    Blended,
}

impl From<CliCgtRateMode> for CgtRateMode {
    fn from(value: CliCgtRateMode) -> Self {
        match value {
            CliCgtRateMode::Flat18 => CgtRateMode::Flat18,
            CliCgtRateMode::Flat24 => CgtRateMode::Flat24,
            CliCgtRateMode::Blended => CgtRateMode::Blended,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDepositKind {
    PercentOfPrice,
    FixedAmount,
}

impl From<CliDepositKind> for DepositKind {
    fn from(value: CliDepositKind) -> Self {
        match value {
            CliDepositKind::PercentOfPrice => DepositKind::PercentOfPrice,
            CliDepositKind::FixedAmount => DepositKind::FixedAmount,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFeeTreatment {
    Upfront,
    AddToLoan,
}

impl From<CliFeeTreatment> for FeeTreatment {
    fn from(value: CliFeeTreatment) -> Self {
        match value {
            CliFeeTreatment::Upfront => FeeTreatment::Upfront,
            CliFeeTreatment::AddToLoan => FeeTreatment::AddToLoan,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAnalysisMode {
    #[serde(alias = "owner", alias = "ownerOccupier", alias = "owner_occupier")]
    OwnerOccupier,
    #[serde(alias = "btl", alias = "buyToLet", alias = "buy_to_let")]
    BuyToLet,
}

impl From<ApiAnalysisMode> for CliAnalysisMode {
    fn from(value: ApiAnalysisMode) -> Self {
        match value {
            ApiAnalysisMode::OwnerOccupier => CliAnalysisMode::OwnerOccupier,
            ApiAnalysisMode::BuyToLet => CliAnalysisMode::BuyToLet,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRepaymentType {
    Repayment,
    #[serde(alias = "interestOnly", alias = "interest_only")]
    InterestOnly,
}

impl From<ApiRepaymentType> for CliRepaymentType {
    fn from(value: ApiRepaymentType) -> Self {
        match value {
            ApiRepaymentType::Repayment => CliRepaymentType::Repayment,
            ApiRepaymentType::InterestOnly => CliRepaymentType::InterestOnly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiBuyerType {
    Standard,
    #[serde(alias = "firstTimeBuyer", alias = "first_time_buyer", alias = "ftb")]
    FirstTimeBuyer,
    Additional,
}

impl From<ApiBuyerType> for CliBuyerType {
    fn from(value: ApiBuyerType) -> Self {
        match value {
            ApiBuyerType::Standard => CliBuyerType::Standard,
            ApiBuyerType::FirstTimeBuyer => CliBuyerType::FirstTimeBuyer,
            ApiBuyerType::Additional => CliBuyerType::Additional,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCgtRateMode {
    #[serde(alias = "flat-18")]
    Flat18,
    #[serde(alias = "flat-24")]
    Flat24,
    Blended,
}

impl From<ApiCgtRateMode> for CliCgtRateMode {
    fn from(value: ApiCgtRateMode) -> Self {
        match value {
            ApiCgtRateMode::Flat18 => CliCgtRateMode::Flat18,
            ApiCgtRateMode::Flat24 => CliCgtRateMode::Flat24,
            ApiCgtRateMode::Blended => CliCgtRateMode::Blended,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDepositKind {
    #[serde(alias = "percent", alias = "percentOfPrice", alias = "percent_of_price")]
    PercentOfPrice,
    #[serde(alias = "amount", alias = "fixedAmount", alias = "fixed_amount")]
    FixedAmount,
}

impl From<ApiDepositKind> for CliDepositKind {
    fn from(value: ApiDepositKind) -> Self {
        match value {
            ApiDepositKind::PercentOfPrice => CliDepositKind::PercentOfPrice,
            ApiDepositKind::FixedAmount => CliDepositKind::FixedAmount,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFeeTreatment {
    Upfront,
    #[serde(alias = "addToLoan", alias = "add_to_loan", alias = "financed")]
    AddToLoan,
}

impl From<ApiFeeTreatment> for CliFeeTreatment {
    fn from(value: ApiFeeTreatment) -> Self {
        match value {
            ApiFeeTreatment::Upfront => CliFeeTreatment::Upfront,
            ApiFeeTreatment::AddToLoan => CliFeeTreatment::AddToLoan,
        }
    }
}

fn parse_capex_event(raw: &str) -> Result<CapexEvent, String> {
    let (year, amount) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected YEAR:AMOUNT, got '{raw}'"))?;
    let year = year
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid capex year '{year}': {e}"))?;
    let amount = amount
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid capex amount '{amount}': {e}"))?;
    Ok(CapexEvent { year, amount })
}

#[derive(Parser, Debug)]
#[command(
    name = "brick",
    about = "UK property purchase analyser (owner cost-of-ownership vs buy-to-let, IRR/NPV and sensitivity heatmaps)"
)]
struct Cli {
    #[arg(long, default_value_t = 300_000.0)]
    price: f64,
    #[arg(long, value_enum, default_value_t = CliDepositKind::PercentOfPrice)]
    deposit_type: CliDepositKind,
    #[arg(
        long,
        default_value_t = 25.0,
        help = "Deposit as percent of price, or a fixed amount with --deposit-type=fixed-amount"
    )]
    deposit_value: f64,
    #[arg(long, default_value_t = 0.0, help = "Mortgage product fee")]
    product_fee: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliFeeTreatment::Upfront,
        help = "Pay the product fee upfront or add it to the loan"
    )]
    fee_treatment: CliFeeTreatment,
    #[arg(long, default_value_t = 3_000.0, help = "Legal, survey and other one-off purchase costs")]
    other_purchase_costs: f64,
    #[arg(long, value_enum, default_value_t = CliRepaymentType::InterestOnly)]
    repayment_type: CliRepaymentType,
    #[arg(long, default_value_t = 5.5, help = "Mortgage APR in percent")]
    apr: f64,
    #[arg(long, default_value_t = 25)]
    term_years: u32,
    #[arg(long, default_value_t = 3.0, help = "House price growth in percent per year")]
    hpi_growth: f64,
    #[arg(long, default_value_t = 3.0, help = "Rent inflation in percent per year")]
    rent_inflation: f64,
    #[arg(long, default_value_t = 2.5, help = "CPI in percent, used to deflate the real IRR")]
    cpi: f64,
    #[arg(long, default_value_t = 5.0, help = "Discount rate in percent for NPV")]
    discount_rate: f64,
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = true,
        help = "Model a sale at the end of the term"
    )]
    sell_at_end: bool,
    #[arg(long, default_value_t = 1.5, help = "Estate agent fee in percent of sale price")]
    agent_fee_percent: f64,
    #[arg(long, default_value_t = 20.0, help = "VAT on the agent fee in percent")]
    agent_vat_percent: f64,
    #[arg(long, default_value_t = 1_500.0)]
    sale_legal_cost: f64,
    #[arg(long, value_enum, default_value_t = CliBuyerType::Additional)]
    buyer_type: CliBuyerType,
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = false,
        help = "Model reclaiming the 3% additional-property surcharge"
    )]
    surcharge_refund: bool,
    #[arg(long, value_enum, default_value_t = CliCgtRateMode::Blended)]
    cgt_rate_mode: CliCgtRateMode,
    #[arg(long, default_value_t = 3_000.0, help = "Annual CGT allowance at disposal")]
    cgt_allowance: f64,
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = false,
        help = "Apply private residence relief to the capital gain"
    )]
    prr: bool,
    #[arg(long, value_enum, default_value_t = CliAnalysisMode::BuyToLet)]
    mode: CliAnalysisMode,
    #[arg(
        long,
        default_value_t = 1_300.0,
        help = "Owner mode: rent currently paid per month (the counterfactual)"
    )]
    owner_monthly_rent: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Owner mode: annual maintenance in percent of property value"
    )]
    maintenance_percent: f64,
    #[arg(long, default_value_t = 1_200.0)]
    service_charge: f64,
    #[arg(long, default_value_t = 300.0)]
    insurance: f64,
    #[arg(long, default_value_t = 0.0)]
    ground_rent: f64,
    #[arg(long, default_value_t = 1_750.0, help = "BTL mode: monthly rent charged")]
    monthly_rent: f64,
    #[arg(long, default_value_t = 5.0, help = "Void periods in percent of the year")]
    voids_percent: f64,
    #[arg(long, default_value_t = 10.0, help = "Letting management fee in percent of collected rent")]
    management_percent: f64,
    #[arg(long, default_value_t = 300.0, help = "Annual safety and compliance spend")]
    compliance_cost: f64,
    #[arg(long, default_value_t = 40.0, help = "Landlord marginal income tax band in percent")]
    landlord_tax_band: f64,
    #[arg(
        long,
        action = ArgAction::Set,
        default_value_t = true,
        help = "Section 24 regime: 20% interest credit instead of full deductibility"
    )]
    section24: bool,
    #[arg(long, default_value_t = 60_000.0, help = "Landlord salary, used by the first-year tax view")]
    landlord_salary: f64,
    #[arg(
        long = "capex",
        value_parser = parse_capex_event,
        help = "One-off capital expense as YEAR:AMOUNT; repeat for multiple events"
    )]
    capex: Vec<CapexEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EvaluatePayload {
    price: Option<f64>,
    deposit_type: Option<ApiDepositKind>,
    deposit_value: Option<f64>,
    product_fee: Option<f64>,
    fee_treatment: Option<ApiFeeTreatment>,
    other_purchase_costs: Option<f64>,
    repayment_type: Option<ApiRepaymentType>,
    apr: Option<f64>,
    term_years: Option<u32>,
    hpi_growth: Option<f64>,
    rent_inflation: Option<f64>,
    cpi: Option<f64>,
    discount_rate: Option<f64>,
    sell_at_end: Option<bool>,
    agent_fee_percent: Option<f64>,
    agent_vat_percent: Option<f64>,
    sale_legal_cost: Option<f64>,
    buyer_type: Option<ApiBuyerType>,
    surcharge_refund: Option<bool>,
    cgt_rate_mode: Option<ApiCgtRateMode>,
    cgt_allowance: Option<f64>,
    prr: Option<bool>,
    mode: Option<ApiAnalysisMode>,
    owner_monthly_rent: Option<f64>,
    maintenance_percent: Option<f64>,
    service_charge: Option<f64>,
    insurance: Option<f64>,
    ground_rent: Option<f64>,
    monthly_rent: Option<f64>,
    voids_percent: Option<f64>,
    management_percent: Option<f64>,
    compliance_cost: Option<f64>,
    landlord_tax_band: Option<f64>,
    section24: Option<bool>,
    landlord_salary: Option<f64>,
    capex_events: Option<Vec<CapexEvent>>,
}

fn build_inputs(cli: Cli) -> ScenarioInputs {
    ScenarioInputs {
        price: cli.price,
        deposit_kind: cli.deposit_type.into(),
        deposit_value: cli.deposit_value,
        product_fee: cli.product_fee,
        fee_treatment: cli.fee_treatment.into(),
        other_purchase_costs: cli.other_purchase_costs,
        repayment_type: cli.repayment_type.into(),
        apr_percent: cli.apr,
        term_years: cli.term_years,
        hpi_growth: cli.hpi_growth / 100.0,
        rent_inflation: cli.rent_inflation / 100.0,
        cpi: cli.cpi / 100.0,
        discount_rate_percent: cli.discount_rate,
        sell_at_end: cli.sell_at_end,
        agent_fee: cli.agent_fee_percent / 100.0,
        agent_vat: cli.agent_vat_percent / 100.0,
        sale_legal_cost: cli.sale_legal_cost,
        buyer_type: cli.buyer_type.into(),
        surcharge_refund: cli.surcharge_refund,
        cgt_rate_mode: cli.cgt_rate_mode.into(),
        cgt_allowance: cli.cgt_allowance,
        prr_on: cli.prr,
        mode: cli.mode.into(),
        owner_monthly_rent: cli.owner_monthly_rent,
        maintenance_pct_of_value: cli.maintenance_percent / 100.0,
        service_charge: cli.service_charge,
        insurance: cli.insurance,
        ground_rent: cli.ground_rent,
        monthly_rent: cli.monthly_rent,
        voids: cli.voids_percent / 100.0,
        management: cli.management_percent / 100.0,
        compliance_cost: cli.compliance_cost,
        landlord_tax_band: cli.landlord_tax_band / 100.0,
        section24: cli.section24,
        landlord_salary: cli.landlord_salary,
        capex: cli.capex,
    }
}

fn default_cli() -> Cli {
    Cli::parse_from(["brick"])
}

fn inputs_from_payload(payload: EvaluatePayload) -> ScenarioInputs {
    let mut cli = default_cli();

    if let Some(v) = payload.price {
        cli.price = v;
    }
    if let Some(v) = payload.deposit_type {
        cli.deposit_type = v.into();
    }
    if let Some(v) = payload.deposit_value {
        cli.deposit_value = v;
    }
    if let Some(v) = payload.product_fee {
        cli.product_fee = v;
    }
    if let Some(v) = payload.fee_treatment {
        cli.fee_treatment = v.into();
    }
    if let Some(v) = payload.other_purchase_costs {
        cli.other_purchase_costs = v;
    }
    if let Some(v) = payload.repayment_type {
        cli.repayment_type = v.into();
    }
    if let Some(v) = payload.apr {
        cli.apr = v;
    }
    if let Some(v) = payload.term_years {
        cli.term_years = v;
    }
    if let Some(v) = payload.hpi_growth {
        cli.hpi_growth = v;
    }
    if let Some(v) = payload.rent_inflation {
        cli.rent_inflation = v;
    }
    if let Some(v) = payload.cpi {
        cli.cpi = v;
    }
    if let Some(v) = payload.discount_rate {
        cli.discount_rate = v;
    }
    if let Some(v) = payload.sell_at_end {
        cli.sell_at_end = v;
    }
    if let Some(v) = payload.agent_fee_percent {
        cli.agent_fee_percent = v;
    }
    if let Some(v) = payload.agent_vat_percent {
        cli.agent_vat_percent = v;
    }
    if let Some(v) = payload.sale_legal_cost {
        cli.sale_legal_cost = v;
    }
    if let Some(v) = payload.buyer_type {
        cli.buyer_type = v.into();
    }
    if let Some(v) = payload.surcharge_refund {
        cli.surcharge_refund = v;
    }
    if let Some(v) = payload.cgt_rate_mode {
        cli.cgt_rate_mode = v.into();
    }
    if let Some(v) = payload.cgt_allowance {
        cli.cgt_allowance = v;
    }
    if let Some(v) = payload.prr {
        cli.prr = v;
    }
    if let Some(v) = payload.mode {
        cli.mode = v.into();
    }
    if let Some(v) = payload.owner_monthly_rent {
        cli.owner_monthly_rent = v;
    }
    if let Some(v) = payload.maintenance_percent {
        cli.maintenance_percent = v;
    }
    if let Some(v) = payload.service_charge {
        cli.service_charge = v;
    }
    if let Some(v) = payload.insurance {
        cli.insurance = v;
    }
    if let Some(v) = payload.ground_rent {
        cli.ground_rent = v;
    }
    if let Some(v) = payload.monthly_rent {
        cli.monthly_rent = v;
    }
    if let Some(v) = payload.voids_percent {
        cli.voids_percent = v;
    }
    if let Some(v) = payload.management_percent {
        cli.management_percent = v;
    }
    if let Some(v) = payload.compliance_cost {
        cli.compliance_cost = v;
    }
    if let Some(v) = payload.landlord_tax_band {
        cli.landlord_tax_band = v;
    }
    if let Some(v) = payload.section24 {
        cli.section24 = v;
    }
    if let Some(v) = payload.landlord_salary {
        cli.landlord_salary = v;
    }
    if let Some(v) = payload.capex_events {
        cli.capex = v;
    }

    build_inputs(cli)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    #[serde(flatten)]
    result: ProjectionResult,
    growth_rent_buckets: Vec<Vec<IrrBucket>>,
    rate_deposit_buckets: Vec<Vec<IrrBucket>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_evaluate_response(result: ProjectionResult) -> EvaluateResponse {
    let bucketize = |cells: &Vec<Vec<Option<f64>>>| {
        cells
            .iter()
            .map(|row| row.iter().map(|cell| irr_bucket(*cell)).collect())
            .collect()
    };
    EvaluateResponse {
        growth_rent_buckets: bucketize(&result.growth_rent_grid.cells),
        rate_deposit_buckets: bucketize(&result.rate_deposit_grid.cells),
        result,
    }
}

fn render_export_csv(rows: &[YearRow]) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| format!("CSV encode failed: {e}"))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| format!("CSV flush failed: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("CSV was not UTF-8: {e}"))
}

pub fn run_cli() {
    let cli = Cli::parse();
    let inputs = build_inputs(cli);
    let response = build_evaluate_response(evaluate(&inputs));
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize result: {e}");
            std::process::exit(1);
        }
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .route("/api/export.csv", get(export_csv_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("brick HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(Query(payload): Query<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload)
}

async fn evaluate_post_handler(Json(payload): Json<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload)
}

fn evaluate_handler_impl(payload: EvaluatePayload) -> Response {
    let inputs = inputs_from_payload(payload);
    let response = build_evaluate_response(evaluate(&inputs));
    json_response(StatusCode::OK, response)
}

async fn export_csv_handler(Query(payload): Query<EvaluatePayload>) -> Response {
    let inputs = inputs_from_payload(payload);
    let result = evaluate(&inputs);
    match render_export_csv(&result.export_rows) {
        Ok(csv_body) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"projection.csv\"",
                ),
            ],
            csv_body,
        )),
        Err(msg) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn inputs_from_json(json: &str) -> ScenarioInputs {
        let payload =
            serde_json::from_str::<EvaluatePayload>(json).expect("payload should parse");
        inputs_from_payload(payload)
    }

    #[test]
    fn default_cli_matches_the_reference_scenario() {
        let inputs = build_inputs(default_cli());
        assert_approx(inputs.price, 300_000.0);
        assert_approx(inputs.deposit_value, 25.0);
        assert_approx(inputs.apr_percent, 5.5);
        assert_eq!(inputs.term_years, 25);
        assert_eq!(inputs.repayment_type, RepaymentType::InterestOnly);
        assert_eq!(inputs.buyer_type, BuyerType::Additional);
        assert_eq!(inputs.mode, AnalysisMode::BuyToLet);
        assert_approx(inputs.monthly_rent, 1_750.0);
        assert_approx(inputs.voids, 0.05);
        assert_approx(inputs.management, 0.10);
        assert!(inputs.section24);
        assert!(inputs.sell_at_end);
    }

    #[test]
    fn percent_flags_are_converted_to_fractions() {
        let inputs = build_inputs(default_cli());
        assert_approx(inputs.hpi_growth, 0.03);
        assert_approx(inputs.rent_inflation, 0.03);
        assert_approx(inputs.cpi, 0.025);
        assert_approx(inputs.agent_fee, 0.015);
        assert_approx(inputs.agent_vat, 0.20);
        assert_approx(inputs.landlord_tax_band, 0.40);
        assert_approx(inputs.maintenance_pct_of_value, 0.01);
    }

    #[test]
    fn payload_overrides_map_web_keys() {
        let inputs = inputs_from_json(
            r#"{
              "price": 450000,
              "depositType": "fixed-amount",
              "depositValue": 90000,
              "repaymentType": "repayment",
              "apr": 4.25,
              "termYears": 30,
              "mode": "owner-occupier",
              "buyerType": "first-time-buyer",
              "feeTreatment": "add-to-loan",
              "productFee": 999,
              "cgtRateMode": "flat24",
              "sellAtEnd": false,
              "ownerMonthlyRent": 1600,
              "capexEvents": [{"year": 4, "amount": 8000}]
            }"#,
        );
        assert_approx(inputs.price, 450_000.0);
        assert_eq!(inputs.deposit_kind, DepositKind::FixedAmount);
        assert_approx(inputs.deposit_value, 90_000.0);
        assert_eq!(inputs.repayment_type, RepaymentType::Repayment);
        assert_approx(inputs.apr_percent, 4.25);
        assert_eq!(inputs.term_years, 30);
        assert_eq!(inputs.mode, AnalysisMode::OwnerOccupier);
        assert_eq!(inputs.buyer_type, BuyerType::FirstTimeBuyer);
        assert_eq!(inputs.fee_treatment, FeeTreatment::AddToLoan);
        assert_approx(inputs.product_fee, 999.0);
        assert_eq!(inputs.cgt_rate_mode, CgtRateMode::Flat24);
        assert!(!inputs.sell_at_end);
        assert_approx(inputs.owner_monthly_rent, 1_600.0);
        assert_eq!(
            inputs.capex,
            vec![CapexEvent { year: 4, amount: 8_000.0 }]
        );
    }

    #[test]
    fn payload_accepts_camel_case_enum_aliases() {
        let inputs = inputs_from_json(
            r#"{"mode": "buyToLet", "repaymentType": "interestOnly", "depositType": "percent"}"#,
        );
        assert_eq!(inputs.mode, AnalysisMode::BuyToLet);
        assert_eq!(inputs.repayment_type, RepaymentType::InterestOnly);
        assert_eq!(inputs.deposit_kind, DepositKind::PercentOfPrice);
    }

    #[test]
    fn empty_payload_falls_back_to_defaults() {
        let inputs = inputs_from_json("{}");
        assert_approx(inputs.price, 300_000.0);
        assert!(inputs.capex.is_empty());
    }

    #[test]
    fn capex_flag_parses_year_amount_pairs() {
        let event = parse_capex_event("5:12000").expect("valid capex");
        assert_eq!(event.year, 5);
        assert_approx(event.amount, 12_000.0);
        assert!(parse_capex_event("nonsense").is_err());
        assert!(parse_capex_event("x:1").is_err());
    }

    #[test]
    fn evaluate_response_serialization_contains_expected_fields() {
        let inputs = build_inputs(default_cli());
        let response = build_evaluate_response(evaluate(&inputs));
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"nominalIrr\""));
        assert!(json.contains("\"realIrr\""));
        assert!(json.contains("\"npv\""));
        assert!(json.contains("\"cashInvested\""));
        assert!(json.contains("\"paybackYear\""));
        assert!(json.contains("\"schedule\""));
        assert!(json.contains("\"pnlYears\""));
        assert!(json.contains("\"growthRentGrid\""));
        assert!(json.contains("\"rateDepositGrid\""));
        assert!(json.contains("\"growthRentBuckets\""));
        assert!(json.contains("\"exportRows\""));
        assert!(json.contains("\"firstYear\""));
    }

    #[test]
    fn unavailable_irr_serializes_as_null_cells() {
        // Rent of zero never recovers the outlay without a sale.
        let inputs = inputs_from_json(r#"{"monthlyRent": 0, "sellAtEnd": false}"#);
        let response = build_evaluate_response(evaluate(&inputs));
        assert!(response.result.nominal_irr.is_none());
        assert!(
            response
                .growth_rent_buckets
                .iter()
                .flatten()
                .all(|b| *b == IrrBucket::Neutral)
        );
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"nominalIrr\":null"));
    }

    #[test]
    fn csv_export_has_header_and_one_row_per_year() {
        let inputs = inputs_from_json(r#"{"termYears": 5}"#);
        let result = evaluate(&inputs);
        let csv_body = render_export_csv(&result.export_rows).expect("csv renders");
        let lines: Vec<&str> = csv_body.trim_end().lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "year,value,debtBalance,income,opex,interest,principal,tax,capex,net"
        );
        for (idx, line) in lines[1..].iter().enumerate() {
            let year_field = line.split(',').next().expect("year column");
            assert_eq!(year_field, (idx + 1).to_string());
        }
    }

    #[test]
    fn malformed_numbers_in_payload_are_normalized_by_the_engine() {
        let inputs = inputs_from_json(r#"{"voidsPercent": 400, "termYears": 0, "price": -5}"#);
        let result = evaluate(&inputs);
        assert_eq!(result.schedule.len(), 1);
        assert_approx(result.loan_amount, 0.0);
    }
}
