use super::types::{BuyerType, CgtRateMode};

const SDLT_BANDS: [(f64, f64); 4] = [
    (250_000.0, 0.00),
    (925_000.0, 0.05),
    (1_500_000.0, 0.10),
    (f64::INFINITY, 0.12),
];

const FTB_RELIEF_PRICE_CAP: f64 = 625_000.0;
const FTB_NIL_BAND: f64 = 425_000.0;

const PRR_FINAL_EXEMPT_MONTHS: f64 = 9.0;
const CGT_BASIC_BAND: f64 = 37_700.0;

const PERSONAL_ALLOWANCE: f64 = 12_570.0;
const ALLOWANCE_TAPER_START: f64 = 100_000.0;
const HIGHER_RATE_LIMIT: f64 = 125_140.0;
const BASIC_BAND_WIDTH: f64 = 37_700.0;

fn marginal_band_tax(amount: f64, bands: &[(f64, f64)]) -> f64 {
    let mut remaining = amount.max(0.0);
    let mut last_cap = 0.0;
    let mut tax = 0.0;
    for &(up_to, rate) in bands {
        let portion = remaining.min(up_to - last_cap).max(0.0);
        tax += portion * rate;
        remaining -= portion;
        last_cap = up_to;
        if remaining <= 0.0 {
            break;
        }
    }
    tax
}

pub fn compute_sdlt(price: f64, buyer_type: BuyerType, surcharge_refund: bool) -> f64 {
    let price = if price.is_finite() { price.max(0.0) } else { 0.0 };
    let tax = match buyer_type {
        // Relief only applies up to the price cap; above it the purchase is
        // taxed entirely on the standard bands. The guard means the portion
        // above the relief cap can never be reached here.
        BuyerType::FirstTimeBuyer if price <= FTB_RELIEF_PRICE_CAP => {
            (price.min(FTB_RELIEF_PRICE_CAP) - FTB_NIL_BAND).max(0.0) * 0.05
        }
        BuyerType::Additional if !surcharge_refund => {
            marginal_band_tax(price, &SDLT_BANDS) + price * 0.03
        }
        _ => marginal_band_tax(price, &SDLT_BANDS),
    };
    tax.round().max(0.0)
}

#[allow(clippy::too_many_arguments)]
pub fn compute_cgt_on_sale(
    sell_price: f64,
    sell_costs: f64,
    basis: f64,
    prr_on: bool,
    holding_years: f64,
    rate_mode: CgtRateMode,
    allowance: f64,
) -> f64 {
    let gross_gain = (sell_price - sell_costs - basis).max(0.0);
    let exempt_fraction = if prr_on {
        let holding_months = (holding_years * 12.0).max(0.0);
        if holding_months <= PRR_FINAL_EXEMPT_MONTHS {
            1.0
        } else {
            PRR_FINAL_EXEMPT_MONTHS / holding_months
        }
    } else {
        0.0
    };
    let chargeable = (gross_gain * (1.0 - exempt_fraction) - allowance.max(0.0)).max(0.0);
    let tax = match rate_mode {
        CgtRateMode::Flat18 => chargeable * 0.18,
        CgtRateMode::Flat24 => chargeable * 0.24,
        CgtRateMode::Blended => {
            let basic = chargeable.min(CGT_BASIC_BAND);
            basic * 0.18 + (chargeable - basic) * 0.24
        }
    };
    tax.max(0.0)
}

// rUK 2024/25: the personal allowance tapers away by GBP 1 for every GBP 2 of
// income over the taper threshold.
pub fn personal_allowance(gross_income: f64) -> f64 {
    if gross_income <= ALLOWANCE_TAPER_START {
        return PERSONAL_ALLOWANCE;
    }
    let reduction = ((gross_income - ALLOWANCE_TAPER_START) / 2.0).floor();
    (PERSONAL_ALLOWANCE - reduction).max(0.0)
}

pub fn income_tax(gross_income: f64) -> f64 {
    let allowance = personal_allowance(gross_income);
    let taxable = (gross_income - allowance).max(0.0);
    let bands = [
        (BASIC_BAND_WIDTH, 0.20),
        (HIGHER_RATE_LIMIT - allowance, 0.40),
        (f64::INFINITY, 0.45),
    ];
    marginal_band_tax(taxable, &bands).max(0.0)
}
