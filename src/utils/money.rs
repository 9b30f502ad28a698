use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for monetary amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount the `NUMERIC(12, 2)` payments column can hold: 9_999_999_999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, CURRENCY_SCALE);

/// Validates an incoming amount and normalises it to cents precision.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, String> {
    let rounded = amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded <= Decimal::ZERO {
        return Err(format!("amount must be positive, got {amount}"));
    }
    if rounded > MAX_AMOUNT {
        return Err(format!("amount must not exceed {MAX_AMOUNT}, got {amount}"));
    }
    Ok(rounded)
}

pub fn format_currency(amount: Decimal) -> String {
    format!("${:.2}", amount)
}
