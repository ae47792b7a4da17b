use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Formats a price for humans.
///
/// Prices of at least 1 get four decimals. Smaller prices get seven decimals
/// with trailing zeros trimmed, so sub-cent coins stay readable.
pub fn format_price(price: Decimal) -> String {
    if price >= Decimal::ONE {
        format!("{:.4}", round(price, 4))
    } else {
        let fixed = format!("{:.7}", round(price, 7));
        fixed.trim_end_matches('0').to_string()
    }
}

/// Formats a balance or P&L amount to cents.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round(amount, 2))
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}
