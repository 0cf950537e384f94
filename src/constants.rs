use rust_decimal::Decimal;

/// Fraction digits carried by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Tolerated deviation between an expense total and the sum of its splits,
/// and between a percentage map and 100.
pub fn split_tolerance() -> Decimal {
    Decimal::new(1, 2)
}
