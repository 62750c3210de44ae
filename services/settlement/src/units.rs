use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::errors::SettlementError;

/// SOL has nine decimals: one SOL is 1_000_000_000 lamports.
pub const LAMPORTS_DECIMALS: u32 = 9;

/// Converts a native-unit amount into integer base units.
///
/// The conversion is exact. An amount with more precision than the chain can
/// carry is rejected instead of rounded, because payment checks compare base
/// units with strict equality.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u64, SettlementError> {
    if amount.is_sign_negative() {
        return Err(SettlementError::AmountOverflow(amount));
    }

    let factor = Decimal::from(10u64.pow(decimals));
    let scaled = amount
        .checked_mul(factor)
        .ok_or(SettlementError::AmountOverflow(amount))?;

    if scaled.fract() != Decimal::ZERO {
        return Err(SettlementError::SubUnitAmount { amount, decimals });
    }

    scaled
        .trunc()
        .to_u64()
        .ok_or(SettlementError::AmountOverflow(amount))
}
