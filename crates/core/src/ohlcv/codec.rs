use super::entity::{EncodedRecord, OhlcvRecord, RawRecord};
use crate::store::error::StoreError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// 定点放大倍数：价格保留到万分之一个单位。
pub const PRICE_FACTOR: i64 = 10_000;

/// 与 `PRICE_FACTOR` 对应的小数位数。
pub const PRICE_SCALE: u32 = 4;

/// # Summary
/// 将十进制价格编码为定点整数。
///
/// # Logic
/// 1. 乘以 `PRICE_FACTOR`。
/// 2. 按“四舍五入、远离零”取整，避免系统性偏差。
/// 3. 转换为 i64，溢出时报错。
///
/// # Arguments
/// * `price`: 十进制价格。
///
/// # Returns
/// * `Result<i64, StoreError>` - 定点整数或 `PriceOutOfRange`。
pub fn encode_price(price: Decimal) -> Result<i64, StoreError> {
    price
        .checked_mul(Decimal::from(PRICE_FACTOR))
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or_else(|| StoreError::PriceOutOfRange(price.to_string()))
}

/// # Summary
/// 将定点整数精确还原为十进制价格。
///
/// # Logic
/// 直接以 `PRICE_SCALE` 作为小数位构造 `Decimal`，全程不经过浮点数。
pub fn decode_price(value: i64) -> Decimal {
    Decimal::new(value, PRICE_SCALE).normalize()
}

/// # Summary
/// 校验并转换成交量。
///
/// # Returns
/// * 非负整数返回 i64；负数、带小数或超出范围返回 `InvalidVolume`。
pub fn encode_volume(volume: Decimal) -> Result<i64, StoreError> {
    if volume.is_sign_negative() && !volume.is_zero() {
        return Err(StoreError::InvalidVolume(format!("{} is negative", volume)));
    }
    if !volume.fract().is_zero() {
        return Err(StoreError::InvalidVolume(format!("{} is not an integer", volume)));
    }
    volume
        .to_i64()
        .ok_or_else(|| StoreError::InvalidVolume(format!("{} is out of range", volume)))
}

/// # Summary
/// 编码一条原始记录。
///
/// # Logic
/// 1. 时间戳缺失直接返回 `MissingTimestamp`。
/// 2. 逐字段编码四个价格与成交量。
pub fn encode_record(record: &RawRecord) -> Result<EncodedRecord, StoreError> {
    let timestamp = record.timestamp.ok_or(StoreError::MissingTimestamp)?;
    Ok(EncodedRecord {
        timestamp,
        open: encode_price(record.open)?,
        high: encode_price(record.high)?,
        low: encode_price(record.low)?,
        close: encode_price(record.close)?,
        volume: encode_volume(record.volume)?,
    })
}

/// 解码一条物理行。
pub fn decode_record(record: &EncodedRecord) -> OhlcvRecord {
    OhlcvRecord {
        timestamp: record.timestamp,
        open: decode_price(record.open),
        high: decode_price(record.high),
        low: decode_price(record.low),
        close: decode_price(record.close),
        volume: record.volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_encode_price_scales_and_rounds_half_away_from_zero() {
        assert_eq!(encode_price(dec!(152.25)).unwrap(), 1_522_500);
        assert_eq!(encode_price(dec!(0.0001)).unwrap(), 1);
        assert_eq!(encode_price(dec!(1.23456)).unwrap(), 12_346);
        assert_eq!(encode_price(dec!(1.23454)).unwrap(), 12_345);
        assert_eq!(encode_price(dec!(0.00005)).unwrap(), 1);
        assert_eq!(encode_price(dec!(-0.00005)).unwrap(), -1);
        assert_eq!(encode_price(dec!(-2.5)).unwrap(), -25_000);
    }

    #[test]
    fn test_encode_price_overflow() {
        let err = encode_price(Decimal::MAX).unwrap_err();
        assert!(matches!(err, StoreError::PriceOutOfRange(_)));
    }

    #[test]
    fn test_price_round_trip_is_exact_up_to_four_decimals() {
        for p in [
            dec!(0),
            dec!(0.0001),
            dec!(1.5),
            dec!(99.9999),
            dec!(123456.789),
            dec!(-42.0042),
            dec!(0.1),
            dec!(0.2),
            dec!(0.3),
        ] {
            assert_eq!(decode_price(encode_price(p).unwrap()), p, "price {}", p);
        }
    }

    #[test]
    fn test_finer_resolution_is_rounded_away() {
        assert_eq!(decode_price(encode_price(dec!(10.123456)).unwrap()), dec!(10.1235));
    }

    #[test]
    fn test_encode_volume() {
        assert_eq!(encode_volume(dec!(0)).unwrap(), 0);
        assert_eq!(encode_volume(dec!(1000)).unwrap(), 1000);
        assert_eq!(encode_volume(dec!(250.000)).unwrap(), 250);
        assert!(matches!(encode_volume(dec!(-1)), Err(StoreError::InvalidVolume(_))));
        assert!(matches!(encode_volume(dec!(1.5)), Err(StoreError::InvalidVolume(_))));
    }

    #[test]
    fn test_encode_record_requires_timestamp() {
        let raw = RawRecord {
            timestamp: None,
            open: dec!(1),
            high: dec!(1),
            low: dec!(1),
            close: dec!(1),
            volume: dec!(1),
        };
        assert!(matches!(encode_record(&raw), Err(StoreError::MissingTimestamp)));
    }

    #[test]
    fn test_record_round_trip() {
        let ts = Utc.with_ymd_and_hms(2020, 3, 2, 14, 30, 0).unwrap();
        let raw = RawRecord {
            timestamp: Some(ts),
            open: dec!(150.01),
            high: dec!(155.4321),
            low: dec!(149.0),
            close: dec!(152.0001),
            volume: dec!(10000),
        };
        let encoded = encode_record(&raw).unwrap();
        assert_eq!(encoded.high, 1_554_321);

        let decoded = decode_record(&encoded);
        assert_eq!(decoded.timestamp, ts);
        assert_eq!(decoded.open, raw.open);
        assert_eq!(decoded.high, raw.high);
        assert_eq!(decoded.low, raw.low);
        assert_eq!(decoded.close, raw.close);
        assert_eq!(decoded.volume, 10000);
    }
}
