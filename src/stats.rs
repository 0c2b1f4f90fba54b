//! Price statistics aggregation
//!
//! Reduces one statistics payload to the (90 day, 48 hour) average pair.
//! The two windows treat null points differently: the closed window drops
//! them, the live window counts them as 0.
//!
//! TODO: confirm the live-window null handling. Counting a dead 48h slot as
//! a zero price drags the recent average down; if that is not wanted, drop
//! nulls from both windows and re-sync.

use crate::market::StatisticsPayload;

/// Average the two price windows of one statistics payload.
///
/// Returns `(avg_90d, avg_48h)`, both rounded to two decimals. An empty
/// window averages to 0.
pub fn average_prices(stats: &StatisticsPayload) -> (f64, f64) {
    let closed: Vec<f64> = stats
        .statistics_closed
        .days_90
        .iter()
        .filter_map(|p| p.avg_price)
        .collect();

    let live: Vec<f64> = stats
        .statistics_live
        .hours_48
        .iter()
        .map(|p| p.avg_price.unwrap_or(0.0))
        .collect();

    (round2(mean(&closed)), round2(mean(&live)))
}

fn mean(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().sum::<f64>() / prices.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{ClosedStatistics, LiveStatistics, PricePoint, StatisticsPayload};

    fn payload(closed: &[Option<f64>], live: &[Option<f64>]) -> StatisticsPayload {
        StatisticsPayload {
            statistics_closed: ClosedStatistics {
                days_90: closed.iter().map(|&p| PricePoint { avg_price: p }).collect(),
            },
            statistics_live: LiveStatistics {
                hours_48: live.iter().map(|&p| PricePoint { avg_price: p }).collect(),
            },
        }
    }

    #[test]
    fn empty_windows_average_to_zero() {
        let (p90, p48) = average_prices(&payload(&[], &[]));
        assert_eq!(p90, 0.0);
        assert_eq!(p48, 0.0);
    }

    #[test]
    fn averages_are_rounded_to_two_decimals() {
        let (p90, p48) = average_prices(&payload(
            &[Some(10.0), Some(10.5), Some(10.0)],
            &[Some(1.0), Some(2.0), Some(2.0)],
        ));
        assert_eq!(p90, 10.17);
        assert_eq!(p48, 1.67);
    }

    #[test]
    fn closed_window_excludes_nulls() {
        // Nulls removed: average over the two present points only.
        let (p90, _) = average_prices(&payload(&[Some(10.0), None, Some(20.0)], &[]));
        assert_eq!(p90, 15.0);
    }

    #[test]
    fn live_window_counts_nulls_as_zero() {
        // Null contributes a 0 to the divisor, unlike the closed window.
        let (_, p48) = average_prices(&payload(&[], &[Some(10.0), None, Some(20.0)]));
        assert_eq!(p48, 10.0);
    }

    #[test]
    fn null_handling_differs_between_windows() {
        // Same point pattern through both windows gives different averages.
        let points = [Some(12.0), None, None, Some(6.0)];
        let (p90, p48) = average_prices(&payload(&points, &points));
        assert_eq!(p90, 9.0); // (12 + 6) / 2
        assert_eq!(p48, 4.5); // (12 + 0 + 0 + 6) / 4
    }

    #[test]
    fn all_null_closed_window_is_zero() {
        let (p90, p48) = average_prices(&payload(&[None, None], &[None, None]));
        assert_eq!(p90, 0.0);
        assert_eq!(p48, 0.0);
    }
}
