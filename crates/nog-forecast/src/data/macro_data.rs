//! Macro observations and the backward as-of join used to align them

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single numeric observation of a macro series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroObservation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Crude oil and fed funds values in force on a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub date: NaiveDate,
    pub crude_oil_price: f64,
    pub fed_funds_rate: f64,
}

/// Latest item dated on or before `date` in a date-sorted slice
pub fn asof_backward<T>(sorted: &[T], date: NaiveDate, key: impl Fn(&T) -> NaiveDate) -> Option<&T> {
    let idx = sorted.partition_point(|item| key(item) <= date);
    idx.checked_sub(1).map(|i| &sorted[i])
}

/// Merge daily oil prices with the monthly fed funds rate
///
/// Each oil observation picks up the fed funds value in force on its date.
/// Oil dates before the first fed funds observation have no rate and are
/// dropped.
pub fn merge_macro_series(
    oil: &[MacroObservation],
    fed_funds: &[MacroObservation],
) -> Vec<MacroRecord> {
    let mut oil: Vec<MacroObservation> = oil.iter().copied().filter(|o| o.value.is_finite()).collect();
    oil.sort_by_key(|o| o.date);
    oil.dedup_by_key(|o| o.date);

    let mut fed: Vec<MacroObservation> =
        fed_funds.iter().copied().filter(|o| o.value.is_finite()).collect();
    fed.sort_by_key(|o| o.date);

    oil.iter()
        .filter_map(|o| {
            asof_backward(&fed, o.date, |f| f.date).map(|f| MacroRecord {
                date: o.date,
                crude_oil_price: o.value,
                fed_funds_rate: f.value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn obs(date: NaiveDate, value: f64) -> MacroObservation {
        MacroObservation { date, value }
    }

    #[test]
    fn test_asof_backward() {
        let items = vec![d(1, 1), d(2, 1), d(3, 1)];
        assert_eq!(asof_backward(&items, d(2, 15), |x| *x), Some(&d(2, 1)));
        assert_eq!(asof_backward(&items, d(2, 1), |x| *x), Some(&d(2, 1)));
        assert_eq!(asof_backward(&items, d(5, 1), |x| *x), Some(&d(3, 1)));
        assert_eq!(asof_backward(&items, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(), |x| *x), None);
    }

    #[test]
    fn test_merge_uses_value_in_force() {
        let oil = vec![obs(d(1, 31), 75.0), obs(d(2, 1), 76.0), obs(d(2, 2), 77.0)];
        let fed = vec![obs(d(1, 1), 5.33), obs(d(2, 1), 5.25)];

        let merged = merge_macro_series(&oil, &fed);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].fed_funds_rate, 5.33);
        assert_eq!(merged[1].fed_funds_rate, 5.25);
        assert_eq!(merged[2].crude_oil_price, 77.0);
    }

    #[test]
    fn test_merge_drops_oil_before_first_rate() {
        let oil = vec![obs(d(1, 15), 70.0), obs(d(2, 15), 72.0)];
        let fed = vec![obs(d(2, 1), 5.0)];

        let merged = merge_macro_series(&oil, &fed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].date, d(2, 15));
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(merge_macro_series(&[], &[obs(d(1, 1), 5.0)]).is_empty());
        assert!(merge_macro_series(&[obs(d(1, 1), 70.0)], &[]).is_empty());
    }
}
