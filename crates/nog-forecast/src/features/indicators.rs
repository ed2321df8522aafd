//! Technical indicators over trailing windows
//!
//! Every function returns one value per input, `None` where the trailing
//! window is not yet full or the indicator is undefined.

use crate::error::{ForecastError, Result};
use ta::Next;
use ta::indicators::{BollingerBands, SimpleMovingAverage};

/// Simple moving average
pub fn sma(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut indicator =
        SimpleMovingAverage::new(window).map_err(|e| ForecastError::IndicatorError(e.to_string()))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let avg = indicator.next(v);
            (i + 1 >= window).then_some(avg)
        })
        .collect())
}

/// Bollinger bands as `(upper, lower)`, population standard deviation
pub fn bollinger(values: &[f64], window: usize, multiplier: f64) -> Result<Vec<Option<(f64, f64)>>> {
    let mut indicator = BollingerBands::new(window, multiplier)
        .map_err(|e| ForecastError::IndicatorError(e.to_string()))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let out = indicator.next(v);
            (i + 1 >= window).then_some((out.upper, out.lower))
        })
        .collect())
}

/// Period-over-period fractional change
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.windows(2).map(|w| (w[0] != 0.0).then(|| w[1] / w[0] - 1.0)))
        .take(values.len())
        .collect()
}

/// Rolling sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(var.sqrt())
        })
        .collect()
}

/// Relative strength index from rolling means of gains and losses
///
/// Uses the `window` most recent differences, so the first `window` values
/// are `None`. Undefined when the mean loss is zero.
pub fn rsi(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    (0..values.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            // diffs[i - 1] is the change into period i
            let recent = &diffs[i - window..i];
            let gain = recent.iter().map(|d| d.max(0.0)).sum::<f64>() / window as f64;
            let loss = recent.iter().map(|d| (-d).max(0.0)).sum::<f64>() / window as f64;
            if loss == 0.0 {
                return None;
            }
            let rs = gain / loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        })
        .collect()
}

/// Difference between the value and the value `lag` periods earlier
pub fn momentum(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).map(|j| values[i] - values[j]))
        .collect()
}

/// Cumulative price x volume, cumulative volume and their ratio (VWAP)
/// from the start of the series
pub fn cumulative_vwap(closes: &[f64], volumes: &[f64]) -> Vec<(f64, f64, Option<f64>)> {
    let mut price_volume = 0.0;
    let mut volume = 0.0;

    closes
        .iter()
        .zip(volumes)
        .map(|(&c, &v)| {
            price_volume += c * v;
            volume += v;
            let vwap = (volume != 0.0).then(|| price_volume / volume);
            (price_volume, volume, vwap)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_sma_window() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(approx(out[2].unwrap(), 2.0));
        assert!(approx(out[3].unwrap(), 3.0));
    }

    #[test]
    fn test_sma_rejects_zero_window() {
        assert!(sma(&[1.0], 0).is_err());
    }

    #[test]
    fn test_bollinger_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = bollinger(&values, 8, 2.0).unwrap();
        assert!(out[..7].iter().all(Option::is_none));
        // mean 5, population std 2
        let (upper, lower) = out[7].unwrap();
        assert!(approx(upper, 9.0));
        assert!(approx(lower, 1.0));
    }

    #[test]
    fn test_pct_change() {
        let out = pct_change(&[10.0, 11.0, 0.0, 5.0]);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], None);
        assert!(approx(out[1].unwrap(), 0.1));
        assert!(approx(out[2].unwrap(), -1.0));
        assert_eq!(out[3], None);
    }

    #[test]
    fn test_rolling_std_is_sample() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        // sum of squared deviations 32, n - 1 = 7
        assert!(approx(out[7].unwrap(), (32.0_f64 / 7.0).sqrt()));
    }

    #[test]
    fn test_rsi_bounds_and_warmup() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let out = rsi(&closes, 14);

        assert!(out[..14].iter().all(Option::is_none));
        let defined: Vec<f64> = out.iter().flatten().copied().collect();
        assert!(!defined.is_empty());
        assert!(defined.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_known_value() {
        // 14 diffs: seven +2 and seven -1 -> rs = 2, rsi = 66.67
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let out = rsi(&closes, 14);
        assert!(approx(out[14].unwrap(), 100.0 - 100.0 / 3.0));
    }

    #[test]
    fn test_rsi_undefined_without_losses() {
        let closes: Vec<f64> = (0..20).map(f64::from).collect();
        assert!(rsi(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn test_momentum() {
        let out = momentum(&[1.0, 2.0, 4.0, 8.0], 2);
        assert_eq!(out, vec![None, None, Some(3.0), Some(6.0)]);
    }

    #[test]
    fn test_cumulative_vwap() {
        let out = cumulative_vwap(&[10.0, 20.0], &[1.0, 3.0]);
        assert_eq!(out[0], (10.0, 1.0, Some(10.0)));
        assert_eq!(out[1].0, 70.0);
        assert_eq!(out[1].1, 4.0);
        assert!(approx(out[1].2.unwrap(), 17.5));

        let zero = cumulative_vwap(&[10.0], &[0.0]);
        assert_eq!(zero[0].2, None);
    }
}
