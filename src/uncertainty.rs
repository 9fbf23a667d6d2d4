//! Values known only within a band
//!
//! [`UncertaintyRange`] carries an observed value together with optional lower
//! and upper bounds. Every load metric in the crate is computed on ranges so
//! that the imprecision of partially logged weeks follows the value through
//! sums, ratios and z-scores.
//!
//! Field rule used by all binary operations: a field of the result is only
//! computed when *both* operands populate it. A missing bound therefore never
//! turns into a fabricated bound downstream.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// A quantity carried as (lower, observed, upper) plus an insufficient-data flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRange {
    /// Lower bound, if one could be estimated
    pub lower: Option<f64>,

    /// Value actually observed
    pub observed: Option<f64>,

    /// Upper bound, if one could be estimated
    pub upper: Option<f64>,

    /// Set when the inputs behind this value were missing
    pub insufficient_data: bool,
}

fn both(a: Option<f64>, b: Option<f64>, op: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(op(a, b)),
        _ => None,
    }
}

fn guarded_div(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b > 0.0 => Some(a / b),
        (Some(_), Some(b)) => {
            tracing::trace!(divisor = b, "skipping division by non-positive bound");
            None
        }
        _ => None,
    }
}

impl UncertaintyRange {
    /// Create a range from explicit fields
    pub fn new(lower: Option<f64>, observed: Option<f64>, upper: Option<f64>) -> Self {
        UncertaintyRange {
            lower,
            observed,
            upper,
            insufficient_data: false,
        }
    }

    /// A range with only the observed field populated
    pub fn observed(value: f64) -> Self {
        UncertaintyRange::new(None, Some(value), None)
    }

    /// A range with all three fields populated
    pub fn bounded(lower: f64, observed: f64, upper: f64) -> Self {
        UncertaintyRange::new(Some(lower), Some(observed), Some(upper))
    }

    /// The accumulator used by [`UncertaintyRange::sum`]
    pub fn zero() -> Self {
        UncertaintyRange::bounded(0.0, 0.0, 0.0)
    }

    /// A range that only records that its inputs were missing
    pub fn insufficient() -> Self {
        UncertaintyRange {
            insufficient_data: true,
            ..Default::default()
        }
    }

    /// True when no numeric field is populated
    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.observed.is_none() && self.upper.is_none()
    }

    /// `lower`, falling back to `observed`
    pub fn lowest_value(&self) -> Option<f64> {
        self.lower.or(self.observed)
    }

    /// `upper`, falling back to `observed`
    pub fn highest_value(&self) -> Option<f64> {
        self.upper.or(self.observed)
    }

    fn combine(&mut self, other: &UncertaintyRange, op: impl Fn(f64, f64) -> f64 + Copy) {
        self.lower = both(self.lower, other.lower, op);
        self.observed = both(self.observed, other.observed, op);
        self.upper = both(self.upper, other.upper, op);
        self.insufficient_data |= other.insufficient_data;
    }

    /// In-place element-wise addition
    pub fn add_range(&mut self, other: &UncertaintyRange) {
        self.combine(other, |a, b| a + b);
    }

    /// In-place element-wise subtraction
    pub fn subtract_range(&mut self, other: &UncertaintyRange) {
        self.combine(other, |a, b| a - b);
    }

    /// In-place element-wise multiplication
    pub fn multiply_range(&mut self, other: &UncertaintyRange) {
        self.combine(other, |a, b| a * b);
    }

    /// In-place element-wise division; a divisor field `<= 0` leaves the result field unset
    pub fn divide_range(&mut self, other: &UncertaintyRange) {
        self.lower = guarded_div(self.lower, other.lower);
        self.observed = guarded_div(self.observed, other.observed);
        self.upper = guarded_div(self.upper, other.upper);
        self.insufficient_data |= other.insufficient_data;
    }

    /// In-place field-wise maximum
    pub fn max_range(&mut self, other: &UncertaintyRange) {
        self.combine(other, f64::max);
    }

    /// In-place field-wise minimum
    pub fn min_range(&mut self, other: &UncertaintyRange) {
        self.combine(other, f64::min);
    }

    /// Scale every populated field
    pub fn multiply(&mut self, factor: f64) {
        self.lower = self.lower.map(|v| v * factor);
        self.observed = self.observed.map(|v| v * factor);
        self.upper = self.upper.map(|v| v * factor);
    }

    /// Divide every populated field; a divisor `<= 0` clears them
    pub fn divide(&mut self, divisor: f64) {
        let divisor = Some(divisor);
        self.lower = guarded_div(self.lower, divisor);
        self.observed = guarded_div(self.observed, divisor);
        self.upper = guarded_div(self.upper, divisor);
    }

    /// Restore `lower <= observed <= upper` after arithmetic has crossed the bounds
    pub fn normalize(&mut self) {
        if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
            if lower > upper {
                self.lower = Some(upper);
                self.upper = Some(lower);
            }
        }
        if let Some(observed) = self.observed {
            if self.lower.map_or(false, |lower| lower > observed) {
                self.lower = Some(observed);
            }
            if self.upper.map_or(false, |upper| upper < observed) {
                self.upper = Some(observed);
            }
        }
    }

    /// Pairwise `add` over a zero-initialized accumulator
    pub fn sum(ranges: &[UncertaintyRange]) -> UncertaintyRange {
        ranges.iter().fold(UncertaintyRange::zero(), |mut acc, range| {
            acc.add_range(range);
            acc
        })
    }

    /// Mean of each field over the ranges that populate it
    pub fn average(ranges: &[UncertaintyRange]) -> UncertaintyRange {
        Self::per_field(ranges, |values| values.iter().mean())
    }

    /// Population standard deviation of each field over the ranges that populate it
    pub fn stddev(ranges: &[UncertaintyRange]) -> UncertaintyRange {
        Self::per_field(ranges, |values| values.iter().population_std_dev())
    }

    /// Element-wise minimum across the list
    pub fn min(ranges: &[UncertaintyRange]) -> UncertaintyRange {
        Self::fold_pairwise(ranges, UncertaintyRange::min_range)
    }

    /// Element-wise maximum across the list
    pub fn max(ranges: &[UncertaintyRange]) -> UncertaintyRange {
        Self::fold_pairwise(ranges, UncertaintyRange::max_range)
    }

    fn fold_pairwise(
        ranges: &[UncertaintyRange],
        op: fn(&mut UncertaintyRange, &UncertaintyRange),
    ) -> UncertaintyRange {
        let mut iter = ranges.iter();
        let Some(first) = iter.next() else {
            return UncertaintyRange::default();
        };
        iter.fold(first.clone(), |mut acc, range| {
            op(&mut acc, range);
            acc
        })
    }

    fn per_field(
        ranges: &[UncertaintyRange],
        statistic: impl Fn(&[f64]) -> f64,
    ) -> UncertaintyRange {
        let collect = |field: fn(&UncertaintyRange) -> Option<f64>| -> Option<f64> {
            let values: Vec<f64> = ranges.iter().filter_map(field).collect();
            if values.is_empty() {
                None
            } else {
                Some(statistic(&values))
            }
        };

        UncertaintyRange {
            lower: collect(|r| r.lower),
            observed: collect(|r| r.observed),
            upper: collect(|r| r.upper),
            insufficient_data: ranges.iter().any(|r| r.insufficient_data),
        }
    }

    /// Estimate a weekly load from the sessions logged so far
    ///
    /// `observed` is the sum of `values` (their mean when `as_sum` is false).
    /// When fewer sessions than `expected_workouts` were logged, the bounds
    /// are a `z` standard-error band with finite population correction. A
    /// single session is paired with a synthetic 1.5x session so a spread
    /// exists. No sessions yields an insufficient-data range.
    pub fn from_session_values(
        values: &[f64],
        expected_workouts: u32,
        z: f64,
        as_sum: bool,
    ) -> UncertaintyRange {
        if values.is_empty() {
            return UncertaintyRange::insufficient();
        }

        let count = values.len();
        let observed = if as_sum {
            values.iter().sum::<f64>()
        } else {
            values.iter().mean()
        };
        let mut range = UncertaintyRange::observed(observed);

        let expected = expected_workouts as usize;
        if count >= expected {
            return range;
        }

        let sample: Vec<f64> = if count == 1 {
            vec![values[0], values[0] * 1.5]
        } else {
            values.to_vec()
        };

        let n = sample.len() as f64;
        let expected = expected as f64;
        let mean = sample.iter().mean();
        let correction = ((expected - n) / expected).max(0.0).sqrt();
        let standard_error = sample.iter().std_dev() / n.sqrt() * correction;
        let band = z * standard_error;
        let scale = if as_sum { n } else { 1.0 };

        range.lower = Some((mean - band) * scale);
        range.upper = Some((mean + band) * scale);
        range
    }
}

impl Add for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn add(self, rhs: &UncertaintyRange) -> UncertaintyRange {
        let mut result = self.clone();
        result.add_range(rhs);
        result
    }
}

impl Sub for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn sub(self, rhs: &UncertaintyRange) -> UncertaintyRange {
        let mut result = self.clone();
        result.subtract_range(rhs);
        result
    }
}

impl Mul for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn mul(self, rhs: &UncertaintyRange) -> UncertaintyRange {
        let mut result = self.clone();
        result.multiply_range(rhs);
        result
    }
}

impl Div for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn div(self, rhs: &UncertaintyRange) -> UncertaintyRange {
        let mut result = self.clone();
        result.divide_range(rhs);
        result
    }
}

impl Mul<f64> for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn mul(self, rhs: f64) -> UncertaintyRange {
        let mut result = self.clone();
        result.multiply(rhs);
        result
    }
}

impl Div<f64> for &UncertaintyRange {
    type Output = UncertaintyRange;

    fn div(self, rhs: f64) -> UncertaintyRange {
        let mut result = self.clone();
        result.divide(rhs);
        result
    }
}

impl fmt::Display for UncertaintyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
        write!(
            f,
            "{} [{}, {}]",
            show(self.observed),
            show(self.lower),
            show(self.upper)
        )?;
        if self.insufficient_data {
            write!(f, " (insufficient)")?;
        }
        Ok(())
    }
}
