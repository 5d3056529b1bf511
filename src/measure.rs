//! NA-aware arithmetic for survey measures.
//!
//! A `Measure` is `None` when the source cell was suppressed or a ratio was
//! undefined. Products and quotients propagate NA; row totals skip NA terms
//! and are NA only when every term is.

pub type Measure = Option<f64>;

pub fn product(a: Measure, b: Measure) -> Measure {
    Some(a? * b?)
}

/// `num / den`, NA when either side is NA or the denominator is zero.
pub fn ratio(num: Measure, den: Measure) -> Measure {
    let den = den?;
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    Some(num? / den)
}

pub fn scale(a: Measure, factor: f64) -> Measure {
    a.map(|v| v * factor)
}

/// Sum of the available terms.
pub fn sum_available<I>(terms: I) -> Measure
where
    I: IntoIterator<Item = Measure>,
{
    terms.into_iter().flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Arithmetic mean of the available terms.
pub fn mean_available<I>(terms: I) -> Measure
where
    I: IntoIterator<Item = Measure>,
{
    let (sum, n) = terms
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Relative closeness used by the tests in this crate.
#[cfg(test)]
pub(crate) fn approx_eq(a: f64, b: f64, rel: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel * scale
}
