use serde::Serialize;

/// Round half up to one decimal: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    // `+ 0.0` folds a negative zero into zero so it never prints as "-0.0".
    ((10.0 * x) + 0.5).floor() / 10.0 + 0.0
}

/// Percentage of `obtained` over `max`. A non-positive or non-finite
/// denominator yields 0, never NaN.
pub fn percent(obtained: f64, max: f64) -> f64 {
    if max > 0.0 && max.is_finite() && obtained.is_finite() {
        100.0 * obtained / max
    } else {
        0.0
    }
}

pub fn percent_1dp(obtained: f64, max: f64) -> f64 {
    round_off_1_decimal(percent(obtained, max))
}

/// Marks print without a trailing ".0" when whole, and with at most two
/// decimals otherwise (half marks are common).
pub fn format_marks(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100.0).round() / 100.0 + 0.0;
    if rounded.fract() == 0.0 {
        return format!("{}", rounded as i64);
    }
    let s = format!("{:.2}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_percent(value: f64) -> String {
    let v = if value.is_finite() { value + 0.0 } else { 0.0 };
    format!("{:.1}", v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreBand {
    Strong,
    Average,
    Weak,
}

impl ScoreBand {
    pub fn for_percentage(p: f64) -> Self {
        if p >= 70.0 {
            ScoreBand::Strong
        } else if p >= 40.0 {
            ScoreBand::Average
        } else {
            ScoreBand::Weak
        }
    }
}
