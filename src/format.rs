//! Display strings for the metric cards.

pub const NO_DATA: &str = "N/A";

/// `1234567` -> `1,234,567`
pub fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn score(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.0}", v))
}

pub fn currency(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("${:.2}", v))
}

pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{:.0}%", v))
}

/// Player medians are shown as whole players, truncated.
pub fn players(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| thousands(v.trunc() as i64))
}
