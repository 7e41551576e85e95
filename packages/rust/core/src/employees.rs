//! Human-readable employee counts.

use std::sync::LazyLock;

use regex::Regex;

/// Display value for an empty employee count.
const NOT_SPECIFIED: &str = "Not specified";

/// Turn a raw `employee_number` cell into a display string.
///
/// Recognized shapes are a single count (`1200`, `1,200`), a closed range
/// (`51-200`, `51 – 200`, `51 to 200`) and an open range (`10000+`). Numbers
/// get thousands separators. Anything else is returned trimmed but otherwise
/// untouched.
pub fn format_employee_count(raw: &str) -> String {
    static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^([\d,]+)\s*(?:(?:-|–|to)\s*([\d,]+)|(\+))?$").expect("valid regex")
    });

    let raw = raw.trim();
    if raw.is_empty() {
        return NOT_SPECIFIED.to_string();
    }

    let Some(caps) = COUNT_RE.captures(raw) else {
        return raw.to_string();
    };
    let Some(low) = parse_count(&caps[1]) else {
        return raw.to_string();
    };

    if let Some(high) = caps.get(2) {
        return match parse_count(high.as_str()) {
            Some(high) => format!("{}-{} employees", group_thousands(low), group_thousands(high)),
            None => raw.to_string(),
        };
    }
    if caps.get(3).is_some() {
        return format!("{}+ employees", group_thousands(low));
    }
    if low == 1 {
        return "1 employee".to_string();
    }
    format!("{} employees", group_thousands(low))
}

fn parse_count(digits: &str) -> Option<u64> {
    let digits: String = digits.chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
