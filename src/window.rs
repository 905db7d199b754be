// Window spec parsing: "15m", "2h", "3d" -> (unit, count).

use crate::error::{PriceError, PriceResult};
use crate::models::TimeUnit;

/// Parses `<positive integer><m|h|d>`. No whitespace, sign or locale handling.
pub fn parse_window(spec: &str) -> PriceResult<(TimeUnit, u32)> {
    let Some(suffix) = spec.chars().last() else {
        return Err(PriceError::validation("window spec is empty"));
    };
    let unit = match suffix {
        'm' => TimeUnit::Minute,
        'h' => TimeUnit::Hour,
        'd' => TimeUnit::Day,
        other => {
            return Err(PriceError::validation(format!(
                "invalid window unit {other:?} in {spec:?} (expected m, h or d)"
            )));
        }
    };

    let digits = &spec[..spec.len() - suffix.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::validation(format!(
            "invalid window interval in {spec:?}"
        )));
    }
    let interval: u32 = digits
        .parse()
        .map_err(|e| PriceError::validation(format!("invalid window interval in {spec:?}: {e}")))?;
    if interval == 0 {
        return Err(PriceError::validation(format!(
            "window interval must be positive, got {spec:?}"
        )));
    }

    Ok((unit, interval))
}
