// Fixed colors used by the chart encodings

use plotters::style::RGBColor;

/// Categorical cycle for pie wedges and hierarchical segments.
pub const CATEGORICAL: [&str; 15] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#393b79", "#637939", "#8c6d31", "#843c39", "#7b4173",
];

pub const BAR_FILL: &str = "#7FDBFF";
pub const SERIES: &str = "#1f77b4";
pub const OUTLINE: &str = "#ffffff";

/// The `i`-th categorical color, wrapping after the last entry.
pub fn categorical(i: usize) -> &'static str {
    CATEGORICAL[i % CATEGORICAL.len()]
}

/// Parse `#rrggbb`; anything else falls back to the series blue.
pub fn parse_color(color: &str) -> RGBColor {
    parse_hex(color).unwrap_or(RGBColor(0x1f, 0x77, 0xb4))
}

fn parse_hex(color: &str) -> Option<RGBColor> {
    let digits = color.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorical_wraps() {
        assert_eq!(categorical(0), CATEGORICAL[0]);
        assert_eq!(categorical(14), CATEGORICAL[14]);
        assert_eq!(categorical(15), CATEGORICAL[0]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#7FDBFF"), RGBColor(0x7f, 0xdb, 0xff));
        assert_eq!(parse_color("#ffffff"), RGBColor(255, 255, 255));
        assert_eq!(parse_color("red"), RGBColor(0x1f, 0x77, 0xb4));
        assert_eq!(parse_color("#zzz"), RGBColor(0x1f, 0x77, 0xb4));
    }
}
