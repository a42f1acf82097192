/// Escape a value for use between double quotes in a KiCad file.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// `value` as a quoted, escaped string literal.
pub fn quote_string(value: &str) -> String {
    format!("\"{}\"", escape_string(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse, SexprKind};

    #[test]
    fn quoted_values_parse_back() {
        for value in ["", "GND", "Net-(LD1-K)", "a \"b\" \\ c", "line\nbreak\ttab"] {
            let parsed = parse(&quote_string(value)).unwrap();
            assert_eq!(parsed.kind, SexprKind::String(value.to_string()));
        }
    }
}
