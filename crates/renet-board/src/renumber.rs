use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

// `\d` is Unicode-aware: Arabic-Indic or fullwidth digits count too.
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit-run regex"));

/// Replace every maximal run of decimal digits in `name` with `number`.
///
/// `number` is inserted literally. A name without digits comes back
/// borrowed, which callers use to skip any further work for that pad.
pub fn renumber_net_name<'a>(name: &'a str, number: &str) -> Cow<'a, str> {
    DIGIT_RUN.replace_all(name, NoExpand(number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_single_run() {
        assert_eq!(renumber_net_name("LD_1", "37"), "LD_37");
        assert_eq!(renumber_net_name("GATE120", "7"), "GATE7");
    }

    #[test]
    fn replaces_every_run_identically() {
        assert_eq!(renumber_net_name("Net-(R76-Pad2)", "37"), "Net-(R37-Pad37)");
        assert_eq!(renumber_net_name("1A2B3", "9"), "9A9B9");
    }

    #[test]
    fn names_without_digits_are_borrowed() {
        let out = renumber_net_name("GND", "37");
        assert!(matches!(out, Cow::Borrowed("GND")));
        assert!(matches!(renumber_net_name("", "37"), Cow::Borrowed("")));
    }

    #[test]
    fn everything_but_digits_is_kept() {
        let name = "/laser bank/+V_LD-(12)";
        let out = renumber_net_name(name, "5");
        assert_eq!(out, "/laser bank/+V_LD-(5)");
        let strip = |s: &str| s.chars().filter(|c| !c.is_numeric()).collect::<String>();
        assert_eq!(strip(name), strip(&out));
    }

    #[test]
    fn non_ascii_digits_are_replaced() {
        assert_eq!(renumber_net_name("LD_\u{0663}", "37"), "LD_37");
        assert_eq!(renumber_net_name("EN\u{FF11}\u{FF12}", "4"), "EN4");
        // Superscripts are not decimal digits
        assert!(matches!(renumber_net_name("R\u{00B2}", "4"), Cow::Borrowed(_)));
    }

    #[test]
    fn replacement_is_literal() {
        assert_eq!(renumber_net_name("N1", "$0"), "N$0");
    }

    #[test]
    fn same_number_leaves_name_equal() {
        assert_eq!(renumber_net_name("LD_37", "37"), "LD_37");
    }
}
