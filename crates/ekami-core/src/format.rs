/// Formats currency amounts for presentation.
pub trait CurrencyFormatter: Send + Sync {
    fn format_amount(&self, amount: f64, currency: &str) -> String;
}

/// Whole-unit amounts with a thousands separator, e.g. `1 250 000 XAF`.
#[derive(Debug, Clone, Copy)]
pub struct GroupedCurrencyFormatter {
    pub separator: char,
}

impl Default for GroupedCurrencyFormatter {
    fn default() -> Self {
        Self { separator: ' ' }
    }
}

impl CurrencyFormatter for GroupedCurrencyFormatter {
    fn format_amount(&self, amount: f64, currency: &str) -> String {
        let rounded = amount.round();
        let digits = format!("{:.0}", rounded.abs());
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(self.separator);
            }
            grouped.push(ch);
        }
        let sign = if rounded < 0.0 { "-" } else { "" };
        format!("{sign}{grouped} {currency}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        let formatter = GroupedCurrencyFormatter::default();
        assert_eq!(formatter.format_amount(1_250_000.4, "XAF"), "1 250 000 XAF");
        assert_eq!(formatter.format_amount(999.0, "XAF"), "999 XAF");
        assert_eq!(formatter.format_amount(-1_000.0, "EUR"), "-1 000 EUR");
    }
}
