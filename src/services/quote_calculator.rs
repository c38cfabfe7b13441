use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::{ServiceError, ValidationFailure};
use crate::models::{QuoteBreakdown, QuotePart};

/// Accepted ranges for quote inputs. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteLimits {
    pub min_labor_hours: Decimal,
    pub max_labor_hours: Decimal,
    pub min_labor_rate: Decimal,
    pub max_labor_rate: Decimal,
    pub max_part_quantity: u32,
    pub min_unit_price: Decimal,
    pub max_unit_price: Decimal,
}

impl Default for QuoteLimits {
    fn default() -> Self {
        Self {
            min_labor_hours: dec!(0.25),
            max_labor_hours: dec!(100),
            min_labor_rate: dec!(200),
            max_labor_rate: dec!(2000),
            max_part_quantity: 100,
            min_unit_price: dec!(0.01),
            max_unit_price: dec!(100000),
        }
    }
}

/// Deterministic costing of repair quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteCalculator {
    limits: QuoteLimits,
    tax_rate: Decimal,
}

impl Default for QuoteCalculator {
    fn default() -> Self {
        Self::new(QuoteLimits::default(), dec!(0.15))
    }
}

impl QuoteCalculator {
    pub fn new(limits: QuoteLimits, tax_rate: Decimal) -> Self {
        Self { limits, tax_rate }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn limits(&self) -> &QuoteLimits {
        &self.limits
    }

    /// Checks every input and reports all violations together.
    pub fn validate(
        &self,
        labor_hours: Decimal,
        labor_rate: Decimal,
        parts: &[QuotePart],
    ) -> Result<(), ServiceError> {
        let limits = &self.limits;
        let mut failure = ValidationFailure::new();

        if labor_hours <= Decimal::ZERO {
            failure.push("labor_hours", "must be greater than zero");
        } else if labor_hours < limits.min_labor_hours || labor_hours > limits.max_labor_hours {
            failure.push(
                "labor_hours",
                format!(
                    "must be between {} and {}",
                    limits.min_labor_hours, limits.max_labor_hours
                ),
            );
        }

        if labor_rate < limits.min_labor_rate || labor_rate > limits.max_labor_rate {
            failure.push(
                "labor_rate",
                format!(
                    "must be between {} and {}",
                    limits.min_labor_rate, limits.max_labor_rate
                ),
            );
        }

        for (index, part) in parts.iter().enumerate() {
            if part.part_name.trim().is_empty() {
                failure.push(format!("parts[{}].part_name", index), "is required");
            }
            if part.quantity < 1 || part.quantity > limits.max_part_quantity {
                failure.push(
                    format!("parts[{}].quantity", index),
                    format!("must be between 1 and {}", limits.max_part_quantity),
                );
            }
            if part.unit_price <= Decimal::ZERO {
                failure.push(
                    format!("parts[{}].unit_price", index),
                    "must be greater than zero",
                );
            } else if part.unit_price < limits.min_unit_price
                || part.unit_price > limits.max_unit_price
            {
                failure.push(
                    format!("parts[{}].unit_price", index),
                    format!(
                        "must be between {} and {}",
                        limits.min_unit_price, limits.max_unit_price
                    ),
                );
            }
        }

        failure.into_result()
    }

    /// Validates the inputs, then costs them. Never clamps.
    pub fn calculate(
        &self,
        labor_hours: Decimal,
        labor_rate: Decimal,
        parts: &[QuotePart],
    ) -> Result<QuoteBreakdown, ServiceError> {
        self.validate(labor_hours, labor_rate, parts)?;
        Ok(QuoteBreakdown::compute(
            labor_hours,
            labor_rate,
            parts,
            self.tax_rate,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn calc() -> QuoteCalculator {
        QuoteCalculator::default()
    }

    #[test]
    fn reference_quote() {
        let parts = vec![QuotePart::new("Charging port", 1, dec!(100.00))];
        let b = calc().calculate(dec!(2), dec!(750), &parts).unwrap();

        assert_eq!(b.parts_total, dec!(100.00));
        assert_eq!(b.labor_total, dec!(1500.00));
        assert_eq!(b.sub_total, dec!(1600.00));
        assert_eq!(b.tax_amount, dec!(240.00));
        assert_eq!(b.grand_total, dec!(1840.00));
    }

    #[test]
    fn labor_only_quote_is_allowed() {
        let b = calc().calculate(dec!(1), dec!(200), &[]).unwrap();
        assert_eq!(b.parts_total, Decimal::ZERO);
        assert_eq!(b.grand_total, dec!(230));
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-1))]
    #[case(dec!(0.1))]
    #[case(dec!(100.01))]
    fn rejects_bad_labor_hours(#[case] hours: Decimal) {
        let err = calc().calculate(hours, dec!(750), &[]).unwrap_err();
        assert_eq!(err.violations().unwrap().fields(), vec!["labor_hours"]);
    }

    #[rstest]
    #[case(dec!(199.99))]
    #[case(dec!(2000.01))]
    fn rejects_rate_outside_bounds(#[case] rate: Decimal) {
        let err = calc().calculate(dec!(1), rate, &[]).unwrap_err();
        assert_eq!(err.violations().unwrap().fields(), vec!["labor_rate"]);
    }

    #[test]
    fn accepts_inclusive_bounds() {
        let parts = vec![
            QuotePart::new("Screw", 100, dec!(0.01)),
            QuotePart::new("Board", 1, dec!(100000)),
        ];
        assert!(calc().calculate(dec!(0.25), dec!(200), &parts).is_ok());
        assert!(calc().calculate(dec!(100), dec!(2000), &[]).is_ok());
    }

    #[test]
    fn reports_every_bad_part() {
        let parts = vec![
            QuotePart::new("Screen", 1, dec!(10)),
            QuotePart::new(" ", 0, dec!(0)),
            QuotePart::new("Cable", 101, dec!(5)),
        ];
        let err = calc().calculate(dec!(0), dec!(750), &parts).unwrap_err();
        let failure = err.violations().unwrap();

        assert_eq!(
            failure.fields(),
            vec![
                "labor_hours",
                "parts[1].part_name",
                "parts[1].quantity",
                "parts[1].unit_price",
                "parts[2].quantity",
            ]
        );
    }

    #[test]
    fn uses_configured_tax_rate() {
        let calc = QuoteCalculator::new(QuoteLimits::default(), dec!(0.08));
        let b = calc.calculate(dec!(1), dec!(1000), &[]).unwrap();
        assert_eq!(b.tax_amount, dec!(80));
        assert_eq!(b.grand_total, dec!(1080));
    }
}
