use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One priced line item within a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePart {
    pub part_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl QuotePart {
    pub fn new(part_name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            part_name: part_name.into(),
            part_number: None,
            description: None,
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Cost figures derived from a quote's inputs. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub parts_total: Decimal,
    pub labor_total: Decimal,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

impl QuoteBreakdown {
    /// Pure costing over already-validated inputs. No intermediate rounding.
    pub fn compute(
        labor_hours: Decimal,
        labor_rate: Decimal,
        parts: &[QuotePart],
        tax_rate: Decimal,
    ) -> Self {
        let parts_total: Decimal = parts.iter().map(QuotePart::line_total).sum();
        let labor_total = labor_hours * labor_rate;
        let sub_total = parts_total + labor_total;
        let tax_amount = sub_total * tax_rate;
        Self {
            parts_total,
            labor_total,
            sub_total,
            tax_amount,
            grand_total: sub_total + tax_amount,
        }
    }

    /// Presentation copy rounded to cents.
    pub fn rounded(&self) -> Self {
        let cents = |d: Decimal| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            parts_total: cents(self.parts_total),
            labor_total: cents(self.labor_total),
            sub_total: cents(self.sub_total),
            tax_amount: cents(self.tax_amount),
            grand_total: cents(self.grand_total),
        }
    }
}

/// An immutable costed estimate attached to a repair job.
///
/// Only the inputs are stored; totals always come from [`Quote::breakdown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub labor_hours: Decimal,
    pub labor_rate: Decimal,
    pub tax_rate: Decimal,
    #[serde(default)]
    pub parts: Vec<QuotePart>,
    pub created_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl Quote {
    pub fn breakdown(&self) -> QuoteBreakdown {
        QuoteBreakdown::compute(self.labor_hours, self.labor_rate, &self.parts, self.tax_rate)
    }

    pub fn grand_total(&self) -> Decimal {
        self.breakdown().grand_total
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}
