//! Purchase order line validation

use hearth_core::line_amount;
use serde::Deserialize;
use uuid::Uuid;

use super::validation::bounded_text;
use super::ValidationError;

/// Maximum lines on one purchase order
const MAX_LINES: usize = 200;

/// Maximum length of a line description
const MAX_DESCRIPTION_LEN: usize = 500;

/// Upper bound for a single line quantity
const MAX_QUANTITY: f64 = 1_000_000.0;

/// Upper bound for a unit price (100 million in currency units)
const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Line as sent by the client
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineInput {
    /// Inventory item this line buys, if any
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
}

/// Validated line with its computed amount
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub line_number: i32,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub line_amount_cents: i64,
}

/// Validated, numbered lines of one order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLines {
    lines: Vec<OrderLine>,
}

impl OrderLines {
    /// Validate lines and number them from 1 in request order.
    pub fn new(inputs: Vec<OrderLineInput>) -> Result<Self, ValidationError> {
        if inputs.is_empty() {
            return Err(ValidationError::Empty { field: "lines" });
        }

        if inputs.len() > MAX_LINES {
            return Err(ValidationError::OutOfRange {
                field: "lines",
                reason: "a purchase order has at most 200 lines",
            });
        }

        let lines = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| {
                let description = bounded_text(&input.description, "description", MAX_DESCRIPTION_LEN)?;

                if !input.quantity.is_finite() || input.quantity <= 0.0 {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity",
                        reason: "must be greater than zero",
                    });
                }
                if input.quantity > MAX_QUANTITY {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity",
                        reason: "must not exceed 1000000",
                    });
                }
                if !(0..=MAX_UNIT_PRICE_CENTS).contains(&input.unit_price_cents) {
                    return Err(ValidationError::OutOfRange {
                        field: "unit_price_cents",
                        reason: "must be between 0 and 10000000000",
                    });
                }

                Ok(OrderLine {
                    line_number: i as i32 + 1,
                    entity_id: input.entity_id,
                    description,
                    quantity: input.quantity,
                    unit_price_cents: input.unit_price_cents,
                    line_amount_cents: line_amount(input.quantity, input.unit_price_cents),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { lines })
    }

    /// Order total in cents
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.line_amount_cents).sum()
    }

    /// Inventory entities referenced by lines, deduplicated
    pub fn entity_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.lines.iter().filter_map(|l| l.entity_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
