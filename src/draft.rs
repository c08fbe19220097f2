//! Invoice draft data: line items, payment method and the fixed tax math.
//!
//! All entered unit prices are tax-inclusive at the fixed Latvian VAT rate;
//! the excl.-tax amount and the tax component are derived by division, never
//! by addition.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fixed VAT rate applied to every line item (21%).
pub const VAT_RATE: f64 = 0.21;

/// One billable entry. Immutable once added; list position is the print
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price_incl_tax: f64,
}

impl LineItem {
    pub fn line_total_incl_tax(&self) -> f64 {
        self.unit_price_incl_tax * self.quantity
    }

    fn validate(&self, index: usize) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidItem {
                index,
                reason: "name is empty",
            });
        }
        if !(self.quantity > 0.0) {
            return Err(Error::InvalidItem {
                index,
                reason: "quantity must be positive",
            });
        }
        if !(self.unit_price_incl_tax > 0.0) {
            return Err(Error::InvalidItem {
                index,
                reason: "unit price must be positive",
            });
        }
        Ok(())
    }
}

/// The fixed set of payment arrangements offered by the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Ar maksājuma karti",
            PaymentMethod::BankTransfer => "Ar bankas pārskaitījumu",
            PaymentMethod::Cash => "Skaidra nauda",
        }
    }
}

/// Everything the user entered for one invoice. Transient: lives only for the
/// duration of one composition, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub buyer_text: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl InvoiceDraft {
    /// Checks the precondition for composition: at least one well-formed
    /// item. The composer itself is never called with an empty sequence.
    pub fn validate(&self) -> Result<(), Error> {
        if self.items.is_empty() {
            return Err(Error::EmptyDraft);
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
        }
        Ok(())
    }

    /// Buyer free text with surrounding whitespace stripped; `None` when the
    /// field is absent or blank.
    pub fn buyer_text_trimmed(&self) -> Option<&str> {
        self.buyer_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn totals(&self) -> TaxBreakdown {
        let total_incl_tax: f64 = self.items.iter().map(LineItem::line_total_incl_tax).sum();
        let total_excl_tax = total_incl_tax / (1.0 + VAT_RATE);
        TaxBreakdown {
            total_incl_tax,
            total_excl_tax,
            tax_amount: total_incl_tax - total_excl_tax,
        }
    }
}

/// Aggregate amounts for the summary block, all tax-inclusive prices divided
/// back into their components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBreakdown {
    pub total_incl_tax: f64,
    pub total_excl_tax: f64,
    pub tax_amount: f64,
}
