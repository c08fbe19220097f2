//! rekins — invoice PDF generation with a remotely persisted invoice number.
//!
//! Two cooperating pieces, both stateless aside from the externally persisted
//! counter:
//!
//! - the [`CounterAllocator`] reads the current invoice number from a remote
//!   document store at startup (seeding it on first use) and advances it by
//!   exactly one after each confirmed emission;
//! - the composer ([`compose`]) deterministically renders a draft plus
//!   number, date and the fixed issuer record into PDF bytes.
//!
//! [`emit_invoice`] ties them together: validate, compose, deliver, and only
//! then advance. The UI that collects line items and the platform share
//! facility are external collaborators.

mod counter;
mod draft;
mod error;
mod export;
mod pdf;
mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use counter::{CounterAllocator, CounterStore, COUNTER_SEED};
pub use draft::{InvoiceDraft, LineItem, PaymentMethod, TaxBreakdown, VAT_RATE};
pub use error::{Error, ExportError, StoreError};
pub use export::{pdf_filename, share_title, DirectoryExport, ExportTarget, PDF_MIME};
pub use pdf::compose;
pub use store::{FirestoreConfig, FirestoreStore};

use time::Date;

/// Fixed issuer details printed on every invoice.
#[derive(Debug, Clone, Copy)]
pub struct Issuer {
    pub legal_name: &'static str,
    pub registration_number: &'static str,
    pub vat_number: &'static str,
    pub legal_address: &'static str,
    pub actual_address: &'static str,
    pub bank_name: &'static str,
    pub iban: &'static str,
}

pub const ISSUER: Issuer = Issuer {
    legal_name: "Baltkem group, SIA",
    registration_number: "40103354396",
    vat_number: "LV40103354396",
    legal_address: "Anniņmuižas bulvāris 60 - 4, Rīga, LV-1029",
    actual_address: "Lazdu iela 16D, Rīga, LV-1029",
    bank_name: "AS “SEB banka”",
    iban: "LV87UNLA0050016410133",
};

impl Issuer {
    /// The issuer block exactly as it appears between the two rules on the
    /// document.
    pub fn document_lines(&self) -> [String; 7] {
        [
            self.legal_name.to_string(),
            format!("Reģ. nr.: {}", self.registration_number),
            format!("PVN nr.: {}", self.vat_number),
            format!("Juridiskā adrese: {}", self.legal_address),
            format!("Faktiskā adrese: {}", self.actual_address),
            self.bank_name.to_string(),
            self.iban.to_string(),
        ]
    }
}

/// Formats an issue date as `DD.MM.YYYY`.
pub fn format_issue_date(date: Date) -> String {
    format!(
        "{:02}.{:02}.{}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

/// Outcome of a confirmed emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedInvoice {
    pub number: i64,
    pub filename: String,
}

/// Runs one generate/share cycle: validates the draft, composes the document
/// under the allocator's current number, hands it to `target`, and advances
/// the counter only after the target confirms delivery.
///
/// A failed or cancelled delivery leaves the counter untouched, so the same
/// number is reused on retry and none are skipped.
pub async fn emit_invoice<S, T>(
    allocator: &mut CounterAllocator<S>,
    issuer: &Issuer,
    draft: &InvoiceDraft,
    issue_date: Date,
    target: &mut T,
) -> Result<EmittedInvoice, Error>
where
    S: CounterStore,
    T: ExportTarget,
{
    draft.validate()?;

    let number = allocator.current();
    let bytes = compose(number, issue_date, issuer, draft)?;
    let filename = pdf_filename(number);

    target.deliver(&filename, &bytes)?;
    allocator.advance().await?;

    tracing::info!(number, %filename, "invoice emitted");
    Ok(EmittedInvoice { number, filename })
}
