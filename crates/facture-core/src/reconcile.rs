//! Field reconciliation: flat entity list → one structured invoice record.
//!
//! Three passes over the entities:
//!
//! 1. **Mapping pass** — entity order, type-to-field mapping. Descriptions
//!    are refined through the text model and accumulate; every other field
//!    is first-match-wins, with monetary values going through
//!    [`normalize_amount`](crate::amount::normalize_amount).
//! 2. **Fallback pass** — CLIENT, COMPANY, and VAT_AMOUNT, when still
//!    absent, take the first raw mention of any accepted type verbatim.
//!    The fallback deliberately skips numeric normalization, VAT included;
//!    a verbatim VAT therefore never feeds derivation.
//! 3. **Derivation pass** — the missing one of VAT/TOTAL is computed from
//!    the other two parsed amounts. NET is never derived.
//!
//! Malformed individual values never fail reconciliation; only a refinement
//! backend failure propagates.

use tracing::{debug, trace};

use crate::amount::normalize_amount;
use crate::error::Result;
use crate::models::{AmountValue, ExtractedEntity, InvoiceField, InvoiceRecord};
use crate::traits::DescriptionRefinementBackend;

/// Reconcile a flat entity list into a fresh [`InvoiceRecord`].
///
/// Pure over its inputs: no state survives the call. The refinement
/// backend is invoked once per DESCRIPTION-typed entity, in entity order.
pub async fn reconcile_entities(
    entities: &[ExtractedEntity],
    refiner: &dyn DescriptionRefinementBackend,
) -> Result<InvoiceRecord> {
    let mut record = InvoiceRecord::default();

    // Pass 1: mapping in entity order.
    for entity in entities {
        let Some(field) = InvoiceField::for_entity_type(&entity.entity_type) else {
            trace!(entity_type = %entity.entity_type, "Entity type feeds no field, skipping");
            continue;
        };

        match field {
            InvoiceField::Description => {
                let refined = refiner.refine_description(&entity.raw_value).await?;
                record.description = Some(match record.description.take() {
                    Some(existing) => format!("{}, {}", existing, refined),
                    None => refined,
                });
            }
            InvoiceField::Client if record.client.is_none() => {
                record.client = Some(entity.raw_value.clone());
            }
            InvoiceField::Company if record.company.is_none() => {
                record.company = Some(entity.raw_value.clone());
            }
            InvoiceField::InvoiceId if record.invoice_id.is_none() => {
                record.invoice_id = Some(entity.raw_value.clone());
            }
            InvoiceField::NetAmount if record.net_amount.is_none() => {
                record.net_amount = parse_amount(field, entity);
            }
            InvoiceField::VatAmount if record.vat_amount.is_none() => {
                record.vat_amount = parse_amount(field, entity);
            }
            InvoiceField::TotalAmount if record.total_amount.is_none() => {
                record.total_amount = parse_amount(field, entity);
            }
            _ => {}
        }
    }

    // Pass 2: verbatim fallback for the fields that get one.
    if record.client.is_none() {
        record.client = fallback_raw_value(InvoiceField::Client, entities);
    }
    if record.company.is_none() {
        record.company = fallback_raw_value(InvoiceField::Company, entities);
    }
    if record.vat_amount.is_none() {
        record.vat_amount =
            fallback_raw_value(InvoiceField::VatAmount, entities).map(AmountValue::Raw);
    }

    // Pass 3: derive the missing one of VAT/TOTAL from the other two.
    let parsed = |amount: &Option<AmountValue>| amount.as_ref().and_then(AmountValue::as_parsed);
    if record.vat_amount.is_none() {
        if let (Some(net), Some(total)) =
            (parsed(&record.net_amount), parsed(&record.total_amount))
        {
            record.vat_amount = Some(AmountValue::Parsed(total - net));
        }
    }
    if record.total_amount.is_none() {
        if let (Some(net), Some(vat)) = (parsed(&record.net_amount), parsed(&record.vat_amount)) {
            record.total_amount = Some(AmountValue::Parsed(net + vat));
        }
    }

    debug!(
        entity_count = entities.len(),
        field_count = record.populated_fields(),
        "Reconciliation complete"
    );

    Ok(record)
}

/// Normalize a monetary mention; unparseable values leave the slot absent
/// so a later mention of an accepted type can still fill it.
fn parse_amount(field: InvoiceField, entity: &ExtractedEntity) -> Option<AmountValue> {
    match normalize_amount(&entity.raw_value) {
        Some(value) => Some(AmountValue::Parsed(value)),
        None => {
            debug!(
                field = %field,
                raw_value = %entity.raw_value,
                "Unparseable amount, leaving field absent"
            );
            None
        }
    }
}

/// First raw mention for any of the field's accepted types, scanned in
/// type priority order.
fn fallback_raw_value(field: InvoiceField, entities: &[ExtractedEntity]) -> Option<String> {
    for accepted in field.accepted_types() {
        if let Some(entity) = entities.iter().find(|e| e.entity_type == *accepted) {
            debug!(field = %field, entity_type = %accepted, "Fallback took verbatim value");
            return Some(entity.raw_value.clone());
        }
    }
    None
}
