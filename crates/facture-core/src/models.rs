//! Data model for extracted invoice fields.

use serde::{Deserialize, Serialize};

/// One typed field instance recognized in a source document by the
/// understanding provider.
///
/// Entities may carry nested sub-entities (`properties`) with the same
/// shape — line items in particular arrive as a parent entity whose
/// description, quantity, and amount are properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntity {
    /// Type tag assigned by the provider (e.g. `supplier_name`,
    /// `line_item/description`).
    pub entity_type: String,
    /// Raw mention text as it appears in the document.
    pub mention_text: String,
    /// Provider-normalized text, empty when the provider offers none.
    #[serde(default)]
    pub normalized_text: String,
    /// Provider confidence in [0, 1].
    #[serde(default)]
    pub confidence: f32,
    /// Nested sub-entities.
    #[serde(default)]
    pub properties: Vec<DocumentEntity>,
}

impl DocumentEntity {
    pub fn new(entity_type: impl Into<String>, mention_text: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            mention_text: mention_text.into(),
            normalized_text: String::new(),
            confidence: 0.0,
            properties: Vec::new(),
        }
    }

    /// Attach a nested sub-entity (builder style, used heavily in tests).
    pub fn with_property(mut self, property: DocumentEntity) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// One flat (type, raw value) record fed to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub raw_value: String,
}

impl ExtractedEntity {
    pub fn new(entity_type: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// Flatten a provider entity list into the reconciler's input order:
/// each entity followed by its direct properties.
///
/// Only one level of nesting participates — the provider does not nest
/// deeper for invoice processors.
pub fn flatten_entities(entities: &[DocumentEntity]) -> Vec<ExtractedEntity> {
    let mut flat = Vec::new();
    for entity in entities {
        flat.push(ExtractedEntity::new(
            entity.entity_type.clone(),
            entity.mention_text.clone(),
        ));
        for property in &entity.properties {
            flat.push(ExtractedEntity::new(
                property.entity_type.clone(),
                property.mention_text.clone(),
            ));
        }
    }
    flat
}

/// A monetary field value.
///
/// `Parsed` is the normal case. `Raw` only arises from the fallback pass,
/// which stores the first matching mention verbatim without numeric
/// normalization; raw values never participate in derivation arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Parsed(f64),
    Raw(String),
}

impl AmountValue {
    /// The numeric value, if this amount was parsed.
    pub fn as_parsed(&self) -> Option<f64> {
        match self {
            AmountValue::Parsed(v) => Some(*v),
            AmountValue::Raw(_) => None,
        }
    }

    /// Cell rendering for tabular output.
    pub fn render(&self) -> String {
        match self {
            AmountValue::Parsed(v) => v.to_string(),
            AmountValue::Raw(s) => s.clone(),
        }
    }
}

/// The seven output columns, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceField {
    Client,
    Company,
    Description,
    InvoiceId,
    NetAmount,
    VatAmount,
    TotalAmount,
}

impl InvoiceField {
    /// All fields in output column order.
    pub const COLUMNS: [InvoiceField; 7] = [
        InvoiceField::Client,
        InvoiceField::Company,
        InvoiceField::Description,
        InvoiceField::InvoiceId,
        InvoiceField::NetAmount,
        InvoiceField::VatAmount,
        InvoiceField::TotalAmount,
    ];

    /// Column header as it appears in the generated file.
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceField::Client => "CLIENT",
            InvoiceField::Company => "COMPANY",
            InvoiceField::Description => "DESCRIPTION",
            InvoiceField::InvoiceId => "INVOICE_ID",
            InvoiceField::NetAmount => "NET_AMOUNT",
            InvoiceField::VatAmount => "VAT_AMOUNT",
            InvoiceField::TotalAmount => "TOTAL_AMOUNT",
        }
    }

    /// Provider entity types feeding this field, in priority order.
    pub fn accepted_types(self) -> &'static [&'static str] {
        match self {
            InvoiceField::Client => &[
                "receiver_name",
                "ship_to_name",
                "ship_to_address",
                "remit_to_name",
            ],
            InvoiceField::Company => &["supplier_name", "company"],
            InvoiceField::Description => &["line_item/description"],
            InvoiceField::InvoiceId => &["invoice_id"],
            InvoiceField::NetAmount => &["net_amount"],
            InvoiceField::VatAmount => &["vat/tax_amount", "total_tax_amount"],
            InvoiceField::TotalAmount => &["total_amount"],
        }
    }

    /// Whether values for this field go through numeric normalization.
    pub fn is_monetary(self) -> bool {
        matches!(
            self,
            InvoiceField::NetAmount | InvoiceField::VatAmount | InvoiceField::TotalAmount
        )
    }

    /// Fields covered by the verbatim fallback pass.
    pub fn has_fallback(self) -> bool {
        matches!(
            self,
            InvoiceField::Client | InvoiceField::Company | InvoiceField::VatAmount
        )
    }

    /// Resolve an entity type to the field it feeds.
    pub fn for_entity_type(entity_type: &str) -> Option<InvoiceField> {
        Self::COLUMNS
            .into_iter()
            .find(|field| field.accepted_types().contains(&entity_type))
    }
}

impl std::fmt::Display for InvoiceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single reconciled output record for one document.
///
/// Created fresh per request and discarded after serialization — there is
/// no accumulator state shared across requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub client: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub invoice_id: Option<String>,
    pub net_amount: Option<AmountValue>,
    pub vat_amount: Option<AmountValue>,
    pub total_amount: Option<AmountValue>,
}

impl InvoiceRecord {
    /// Number of populated fields.
    pub fn populated_fields(&self) -> usize {
        [
            self.client.is_some(),
            self.company.is_some(),
            self.description.is_some(),
            self.invoice_id.is_some(),
            self.net_amount.is_some(),
            self.vat_amount.is_some(),
            self.total_amount.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }

    /// Render the record as one row of cells in column order. Absent
    /// fields render as empty cells.
    pub fn to_row(&self) -> Vec<String> {
        let amount_cell =
            |amount: &Option<AmountValue>| amount.as_ref().map(AmountValue::render);
        vec![
            self.client.clone(),
            self.company.clone(),
            self.description.clone(),
            self.invoice_id.clone(),
            amount_cell(&self.net_amount),
            amount_cell(&self.vat_amount),
            amount_cell(&self.total_amount),
        ]
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_preserves_entity_order() {
        let entities = vec![
            DocumentEntity::new("supplier_name", "ACME GmbH"),
            DocumentEntity::new("invoice_id", "INV-17"),
        ];
        let flat = flatten_entities(&entities);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].entity_type, "supplier_name");
        assert_eq!(flat[1].raw_value, "INV-17");
    }

    #[test]
    fn flatten_interleaves_properties_after_parent() {
        let entities = vec![
            DocumentEntity::new("line_item", "Widget 2 x 10.00")
                .with_property(DocumentEntity::new("line_item/description", "Widget"))
                .with_property(DocumentEntity::new("line_item/amount", "20.00")),
            DocumentEntity::new("total_amount", "20.00"),
        ];
        let flat = flatten_entities(&entities);
        let types: Vec<&str> = flat.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "line_item",
                "line_item/description",
                "line_item/amount",
                "total_amount"
            ]
        );
    }

    #[test]
    fn field_lookup_by_entity_type() {
        assert_eq!(
            InvoiceField::for_entity_type("receiver_name"),
            Some(InvoiceField::Client)
        );
        assert_eq!(
            InvoiceField::for_entity_type("total_tax_amount"),
            Some(InvoiceField::VatAmount)
        );
        assert_eq!(
            InvoiceField::for_entity_type("line_item/description"),
            Some(InvoiceField::Description)
        );
        assert_eq!(InvoiceField::for_entity_type("currency"), None);
    }

    #[test]
    fn monetary_and_fallback_flags() {
        assert!(InvoiceField::NetAmount.is_monetary());
        assert!(InvoiceField::VatAmount.is_monetary());
        assert!(InvoiceField::TotalAmount.is_monetary());
        assert!(!InvoiceField::Client.is_monetary());

        assert!(InvoiceField::Client.has_fallback());
        assert!(InvoiceField::Company.has_fallback());
        assert!(InvoiceField::VatAmount.has_fallback());
        assert!(!InvoiceField::TotalAmount.has_fallback());
        assert!(!InvoiceField::Description.has_fallback());
    }

    #[test]
    fn column_headers_in_schema_order() {
        let headers: Vec<&str> = InvoiceField::COLUMNS.iter().map(|f| f.as_str()).collect();
        assert_eq!(
            headers,
            vec![
                "CLIENT",
                "COMPANY",
                "DESCRIPTION",
                "INVOICE_ID",
                "NET_AMOUNT",
                "VAT_AMOUNT",
                "TOTAL_AMOUNT"
            ]
        );
    }

    #[test]
    fn amount_value_parsed_accessor() {
        assert_eq!(AmountValue::Parsed(12.5).as_parsed(), Some(12.5));
        assert_eq!(AmountValue::Raw("12,5 EUR".to_string()).as_parsed(), None);
    }

    #[test]
    fn amount_value_render() {
        assert_eq!(AmountValue::Parsed(1234.56).render(), "1234.56");
        assert_eq!(AmountValue::Parsed(20.0).render(), "20");
        assert_eq!(AmountValue::Raw("n/a".to_string()).render(), "n/a");
    }

    #[test]
    fn record_row_has_seven_cells_with_blanks_for_absent() {
        let record = InvoiceRecord {
            company: Some("ACME GmbH".to_string()),
            total_amount: Some(AmountValue::Parsed(120.0)),
            ..InvoiceRecord::default()
        };
        let row = record.to_row();
        assert_eq!(row.len(), 7);
        assert_eq!(row[0], "");
        assert_eq!(row[1], "ACME GmbH");
        assert_eq!(row[6], "120");
        assert_eq!(record.populated_fields(), 2);
    }

    #[test]
    fn document_entity_serde_roundtrip() {
        let entity = DocumentEntity::new("net_amount", "100,00")
            .with_confidence(0.97)
            .with_property(DocumentEntity::new("currency", "EUR"));
        let json = serde_json::to_string(&entity).unwrap();
        let back: DocumentEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn invoice_field_serde_uses_column_names() {
        let json = serde_json::to_string(&InvoiceField::NetAmount).unwrap();
        assert_eq!(json, "\"NET_AMOUNT\"");
    }
}
