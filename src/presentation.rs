//! Flattening typed records into labelled rows for a table renderer.
//!
//! The renderer treats `$` as a formatting directive, so free-text fields
//! are escaped before they leave this module.

use serde::Serialize;
use serde_json::Value;

use crate::error::{InsightError, Result};
use crate::partition::{resolve_ids, LedgerEntry, TransactionIndex};
use crate::schema::{IncomeSourceGroup, Structure, StructureRef};

/// Escapes every `$` as `\$`.
pub fn escape_dollars(text: &str) -> String {
    text.replace('$', "\\$")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub source: String,
    pub label: String,
    /// Free text that must be escaped before display.
    pub escape: bool,
}

/// Ordered mapping of source field name to display label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: Vec<Field>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free-text field; its value is `$`-escaped.
    pub fn text(mut self, source: impl Into<String>, label: impl Into<String>) -> Self {
        self.fields.push(Field {
            source: source.into(),
            label: label.into(),
            escape: true,
        });
        self
    }

    /// Adds a field whose value is passed through untouched.
    pub fn value(mut self, source: impl Into<String>, label: impl Into<String>) -> Self {
        self.fields.push(Field {
            source: source.into(),
            label: label.into(),
            escape: false,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The lean view of a feed transaction.
    pub fn synced_transaction() -> Self {
        Self::new()
            .text("merchant_name", "Name")
            .value("date", "Date")
            .text("original_description", "Description")
            .value("amount", "Amount")
            .value("income_category", "Income Category")
    }

    pub fn statement_transaction() -> Self {
        Self::new()
            .value("date", "Date")
            .text("description", "Description")
            .value("amount", "Amount")
            .value("is_credit", "Credit")
            .value("category", "Category")
    }
}

/// One table row: labelled cells in field-map order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, value)| value)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(label, _)| label.as_str())
    }

    pub fn cells(&self) -> &[(String, Value)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Projects `record` through `fields`. Fields that are missing or null are
/// left out of the row.
pub fn to_row<T: Serialize>(record: &T, fields: &FieldMap) -> Result<Row> {
    let value = serde_json::to_value(record)?;
    let Value::Object(object) = value else {
        return Err(InsightError::Input(
            "Only records that serialize to an object can be shown as rows".to_string(),
        ));
    };

    let cells = fields
        .fields()
        .iter()
        .filter_map(|field| {
            let value = object.get(&field.source)?;
            let value = match value {
                Value::Null => return None,
                Value::String(text) if field.escape => Value::String(escape_dollars(text)),
                other => other.clone(),
            };
            Some((field.label.clone(), value))
        })
        .collect();

    Ok(Row { cells })
}

pub fn to_rows<'a, T, I>(records: I, fields: &FieldMap) -> Result<Vec<Row>>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .map(|record| to_row(record, fields))
        .collect()
}

/// Every label used by `rows`, in first-seen order.
pub fn column_labels(rows: &[Row]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in rows.iter().flat_map(Row::labels) {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

/// An expandable block: heading, explanatory text and a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub body: String,
    pub rows: Vec<Row>,
}

pub fn structure_section(structure: &Structure, fields: &FieldMap) -> Result<Section> {
    Ok(Section {
        heading: escape_dollars(&structure.title),
        body: escape_dollars(&structure.description),
        rows: to_rows(&structure.transactions, fields)?,
    })
}

pub fn transfer_structure_section<T>(
    structure: &StructureRef,
    lookup: &TransactionIndex<T>,
    fields: &FieldMap,
) -> Result<Section>
where
    T: LedgerEntry + Serialize,
{
    let members = resolve_ids(&structure.transaction_ids, lookup);
    Ok(Section {
        heading: escape_dollars(&structure.title),
        body: escape_dollars(&structure.description),
        rows: to_rows(members, fields)?,
    })
}

pub fn income_section<T>(
    group: &IncomeSourceGroup,
    lookup: &TransactionIndex<T>,
    fields: &FieldMap,
) -> Result<Section>
where
    T: LedgerEntry + Serialize,
{
    let members = resolve_ids(&group.transaction_ids, lookup);
    Ok(Section {
        heading: format!(
            "{} ({})",
            escape_dollars(&group.title),
            group.income_category
        ),
        body: escape_dollars(&group.description),
        rows: to_rows(members, fields)?,
    })
}
