use crate::error::Result;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A transaction as read off a bank statement.
///
/// Field order is significant: prompts embed the serialized form, so the
/// declaration order here is the order the model sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Posting date exactly as printed on the statement")]
    pub date: String,

    #[schemars(description = "Transaction description exactly as printed on the statement")]
    pub description: String,

    #[schemars(
        description = "Signed amount of the transaction. Keep the sign used by the statement."
    )]
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "True when money entered the account")]
    pub is_credit: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "One label from the supplied category list")]
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(date: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            is_credit: None,
            category: None,
        }
    }

    pub fn with_credit(mut self, is_credit: bool) -> Self {
        self.is_credit = Some(is_credit);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A transaction delivered by the account-sync feed.
///
/// Amounts follow the feed's polarity: positive values leave the account,
/// negative values enter it. Every feed field without a dedicated slot is
/// kept in `details` so prompts carry the full record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncedTransaction {
    pub transaction_id: String,
    pub amount: f64,
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_category: Option<String>,

    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl SyncedTransaction {
    pub fn new(transaction_id: impl Into<String>, date: impl Into<String>, amount: f64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
            date: date.into(),
            merchant_name: None,
            original_description: None,
            income_category: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_merchant(mut self, merchant_name: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.original_description = Some(description.into());
        self
    }

    /// Returns a copy of this record labelled with `income_category`.
    pub fn with_income_category(&self, income_category: impl Into<String>) -> Self {
        Self {
            income_category: Some(income_category.into()),
            ..self.clone()
        }
    }
}

/// A recurring-transfer pattern whose members are embedded in full.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Structure {
    #[schemars(description = "Short title naming the recipient and the pattern")]
    pub title: String,

    #[schemars(description = "The transactions that make up the pattern")]
    pub transactions: Vec<Transaction>,

    #[schemars(description = "Why these transactions look like a recurring transfer")]
    pub description: String,
}

/// A recurring-transfer pattern whose members are referenced by transaction id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct StructureRef {
    #[schemars(description = "Short title naming the recipient and the pattern")]
    pub title: String,

    #[schemars(description = "Ids of the transactions that make up the pattern")]
    pub transaction_ids: Vec<String>,

    #[schemars(description = "Why these transfers look like money moving to the same person")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct IncomeCategory {
    #[schemars(description = "Brief reasoning behind the chosen category")]
    pub reasoning: String,

    #[schemars(description = "Exactly one label from the supplied income categories")]
    pub income_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct IncomeSourceGroup {
    #[schemars(description = "Name of the income source, e.g. the employer or agency")]
    pub title: String,

    #[schemars(description = "Exactly one label from the supplied income categories")]
    pub income_category: String,

    #[schemars(description = "What this income source is and how it was recognised")]
    pub description: String,

    #[schemars(description = "Ids of the transactions that belong to this source")]
    pub transaction_ids: Vec<String>,
}

/// A model-produced grouping of transactions.
pub trait Grouping {
    /// False when the model returned the grouping with no members.
    fn is_populated(&self) -> bool;
}

impl Grouping for Structure {
    fn is_populated(&self) -> bool {
        !self.transactions.is_empty()
    }
}

impl Grouping for StructureRef {
    fn is_populated(&self) -> bool {
        !self.transaction_ids.is_empty()
    }
}

impl Grouping for IncomeSourceGroup {
    fn is_populated(&self) -> bool {
        !self.transaction_ids.is_empty()
    }
}

/// Whether at least one grouping has members. An all-empty result set means
/// nothing was found.
pub fn any_populated<G: Grouping>(groups: &[G]) -> bool {
    groups.iter().any(Grouping::is_populated)
}

const SUPPORTED_KEYWORDS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
    "minItems",
    "maxItems",
];

/// Renders the response schema for `T` in the OpenAPI subset accepted by
/// schema-constrained generation: every subschema inlined, optionals marked
/// `nullable`, and no `$schema`, `title`, `definitions` or
/// `additionalProperties` keywords.
pub fn response_schema_for<T: JsonSchema>() -> Result<Value> {
    let mut settings = SchemaSettings::openapi3();
    settings.inline_subschemas = true;
    settings.meta_schema = None;

    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root.schema)?;
    strip_unsupported(&mut value);
    Ok(value)
}

fn strip_unsupported(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    map.retain(|key, _| SUPPORTED_KEYWORDS.contains(&key.as_str()));

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for property in properties.values_mut() {
            strip_unsupported(property);
        }
    }
    if let Some(items) = map.get_mut("items") {
        strip_unsupported(items);
    }
}

/// Pins every property named `field` in `schema` to the given labels.
pub fn constrain_enum(schema: &mut Value, field: &str, labels: &[String]) {
    let Value::Object(map) = schema else {
        return;
    };

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for (name, property) in properties.iter_mut() {
            if name == field {
                if let Value::Object(property) = property {
                    property.insert("type".to_string(), Value::from("string"));
                    property.insert("format".to_string(), Value::from("enum"));
                    property.insert(
                        "enum".to_string(),
                        Value::Array(labels.iter().cloned().map(Value::from).collect()),
                    );
                }
            } else {
                constrain_enum(property, field, labels);
            }
        }
    }
    if let Some(items) = map.get_mut("items") {
        constrain_enum(items, field, labels);
    }
}
