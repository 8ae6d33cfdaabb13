//! Registry of model operations.
//!
//! Each operation is a type that knows its prompt and the shape of its
//! answer, so the result type is chosen at compile time by the caller
//! instead of being passed around as a runtime value.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::llm::prompts;
use crate::llm::types::{Document, PromptPart};
use crate::schema::{
    constrain_enum, response_schema_for, IncomeCategory, IncomeSourceGroup, Structure,
    StructureRef, SyncedTransaction, Transaction,
};
use crate::taxonomy::Taxonomy;

pub trait Operation {
    /// Stable name used in logs and error context.
    const NAME: &'static str;

    /// The shape the model is asked to return.
    type Output: DeserializeOwned + JsonSchema;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>>;

    fn response_schema(&self) -> Result<Value> {
        response_schema_for::<Self::Output>()
    }
}

/// Pull every transaction out of an attached statement.
pub struct ExtractTransactions<'a> {
    pub document: &'a Document,
    pub taxonomy: &'a Taxonomy,
}

impl Operation for ExtractTransactions<'_> {
    const NAME: &'static str = "extract_transactions";
    type Output = Vec<Transaction>;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>> {
        Ok(vec![
            PromptPart::Document(self.document.clone()),
            PromptPart::Text(prompts::format_extraction_request(self.taxonomy)),
        ])
    }

    fn response_schema(&self) -> Result<Value> {
        let mut schema = response_schema_for::<Self::Output>()?;
        constrain_enum(&mut schema, "category", self.taxonomy.labels());
        Ok(schema)
    }
}

/// Find recurring transfers among statement transactions.
pub struct IdentifyStructures<'a> {
    pub transactions: &'a [Transaction],
}

impl Operation for IdentifyStructures<'_> {
    const NAME: &'static str = "identify_structures";
    type Output = Vec<Structure>;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>> {
        Ok(vec![PromptPart::Text(prompts::format_structure_request(
            self.transactions,
        )?)])
    }
}

/// Find own-account transfers among feed transactions, answered by id.
pub struct IdentifyTransferStructures<'a> {
    pub transactions: &'a [SyncedTransaction],
}

impl Operation for IdentifyTransferStructures<'_> {
    const NAME: &'static str = "identify_transfer_structures";
    type Output = Vec<StructureRef>;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>> {
        Ok(vec![PromptPart::Text(
            prompts::format_transfer_structure_request(self.transactions)?,
        )])
    }
}

/// Pick one income category for a single transaction.
pub struct IdentifyIncomeCategory<'a> {
    pub transaction: &'a SyncedTransaction,
    pub taxonomy: &'a Taxonomy,
}

impl Operation for IdentifyIncomeCategory<'_> {
    const NAME: &'static str = "identify_income_category";
    type Output = IncomeCategory;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>> {
        Ok(vec![PromptPart::Text(
            prompts::format_income_category_request(self.transaction, self.taxonomy)?,
        )])
    }

    fn response_schema(&self) -> Result<Value> {
        let mut schema = response_schema_for::<Self::Output>()?;
        constrain_enum(&mut schema, "income_category", self.taxonomy.labels());
        Ok(schema)
    }
}

/// Cluster income transactions by source.
pub struct GroupIncomeSources<'a> {
    pub transactions: &'a [SyncedTransaction],
    pub taxonomy: &'a Taxonomy,
}

impl Operation for GroupIncomeSources<'_> {
    const NAME: &'static str = "group_income_sources";
    type Output = Vec<IncomeSourceGroup>;

    fn prompt_parts(&self) -> Result<Vec<PromptPart>> {
        Ok(vec![PromptPart::Text(prompts::format_income_group_request(
            self.transactions,
            self.taxonomy,
        )?)])
    }

    fn response_schema(&self) -> Result<Value> {
        let mut schema = response_schema_for::<Self::Output>()?;
        constrain_enum(&mut schema, "income_category", self.taxonomy.labels());
        Ok(schema)
    }
}
