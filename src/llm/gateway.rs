use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;

use crate::error::{InsightError, Result};
use crate::llm::operations::{
    ExtractTransactions, GroupIncomeSources, IdentifyIncomeCategory, IdentifyStructures,
    IdentifyTransferStructures, Operation,
};
use crate::llm::types::{Document, GenerationRequest, PromptPart};
use crate::schema::{
    IncomeCategory, IncomeSourceGroup, Structure, StructureRef, SyncedTransaction, Transaction,
};
use crate::taxonomy::Taxonomy;

/// The network boundary: one schema-constrained generation per call,
/// returning the model's raw JSON text.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[async_trait]
impl<B: GenerativeBackend + ?Sized> GenerativeBackend for &B {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        (**self).generate(request).await
    }
}

/// Sends operations to a backend and parses the replies into typed records.
///
/// The backend is constructed once by the caller and shared by every call
/// made through this gateway. Nothing is retried.
pub struct ModelGateway<B> {
    backend: B,
}

impl<B: GenerativeBackend> ModelGateway<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn execute<O: Operation>(&self, operation: &O) -> Result<O::Output> {
        let request = GenerationRequest {
            operation: O::NAME,
            parts: operation.prompt_parts()?,
            response_schema: operation.response_schema()?,
        };

        debug!(
            "{}: sending {} prompt part(s), {} bytes of text, {} document(s)",
            O::NAME,
            request.parts.len(),
            request.prompt_text().len(),
            request
                .parts
                .iter()
                .filter(|p| matches!(p, PromptPart::Document(_)))
                .count()
        );

        let raw = self.backend.generate(&request).await?;
        parse_response(O::NAME, &raw)
    }

    pub async fn extract_transactions(
        &self,
        document: &Document,
        taxonomy: &Taxonomy,
    ) -> Result<Vec<Transaction>> {
        self.execute(&ExtractTransactions { document, taxonomy })
            .await
    }

    pub async fn identify_structures(&self, transactions: &[Transaction]) -> Result<Vec<Structure>> {
        self.execute(&IdentifyStructures { transactions }).await
    }

    pub async fn identify_transfer_structures(
        &self,
        transactions: &[SyncedTransaction],
    ) -> Result<Vec<StructureRef>> {
        self.execute(&IdentifyTransferStructures { transactions })
            .await
    }

    pub async fn identify_income_category(
        &self,
        transaction: &SyncedTransaction,
        taxonomy: &Taxonomy,
    ) -> Result<IncomeCategory> {
        self.execute(&IdentifyIncomeCategory {
            transaction,
            taxonomy,
        })
        .await
    }

    pub async fn group_income_sources(
        &self,
        transactions: &[SyncedTransaction],
        taxonomy: &Taxonomy,
    ) -> Result<Vec<IncomeSourceGroup>> {
        self.execute(&GroupIncomeSources {
            transactions,
            taxonomy,
        })
        .await
    }
}

/// Parses a model reply into `T`. Surrounding whitespace and a Markdown code
/// fence are tolerated; anything else that does not fit `T` is a schema
/// violation.
pub fn parse_response<T: DeserializeOwned>(operation: &'static str, raw: &str) -> Result<T> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|source| InsightError::SchemaViolation { operation, source })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
