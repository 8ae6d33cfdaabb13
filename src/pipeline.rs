//! The two review workflows.
//!
//! Each workflow is one user action: its model calls run one after another,
//! each depending on the previous answer, and the first failure aborts the
//! whole action.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::error::Result;
use crate::feed::TransactionFeed;
use crate::llm::{Document, GenerativeBackend, ModelGateway};
use crate::partition::{partition_by_credit, partition_by_sign};
use crate::presentation::{
    income_section, structure_section, to_rows, transfer_structure_section, FieldMap, Row,
    Section,
};
use crate::schema::{any_populated, Grouping, SyncedTransaction, Transaction};
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReviewEvent {
    Starting,
    ExtractingTransactions,
    LoadingTransactions,
    IdentifyingIncome,
    IdentifyingStructures,
    Finished,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructureFindings {
    Found(Vec<Section>),
    NoneFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncomeFindings {
    Found(Vec<Section>),
    NoIncomeTransactions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementReport {
    pub transactions: Vec<Transaction>,
    pub transaction_rows: Vec<Row>,
    /// Rows of transactions flagged `is_credit`, in statement order.
    pub credit_rows: Vec<Row>,
    /// Rows of every other transaction, unflagged ones included.
    pub debit_rows: Vec<Row>,
    /// `None` when the statement yielded no transactions to analyse.
    pub structures: Option<StructureFindings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountReport {
    pub transaction_rows: Vec<Row>,
    pub income: IncomeFindings,
    pub structures: StructureFindings,
}

async fn send_event(sender: &Option<Sender<ReviewEvent>>, event: ReviewEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event).await;
    }
}

async fn report_outcome<T>(sender: &Option<Sender<ReviewEvent>>, outcome: Result<T>) -> Result<T> {
    match &outcome {
        Ok(_) => send_event(sender, ReviewEvent::Finished).await,
        Err(e) => {
            send_event(
                sender,
                ReviewEvent::Failed {
                    reason: e.to_string(),
                },
            )
            .await
        }
    }
    outcome
}

fn populated<G: Grouping>(groups: Vec<G>) -> Vec<G> {
    groups.into_iter().filter(Grouping::is_populated).collect()
}

/// Statement upload: extract transactions from a document, then look for
/// recurring transfers among them.
pub struct StatementReview<'a, B> {
    gateway: &'a ModelGateway<B>,
    taxonomy: Taxonomy,
    fields: FieldMap,
    progress: Option<Sender<ReviewEvent>>,
}

impl<'a, B: GenerativeBackend> StatementReview<'a, B> {
    /// `taxonomy` labels every extracted transaction, debits included.
    /// [`Taxonomy::income`] works for a whole statement because it carries
    /// `transfer` and `nonIncomeOther` for money leaving the account.
    pub fn new(gateway: &'a ModelGateway<B>, taxonomy: Taxonomy) -> Self {
        Self {
            gateway,
            taxonomy,
            fields: FieldMap::statement_transaction(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Sender<ReviewEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    pub async fn run(&self, document: &Document) -> Result<StatementReport> {
        send_event(&self.progress, ReviewEvent::Starting).await;
        let outcome = self.review(document).await;
        report_outcome(&self.progress, outcome).await
    }

    async fn review(&self, document: &Document) -> Result<StatementReport> {
        send_event(&self.progress, ReviewEvent::ExtractingTransactions).await;
        info!("Extracting transactions from {}", document.display_name);
        let transactions = self
            .gateway
            .extract_transactions(document, &self.taxonomy)
            .await?;
        info!("Extracted {} transaction(s)", transactions.len());

        let unknown = self
            .taxonomy
            .unrecognized(transactions.iter().filter_map(|t| t.category.as_deref()));
        if !unknown.is_empty() {
            warn!("Model used categories outside the taxonomy: {:?}", unknown);
        }

        let transaction_rows = to_rows(&transactions, &self.fields)?;
        let split = partition_by_credit(&transactions);
        let credit_rows = to_rows(&split.credits, &self.fields)?;
        let debit_rows = to_rows(&split.debits, &self.fields)?;

        if transactions.is_empty() {
            return Ok(StatementReport {
                transactions,
                transaction_rows,
                credit_rows,
                debit_rows,
                structures: None,
            });
        }

        send_event(&self.progress, ReviewEvent::IdentifyingStructures).await;
        let structures = self.gateway.identify_structures(&transactions).await?;

        let findings = if any_populated(&structures) {
            let sections = populated(structures)
                .iter()
                .map(|s| structure_section(s, &self.fields))
                .collect::<Result<Vec<_>>>()?;
            info!("Found {} structure(s)", sections.len());
            StructureFindings::Found(sections)
        } else {
            info!("No structures found");
            StructureFindings::NoneFound
        };

        Ok(StatementReport {
            transactions,
            transaction_rows,
            credit_rows,
            debit_rows,
            structures: Some(findings),
        })
    }
}

/// Linked account: sync transactions, group incoming money by source and
/// look for recurring transfers among outgoing money.
pub struct AccountReview<'a, B, F> {
    gateway: &'a ModelGateway<B>,
    feed: &'a F,
    taxonomy: Taxonomy,
    fields: FieldMap,
    progress: Option<Sender<ReviewEvent>>,
}

impl<'a, B: GenerativeBackend, F: TransactionFeed> AccountReview<'a, B, F> {
    pub fn new(gateway: &'a ModelGateway<B>, feed: &'a F) -> Self {
        Self {
            gateway,
            feed,
            taxonomy: Taxonomy::income(),
            fields: FieldMap::synced_transaction(),
            progress: None,
        }
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    pub fn with_progress(mut self, progress: Sender<ReviewEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&self, access_token: &str) -> Result<AccountReport> {
        send_event(&self.progress, ReviewEvent::Starting).await;
        let outcome = self.review(access_token).await;
        report_outcome(&self.progress, outcome).await
    }

    async fn review(&self, access_token: &str) -> Result<AccountReport> {
        send_event(&self.progress, ReviewEvent::LoadingTransactions).await;
        let transactions = self.feed.sync(access_token).await?;
        info!("Loaded {} transaction(s)", transactions.len());
        let transaction_rows = to_rows(&transactions, &self.fields)?;

        let partition = partition_by_sign(transactions);

        send_event(&self.progress, ReviewEvent::IdentifyingIncome).await;
        let income = if partition.income.is_empty() {
            info!("No income transactions found");
            IncomeFindings::NoIncomeTransactions
        } else {
            let groups = self
                .gateway
                .group_income_sources(partition.income.as_slice(), &self.taxonomy)
                .await?;

            let unknown = self
                .taxonomy
                .unrecognized(groups.iter().map(|g| g.income_category.as_str()));
            if !unknown.is_empty() {
                warn!("Model used income categories outside the taxonomy: {:?}", unknown);
            }

            let sections = groups
                .iter()
                .map(|g| income_section(g, &partition.income, &self.fields))
                .collect::<Result<Vec<_>>>()?;
            info!("Grouped income into {} source(s)", sections.len());
            IncomeFindings::Found(sections)
        };

        send_event(&self.progress, ReviewEvent::IdentifyingStructures).await;
        let structures = if partition.transfer.is_empty() {
            StructureFindings::NoneFound
        } else {
            let found = self
                .gateway
                .identify_transfer_structures(partition.transfer.as_slice())
                .await?;

            if any_populated(&found) {
                let sections = populated(found)
                    .iter()
                    .map(|s| transfer_structure_section(s, &partition.transfer, &self.fields))
                    .collect::<Result<Vec<_>>>()?;
                StructureFindings::Found(sections)
            } else {
                StructureFindings::NoneFound
            }
        };

        Ok(AccountReport {
            transaction_rows,
            income,
            structures,
        })
    }
}

/// Asks the model for an income category for each transaction in turn and
/// returns re-labelled copies, in input order.
pub async fn categorize_each<B: GenerativeBackend>(
    gateway: &ModelGateway<B>,
    transactions: &[SyncedTransaction],
    taxonomy: &Taxonomy,
) -> Result<Vec<SyncedTransaction>> {
    let mut labelled = Vec::with_capacity(transactions.len());
    for transaction in transactions {
        let answer = gateway
            .identify_income_category(transaction, taxonomy)
            .await?;
        if !taxonomy.contains(&answer.income_category) {
            warn!(
                "Transaction {} labelled '{}', which is not in the taxonomy",
                transaction.transaction_id, answer.income_category
            );
        }
        labelled.push(transaction.with_income_category(answer.income_category));
    }
    Ok(labelled)
}
