//! # Transaction Insights
//!
//! Schema-constrained LLM requests over bank transactions: extract the
//! transactions on a statement, group incoming money by income source, and
//! flag recurring transfers that look like money moving between the same
//! person's accounts ("structures").
//!
//! ## Core Concepts
//!
//! - **Operation**: a typed request (prompt + declared response shape), see [`llm::Operation`]
//! - **Gateway**: sends operations to a [`llm::GenerativeBackend`] and parses replies into typed records
//! - **Taxonomy**: the ordered list of category labels offered to the model
//! - **Partition / Join**: split statement lines by credit flag and feed transactions by sign, and resolve model-returned ids back to records
//! - **Presentation**: flatten records into labelled rows, escaping `$` for the table renderer
//!
//! ## Example
//!
//! ```rust,ignore
//! use transaction_insights::*;
//!
//! let backend = GeminiClient::new(GeminiConfig::from_env()?);
//! let gateway = ModelGateway::new(backend);
//!
//! let document = Document::from_path(Path::new("statement.pdf")).await?;
//! // The income labels include `transfer` and `nonIncomeOther`, so debits
//! // on the statement get a label too.
//! let statement_labels = Taxonomy::income();
//! let report = StatementReview::new(&gateway, statement_labels)
//!     .run(&document)
//!     .await?;
//! println!("{} credit(s), {} debit(s)", report.credit_rows.len(), report.debit_rows.len());
//!
//! if let Some(StructureFindings::Found(sections)) = report.structures {
//!     for section in sections {
//!         println!("{}: {} transaction(s)", section.heading, section.rows.len());
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod feed;
pub mod llm;
pub mod partition;
pub mod pipeline;
pub mod presentation;
pub mod schema;
pub mod taxonomy;

pub use config::*;
pub use error::{InsightError, Result};
pub use evaluation::*;
pub use feed::*;
pub use llm::*;
pub use partition::*;
pub use pipeline::*;
pub use presentation::*;
pub use schema::*;
pub use taxonomy::*;
