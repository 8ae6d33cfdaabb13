use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use transaction_insights::*;

/// Replies with a scripted JSON body per operation and records every request.
#[derive(Default)]
struct ScriptedBackend {
    replies: HashMap<&'static str, String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    fn reply(mut self, operation: &'static str, body: impl Into<String>) -> Self {
        self.replies.insert(operation, body.into());
        self
    }

    fn operations(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.operation)
            .collect()
    }

    fn request(&self, operation: &str) -> GenerationRequest {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.operation == operation)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .get(request.operation)
            .cloned()
            .ok_or_else(|| InsightError::Provider(format!("no reply for {}", request.operation)))
    }
}

/// Answers every structure request by echoing the transactions it was sent.
struct EchoBackend;

#[async_trait]
impl GenerativeBackend for EchoBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let text = request.prompt_text();
        let start = text.find("<transaction_data>\n").unwrap() + "<transaction_data>\n".len();
        let end = text.find("\n</transaction_data>").unwrap();
        let records: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&text[start..end])
            .into_iter::<serde_json::Value>()
            .collect::<std::result::Result<_, _>>()?;
        Ok(serde_json::json!([{
            "title": "Echo",
            "description": "Everything sent",
            "transactions": records,
        }])
        .to_string())
    }
}

struct StubFeed {
    transactions: Vec<SyncedTransaction>,
}

#[async_trait]
impl TransactionFeed for StubFeed {
    async fn sync(&self, access_token: &str) -> Result<Vec<SyncedTransaction>> {
        if access_token.is_empty() {
            return Err(InsightError::Provider("INVALID_ACCESS_TOKEN".to_string()));
        }
        Ok(self.transactions.clone())
    }
}

fn statement() -> Document {
    Document::pdf("march.pdf", b"%PDF-1.4 fake".to_vec())
}

fn feed_transactions() -> Vec<SyncedTransaction> {
    vec![
        SyncedTransaction::new("pay-1", "2024-03-01", -2500.0)
            .with_merchant("Acme Corp")
            .with_description("ACME PAYROLL"),
        SyncedTransaction::new("zel-1", "2024-03-02", 400.0).with_description("ZELLE TO J DOE $400"),
        SyncedTransaction::new("pay-2", "2024-03-15", -2500.0)
            .with_merchant("Acme Corp")
            .with_description("ACME PAYROLL"),
        SyncedTransaction::new("zel-2", "2024-03-16", 400.0).with_description("ZELLE TO J DOE $400"),
        SyncedTransaction::new("gro-1", "2024-03-17", 0.0).with_description("GROCER VOID"),
    ]
}

#[tokio::test]
async fn test_structure_round_trip_through_echo() {
    let transactions = vec![
        Transaction::new("2024-01-05", "TRANSFER TO SAVINGS", -500.0).with_credit(false),
        Transaction::new("2024-01-06", "PAYROLL", 2500.25)
            .with_credit(true)
            .with_category("paycheckW2"),
        Transaction::new("2024-02-05", "TRANSFER TO SAVINGS", -500.0),
    ];

    let gateway = ModelGateway::new(EchoBackend);
    let structures = gateway.identify_structures(&transactions).await.unwrap();

    assert_eq!(structures.len(), 1);
    assert_eq!(structures[0].transactions, transactions);
}

#[tokio::test]
async fn test_extraction_round_trip() {
    let transactions = vec![
        Transaction::new("03/01", "COFFEE $4", -4.5).with_category("nonIncomeOther"),
        Transaction::new("03/02", "REFUND", 12.0).with_credit(true),
    ];
    let backend = ScriptedBackend::default().reply(
        "extract_transactions",
        serde_json::to_string(&transactions).unwrap(),
    );
    let gateway = ModelGateway::new(&backend);

    let taxonomy = Taxonomy::income();
    let extracted = gateway
        .extract_transactions(&statement(), &taxonomy)
        .await
        .unwrap();
    assert_eq!(extracted, transactions);

    let request = backend.request("extract_transactions");
    assert!(matches!(request.parts[0], PromptPart::Document(_)));
    assert_eq!(request.prompt_text(), format_extraction_request(&taxonomy));
}

#[tokio::test]
async fn test_schema_violation_surfaces() {
    let backend = ScriptedBackend::default().reply("identify_structures", r#"[{"title": "x"}]"#);
    let gateway = ModelGateway::new(backend);

    let err = gateway
        .identify_structures(&[Transaction::new("d", "t", 1.0)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InsightError::SchemaViolation {
            operation: "identify_structures",
            ..
        }
    ));
}

#[tokio::test]
async fn test_statement_review_reports_populated_structures_only() {
    let extracted = r#"[
        {"date": "2024-01-05", "description": "TRANSFER TO J DOE", "amount": -300.0},
        {"date": "2024-02-05", "description": "TRANSFER TO J DOE", "amount": -300.0}
    ]"#;
    let structures = r#"[
        {"title": "Monthly $300 to J Doe", "description": "Same amount, same day each month ($300)",
         "transactions": [
            {"date": "2024-01-05", "description": "TRANSFER TO J DOE", "amount": -300.0},
            {"date": "2024-02-05", "description": "TRANSFER TO J DOE", "amount": -300.0}
         ]},
        {"title": "Empty", "description": "nothing", "transactions": []}
    ]"#;
    let backend = ScriptedBackend::default()
        .reply("extract_transactions", extracted)
        .reply("identify_structures", structures);
    let gateway = ModelGateway::new(&backend);

    let (tx, mut rx) = mpsc::channel(16);
    let report = StatementReview::new(&gateway, Taxonomy::income())
        .with_progress(tx)
        .run(&statement())
        .await
        .unwrap();

    assert_eq!(report.transactions.len(), 2);
    assert_eq!(report.transaction_rows.len(), 2);
    assert!(report.credit_rows.is_empty());
    assert_eq!(report.debit_rows.len(), 2);

    let Some(StructureFindings::Found(sections)) = report.structures else {
        panic!("expected structures");
    };
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].heading, "Monthly \\$300 to J Doe");
    assert_eq!(sections[0].body, "Same amount, same day each month (\\$300)");
    assert_eq!(sections[0].rows.len(), 2);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            ReviewEvent::Starting,
            ReviewEvent::ExtractingTransactions,
            ReviewEvent::IdentifyingStructures,
            ReviewEvent::Finished,
        ]
    );
}

#[tokio::test]
async fn test_statement_review_all_empty_structures_is_none_found() {
    let backend = ScriptedBackend::default()
        .reply(
            "extract_transactions",
            r#"[{"date": "2024-01-05", "description": "RENT", "amount": -900.0}]"#,
        )
        .reply(
            "identify_structures",
            r#"[{"title": "Nothing", "description": "", "transactions": []}]"#,
        );
    let gateway = ModelGateway::new(backend);

    let report = StatementReview::new(&gateway, Taxonomy::income())
        .run(&statement())
        .await
        .unwrap();
    assert_eq!(report.structures, Some(StructureFindings::NoneFound));
}

#[tokio::test]
async fn test_statement_review_skips_structures_without_transactions() {
    let backend = ScriptedBackend::default().reply("extract_transactions", "[]");
    let gateway = ModelGateway::new(&backend);

    let report = StatementReview::new(&gateway, Taxonomy::income())
        .run(&statement())
        .await
        .unwrap();

    assert!(report.transactions.is_empty());
    assert_eq!(report.structures, None);
    assert_eq!(backend.operations(), vec!["extract_transactions"]);
}

#[tokio::test]
async fn test_statement_review_splits_credit_and_debit_rows() {
    let extracted = r#"[
        {"date": "03/01", "description": "PAYROLL", "amount": 2500.0, "is_credit": true},
        {"date": "03/02", "description": "RENT", "amount": 900.0, "is_credit": false},
        {"date": "03/03", "description": "REVERSAL", "amount": -15.0, "is_credit": true},
        {"date": "03/04", "description": "ATM", "amount": 60.0}
    ]"#;
    let backend = ScriptedBackend::default()
        .reply("extract_transactions", extracted)
        .reply("identify_structures", "[]");
    let gateway = ModelGateway::new(backend);

    let fields = FieldMap::new()
        .text("description", "Memo")
        .value("amount", "Amount");
    let report = StatementReview::new(&gateway, Taxonomy::income())
        .with_fields(fields)
        .run(&statement())
        .await
        .unwrap();

    fn memos(rows: &[Row]) -> Vec<serde_json::Value> {
        rows.iter().map(|r| r.get("Memo").cloned().unwrap()).collect()
    }
    assert_eq!(
        memos(&report.credit_rows),
        vec![serde_json::json!("PAYROLL"), serde_json::json!("REVERSAL")]
    );
    assert_eq!(
        memos(&report.debit_rows),
        vec![serde_json::json!("RENT"), serde_json::json!("ATM")]
    );
    assert_eq!(report.transaction_rows.len(), 4);
    assert_eq!(column_labels(&report.transaction_rows), vec!["Memo", "Amount"]);
    assert_eq!(report.structures, Some(StructureFindings::NoneFound));
    assert_eq!(
        gateway.backend().operations(),
        vec!["extract_transactions", "identify_structures"]
    );
}

#[tokio::test]
async fn test_account_review_partitions_and_joins() {
    let groups = r#"[
        {"title": "Acme Corp", "income_category": "paycheckW2",
         "description": "Semi-monthly payroll", "transaction_ids": ["pay-1", "pay-2", "hallucinated"]}
    ]"#;
    let structures = r#"[
        {"title": "Zelle to J Doe", "description": "$400 twice a month",
         "transaction_ids": ["zel-1", "zel-2"]}
    ]"#;
    let backend = ScriptedBackend::default()
        .reply("group_income_sources", groups)
        .reply("identify_transfer_structures", structures);
    let gateway = ModelGateway::new(&backend);
    let feed = StubFeed {
        transactions: feed_transactions(),
    };

    let report = AccountReview::new(&gateway, &feed)
        .run("access-sandbox-123")
        .await
        .unwrap();

    assert_eq!(report.transaction_rows.len(), 5);
    assert_eq!(
        report.transaction_rows[1].get("Description"),
        Some(&serde_json::json!("ZELLE TO J DOE \\$400"))
    );

    let IncomeFindings::Found(income) = &report.income else {
        panic!("expected income sections");
    };
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].heading, "Acme Corp (paycheckW2)");
    assert_eq!(income[0].rows.len(), 2);

    let StructureFindings::Found(found) = &report.structures else {
        panic!("expected structures");
    };
    assert_eq!(found[0].body, "\\$400 twice a month");
    assert_eq!(found[0].rows.len(), 2);

    let income_prompt = backend.request("group_income_sources").prompt_text();
    assert!(income_prompt.contains("\"pay-1\""));
    assert!(!income_prompt.contains("\"zel-1\""));

    let transfer_prompt = backend.request("identify_transfer_structures").prompt_text();
    assert!(transfer_prompt.contains("\"zel-1\""));
    assert!(transfer_prompt.contains("\"gro-1\""));
    assert!(!transfer_prompt.contains("\"pay-1\""));
}

#[tokio::test]
async fn test_account_review_without_income() {
    let backend = ScriptedBackend::default().reply("identify_transfer_structures", "[]");
    let gateway = ModelGateway::new(&backend);
    let feed = StubFeed {
        transactions: vec![SyncedTransaction::new("a", "2024-01-01", 10.0)],
    };

    let report = AccountReview::new(&gateway, &feed).run("token").await.unwrap();
    assert_eq!(report.income, IncomeFindings::NoIncomeTransactions);
    assert_eq!(report.structures, StructureFindings::NoneFound);
    assert_eq!(backend.operations(), vec!["identify_transfer_structures"]);
}

#[tokio::test]
async fn test_failure_aborts_review() {
    let backend = ScriptedBackend::default();
    let gateway = ModelGateway::new(&backend);
    let feed = StubFeed {
        transactions: feed_transactions(),
    };

    let (tx, mut rx) = mpsc::channel(16);
    let err = AccountReview::new(&gateway, &feed)
        .with_progress(tx)
        .run("token")
        .await
        .unwrap_err();
    assert!(err.is_provider_error());
    assert_eq!(backend.operations(), vec!["group_income_sources"]);

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert!(matches!(last, Some(ReviewEvent::Failed { .. })));
}

#[tokio::test]
async fn test_feed_failure_propagates() {
    let gateway = ModelGateway::new(ScriptedBackend::default());
    let feed = StubFeed {
        transactions: vec![],
    };

    let err = AccountReview::new(&gateway, &feed).run("").await.unwrap_err();
    assert!(err.to_string().contains("INVALID_ACCESS_TOKEN"));
}

#[tokio::test]
async fn test_categorize_each_relabels_in_order() {
    let backend = ScriptedBackend::default().reply(
        "identify_income_category",
        r#"{"reasoning": "Payroll deposit from employer", "income_category": "paycheckW2"}"#,
    );
    let gateway = ModelGateway::new(&backend);
    let input = feed_transactions();
    let taxonomy = Taxonomy::income();

    let labelled = categorize_each(&gateway, &input[..2], &taxonomy)
        .await
        .unwrap();

    assert_eq!(labelled.len(), 2);
    assert!(labelled
        .iter()
        .all(|t| t.income_category.as_deref() == Some("paycheckW2")));
    assert_eq!(labelled[1].transaction_id, "zel-1");
    assert!(input[0].income_category.is_none());

    let request = backend.request("identify_income_category");
    assert_eq!(
        request.response_schema["properties"]["income_category"]["enum"][16],
        "paycheckW2"
    );
}
