use dotenv::dotenv;
use std::error::Error;
use std::path::PathBuf;
use tokio::sync::mpsc;
use transaction_insights::{
    column_labels, Document, GeminiClient, GeminiConfig, ModelGateway, ReviewEvent, Row,
    StatementReview, StructureFindings, Taxonomy,
};

fn print_table(rows: &[Row]) {
    let labels = column_labels(rows);
    println!("   {}", labels.join(" | "));
    for row in rows {
        let cells: Vec<String> = labels
            .iter()
            .map(|label| row.get(label).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("   {}", cells.join(" | "));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: statement_review <statement.pdf>")?;

    let gateway = ModelGateway::new(GeminiClient::new(GeminiConfig::from_env()?));
    let document = Document::from_path(&path).await?;

    let (tx, mut rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ReviewEvent::ExtractingTransactions => println!("⏳ Extracting transactions..."),
                ReviewEvent::IdentifyingStructures => println!("⏳ Identifying structures..."),
                ReviewEvent::Failed { reason } => println!("❌ {}", reason),
                _ => {}
            }
        }
    });

    // Income labels also cover outflows (`transfer`, `nonIncomeOther`).
    let statement_labels = Taxonomy::income();
    let report = StatementReview::new(&gateway, statement_labels)
        .with_progress(tx)
        .run(&document)
        .await?;

    println!("{}", "-".repeat(100));
    println!("Credits:");
    print_table(&report.credit_rows);
    println!("Debits:");
    print_table(&report.debit_rows);

    match report.structures {
        Some(StructureFindings::Found(sections)) => {
            println!("{}", "-".repeat(100));
            println!("Structures found:");
            for section in sections {
                println!("\n▶ {}", section.heading);
                print_table(&section.rows);
                println!("   {}", section.body);
            }
        }
        Some(StructureFindings::NoneFound) => println!("No structures found"),
        None => {}
    }

    Ok(())
}
