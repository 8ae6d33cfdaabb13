use dotenv::dotenv;
use std::error::Error;
use transaction_insights::{
    column_labels, AccountReview, GeminiClient, GeminiConfig, IncomeFindings, ModelGateway,
    PlaidClient, PlaidConfig, Row, Section, StructureFindings,
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

fn print_section(section: &Section) {
    println!("\n▶ {}", section.heading);
    println!("   {}", section.body);
    print_table(&section.rows);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let access_token = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PLAID_ACCESS_TOKEN").ok())
        .ok_or("usage: account_review <access-token> (or set PLAID_ACCESS_TOKEN)")?;

    let gateway = ModelGateway::new(GeminiClient::new(GeminiConfig::from_env()?));
    let feed = PlaidClient::new(PlaidConfig::from_env()?);

    println!("⏳ Loading transactions and asking the model...");
    let report = AccountReview::new(&gateway, &feed).run(&access_token).await?;

    println!("{}", "-".repeat(100));
    println!("All transactions:");
    print_table(&report.transaction_rows);

    println!("{}", "-".repeat(100));
    match &report.income {
        IncomeFindings::Found(sections) => {
            println!("Income:");
            sections.iter().for_each(print_section);
        }
        IncomeFindings::NoIncomeTransactions => println!("No income transactions found"),
    }

    println!("{}", "-".repeat(100));
    match &report.structures {
        StructureFindings::Found(sections) => {
            println!("Structures found:");
            sections.iter().for_each(print_section);
        }
        StructureFindings::NoneFound => println!("No structures found"),
    }

    Ok(())
}
