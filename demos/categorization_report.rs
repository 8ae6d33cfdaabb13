use std::error::Error;
use std::fs::File;
use transaction_insights::{
    load_categorization_records, to_rows, CategorizationRecord, CategorizationSummary,
    UNCATEGORIZED_INCOME_ID,
};

fn pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: categorization_report <results.csv>")?;

    let records = load_categorization_records(File::open(&path)?)?;
    let summary = CategorizationSummary::from_records(&records, UNCATEGORIZED_INCOME_ID);

    println!("📊 Total Transactions: {}", summary.total);
    println!(
        "   Categorized (reference): {} ({})",
        summary.reference_categorized,
        pct(summary.reference_categorized_pct)
    );
    println!(
        "   Categorized (LLM): {} ({}, delta {})",
        summary.llm_categorized,
        pct(summary.llm_categorized_pct),
        pct(summary.categorized_delta_pct)
    );
    println!("   Matches (of categorized): {}", summary.matches);
    println!("   Mismatches (of categorized): {}", summary.mismatches);
    println!("   Match rate (of categorized): {}", pct(summary.match_rate_pct));

    let fields = CategorizationRecord::fields();

    println!("\nMismatches:");
    for row in to_rows(&summary.mismatched, &fields)? {
        let cells: Vec<String> = row
            .cells()
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        println!("   {}", cells.join(", "));
    }

    println!("\nNewly categorized transactions:");
    for row in to_rows(&summary.newly_categorized, &fields)? {
        let cells: Vec<String> = row
            .cells()
            .iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        println!("   {}", cells.join(", "));
    }

    Ok(())
}
