// Instruction templates for every request sent to the model, and the
// functions that fill them in. Placeholders are `{name}` markers replaced
// verbatim in a single pass; record data is embedded as raw JSON with
// nothing escaped.

use serde::Serialize;

use crate::error::Result;
use crate::schema::{SyncedTransaction, Transaction};
use crate::taxonomy::Taxonomy;

pub const EXTRACT_TRANSACTIONS_PROMPT: &str = r#"You are a meticulous bookkeeping assistant that reads bank statements.

Extract all the transactions from the attached statement.
For every transaction report the date and the description exactly as printed, and the amount with the sign used by the statement.
Set `is_credit` to true when money entered the account and false when it left.
Set `category` to exactly one of the categories below.

Categories:
{categories}
"#;

pub const IDENTIFY_STRUCTURES_PROMPT: &str = r#"You are a helpful and proactive financial assistant AI.
Your goal is to analyze a user's bank transactions to identify patterns.
You are specifically looking for regular, recurring transfers to the same recipient, which might indicate the user is moving money to another one of their own accounts.
Your tone should be helpful and inquisitive, not accusatory.

Objective:
Analyze the provided list of bank account transactions to identify any patterns of recurring payments made to the same individual or entity.
The pattern should be strong enough to suggest that the user might be regularly transferring funds to another account they potentially own.

Output:
Return a list of structures with the list of transactions that make up the structure.
If there are no potential structures, return an empty list.

<transaction_data>
{transaction_data}
</transaction_data>
"#;

pub const IDENTIFY_TRANSFER_STRUCTURES_PROMPT: &str = r#"You are a helpful financial assistant. Your task is to analyze a list of transactions and identify recurring transfers that indicate money is being moved to another account belonging to the **same person**.

The goal is to find transfers that are movements of personal assets, not payments for goods, services, or loans.
Reference each transaction by its `transaction_id`.
If there are no such transfers, return an empty list.

<transaction_data>
{transaction_data}
</transaction_data>
"#;

pub const IDENTIFY_INCOME_CATEGORY_PROMPT: &str = r#"You are a helpful assistant that selects the correct income category for a given transaction.

Income Categories:
{income_categories}

Transaction:
{transaction}
"#;

pub const GROUP_INCOME_SOURCES_PROMPT: &str = r#"You are a helpful assistant that groups income sources for a given list of transactions. Group by income category, place of work, etc.
Reference each transaction by its `transaction_id`.

Income Categories:
{income_categories}

Transactions:
{transactions}
"#;

/// Serializes each record as two-space-indented JSON, one record after another.
pub fn serialize_records<T: Serialize>(records: &[T]) -> Result<String> {
    let rendered = records
        .iter()
        .map(serde_json::to_string_pretty)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n"))
}

/// Replaces each `{name}` marker in `template` with its value.
///
/// The template is scanned once, so substituted text is never searched for
/// markers again. Unknown markers are left as they are.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[..start]);
        let tail = &rest[start..];
        let found = values.iter().find_map(|&(name, value)| {
            let matches =
                tail[1..].starts_with(name) && tail[1 + name.len()..].starts_with('}');
            matches.then_some((name.len() + 2, value))
        });
        match found {
            Some((marker_len, value)) => {
                filled.push_str(value);
                rest = &tail[marker_len..];
            }
            None => {
                filled.push('{');
                rest = &tail[1..];
            }
        }
    }

    filled.push_str(rest);
    filled
}

pub fn format_extraction_request(taxonomy: &Taxonomy) -> String {
    fill_template(
        EXTRACT_TRANSACTIONS_PROMPT,
        &[("categories", taxonomy.to_bullets().as_str())],
    )
}

pub fn format_structure_request(transactions: &[Transaction]) -> Result<String> {
    let data = serialize_records(transactions)?;
    Ok(fill_template(
        IDENTIFY_STRUCTURES_PROMPT,
        &[("transaction_data", data.as_str())],
    ))
}

pub fn format_transfer_structure_request(transactions: &[SyncedTransaction]) -> Result<String> {
    let data = serialize_records(transactions)?;
    Ok(fill_template(
        IDENTIFY_TRANSFER_STRUCTURES_PROMPT,
        &[("transaction_data", data.as_str())],
    ))
}

pub fn format_income_category_request(
    transaction: &SyncedTransaction,
    taxonomy: &Taxonomy,
) -> Result<String> {
    let data = serde_json::to_string_pretty(transaction)?;
    Ok(fill_template(
        IDENTIFY_INCOME_CATEGORY_PROMPT,
        &[
            ("income_categories", taxonomy.to_bullets().as_str()),
            ("transaction", data.as_str()),
        ],
    ))
}

pub fn format_income_group_request(
    transactions: &[SyncedTransaction],
    taxonomy: &Taxonomy,
) -> Result<String> {
    let data = serialize_records(transactions)?;
    Ok(fill_template(
        GROUP_INCOME_SOURCES_PROMPT,
        &[
            ("income_categories", taxonomy.to_bullets().as_str()),
            ("transactions", data.as_str()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_request_literal() {
        let taxonomy = Taxonomy::new(["paycheckW2", "refund", "transfer"]);
        let expected = "You are a meticulous bookkeeping assistant that reads bank statements.\n\
\n\
Extract all the transactions from the attached statement.\n\
For every transaction report the date and the description exactly as printed, and the amount with the sign used by the statement.\n\
Set `is_credit` to true when money entered the account and false when it left.\n\
Set `category` to exactly one of the categories below.\n\
\n\
Categories:\n\
- paycheckW2\n\
- refund\n\
- transfer\n";

        assert_eq!(format_extraction_request(&taxonomy), expected);
    }

    #[test]
    fn test_extraction_request_lists_each_label_once_in_order() {
        let taxonomy = Taxonomy::income();
        let prompt = format_extraction_request(&taxonomy);

        let mut last = 0;
        for label in taxonomy.labels() {
            let line = format!("\n- {}\n", label);
            assert_eq!(prompt.matches(line.as_str()).count(), 1, "{}", label);
            let position = prompt.find(line.as_str()).unwrap();
            assert!(position >= last);
            last = position;
        }
    }

    #[test]
    fn test_structure_request_embeds_records_verbatim() {
        let transactions = vec![
            Transaction::new("2024-01-05", "TRANSFER TO J SMITH $500", -500.0),
            Transaction::new("2024-01-06", "PAYROLL", 2500.5).with_credit(true),
        ];

        let prompt = format_structure_request(&transactions).unwrap();
        let expected_data = "<transaction_data>\n\
{\n  \"date\": \"2024-01-05\",\n  \"description\": \"TRANSFER TO J SMITH $500\",\n  \"amount\": -500.0\n}\n\
{\n  \"date\": \"2024-01-06\",\n  \"description\": \"PAYROLL\",\n  \"amount\": 2500.5,\n  \"is_credit\": true\n}\n\
</transaction_data>\n";

        assert!(prompt.ends_with(expected_data));
        assert!(prompt.starts_with("You are a helpful and proactive financial assistant AI."));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let mut tx = SyncedTransaction::new("tx-1", "2024-02-01", -900.0).with_merchant("ACME");
        tx.details
            .insert("pending".to_string(), serde_json::Value::Bool(false));
        tx.details
            .insert("account_id".to_string(), serde_json::Value::from("acc-1"));
        let taxonomy = Taxonomy::income();

        let first = format_income_group_request(&[tx.clone()], &taxonomy).unwrap();
        let second = format_income_group_request(&[tx.clone()], &taxonomy).unwrap();
        assert_eq!(first, second);

        let account = first.find("\"account_id\"").unwrap();
        let pending = first.find("\"pending\"").unwrap();
        assert!(account < pending);
    }

    #[test]
    fn test_income_category_request_layout() {
        let tx = SyncedTransaction::new("tx-7", "2024-02-01", -42.1).with_description("IRS TREAS 310");
        let taxonomy = Taxonomy::new(["federalIrsPayment", "refund"]);

        let prompt = format_income_category_request(&tx, &taxonomy).unwrap();
        assert!(prompt.contains("Income Categories:\n- federalIrsPayment\n- refund\n\nTransaction:\n{\n"));
        assert!(prompt.contains("\"original_description\": \"IRS TREAS 310\""));
    }

    #[test]
    fn test_labels_that_look_like_markers_stay_literal() {
        let tx = SyncedTransaction::new("tx-9", "2024-02-01", -10.0);
        let taxonomy = Taxonomy::new(["refund", "{transaction}", "{transactions}"]);

        let single = format_income_category_request(&tx, &taxonomy).unwrap();
        assert!(single.contains("- {transaction}\n- {transactions}\n"));
        assert_eq!(single.matches("\"tx-9\"").count(), 1);

        let grouped = format_income_group_request(&[tx], &taxonomy).unwrap();
        assert!(grouped.contains("- {transaction}\n- {transactions}\n"));
        assert_eq!(grouped.matches("\"tx-9\"").count(), 1);
    }

    #[test]
    fn test_fill_template_single_pass() {
        let filled = fill_template(
            "{a} and {b} and {c} {",
            &[("a", "{b}"), ("b", "two")],
        );
        assert_eq!(filled, "{b} and two and {c} {");
    }

    #[test]
    fn test_empty_transfer_list_leaves_empty_tag() {
        let prompt = format_transfer_structure_request(&[]).unwrap();
        assert!(prompt.contains("<transaction_data>\n\n</transaction_data>"));
    }
}
