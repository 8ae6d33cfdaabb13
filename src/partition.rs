use log::debug;
use std::collections::HashMap;

use crate::schema::{SyncedTransaction, Transaction};

/// A record that can be keyed by id and split by the sign of its amount.
pub trait LedgerEntry {
    fn id(&self) -> &str;
    fn amount(&self) -> f64;
}

impl LedgerEntry for SyncedTransaction {
    fn id(&self) -> &str {
        &self.transaction_id
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

/// Records keyed by id, iterated in insertion order.
///
/// Inserting an id that is already present replaces the stored record but
/// keeps its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionIndex<T> {
    records: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for TransactionIndex<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<T: LedgerEntry> TransactionIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record previously stored under the same id, if any.
    pub fn insert(&mut self, record: T) -> Option<T> {
        match self.positions.get(record.id()) {
            Some(&position) => Some(std::mem::replace(&mut self.records[position], record)),
            None => {
                self.positions
                    .insert(record.id().to_string(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.positions.get(id).map(|&position| &self.records[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(LedgerEntry::id)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.records
    }
}

impl<T: LedgerEntry> FromIterator<T> for TransactionIndex<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut index = Self::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

impl<'a, T> IntoIterator for &'a TransactionIndex<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Transactions split by the sign of their amount.
#[derive(Debug, Clone, PartialEq)]
pub struct SignPartition<T> {
    /// Negative amounts: money entering the account.
    pub income: TransactionIndex<T>,
    /// Zero or positive amounts: money leaving the account.
    pub transfer: TransactionIndex<T>,
}

/// Splits transactions into income candidates (`amount < 0`) and transfer
/// candidates (`amount >= 0`), preserving input order within each side.
///
/// The polarity is the account-sync feed's: positive amounts are outflows.
/// A feed that signs the other way must be normalised before calling this.
pub fn partition_by_sign<T, I>(transactions: I) -> SignPartition<T>
where
    T: LedgerEntry,
    I: IntoIterator<Item = T>,
{
    let mut income = TransactionIndex::new();
    let mut transfer = TransactionIndex::new();

    for transaction in transactions {
        if transaction.amount() < 0.0 {
            income.insert(transaction);
        } else {
            transfer.insert(transaction);
        }
    }

    debug!(
        "Partitioned transactions: {} income candidate(s), {} transfer candidate(s)",
        income.len(),
        transfer.len()
    );

    SignPartition { income, transfer }
}

/// Statement transactions split by the credit flag extraction reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditPartition {
    /// `is_credit == Some(true)`.
    pub credits: Vec<Transaction>,
    /// `is_credit == Some(false)` or unset.
    pub debits: Vec<Transaction>,
}

/// Splits statement transactions on `is_credit`, preserving input order
/// within each side.
///
/// The flag decides, never the sign of the amount: statements disagree on
/// polarity. A transaction without the flag is not known to be a credit and
/// lands in `debits`.
pub fn partition_by_credit(transactions: &[Transaction]) -> CreditPartition {
    let (credits, debits): (Vec<Transaction>, Vec<Transaction>) = transactions
        .iter()
        .cloned()
        .partition(|t| t.is_credit == Some(true));

    debug!(
        "Partitioned statement: {} credit(s), {} debit(s)",
        credits.len(),
        debits.len()
    );

    CreditPartition { credits, debits }
}

/// Looks each id up in `lookup`, in order. Ids the index does not know are
/// skipped: the model may return identifiers that were never sent.
pub fn resolve_ids<'a, T, S>(ids: &[S], lookup: &'a TransactionIndex<T>) -> Vec<&'a T>
where
    T: LedgerEntry,
    S: AsRef<str>,
{
    let resolved: Vec<&T> = ids
        .iter()
        .filter_map(|id| lookup.get(id.as_ref()))
        .collect();

    if resolved.len() < ids.len() {
        debug!(
            "Dropped {} unknown transaction id(s) of {}",
            ids.len() - resolved.len(),
            ids.len()
        );
    }

    resolved
}
