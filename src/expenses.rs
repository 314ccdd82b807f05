//! Budget tracking entries kept in their own slot next to the trip record.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Result, TripRelayError};
use crate::redis::RedisManager;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Expense {
    pub id: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub category: String,
    pub amount: f64,
    pub description: String,
}

impl NewExpense {
    /// Validate and stamp with a fresh id and today's date.
    pub fn into_expense(self) -> Result<Expense> {
        if self.category.trim().is_empty() {
            return Err(TripRelayError::Validation(
                "expense category must not be empty".to_string(),
            ));
        }
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(TripRelayError::Validation(format!(
                "expense amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(Expense {
            id: uuid::Uuid::new_v4().to_string(),
            category: self.category.trim().to_string(),
            amount: self.amount,
            description: self.description,
            date: Utc::now().date_naive(),
        })
    }
}

pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().fold(0.0, |acc, e| acc + e.amount)
}

pub fn category_totals(expenses: &[Expense]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for e in expenses {
        *totals.entry(e.category.clone()).or_insert(0.0) += e.amount;
    }
    totals
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Expense>>;

    /// Replace the whole list.
    async fn save(&self, expenses: &[Expense]) -> Result<()>;

    async fn add(&self, expense: NewExpense) -> Result<Expense> {
        let expense = expense.into_expense()?;
        let mut all = self.list().await?;
        all.push(expense.clone());
        self.save(&all).await?;
        Ok(expense)
    }

    /// Returns whether an entry with `id` existed.
    async fn remove(&self, id: &str) -> Result<bool> {
        let mut all = self.list().await?;
        let before = all.len();
        all.retain(|e| e.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.save(&all).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        self.save(&[]).await
    }
}

#[derive(Default)]
pub struct MemoryExpenseStore {
    entries: RwLock<Vec<Expense>>,
}

impl MemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for MemoryExpenseStore {
    async fn list(&self) -> Result<Vec<Expense>> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, expenses: &[Expense]) -> Result<()> {
        *self.entries.write().await = expenses.to_vec();
        Ok(())
    }
}

pub struct RedisExpenseStore {
    redis: Arc<RedisManager>,
    key: String,
}

impl RedisExpenseStore {
    pub fn new(redis: Arc<RedisManager>, key: String) -> Self {
        Self { redis, key }
    }
}

#[async_trait]
impl ExpenseStore for RedisExpenseStore {
    async fn list(&self) -> Result<Vec<Expense>> {
        Ok(self.redis.get_json(&self.key).await?.unwrap_or_default())
    }

    async fn save(&self, expenses: &[Expense]) -> Result<()> {
        if expenses.is_empty() {
            return self.redis.delete(&self.key).await;
        }
        self.redis.set_json(&self.key, &expenses).await
    }
}
