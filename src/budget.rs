//! Model-backed budget review over the stored trip and expense slots.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::expenses::{Expense, ExpenseStore, total_spent};
use crate::models::{ChatTurn, CompletionRequest, TripRecord};
use crate::relay::RelayClient;
use crate::store::TripStore;

pub const BUDGET_PROMPT: &str = r#"You are a financial travel advisor. Analyze the user's travel budget and expenses, then provide personalized recommendations. Return a JSON object with:
    {
      "budgetStatus": "on-track/over-budget/under-budget",
      "recommendations": ["rec1", "rec2", "rec3"],
      "categoryInsights": ["insight1", "insight2"],
      "savingTips": ["tip1", "tip2", "tip3"],
      "warningMessages": ["warning1"],
      "optimizations": ["opt1", "opt2"]
    }"#;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStatus {
    OnTrack,
    OverBudget,
    UnderBudget,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAdvice {
    pub budget_status: BudgetStatus,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub category_insights: Vec<String>,
    #[serde(default)]
    pub saving_tips: Vec<String>,
    #[serde(default)]
    pub warning_messages: Vec<String>,
    #[serde(default)]
    pub optimizations: Vec<String>,
}

/// Strictly parse a model reply into [`BudgetAdvice`].
pub fn parse_budget_advice(raw: &str) -> std::result::Result<BudgetAdvice, serde_json::Error> {
    serde_json::from_str(raw.trim())
}

/// Numeric amount in a free-form budget such as `"$2,500"`.
///
/// Keeps digits and dots only; `None` for "Not specified" and anything else
/// that leaves no number behind.
pub fn budget_amount(budget: &str) -> Option<f64> {
    let digits: String = budget
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// The user turn describing the budget situation.
pub fn budget_summary(trip: Option<&TripRecord>, total_budget: f64, expenses: &[Expense]) -> String {
    let spent = total_spent(expenses);
    let remaining = total_budget - spent;
    let breakdown = expenses
        .iter()
        .map(|e| format!("{}: ${} - {}", e.category, e.amount, e.description))
        .collect::<Vec<_>>()
        .join(", ");
    let destination = trip
        .map(|t| t.destination.as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or("trip");
    let duration = trip
        .map(|t| t.duration.as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or("Not specified");

    format!(
        "Analyze my {destination} budget: Total Budget: ${total_budget}, Spent: ${spent}, Remaining: ${remaining}. Expenses: {breakdown}. Trip duration: {duration}."
    )
}

pub struct BudgetAdvisor {
    relay: Arc<dyn RelayClient>,
    trips: Arc<dyn TripStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl BudgetAdvisor {
    pub fn new(
        relay: Arc<dyn RelayClient>,
        trips: Arc<dyn TripStore>,
        expenses: Arc<dyn ExpenseStore>,
    ) -> Self {
        Self {
            relay,
            trips,
            expenses,
        }
    }

    /// Ask the model to review spending against `total_budget`.
    ///
    /// Without an explicit figure the stored trip's budget is used, or zero
    /// when it has none. Relay failures are errors; a reply that does not
    /// parse as advice is logged and yields `Ok(None)`.
    pub async fn advise(&self, total_budget: Option<f64>) -> Result<Option<BudgetAdvice>> {
        let trip = self.trips.get().await?;
        let expenses = self.expenses.list().await?;
        let total_budget = total_budget
            .or_else(|| trip.as_ref().and_then(|t| budget_amount(&t.budget)))
            .unwrap_or(0.0);

        tracing::info!(
            total_budget,
            expenses = expenses.len(),
            "Requesting budget advice"
        );

        let request = CompletionRequest::new(vec![ChatTurn::user(budget_summary(
            trip.as_ref(),
            total_budget,
            &expenses,
        ))])
        .with_system_prompt(BUDGET_PROMPT);
        let result = self.relay.complete(&request).await?;

        match parse_budget_advice(&result.content) {
            Ok(advice) => Ok(Some(advice)),
            Err(e) => {
                tracing::warn!(
                    "Failed to generate budget advice: {}. Raw: {}",
                    e,
                    result.content
                );
                Ok(None)
            }
        }
    }
}
