use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Frame};

pub const DEFAULT_CATEGORY: &str = "Other";
pub const SUMMARY_REGION: &str = "expenseSummary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `None` for anything that is not a plain decimal number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_money(currency: &str, amount: f64) -> String {
    format!("{currency}{amount:.2}")
}

#[derive(Debug)]
pub struct Expenses {
    list: ListManager<Expense>,
    currency: String,
}

impl Expenses {
    pub fn new(services: Services, currency: &str) -> Self {
        let symbol = currency.to_string();
        let list = ListManager::new(StoreKey::Expenses, services)
            .empty_message("No expenses yet. Add one to get started!")
            .render_with(move |expense: &Record<Expense>| {
                format!(
                    "{} {} {} [{}] {}",
                    short_id(expense.id()),
                    expense.data.name,
                    format_money(&symbol, expense.data.amount),
                    expense.data.category,
                    expense.data.date.with_timezone(&Local).format("%Y-%m-%d")
                )
            });
        Self {
            list,
            currency: currency.to_string(),
        }
    }

    pub fn list(&self) -> &ListManager<Expense> {
        &self.list
    }

    pub(crate) fn list_mut(&mut self) -> &mut ListManager<Expense> {
        &mut self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, name: &str, amount: f64, category: &str) -> WidgetResult<String> {
        let name = name.trim();
        if name.is_empty() || !amount.is_finite() || amount <= 0.0 {
            return self.list.services().reject(ValidationError::InvalidExpense);
        }
        let category = match category.trim() {
            "" => DEFAULT_CATEGORY,
            other => other,
        };

        let date = self.list.services().clock.now();
        let id = self.list.add(Expense {
            name: name.to_string(),
            amount: round_cents(amount),
            category: category.to_string(),
            date,
        });
        self.render_summary();
        Ok(id)
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        let removed = self.list.delete(id, confirmed);
        if removed {
            self.render_summary();
        }
        removed
    }

    pub fn clear_all(&mut self, confirmed: Confirmed) -> usize {
        let removed = self.list.clear(confirmed);
        self.render_summary();
        removed
    }

    pub fn total(&self) -> f64 {
        round_cents(self.list.items().iter().map(|e| e.data.amount).sum())
    }

    pub fn by_category(&self) -> BTreeMap<String, f64> {
        totals_by_category(self.list.items())
    }

    pub fn render(&self) -> Frame {
        self.render_summary();
        self.list.render()
    }

    /// Total line plus one line per category, the data behind the chart.
    fn render_summary(&self) {
        let mut lines = vec![format!("Total: {}", format_money(&self.currency, self.total()))];
        lines.extend(
            self.by_category()
                .into_iter()
                .map(|(category, sum)| format!("{category}: {}", format_money(&self.currency, sum))),
        );
        self.list
            .services()
            .view
            .draw(SUMMARY_REGION, &Frame::Lines(lines));
    }
}

pub fn totals_by_category(items: &[Record<Expense>]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for expense in items {
        *totals.entry(expense.data.category.clone()).or_default() += expense.data.amount;
    }
    for value in totals.values_mut() {
        *value = round_cents(*value);
    }
    totals
}
