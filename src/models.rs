use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Share of income going to savings + investments that the dashboard flags as healthy.
pub const SAVINGS_RATE_TARGET: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Debts,
    Expenses,
    Savings,
    Investments,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Debts,
        Category::Expenses,
        Category::Savings,
        Category::Investments,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Debts => "Debts",
            Category::Expenses => "Expenses",
            Category::Savings => "Savings",
            Category::Investments => "Investments",
        }
    }

    /// Key used for this category in the persisted record.
    pub fn key(self) -> &'static str {
        match self {
            Category::Debts => "debts",
            Category::Expenses => "expenses",
            Category::Savings => "savings",
            Category::Investments => "investments",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub amount: f64,
}

impl LineItem {
    fn new(id: impl Into<String>, name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount: finite_or_zero(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Monthly net income.
    pub income: f64,
    pub debts: Vec<LineItem>,
    pub expenses: Vec<LineItem>,
    pub savings: Vec<LineItem>,
    pub investments: Vec<LineItem>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_sample_data()
    }
}

impl Ledger {
    pub fn with_sample_data() -> Self {
        Self {
            income: 5000.0,
            debts: vec![
                LineItem::new("1", "Car Loan", 350.0),
                LineItem::new("2", "Credit Card", 150.0),
            ],
            expenses: vec![
                LineItem::new("1", "Rent/Mortgage", 1200.0),
                LineItem::new("2", "Groceries", 400.0),
                LineItem::new("3", "Utilities", 150.0),
            ],
            savings: vec![LineItem::new("1", "Emergency Fund", 300.0)],
            investments: vec![LineItem::new("1", "401k / Roth", 500.0)],
        }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            income: 0.0,
            debts: Vec::new(),
            expenses: Vec::new(),
            savings: Vec::new(),
            investments: Vec::new(),
        }
    }

    pub fn items(&self, category: Category) -> &[LineItem] {
        match category {
            Category::Debts => &self.debts,
            Category::Expenses => &self.expenses,
            Category::Savings => &self.savings,
            Category::Investments => &self.investments,
        }
    }

    fn items_mut(&mut self, category: Category) -> &mut Vec<LineItem> {
        match category {
            Category::Debts => &mut self.debts,
            Category::Expenses => &mut self.expenses,
            Category::Savings => &mut self.savings,
            Category::Investments => &mut self.investments,
        }
    }

    pub fn set_income(&mut self, amount: f64) {
        self.income = finite_or_zero(amount);
    }

    /// Appends a blank item to `category` and returns its id.
    pub fn add_item(&mut self, category: Category) -> String {
        let items = self.items_mut(category);
        let next = items
            .iter()
            .filter_map(|item| item.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = next.to_string();
        items.push(LineItem::new(id.clone(), "", 0.0));
        id
    }

    /// Returns false when no item with `id` exists in `category`.
    pub fn rename_item(&mut self, category: Category, id: &str, name: impl Into<String>) -> bool {
        match self.items_mut(category).iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_item_amount(&mut self, category: Category, id: &str, amount: f64) -> bool {
        match self.items_mut(category).iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.amount = finite_or_zero(amount);
                true
            }
            None => false,
        }
    }

    pub fn delete_item(&mut self, category: Category, id: &str) -> bool {
        let items = self.items_mut(category);
        let before = items.len();
        items.retain(|item| item.id != id);
        items.len() != before
    }

    /// True when every category holds unique ids and every number is finite.
    pub fn is_well_formed(&self) -> bool {
        if !self.income.is_finite() {
            return false;
        }
        Category::ALL.iter().all(|cat| {
            let items = self.items(*cat);
            let mut seen = HashSet::with_capacity(items.len());
            items
                .iter()
                .all(|item| item.amount.is_finite() && seen.insert(item.id.as_str()))
        })
    }

    pub fn category_total(&self, category: Category) -> f64 {
        self.items(category).iter().map(|item| item.amount).sum()
    }

    pub fn aggregates(&self) -> Aggregates {
        let totals = CategoryTotals {
            debts: self.category_total(Category::Debts),
            expenses: self.category_total(Category::Expenses),
            savings: self.category_total(Category::Savings),
            investments: self.category_total(Category::Investments),
        };
        let total_outflow = totals.debts + totals.expenses + totals.savings + totals.investments;
        let savings_rate = if self.income > 0.0 {
            (totals.savings + totals.investments) / self.income * 100.0
        } else {
            0.0
        };

        Aggregates {
            income: self.income,
            totals,
            total_outflow,
            remaining: self.income - total_outflow,
            savings_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryTotals {
    pub debts: f64,
    pub expenses: f64,
    pub savings: f64,
    pub investments: f64,
}

impl CategoryTotals {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Debts => self.debts,
            Category::Expenses => self.expenses,
            Category::Savings => self.savings,
            Category::Investments => self.investments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregates {
    pub income: f64,
    pub totals: CategoryTotals,
    pub total_outflow: f64,
    /// Income left after every category. Negative when overspending.
    pub remaining: f64,
    /// Percent of income going to savings + investments; 0 without income.
    pub savings_rate: f64,
}

impl Aggregates {
    pub fn category_total(&self, category: Category) -> f64 {
        self.totals.get(category)
    }

    /// Fraction of total outflow taken by `category`, 0 when nothing flows out.
    pub fn distribution(&self, category: Category) -> f64 {
        if self.total_outflow == 0.0 {
            return 0.0;
        }
        self.totals.get(category) / self.total_outflow
    }

    pub fn distribution_percent(&self, category: Category) -> i64 {
        (self.distribution(category) * 100.0).round() as i64
    }

    /// Debts + expenses.
    pub fn obligations(&self) -> f64 {
        self.totals.debts + self.totals.expenses
    }

    /// Savings + investments.
    pub fn future_growth(&self) -> f64 {
        self.totals.savings + self.totals.investments
    }

    pub fn is_within_budget(&self) -> bool {
        self.remaining >= 0.0
    }

    pub fn meets_savings_target(&self) -> bool {
        self.savings_rate > SAVINGS_RATE_TARGET
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Parses a currency field. Anything unparsable becomes 0.
pub fn parse_amount(input: &str) -> f64 {
    parse_optional_amount(input).unwrap_or(0.0)
}

/// Like [`parse_amount`] but keeps "nothing usable" distinct from zero.
pub fn parse_optional_amount(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a whole number of years. Fractions truncate, junk and negatives become 0.
pub fn parse_years(input: &str) -> u32 {
    let value = parse_amount(input);
    if value <= 0.0 {
        0
    } else {
        value.trunc().min(u32::MAX as f64) as u32
    }
}
