use crate::models::{Aggregates, Category, Ledger};
use crate::mortgage::{self, Amortization, MortgageParams};
use crate::projection::{self, InvestmentParams, Projection};
use crate::storage::{FileStore, KeyValueStore, Storage};
use log::debug;

/// Session state: the persisted ledger plus the calculator inputs that only live for this run.
pub struct Planner<S: KeyValueStore = FileStore> {
    ledger: Ledger,
    storage: Storage<S>,
    investment: InvestmentParams,
    mortgage: MortgageParams,
}

impl<S: KeyValueStore> Planner<S> {
    pub fn open(storage: Storage<S>) -> Self {
        let ledger = storage.load();
        Self {
            ledger,
            storage,
            investment: InvestmentParams::default(),
            mortgage: MortgageParams::default(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    pub fn set_income(&mut self, amount: f64) {
        self.ledger.set_income(amount);
        debug!("income set to {}", self.ledger.income);
        self.persist();
    }

    pub fn add_line_item(&mut self, category: Category) -> String {
        let id = self.ledger.add_item(category);
        debug!("added item {id} to {}", category.key());
        self.persist();
        id
    }

    pub fn rename_item(&mut self, category: Category, id: &str, name: impl Into<String>) {
        if self.ledger.rename_item(category, id, name) {
            self.persist();
        } else {
            debug!("rename ignored, no item {id} in {}", category.key());
        }
    }

    pub fn set_item_amount(&mut self, category: Category, id: &str, amount: f64) {
        if self.ledger.set_item_amount(category, id, amount) {
            self.persist();
        } else {
            debug!("amount ignored, no item {id} in {}", category.key());
        }
    }

    pub fn delete_line_item(&mut self, category: Category, id: &str) {
        if self.ledger.delete_item(category, id) {
            debug!("deleted item {id} from {}", category.key());
            self.persist();
        }
    }

    /// Drops every change and reloads whatever the store holds.
    pub fn reload(&mut self) {
        self.ledger = self.storage.load();
    }

    pub fn investment_params(&self) -> &InvestmentParams {
        &self.investment
    }

    pub fn set_investment_params(&mut self, params: InvestmentParams) {
        self.investment = params;
    }

    pub fn mortgage_params(&self) -> &MortgageParams {
        &self.mortgage
    }

    pub fn set_mortgage_params(&mut self, params: MortgageParams) {
        self.mortgage = params;
    }

    pub fn aggregates(&self) -> Aggregates {
        self.ledger.aggregates()
    }

    pub fn projection(&self) -> Projection {
        projection::compute_projection(&self.investment)
    }

    pub fn amortization(&self) -> Amortization {
        mortgage::compute_amortization(&self.mortgage)
    }

    fn persist(&self) {
        self.storage.save(&self.ledger);
    }
}
