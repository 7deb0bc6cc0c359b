use crate::models::Ledger;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
#[cfg(test)]
use std::path::Path;
use std::path::PathBuf;

/// Key the ledger record is stored under.
pub const LEDGER_KEY: &str = "wealthflow_data";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {:?}", path)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing {:?}", path))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Platform data directory for the application.
pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "wealthflow", "wealthflow")
        .context("unable to locate a data directory")?;
    let dir = dirs.data_dir().to_path_buf();
    fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}

/// Mirrors the ledger to a key-value store. Never fails from the caller's point of view.
pub struct Storage<S: KeyValueStore = FileStore> {
    store: S,
}

impl Storage<FileStore> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_store(FileStore::new(data_dir()?)?))
    }

    pub fn path(&self) -> PathBuf {
        self.store.path_for(LEDGER_KEY)
    }
}

impl<S: KeyValueStore> Storage<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored ledger, or the sample ledger when nothing usable is stored.
    pub fn load(&self) -> Ledger {
        match self.try_load() {
            Ok(Some(ledger)) => {
                debug!("loaded ledger from store");
                ledger
            }
            Ok(None) => {
                info!("no saved ledger found, starting from defaults");
                Ledger::default()
            }
            Err(err) => {
                warn!("saved ledger unusable, starting from defaults: {err:#}");
                Ledger::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<Ledger>> {
        let Some(content) = self.store.get(LEDGER_KEY)? else {
            return Ok(None);
        };
        let ledger =
            serde_json::from_str::<Ledger>(&content).context("parsing ledger data failed")?;
        anyhow::ensure!(ledger.is_well_formed(), "ledger has duplicate item ids");
        Ok(Some(ledger))
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    pub fn save(&self, ledger: &Ledger) {
        if let Err(err) = self.try_save(ledger) {
            warn!("saving ledger failed: {err:#}");
        }
    }

    fn try_save(&self, ledger: &Ledger) -> Result<()> {
        let json = serde_json::to_string_pretty(ledger).context("serializing data failed")?;
        self.store.set(LEDGER_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use anyhow::bail;
    use proptest::prelude::{prop_assert_eq, proptest};

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("store is read-only")
        }
    }

    fn custom_ledger() -> Ledger {
        let mut ledger = Ledger::with_sample_data();
        ledger.set_income(6200.25);
        let id = ledger.add_item(Category::Investments);
        ledger.rename_item(Category::Investments, &id, "Brokerage");
        ledger.set_item_amount(Category::Investments, &id, 275.5);
        ledger.delete_item(Category::Debts, "1");
        ledger
    }

    #[test]
    fn missing_key_loads_defaults() {
        let storage = Storage::with_store(MemoryStore::default());
        assert_eq!(storage.load(), Ledger::with_sample_data());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_save_then_load_round_trips(
            income in proptest::num::f64::NORMAL | proptest::num::f64::ZERO,
            amounts in proptest::collection::vec(0f64..1e7, 0..6),
            tiny in proptest::num::f64::NORMAL
        ) {
            let storage = Storage::with_store(MemoryStore::default());
            let mut ledger = Ledger::empty();
            ledger.set_income(income);
            for (idx, amount) in amounts.iter().enumerate() {
                let cat = Category::ALL[idx % Category::ALL.len()];
                let id = ledger.add_item(cat);
                ledger.rename_item(cat, &id, format!("item {idx}"));
                ledger.set_item_amount(cat, &id, *amount);
            }
            let id = ledger.add_item(Category::Savings);
            ledger.set_item_amount(Category::Savings, &id, tiny);

            storage.save(&ledger);
            prop_assert_eq!(storage.load(), ledger);
        }
    }

    #[test]
    fn save_then_load_keeps_last_digit_of_amounts() {
        let storage = Storage::with_store(MemoryStore::default());
        let mut ledger = custom_ledger();
        ledger.set_item_amount(Category::Expenses, "1", 1930308.9108822953);
        ledger.set_item_amount(Category::Expenses, "2", 4.0360994488802194e-229);
        storage.save(&ledger);
        assert_eq!(storage.load(), ledger);
    }

    #[test]
    fn corrupt_value_loads_defaults() {
        let storage = Storage::with_store(MemoryStore::default());
        storage.save(&custom_ledger());
        storage.store().set(LEDGER_KEY, "{ not json").unwrap();
        assert_eq!(storage.load(), Ledger::with_sample_data());
    }

    #[test]
    fn missing_category_loads_defaults() {
        let storage = Storage::with_store(MemoryStore::default());
        storage
            .store()
            .set(LEDGER_KEY, r#"{"income": 10, "debts": [], "expenses": []}"#)
            .unwrap();
        assert_eq!(storage.load(), Ledger::with_sample_data());
    }

    #[test]
    fn duplicate_ids_load_defaults() {
        let storage = Storage::with_store(MemoryStore::default());
        let raw = r#"{
            "income": 100,
            "debts": [{"id": "1", "name": "A", "amount": 1}, {"id": "1", "name": "B", "amount": 2}],
            "expenses": [], "savings": [], "investments": []
        }"#;
        storage.store().set(LEDGER_KEY, raw).unwrap();
        assert_eq!(storage.load(), Ledger::with_sample_data());
    }

    #[test]
    fn persisted_layout_uses_flat_category_keys() {
        let storage = Storage::with_store(MemoryStore::default());
        storage.save(&Ledger::with_sample_data());
        let raw = storage.store().get(LEDGER_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["income"], 5000.0);
        for cat in Category::ALL {
            assert!(value[cat.key()].is_array(), "missing {}", cat.key());
        }
        assert_eq!(value["investments"][0]["name"], "401k / Roth");
        assert_eq!(value["expenses"][2]["id"], "3");
    }

    #[test]
    fn reads_ledger_written_by_the_browser_version() {
        let storage = Storage::with_store(MemoryStore::default());
        let raw = r#"{"income":4200,"debts":[],"expenses":[{"id":"1716239022123","name":"Rent","amount":1500}],"savings":[],"investments":[]}"#;
        storage.store().set(LEDGER_KEY, raw).unwrap();
        let ledger = storage.load();
        assert_eq!(ledger.income, 4200.0);
        assert_eq!(ledger.expenses[0].id, "1716239022123");
        assert_eq!(ledger.aggregates().total_outflow, 1500.0);
    }

    #[test]
    fn failed_write_is_swallowed() {
        let storage = Storage::with_store(ReadOnlyStore);
        storage.save(&custom_ledger());
        assert_eq!(storage.load(), Ledger::with_sample_data());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("wealthflow-test-{}", std::process::id()));
        let store = FileStore::new(&dir).unwrap();
        assert_eq!(store.get("absent").unwrap(), None);
        store.set("sample", "{}").unwrap();
        assert_eq!(store.get("sample").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.path_for("sample"), dir.join("sample.json"));

        let storage = Storage::with_store(store);
        let ledger = custom_ledger();
        storage.save(&ledger);
        assert_eq!(storage.load(), ledger);
        fs::remove_dir_all(storage.store().dir()).ok();
    }
}
