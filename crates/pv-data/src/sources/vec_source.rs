use super::ScriptSource;
use crate::script::ScriptItem;
use crate::DataError;

/// Script held in memory. Progress is counted in items.
#[derive(Debug, Clone)]
pub struct VecSource {
    name: String,
    items: std::vec::IntoIter<ScriptItem>,
    total: u64,
    consumed: u64,
}

impl VecSource {
    pub fn new(name: impl Into<String>, items: Vec<ScriptItem>) -> Self {
        Self {
            name: name.into(),
            total: items.len() as u64,
            items: items.into_iter(),
            consumed: 0,
        }
    }
}

impl ScriptSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_item(&mut self) -> Result<Option<ScriptItem>, DataError> {
        let item = self.items.next();
        if item.is_some() {
            self.consumed += 1;
        }
        Ok(item)
    }

    fn total_units(&self) -> Option<u64> {
        Some(self.total)
    }

    fn consumed_units(&self) -> u64 {
        self.consumed
    }
}
