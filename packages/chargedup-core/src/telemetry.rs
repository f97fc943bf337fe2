//! Dashboard telemetry.
//!
//! A [`TelemetryTable`] is a named map from string keys to `f64` values, the
//! shape a dashboard expects. Values are published through [`DoublePublisher`]
//! handles obtained once at startup. Publishing is best effort: it never fails
//! and never blocks the control loop.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use log::trace;

/// A named key/value table of `f64` entries.
///
/// Cloning a table yields another handle to the same entries.
#[derive(Debug, Clone)]
pub struct TelemetryTable {
    name: Rc<str>,
    entries: Rc<RefCell<BTreeMap<String, f64>>>,
}

impl TelemetryTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            entries: Rc::default(),
        }
    }

    /// The name of this table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a publisher for the entry at `key`.
    #[must_use]
    pub fn double_topic(&self, key: &str) -> DoublePublisher {
        DoublePublisher {
            table: self.clone(),
            key: key.to_owned(),
        }
    }

    /// Reads the last value published under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.try_borrow().ok()?.get(key).copied()
    }

    /// Copies every entry out of the table, sorted by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        self.entries
            .try_borrow()
            .map(|entries| entries.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }
}

/// Publishes values to a single entry of a [`TelemetryTable`].
#[derive(Debug, Clone)]
pub struct DoublePublisher {
    table: TelemetryTable,
    key: String,
}

impl DoublePublisher {
    /// The key this publisher writes to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publishes `value`, replacing the previous one.
    pub fn set(&self, value: f64) {
        if let Ok(mut entries) = self.table.entries.try_borrow_mut() {
            trace!("{}/{} = {value}", self.table.name, self.key);
            entries.insert(self.key.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishers_share_the_table() {
        let table = TelemetryTable::new("datatable");
        let power = table.double_topic("Autobalance Power");
        let rotations = table.clone().double_topic("Arm Motor Rotations");

        assert_eq!(table.get("Autobalance Power"), None);

        power.set(-0.12);
        rotations.set(-4.75);
        power.set(0.0);

        assert_eq!(table.name(), "datatable");
        assert_eq!(power.key(), "Autobalance Power");
        assert_eq!(table.get("Autobalance Power"), Some(0.0));
        assert_eq!(
            table.snapshot(),
            [
                ("Arm Motor Rotations".to_owned(), -4.75),
                ("Autobalance Power".to_owned(), 0.0),
            ]
        );
    }
}
