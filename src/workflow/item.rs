//! Work item and its processing context.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// One unit of input: an identifier plus a small bag of per-item fields
/// (a lot number, an exam code, auxiliary values). Immutable once built;
/// the orchestrator never touches the contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Where an item sits in the run. Built by the orchestrator, used in every
/// log line so the operator can cross-reference against the input list.
#[derive(Clone, Debug)]
pub struct ItemCtx {
    pub item_id: String,
    /// 1-based position in the full input list.
    pub ordinal: usize,
    pub total: usize,
    /// 1-based batch number.
    pub batch_number: usize,
    /// 1 on the first attempt, 2 on the session-loss retry.
    pub attempt: usize,
}

impl ItemCtx {
    pub fn new(item: &WorkItem, ordinal: usize, total: usize, batch_number: usize) -> Self {
        Self {
            item_id: item.id.clone(),
            ordinal,
            total,
            batch_number,
            attempt: 1,
        }
    }

    pub fn retry(&self) -> Self {
        Self {
            attempt: 2,
            ..self.clone()
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[item {}/{} #{} batch {}]",
            self.ordinal, self.total, self.item_id, self.batch_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup() {
        let item = WorkItem::new("LOT-17")
            .with_field("lot", "17")
            .with_field("analyzer", "A3");
        assert_eq!(item.field("analyzer"), Some("A3"));
        assert_eq!(item.field("missing"), None);
    }

    #[test]
    fn ctx_display_carries_position() {
        let item = WorkItem::new("LOT-17");
        let ctx = ItemCtx::new(&item, 3, 250, 1);
        assert_eq!(format!("{ctx}"), "[item 3/250 #LOT-17 batch 1]");
        assert_eq!(ctx.retry().attempt, 2);
    }
}
