use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemKey;

/// Status symbols offered to the inspector, in display order.
pub const STATUS_SYMBOLS: [&str; 3] = ["✅", "❌", "🟡"];

/// Canonical status stored for a checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "Conforme")]
    Conforme,
    #[serde(rename = "Não Conforme")]
    NaoConforme,
    #[serde(rename = "N/A")]
    NaoAplicavel,
    #[serde(rename = "Indefinido")]
    Indefinido,
}

impl ItemStatus {
    /// Maps a status symbol; anything unrecognised is `Indefinido`.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim() {
            "✅" => ItemStatus::Conforme,
            "❌" => ItemStatus::NaoConforme,
            "🟡" => ItemStatus::NaoAplicavel,
            _ => ItemStatus::Indefinido,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Conforme => "Conforme",
            ItemStatus::NaoConforme => "Não Conforme",
            ItemStatus::NaoAplicavel => "N/A",
            ItemStatus::Indefinido => "Indefinido",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub key: ItemKey,
    pub status: ItemStatus,
    pub observation: Option<String>,
}

/// A validated checklist ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub serial_number: String,
    pub work_order: Option<String>,
    pub operator: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<ChecklistItem>,
}
