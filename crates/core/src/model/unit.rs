use serde::{Deserialize, Serialize};

use crate::model::{TopicId, UnitId};

/// A course unit. Questions and progress records hang off a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub unit_number: u32,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: bool,
}

/// A topic within a unit, ordered by `order_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub unit_id: UnitId,
    pub name: String,
    pub description: Option<String>,
    pub order_index: u32,
}
