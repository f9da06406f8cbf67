use serde::{Serialize, Deserialize};
use std::collections::HashMap;

/// Catalog item identifier. Kept at 32 bits so ids fit the bitmap sets directly.
pub type ItemId = u32;

pub type FieldId = u32;

/// Raw attribute value as delivered by ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    List(Vec<String>),
    Path(Vec<String>),
}

impl FieldValue {
    /// Text usable by the free-text index, if this value carries any
    pub fn text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::List(items) | FieldValue::Path(items) => Some(items.join(" ")),
            _ => None,
        }
    }
}

/// What ingestion needs from an item. Wire decoding happens before this point.
pub trait CatalogItem {
    fn id(&self) -> ItemId;

    fn is_deleted(&self) -> bool;

    fn fields(&self) -> &HashMap<FieldId, FieldValue>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub deleted: bool,
    pub fields: HashMap<FieldId, FieldValue>,
}

impl Item {
    pub fn new(id: ItemId) -> Self {
        Item {
            id,
            deleted: false,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldId, value: FieldValue) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn deleted(id: ItemId) -> Self {
        Item {
            id,
            deleted: true,
            fields: HashMap::new(),
        }
    }
}

impl CatalogItem for Item {
    fn id(&self) -> ItemId {
        self.id
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn fields(&self) -> &HashMap<FieldId, FieldValue> {
        &self.fields
    }
}
