//! Menu catalog shapes
//!
//! Read-only for the duration of a client session; fetched from the
//! backend list endpoints and cached by the client.

use serde::{Deserialize, Serialize};

/// A dish on the menu.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    /// Price in currency unit
    pub price: f64,
    pub category_id: i64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// A menu category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}
