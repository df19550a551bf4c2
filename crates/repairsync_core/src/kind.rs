//! Entity kinds and their table names.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of records kept by the store.
///
/// Each kind lives in its own table; the same table name is used by the
/// remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A shop customer.
    Customer,
    /// A device repair order.
    RepairOrder,
    /// A billing invoice.
    Invoice,
    /// A catalogue product.
    Product,
    /// A scheduled appointment.
    Appointment,
    /// A cash register movement.
    CashMovement,
}

impl EntityKind {
    /// All kinds, in sync order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Customer,
        EntityKind::RepairOrder,
        EntityKind::Invoice,
        EntityKind::Product,
        EntityKind::Appointment,
        EntityKind::CashMovement,
    ];

    /// Returns the table name for this kind.
    pub const fn table_name(self) -> &'static str {
        match self {
            EntityKind::Customer => "customers",
            EntityKind::RepairOrder => "repair_orders",
            EntityKind::Invoice => "invoices",
            EntityKind::Product => "products",
            EntityKind::Appointment => "appointments",
            EntityKind::CashMovement => "cash_movements",
        }
    }

    /// Looks up a kind by table name.
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.table_name() == name)
    }

    /// Returns true if records of this kind carry a `customer_id`.
    pub const fn has_customer_ref(self) -> bool {
        matches!(
            self,
            EntityKind::RepairOrder | EntityKind::Invoice | EntityKind::Appointment
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_table_name(s).ok_or_else(|| StoreError::UnknownTable { name: s.into() })
    }
}
