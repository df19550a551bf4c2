//! Remote schemas and payload projection.
//!
//! The remote collections have a narrower schema than local records. Only
//! allow-listed columns are transmitted, and some groups of local fields are
//! folded into a single remote column (name parts into a display name,
//! address components into one address line).

use crate::row::{timestamp_value, RemoteRow};
use repairsync_core::{EntityKind, Record, StoreError};
use serde_json::{Map, Value};

/// Several local fields folded into one remote column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    /// Remote column receiving the folded value.
    pub column: &'static str,
    /// Local fields, in order. The first one receives the value on the way
    /// back; the rest are cleared.
    pub parts: &'static [&'static str],
    /// Separator placed between non-empty parts.
    pub separator: &'static str,
}

impl Fold {
    /// Joins the non-empty parts of `record`.
    fn fold(&self, record: &Record) -> Option<String> {
        let parts: Vec<String> = self
            .parts
            .iter()
            .filter_map(|part| record.get(part))
            .filter_map(|value| match value {
                Value::String(s) => Some(s.trim().to_owned()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(self.separator))
        }
    }
}

/// Allow-listed columns and folds of one remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSchema {
    /// Columns the remote accepts.
    pub columns: &'static [&'static str],
    /// Folded columns (each `column` also appears in `columns`).
    pub folds: &'static [Fold],
}

const CUSTOMER_FOLDS: &[Fold] = &[
    Fold {
        column: "name",
        parts: &["name", "last_name", "second_last_name"],
        separator: " ",
    },
    Fold {
        column: "address",
        parts: &["address", "address_number", "postal_code", "city", "province"],
        separator: ", ",
    },
];

const CUSTOMERS: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "name",
        "phone",
        "email",
        "address",
        "tax_id",
        "notes",
        "created_at",
        "modified_at",
    ],
    folds: CUSTOMER_FOLDS,
};

const REPAIR_ORDERS: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "customer_id",
        "order_number",
        "device_type",
        "brand",
        "model",
        "serial_number",
        "problem",
        "diagnosis",
        "status",
        "estimated_price",
        "final_price",
        "deposit",
        "notes",
        "delivered_at",
        "created_at",
        "modified_at",
    ],
    folds: &[],
};

const INVOICES: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "customer_id",
        "invoice_number",
        "issue_date",
        "subtotal",
        "tax",
        "total",
        "status",
        "payment_method",
        "lines",
        "notes",
        "created_at",
        "modified_at",
    ],
    folds: &[],
};

const PRODUCTS: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "name",
        "sku",
        "category",
        "price",
        "cost",
        "stock",
        "created_at",
        "modified_at",
    ],
    folds: &[],
};

const APPOINTMENTS: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "customer_id",
        "title",
        "starts_at",
        "ends_at",
        "status",
        "notes",
        "created_at",
        "modified_at",
    ],
    folds: &[],
};

const CASH_MOVEMENTS: RemoteSchema = RemoteSchema {
    columns: &[
        "id",
        "movement_type",
        "amount",
        "concept",
        "payment_method",
        "created_at",
        "modified_at",
    ],
    folds: &[],
};

/// Returns the remote schema for a kind.
pub const fn schema_for(kind: EntityKind) -> &'static RemoteSchema {
    match kind {
        EntityKind::Customer => &CUSTOMERS,
        EntityKind::RepairOrder => &REPAIR_ORDERS,
        EntityKind::Invoice => &INVOICES,
        EntityKind::Product => &PRODUCTS,
        EntityKind::Appointment => &APPOINTMENTS,
        EntityKind::CashMovement => &CASH_MOVEMENTS,
    }
}

impl RemoteSchema {
    fn fold_for(&self, column: &str) -> Option<&Fold> {
        self.folds.iter().find(|f| f.column == column)
    }

    /// Projects a local record onto the remote columns.
    ///
    /// Absent local fields are omitted rather than sent as `null`.
    pub fn project(&self, record: &Record) -> RemoteRow {
        let mut row = Map::new();

        for &column in self.columns {
            let value = match column {
                "id" => record.id().map(Value::from),
                "created_at" => record.created_at.as_ref().map(timestamp_value),
                "modified_at" => record.modified_at.as_ref().map(timestamp_value),
                _ => match self.fold_for(column) {
                    Some(fold) => fold.fold(record).map(Value::from),
                    None => record.get(column).cloned(),
                },
            };

            if let Some(value) = value {
                row.insert(column.to_owned(), value);
            }
        }

        RemoteRow::from_map(row)
    }

    /// Projects a local record as a full-row patch for an existing remote row.
    ///
    /// Like [`project`](Self::project), but every allow-listed column the
    /// record lacks is sent as `null`, so a field cleared locally is cleared
    /// remotely too.
    pub fn project_patch(&self, record: &Record) -> RemoteRow {
        let mut row = self.project(record);
        for &column in self.columns {
            if row.get(column).is_none() {
                row.set(column, Value::Null);
            }
        }
        row
    }

    /// Converts a remote row back into a local record.
    ///
    /// Columns outside the allow-list are dropped. A folded column lands in
    /// the fold's first part and the remaining parts are set to `null`, which
    /// clears them when the record overwrites a local one.
    pub fn unproject(&self, row: RemoteRow) -> Result<Record, StoreError> {
        let mut map = row.into_map();
        map.retain(|column, _| self.columns.contains(&column.as_str()));

        for fold in self.folds {
            if let Some(value) = map.remove(fold.column) {
                if let Some((first, rest)) = fold.parts.split_first() {
                    map.insert((*first).to_owned(), value);
                    for part in rest {
                        map.insert((*part).to_owned(), Value::Null);
                    }
                }
            }
        }

        Record::from_json(Value::Object(map))
    }
}

/// Projects a local record onto the remote schema of `kind`.
pub fn project(kind: EntityKind, record: &Record) -> RemoteRow {
    schema_for(kind).project(record)
}

/// Projects a local record of `kind` as a full-row patch.
pub fn project_patch(kind: EntityKind, record: &Record) -> RemoteRow {
    schema_for(kind).project_patch(record)
}

/// Converts a remote row of `kind` into a local record.
pub fn unproject(kind: EntityKind, row: RemoteRow) -> Result<Record, StoreError> {
    schema_for(kind).unproject(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairsync_core::Timestamp;
    use serde_json::json;

    fn customer() -> Record {
        let mut record = Record::new()
            .with_id("123e4567-e89b-12d3-a456-426614174000")
            .with("name", "Ana")
            .with("last_name", "García")
            .with("second_last_name", "")
            .with("address", "Calle Mayor")
            .with("address_number", 12)
            .with("city", "Madrid")
            .with("postal_code", "28013")
            .with("phone", "600123123")
            .with("loyalty_points", 40);
        record.created_at = Some(Timestamp::Epoch(1));
        record.modified_at = Some(Timestamp::Epoch(2));
        record
    }

    #[test]
    fn customer_projection_folds_and_filters() {
        let row = project(EntityKind::Customer, &customer());

        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "id": "123e4567-e89b-12d3-a456-426614174000",
                "name": "Ana García",
                "phone": "600123123",
                "address": "Calle Mayor, 12, 28013, Madrid",
                "created_at": 1,
                "modified_at": 2,
            })
        );
    }

    #[test]
    fn patch_clears_missing_columns() {
        let record = Record::new()
            .with_id("123e4567-e89b-12d3-a456-426614174000")
            .with("status", "ready");

        let patch = project_patch(EntityKind::RepairOrder, &record);
        assert_eq!(patch.get("status"), Some(&json!("ready")));
        assert_eq!(patch.get("notes"), Some(&Value::Null));
        assert_eq!(patch.len(), schema_for(EntityKind::RepairOrder).columns.len());

        let mut moved = customer();
        for part in ["address", "address_number", "postal_code", "city"] {
            moved.remove(part);
        }
        let patch = project_patch(EntityKind::Customer, &moved);
        assert_eq!(patch.get("address"), Some(&Value::Null));
        assert_eq!(patch.get("name"), Some(&json!("Ana García")));
    }

    #[test]
    fn tombstone_flag_is_never_projected() {
        let mut record = customer();
        record.deleted = true;
        let row = project(EntityKind::Customer, &record);
        assert!(row.get("deleted").is_none());
    }

    #[test]
    fn unproject_moves_folds_into_first_part() {
        let row: RemoteRow = serde_json::from_value(json!({
            "id": "123e4567-e89b-12d3-a456-426614174000",
            "name": "Ana García",
            "address": "Calle Mayor, 12",
            "shop_id": "server-side column",
            "modified_at": 5,
        }))
        .unwrap();

        let record = unproject(EntityKind::Customer, row).unwrap();
        assert_eq!(record.get_str("name"), Some("Ana García"));
        assert_eq!(record.get("last_name"), Some(&Value::Null));
        assert_eq!(record.get_str("address"), Some("Calle Mayor, 12"));
        assert_eq!(record.get("city"), Some(&Value::Null));
        assert!(record.get("shop_id").is_none());
        assert_eq!(record.modified_millis(), Some(5));
    }

    #[test]
    fn repair_order_projection_keeps_allow_list() {
        let record = Record::new()
            .with_id("123e4567-e89b-12d3-a456-426614174000")
            .with("customer_id", "223e4567-e89b-12d3-a456-426614174000")
            .with("status", "delivered")
            .with("photos", json!(["a.jpg"]));

        let row = project(EntityKind::RepairOrder, &record);
        assert_eq!(row.get("status"), Some(&json!("delivered")));
        assert!(row.get("photos").is_none());
    }

    #[test]
    fn every_schema_carries_sync_columns() {
        for kind in EntityKind::ALL {
            let schema = schema_for(kind);
            for column in ["id", "created_at", "modified_at"] {
                assert!(schema.columns.contains(&column), "{kind} lacks {column}");
            }
            for fold in schema.folds {
                assert!(schema.columns.contains(&fold.column));
            }
        }
    }
}
