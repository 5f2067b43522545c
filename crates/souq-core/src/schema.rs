//! Table schemas, column aliases and header resolution.
//!
//! Input files arrive with inconsistent headers (`Unit Cost`, `unit_cost_aed`,
//! `cost`). Every header is normalized first, then matched against the alias
//! list of each logical column. A table is rejected only when a *required*
//! column has no match at all.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::RawTable;

/// The five tables of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Products,
    Stores,
    Sales,
    Inventory,
    Campaigns,
}

impl TableKind {
    /// All kinds, in dependency order (dimensions before facts).
    pub const ALL: [TableKind; 5] = [
        TableKind::Products,
        TableKind::Stores,
        TableKind::Sales,
        TableKind::Inventory,
        TableKind::Campaigns,
    ];

    /// Lowercase name, also used as the file stem on disk.
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Products => "products",
            TableKind::Stores => "stores",
            TableKind::Sales => "sales",
            TableKind::Inventory => "inventory",
            TableKind::Campaigns => "campaigns",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = normalize_column_name(name);
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Schema describing the logical columns of this table.
    pub fn schema(&self) -> &'static TableSchema {
        match self {
            TableKind::Products => &PRODUCTS,
            TableKind::Stores => &STORES,
            TableKind::Sales => &SALES,
            TableKind::Inventory => &INVENTORY,
            TableKind::Campaigns => &CAMPAIGNS,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical column and the header spellings that map onto it.
#[derive(Debug)]
pub struct ColumnSpec {
    /// Canonical name; always the first alias tried.
    pub name: &'static str,
    /// Additional accepted headers, in priority order.
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: true,
        }
    }

    const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: false,
        }
    }
}

/// Logical layout of one table kind.
#[derive(Debug)]
pub struct TableSchema {
    pub kind: TableKind,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    pub fn required_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }
}

static PRODUCTS: TableSchema = TableSchema {
    kind: TableKind::Products,
    columns: &[
        ColumnSpec::required("product_id", &["sku", "id"]),
        ColumnSpec::required("category", &[]),
        ColumnSpec::optional("brand", &[]),
        ColumnSpec::optional("base_price", &["base_price_aed", "price"]),
        ColumnSpec::optional("unit_cost", &["unit_cost_aed", "cost"]),
        ColumnSpec::optional("tax_rate", &["vat_rate", "tax"]),
        ColumnSpec::optional("launch_flag", &["launch"]),
    ],
};

static STORES: TableSchema = TableSchema {
    kind: TableKind::Stores,
    columns: &[
        ColumnSpec::required("store_id", &["id"]),
        ColumnSpec::required("city", &[]),
        ColumnSpec::required("channel", &[]),
        ColumnSpec::optional("fulfillment_type", &["fulfillment", "fulfilment_type"]),
    ],
};

static SALES: TableSchema = TableSchema {
    kind: TableKind::Sales,
    columns: &[
        ColumnSpec::required("order_id", &[]),
        ColumnSpec::required("order_time", &["order_date", "date", "timestamp"]),
        ColumnSpec::required("product_id", &[]),
        ColumnSpec::required("store_id", &[]),
        ColumnSpec::required("qty", &["quantity"]),
        ColumnSpec::required(
            "selling_price",
            &["selling_price_aed", "price", "unit_price"],
        ),
        ColumnSpec::optional("discount_pct", &["discount"]),
        ColumnSpec::optional("payment_status", &[]),
        ColumnSpec::optional("return_flag", &["returned"]),
    ],
};

static INVENTORY: TableSchema = TableSchema {
    kind: TableKind::Inventory,
    columns: &[
        ColumnSpec::required("snapshot_date", &["date", "inventory_date"]),
        ColumnSpec::required("product_id", &[]),
        ColumnSpec::required("store_id", &[]),
        ColumnSpec::required("stock_on_hand", &["stock", "quantity", "qty"]),
        ColumnSpec::optional("reorder_point", &[]),
        ColumnSpec::optional("lead_time_days", &["lead_time"]),
    ],
};

static CAMPAIGNS: TableSchema = TableSchema {
    kind: TableKind::Campaigns,
    columns: &[
        ColumnSpec::required("campaign_id", &["id"]),
        ColumnSpec::required("start_date", &[]),
        ColumnSpec::required("end_date", &[]),
        ColumnSpec::optional("city", &[]),
        ColumnSpec::optional("channel", &[]),
        ColumnSpec::optional("category", &[]),
        ColumnSpec::required("discount_pct", &["discount"]),
        ColumnSpec::optional("promo_budget", &["promo_budget_aed", "budget"]),
    ],
};

/// Lowercase, strip, and replace spaces with underscores.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Resolved positions of logical columns within a raw table's header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    kind: TableKind,
    indices: FxHashMap<&'static str, usize>,
}

impl ColumnMap {
    /// Resolve `table`'s header against its schema.
    ///
    /// # Errors
    /// Returns [`Error::Schema`] listing every required column with no match.
    pub fn resolve(table: &RawTable) -> Result<Self> {
        let headers: Vec<String> = table
            .columns
            .iter()
            .map(|c| normalize_column_name(c))
            .collect();
        let schema = table.kind.schema();

        let mut indices = FxHashMap::default();
        let mut missing = Vec::new();

        for spec in schema.columns {
            let found = std::iter::once(spec.name)
                .chain(spec.aliases.iter().copied())
                .find_map(|alias| headers.iter().position(|h| h == alias));

            match found {
                Some(index) => {
                    indices.insert(spec.name, index);
                }
                None if spec.required => missing.push(spec.name.to_string()),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(Error::Schema {
                table: table.kind.name().to_string(),
                missing,
            });
        }

        Ok(Self {
            kind: table.kind,
            indices,
        })
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Whether the logical column was present in the header.
    pub fn has(&self, column: &str) -> bool {
        self.indices.contains_key(column)
    }

    /// Trimmed cell for a logical column, or `None` if the column is absent.
    ///
    /// A present but empty cell is returned as `Some("")`.
    pub fn get<'a>(&self, row: &'a [String], column: &str) -> Option<&'a str> {
        self.indices
            .get(column)
            .map(|&index| row.get(index).map(|cell| cell.trim()).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(kind: TableKind, columns: &[&str]) -> RawTable {
        RawTable::new(kind, columns.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Unit Cost "), "unit_cost");
        assert_eq!(normalize_column_name("\u{feff}Order_ID"), "order_id");
    }

    #[test]
    fn test_aliases_resolve_to_logical_columns() {
        let mut raw = table(
            TableKind::Products,
            &["SKU", "Category", "Cost", "Base Price AED"],
        );
        raw.push_row(vec![
            "P1".to_string(),
            "Beauty".to_string(),
            " 12.5 ".to_string(),
            "30".to_string(),
        ]);

        let map = ColumnMap::resolve(&raw).unwrap();
        let row = &raw.rows[0];
        assert_eq!(map.get(row, "product_id"), Some("P1"));
        assert_eq!(map.get(row, "unit_cost"), Some("12.5"));
        assert_eq!(map.get(row, "base_price"), Some("30"));
        assert_eq!(map.get(row, "brand"), None);
    }

    #[test]
    fn test_missing_required_columns_are_listed() {
        let raw = table(TableKind::Sales, &["order_id", "Quantity"]);
        match ColumnMap::resolve(&raw) {
            Err(Error::Schema { table, missing }) => {
                assert_eq!(table, "sales");
                assert!(missing.contains(&"order_time".to_string()));
                assert!(missing.contains(&"selling_price".to_string()));
                assert!(!missing.contains(&"qty".to_string()));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_table_kind_names() {
        assert_eq!(TableKind::from_name("Sales"), Some(TableKind::Sales));
        assert_eq!(TableKind::from_name("orders"), None);
    }
}
