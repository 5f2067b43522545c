//! Data model: raw tables on the way in, typed records on the way out.

mod enums;
mod raw;
mod records;

pub use enums::{
    CITY_ALIASES, Category, Channel, City, LaunchFlag, PaymentStatus, Scope, StockStatus,
};
pub use raw::{
    DATE_FORMAT, RawCampaign, RawDataset, RawInventory, RawProduct, RawSale, RawStore, RawTable,
    TIMESTAMP_FORMAT, TableRecord, to_raw_table,
};
pub use records::{Campaign, Dataset, InventorySnapshot, Product, Sale, Store};
