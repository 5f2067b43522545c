//! Segment selection over the cleaned dataset.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::model::{
    Campaign, Category, Channel, City, Dataset, InventorySnapshot, Product, Sale, Scope, Store,
};

/// City/channel/category selection; each dimension is `All` or one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SegmentFilter {
    pub city: Scope<City>,
    pub channel: Scope<Channel>,
    pub category: Scope<Category>,
}

impl SegmentFilter {
    pub fn is_all(&self) -> bool {
        self.city.is_all() && self.channel.is_all() && self.category.is_all()
    }

    /// Whether a campaign's targeting intersects this segment.
    pub fn overlaps_campaign(&self, campaign: &Campaign) -> bool {
        self.city.overlaps(&campaign.city)
            && self.channel.overlaps(&campaign.channel)
            && self.category.overlaps(&campaign.category)
    }
}

impl fmt::Display for SegmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "city={}, channel={}, category={}",
            self.city, self.channel, self.category
        )
    }
}

/// Product and store lookups for joining facts to their dimensions.
#[derive(Debug, Default)]
pub struct DimensionIndex<'a> {
    products: FxHashMap<&'a str, &'a Product>,
    stores: FxHashMap<&'a str, &'a Store>,
}

impl<'a> DimensionIndex<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            products: dataset
                .products
                .iter()
                .map(|p| (p.product_id.as_str(), p))
                .collect(),
            stores: dataset
                .stores
                .iter()
                .map(|s| (s.store_id.as_str(), s))
                .collect(),
        }
    }

    pub fn product(&self, product_id: &str) -> Option<&'a Product> {
        self.products.get(product_id).copied()
    }

    pub fn store(&self, store_id: &str) -> Option<&'a Store> {
        self.stores.get(store_id).copied()
    }

    pub fn category(&self, product_id: &str) -> Option<Category> {
        self.product(product_id).map(|p| p.category)
    }

    pub fn city(&self, store_id: &str) -> Option<City> {
        self.store(store_id).map(|s| s.city_clean)
    }

    pub fn channel(&self, store_id: &str) -> Option<Channel> {
        self.store(store_id).map(|s| s.channel)
    }

    /// A fact row is in the segment when its joined dimensions are admitted.
    ///
    /// Rows whose product or store cannot be resolved only pass dimensions
    /// that are set to `All`.
    pub fn matches(&self, filter: &SegmentFilter, product_id: &str, store_id: &str) -> bool {
        let store = self.store(store_id);
        filter.city.admits(store.map(|s| &s.city_clean))
            && filter.channel.admits(store.map(|s| &s.channel))
            && filter
                .category
                .admits(self.product(product_id).map(|p| &p.category))
    }

    pub fn matches_sale(&self, filter: &SegmentFilter, sale: &Sale) -> bool {
        self.matches(filter, &sale.product_id, &sale.store_id)
    }

    pub fn matches_stock(&self, filter: &SegmentFilter, row: &InventorySnapshot) -> bool {
        self.matches(filter, &row.product_id, &row.store_id)
    }
}

/// Sales rows in the segment.
pub fn filter_sales<'a>(
    dataset: &'a Dataset,
    index: &DimensionIndex<'_>,
    filter: &SegmentFilter,
) -> Vec<&'a Sale> {
    dataset
        .sales
        .iter()
        .filter(|s| index.matches_sale(filter, s))
        .collect()
}

/// A copy of the dataset restricted to the segment.
///
/// Dimension tables keep only matching products and stores; campaigns are
/// kept when their targeting overlaps the segment.
pub fn filter_dataset(dataset: &Dataset, filter: &SegmentFilter) -> Dataset {
    if filter.is_all() {
        return dataset.clone();
    }
    let index = DimensionIndex::new(dataset);

    Dataset {
        products: dataset
            .products
            .iter()
            .filter(|p| filter.category.admits(Some(&p.category)))
            .cloned()
            .collect(),
        stores: dataset
            .stores
            .iter()
            .filter(|s| {
                filter.city.admits(Some(&s.city_clean)) && filter.channel.admits(Some(&s.channel))
            })
            .cloned()
            .collect(),
        sales: dataset
            .sales
            .iter()
            .filter(|s| index.matches_sale(filter, s))
            .cloned()
            .collect(),
        inventory: dataset
            .inventory
            .iter()
            .filter(|r| index.matches_stock(filter, r))
            .cloned()
            .collect(),
        campaigns: dataset
            .campaigns
            .iter()
            .filter(|c| filter.overlaps_campaign(c))
            .cloned()
            .collect(),
    }
}
