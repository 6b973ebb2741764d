//! Product catalog and filtering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::discount::{Discount, EffectivePrice, resolve_discount};
use crate::types::{CategoryGroupId, CategoryId, Price, ProductId, SizeId};

/// A size variant (e.g. a 30 cm or 45 cm foil balloon) with its own price
/// and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSize {
    pub id: SizeId,
    pub label: String,
    pub price: Price,
    pub stock: u32,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    /// Price when the product has no size variants.
    pub price: Price,
    pub stock: u32,
    pub group_id: Option<CategoryGroupId>,
    pub category_ids: Vec<CategoryId>,
    pub sizes: Vec<ProductSize>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn size(&self, id: SizeId) -> Option<&ProductSize> {
        self.sizes.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn has_sizes(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Whether anything can be ordered right now.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        if self.has_sizes() {
            self.sizes.iter().any(|s| s.stock > 0)
        } else {
            self.stock > 0
        }
    }

    /// The "from" price shown in listings: the cheapest size, or the base
    /// price for products without sizes.
    #[must_use]
    pub fn starting_price(&self) -> Price {
        self.sizes
            .iter()
            .map(|s| s.price)
            .min()
            .unwrap_or(self.price)
    }
}

/// Sort order for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Catalog filter, usually deserialized from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub group: Option<CategoryGroupId>,
    /// Inclusive lower bound on the discounted starting price.
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on the discounted starting price.
    pub max_price: Option<Decimal>,
    pub in_stock: bool,
    /// Case-insensitive substring match on name and slug.
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductFilter {
    fn matches(&self, product: &Product, pricing: &EffectivePrice) -> bool {
        if !product.is_active {
            return false;
        }
        if let Some(category) = self.category
            && !product.category_ids.contains(&category)
        {
            return false;
        }
        if self.group.is_some() && product.group_id != self.group {
            return false;
        }
        let price = pricing.price.amount();
        if self.min_price.is_some_and(|min| price < min)
            || self.max_price.is_some_and(|max| price > max)
        {
            return false;
        }
        if self.in_stock && !product.in_stock() {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                product.name.to_lowercase().contains(&q)
                    || product.slug.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

/// A product as listed in the catalog, with its resolved price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub product: Product,
    pub pricing: EffectivePrice,
}

impl CatalogEntry {
    /// Price a product against the discounts active at `now`.
    #[must_use]
    pub fn new(product: Product, discounts: &[Discount], now: DateTime<Utc>) -> Self {
        let discount = resolve_discount(&product, discounts, now);
        let pricing = EffectivePrice::new(product.starting_price(), discount);
        Self { product, pricing }
    }
}

/// Price, filter and sort a set of products.
#[must_use]
pub fn filter_catalog(
    products: Vec<Product>,
    discounts: &[Discount],
    filter: &ProductFilter,
    now: DateTime<Utc>,
) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = products
        .into_iter()
        .map(|p| CatalogEntry::new(p, discounts, now))
        .filter(|e| filter.matches(&e.product, &e.pricing))
        .collect();

    match filter.sort {
        ProductSort::Newest => entries.sort_by(|a, b| {
            b.product
                .created_at
                .cmp(&a.product.created_at)
                .then_with(|| b.product.id.cmp(&a.product.id))
        }),
        ProductSort::PriceAsc => entries.sort_by_key(|e| (e.pricing.price, e.product.id)),
        ProductSort::PriceDesc => entries.sort_by(|a, b| {
            b.pricing
                .price
                .cmp(&a.pricing.price)
                .then_with(|| a.product.id.cmp(&b.product.id))
        }),
        ProductSort::Name => entries.sort_by(|a, b| {
            a.product
                .name
                .to_lowercase()
                .cmp(&b.product.name.to_lowercase())
                .then_with(|| a.product.id.cmp(&b.product.id))
        }),
    }

    entries
}
