//! Product catalog management.
//!
//! Products are keyed by SKU and carry a price and a stock quantity. Selling
//! more units than are on hand fails with [`DomainError::OutOfStock`];
//! negative prices are rejected at validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CardResult, DomainError, ValidationError};
use crate::record::{require_non_empty, require_non_negative, Record};
use crate::store::{
    open_store, EntityStore, JournalBackend, MemoryBackend, StorageBackend, StorageError,
    StoreOptions,
};

/// One catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stock-keeping unit; unique within a catalog.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Category label.
    pub category: String,
    /// Unit price. Never negative.
    pub price: f64,
    /// Units on hand.
    pub quantity: u32,
}

impl Product {
    /// Creates a product.
    #[must_use]
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
        quantity: u32,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: category.into(),
            price,
            quantity,
        }
    }
}

/// Field-level update for a [`Product`]. The SKU is immutable.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    /// New name, if changing.
    pub name: Option<String>,
    /// New category, if changing.
    pub category: Option<String>,
    /// New unit price, if changing.
    pub price: Option<f64>,
    /// New stock quantity, if changing.
    pub quantity: Option<u32>,
}

impl Record for Product {
    type Patch = ProductPatch;

    fn key(&self) -> &str {
        &self.sku
    }

    fn search_text(&self) -> Vec<&str> {
        vec![&self.sku, &self.name, &self.category]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("category", &self.category)?;
        require_non_negative("price", self.price)
    }

    fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
    }
}

/// A product catalog: one [`EntityStore`] of products plus stock operations.
pub struct Catalog<B: StorageBackend<Product>> {
    products: EntityStore<Product, B>,
}

impl Catalog<JournalBackend<Product>> {
    /// Opens or creates a durable catalog at the given directory.
    ///
    /// # Errors
    /// Any storage error from opening the journal backend.
    pub fn open(dir: impl AsRef<Path>) -> CardResult<Self> {
        Ok(Self {
            products: open_store(dir.as_ref(), None, StoreOptions::default())?,
        })
    }
}

impl Catalog<MemoryBackend<Product>> {
    /// Creates an ephemeral in-memory catalog.
    ///
    /// # Errors
    /// Never fails in practice; kept fallible for uniformity with
    /// [`Catalog::open`].
    pub fn in_memory() -> CardResult<Self> {
        Ok(Self {
            products: EntityStore::open(MemoryBackend::new(), StoreOptions::default())?,
        })
    }
}

impl<B: StorageBackend<Product>> Catalog<B> {
    /// Adds a new product.
    ///
    /// # Errors
    /// - [`StorageError::DuplicateKey`] if the SKU is taken
    /// - [`ValidationError`] for empty name/category or negative price
    pub fn add_product(&mut self, product: Product) -> CardResult<()> {
        self.products.add(product)
    }

    /// Looks up a product by SKU.
    #[must_use]
    pub fn find(&self, sku: &str) -> Option<Product> {
        self.products.get(sku)
    }

    /// Substring search over SKU, name, and category.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Product> {
        self.products.search(query)
    }

    /// Sells `count` units, returning the remaining stock.
    ///
    /// # Errors
    /// - [`DomainError::NonPositiveAmount`] if `count` is zero
    /// - [`StorageError::NotFound`] for an unknown SKU
    /// - [`DomainError::OutOfStock`] if `count` exceeds the units on hand;
    ///   the record is unchanged
    pub fn sell(&mut self, sku: &str, count: u32) -> CardResult<u32> {
        if count == 0 {
            return Err(DomainError::NonPositiveAmount { amount: 0.0 }.into());
        }
        let product = self
            .products
            .get(sku)
            .ok_or_else(|| StorageError::NotFound(sku.to_string()))?;

        if count > product.quantity {
            return Err(DomainError::OutOfStock {
                key: sku.to_string(),
            }
            .into());
        }

        let remaining = product.quantity - count;
        self.products.update(
            sku,
            ProductPatch {
                quantity: Some(remaining),
                ..ProductPatch::default()
            },
        )?;
        Ok(remaining)
    }

    /// Adds `count` units to stock, returning the new quantity.
    ///
    /// # Errors
    /// - [`DomainError::NonPositiveAmount`] if `count` is zero
    /// - [`StorageError::NotFound`] for an unknown SKU
    /// - [`DomainError::QuantityOverflow`] if the result would not fit; the
    ///   record is unchanged
    pub fn restock(&mut self, sku: &str, count: u32) -> CardResult<u32> {
        if count == 0 {
            return Err(DomainError::NonPositiveAmount { amount: 0.0 }.into());
        }
        let product = self
            .products
            .get(sku)
            .ok_or_else(|| StorageError::NotFound(sku.to_string()))?;

        let quantity = product
            .quantity
            .checked_add(count)
            .ok_or_else(|| DomainError::QuantityOverflow {
                key: sku.to_string(),
            })?;
        self.products.update(
            sku,
            ProductPatch {
                quantity: Some(quantity),
                ..ProductPatch::default()
            },
        )?;
        Ok(quantity)
    }

    /// Sets a new unit price.
    ///
    /// # Errors
    /// - [`StorageError::NotFound`] for an unknown SKU
    /// - [`ValidationError`] for a negative price
    pub fn reprice(&mut self, sku: &str, price: f64) -> CardResult<()> {
        self.products.update(
            sku,
            ProductPatch {
                price: Some(price),
                ..ProductPatch::default()
            },
        )
    }

    /// Removes a product.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the SKU is absent.
    pub fn remove_product(&mut self, sku: &str) -> CardResult<()> {
        self.products.remove(sku)
    }

    /// Snapshot of all products in SKU order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.products.list()
    }
}
