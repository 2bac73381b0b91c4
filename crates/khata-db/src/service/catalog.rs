//! # Catalog Service
//!
//! Product and customer lifecycle: validates input, stamps identity and
//! timestamps, and delegates persistence to the repositories.
//!
//! ## Creation Flow
//! ```text
//! NewProduct
//!     │ validate (category triple rules, unique units, quantities)
//!     ▼
//! Product { id: uuid, items positioned in input order, counters seeded }
//!     │ recompute_totals() inside the repository
//!     ▼
//! products + stock_items rows, one transaction
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::repository::customer::{CustomerRepository, CustomerWithBalance};
use crate::repository::product::{CategoryNode, ProductPage, ProductQuery, ProductRepository};
use crate::service::error::{EngineError, EngineResult};
use khata_core::validation;
use khata_core::{
    Customer, NewCustomer, NewProduct, NewStockItem, Product, ProductUpdate, StockItem,
};

/// Orchestrates catalog and customer writes.
#[derive(Debug, Clone)]
pub struct CatalogService {
    products: ProductRepository,
    customers: CustomerRepository,
}

impl CatalogService {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        CatalogService {
            products: ProductRepository::new(pool.clone()),
            customers: CustomerRepository::new(pool),
        }
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Creates a catalog product with its initial stock items.
    ///
    /// The initial quantity of each item counts as intake: both stock
    /// counters start at `quantity`.
    pub async fn create_product(&self, input: NewProduct) -> EngineResult<Product> {
        validation::validate_new_product(&input)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            category: input.category,
            sub_category: input.sub_category,
            child_category: input.child_category,
            items: seed_items(&input.items),
            grand_total_cents: 0, // recomputed by the repository
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };

        let product = self.products.insert(&product).await?;
        info!(id = %product.id, title = %product.title, "Product created");
        Ok(product)
    }

    /// Gets a product or fails with NotFound.
    pub async fn get_product(&self, id: &str) -> EngineResult<Product> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", id))
    }

    /// Lists one page of products with optional title/category filters.
    pub async fn list_products(&self, query: &ProductQuery) -> EngineResult<ProductPage> {
        Ok(self.products.list(query).await?)
    }

    /// Applies a partial update; `items: Some(_)` replaces the full stock
    /// item list (counters reseeded from the incoming quantities).
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> EngineResult<Product> {
        let mut product = self.get_product(id).await?;

        if let Some(title) = update.title {
            validation::validate_title(&title)?;
            product.title = title.trim().to_string();
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(sub_category) = update.sub_category {
            product.sub_category = sub_category;
        }
        if let Some(child_category) = update.child_category {
            product.child_category = child_category;
        }
        if let Some(items) = update.items {
            for item in &items {
                validation::validate_new_stock_item(item)?;
            }
            product.items = seed_items(&items);
        }

        let product = self.products.update(&product).await?;
        info!(id = %product.id, "Product updated");
        Ok(product)
    }

    /// Deletes a product and its stock items.
    pub async fn delete_product(&self, id: &str) -> EngineResult<()> {
        self.products.delete(id).await?;
        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// The derived category → sub-category → child-category tree.
    pub async fn category_hierarchy(&self) -> EngineResult<Vec<CategoryNode>> {
        Ok(self.products.hierarchy().await?)
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    /// Creates a ledger customer.
    pub async fn create_customer(&self, input: NewCustomer) -> EngineResult<Customer> {
        validation::validate_new_customer(&input)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            address: input.address,
            created_by: input.created_by,
            created_at: Utc::now(),
        };

        let customer = self.customers.insert(&customer).await?;
        info!(id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    /// Gets a customer or fails with NotFound.
    pub async fn get_customer(&self, id: &str) -> EngineResult<Customer> {
        self.customers
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("Customer", id))
    }

    /// Lists customers, optionally filtered by name/phone substring.
    pub async fn list_customers(&self, filter: Option<&str>) -> EngineResult<Vec<Customer>> {
        Ok(self.customers.list(filter).await?)
    }

    /// Lists customers with their ledger rollups.
    pub async fn customers_with_balances(&self) -> EngineResult<Vec<CustomerWithBalance>> {
        Ok(self.customers.list_with_balances().await?)
    }

    /// Deletes a customer; refused while transactions still reference them.
    pub async fn delete_customer(&self, id: &str) -> EngineResult<()> {
        self.customers.delete(id).await?;
        info!(id = %id, "Customer deleted");
        Ok(())
    }
}

/// Seeds stock items from incoming lines: position follows input order, and
/// the initial quantity lands in both counters.
fn seed_items(items: &[NewStockItem]) -> Vec<StockItem> {
    items
        .iter()
        .enumerate()
        .map(|(pos, item)| StockItem {
            unit: item.unit.trim().to_string(),
            position: pos as i64,
            available_quantity: item.quantity,
            total_purchased_quantity: item.quantity,
            price_per_unit_cents: item.price_per_unit_cents,
            line_total_cents: 0, // recomputed before persistence
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::CategoryRef;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cement_input() -> NewProduct {
        NewProduct {
            title: "Ultratech Cement".to_string(),
            category: CategoryRef::new("c-1", "cement"),
            sub_category: CategoryRef::new("s-1", "ultratech"),
            child_category: None,
            items: vec![
                NewStockItem {
                    unit: "bag".to_string(),
                    quantity: 10,
                    price_per_unit_cents: 100,
                },
                NewStockItem {
                    unit: "kg".to_string(),
                    quantity: 500,
                    price_per_unit_cents: 2,
                },
            ],
            created_by: "actor-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_product() {
        let db = db().await;
        let catalog = db.catalog();

        let created = catalog.create_product(cement_input()).await.unwrap();
        assert_eq!(created.items.len(), 2);
        // both counters seeded from the initial quantity
        assert_eq!(created.items[0].available_quantity, 10);
        assert_eq!(created.items[0].total_purchased_quantity, 10);
        // derived totals recomputed: 10*100 + 500*2
        assert_eq!(created.grand_total_cents, 2000);

        let fetched = catalog.get_product(&created.id).await.unwrap();
        assert_eq!(fetched.title, "Ultratech Cement");
        assert_eq!(fetched.items[1].unit, "kg");
        assert_eq!(fetched.grand_total_cents, 2000);
    }

    #[tokio::test]
    async fn test_get_missing_product_is_not_found() {
        let db = db().await;
        let err = db.catalog().get_product("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_replaces_item_list() {
        let db = db().await;
        let catalog = db.catalog();
        let created = catalog.create_product(cement_input()).await.unwrap();

        let updated = catalog
            .update_product(
                &created.id,
                ProductUpdate {
                    title: Some("Ultratech OPC 53".to_string()),
                    items: Some(vec![NewStockItem {
                        unit: "tonne".to_string(),
                        quantity: 2,
                        price_per_unit_cents: 90_000,
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Ultratech OPC 53");
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].unit, "tonne");
        assert_eq!(updated.grand_total_cents, 180_000);
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_child_category() {
        let db = db().await;
        let catalog = db.catalog();
        let created = catalog.create_product(cement_input()).await.unwrap();
        assert!(created.child_category.is_none());

        let updated = catalog
            .update_product(
                &created.id,
                ProductUpdate {
                    child_category: Some(Some(CategoryRef::new("cc-1", "opc"))),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.child_category.as_ref().map(|c| c.name.as_str()), Some("opc"));

        let cleared = catalog
            .update_product(
                &created.id,
                ProductUpdate {
                    child_category: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.child_category.is_none());
    }

    #[tokio::test]
    async fn test_list_products_title_filter() {
        let db = db().await;
        let catalog = db.catalog();
        catalog.create_product(cement_input()).await.unwrap();

        let mut rod = cement_input();
        rod.title = "Tata Rod 12mm".to_string();
        rod.category = CategoryRef::new("c-2", "rod");
        catalog.create_product(rod).await.unwrap();

        let all = catalog.list_products(&ProductQuery::default()).await.unwrap();
        assert_eq!(all.items.len(), 2);
        assert_eq!(all.total, 2);
        assert_eq!(all.pages_count, 1);

        let hits = catalog
            .list_products(&ProductQuery {
                search: Some("rod".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].title, "Tata Rod 12mm");

        let cement_only = catalog
            .list_products(&ProductQuery {
                category_id: Some("c-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cement_only.items.len(), 1);

        // pages_count rounds up: 2 products, 1 per page
        let paged = catalog
            .list_products(&ProductQuery {
                per_page: 1,
                page: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paged.items.len(), 1);
        assert_eq!(paged.pages_count, 2);
    }

    #[tokio::test]
    async fn test_category_hierarchy() {
        let db = db().await;
        let catalog = db.catalog();

        catalog.create_product(cement_input()).await.unwrap();

        let mut second = cement_input();
        second.title = "ACC Cement".to_string();
        second.sub_category = CategoryRef::new("s-2", "acc");
        catalog.create_product(second).await.unwrap();

        let tree = catalog.category_hierarchy().await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "cement");
        assert_eq!(tree[0].children.len(), 2);
    }

    #[tokio::test]
    async fn test_customer_lifecycle() {
        let db = db().await;
        let catalog = db.catalog();

        let customer = catalog
            .create_customer(NewCustomer {
                name: "Ramesh Kumar".to_string(),
                phone: "9876543210".to_string(),
                address: Some("Main Bazaar".to_string()),
                created_by: None,
            })
            .await
            .unwrap();

        let fetched = catalog.get_customer(&customer.id).await.unwrap();
        assert_eq!(fetched.phone, "9876543210");

        // a fresh customer rolls up as all zeros
        let rollups = catalog.customers_with_balances().await.unwrap();
        assert_eq!(rollups.len(), 1);
        assert_eq!(rollups[0].balance_cents, 0);
        assert_eq!(rollups[0].transaction_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = db().await;
        let mut bad = cement_input();
        bad.category.id = None;

        let err = db.catalog().create_product(bad).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
