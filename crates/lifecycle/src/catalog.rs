//! Product and customer registration.

use chrono::Utc;
use common::{CustomerId, ProductCode};
use domain::{
    Customer, CustomerPatch, InventoryItem, NewCustomer, NewProduct, Quantity, StockError,
};
use store::{CustomerStore, InventoryStore, StoreError, TransactionalStore, UnitOfWork};

use crate::engine::finish;
use crate::error::{LifecycleError, Result};

/// Registers and looks up the inventory and customer records the engine
/// works against.
#[derive(Clone)]
pub struct Catalog<D: TransactionalStore> {
    store: D,
}

impl<D: TransactionalStore> Catalog<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }

    /// Registers a product with its opening stock.
    #[tracing::instrument(skip(self, new), fields(product_code = %new.product_code))]
    pub async fn register_product(&self, new: NewProduct) -> Result<InventoryItem> {
        let mut tx = self.store.begin().await?;
        let result = register_product_in(&mut tx, new).await;
        let item = finish(tx, result).await?;

        tracing::info!(stock_qty = %item.stock_qty, "product registered");
        Ok(item)
    }

    #[tracing::instrument(skip(self))]
    pub async fn product(&self, product_code: &ProductCode) -> Result<InventoryItem> {
        let mut tx = self.store.begin().await?;
        let result = product_in(&mut tx, product_code).await;
        finish(tx, result).await
    }

    /// Adds `delta` to a product's stock. Negative deltas are allowed as long
    /// as the stock stays at or above zero.
    #[tracing::instrument(skip(self))]
    pub async fn restock(&self, product_code: &ProductCode, delta: Quantity) -> Result<InventoryItem> {
        let mut tx = self.store.begin().await?;
        let result = restock_in(&mut tx, product_code, delta).await;
        finish(tx, result).await
    }

    /// Lists every product ordered by product code.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<InventoryItem>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_products().await.map_err(LifecycleError::from);
        finish(tx, result).await
    }

    /// Registers a customer with zeroed statistics.
    #[tracing::instrument(skip(self, new))]
    pub async fn register_customer(&self, new: NewCustomer) -> Result<Customer> {
        new.validate()?;
        let customer = Customer::register(new, Utc::now());

        let mut tx = self.store.begin().await?;
        let result = tx
            .insert_customer(&customer)
            .await
            .map_err(LifecycleError::from);
        finish(tx, result).await?;

        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok(customer)
    }

    #[tracing::instrument(skip(self))]
    pub async fn customer(&self, customer_id: CustomerId) -> Result<Customer> {
        let mut tx = self.store.begin().await?;
        let result = customer_in(&mut tx, customer_id).await;
        finish(tx, result).await
    }

    /// Patches a customer's descriptive fields. Statistics are left alone.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_customer(
        &self,
        customer_id: CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer> {
        let mut tx = self.store.begin().await?;
        let result = update_customer_in(&mut tx, customer_id, patch).await;
        finish(tx, result).await
    }

    /// Deletes a customer. Orders that reference it are kept; their later
    /// transitions report `CustomerNotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: CustomerId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_customer(customer_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(LifecycleError::CustomerNotFound { customer_id }),
            Err(e) => Err(e.into()),
        };
        finish(tx, result).await?;

        tracing::info!("customer deleted");
        Ok(())
    }

    /// Lists customers, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_customers().await.map_err(LifecycleError::from);
        finish(tx, result).await
    }
}

async fn register_product_in<T: UnitOfWork>(tx: &mut T, new: NewProduct) -> Result<InventoryItem> {
    if new.stock_qty.is_negative() {
        return Err(StoreError::NegativeStock {
            product_code: new.product_code,
            stock: Quantity::zero(),
            delta: new.stock_qty,
        }
        .into());
    }
    if tx.get_product(&new.product_code).await?.is_some() {
        return Err(LifecycleError::AlreadyExists {
            entity: "product",
            key: new.product_code.to_string(),
        });
    }

    let item = InventoryItem::register(new, Utc::now());
    tx.insert_product(&item).await?;
    Ok(item)
}

async fn product_in<T: UnitOfWork>(tx: &mut T, product_code: &ProductCode) -> Result<InventoryItem> {
    tx.get_product(product_code)
        .await?
        .ok_or_else(|| LifecycleError::ProductNotFound {
            product_code: product_code.clone(),
        })
}

async fn restock_in<T: UnitOfWork>(
    tx: &mut T,
    product_code: &ProductCode,
    delta: Quantity,
) -> Result<InventoryItem> {
    let mut item = product_in(tx, product_code).await?;
    item.adjusted(delta).map_err(|e| match e {
        StockError::Negative => {
            LifecycleError::insufficient_stock(product_code, item.stock_qty, -delta)
        }
        StockError::Overflow => LifecycleError::QuantityOverflow {
            product_code: product_code.clone(),
        },
    })?;

    item.stock_qty = tx.adjust_stock(product_code, delta).await?;
    item.updated_at = Utc::now();
    Ok(item)
}

async fn customer_in<T: UnitOfWork>(tx: &mut T, customer_id: CustomerId) -> Result<Customer> {
    tx.get_customer(customer_id)
        .await?
        .ok_or(LifecycleError::CustomerNotFound { customer_id })
}

async fn update_customer_in<T: UnitOfWork>(
    tx: &mut T,
    customer_id: CustomerId,
    patch: CustomerPatch,
) -> Result<Customer> {
    let mut customer = customer_in(tx, customer_id).await?;
    customer.edit(patch, Utc::now())?;
    tx.update_customer(&customer).await?;
    Ok(customer)
}
