//! In-memory catalog backend.
//!
//! Rows are returned from `list` in storage order, which lets tests hand the
//! controller an unsorted catalog. List calls can be held open and released
//! one by one to force a particular response order.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use arenza_core::{Product, ProductId, ProductInput};
use arenza_storefront::{BackendError, CatalogBackend};

use crate::lock;

/// Clones share state.
#[derive(Clone)]
pub struct FakeCatalog {
    inner: Arc<FakeCatalogInner>,
}

struct FakeCatalogInner {
    products: Mutex<Vec<Product>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_lists: AtomicBool,
    next_mutation_failure: Mutex<Option<String>>,
    hang_mutations: AtomicBool,
    hold_lists: AtomicBool,
    /// One release handle per held list call, in arrival order.
    held: Mutex<Vec<Option<oneshot::Sender<()>>>>,
    held_count: watch::Sender<usize>,
}

impl FakeCatalog {
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let next_id = products.iter().map(|p| p.id.as_i64()).max().unwrap_or(0) + 1;
        Self {
            inner: Arc::new(FakeCatalogInner {
                products: Mutex::new(products),
                next_id: AtomicI64::new(next_id),
                list_calls: AtomicUsize::new(0),
                create_calls: AtomicUsize::new(0),
                update_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                fail_lists: AtomicBool::new(false),
                next_mutation_failure: Mutex::new(None),
                hang_mutations: AtomicBool::new(false),
                hold_lists: AtomicBool::new(false),
                held: Mutex::new(Vec::new()),
                held_count: watch::Sender::new(0),
            }),
        }
    }

    /// Replace the stored rows.
    pub fn set_products(&self, products: Vec<Product>) {
        *lock(&self.inner.products) = products;
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        lock(&self.inner.products).clone()
    }

    /// Make every `list` call fail until turned off again.
    pub fn fail_lists(&self, fail: bool) {
        self.inner.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Make the next create, update or delete fail with `message`.
    pub fn fail_next_mutation(&self, message: &str) {
        *lock(&self.inner.next_mutation_failure) = Some(message.to_owned());
    }

    /// Make every create, update and delete wait forever.
    pub fn hang_mutations(&self) {
        self.inner.hang_mutations.store(true, Ordering::SeqCst);
    }

    /// Hold every following `list` call until released.
    pub fn hold_lists(&self) {
        self.inner.hold_lists.store(true, Ordering::SeqCst);
    }

    /// Wait until `count` list calls are being held.
    pub async fn wait_for_held(&self, count: usize) {
        let mut rx = self.inner.held_count.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|held| *held >= count))
            .await
            .expect("list calls were not held in time")
            .expect("catalog dropped");
    }

    /// Let the `index`-th held list call (in arrival order) respond with the
    /// rows stored at that moment.
    pub fn release(&self, index: usize) {
        let sender = lock(&self.inner.held)
            .get_mut(index)
            .and_then(Option::take)
            .expect("no held list call at that index");
        let _ = sender.send(());
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.inner.update_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    /// Total create, update and delete calls.
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    async fn mutation_gate(&self) -> Result<(), BackendError> {
        if self.inner.hang_mutations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        lock(&self.inner.next_mutation_failure)
            .take()
            .map_or(Ok(()), |message| {
                Err(BackendError::Api {
                    status: 400,
                    message,
                })
            })
    }

    fn register_hold(&self) -> Option<oneshot::Receiver<()>> {
        if !self.inner.hold_lists.load(Ordering::SeqCst) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        let count = {
            let mut held = lock(&self.inner.held);
            held.push(Some(tx));
            held.len()
        };
        self.inner.held_count.send_replace(count);
        Some(rx)
    }
}

impl CatalogBackend for FakeCatalog {
    async fn list(&self) -> Result<Vec<Product>, BackendError> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(release) = self.register_hold() {
            // A dropped sender leaves the call hanging, like a stalled backend.
            if release.await.is_err() {
                std::future::pending::<()>().await;
            }
        }

        if self.inner.fail_lists.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "catalog unavailable".to_owned(),
            });
        }
        Ok(self.products())
    }

    async fn create(&self, input: &ProductInput) -> Result<(), BackendError> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate().await?;

        let id = ProductId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.inner.products).push(Product {
            id,
            name: input.name.clone(),
            price: input.price,
            description: input.description.clone(),
            image: input.image.clone(),
        });
        Ok(())
    }

    async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), BackendError> {
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate().await?;

        if let Some(product) = lock(&self.inner.products).iter_mut().find(|p| p.id == id) {
            product.name.clone_from(&input.name);
            product.price = input.price;
            product.description.clone_from(&input.description);
            product.image.clone_from(&input.image);
        }
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<(), BackendError> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_gate().await?;

        lock(&self.inner.products).retain(|p| p.id != id);
        Ok(())
    }
}
