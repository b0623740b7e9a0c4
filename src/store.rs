use crate::api::ProductsApi;
use crate::data_models::{NewProduct, Product, ProductId};
use crate::errors::StoreError;
use crate::session::Session;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{error, info, instrument, warn};
use validator::Validate;

pub const MAX_TRACKED_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Refresh,
    Add,
    Remove(ProductId),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Default)]
struct OperationTracker {
    in_flight: usize,
    last: OperationState,
}

#[derive(Debug, Default)]
struct StoreState {
    products: Vec<Product>,
    // Sequence numbers are shared by every operation kind.
    issued: u64,
    applied: u64,
    // Value of `issued` when each successful add completed. Only a list
    // issued after that point is known to contain the product.
    unsynced_adds: Vec<u64>,
    operations: HashMap<OperationKind, OperationTracker>,
}

impl StoreState {
    fn tracker(&mut self, kind: OperationKind) -> &mut OperationTracker {
        self.operations.entry(kind).or_default()
    }

    fn in_flight(&self, kind: OperationKind) -> usize {
        self.operations.get(&kind).map_or(0, |t| t.in_flight)
    }

    /// Cached products plus adds the cache does not reflect yet.
    fn reserved(&self) -> usize {
        self.products.len() + self.in_flight(OperationKind::Add) + self.unsynced_adds.len()
    }

    /// Keeps only the latest settled remove outcome, plus removes in flight.
    fn prune_removes(&mut self) {
        self.operations.retain(|kind, tracker| {
            !matches!(kind, OperationKind::Remove(_)) || tracker.in_flight > 0
        });
    }

    fn replace_products(&mut self, products: Vec<Product>, seq: u64) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(products.len());
        for product in products {
            if seen.insert(product.id) {
                unique.push(product);
            } else {
                warn!(id = %product.id, "dropping duplicate product from remote list");
            }
        }
        if unique.len() > MAX_TRACKED_PRODUCTS {
            warn!(
                count = unique.len(),
                "remote list exceeds {MAX_TRACKED_PRODUCTS} tracked products"
            );
        }
        self.products = unique;
        self.applied = seq;
        self.unsynced_adds.retain(|&completed| completed >= seq);
    }
}

/// Marks one operation as in flight until it is completed or dropped.
struct Pending<'a> {
    state: &'a Mutex<StoreState>,
    kind: OperationKind,
    done: bool,
}

impl Pending<'_> {
    fn complete(mut self, state: &mut StoreState, succeeded: bool) {
        let tracker = state.tracker(self.kind);
        tracker.in_flight = tracker.in_flight.saturating_sub(1);
        tracker.last = if succeeded {
            OperationState::Succeeded
        } else {
            OperationState::Failed
        };
        self.done = true;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // Cancelled before completion: release the slot without recording an outcome.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let tracker = state.tracker(self.kind);
        tracker.in_flight = tracker.in_flight.saturating_sub(1);
    }
}

/// Session-scoped cache of the user's tracked products.
///
/// The cache is only ever replaced by a complete remote list or shrunk by a
/// confirmed delete. Every operation takes a sequence number when issued and
/// a list response older than the newest applied effect is discarded, so
/// overlapping calls settle on a state some serial order would produce.
#[derive(Debug)]
pub struct TrackedProductStore<A> {
    api: A,
    session: Session,
    state: Mutex<StoreState>,
}

impl<A: ProductsApi> TrackedProductStore<A> {
    pub fn new(api: A, session: Session) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, state: &mut StoreState, kind: OperationKind) -> (Pending<'_>, u64) {
        if matches!(kind, OperationKind::Remove(_)) {
            state.prune_removes();
        }
        state.issued += 1;
        state.tracker(kind).in_flight += 1;
        let pending = Pending {
            state: &self.state,
            kind,
            done: false,
        };
        (pending, state.issued)
    }

    /// Snapshot of the cached products.
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().products.is_empty()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.lock().products.iter().any(|p| p.id == id)
    }

    /// False once cached products plus in-flight and not yet refreshed adds
    /// reach the cap.
    pub fn can_add(&self) -> bool {
        self.lock().reserved() < MAX_TRACKED_PRODUCTS
    }

    pub fn state(&self, kind: OperationKind) -> OperationState {
        let state = self.lock();
        match state.operations.get(&kind) {
            None => OperationState::Idle,
            Some(tracker) if tracker.in_flight > 0 => OperationState::Pending,
            Some(tracker) => tracker.last,
        }
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.state(kind) == OperationState::Pending
    }

    /// Fetches the full list and replaces the cache with it.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Product>, StoreError> {
        let (pending, seq) = {
            let mut state = self.lock();
            self.begin(&mut state, OperationKind::Refresh)
        };
        match self.api.list_products(&self.session.credential).await {
            Ok(products) => {
                let mut state = self.lock();
                if seq > state.applied {
                    state.replace_products(products, seq);
                } else {
                    warn!(seq, applied = state.applied, "discarding stale product list");
                }
                pending.complete(&mut state, true);
                Ok(state.products.clone())
            }
            Err(err) => {
                error!("failed to fetch products: {err}");
                pending.complete(&mut self.lock(), false);
                Err(err.into())
            }
        }
    }

    /// Validates raw form input and asks the service to track it.
    ///
    /// Makes exactly one network call when the input is valid and capacity
    /// remains. The cache is untouched: the service assigns the id, site and
    /// initial price, so callers follow up with [`TrackedProductStore::refresh`]
    /// or use [`TrackedProductStore::add_and_refresh`].
    pub async fn add(&self, url: &str, target_price: &str) -> Result<(), StoreError> {
        let product = NewProduct::parse(url, target_price)?;
        self.add_product(&product).await
    }

    #[instrument(skip(self, product), fields(url = %product.url, target_price = %product.target_price))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<(), StoreError> {
        product.validate()?;
        let pending = {
            let mut state = self.lock();
            let reserved = state.reserved();
            if reserved >= MAX_TRACKED_PRODUCTS {
                warn!(reserved, "refusing add at capacity");
                return Err(StoreError::CapacityExceeded {
                    limit: MAX_TRACKED_PRODUCTS,
                });
            }
            self.begin(&mut state, OperationKind::Add).0
        };
        match self
            .api
            .add_product(&self.session.credential, product)
            .await
        {
            Ok(created) => {
                match created {
                    Some(created) => info!(id = %created.id, "product added"),
                    None => info!("product added"),
                }
                let mut state = self.lock();
                let completed = state.issued;
                state.unsynced_adds.push(completed);
                pending.complete(&mut state, true);
                Ok(())
            }
            Err(err) => {
                error!("failed to add product: {err}");
                pending.complete(&mut self.lock(), false);
                Err(err.into())
            }
        }
    }

    /// Adds a product, then re-synchronises so the cache holds the
    /// service-assigned fields. Returns the refreshed list.
    pub async fn add_and_refresh(
        &self,
        url: &str,
        target_price: &str,
    ) -> Result<Vec<Product>, StoreError> {
        self.add(url, target_price).await?;
        self.refresh().await
    }

    /// Deletes remotely, then drops the product from the cache.
    ///
    /// Removing an id that is not cached is not an error. On failure the
    /// cache is left as it was.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: ProductId) -> Result<(), StoreError> {
        let (pending, seq) = {
            let mut state = self.lock();
            self.begin(&mut state, OperationKind::Remove(id))
        };
        match self.api.delete_product(&self.session.credential, id).await {
            Ok(()) => {
                let mut state = self.lock();
                let before = state.products.len();
                state.products.retain(|p| p.id != id);
                state.applied = state.applied.max(seq);
                if state.products.len() < before {
                    info!("product removed");
                }
                pending.complete(&mut state, true);
                Ok(())
            }
            Err(err) => {
                error!("failed to delete product: {err}");
                pending.complete(&mut self.lock(), false);
                Err(err.into())
            }
        }
    }
}
