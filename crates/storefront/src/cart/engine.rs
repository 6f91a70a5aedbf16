//! The cart synchronization engine.
//!
//! Owns the authoritative in-memory cart view for one (store, visitor)
//! scope. Mutations apply optimistically so the UI responds with zero
//! perceived latency, then reconcile against server truth when the network
//! round-trip settles; failures roll the optimistic change back.
//!
//! Ordering: mutations for the same variant are serialized behind a keyed
//! async lock (a rapid second tap queues behind the first); mutations for
//! different variants run concurrently. The state mutex is only ever held
//! for short synchronous sections, never across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::instrument;

use souk_core::{StoreId, VariantId, VisitorId};

use crate::api::ApiError;
use crate::api::types::CartDto;

use super::CartError;
use super::backend::CartBackend;
use super::types::{Cart, CartLine, LineMetadata, MutationKind, PendingOperation};
use super::validation::{self, CartValidation};

/// Active (store, currency) scope for the engine.
#[derive(Debug, Clone)]
struct Scope {
    store_id: StoreId,
    currency: String,
    /// Set once the initial server fetch for this store has completed.
    initialized: bool,
}

/// Mutable engine state, guarded by a sync mutex.
struct EngineState {
    scope: Option<Scope>,
    cart: Cart,
    pending: HashMap<VariantId, PendingOperation>,
    /// Generation handed to the most recently issued server fetch.
    fetch_generation: u64,
    /// Generation of the newest fetch applied so far. Fetches resolve in
    /// arbitrary order across variants; anything older than this is stale.
    applied_generation: u64,
}

/// Cart synchronization engine for one visitor.
///
/// Cheap to share via `Arc`; route handlers dispatch intents and read
/// derived state, the engine is the only writer of cart lines.
pub struct CartEngine<B> {
    backend: B,
    visitor_id: VisitorId,
    state: Mutex<EngineState>,
    /// Per-variant serialization locks; entries are created on first use.
    variant_locks: Mutex<HashMap<VariantId, Arc<tokio::sync::Mutex<()>>>>,
    /// Serializes `initialize` so repeated calls fetch at most once.
    init_lock: tokio::sync::Mutex<()>,
}

impl<B: CartBackend> CartEngine<B> {
    /// Create an engine for a visitor. Call [`Self::initialize`] before
    /// issuing mutations.
    #[must_use]
    pub fn new(backend: B, visitor_id: VisitorId) -> Self {
        Self {
            backend,
            visitor_id,
            state: Mutex::new(EngineState {
                scope: None,
                cart: Cart::empty(""),
                pending: HashMap::new(),
                fetch_generation: 0,
                applied_generation: 0,
            }),
            variant_locks: Mutex::new(HashMap::new()),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn visitor_id(&self) -> &VisitorId {
        &self.visitor_id
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        // A poisoned lock means a panic mid-update; propagating the panic is
        // the only sound option.
        #[allow(clippy::unwrap_used)]
        self.state.lock().unwrap()
    }

    /// Acquire the serialization lock for a variant.
    async fn lock_variant(&self, variant_id: &VariantId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            #[allow(clippy::unwrap_used)]
            let mut locks = self.variant_locks.lock().unwrap();
            Arc::clone(
                locks
                    .entry(variant_id.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Stamp a server fetch at issue time, so its snapshot can be ordered
    /// against other fetches when it resolves.
    fn next_fetch_generation(&self) -> u64 {
        let mut state = self.state();
        state.fetch_generation += 1;
        state.fetch_generation
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Fetch the server cart for the visitor in this store.
    ///
    /// Idempotent: re-calling for the same store after a successful fetch is
    /// a no-op. Calling for a different store discards the previous cart and
    /// re-fetches, since prices and stock are not comparable across tenants.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial fetch fails; a backend 404 ("no cart
    /// yet") is an empty cart, not an error.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn initialize(&self, store_id: &StoreId, currency: &str) -> Result<(), CartError> {
        let _guard = self.init_lock.lock().await;

        {
            let mut state = self.state();
            let same_store = state
                .scope
                .as_ref()
                .is_some_and(|s| s.store_id == *store_id);
            if same_store && state.scope.as_ref().is_some_and(|s| s.initialized) {
                return Ok(());
            }
            if !same_store {
                // Store switch: discard, never merge.
                state.cart = Cart::empty(currency);
                state.pending.clear();
            }
            state.scope = Some(Scope {
                store_id: store_id.clone(),
                currency: currency.to_string(),
                initialized: false,
            });
        }

        let generation = self.next_fetch_generation();
        let fetched = self
            .backend
            .fetch_cart(&self.visitor_id)
            .await
            .map_err(CartError::classify)?;

        let mut state = self.state();
        // The scope may have moved on while we were fetching.
        let still_current = state
            .scope
            .as_ref()
            .is_some_and(|s| s.store_id == *store_id);
        if still_current {
            state.cart = fetched.map_or_else(|| Cart::empty(currency), Cart::from_dto);
            state.applied_generation = state.applied_generation.max(generation);
            if let Some(scope) = state.scope.as_mut() {
                scope.initialized = true;
            }
        }
        Ok(())
    }

    /// Forget all local cart state, keeping the scope.
    ///
    /// Used after a successful checkout handoff, when the backend has
    /// consumed the cart.
    pub fn clear_local(&self) {
        let mut state = self.state();
        let currency = state
            .scope
            .as_ref()
            .map_or_else(String::new, |s| s.currency.clone());
        state.cart = Cart::empty(&currency);
        state.pending.clear();
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create or increment the line for `variant_id`.
    ///
    /// The optimistic quantity is clamped to the effective cap
    /// (`min(available stock if trackable, max per order)`) when known.
    ///
    /// # Errors
    ///
    /// On failure the optimistic change is rolled back and the error is
    /// classified as rejected or retryable.
    #[instrument(skip(self, metadata), fields(variant_id = %variant_id, quantity = quantity))]
    pub async fn add_item(
        &self,
        variant_id: &VariantId,
        quantity: u32,
        metadata: LineMetadata,
    ) -> Result<(), CartError> {
        let _guard = self.lock_variant(variant_id).await;

        let target = {
            let mut state = self.state();
            state.scope_or_err()?;

            let prior = state.prior_of(variant_id);
            let requested = prior
                .as_ref()
                .map_or(quantity, |(_, line)| line.quantity.saturating_add(quantity));

            let cap = state.cart.line(variant_id).map_or_else(
                || {
                    super::types::effective_cap(
                        metadata.inventory_trackable,
                        metadata.available_quantity,
                        metadata.max_quantity_per_order,
                    )
                },
                CartLine::effective_cap,
            );
            // A cap of 0 means nothing is available; dispatch the requested
            // quantity and let validation surface the conflict.
            let target = match cap {
                Some(cap) if cap > 0 => requested.min(cap),
                _ => requested,
            };

            match state.cart.line_mut(variant_id) {
                Some(line) => {
                    line.quantity = target;
                    line.recompute_line_total();
                }
                None => {
                    let line = CartLine::from_metadata(variant_id.clone(), target, metadata);
                    state.cart.lines.push(line);
                }
            }
            state.cart.recompute_totals();
            state.pending.insert(
                variant_id.clone(),
                PendingOperation {
                    kind: MutationKind::Add,
                    prior,
                },
            );
            target
        };

        let result = self
            .backend
            .set_line(&self.visitor_id, variant_id, target)
            .await;
        self.settle(variant_id, result).await
    }

    /// Set the line quantity. `new_quantity == 0` behaves as a removal.
    ///
    /// The requested quantity is applied optimistically as-is; exceeding the
    /// stock or per-order cap is flagged by [`Self::validation`] rather than
    /// silently clamped.
    ///
    /// # Errors
    ///
    /// As [`Self::add_item`].
    #[instrument(skip(self), fields(variant_id = %variant_id, quantity = new_quantity))]
    pub async fn update_quantity(
        &self,
        variant_id: &VariantId,
        new_quantity: u32,
    ) -> Result<(), CartError> {
        if new_quantity == 0 {
            return self.remove_item(variant_id).await;
        }

        let _guard = self.lock_variant(variant_id).await;

        {
            let mut state = self.state();
            state.scope_or_err()?;

            let prior = state.prior_of(variant_id);
            // A missing local line still dispatches, so a line known only to
            // the server converges on the requested value.
            if let Some(line) = state.cart.line_mut(variant_id) {
                line.quantity = new_quantity;
                line.recompute_line_total();
            }
            state.cart.recompute_totals();
            state.pending.insert(
                variant_id.clone(),
                PendingOperation {
                    kind: MutationKind::Update,
                    prior,
                },
            );
        }

        let result = self
            .backend
            .set_line(&self.visitor_id, variant_id, new_quantity)
            .await;
        self.settle(variant_id, result).await
    }

    /// Remove the line for `variant_id`.
    ///
    /// The line disappears optimistically before the network call; a failed
    /// removal restores it at its previous position.
    ///
    /// # Errors
    ///
    /// As [`Self::add_item`].
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn remove_item(&self, variant_id: &VariantId) -> Result<(), CartError> {
        let _guard = self.lock_variant(variant_id).await;

        {
            let mut state = self.state();
            state.scope_or_err()?;

            let Some(prior) = state.prior_of(variant_id) else {
                return Ok(());
            };
            state.cart.lines.retain(|l| l.variant_id != *variant_id);
            state.cart.recompute_totals();
            state.pending.insert(
                variant_id.clone(),
                PendingOperation {
                    kind: MutationKind::Remove,
                    prior: Some(prior),
                },
            );
        }

        let result = self.backend.set_line(&self.visitor_id, variant_id, 0).await;
        self.settle(variant_id, result).await
    }

    /// Remove every line.
    ///
    /// Lines are independent, so removals dispatch in parallel. A partial
    /// failure leaves the successfully removed lines removed and restores
    /// only the ones whose removal failed.
    ///
    /// # Errors
    ///
    /// Returns the first removal error when any line failed to clear.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        let variant_ids: Vec<VariantId> = {
            let state = self.state();
            state.scope_or_err()?;
            state
                .cart
                .lines
                .iter()
                .map(|line| line.variant_id.clone())
                .collect()
        };
        if variant_ids.is_empty() {
            return Ok(());
        }

        let removals = variant_ids
            .iter()
            .map(|variant_id| self.remove_for_clear(variant_id));
        let results = futures::future::join_all(removals).await;

        let first_error = results.into_iter().find_map(Result::err);
        match first_error {
            Some(err) => Err(err),
            None => {
                // One reconcile fetch for the whole batch.
                let generation = self.next_fetch_generation();
                match self.backend.fetch_cart(&self.visitor_id).await {
                    Ok(fetched) => {
                        let mut state = self.state();
                        state.apply_refetch(generation, fetched);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Cart refetch after clear failed; keeping local view");
                    }
                }
                Ok(())
            }
        }
    }

    /// One line's removal within [`Self::clear_cart`]: same optimistic and
    /// rollback semantics as [`Self::remove_item`], minus the per-line
    /// reconcile fetch.
    async fn remove_for_clear(&self, variant_id: &VariantId) -> Result<(), CartError> {
        let _guard = self.lock_variant(variant_id).await;

        {
            let mut state = self.state();
            let Some(prior) = state.prior_of(variant_id) else {
                return Ok(());
            };
            state.cart.lines.retain(|l| l.variant_id != *variant_id);
            state.cart.recompute_totals();
            state.pending.insert(
                variant_id.clone(),
                PendingOperation {
                    kind: MutationKind::Remove,
                    prior: Some(prior),
                },
            );
        }

        let result = self.backend.set_line(&self.visitor_id, variant_id, 0).await;

        let mut state = self.state();
        let op = state.pending.remove(variant_id);
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(op) = op {
                    state.rollback(variant_id, op);
                }
                Err(CartError::classify(e))
            }
        }
    }

    /// Finish a single-variant mutation: reconcile on success, roll back on
    /// failure. The caller still holds the variant lock.
    async fn settle(
        &self,
        variant_id: &VariantId,
        result: Result<(), ApiError>,
    ) -> Result<(), CartError> {
        match result {
            Ok(()) => {
                let generation = self.next_fetch_generation();
                let fetched = self.backend.fetch_cart(&self.visitor_id).await;
                let mut state = self.state();
                state.pending.remove(variant_id);
                match fetched {
                    Ok(server_cart) => state.apply_refetch(generation, server_cart),
                    Err(e) => {
                        // The mutation itself succeeded; keep the optimistic
                        // view until the next reconcile overwrites it.
                        tracing::warn!(
                            variant_id = %variant_id,
                            error = %e,
                            "Cart refetch failed after successful mutation"
                        );
                    }
                }
                Ok(())
            }
            Err(e) => {
                let mut state = self.state();
                if let Some(op) = state.pending.remove(variant_id) {
                    state.rollback(variant_id, op);
                }
                Err(CartError::classify(e))
            }
        }
    }

    // =========================================================================
    // Derived State
    // =========================================================================

    /// True while a mutation for this variant is in flight.
    #[must_use]
    pub fn is_pending(&self, variant_id: &VariantId) -> bool {
        self.state().pending.contains_key(variant_id)
    }

    /// True while any mutation is in flight (cart-level spinner).
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        !self.state().pending.is_empty()
    }

    /// Displayed quantity for a variant (0 when absent), including
    /// optimistic state.
    #[must_use]
    pub fn item_quantity(&self, variant_id: &VariantId) -> u32 {
        self.state()
            .cart
            .line(variant_id)
            .map_or(0, |line| line.quantity)
    }

    /// Clone of the current cart view.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.state().cart.clone()
    }

    /// Stock validation over the current cart view.
    #[must_use]
    pub fn validation(&self) -> CartValidation {
        validation::validate(&self.state().cart)
    }

    /// Whether checkout may proceed: non-empty cart, no stock issues, and
    /// no mutation in flight.
    #[must_use]
    pub fn can_checkout(&self) -> bool {
        let state = self.state();
        let initialized = state.scope.as_ref().is_some_and(|s| s.initialized);
        initialized
            && !state.cart.is_empty()
            && state.pending.is_empty()
            && !validation::validate(&state.cart).has_stock_issues()
    }
}

impl EngineState {
    fn scope_or_err(&self) -> Result<(), CartError> {
        if self.scope.is_some() {
            Ok(())
        } else {
            Err(CartError::NotInitialized)
        }
    }

    /// Snapshot a line and its position for rollback.
    fn prior_of(&self, variant_id: &VariantId) -> Option<(usize, CartLine)> {
        self.cart
            .position(variant_id)
            .and_then(|idx| self.cart.line(variant_id).cloned().map(|line| (idx, line)))
    }

    /// Restore the pre-mutation view of one variant.
    fn rollback(&mut self, variant_id: &VariantId, op: PendingOperation) {
        self.cart.lines.retain(|l| l.variant_id != *variant_id);
        if let Some((index, line)) = op.prior {
            let index = index.min(self.cart.lines.len());
            self.cart.lines.insert(index, line);
        }
        self.cart.recompute_totals();
    }

    /// Apply a refetched server cart, unless a newer refetch already landed.
    ///
    /// Concurrent mutations on different variants each refetch, and the
    /// responses resolve in arbitrary order; a snapshot taken before a later
    /// write would revert that write's committed line if applied last.
    fn apply_refetch(&mut self, generation: u64, fetched: Option<CartDto>) {
        if generation <= self.applied_generation {
            tracing::debug!(generation, "Discarding out-of-date cart refetch");
            return;
        }
        self.applied_generation = generation;
        self.reconcile(fetched);
    }

    /// Replace the local view with server truth, preserving the optimistic
    /// view of any variant whose own mutation is still in flight.
    fn reconcile(&mut self, fetched: Option<CartDto>) {
        let currency = self
            .scope
            .as_ref()
            .map_or_else(String::new, |s| s.currency.clone());
        let mut server_cart = fetched.map_or_else(|| Cart::empty(&currency), Cart::from_dto);

        if self.pending.is_empty() {
            self.cart = server_cart;
            return;
        }

        for variant_id in self.pending.keys() {
            match self.cart.line(variant_id).cloned() {
                Some(local_line) => match server_cart.line_mut(variant_id) {
                    Some(server_line) => {
                        // Keep the optimistic quantity; take server stock and
                        // price truth.
                        server_line.quantity = local_line.quantity;
                        server_line.recompute_line_total();
                    }
                    None => server_cart.lines.push(local_line),
                },
                // Optimistically removed; drop whatever the server returned.
                None => server_cart.lines.retain(|l| l.variant_id != *variant_id),
            }
        }
        // Totals over a partially optimistic view are local estimates; the
        // next settle with an empty pending set takes server totals whole.
        server_cart.recompute_totals();
        self.cart = server_cart;
    }
}
