//! Cart domain types shared by the engine and its consumers.

use souk_core::{Money, VariantId};

use crate::api::types::{CartDto, CartItemDto, ProductDto, VariantDto};

/// One product-variant line in the cart.
///
/// A cart holds at most one line per variant. A line always has
/// `quantity >= 1`; reaching 0 removes the line instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Unit price snapshot; server-echoed values overwrite it on reconcile.
    pub unit_price: Money,
    /// Server-authoritative when available, locally derived otherwise.
    pub line_total: Money,
    /// Cached display fields, kept so the cart renders even when catalog
    /// lookups fail.
    pub product_name: String,
    pub variant_name: String,
    pub image_url: Option<String>,
    /// Stock posture sourced from the variant.
    pub available_quantity: u32,
    pub in_stock: bool,
    /// When false the variant sells without stock accounting.
    pub inventory_trackable: bool,
    pub max_quantity_per_order: Option<u32>,
}

impl CartLine {
    /// Build a line from a server cart item.
    #[must_use]
    pub fn from_item_dto(dto: CartItemDto) -> Self {
        let variant = dto.variant;
        Self {
            variant_id: variant.id,
            quantity: dto.quantity,
            unit_price: variant.price,
            line_total: dto.line_total,
            product_name: dto.product_name.unwrap_or_else(|| variant.name.clone()),
            variant_name: variant.name,
            image_url: dto.image_url,
            available_quantity: variant.available_quantity,
            in_stock: variant.in_stock,
            inventory_trackable: variant.inventory_trackable,
            max_quantity_per_order: variant.max_quantity_per_order,
        }
    }

    /// Build an optimistic line from add-time metadata.
    #[must_use]
    pub fn from_metadata(variant_id: VariantId, quantity: u32, metadata: LineMetadata) -> Self {
        let line_total = metadata.unit_price.times(quantity);
        Self {
            variant_id,
            quantity,
            unit_price: metadata.unit_price,
            line_total,
            product_name: metadata.product_name,
            variant_name: metadata.variant_name,
            image_url: metadata.image_url,
            available_quantity: metadata.available_quantity,
            in_stock: metadata.in_stock,
            inventory_trackable: metadata.inventory_trackable,
            max_quantity_per_order: metadata.max_quantity_per_order,
        }
    }

    /// Effective quantity cap for this line:
    /// `min(available if trackable, max_per_order if set)`, or `None` when
    /// neither bound applies.
    #[must_use]
    pub fn effective_cap(&self) -> Option<u32> {
        effective_cap(
            self.inventory_trackable,
            self.available_quantity,
            self.max_quantity_per_order,
        )
    }

    /// Re-derive the line total from the unit price (optimistic estimate).
    pub fn recompute_line_total(&mut self) {
        self.line_total = self.unit_price.times(self.quantity);
    }
}

/// Effective quantity cap from a variant's stock posture.
#[must_use]
pub fn effective_cap(
    inventory_trackable: bool,
    available_quantity: u32,
    max_quantity_per_order: Option<u32>,
) -> Option<u32> {
    let stock_cap = inventory_trackable.then_some(available_quantity);
    match (stock_cap, max_quantity_per_order) {
        (Some(stock), Some(max)) => Some(stock.min(max)),
        (Some(cap), None) | (None, Some(cap)) => Some(cap),
        (None, None) => None,
    }
}

/// Display/stock snapshot captured when dispatching an add-to-cart, so the
/// optimistic line renders before the server round-trip completes.
#[derive(Debug, Clone)]
pub struct LineMetadata {
    pub product_name: String,
    pub variant_name: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub available_quantity: u32,
    pub in_stock: bool,
    pub inventory_trackable: bool,
    pub max_quantity_per_order: Option<u32>,
}

impl LineMetadata {
    /// Snapshot from catalog data.
    #[must_use]
    pub fn from_product(product: &ProductDto, variant: &VariantDto) -> Self {
        Self {
            product_name: product.name.clone(),
            variant_name: variant.name.clone(),
            image_url: product.image_url.clone(),
            unit_price: variant.price.clone(),
            available_quantity: variant.available_quantity,
            in_stock: variant.in_stock,
            inventory_trackable: variant.inventory_trackable,
            max_quantity_per_order: variant.max_quantity_per_order,
        }
    }
}

/// The cart aggregate: ordered lines plus derived totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    /// Insertion or server-returned order; `variant_id` unique across lines.
    pub lines: Vec<CartLine>,
    /// Sum of quantities; server value authoritative after reconcile.
    pub item_count: u32,
    /// Sum of line totals; server value authoritative after reconcile.
    pub subtotal: Money,
}

impl Cart {
    /// An empty cart in the given currency.
    #[must_use]
    pub fn empty(currency: &str) -> Self {
        Self {
            lines: Vec::new(),
            item_count: 0,
            subtotal: Money::zero(currency),
        }
    }

    /// Build from a server cart, keeping the server's totals.
    #[must_use]
    pub fn from_dto(dto: CartDto) -> Self {
        Self {
            lines: dto.items.into_iter().map(CartLine::from_item_dto).collect(),
            item_count: dto.item_count,
            subtotal: dto.subtotal,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by variant.
    #[must_use]
    pub fn line(&self, variant_id: &VariantId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.variant_id == *variant_id)
    }

    pub(crate) fn line_mut(&mut self, variant_id: &VariantId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.variant_id == *variant_id)
    }

    pub(crate) fn position(&self, variant_id: &VariantId) -> Option<usize> {
        self.lines.iter().position(|l| l.variant_id == *variant_id)
    }

    /// Re-derive `item_count` and `subtotal` from the current lines.
    ///
    /// Used while optimistic state is in play; server totals replace these
    /// estimates once the round-trip completes.
    pub fn recompute_totals(&mut self) {
        self.item_count = self.lines.iter().map(|l| l.quantity).sum();
        let currency = self.subtotal.currency.clone();
        let mut subtotal = Money::zero(&currency);
        for line in &self.lines {
            subtotal.amount += line.line_total.amount;
        }
        self.subtotal = subtotal;
    }
}

/// Kind of in-flight mutation for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Update,
    Remove,
}

/// Tracks one in-flight mutation for a variant.
///
/// Drives per-line loading indicators, dedupes rapid repeated taps (a second
/// mutation for the same variant queues behind the first), and powers the
/// cart-level syncing indicator. The per-line lifecycle is
/// Idle -> Pending -> Committed | RolledBack; an entry exists only in the
/// Pending stage, and `prior` is what a rollback restores.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub kind: MutationKind,
    /// Pre-mutation line and its position; `None` when the line was created
    /// by this mutation.
    pub prior: Option<(usize, CartLine)>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(variant_id: &str, quantity: u32, unit_minor: i64) -> CartLine {
        CartLine {
            variant_id: VariantId::new(variant_id),
            quantity,
            unit_price: Money::from_minor_units(unit_minor, "USD"),
            line_total: Money::from_minor_units(unit_minor * i64::from(quantity), "USD"),
            product_name: "Product".to_string(),
            variant_name: "Variant".to_string(),
            image_url: None,
            available_quantity: 10,
            in_stock: true,
            inventory_trackable: true,
            max_quantity_per_order: None,
        }
    }

    #[test]
    fn test_effective_cap_precedence() {
        // Trackable stock and a per-order max: the smaller wins.
        assert_eq!(effective_cap(true, 5, Some(3)), Some(3));
        assert_eq!(effective_cap(true, 2, Some(3)), Some(2));
        // Untracked stock: only the per-order max binds.
        assert_eq!(effective_cap(false, 0, Some(4)), Some(4));
        assert_eq!(effective_cap(false, 0, None), None);
        // Trackable without a max: stock binds.
        assert_eq!(effective_cap(true, 7, None), Some(7));
    }

    #[test]
    fn test_recompute_totals() {
        let mut cart = Cart::empty("USD");
        cart.lines.push(line("v1", 2, 500));
        cart.lines.push(line("v2", 1, 250));
        cart.recompute_totals();

        assert_eq!(cart.item_count, 3);
        assert_eq!(cart.subtotal.amount, Decimal::new(1250, 2));
        assert_eq!(cart.subtotal.currency, "USD");
    }

    #[test]
    fn test_line_lookup_by_variant() {
        let mut cart = Cart::empty("USD");
        cart.lines.push(line("v1", 2, 500));

        assert!(cart.line(&VariantId::new("v1")).is_some());
        assert!(cart.line(&VariantId::new("v2")).is_none());
        assert_eq!(cart.position(&VariantId::new("v1")), Some(0));
    }
}
