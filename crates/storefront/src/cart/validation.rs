//! Stock validation over the current cart view.
//!
//! Pure functions of cart state; recomputed whenever the cart changes. The
//! engine never silently truncates a quantity to fix an issue - validation
//! flags the line so the UI can prompt the shopper to reduce or remove.

use souk_core::VariantId;

use super::types::Cart;

/// Why a line is not checkout-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockIssue {
    /// Variant has no stock at all.
    Unavailable,
    /// Quantity exceeds the server-reported available stock.
    ExceedsAvailable,
    /// Quantity exceeds the per-order maximum for the variant.
    ExceedsMaxPerOrder,
}

impl StockIssue {
    /// Shopper-facing description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Unavailable => "no longer available",
            Self::ExceedsAvailable => "quantity exceeds available stock",
            Self::ExceedsMaxPerOrder => "quantity exceeds the per-order limit",
        }
    }
}

/// A flagged line with the numbers the UI needs to offer a remedy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    pub variant_id: VariantId,
    pub issue: StockIssue,
    pub requested: u32,
    /// Units actually available (0 for unavailable lines).
    pub available: u32,
    pub max_per_order: Option<u32>,
}

/// Validation result for the whole cart.
#[derive(Debug, Clone, Default)]
pub struct CartValidation {
    pub items_with_issues: Vec<LineIssue>,
}

impl CartValidation {
    #[must_use]
    pub fn has_stock_issues(&self) -> bool {
        !self.items_with_issues.is_empty()
    }

    /// Issue for a specific line, if any.
    #[must_use]
    pub fn issue_for(&self, variant_id: &VariantId) -> Option<&LineIssue> {
        self.items_with_issues
            .iter()
            .find(|issue| issue.variant_id == *variant_id)
    }
}

/// Validate every line of the cart.
///
/// Lines with `inventory_trackable == false` are exempt from stock checks;
/// the per-order maximum still applies to them. Stock issues take precedence
/// over the per-order maximum so each line carries one actionable issue.
#[must_use]
pub fn validate(cart: &Cart) -> CartValidation {
    let mut items_with_issues = Vec::new();

    for line in &cart.lines {
        let issue = if line.inventory_trackable {
            if !line.in_stock || line.available_quantity == 0 {
                Some(StockIssue::Unavailable)
            } else if line.quantity > line.available_quantity {
                Some(StockIssue::ExceedsAvailable)
            } else {
                max_per_order_issue(line.quantity, line.max_quantity_per_order)
            }
        } else {
            max_per_order_issue(line.quantity, line.max_quantity_per_order)
        };

        if let Some(issue) = issue {
            items_with_issues.push(LineIssue {
                variant_id: line.variant_id.clone(),
                issue,
                requested: line.quantity,
                available: if line.inventory_trackable {
                    line.available_quantity
                } else {
                    line.quantity
                },
                max_per_order: line.max_quantity_per_order,
            });
        }
    }

    CartValidation { items_with_issues }
}

const fn max_per_order_issue(quantity: u32, max_per_order: Option<u32>) -> Option<StockIssue> {
    match max_per_order {
        Some(max) if quantity > max => Some(StockIssue::ExceedsMaxPerOrder),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use souk_core::Money;

    use crate::cart::types::CartLine;

    use super::*;

    fn line(variant_id: &str, quantity: u32) -> CartLine {
        CartLine {
            variant_id: VariantId::new(variant_id),
            quantity,
            unit_price: Money::from_minor_units(100, "USD"),
            line_total: Money::from_minor_units(100 * i64::from(quantity), "USD"),
            product_name: "Product".to_string(),
            variant_name: "Variant".to_string(),
            image_url: None,
            available_quantity: 10,
            in_stock: true,
            inventory_trackable: true,
            max_quantity_per_order: None,
        }
    }

    fn cart_of(lines: Vec<CartLine>) -> Cart {
        let mut cart = Cart::empty("USD");
        cart.lines = lines;
        cart.recompute_totals();
        cart
    }

    #[test]
    fn test_clean_cart_has_no_issues() {
        let validation = validate(&cart_of(vec![line("v1", 2), line("v2", 10)]));
        assert!(!validation.has_stock_issues());
    }

    #[test]
    fn test_stock_downgrade_is_flagged_not_truncated() {
        let mut downgraded = line("v1", 5);
        downgraded.available_quantity = 2;
        let cart = cart_of(vec![downgraded]);

        let validation = validate(&cart);
        assert!(validation.has_stock_issues());

        let issue = validation
            .issue_for(&VariantId::new("v1"))
            .expect("v1 flagged");
        assert_eq!(issue.issue, StockIssue::ExceedsAvailable);
        assert_eq!(issue.available, 2);
        assert_eq!(issue.requested, 5);

        // The cart itself is untouched.
        let kept = cart.line(&VariantId::new("v1")).expect("line kept");
        assert_eq!(kept.quantity, 5);
    }

    #[test]
    fn test_sold_out_line_is_unavailable() {
        let mut gone = line("v1", 1);
        gone.available_quantity = 0;
        gone.in_stock = false;

        let validation = validate(&cart_of(vec![gone]));
        let issue = validation
            .issue_for(&VariantId::new("v1"))
            .expect("flagged");
        assert_eq!(issue.issue, StockIssue::Unavailable);
        assert_eq!(issue.available, 0);
    }

    #[test]
    fn test_untracked_variant_ignores_stock() {
        let mut untracked = line("v2", 1000);
        untracked.inventory_trackable = false;
        untracked.available_quantity = 0;
        untracked.in_stock = false;

        let validation = validate(&cart_of(vec![untracked]));
        assert!(!validation.has_stock_issues());
    }

    #[test]
    fn test_untracked_variant_still_honors_max_per_order() {
        let mut untracked = line("v2", 5);
        untracked.inventory_trackable = false;
        untracked.max_quantity_per_order = Some(3);

        let validation = validate(&cart_of(vec![untracked]));
        let issue = validation
            .issue_for(&VariantId::new("v2"))
            .expect("flagged");
        assert_eq!(issue.issue, StockIssue::ExceedsMaxPerOrder);
    }

    #[test]
    fn test_stock_issue_takes_precedence_over_max_per_order() {
        let mut both = line("v3", 8);
        both.available_quantity = 4;
        both.max_quantity_per_order = Some(3);

        let validation = validate(&cart_of(vec![both]));
        let issue = validation
            .issue_for(&VariantId::new("v3"))
            .expect("flagged");
        assert_eq!(issue.issue, StockIssue::ExceedsAvailable);
    }
}
