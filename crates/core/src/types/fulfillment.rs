//! Fulfillment selection shared between cart and checkout.

use serde::{Deserialize, Serialize};

/// How the shopper receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMethod {
    #[default]
    Pickup,
    Delivery,
}

impl FulfillmentMethod {
    /// Stable wire/form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
        }
    }

    /// Parse a form value, defaulting to pickup for unknown input.
    #[must_use]
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "delivery" => Self::Delivery,
            _ => Self::Pickup,
        }
    }
}

impl std::fmt::Display for FulfillmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for method in [FulfillmentMethod::Pickup, FulfillmentMethod::Delivery] {
            assert_eq!(FulfillmentMethod::parse_or_default(method.as_str()), method);
        }
    }

    #[test]
    fn test_unknown_defaults_to_pickup() {
        assert_eq!(
            FulfillmentMethod::parse_or_default("teleport"),
            FulfillmentMethod::Pickup
        );
    }
}
