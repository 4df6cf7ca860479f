//! # Logical Document Paths
//!
//! Typed addresses for documents in the hierarchy. Paths are plain data:
//! ordered, hashable, cheap to clone, and render to the canonical string
//! form used in logs and errors.
//!
//! The `Ord` derive matters beyond map keys: the sale processor acquires
//! per-item locks in ascending path order, which is what rules out
//! deadlock between concurrent sales touching the same items.

use std::fmt;

// =============================================================================
// Item Path
// =============================================================================

/// Address of one item document: `Shops/{shop}/categories/{category}/items/{item}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath {
    pub shop_id: String,
    pub category_id: String,
    pub item_id: String,
}

impl ItemPath {
    pub fn new(
        shop_id: impl Into<String>,
        category_id: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        ItemPath {
            shop_id: shop_id.into(),
            category_id: category_id.into(),
            item_id: item_id.into(),
        }
    }

    /// Address of a selling unit under this item.
    pub fn sell_unit(&self, sell_unit_id: impl Into<String>) -> SellUnitPath {
        SellUnitPath {
            item: self.clone(),
            sell_unit_id: sell_unit_id.into(),
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shops/{}/categories/{}/items/{}",
            self.shop_id, self.category_id, self.item_id
        )
    }
}

// =============================================================================
// Sell Unit Path
// =============================================================================

/// Address of one selling-unit document under an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SellUnitPath {
    pub item: ItemPath,
    pub sell_unit_id: String,
}

impl fmt::Display for SellUnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/sellUnits/{}", self.item, self.sell_unit_id)
    }
}

// =============================================================================
// Receipt Path
// =============================================================================

/// Address of one receipt document: `Shops/{shop}/receipts/{receipt}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiptPath {
    pub shop_id: String,
    pub receipt_id: String,
}

impl ReceiptPath {
    pub fn new(shop_id: impl Into<String>, receipt_id: impl Into<String>) -> Self {
        ReceiptPath {
            shop_id: shop_id.into(),
            receipt_id: receipt_id.into(),
        }
    }
}

impl fmt::Display for ReceiptPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shops/{}/receipts/{}", self.shop_id, self.receipt_id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_path_renders_canonical_form() {
        let path = ItemPath::new("shop1", "cat2", "item3");
        assert_eq!(path.to_string(), "Shops/shop1/categories/cat2/items/item3");
    }

    #[test]
    fn sell_unit_path_nests_under_item() {
        let path = ItemPath::new("s", "c", "i").sell_unit("u1");
        assert_eq!(path.to_string(), "Shops/s/categories/c/items/i/sellUnits/u1");
    }

    #[test]
    fn receipt_path_renders_canonical_form() {
        let path = ReceiptPath::new("shop1", "RCPT_1700000000_shop");
        assert_eq!(path.to_string(), "Shops/shop1/receipts/RCPT_1700000000_shop");
    }

    #[test]
    fn paths_order_by_shop_then_category_then_item() {
        let mut paths = vec![
            ItemPath::new("s2", "c1", "i1"),
            ItemPath::new("s1", "c2", "i1"),
            ItemPath::new("s1", "c1", "i2"),
            ItemPath::new("s1", "c1", "i1"),
        ];
        paths.sort();

        let rendered: Vec<String> = paths.iter().map(ItemPath::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "Shops/s1/categories/c1/items/i1",
                "Shops/s1/categories/c1/items/i2",
                "Shops/s1/categories/c2/items/i1",
                "Shops/s2/categories/c1/items/i1",
            ]
        );
    }
}
