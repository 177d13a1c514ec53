/// Identifier of the singleton cash position row.
pub const CASH_POSITION_ID: &str = "$CASH";

/// Asset type of the cash position.
pub const ASSET_TYPE_CASH: &str = "CASH";

/// Asset type of per-symbol stock positions.
pub const ASSET_TYPE_STOCK: &str = "STOCK";

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;
