//! The `extract_rows` tool definition.
//!
//! The canonical extraction contract: the oracle must answer every batch by
//! calling `extract_rows` with a `products` array whose objects carry the
//! full canonical field set.

use serde_json::json;

use crate::client::ToolDefinition;

/// Wire tokens of the deal-type enum.
pub const DEAL_TYPES: [&str; 9] = [
    "PERCENT_OFF",
    "AMOUNT_OFF",
    "BUY_X_GET_Y_AT_Z_PER_OFF",
    "BUY_X_GET_Y_AT_Z_AMO_OFF",
    "BUY_X_GET_Y_FREE",
    "BUY_X_GET_Y_AMOUNT_OFF",
    "PRICE_PER_AMOUNT",
    "SALE_PRICE",
    "OTHER",
];

/// Builds the forced tool definition for product extraction.
pub fn extract_rows_tool() -> ToolDefinition {
    ToolDefinition {
        name: "extract_rows".to_string(),
        description: "Provides the list of products that were extracted from the messages"
            .to_string(),
        parameters: json!({
            "type": "object",
            "required": ["products"],
            "properties": {
                "products": {
                    "type": "array",
                    "description": "The list of products that were extracted from the messages",
                    "items": {
                        "type": "object",
                        "required": [
                            "brand_name",
                            "product_name",
                            "product_variety",
                            "description",
                            "required_purchase_quantity",
                            "required_purchase_amount",
                            "price",
                            "sale_price",
                            "sale_amount_off",
                            "sale_percent_off",
                            "quantity_at_sale_price",
                            "quantity_at_amount_off",
                            "quantity_get_free",
                            "quantity_percent_off",
                            "deal_type",
                            "valid_from",
                            "valid_to",
                            "requires_store_card"
                        ],
                        "properties": {
                            "brand_name": {
                                "type": "string",
                                "description": "The brand name of the product. Example: `Coca-Cola`, `Kraft`. DO NOT include multiple brands such as `Coca-Cola | Pepsi`"
                            },
                            "product_name": {
                                "type": "string",
                                "description": "The name of the product - can include modifiers like `organic`, `gluten-free`, etc."
                            },
                            "product_variety": {
                                "type": "string",
                                "description": "The size/variety of the product - a weight, volume, variety, etc."
                            },
                            "description": {
                                "type": "string",
                                "description": "The description of the sale or coupon"
                            },
                            "required_purchase_quantity": {
                                "type": "integer",
                                "description": "The minimum number of items that must be purchased to get the deal - 2 for $5 would be 2"
                            },
                            "required_purchase_amount": {
                                "type": "number",
                                "description": "The minimum amount of money that must be spent to get the deal - $5 off $20 would be 20"
                            },
                            "price": {
                                "type": "number",
                                "description": "The price of the product, if it is on sale or a price is given"
                            },
                            "sale_price": {
                                "type": "number",
                                "description": "The sale price of the product, if it is a SALE_PRICE deal"
                            },
                            "sale_amount_off": {
                                "type": "number",
                                "description": "The amount off of the product, if it is an AMOUNT_OFF deal"
                            },
                            "sale_percent_off": {
                                "type": "integer",
                                "description": "The percent off of the product, if it is a PERCENT_OFF deal"
                            },
                            "quantity_at_sale_price": {
                                "type": "integer",
                                "description": "The number of products you get at a sale price, if it is a BUY_X_GET_Y_AT_Z_AMO_OFF deal"
                            },
                            "quantity_at_amount_off": {
                                "type": "integer",
                                "description": "The number of products you get at an amount off, if it is a BUY_X_GET_Y_AT_Z_AMO_OFF deal"
                            },
                            "quantity_get_free": {
                                "type": "integer",
                                "description": "The number of products you get for free, if it is a BUY_X_GET_Y_FREE deal"
                            },
                            "quantity_percent_off": {
                                "type": "integer",
                                "description": "The number of products you get at a percent off, if it is a BUY_X_GET_Y_AT_Z_PER_OFF deal"
                            },
                            "deal_type": {
                                "type": "string",
                                "enum": DEAL_TYPES,
                                "description": "The type of deal"
                            },
                            "valid_from": {
                                "type": "string",
                                "description": "The date the deal is valid from, format `YYYY-MM-DD`"
                            },
                            "valid_to": {
                                "type": "string",
                                "description": "The date the deal is valid to, format `YYYY-MM-DD`"
                            },
                            "requires_store_card": {
                                "type": "boolean",
                                "description": "Whether the deal requires a store loyalty card; `false` when not required"
                            }
                        }
                    }
                }
            }
        }),
    }
}
