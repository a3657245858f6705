//! Canonical deal schema.
//!
//! Every source, no matter how its raw records are shaped, is normalized
//! into [`DealRecord`]. The column set and order are the one bit-exact
//! contract this crate owns; downstream consumers (workbooks, reports)
//! depend on it.
//!
//! Oracle output is noisy: numbers arrive as strings, unknown fields carry
//! an `N/A` sentinel, dates are occasionally malformed. Deserialization is
//! deliberately lenient - a bad value degrades to "not available" instead
//! of failing the whole product row.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::RawProduct;

/// Presentation sentinel for absent values.
pub const NOT_AVAILABLE: &str = "N/A";

/// Multi-brand delimiter sometimes emitted by the oracle ("A | B").
pub const BRAND_DELIMITER: char = '|';

/// Canonical column order.
pub const CANONICAL_COLUMNS: [&str; 18] = [
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
    "requires_store_card",
];

/// Deal classification, as emitted by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealType {
    PercentOff,
    AmountOff,
    BuyXGetYAtZPerOff,
    BuyXGetYAtZAmoOff,
    BuyXGetYFree,
    BuyXGetYAmountOff,
    PricePerAmount,
    SalePrice,
    Coupon,
    ManufacturerCoupon,
    Other,
}

impl DealType {
    /// Maps a wire token to its variant; unknown tokens land on `Other`.
    pub fn from_wire(token: &str) -> Self {
        match token {
            "PERCENT_OFF" => Self::PercentOff,
            "AMOUNT_OFF" => Self::AmountOff,
            "BUY_X_GET_Y_AT_Z_PER_OFF" => Self::BuyXGetYAtZPerOff,
            "BUY_X_GET_Y_AT_Z_AMO_OFF" => Self::BuyXGetYAtZAmoOff,
            "BUY_X_GET_Y_FREE" => Self::BuyXGetYFree,
            "BUY_X_GET_Y_AMOUNT_OFF" => Self::BuyXGetYAmountOff,
            "PRICE_PER_AMOUNT" => Self::PricePerAmount,
            "SALE_PRICE" => Self::SalePrice,
            "COUPON" => Self::Coupon,
            "MANUFACTURER_COUPON" => Self::ManufacturerCoupon,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PercentOff => "PERCENT_OFF",
            Self::AmountOff => "AMOUNT_OFF",
            Self::BuyXGetYAtZPerOff => "BUY_X_GET_Y_AT_Z_PER_OFF",
            Self::BuyXGetYAtZAmoOff => "BUY_X_GET_Y_AT_Z_AMO_OFF",
            Self::BuyXGetYFree => "BUY_X_GET_Y_FREE",
            Self::BuyXGetYAmountOff => "BUY_X_GET_Y_AMOUNT_OFF",
            Self::PricePerAmount => "PRICE_PER_AMOUNT",
            Self::SalePrice => "SALE_PRICE",
            Self::Coupon => "COUPON",
            Self::ManufacturerCoupon => "MANUFACTURER_COUPON",
            Self::Other => "OTHER",
        }
    }

    /// Coupon-provider placeholders carry no extraction signal of their own.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Coupon | Self::ManufacturerCoupon)
    }
}

impl std::fmt::Display for DealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Text columns usable by the fuzzy matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColumn {
    BrandName,
    ProductName,
    ProductVariety,
    Description,
}

impl TextColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandName => "brand_name",
            Self::ProductName => "product_name",
            Self::ProductVariety => "product_variety",
            Self::Description => "description",
        }
    }
}

impl std::fmt::Display for TextColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One canonical deal record.
///
/// Invariant: every canonical field is present; `None` is the "not
/// available" sentinel. Records are written once to the destination store
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DealRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub brand_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_variety: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub required_purchase_quantity: Option<u32>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub required_purchase_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub sale_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_money")]
    pub sale_amount_off: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sale_percent_off: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity_at_sale_price: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity_at_amount_off: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity_get_free: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity_percent_off: Option<u32>,
    #[serde(default, deserialize_with = "lenient_deal_type")]
    pub deal_type: Option<DealType>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub valid_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub valid_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub requires_store_card: Option<bool>,
}

impl DealRecord {
    /// Canonicalizes one oracle product row.
    pub fn from_product(product: RawProduct) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(product))
    }

    /// True when the oracle returned no real signal: every field absent,
    /// the deal type at most a coupon-provider placeholder. An explicit
    /// `requires_store_card: false` counts as signal.
    pub fn is_placeholder_only(&self) -> bool {
        self.brand_name.is_none()
            && self.product_name.is_none()
            && self.product_variety.is_none()
            && self.description.is_none()
            && self.required_purchase_quantity.is_none()
            && self.required_purchase_amount.is_none()
            && self.price.is_none()
            && self.sale_price.is_none()
            && self.sale_amount_off.is_none()
            && self.sale_percent_off.is_none()
            && self.quantity_at_sale_price.is_none()
            && self.quantity_at_amount_off.is_none()
            && self.quantity_get_free.is_none()
            && self.quantity_percent_off.is_none()
            && self.valid_from.is_none()
            && self.valid_to.is_none()
            && self.requires_store_card.is_none()
            && self.deal_type.map_or(true, |dt| dt.is_placeholder())
    }

    /// Splits a multi-brand record ("A | B") into one record per brand.
    /// Single-brand records come back unchanged.
    pub fn fan_out_brands(self) -> Vec<DealRecord> {
        let Some(brand) = self.brand_name.as_deref() else {
            return vec![self];
        };
        if !brand.contains(BRAND_DELIMITER) {
            return vec![self];
        }
        let brands: Vec<String> = brand
            .split(BRAND_DELIMITER)
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if brands.len() <= 1 {
            return vec![self];
        }
        brands
            .into_iter()
            .map(|brand_name| DealRecord {
                brand_name: Some(brand_name),
                ..self.clone()
            })
            .collect()
    }

    /// Text value of a matchable column, if available.
    pub fn text_column(&self, column: TextColumn) -> Option<&str> {
        match column {
            TextColumn::BrandName => self.brand_name.as_deref(),
            TextColumn::ProductName => self.product_name.as_deref(),
            TextColumn::ProductVariety => self.product_variety.as_deref(),
            TextColumn::Description => self.description.as_deref(),
        }
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(text_from_value))
}

fn text_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_u64()
            .map(|u| u as u32)
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u32)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
                None
            } else {
                trimmed
                    .parse::<u32>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.round() as u32))
            }
        }
        _ => None,
    }))
}

fn lenient_money<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    }))
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

fn lenient_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }))
}

fn lenient_deal_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DealType>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
                None
            } else {
                Some(DealType::from_wire(trimmed))
            }
        }
        _ => None,
    }))
}
