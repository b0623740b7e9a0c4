use crate::data_models::{PriceStatus, Product, UserProfile};
use crate::store::MAX_TRACKED_PRODUCTS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use rust_decimal::Decimal;

const HEADERS: [&str; 8] = [
    "ID",
    "Site",
    "Title",
    "Current",
    "Target",
    "Status",
    "Last checked",
    "URL",
];

fn price(currency: &str, value: Decimal) -> String {
    format!("{currency}{:.2}", value.round_dp(2))
}

pub fn status_text(product: &Product, currency: &str) -> String {
    match product.price_status() {
        PriceStatus::Unknown => "awaiting first price check".to_string(),
        PriceStatus::AtOrBelowTarget { difference } => {
            format!("{} below target!", price(currency, difference))
        }
        PriceStatus::AboveTarget { difference } => {
            format!("{} above target", price(currency, difference))
        }
    }
}

fn product_row(product: &Product, currency: &str) -> Vec<String> {
    vec![
        product.id.to_string(),
        product.site_source.to_string(),
        product.display_title().to_string(),
        product
            .current_price
            .map(|p| price(currency, p))
            .unwrap_or_else(|| "n/a".to_string()),
        price(currency, product.target_price),
        status_text(product, currency),
        product
            .last_checked_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "Just now".to_string()),
        product.url.clone(),
    ]
}

pub fn products_table(products: &[Product], currency: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(HEADERS.to_vec());
    for product in products {
        table.add_row(product_row(product, currency));
    }
    table
}

/// Text dashboard for one user's tracked products.
pub fn dashboard(user: &UserProfile, products: &[Product], currency: &str) -> String {
    let mut out = format!(
        "PriceTracker | {}\nTracked products: {} / {}\n",
        user.email,
        products.len(),
        MAX_TRACKED_PRODUCTS
    );
    if products.len() >= MAX_TRACKED_PRODUCTS {
        out.push_str(&format!(
            "You've reached the maximum limit of {MAX_TRACKED_PRODUCTS} products\n"
        ));
    }
    if products.is_empty() {
        out.push_str(
            "No products yet. Start tracking prices with `price-tracker add <URL> <TARGET_PRICE>`.\n",
        );
        return out;
    }
    out.push_str(&products_table(products, currency).to_string());
    out.push('\n');
    out
}
