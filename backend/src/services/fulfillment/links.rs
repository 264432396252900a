//! Discount codes, backer tokens and storefront links.

use crate::errors::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use common::model::item::CanonicalPledgedItem;

const CODE_SUFFIX_MODULUS: i64 = 1_000_000_000;

/// `KS{identity}_{suffix}`, the suffix being the last nine digits of `now` in
/// UNIX microseconds.
pub fn discount_code(identity: &str, now: DateTime<Utc>) -> String {
    let suffix = now.timestamp_micros().rem_euclid(CODE_SUFFIX_MODULUS);
    format!("KS{}_{:09}", identity, suffix)
}

pub fn encode_token(backer_id: &str, discount_code: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", backer_id, discount_code))
}

/// Returns `(backer_id, discount_code)`.
pub fn decode_token(token: &str) -> Result<(String, String), TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| TokenError::Encoding)?;
    let text = String::from_utf8(bytes).map_err(|_| TokenError::Encoding)?;
    match text.split_once(':') {
        Some((backer_id, code)) if !backer_id.is_empty() && !code.is_empty() => {
            Ok((backer_id.to_string(), code.to_string()))
        }
        _ => Err(TokenError::Malformed),
    }
}

/// Served by this service at `GET /fulfillment/{token}`.
pub fn landing_page_url(base_url: &str, token: &str) -> String {
    format!("{}/fulfillment/{}", base_url.trim_end_matches('/'), token)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartLinks {
    pub cart_link: String,
    pub checkout_link: String,
}

impl CartLinks {
    /// Only items with a catalog variant end up in the cart. Without any, the
    /// checkout link just redeems the discount.
    pub fn build(shop_domain: &str, items: &[CanonicalPledgedItem], discount_code: &str) -> Self {
        let spec = items
            .iter()
            .filter_map(|item| {
                item.variant_id
                    .as_ref()
                    .map(|variant| format!("{}:{}", variant, item.quantity))
            })
            .collect::<Vec<_>>()
            .join(",");
        let code = urlencoding::encode(discount_code);

        if spec.is_empty() {
            Self {
                cart_link: format!("https://{}/cart", shop_domain),
                checkout_link: format!("https://{}/discount/{}", shop_domain, code),
            }
        } else {
            Self {
                cart_link: format!("https://{}/cart/{}", shop_domain, spec),
                checkout_link: format!("https://{}/cart/{}?discount={}", shop_domain, spec, code),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::model::item::AllocationReason;

    fn item(variant_id: Option<&str>, quantity: u32) -> CanonicalPledgedItem {
        CanonicalPledgedItem {
            display_name: "Item".to_string(),
            variant_id: variant_id.map(str::to_string),
            quantity,
            allocation_reason: if variant_id.is_some() {
                AllocationReason::Standalone
            } else {
                AllocationReason::Unmapped
            },
            source_key: "key".to_string(),
            paired_key: None,
            unit_price: None,
        }
    }

    #[test]
    fn test_discount_code_suffix() {
        let now = Utc.timestamp_micros(1_767_225_600_000_042).unwrap();
        assert_eq!(discount_code("17", now), "KS17_600000042");

        let early = Utc.timestamp_micros(42).unwrap();
        assert_eq!(discount_code("5001", early), "KS5001_000000042");
    }

    #[test]
    fn test_token_round_trip_keeps_separators_in_code() {
        let token = encode_token("5001", "KS_17:x_000000042");
        assert!(!token.contains('='));
        assert_eq!(
            decode_token(&token).unwrap(),
            ("5001".to_string(), "KS_17:x_000000042".to_string())
        );
    }

    #[test]
    fn test_decode_token_errors() {
        assert_eq!(decode_token("***"), Err(TokenError::Encoding));
        let no_separator = URL_SAFE_NO_PAD.encode("5001");
        assert_eq!(decode_token(&no_separator), Err(TokenError::Malformed));
        let empty_code = URL_SAFE_NO_PAD.encode("5001:");
        assert_eq!(decode_token(&empty_code), Err(TokenError::Malformed));
    }

    #[test]
    fn test_landing_page_url() {
        assert_eq!(
            landing_page_url("http://localhost:3000/", "abc"),
            "http://localhost:3000/fulfillment/abc"
        );
    }

    #[test]
    fn test_cart_links_with_items() {
        let links = CartLinks::build(
            "ambient.example",
            &[item(Some("111"), 2), item(None, 1), item(Some("222"), 1)],
            "KS17 A",
        );
        assert_eq!(links.cart_link, "https://ambient.example/cart/111:2,222:1");
        assert_eq!(
            links.checkout_link,
            "https://ambient.example/cart/111:2,222:1?discount=KS17%20A"
        );
    }

    #[test]
    fn test_cart_links_discount_only() {
        let links = CartLinks::build("ambient.example", &[item(None, 1)], "KS17_000000001");
        assert_eq!(links.cart_link, "https://ambient.example/cart");
        assert_eq!(
            links.checkout_link,
            "https://ambient.example/discount/KS17_000000001"
        );
    }
}
