//! Shopify admin REST backend.

use super::{CommerceClient, Customer, CustomerProfile, DiscountRequest};
use crate::config::ShopifyConfig;
use crate::errors::CommerceError;
use async_trait::async_trait;
use common::model::fulfillment::StoreProduct;
use log::{debug, info};
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const DESCRIPTION_LIMIT: usize = 100;

pub struct ShopifyClient {
    http: Client,
    base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct CustomerRecord {
    id: u64,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct CustomerList {
    customers: Vec<CustomerRecord>,
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: CustomerRecord,
}

#[derive(Deserialize)]
struct PriceRuleRecord {
    id: u64,
}

#[derive(Deserialize)]
struct PriceRuleEnvelope {
    price_rule: PriceRuleRecord,
}

#[derive(Deserialize)]
struct DiscountCodeRecord {
    code: String,
}

#[derive(Deserialize)]
struct DiscountCodeEnvelope {
    discount_code: DiscountCodeRecord,
}

#[derive(Deserialize)]
struct ProductList {
    products: Vec<ProductRecord>,
}

#[derive(Deserialize)]
struct ProductRecord {
    title: String,
    #[serde(default)]
    body_html: Option<String>,
    #[serde(default)]
    handle: String,
    #[serde(default)]
    image: Option<ImageRecord>,
    #[serde(default)]
    variants: Vec<VariantRecord>,
}

#[derive(Deserialize)]
struct ImageRecord {
    src: String,
}

#[derive(Deserialize)]
struct VariantRecord {
    id: u64,
    #[serde(default)]
    title: String,
    price: String,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig, timeout: Duration) -> Result<Self, CommerceError> {
        let base_url = format!(
            "https://{}.myshopify.com/admin/api/{}",
            config.shop, config.api_version
        );
        Self::with_base_url(base_url, &config.access_token, timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self, CommerceError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pledge-fulfillment/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CommerceError> {
        let response = request
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Maps a Shopify response to `T`, treating non-2xx statuses and `errors`
/// bodies as rejections.
fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, CommerceError> {
    if !(200..300).contains(&status) {
        return Err(CommerceError::Rejected {
            status,
            body: body.to_string(),
        });
    }
    let value: Value = serde_json::from_str(body).map_err(|e| CommerceError::Decode(e.to_string()))?;
    if let Some(errors) = value.get("errors") {
        return Err(CommerceError::Rejected {
            status,
            body: errors.to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| CommerceError::Decode(e.to_string()))
}

fn customer_body(profile: &CustomerProfile) -> Value {
    let address = &profile.address;
    json!({
        "customer": {
            "email": profile.email,
            "first_name": profile.first_name,
            "last_name": profile.last_name,
            "tags": profile.tags.join(","),
            "note": profile.note,
            "verified_email": true,
            "addresses": [{
                "first_name": profile.first_name,
                "last_name": profile.last_name,
                "name": address.name,
                "address1": address.address1,
                "address2": address.address2,
                "city": address.city,
                "province": address.province,
                "zip": address.zip,
                "country": address.country,
                "country_code": address.country_code,
                "phone": address.phone,
                "default": true
            }]
        }
    })
}

fn price_rule_body(request: &DiscountRequest) -> Value {
    json!({
        "price_rule": {
            "title": request.title,
            "target_type": "line_item",
            "target_selection": "all",
            "allocation_method": "across",
            "value_type": "fixed_amount",
            "value": format!("-{:.2}", request.amount),
            "customer_selection": "prerequisite",
            "prerequisite_customer_ids": [request.customer_id],
            "usage_limit": 1,
            "once_per_customer": true,
            "starts_at": request.starts_at.to_rfc3339(),
            "ends_at": request.ends_at.to_rfc3339()
        }
    })
}

fn plain_description(body_html: Option<&str>) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"));
    let text = tags.replace_all(body_html.unwrap_or_default(), "");
    let text = text.trim();
    if text.is_empty() {
        return "No description available".to_string();
    }
    if text.chars().count() > DESCRIPTION_LIMIT {
        let cut: String = text.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn flatten_products(list: ProductList) -> Vec<StoreProduct> {
    let mut products = Vec::new();
    for product in list.products {
        let description = plain_description(product.body_html.as_deref());
        let image = product.image.map(|img| img.src);
        for variant in product.variants {
            let name = if variant.title.is_empty() || variant.title == "Default Title" {
                product.title.clone()
            } else {
                format!("{} - {}", product.title, variant.title)
            };
            products.push(StoreProduct {
                name,
                price: Decimal::from_str(&variant.price).unwrap_or_default(),
                variant_id: variant.id.to_string(),
                description: description.clone(),
                handle: product.handle.clone(),
                image: image.clone(),
            });
        }
    }
    products
}

#[async_trait]
impl CommerceClient for ShopifyClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, CommerceError> {
        let request = self
            .http
            .get(self.url("customers/search.json"))
            .query(&[("query", format!("email:{}", email))]);
        let list: CustomerList = self.send(request).await?;
        let found = list.customers.into_iter().find(|c| {
            c.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        });
        debug!("Customer search for {} matched: {}", email, found.is_some());
        Ok(found.map(|c| Customer {
            id: c.id,
            email: c.email.unwrap_or_else(|| email.to_string()),
        }))
    }

    async fn create_customer(&self, profile: &CustomerProfile) -> Result<Customer, CommerceError> {
        let request = self
            .http
            .post(self.url("customers.json"))
            .json(&customer_body(profile));
        let envelope: CustomerEnvelope = self.send(request).await?;
        info!("Created customer {} for {}", envelope.customer.id, profile.email);
        Ok(Customer {
            id: envelope.customer.id,
            email: envelope.customer.email.unwrap_or_else(|| profile.email.clone()),
        })
    }

    async fn create_one_time_discount(&self, request: &DiscountRequest) -> Result<String, CommerceError> {
        let rule: PriceRuleEnvelope = self
            .send(
                self.http
                    .post(self.url("price_rules.json"))
                    .json(&price_rule_body(request)),
            )
            .await?;
        let path = format!("price_rules/{}/discount_codes.json", rule.price_rule.id);
        let code: DiscountCodeEnvelope = self
            .send(
                self.http
                    .post(self.url(&path))
                    .json(&json!({ "discount_code": { "code": request.code } })),
            )
            .await?;
        Ok(code.discount_code.code)
    }

    async fn list_products(&self) -> Result<Vec<StoreProduct>, CommerceError> {
        let request = self
            .http
            .get(self.url("products.json"))
            .query(&[("limit", "50")]);
        let list: ProductList = self.send(request).await?;
        Ok(flatten_products(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::model::pledge::ShippingAddress;

    #[test]
    fn test_price_rule_body() {
        let request = DiscountRequest {
            code: "KS17_000000042".to_string(),
            title: "Kickstarter Pledge - Ada Lovelace".to_string(),
            customer_id: 901,
            amount: Decimal::new(1395, 1),
            starts_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        };

        let body = price_rule_body(&request);
        let rule = &body["price_rule"];
        assert_eq!(rule["value"], "-139.50");
        assert_eq!(rule["value_type"], "fixed_amount");
        assert_eq!(rule["usage_limit"], 1);
        assert_eq!(rule["prerequisite_customer_ids"][0], 901);
        assert_eq!(rule["starts_at"], "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_customer_body_joins_tags() {
        let profile = CustomerProfile {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            tags: vec!["kickstarter-backer".to_string(), "early-bird".to_string()],
            note: "Kickstarter Backer - Order #17 - Early Bird".to_string(),
            address: ShippingAddress {
                city: "London".to_string(),
                ..Default::default()
            },
        };

        let body = customer_body(&profile);
        assert_eq!(body["customer"]["tags"], "kickstarter-backer,early-bird");
        assert_eq!(body["customer"]["addresses"][0]["city"], "London");
    }

    #[test]
    fn test_decode_response_rejections() {
        let err = decode_response::<CustomerEnvelope>(422, r#"{"errors":{"email":["has already been taken"]}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, CommerceError::Rejected { status: 422, .. }));

        let err = decode_response::<CustomerEnvelope>(200, r#"{"errors":"Not Found"}"#)
            .err()
            .unwrap();
        assert!(matches!(err, CommerceError::Rejected { status: 200, .. }));

        let err = decode_response::<CustomerEnvelope>(200, "<html>").err().unwrap();
        assert!(matches!(err, CommerceError::Decode(_)));

        let ok: CustomerEnvelope =
            decode_response(201, r#"{"customer":{"id":55,"email":"ada@example.com"}}"#).unwrap();
        assert_eq!(ok.customer.id, 55);
    }

    #[test]
    fn test_flatten_products() {
        let list: ProductList = serde_json::from_str(
            r#"{"products":[{
                "title":"Ambient One","handle":"ambient-one",
                "body_html":"<p>Air quality <b>monitor</b></p>",
                "image":{"src":"https://cdn.example.com/one.png"},
                "variants":[
                    {"id":52337643290957,"title":"Black","price":"139.00"},
                    {"id":52337643323725,"title":"Default Title","price":"139.00"}
                ]}]}"#,
        )
        .unwrap();

        let products = flatten_products(list);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Ambient One - Black");
        assert_eq!(products[1].name, "Ambient One");
        assert_eq!(products[0].description, "Air quality monitor");
        assert_eq!(products[0].price, Decimal::new(13900, 2));
        assert_eq!(products[0].variant_id, "52337643290957");
    }

    #[test]
    fn test_plain_description_truncates() {
        let long = "x".repeat(150);
        let text = plain_description(Some(&long));
        assert_eq!(text.len(), DESCRIPTION_LIMIT + 3);
        assert_eq!(plain_description(None), "No description available");
    }
}
