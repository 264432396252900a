//! Backer landing-page lookup by token.
//!
//! The token only carries `backer_id` and the discount code. A lookup
//! succeeds when the backer is in the current directory and the ledger holds a
//! success result issued with that same code.

use crate::errors::LookupError;
use crate::services::fulfillment::directory::BackerRecord;
use crate::services::fulfillment::links::decode_token;
use crate::services::fulfillment::state::FulfillmentState;
use actix_web::{web, HttpResponse, Responder};
use common::model::fulfillment::{BackerView, FulfillmentSuccess, PricedItem};

/// `GET /api/customer/{token}` and `GET /fulfillment/{token}`
pub(crate) async fn process(state: web::Data<FulfillmentState>, path: web::Path<String>) -> impl Responder {
    match lookup(&state, &path.into_inner()).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e @ LookupError::Token(_)) => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e @ LookupError::NotFound) => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

pub async fn lookup(state: &FulfillmentState, token: &str) -> Result<BackerView, LookupError> {
    let (backer_id, code) = decode_token(token)?;
    let directory = state.directory.read().await.clone();
    let ledger = state.ledger.read().await;

    let record = directory.get(&backer_id).ok_or(LookupError::NotFound)?;
    let success = ledger
        .find_success(&backer_id, &code)
        .and_then(|result| result.success())
        .ok_or(LookupError::NotFound)?;
    Ok(backer_view(record, success, &state.config.pipeline.shop_domain))
}

pub fn backer_view(record: &BackerRecord, success: &FulfillmentSuccess, shop_domain: &str) -> BackerView {
    let row = &record.row;
    BackerView {
        name: row.name.clone(),
        pledge_amount: row.pledge_amount,
        reward_title: row.reward_title.clone(),
        pledged_items: record
            .items
            .iter()
            .map(|item| PricedItem {
                line_total: item.line_total(),
                item: item.clone(),
            })
            .collect(),
        discount_code: success.discount_code.clone(),
        landing_page_url: success.landing_page_url.clone(),
        cart_link: success.cart_link.clone(),
        checkout_link: success.checkout_link.clone(),
        items_found: success.items_found,
        items_total: success.items_total,
        shop_domain: shop_domain.to_string(),
        custom_engraving: row.custom_engraving.clone(),
        order_id: row.order_id.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::TokenError;
    use crate::services::fulfillment::directory::BackerDirectory;
    use crate::services::fulfillment::links::encode_token;
    use crate::services::fulfillment::state::tests::test_state;
    use common::model::pledge::{RawCounts, RawPledgeRow, ShippingAddress};
    use rust_decimal::Decimal;

    fn row() -> RawPledgeRow {
        RawPledgeRow {
            backer_id: "5001".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
            pledge_amount: Decimal::new(27800, 2),
            reward_title: "Early Bird".to_string(),
            order_id: "17".to_string(),
            shipping_address: ShippingAddress::default(),
            custom_engraving: Some("ADA".to_string()),
            fulfillment_status: None,
            pledged_at: None,
            raw_counts: [("ambientone".to_string(), 2), ("usbccable".to_string(), 1)]
                .into_iter()
                .collect::<RawCounts>(),
        }
    }

    pub(crate) async fn fulfilled_state(dir: &std::path::Path) -> (FulfillmentState, String) {
        let state = test_state(dir);
        let directory = state
            .begin_ledger(BackerDirectory::build(vec![row()], &state.catalog))
            .await;
        let result = state.pipeline().process_backer(&directory.records()[0]).await;
        let code = result.success().unwrap().discount_code.clone();
        state.ledger.write().await.append(result);
        (state, code)
    }

    #[tokio::test]
    async fn test_lookup_returns_priced_items() {
        let dir = tempfile::tempdir().unwrap();
        let (state, code) = fulfilled_state(dir.path()).await;

        let view = lookup(&state, &encode_token("5001", &code)).await.unwrap();

        assert_eq!(view.name, "Ada Lovelace");
        assert_eq!(view.discount_code, code);
        assert_eq!(view.shop_domain, "ambient.example");
        assert_eq!(view.custom_engraving.as_deref(), Some("ADA"));
        assert_eq!(view.pledged_items.len(), 2);
        assert_eq!(view.pledged_items[0].line_total, Some(Decimal::new(27800, 2)));
        assert_eq!(view.pledged_items[1].line_total, None);
        assert_eq!((view.items_found, view.items_total), (1, 2));
    }

    #[tokio::test]
    async fn test_lookup_rejects_stale_or_bad_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = fulfilled_state(dir.path()).await;

        assert_eq!(
            lookup(&state, &encode_token("5001", "KS17_000000000")).await.unwrap_err(),
            LookupError::NotFound
        );
        assert_eq!(
            lookup(&state, &encode_token("9999", "KS17_000000000")).await.unwrap_err(),
            LookupError::NotFound
        );
        assert_eq!(
            lookup(&state, "%%%").await.unwrap_err(),
            LookupError::Token(TokenError::Encoding)
        );
    }
}
