mod common;

use axum::http::StatusCode;
use card_trade_api::entities::{OfferStatus, PublicationStatus, publication};
use card_trade_api::error::AppError;
use card_trade_api::services::{TradeService, lookup};
use card_trade_api::state::AppState;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

struct Market {
    app: axum::Router,
    state: AppState,
    admin: common::TestUser,
    seller: common::TestUser,
    buyer: common::TestUser,
    rival: common::TestUser,
    card_base_id: String,
    publication_id: String,
}

/// Seller lists one card; buyer and rival are ready to bid.
async fn market() -> Market {
    let (app, state) = common::test_app().await;
    let admin = common::register_admin(&app, &state).await;
    let (_game_id, card_base_id) =
        common::seed_catalog(&app, &admin.token, "Magic", "Black Lotus").await;
    let seller = common::register(&app, "Seller", "seller@example.com").await;
    let buyer = common::register(&app, "Buyer", "buyer@example.com").await;
    let rival = common::register(&app, "Rival", "rival@example.com").await;
    let card_id = common::create_card(&app, &seller.token, &card_base_id).await;
    let publication_id = common::create_publication(&app, &seller.token, &card_id, "Lotus").await;
    Market {
        app,
        state,
        admin,
        seller,
        buyer,
        rival,
        card_base_id,
        publication_id,
    }
}

async fn set_status(m: &Market, offer_id: &str, token: &str, status: &str) -> (StatusCode, String) {
    common::patch_json_with_auth(
        &m.app,
        &format!("/api/v1/offers/{offer_id}"),
        token,
        &json!({ "statusOffer": status }),
    )
    .await
}

#[tokio::test]
async fn create_offer_with_money_and_cards() {
    let m = market().await;
    let own_card = common::create_card(&m.app, &m.buyer.token, &m.card_base_id).await;

    let (status, body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({
            "publicationId": m.publication_id,
            "moneyOffer": 12.5,
            "cardExchangeIds": [own_card],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let json = common::json(&body);
    assert_eq!(json["statusOffer"], "PENDING");
    assert_eq!(json["userId"], m.buyer.id);
    assert_eq!(json["publicationId"], m.publication_id);
    assert_eq!(json["moneyOffer"], 12.5);
    assert_eq!(json["cardExchangeIds"][0], own_card);
}

#[tokio::test]
async fn create_offer_rules() {
    let m = market().await;

    // Empty offer.
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({ "publicationId": m.publication_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Own publication.
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.seller.token,
        &json!({ "publicationId": m.publication_id, "moneyOffer": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Someone else's card.
    let rival_card = common::create_card(&m.app, &m.rival.token, &m.card_base_id).await;
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({ "publicationId": m.publication_id, "cardExchangeIds": [rival_card] }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown card.
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({
            "publicationId": m.publication_id,
            "cardExchangeIds": ["00000000-0000-0000-0000-000000000000"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown publication.
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({ "publicationId": "00000000-0000-0000-0000-000000000000", "moneyOffer": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // One pending offer per user and publication.
    common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 5.0).await;
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &m.buyer.token,
        &json!({ "publicationId": m.publication_id, "moneyOffer": 6.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn accepting_closes_publication_and_rejects_others() {
    let m = market().await;
    let winner = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 30.0).await;
    let loser = common::create_money_offer(&m.app, &m.rival.token, &m.publication_id, 20.0).await;

    let (status, body) = set_status(&m, &winner, &m.seller.token, "ACCEPTED").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(common::json(&body)["statusOffer"], "ACCEPTED");

    let (_, body) = common::get(&m.app, &format!("/api/v1/publications/{}", m.publication_id)).await;
    let json = common::json(&body);
    assert_eq!(json["statusPublication"], "CLOSED");

    let (_, body) =
        common::get_with_auth(&m.app, &format!("/api/v1/offers/{loser}"), &m.rival.token).await;
    assert_eq!(common::json(&body)["statusOffer"], "REJECTED");

    // Decided offers are final.
    let (status, _body) = set_status(&m, &winner, &m.seller.token, "REJECTED").await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _body) = set_status(&m, &loser, &m.seller.token, "ACCEPTED").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Closed publications take no new offers.
    let late = common::register(&m.app, "Late", "late@example.com").await;
    let (status, _body) = common::post_json_with_auth(
        &m.app,
        "/api/v1/offers",
        &late.token,
        &json!({ "publicationId": m.publication_id, "moneyOffer": 50.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn status_changes_respect_roles() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 10.0).await;

    let (status, _body) = set_status(&m, &offer_id, &m.buyer.token, "ACCEPTED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) = set_status(&m, &offer_id, &m.rival.token, "REJECTED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) = set_status(&m, &offer_id, &m.seller.token, "CANCELED").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) = set_status(&m, &offer_id, &m.seller.token, "PENDING").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _body) = set_status(&m, &offer_id, &m.seller.token, "LATER").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = set_status(&m, &offer_id, &m.buyer.token, "CANCELED").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(common::json(&body)["statusOffer"], "CANCELED");

    // The publication stays open and the buyer may bid again.
    let (_, body) = common::get(&m.app, &format!("/api/v1/publications/{}", m.publication_id)).await;
    assert_eq!(common::json(&body)["statusPublication"], "OPEN");
    common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 11.0).await;
}

#[tokio::test]
async fn rejecting_leaves_publication_open() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 1.0).await;

    let (status, body) = set_status(&m, &offer_id, &m.seller.token, "rejected").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(common::json(&body)["statusOffer"], "REJECTED");

    let (_, body) = common::get(&m.app, &format!("/api/v1/publications/{}", m.publication_id)).await;
    assert_eq!(common::json(&body)["statusPublication"], "OPEN");
}

#[tokio::test]
async fn offer_visibility() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 10.0).await;
    let uri = format!("/api/v1/offers/{offer_id}");

    for token in [&m.buyer.token, &m.seller.token, &m.admin.token] {
        let (status, _body) = common::get_with_auth(&m.app, &uri, token).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _body) = common::get_with_auth(&m.app, &uri, &m.rival.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) = common::get(&m.app, &uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_offers_is_scoped_to_parties() {
    let m = market().await;
    common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 10.0).await;
    common::create_money_offer(&m.app, &m.rival.token, &m.publication_id, 11.0).await;

    let (status, body) = common::get_with_auth(&m.app, "/api/v1/offers", &m.buyer.token).await;
    assert_eq!(status, StatusCode::OK);
    let json = common::json(&body);
    assert_eq!(json["total"], 1);
    assert_eq!(json["data"][0]["userId"], m.buyer.id);

    let (_, body) = common::get_with_auth(&m.app, "/api/v1/offers", &m.seller.token).await;
    assert_eq!(common::json(&body)["total"], 2);

    let (_, body) = common::get_with_auth(&m.app, "/api/v1/offers", &m.admin.token).await;
    assert_eq!(common::json(&body)["total"], 2);

    let (_, body) = common::get_with_auth(
        &m.app,
        &format!("/api/v1/offers?userId={}", m.rival.id),
        &m.seller.token,
    )
    .await;
    assert_eq!(common::json(&body)["total"], 1);

    let (_, body) =
        common::get_with_auth(&m.app, "/api/v1/offers?status=ACCEPTED", &m.seller.token).await;
    assert_eq!(common::json(&body)["total"], 0);

    let (status, _body) =
        common::get_with_auth(&m.app, "/api/v1/offers?status=MAYBE", &m.seller.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn offer_status(m: &Market, offer_id: &str) -> String {
    let (_, body) =
        common::get_with_auth(&m.app, &format!("/api/v1/offers/{offer_id}"), &m.admin.token).await;
    common::json(&body)["statusOffer"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

async fn publication_status(m: &Market) -> String {
    let (_, body) = common::get(&m.app, &format!("/api/v1/publications/{}", m.publication_id)).await;
    common::json(&body)["statusPublication"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn duplicate_offers_sent_together_create_one() {
    let m = market().await;
    let body = json!({ "publicationId": m.publication_id, "moneyOffer": 15.0 });

    let (first, second) = tokio::join!(
        common::post_json_with_auth(&m.app, "/api/v1/offers", &m.buyer.token, &body),
        common::post_json_with_auth(&m.app, "/api/v1/offers", &m.buyer.token, &body),
    );
    let mut statuses = [first.0.as_u16(), second.0.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409], "{} / {}", first.1, second.1);

    let (_, body) = common::get_with_auth(
        &m.app,
        &format!("/api/v1/offers?publicationId={}", m.publication_id),
        &m.buyer.token,
    )
    .await;
    let json = common::json(&body);
    let pending: Vec<_> = json["data"]
        .as_array()
        .map(|offers| {
            offers
                .iter()
                .filter(|o| o["statusOffer"] == "PENDING")
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn stale_offer_cannot_be_decided_twice() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 9.0).await;
    let id = Uuid::parse_str(&offer_id).expect("offer id");
    let stale = lookup::find_offer(&m.state.db, id).await.expect("offer");

    let (status, _body) = set_status(&m, &offer_id, &m.seller.token, "REJECTED").await;
    assert_eq!(status, StatusCode::OK);

    let result = TradeService::change_offer_status(&m.state.db, &stale, OfferStatus::Accepted).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(offer_status(&m, &offer_id).await, "REJECTED");
    assert_eq!(publication_status(&m).await, "OPEN");
}

#[tokio::test]
async fn stale_accept_after_publication_cancel_conflicts() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 9.0).await;
    let id = Uuid::parse_str(&offer_id).expect("offer id");
    let stale = lookup::find_offer(&m.state.db, id).await.expect("offer");

    let (status, _body) = common::post_json_with_auth(
        &m.app,
        &format!("/api/v1/publications/{}/cancel", m.publication_id),
        &m.seller.token,
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let result = TradeService::change_offer_status(&m.state.db, &stale, OfferStatus::Accepted).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(offer_status(&m, &offer_id).await, "CANCELED");
    assert_eq!(publication_status(&m).await, "CANCELED");
}

#[tokio::test]
async fn accept_rolls_back_when_publication_already_closed() {
    let m = market().await;
    let offer_id = common::create_money_offer(&m.app, &m.buyer.token, &m.publication_id, 9.0).await;
    let id = Uuid::parse_str(&offer_id).expect("offer id");
    let pending = lookup::find_offer(&m.state.db, id).await.expect("offer");

    // Closed underneath the pending offer.
    publication::Entity::update_many()
        .col_expr(
            publication::Column::Status,
            Expr::value(PublicationStatus::Closed.as_str()),
        )
        .filter(publication::Column::Id.eq(pending.publication_id))
        .exec(&m.state.db)
        .await
        .expect("close publication");

    let result =
        TradeService::change_offer_status(&m.state.db, &pending, OfferStatus::Accepted).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(offer_status(&m, &offer_id).await, "PENDING");
    assert_eq!(publication_status(&m).await, "CLOSED");
}
