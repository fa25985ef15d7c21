use axum::http::StatusCode;
use serde_json::{json, Value};

mod utils;

use utils::*;

struct Marketplace {
    app: TestApp,
    admin: String,
    language_id: i64,
    theme_id: i64,
}

impl Marketplace {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let admin = app.admin_token().await;
        let language = app
            .post("/api/languages", Some(&admin), json!({ "name": "Korean" }))
            .await;
        let theme = app
            .post("/api/themes", Some(&admin), json!({ "name": "Medical" }))
            .await;
        assert_eq!(language.status, StatusCode::CREATED);
        assert_eq!(theme.status, StatusCode::CREATED);

        Self {
            language_id: language.body["id"].as_i64().unwrap(),
            theme_id: theme.body["id"].as_i64().unwrap(),
            app,
            admin,
        }
    }

    /// Creates a translator account and returns (token, profile JSON)
    async fn translator(&self, username: &str) -> (String, Value) {
        let user = self
            .app
            .create_user(&self.admin, username, &["ROLE_TRANSLATOR"])
            .await;
        let token = self.app.access_token(username, USER_PASSWORD).await;

        let page = self
            .app
            .get("/api/translator-profiles?size=100", &token)
            .await
            .body;
        let profile = page["content"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["userId"] == user["id"])
            .cloned()
            .expect("translator profile should be created with the account");
        (token, profile)
    }
}

#[tokio::test]
async fn test_translator_account_gets_empty_profile() {
    let market = Marketplace::new().await;

    let (_, profile) = market.translator("01070000001").await;

    assert_eq!(profile["isAvailable"], false);
    assert_eq!(profile["isOnline"], false);
    assert_eq!(profile["languageIds"], json!([]));
    assert_eq!(profile["username"], "01070000001");
}

#[tokio::test]
async fn test_owner_updates_profile_and_goes_online() {
    let market = Marketplace::new().await;
    let (token, profile) = market.translator("01070000002").await;
    let uri = format!("/api/translator-profiles/{}", profile["id"]);

    let updated = market
        .app
        .put(
            &uri,
            &token,
            json!({
                "email": "translator@example.com",
                "levelOfKorean": "NATIVE",
                "languageIds": [market.language_id],
                "themeIds": [market.theme_id],
            }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["languageIds"], json!([market.language_id]));

    let available = market
        .app
        .patch(&format!("{}/availability?isAvailable=true", uri), &token)
        .await;
    let online = market
        .app
        .patch(&format!("{}/online-status?isOnline=true", uri), &token)
        .await;
    assert_eq!(available.body["isAvailable"], true);
    assert_eq!(online.body["isOnline"], true);

    let by_theme = market
        .app
        .get(
            &format!("/api/translator-profiles/available/theme/{}", market.theme_id),
            &token,
        )
        .await;
    assert_eq!(by_theme.status, StatusCode::OK);
    assert_eq!(by_theme.body["size"], 10);
    assert_eq!(by_theme.body["totalElements"], 1);
    assert_eq!(by_theme.body["content"][0]["id"], profile["id"]);
}

#[tokio::test]
async fn test_unknown_language_is_not_found() {
    let market = Marketplace::new().await;
    let (token, profile) = market.translator("01070000003").await;

    let response = market
        .app
        .put(
            &format!("/api/translator-profiles/{}", profile["id"]),
            &token,
            json!({ "languageIds": [market.language_id, 999] }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Language not found: 999");
}

#[tokio::test]
async fn test_translator_cannot_edit_another_profile() {
    let market = Marketplace::new().await;
    let (_, first) = market.translator("01070000004").await;
    let (intruder, _) = market.translator("01070000005").await;

    let response = market
        .app
        .patch(
            &format!("/api/translator-profiles/{}/online-status?isOnline=true", first["id"]),
            &intruder,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_search_filters() {
    let market = Marketplace::new().await;
    let (token, profile) = market.translator("01070000006").await;
    market.translator("01070000007").await;
    market
        .app
        .put(
            &format!("/api/translator-profiles/{}", profile["id"]),
            &token,
            json!({ "languageIds": [market.language_id], "email": "findme@example.com" }),
        )
        .await;

    let by_language = market
        .app
        .get(
            &format!("/api/translator-profiles?languageId={}", market.language_id),
            &token,
        )
        .await;
    assert_eq!(by_language.body["totalElements"], 1);

    let by_text = market
        .app
        .get("/api/translator-profiles?search=FINDME", &token)
        .await;
    assert_eq!(by_text.body["totalElements"], 1);
    assert_eq!(by_text.body["content"][0]["id"], profile["id"]);

    let everyone = market.app.get("/api/translator-profiles", &token).await;
    assert_eq!(everyone.body["totalElements"], 2);
}

#[tokio::test]
async fn test_ratings_feed_profile_statistics() {
    let market = Marketplace::new().await;
    let (_, profile) = market.translator("01070000008").await;
    market
        .app
        .create_user(&market.admin, "01080000001", &["ROLE_USER"])
        .await;
    market
        .app
        .create_user(&market.admin, "01080000002", &["ROLE_USER"])
        .await;
    let first = market.app.access_token("01080000001", USER_PASSWORD).await;
    let second = market.app.access_token("01080000002", USER_PASSWORD).await;

    for (token, score) in [(&first, 5), (&second, 4)] {
        let rating = market
            .app
            .post(
                "/api/ratings",
                Some(token),
                json!({ "translatorProfileId": profile["id"], "score": score, "comment": "Good" }),
            )
            .await;
        assert_eq!(rating.status, StatusCode::CREATED);
    }

    let out_of_range = market
        .app
        .post(
            "/api/ratings",
            Some(&first),
            json!({ "translatorProfileId": profile["id"], "score": 6 }),
        )
        .await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let detail = market
        .app
        .get(&format!("/api/translator-profiles/{}", profile["id"]), &first)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["averageRating"], 4.5);
    assert_eq!(detail.body["totalRatings"], 2);
    assert_eq!(detail.body["totalCalls"], 0);
}

#[tokio::test]
async fn test_deleting_translator_account_removes_profile() {
    let market = Marketplace::new().await;
    let (_, profile) = market.translator("01070000009").await;

    let deleted = market
        .app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/users/{}", profile["userId"]),
            Some(&market.admin),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let lookup = market
        .app
        .get(
            &format!("/api/translator-profiles/{}", profile["id"]),
            &market.admin,
        )
        .await;
    assert_eq!(lookup.status, StatusCode::NOT_FOUND);
}
