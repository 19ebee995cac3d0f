use sqlx::Row;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_returns_200_when_body_is_valid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully subscribed!");
}

#[tokio::test]
async fn subscribe_persists_the_normalized_subscriber() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_subscription(serde_json::json!({ "email": "  Test@Test.com ", "source": "coming_soon" }))
        .await;

    let row = sqlx::query("SELECT email, subscribed, source FROM subscribers;")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Query to fetch subscribers failed.");

    assert_eq!(row.get::<String, _>("email"), "test@test.com");
    assert!(row.get::<bool, _>("subscribed"));
    assert_eq!(row.get::<String, _>("source"), "coming_soon");
}

#[tokio::test]
async fn subscribe_returns_400_when_body_is_missing_or_invalid() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (serde_json::json!({}), "missing email parameter"),
        (serde_json::json!({ "email": "" }), "empty email"),
        (serde_json::json!({ "email": "not-an-email" }), "invalid email"),
        (serde_json::json!({ "email": "frank@localhost" }), "domain without dot"),
        (
            serde_json::json!({ "email": "frank@test.com", "source": "(bad)" }),
            "invalid source",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM subscribers;")
        .fetch_one(&test_app.db_pool)
        .await
        .unwrap()
        .get("count");

    assert_eq!(count, 0);
}

#[tokio::test]
async fn subscribe_sends_a_welcome_email_and_an_operator_notice() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    // Get every request that was sent to the email server
    let received_requests = test_app.email_server.received_requests().await.unwrap();
    let welcome: serde_json::Value = serde_json::from_slice(&received_requests[0].body).unwrap();
    let notice: serde_json::Value = serde_json::from_slice(&received_requests[1].body).unwrap();

    assert_eq!(welcome["to"][0], "a@b.com");
    assert_eq!(notice["to"][0], test_app.config.email_client.admin_email.as_str());
    assert!(notice["html"].as_str().unwrap().contains("a@b.com"));
}

#[tokio::test]
async fn subscribing_twice_is_idempotent() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;
    let response = test_app
        .post_subscription(serde_json::json!({ "email": "A@b.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "You're already subscribed! Thanks for your interest."
    );

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM subscribers;")
        .fetch_one(&test_app.db_pool)
        .await
        .unwrap()
        .get("count");

    assert_eq!(count, 1);
}

#[tokio::test]
async fn subscribe_succeeds_when_the_email_provider_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn subscribe_succeeds_without_an_email_provider_key() {
    let test_app = TestApp::spawn_app_without_api_key().await;

    Mock::given(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn subscribe_returns_500_when_the_database_is_broken() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    // Sabotage the database
    sqlx::query("ALTER TABLE subscribers DROP COLUMN source;")
        .execute(&test_app.db_pool)
        .await
        .unwrap();

    let response = test_app
        .post_subscription(serde_json::json!({ "email": "a@b.com" }))
        .await;

    assert_eq!(500, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to save email. Please try again.");
}

#[tokio::test]
async fn concurrent_identical_signups_store_a_single_row() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let body = serde_json::json!({ "email": "race@test.com" });
    let (first, second) = tokio::join!(
        test_app.post_subscription(body.clone()),
        test_app.post_subscription(body.clone())
    );

    assert_eq!(200, first.status().as_u16());
    assert_eq!(200, second.status().as_u16());

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM subscribers;")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Query to fetch subscribers failed.")
        .get("count");

    assert_eq!(count, 1);

    // Only the winning request sends the welcome email and the operator notice
    let received_requests = test_app.email_server.received_requests().await.unwrap();
    assert_eq!(received_requests.len(), 2);
}
