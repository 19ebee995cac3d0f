use reqwest::Method;
use wiremock::matchers::path;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

const LANDING_ORIGIN: &str = "https://tradixai.com";

#[tokio::test]
async fn preflight_requests_are_answered_for_every_browser_route() {
    let test_app = TestApp::spawn_app().await;
    let client = reqwest::Client::new();

    for route in ["/subscriptions", "/admin/subscribers", "/admin/newsletters"] {
        let response = client
            .request(Method::OPTIONS, &format!("{}{}", test_app.address, route))
            .header("Origin", LANDING_ORIGIN)
            .header("Access-Control-Request-Method", "POST")
            .header(
                "Access-Control-Request-Headers",
                "authorization, content-type",
            )
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16(), "route {}", route);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            LANDING_ORIGIN
        );
        assert!(response
            .headers()
            .contains_key("access-control-allow-methods"));
    }
}

#[tokio::test]
async fn cross_origin_signup_carries_the_allow_origin_header() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let response = reqwest::Client::new()
        .post(&format!("{}/subscriptions", test_app.address))
        .header("Origin", LANDING_ORIGIN)
        .json(&serde_json::json!({ "email": "browser@test.com" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        LANDING_ORIGIN
    );
}
