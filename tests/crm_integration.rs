mod common;

use std::sync::atomic::Ordering;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use transfer_desk::crm::{CrmTokens, TokenStore};

use common::{
    SearchReply, TokenReply, assert_error, crm_config, deal_record, empty_request, login_cookie,
    request_json, send, spawn_fake_crm, test_app_with, valid_tokens,
};

fn lead_ids(body: &Value) -> Vec<String> {
    body["deals"]
        .as_array()
        .expect("deals array")
        .iter()
        .filter_map(|deal| deal["leadId"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn search_ranks_exact_matches_first_and_truncates() {
    let crm = spawn_fake_crm().await;
    let mut records: Vec<Value> = (0..11)
        .map(|n| deal_record(&format!("d{n}"), &format!("LEAD-001{n}"), "Partial"))
        .collect();
    records.insert(7, deal_record("exact", "LEAD-001", "Exact"));
    crm.state.set_search(SearchReply::Records(records));

    let app = test_app_with(crm_config(&crm.base_url), valid_tokens("")).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=%20lead-001%20", Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total"], json!(12));
    assert_eq!(body["source"], json!("crm_api"));
    assert!(body.get("warning").is_none());
    let ids = lead_ids(&body);
    assert_eq!(ids.len(), 10);
    assert_eq!(ids[0], "LEAD-001");
    assert_eq!(ids[1], "LEAD-0010");
    assert_eq!(body["deals"][0]["dealName"], json!("Exact"));
    assert_eq!(body["deals"][0]["contactName"], json!("Contact"));

    assert_eq!(crm.state.search_hits(), 1);
    assert_eq!(
        crm.state.last_criteria.lock().expect("lock").as_deref(),
        Some("(Lead_ID:contains:LEAD-001)")
    );
    assert_eq!(
        crm.state.last_authorization.lock().expect("lock").as_deref(),
        Some("Zoho-oauthtoken access-1")
    );
}

#[tokio::test]
async fn upstream_failure_falls_back_to_sample_deals() {
    let crm = spawn_fake_crm().await;
    crm.state
        .set_search(SearchReply::Status(StatusCode::INTERNAL_SERVER_ERROR));

    let app = test_app_with(crm_config(&crm.base_url), valid_tokens("")).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=LEAD-00", Some(&cookie)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], json!("fallback"));
    assert!(body["warning"].as_str().is_some());
    assert_eq!(body["total"], json!(6));
    assert_eq!(lead_ids(&body).len(), 6);

    let (_, exact) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=lead-003", Some(&cookie)),
    )
    .await;
    assert_eq!(lead_ids(&exact), vec!["LEAD-003".to_string()]);
}

#[tokio::test]
async fn upstream_unauthorized_requires_reauthentication() {
    let crm = spawn_fake_crm().await;
    crm.state.set_search(SearchReply::Status(StatusCode::UNAUTHORIZED));

    let app = test_app_with(crm_config(&crm.base_url), valid_tokens("")).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=LEAD-001", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "crm_auth_required");
}

#[tokio::test]
async fn no_content_means_no_matches() {
    let crm = spawn_fake_crm().await;
    crm.state.set_search(SearchReply::NoContent);

    let app = test_app_with(crm_config(&crm.base_url), valid_tokens("")).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=LEAD-999", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(0));
    assert_eq!(body["source"], json!("crm_api"));
    assert!(lead_ids(&body).is_empty());
}

#[tokio::test]
async fn short_query_or_invalid_token_never_reaches_upstream() {
    let crm = spawn_fake_crm().await;
    let expired = CrmTokens {
        expires_at: Some(Utc::now() - Duration::minutes(1)),
        ..valid_tokens("")
    };
    let app = test_app_with(crm_config(&crm.base_url), expired).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=LE", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "deals": [], "total": 0 }));

    let (status, body) = request_json(
        &app,
        empty_request("GET", "/crm/deals/search?leadId=LEAD-001", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "crm_auth_required");

    assert_eq!(crm.state.search_hits(), 0);
}

#[tokio::test]
async fn status_refreshes_an_expired_token() {
    let crm = spawn_fake_crm().await;
    crm.state.set_token(TokenReply::Issue {
        access_token: "access-2".to_string(),
        refresh_token: Some("refresh-2".to_string()),
        expires_in: 3600,
    });
    let expired = CrmTokens {
        expires_at: Some(Utc::now() - Duration::minutes(1)),
        ..valid_tokens("")
    };
    let test_app = test_app_with(crm_config(&crm.base_url), expired);
    let app = test_app.router.clone();
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(&app, empty_request("GET", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["organization"], json!("Transfer Ops"));
    assert_eq!(body["user"], json!("ops@example.com"));
    assert_eq!(crm.state.token_hits(), 1);

    let form = crm.state.last_token_form.lock().expect("lock").clone();
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("refresh-1"));

    let stored = test_app.tokens.get().await.expect("tokens");
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token, "refresh-2");
    assert!(stored.is_valid_at(Utc::now()));
}

#[tokio::test]
async fn status_without_connection_is_unauthenticated() {
    let crm = spawn_fake_crm().await;
    let app = test_app_with(crm_config(&crm.base_url), CrmTokens::default()).router;
    let cookie = login_cookie(&app).await;

    let (status, body) = request_json(&app, empty_request("GET", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "authenticated": false }));
}

#[tokio::test]
async fn manual_refresh_reports_expiry_and_failures() {
    let crm = spawn_fake_crm().await;
    let test_app = test_app_with(crm_config(&crm.base_url), valid_tokens(""));
    let app = test_app.router.clone();
    let cookie = login_cookie(&app).await;

    let (status, body) =
        request_json(&app, empty_request("POST", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["tokenType"], json!("Bearer"));
    let expires_in = body["expiresIn"].as_i64().expect("expiresIn");
    assert!((3500..=3540).contains(&expires_in), "expiresIn: {expires_in}");
    assert_eq!(
        test_app.tokens.get().await.expect("tokens").refresh_token,
        "refresh-1"
    );

    crm.state
        .set_token(TokenReply::OauthError("invalid_code".to_string()));
    let (status, body) =
        request_json(&app, empty_request("POST", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "refresh_failed");

    crm.state
        .set_token(TokenReply::Status(StatusCode::SERVICE_UNAVAILABLE));
    let (status, body) =
        request_json(&app, empty_request("POST", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "refresh_failed");

    test_app.tokens.clear().await.expect("clear");
    let (status, body) =
        request_json(&app, empty_request("POST", "/crm/auth", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "refresh_failed");
}

#[tokio::test]
async fn consent_flow_stores_tokens_and_state_is_single_use() {
    let crm = spawn_fake_crm().await;
    crm.state.set_token(TokenReply::Issue {
        access_token: "fresh-access".to_string(),
        refresh_token: Some("fresh-refresh".to_string()),
        expires_in: 3600,
    });
    let test_app = test_app_with(crm_config(&crm.base_url), CrmTokens::default());
    let app = test_app.router.clone();
    let cookie = login_cookie(&app).await;

    let response = send(&app, empty_request("GET", "/crm/auth/login", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location")
        .to_string();
    assert!(location.starts_with(&format!("{}/oauth/v2/auth?", crm.base_url)));
    let state = reqwest::Url::parse(&location)
        .expect("url")
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state param");

    let callback = format!("/crm/auth/callback?code=auth-code&state={state}");
    let (status, body) = request_json(&app, empty_request("GET", &callback, None)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["userEmail"], json!("ops@example.com"));
    assert_eq!(body["apiDomain"], json!("www.zohoapis.eu"));

    let stored = test_app.tokens.get().await.expect("tokens");
    assert_eq!(stored.access_token, "fresh-access");
    assert_eq!(stored.refresh_token, "fresh-refresh");
    assert_eq!(stored.organization_id, "778899");
    assert_eq!(stored.api_domain, "www.zohoapis.eu");

    let form = crm.state.last_token_form.lock().expect("lock").clone();
    assert_eq!(
        form.get("grant_type").map(String::as_str),
        Some("authorization_code")
    );
    assert_eq!(form.get("code").map(String::as_str), Some("auth-code"));

    let (status, body) = request_json(&app, empty_request("GET", &callback, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "validation");

    let (status, _) = request_json(
        &app,
        empty_request(
            "GET",
            "/crm/auth/callback?error=access_denied&error_description=denied",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_code_exchange_is_a_bad_gateway() {
    let crm = spawn_fake_crm().await;
    crm.state
        .set_token(TokenReply::Status(StatusCode::INTERNAL_SERVER_ERROR));
    let app = test_app_with(crm_config(&crm.base_url), CrmTokens::default()).router;
    let cookie = login_cookie(&app).await;

    let response = send(&app, empty_request("GET", "/crm/auth/login", Some(&cookie))).await;
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("redirect location")
        .to_string();
    let state = reqwest::Url::parse(&location)
        .expect("url")
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state param");

    let (status, body) = request_json(
        &app,
        empty_request(
            "GET",
            &format!("/crm/auth/callback?code=c&state={state}"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_error(&body, "upstream");
}

#[tokio::test]
async fn logout_revokes_and_clears_tokens() {
    let crm = spawn_fake_crm().await;
    let test_app = test_app_with(crm_config(&crm.base_url), valid_tokens(""));
    let app = test_app.router.clone();
    let cookie = login_cookie(&app).await;

    let (status, body) =
        request_json(&app, empty_request("POST", "/crm/auth/logout", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(crm.state.revoke_hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        test_app.tokens.get().await.expect("tokens"),
        CrmTokens::default()
    );
}
