#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use transfer_desk::{
    application::{crm_service::CrmService, transfer_service::TransferService},
    auth::{AdminDirectory, SessionSigner},
    build_router,
    crm::{CrmClient, CrmConfig, CrmTokens, MemoryTokenStore, TokenStore},
    infrastructure::{TransferRepository, in_memory_transfer_repository::InMemoryTransferRepository},
    state::AppState,
};

pub const ADMIN_PASSWORD: &str = "admin-test-pw";
pub const ROOT_PASSWORD: &str = "root-test-pw";
pub const PUBLIC_BASE_URL: &str = "http://desk.test";
const TEST_HASH_COST: u32 = 4;

pub struct TestApp {
    pub router: Router,
    pub tokens: Arc<MemoryTokenStore>,
    pub repository: Arc<InMemoryTransferRepository>,
}

pub fn crm_config(base_url: &str) -> CrmConfig {
    CrmConfig::new("client-id", "client-secret", "http://desk.test/crm/auth/callback")
        .accounts_url(base_url)
        .api_base_url(base_url)
        .request_timeout(Duration::from_secs(2))
}

/// App whose CRM points at an address nothing listens on.
pub fn test_app() -> TestApp {
    test_app_with(crm_config("http://127.0.0.1:9"), CrmTokens::default())
}

pub fn test_app_with(crm: CrmConfig, tokens: CrmTokens) -> TestApp {
    let repository = Arc::new(InMemoryTransferRepository::new());
    let token_store = Arc::new(MemoryTokenStore::with_tokens(tokens));

    let shared_repository: Arc<dyn TransferRepository> = repository.clone();
    let shared_tokens: Arc<dyn TokenStore> = token_store.clone();
    let client = CrmClient::new(crm, shared_tokens).expect("crm client builds");
    let admins = AdminDirectory::with_default_accounts(ADMIN_PASSWORD, ROOT_PASSWORD, TEST_HASH_COST)
        .expect("admin accounts");
    let sessions = SessionSigner::new("integration-secret", chrono::Duration::hours(24));

    let state = AppState::new(
        Arc::new(TransferService::new(shared_repository, PUBLIC_BASE_URL)),
        Arc::new(CrmService::new(Arc::new(client))),
        Arc::new(admins),
        Arc::new(sessions),
    );

    TestApp {
        router: build_router(state),
        tokens: token_store,
        repository,
    }
}

pub fn valid_tokens(api_domain: &str) -> CrmTokens {
    CrmTokens {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        organization_id: "org-1".to_string(),
        user_email: "ops@example.com".to_string(),
        api_domain: api_domain.to_string(),
        scope: "ZohoCRM.modules.deals.READ".to_string(),
    }
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid json request")
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

pub async fn request_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = send(app, request).await;
    let status = response.status();
    let body = response_json(response).await;
    (status, body)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    }
}

/// Logs in as `admin` and returns the `Cookie` header value to replay.
pub async fn login_cookie(app: &Router) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "username": "admin", "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("login sets a cookie")
        .to_string();
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

pub fn assert_error(body: &Value, kind: &str) {
    assert_eq!(body.get("kind").and_then(Value::as_str), Some(kind), "body: {body}");
    assert!(
        body.get("message").and_then(Value::as_str).is_some(),
        "body: {body}"
    );
}

/// Behaviour of the fake CRM deal search endpoint.
#[derive(Clone)]
pub enum SearchReply {
    Records(Vec<Value>),
    Status(StatusCode),
    NoContent,
}

/// Behaviour of the fake CRM token endpoint.
#[derive(Clone)]
pub enum TokenReply {
    Issue { access_token: String, refresh_token: Option<String>, expires_in: i64 },
    OauthError(String),
    Status(StatusCode),
}

pub struct FakeCrmState {
    pub search_reply: Mutex<SearchReply>,
    pub token_reply: Mutex<TokenReply>,
    pub search_hits: AtomicUsize,
    pub token_hits: AtomicUsize,
    pub revoke_hits: AtomicUsize,
    pub last_criteria: Mutex<Option<String>>,
    pub last_authorization: Mutex<Option<String>>,
    pub last_token_form: Mutex<HashMap<String, String>>,
}

impl FakeCrmState {
    pub fn set_search(&self, reply: SearchReply) {
        *self.search_reply.lock().expect("lock") = reply;
    }

    pub fn set_token(&self, reply: TokenReply) {
        *self.token_reply.lock().expect("lock") = reply;
    }

    pub fn search_hits(&self) -> usize {
        self.search_hits.load(Ordering::SeqCst)
    }

    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }
}

pub struct FakeCrm {
    pub base_url: String,
    pub state: Arc<FakeCrmState>,
}

/// Starts a local stand-in for the CRM accounts and API servers.
pub async fn spawn_fake_crm() -> FakeCrm {
    let state = Arc::new(FakeCrmState {
        search_reply: Mutex::new(SearchReply::NoContent),
        token_reply: Mutex::new(TokenReply::Issue {
            access_token: "access-2".to_string(),
            refresh_token: None,
            expires_in: 3600,
        }),
        search_hits: AtomicUsize::new(0),
        token_hits: AtomicUsize::new(0),
        revoke_hits: AtomicUsize::new(0),
        last_criteria: Mutex::new(None),
        last_authorization: Mutex::new(None),
        last_token_form: Mutex::new(HashMap::new()),
    });

    let router = Router::new()
        .route("/crm/v2/Deals/search", get(fake_search))
        .route("/oauth/v2/token", post(fake_token))
        .route("/oauth/v2/token/revoke", post(fake_revoke))
        .route("/oauth/user/info", get(fake_user_info))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind fake crm");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake crm serves");
    });

    FakeCrm {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn fake_search(
    State(state): State<Arc<FakeCrmState>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.search_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_criteria.lock().expect("lock") = query.get("criteria").cloned();
    *state.last_authorization.lock().expect("lock") = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let reply = state.search_reply.lock().expect("lock").clone();
    match reply {
        SearchReply::Records(records) => Json(json!({ "data": records })).into_response(),
        SearchReply::Status(status) => (status, "upstream failure").into_response(),
        SearchReply::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn fake_token(
    State(state): State<Arc<FakeCrmState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock().expect("lock") = form;

    let reply = state.token_reply.lock().expect("lock").clone();
    match reply {
        TokenReply::Issue {
            access_token,
            refresh_token,
            expires_in,
        } => {
            let mut body = json!({
                "access_token": access_token,
                "expires_in": expires_in,
                "scope": "ZohoCRM.modules.deals.READ",
                "token_type": "Bearer",
            });
            if let Some(refresh_token) = refresh_token {
                body["refresh_token"] = Value::String(refresh_token);
            }
            Json(body).into_response()
        }
        TokenReply::OauthError(error) => Json(json!({ "error": error })).into_response(),
        TokenReply::Status(status) => (status, "token endpoint failure").into_response(),
    }
}

async fn fake_revoke(State(state): State<Arc<FakeCrmState>>) -> StatusCode {
    state.revoke_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn fake_user_info() -> Json<Value> {
    Json(json!({
        "Email": "ops@example.com",
        "Display_Name": "Transfer Ops",
        "ZUID": 778899,
        "Country": "EU",
    }))
}

pub fn deal_record(id: &str, lead_id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "Lead_ID": lead_id,
        "Deal_Name": name,
        "Contact_Name": { "name": "Contact", "id": "c1" },
        "Account_Name": { "name": "Account", "id": "a1" },
        "Stage": "Qualification",
        "Amount": 100,
    })
}
