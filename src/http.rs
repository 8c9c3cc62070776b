use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{
    error::{DashboardError, Result},
    moderation::ModerationResult,
    orchestrator::{DEFAULT_ENTRY_LIMIT, DashboardOrchestrator},
    types::{
        ChatReply, KnowledgeBaseEntry, KnowledgeBaseQuery, KnowledgeBaseUpdate, Message,
        SaveEntryRequest,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DashboardOrchestrator>,
}

/// Envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub pinned: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<KnowledgeBaseParams> for KnowledgeBaseQuery {
    fn from(params: KnowledgeBaseParams) -> Self {
        Self {
            search: params.search,
            category: params.category,
            pinned_only: params.pinned.as_deref() == Some("true"),
            limit: params.limit.unwrap_or(DEFAULT_ENTRY_LIMIT),
            offset: params.offset.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ModerationReport {
    pub result: ModerationResult,
    pub sanitized: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedEntry {
    pub id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/messages", get(list_messages))
        .route(
            "/api/knowledge-base",
            get(list_entries).post(save_entry),
        )
        .route(
            "/api/knowledge-base/{id}",
            put(update_entry).delete(delete_entry),
        )
        .route("/api/moderation", post(moderate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<AppState>,
    request: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let message = request
        .ok()
        .and_then(|Json(request)| request.message)
        .ok_or_else(|| {
            DashboardError::InvalidInput("Message is required and must be a string".to_owned())
        })?;

    let reply = state.orchestrator.submit_question(&message).await?;
    Ok(Json(ApiResponse::ok(reply)))
}

async fn list_messages(
    State(state): State<AppState>,
    params: std::result::Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Vec<Message>> {
    let Query(params) =
        params.map_err(|rejection| DashboardError::InvalidInput(rejection.body_text()))?;
    let messages = state
        .orchestrator
        .list_messages(params.limit, params.offset)
        .await?;
    Ok(Json(ApiResponse::ok(messages)))
}

async fn list_entries(
    State(state): State<AppState>,
    params: std::result::Result<Query<KnowledgeBaseParams>, QueryRejection>,
) -> ApiResult<Vec<KnowledgeBaseEntry>> {
    let Query(params) =
        params.map_err(|rejection| DashboardError::InvalidInput(rejection.body_text()))?;
    let entries = state.orchestrator.list_entries(params.into()).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

async fn save_entry(
    State(state): State<AppState>,
    request: std::result::Result<Json<SaveEntryRequest>, JsonRejection>,
) -> ApiResult<KnowledgeBaseEntry> {
    let Json(request) =
        request.map_err(|rejection| DashboardError::InvalidInput(rejection.body_text()))?;
    let entry = state.orchestrator.save_to_knowledge_base(request).await?;
    Ok(Json(ApiResponse::ok(entry)))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: std::result::Result<Json<KnowledgeBaseUpdate>, JsonRejection>,
) -> ApiResult<KnowledgeBaseEntry> {
    let Json(update) =
        request.map_err(|rejection| DashboardError::InvalidInput(rejection.body_text()))?;
    let entry = state.orchestrator.update_entry(&id, update).await?;
    Ok(Json(ApiResponse::ok(entry)))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedEntry> {
    state.orchestrator.delete_entry(&id).await?;
    Ok(Json(ApiResponse::ok(DeletedEntry { id })))
}

async fn moderate(
    State(state): State<AppState>,
    request: std::result::Result<Json<ModerationRequest>, JsonRejection>,
) -> ApiResult<ModerationReport> {
    let Json(request) = request.map_err(|_| {
        DashboardError::InvalidInput("Text is required and must be a string".to_owned())
    })?;
    let moderator = state.orchestrator.moderator();
    Ok(Json(ApiResponse::ok(ModerationReport {
        result: moderator.evaluate(&request.text),
        sanitized: moderator.sanitize(&request.text),
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        model::MockModelProvider, moderation::ContentModerator,
        orchestrator::DashboardOrchestrator, store::InMemoryStore,
    };

    use super::{AppState, router};

    fn app() -> Router {
        let orchestrator = DashboardOrchestrator::new(
            Arc::new(ContentModerator::default()),
            Arc::new(MockModelProvider),
            Arc::new(InMemoryStore::default()),
        );
        router(AppState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn chat_returns_reply_envelope() {
        let app = app();
        let (status, json) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"message": "How do I book a meeting room?"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["question"], "How do I book a meeting room?");
        assert!(json["data"]["id"].is_string());
        assert!(json["data"]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn chat_rejects_blocked_and_malformed_messages() {
        let app = app();
        let (status, json) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"message": "a"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Message blocked: Content too short. Please keep conversations professional and appropriate."
        );

        let (status, json) = send(&app, "POST", "/api/chat", Some(json!({"message": 42}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message is required and must be a string");

        let (status, _) = send(&app, "POST", "/api/chat", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn knowledge_base_crud_flow() {
        let app = app();
        let (_, chat) = send(
            &app,
            "POST",
            "/api/chat",
            Some(json!({"message": "Where do expense reports go?"})),
        )
        .await;
        let message_id = chat["data"]["id"].as_str().unwrap().to_owned();

        let (status, saved) = send(
            &app,
            "POST",
            "/api/knowledge-base",
            Some(json!({
                "messageId": message_id,
                "title": "Expenses",
                "tags": ["finance"],
                "category": "admin"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["data"]["tags"][0], "finance");
        assert_eq!(saved["data"]["isPinned"], false);
        let entry_id = saved["data"]["id"].as_str().unwrap().to_owned();

        let (status, _) = send(
            &app,
            "POST",
            "/api/knowledge-base",
            Some(json!({"messageId": message_id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/knowledge-base/{entry_id}"),
            Some(json!({"isPinned": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["isPinned"], true);

        let (_, listed) = send(
            &app,
            "GET",
            "/api/knowledge-base?pinned=true&search=EXPENSE",
            None,
        )
        .await;
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

        let (_, listed) = send(&app, "GET", "/api/knowledge-base?category=other", None).await;
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));

        let (_, messages) = send(&app, "GET", "/api/messages?limit=5", None).await;
        assert_eq!(messages["data"][0]["knowledgeBaseEntry"]["id"], entry_id.as_str());

        let (status, deleted) = send(
            &app,
            "DELETE",
            &format!("/api/knowledge-base/{entry_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["data"]["id"], entry_id.as_str());

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/knowledge-base/{entry_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_entry_validates_request() {
        let app = app();
        let (status, json) = send(&app, "POST", "/api/knowledge-base", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Message ID is required");

        let (status, json) = send(
            &app,
            "POST",
            "/api/knowledge-base",
            Some(json!({"messageId": "msg-404"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Message not found");
    }

    #[tokio::test]
    async fn moderation_endpoint_reports_verdict_and_sanitized_text() {
        let app = app();
        let (status, json) = send(
            &app,
            "POST",
            "/api/moderation",
            Some(json!({"text": "fuck this"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["result"]["suggestedAction"], "warn");
        assert_eq!(json["data"]["result"]["flaggedWords"][0], "fuck");
        assert_eq!(json["data"]["sanitized"], "**** this");
    }

    #[tokio::test]
    async fn malformed_queries_use_the_error_envelope() {
        let app = app();
        for uri in [
            "/api/messages?limit=abc",
            "/api/knowledge-base?offset=-1",
            "/api/knowledge-base?limit=1.5",
        ] {
            let (status, json) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["success"], false, "{uri}");
            assert!(json["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn moderation_rejects_missing_text_with_envelope() {
        let app = app();
        for body in [json!({}), json!({"text": 7})] {
            let (status, json) = send(&app, "POST", "/api/moderation", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "Text is required and must be a string");
        }
    }

    #[tokio::test]
    async fn health_is_plain_text() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
