pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::cases::handlers as cases;
use crate::documents::handlers as documents;
use crate::fees::handlers as fees;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Cases and sub-tasks
        .route("/api/v1/cases/:case_id", get(cases::handle_get_case))
        .route(
            "/api/v1/cases/:case_id/sync-status",
            post(cases::handle_sync_status),
        )
        .route(
            "/api/v1/cases/:case_id/subtasks",
            post(cases::handle_create_sub_task),
        )
        .route(
            "/api/v1/subtasks/:id",
            patch(cases::handle_update_sub_task).delete(cases::handle_delete_sub_task),
        )
        .route(
            "/api/v1/subtasks/:id/metadata",
            patch(cases::handle_patch_metadata),
        )
        // Document generation
        .route(
            "/api/v1/cases/:case_id/subtasks/:subtask_id/stamps",
            post(documents::handle_generate_stamp),
        )
        .route(
            "/api/v1/cases/:case_id/subtasks/:subtask_id/stamps/preview",
            post(documents::handle_preview_stamp),
        )
        .route(
            "/api/v1/cases/:case_id/subtasks/:subtask_id/receipts",
            post(documents::handle_generate_receipt),
        )
        .route("/api/v1/documents/:id", get(documents::handle_get_document))
        .route(
            "/api/v1/documents/:id/payload",
            get(documents::handle_get_payload),
        )
        // Reference data
        .route(
            "/api/v1/document-types",
            get(documents::handle_list_document_types).post(documents::handle_create_document_type),
        )
        .route(
            "/api/v1/document-types/:id",
            patch(documents::handle_update_document_type),
        )
        .route(
            "/api/v1/fees",
            get(fees::handle_list_fees).post(fees::handle_create_fee),
        )
        .route("/api/v1/fees/resolve", get(fees::handle_resolve_fee))
        .route(
            "/api/v1/fees/:id",
            patch(fees::handle_update_fee).delete(fees::handle_delete_fee),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{OFFICE_HEADER, USER_HEADER};
    use crate::state::tests::offline_state;

    #[tokio::test]
    async fn test_health_is_public() {
        let response = build_router(offline_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_office_routes_require_identity_headers() {
        let response = build_router(offline_state())
            .oneshot(Request::get("/api/v1/fees").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_fee_listing_uses_fee_repository() {
        let response = build_router(offline_state())
            .oneshot(
                Request::get("/api/v1/fees")
                    .header(USER_HEADER, Uuid::new_v4().to_string())
                    .header(OFFICE_HEADER, Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resolve_without_entry_is_not_found() {
        let uri = format!(
            "/api/v1/fees/resolve?bank_id={}&document_type_id={}&fallback=true",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let response = build_router(offline_state())
            .oneshot(
                Request::get(uri)
                    .header(USER_HEADER, Uuid::new_v4().to_string())
                    .header(OFFICE_HEADER, Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
