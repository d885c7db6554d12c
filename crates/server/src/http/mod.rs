use axum::{Router, middleware::from_fn_with_state, routing::get};
use config::Config;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{Deployment, error::ApiError, routes};

pub mod auth;
mod frontend;

pub fn router(deployment: Deployment) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::auth::router())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(api_not_found)
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::attach_auth_context,
        ));

    Router::new()
        .nest("/api", api_routes)
        .fallback(frontend::serve_frontend)
        .layer(cors_layer(deployment.config()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(deployment)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

async fn api_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

pub(crate) async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use config::Config;
    use test_support::TempAssetDir;
    use tower::ServiceExt;

    use crate::test_helpers;

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_running() {
        let app = super::router(test_helpers::deployment().await);

        let response = app.oneshot(get("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "success", "message": "Server is running" })
        );
    }

    #[tokio::test]
    async fn unknown_api_route_returns_error_envelope() {
        let app = super::router(test_helpers::deployment().await);

        let response = app.oneshot(get("/api/nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Route not found");
    }

    #[tokio::test]
    async fn non_api_paths_are_not_found_without_frontend() {
        let app = super::router(test_helpers::deployment().await);

        let response = app.oneshot(get("/dashboard")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn frontend_dir_serves_assets_with_spa_fallback() {
        let dist = TempAssetDir::new();
        std::fs::write(dist.join("index.html"), "<html>dashboard</html>").unwrap();
        std::fs::create_dir_all(dist.join("assets")).unwrap();
        std::fs::write(dist.join("assets/app-C2bHdHKB.js"), "console.log(1)").unwrap();

        let deployment = test_helpers::deployment_with(Config {
            jwt_secret: Some("test-secret".to_string()),
            frontend_dir: Some(dist.path().to_string_lossy().into_owned()),
            ..Config::default()
        })
        .await;
        let app = super::router(deployment);

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<html>dashboard</html>");

        let response = app
            .clone()
            .oneshot(get("/assets/app-C2bHdHKB.js"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("public, max-age=31536000, immutable")
        );

        let response = app.clone().oneshot(get("/tasks/board")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<html>dashboard</html>");

        let response = app.oneshot(get("/api/unknown")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
