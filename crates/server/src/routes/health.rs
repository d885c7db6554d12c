use axum::response::Json as ResponseJson;
use utils_core::response::ApiResponse;

pub async fn health_check() -> ResponseJson<ApiResponse<()>> {
    ResponseJson(ApiResponse::message("Server is running"))
}
