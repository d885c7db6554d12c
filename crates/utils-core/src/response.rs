use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Uniform JSON envelope returned by every API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            results: None,
            data: Some(data),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            results: None,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: ResponseStatus::Error,
            results: None,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// A list payload, with its length reported as `results`.
    pub fn success_list(items: Vec<T>) -> Self {
        Self {
            status: ResponseStatus::Success,
            results: Some(items.len()),
            data: Some(items),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    /// Success with an explicit `"data": null`, used for deletions.
    pub fn empty() -> ApiResponse<serde_json::Value> {
        ApiResponse::success(serde_json::Value::Null)
    }
}
