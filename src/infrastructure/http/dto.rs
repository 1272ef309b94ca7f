//! Data Transfer Objects
//!
//! 表单与播放接口的请求体，以及所有 `/api` 接口共用的响应信封

use serde::{Deserialize, Serialize};

/// `/api` 响应信封
///
/// 成功时 `errno = 0` 且 `data` 为表单视图 / 播放视图 / 目录；
/// 失败由 `ApiError` 生成同样结构的信封（`data = null`），HTTP 状态码始终为 200，
/// 前端只根据 `errno` 判断结果（如 409 表示提交进行中）
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// 通用请求
// ============================================================================

/// 只携带 flow_id 的请求（get / next / previous / skip / reset / submit）
#[derive(Debug, Deserialize)]
pub struct FlowIdRequest {
    pub flow_id: String,
}

/// 只携带 playback_id 的请求（get / play / pause / ended / release）
#[derive(Debug, Deserialize)]
pub struct PlaybackIdRequest {
    pub playback_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::success(json!({ "flow_id": "f-1" }))).unwrap();
        assert_eq!(body, json!({ "errno": 0, "error": "", "data": { "flow_id": "f-1" } }));
    }

    #[test]
    fn test_id_requests() {
        let req: FlowIdRequest = serde_json::from_str(r#"{"flow_id": "f-1"}"#).unwrap();
        assert_eq!(req.flow_id, "f-1");
        assert!(serde_json::from_str::<PlaybackIdRequest>(r#"{"flow_id": "f-1"}"#).is_err());
    }
}
