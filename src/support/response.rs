//! JSON response envelope shared by the admin and open APIs.

use serde::Serialize;

/// Application result codes carried in every envelope.
///
/// Handlers answer with `Success`, `Failure`, `BadRequest`, `AdminException`
/// and `OpenapiException`. The per-resource codes are reserved wire values
/// that clients may still match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestApiCode {
    Success,
    Failure,
    BadRequest,
    AdminException,
    AdminGeoException,
    AdminLinkException,
    AdminStatisticsException,
    OpenapiException,
    OpenapiGeoException,
    OpenapiStatisticsException,
}

impl RestApiCode {
    const ALL: [RestApiCode; 10] = [
        Self::Success,
        Self::Failure,
        Self::BadRequest,
        Self::AdminException,
        Self::AdminGeoException,
        Self::AdminLinkException,
        Self::AdminStatisticsException,
        Self::OpenapiException,
        Self::OpenapiGeoException,
        Self::OpenapiStatisticsException,
    ];

    pub fn code(self) -> i32 {
        match self {
            Self::Success => 200,
            Self::Failure => 500,
            Self::BadRequest => 400,
            Self::AdminException => 10001,
            Self::AdminGeoException => 10002,
            Self::AdminLinkException => 10003,
            Self::AdminStatisticsException => 10004,
            Self::OpenapiException => 20001,
            Self::OpenapiGeoException => 20002,
            Self::OpenapiStatisticsException => 20003,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "venus success",
            Self::Failure => "venus failure",
            Self::BadRequest => "venus bad request",
            Self::AdminException => "venus admin error",
            Self::AdminGeoException => "venus geo error",
            Self::AdminLinkException => "venus link error",
            Self::AdminStatisticsException => "venus statistics error",
            Self::OpenapiException => "venus openapi error",
            Self::OpenapiGeoException => "venus openapi mapping error",
            Self::OpenapiStatisticsException => "venus openapi list error",
        }
    }

    /// `"<message>: <error>"`.
    pub fn message_with(self, error: impl std::fmt::Display) -> String {
        format!("{}: {}", self.message(), error)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

/// Envelope: `{success, message, code, data}`.
///
/// List endpoints use `ApiResponse<Vec<T>>`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub code: i32,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: RestApiCode::Success.message().to_string(),
            code: RestApiCode::Success.code(),
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            message: RestApiCode::Success.message().to_string(),
            code: RestApiCode::Success.code(),
            data: None,
        }
    }

    pub fn fail(code: RestApiCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.code(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_lookup() {
        for code in RestApiCode::ALL {
            assert_eq!(RestApiCode::from_code(code.code()), Some(code));
        }
        assert_eq!(RestApiCode::from_code(42), None);
    }

    #[test]
    fn message_with_appends_error() {
        assert_eq!(
            RestApiCode::AdminException.message_with("link not found: 7"),
            "venus admin error: link not found: 7"
        );
    }

    #[test]
    fn envelope_serializes_null_data_on_failure() {
        let body = serde_json::to_value(ApiResponse::<Vec<i32>>::fail(
            RestApiCode::BadRequest,
            "Required request body is missing",
        ))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "Required request body is missing",
                "code": 400,
                "data": null
            })
        );
    }

    #[test]
    fn envelope_wraps_success_payload() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "venus success");
        assert_eq!(body["data"], serde_json::json!([1, 2]));
    }
}
