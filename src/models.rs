use serde::{Deserialize, Serialize};

/// Latitude/longitude pair as returned by the geocoder and the report endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Address suggestion from the autocomplete service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacePrediction {
    pub place_id: String,
    pub description: String,
}

/// Place chosen in the address input
pub type SelectedPlace = Option<PlacePrediction>;

// Response of POST /report
#[derive(Debug, Clone, Deserialize)]
pub struct ReportResponse {
    pub location: LatLng,
}

// Response of POST /get_ranking; every array may be missing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResponse {
    #[serde(default)]
    pub location: Option<LatLng>,
    #[serde(default)]
    pub schools: Option<Vec<String>>,
    #[serde(default)]
    pub similarities: Option<Vec<f64>>,
    #[serde(default)]
    pub school_image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One chat entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

// Body of POST /chat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub school_name: String,
    /// Raw query-string value; `null` when the page was opened without one
    pub similarity: Option<String>,
    pub search_params: serde_json::Map<String, serde_json::Value>,
    pub history: Vec<Message>,
    pub message: String,
}

// Response of POST /chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_response_tolerates_missing_arrays() {
        let resp: RankingResponse =
            serde_json::from_str(r#"{"schools":["A"],"similarities":[0.9]}"#).unwrap();
        assert_eq!(resp.schools.as_deref(), Some(&["A".to_string()][..]));
        assert!(resp.school_image_urls.is_none());
        assert!(resp.location.is_none());
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let json = serde_json::to_value(Message::model("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "model", "content": "hi"}));
    }

    #[test]
    fn test_chat_request_uses_camel_case() {
        let req = ChatRequest {
            school_name: "A".into(),
            similarity: None,
            search_params: serde_json::Map::new(),
            history: vec![],
            message: "hello".into(),
        };
        let json = serde_json::to_value(req).unwrap();
        assert_eq!(json["schoolName"], "A");
        assert!(json["similarity"].is_null());
        assert!(json["searchParams"].is_object());
    }
}
