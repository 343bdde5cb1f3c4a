use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use school_match::app::SearchPage;
use school_match::backend::BackendClient;
use school_match::chat::ChatSession;
use school_match::config::Config;
use school_match::error::{Result, SchoolMatchError};
use school_match::models::PlacePrediction;
use school_match::parameters::Catalog;
use school_match::transport::{Endpoint, Transport};

struct Scripted {
    responses: Mutex<VecDeque<Result<Value>>>,
    seen: Mutex<Vec<(Endpoint, Value)>>,
}

impl Scripted {
    fn new(responses: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(Endpoint, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Scripted {
    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Value> {
        self.seen.lock().unwrap().push((endpoint, body.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SchoolMatchError::Internal("no scripted response".into())))
    }
}

fn page() -> SearchPage {
    let mut cfg = Config::default();
    cfg.maps.public_api_key = Some("public".into());
    let mut page = SearchPage::new(&cfg, Catalog::schools()).unwrap();
    page.select_place(Some(PlacePrediction {
        place_id: "ChIJ1".into(),
        description: "1 Main St".into(),
    }));
    page.set_k(3);
    page
}

#[tokio::test]
async fn ranking_then_chat_round_trip() {
    let tx = Scripted::new(vec![
        Ok(json!({
            "schools": ["A", "B"],
            "similarities": [0.9, 0.5],
            "schoolImageUrls": ["u1", "u2"]
        })),
        Ok(json!({"message": "B offers strong transfer programs."})),
    ]);
    let client = BackendClient::new(tx.clone());
    let mut page = page();

    let ranked = page.find_schools(&client).await.unwrap().to_vec();
    assert_eq!(ranked.len(), 2);
    assert_eq!((ranked[0].rank, ranked[0].name.as_str()), (1, "A"));
    assert_eq!((ranked[1].rank, ranked[1].name.as_str()), (2, "B"));

    let route = page.open_school(2).unwrap();
    let path = route.path();
    assert!(path.starts_with("/chat/B?"));
    assert!(path.ends_with("k=3&similarity=0.5&imageUrl=u2"));

    let mut session = ChatSession::open(&path).unwrap();
    assert_eq!(session.school_name(), "B");
    assert_eq!(session.image_url(), Some("u2"));
    session.send(&client, "Tell me more").await.unwrap();
    assert_eq!(session.messages().len(), 2);

    let seen = tx.seen();
    assert_eq!(seen[0].0, Endpoint::Ranking);
    assert_eq!(seen[0].1["k"], 3);
    assert_eq!(seen[1].0, Endpoint::Chat);
    assert_eq!(seen[1].1["schoolName"], "B");
    assert_eq!(seen[1].1["similarity"], "0.5");
}

#[tokio::test]
async fn mismatched_arrays_give_empty_ranking() {
    let tx = Scripted::new(vec![Ok(json!({
        "schools": ["A", "B"],
        "similarities": [0.9],
        "schoolImageUrls": ["u1", "u2"]
    }))]);
    let client = BackendClient::new(tx);
    let mut page = page();

    assert!(page.find_schools(&client).await.unwrap().is_empty());
    assert!(page.open_school(1).is_none());
}

#[tokio::test]
async fn failed_chat_leaves_history_unchanged() {
    let tx = Scripted::new(vec![Err(SchoolMatchError::Upstream {
        status: 502,
        message: "Failed to get response from the chatbot.".into(),
    })]);
    let client = BackendClient::new(tx);
    let mut session = ChatSession::open("/chat/A?k=1&similarity=0.9&imageUrl=u1").unwrap();

    let err = session.send(&client, "hello").await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to get response from the chatbot.");
    assert!(session.messages().is_empty());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn report_failure_surfaces_backend_message() {
    let tx = Scripted::new(vec![Err(SchoolMatchError::Upstream {
        status: 400,
        message: "Place not found".into(),
    })]);
    let client = BackendClient::new(tx);
    let mut page = page();

    assert!(page.confirm(&client).await.is_err());
    assert_eq!(page.position(), None);
    let notice = page.take_notices().pop().unwrap();
    assert!(notice.is_error());
    assert_eq!(notice.description, "Place not found");
}
