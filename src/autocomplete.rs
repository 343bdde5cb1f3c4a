//! Address resolution adapter around a place-autocomplete service.
//!
//! Keystrokes restart a quiet-period timer; only when it elapses is a
//! prediction request issued, scoped to the current session token. Accepting
//! a suggestion starts a new session.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Result, SchoolMatchError};
use crate::models::PlacePrediction;

/// Groups a run of autocomplete queries into one billing/search session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlacePredictor: Send + Sync {
    async fn predictions(&self, input: &str, token: &SessionToken)
    -> Result<Vec<PlacePrediction>>;
}

/// Places Autocomplete web service
pub struct GooglePlacesPredictor {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<PlacePrediction>,
    #[serde(default)]
    error_message: Option<String>,
}

impl GooglePlacesPredictor {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PlacePredictor for GooglePlacesPredictor {
    async fn predictions(
        &self,
        input: &str,
        token: &SessionToken,
    ) -> Result<Vec<PlacePrediction>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("input", input),
                ("sessiontoken", token.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: AutocompleteResponse = response.json().await?;
        match body.status.as_str() {
            "OK" => Ok(body.predictions),
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(SchoolMatchError::Upstream {
                status: status.as_u16(),
                message: format!(
                    "Autocomplete failed: {}",
                    body.error_message.as_deref().unwrap_or(other)
                ),
            }),
        }
    }
}

/// Callback receiving the accepted place, or `None` when the input is
/// cleared or a lookup fails.
pub type PlaceSelectFn = Arc<dyn Fn(Option<PlacePrediction>) + Send + Sync>;

/// Debounced address input with its own suggestion list
pub struct AddressInput {
    predictor: Arc<dyn PlacePredictor>,
    debounce: Duration,
    on_place_select: PlaceSelectFn,
    text: String,
    token: SessionToken,
    // Bumped by every user action; results from an older action are dropped.
    generation: Arc<Mutex<u64>>,
    suggestions: watch::Sender<Vec<PlacePrediction>>,
    pending: Option<JoinHandle<()>>,
}

impl AddressInput {
    pub fn new(
        predictor: Arc<dyn PlacePredictor>,
        debounce: Duration,
        on_place_select: PlaceSelectFn,
    ) -> Self {
        let (suggestions, _) = watch::channel(Vec::new());
        Self {
            predictor,
            debounce,
            on_place_select,
            text: String::new(),
            token: SessionToken::new(),
            generation: Arc::new(Mutex::new(0)),
            suggestions,
            pending: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn session_token(&self) -> &SessionToken {
        &self.token
    }

    pub fn suggestions(&self) -> Vec<PlacePrediction> {
        self.suggestions.borrow().clone()
    }

    /// Receiver notified whenever the suggestion list changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PlacePrediction>> {
        self.suggestions.subscribe()
    }

    /// Record a keystroke and restart the quiet-period timer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.text = text.into();
        let generation = self.invalidate();

        let predictor = Arc::clone(&self.predictor);
        let on_place_select = Arc::clone(&self.on_place_select);
        let shared = Arc::clone(&self.generation);
        let suggestions = self.suggestions.clone();
        let token = self.token.clone();
        let input = self.text.clone();
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let outcome = if input.is_empty() {
                Ok(Vec::new())
            } else {
                tracing::debug!(%input, token = token.as_str(), "fetching place predictions");
                predictor.predictions(&input, &token).await
            };

            let current = shared.lock().unwrap_or_else(|e| e.into_inner());
            if *current != generation {
                return;
            }
            match outcome {
                Ok(list) => {
                    suggestions.send_replace(list);
                }
                Err(e) => {
                    tracing::error!("Error fetching place predictions: {}", e);
                    suggestions.send_replace(Vec::new());
                    on_place_select(None);
                }
            }
        }));
    }

    /// Accept a suggestion: hand it to the parent, reset the input and start a new session.
    pub fn select(&mut self, prediction: PlacePrediction) {
        self.invalidate();
        self.text.clear();
        self.suggestions.send_replace(Vec::new());
        tracing::info!(place_id = %prediction.place_id, "place selected");
        (self.on_place_select)(Some(prediction));
        self.token = SessionToken::new();
    }

    /// Clear the input; the parent loses its selection.
    pub fn clear(&mut self) {
        self.invalidate();
        self.text.clear();
        self.suggestions.send_replace(Vec::new());
        (self.on_place_select)(None);
    }

    fn invalidate(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let mut current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *current += 1;
        *current
    }
}

impl Drop for AddressInput {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
