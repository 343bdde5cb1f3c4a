//! Per-school chat page state.

use serde_json::{Map, Value};

use crate::backend::BackendClient;
use crate::error::Result;
use crate::models::{ChatRequest, Message};
use crate::parameters::Catalog;
use crate::query::{DisplayParam, parse_display_params, query_pairs};
use crate::ranking::{ChatRoute, format_similarity};

/// Conversation about one school, rebuilt from the route on every page load
#[derive(Debug, Clone)]
pub struct ChatSession {
    school_name: String,
    similarity: Option<String>,
    image_url: Option<String>,
    query: String,
    search_params: Map<String, Value>,
    messages: Vec<Message>,
    loading: bool,
}

impl ChatSession {
    pub fn from_route(route: &ChatRoute) -> Self {
        let pairs = query_pairs(&route.query);
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let similarity = first("similarity");
        let image_url = first("imageUrl");

        // Later duplicates win, as when folding the pairs into an object.
        let mut search_params = Map::new();
        for (key, value) in &pairs {
            search_params.insert(key.clone(), Value::String(value.clone()));
        }

        Self {
            school_name: route.school.clone(),
            similarity,
            image_url,
            query: route.query.clone(),
            search_params,
            messages: Vec::new(),
            loading: false,
        }
    }

    /// Open from a `/chat/{school}?{query}` path.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::from_route(&ChatRoute::parse(path)?))
    }

    pub fn school_name(&self) -> &str {
        &self.school_name
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn similarity_badge(&self) -> Option<String> {
        let similarity: f64 = self.similarity.as_deref()?.parse().ok()?;
        Some(format!("Similarity: {}", format_similarity(similarity)))
    }

    /// Query details shown above the conversation.
    pub fn display_params(&self, catalog: &Catalog) -> Vec<DisplayParam> {
        parse_display_params(&self.query, catalog)
    }

    pub fn can_send(&self, input: &str) -> bool {
        !self.loading && !input.trim().is_empty()
    }

    /// Send one message. The user entry is appended before the request and
    /// removed again if the request fails or is abandoned. Blank input is a no-op.
    pub async fn send(&mut self, client: &BackendClient, input: &str) -> Result<Option<Message>> {
        if !self.can_send(input) {
            return Ok(None);
        }

        let user = Message::user(input);
        let mut history = self.messages.clone();
        history.push(user.clone());
        let request = ChatRequest {
            school_name: self.school_name.clone(),
            similarity: self.similarity.clone(),
            search_params: self.search_params.clone(),
            history,
            message: input.to_string(),
        };

        let pending = PendingSend::start(&mut self.messages, &mut self.loading, user);
        match client.chat(&request).await {
            Ok(content) => {
                let reply = Message::model(content);
                pending.commit(reply.clone());
                Ok(Some(reply))
            }
            Err(e) => {
                tracing::error!(school = %self.school_name, "chat request failed: {}", e);
                Err(e)
            }
        }
    }
}

/// One in-flight exchange. Dropping it without `commit` takes the user
/// message back out and clears the loading flag.
struct PendingSend<'a> {
    messages: &'a mut Vec<Message>,
    loading: &'a mut bool,
    committed: bool,
}

impl<'a> PendingSend<'a> {
    fn start(messages: &'a mut Vec<Message>, loading: &'a mut bool, user: Message) -> Self {
        messages.push(user);
        *loading = true;
        Self {
            messages,
            loading,
            committed: false,
        }
    }

    fn commit(mut self, reply: Message) {
        self.messages.push(reply);
        self.committed = true;
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        *self.loading = false;
        if !self.committed {
            self.messages.pop();
        }
    }
}
