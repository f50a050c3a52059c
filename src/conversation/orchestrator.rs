//! Conversation orchestrator
//!
//! Top-level entry point for conversation operations: wires the store, the
//! LRU cache, and the context builder to the model lifecycle manager, and
//! turns a user message into a streamed assistant response.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::conversation::cache::ConversationCache;
use crate::conversation::context::ContextBuilder;
use crate::conversation::store::ConversationStore;
use crate::error::{Error, Result};
use crate::inference::{GenerationParams, ModelLifecycleManager};
use crate::types::{Conversation, ConversationSummary, Message, Role};

const STREAM_BUFFER: usize = 32;

/// Fallback title when the first user message is empty.
const DEFAULT_TITLE: &str = "New Conversation";

/// Coordinates conversation state and response generation.
///
/// Cheap to clone; clones share the cache and the lifecycle manager.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    store: ConversationStore,
    cache: Arc<ConversationCache>,
    context: ContextBuilder,
    models: Arc<ModelLifecycleManager>,
    /// Upper bound applied to any model's context window
    max_context_length: u32,
    /// Per-conversation write locks. Every read-modify-write cycle holds
    /// the conversation's lock across its await points: the assistant
    /// persist task is a second writer racing caller-side appends.
    write_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl ConversationOrchestrator {
    pub fn new(
        store: ConversationStore,
        cache: ConversationCache,
        context: ContextBuilder,
        models: Arc<ModelLifecycleManager>,
        max_context_length: u32,
    ) -> Self {
        Self {
            store,
            cache: Arc::new(cache),
            context,
            models,
            max_context_length,
            write_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Handle to the write lock for `id`, created on first use and dropped
    /// when the conversation is deleted.
    async fn write_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .await
            .entry(id)
            .or_default()
            .clone()
    }

    /// Create a new empty conversation, persist it, and cache it.
    pub async fn create(
        &self,
        title: Option<String>,
        model_name: Option<String>,
    ) -> Result<Conversation> {
        let model_name = match model_name {
            Some(name) => Some(name),
            None => self.models.current_model().await,
        };
        let conversation = Conversation::new(title, model_name);
        self.store.save(&conversation).await?;
        self.cache.insert(conversation.clone()).await;

        tracing::info!(conversation = %conversation.id, "created conversation");
        Ok(conversation)
    }

    /// Fetch a conversation: cache hit renews recency; a miss falls back to
    /// the durable store and populates the cache.
    pub async fn get(&self, id: Uuid) -> Result<Option<Conversation>> {
        if let Some(conversation) = self.cache.get(id).await {
            return Ok(Some(conversation));
        }

        match self.store.load(id).await? {
            Some(conversation) => {
                self.cache.insert(conversation.clone()).await;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    /// Append a message, computing its token count and persisting the full
    /// conversation snapshot.
    pub async fn add_message(
        &self,
        id: Uuid,
        role: Role,
        content: &str,
        metadata: Option<BTreeMap<String, serde_json::Value>>,
    ) -> Result<Message> {
        let (message, _) = self.append(id, role, content, metadata).await?;
        Ok(message)
    }

    async fn append(
        &self,
        id: Uuid,
        role: Role,
        content: &str,
        metadata: Option<BTreeMap<String, serde_json::Value>>,
    ) -> Result<(Message, Conversation)> {
        let lock = self.write_lock(id).await;
        let _guard = lock.lock().await;

        let mut conversation = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation {id}")))?;

        let token_count = self.context.estimator().count(content);
        let mut message = Message::new(role, content, token_count);
        if let Some(metadata) = metadata {
            message = message.with_metadata(metadata);
        }

        conversation.push_message(message.clone());

        // Auto-title from the first user message.
        if conversation.title.is_none()
            && role == Role::User
            && conversation.messages.len() == 1
        {
            conversation.title = Some(derive_title(content));
        }

        self.cache.insert(conversation.clone()).await;
        self.store.save(&conversation).await?;

        tracing::debug!(conversation = %id, role = role.label(), "appended message");
        Ok((message, conversation))
    }

    pub async fn update_title(&self, id: Uuid, title: impl Into<String>) -> Result<bool> {
        let lock = self.write_lock(id).await;
        let _guard = lock.lock().await;

        let Some(mut conversation) = self.get(id).await? else {
            return Ok(false);
        };
        conversation.title = Some(title.into());
        conversation.touch();

        self.cache.insert(conversation.clone()).await;
        self.store.save(&conversation).await?;
        Ok(true)
    }

    /// Delete a conversation, purging its cache entry.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.write_locks.lock().await.remove(&id);
        self.cache.remove(id).await;
        self.store.delete(id).await
    }

    /// Summaries of all conversations, most recently updated first.
    pub async fn list(&self) -> Result<Vec<ConversationSummary>> {
        self.store.list().await
    }

    /// Summary of a single conversation.
    pub async fn conversation_context(&self, id: Uuid) -> Result<Option<ConversationSummary>> {
        Ok(self.get(id).await?.map(|c| c.summary()))
    }

    /// Generate an assistant response for `user_message` in conversation
    /// `id` (created if absent).
    ///
    /// The user message is appended first, then a token-budgeted prompt is
    /// built from the full history and handed to the lifecycle manager.
    /// With `stream` set, fragments are relayed as they arrive; otherwise
    /// one complete string is yielded at the end. Generation continues
    /// server-side if the consumer goes away, and the accumulated assistant
    /// message (including any in-band error marker) is persisted once the
    /// underlying stream is exhausted.
    pub async fn generate_response(
        &self,
        id: Uuid,
        user_message: &str,
        model_name: Option<String>,
        stream: bool,
        params: GenerationParams,
    ) -> Result<ReceiverStream<String>> {
        let conversation = match self.get(id).await? {
            Some(conversation) => conversation,
            None => self.create(None, model_name.clone()).await?,
        };
        let id = conversation.id;

        let (_, conversation) = self.append(id, Role::User, user_message, None).await?;

        let target = model_name.or_else(|| conversation.model_name.clone());
        let context_length = self.effective_context_length(target.as_deref()).await;
        let prompt = self.context.build(&conversation.messages, context_length);

        let mut upstream = self.models.generate_stream(prompt.text, target, params).await;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut response = String::new();
            while let Some(fragment) = upstream.next().await {
                response.push_str(&fragment);
                if stream {
                    // A disconnected consumer must not stop generation: the
                    // send failure is ignored and the upstream is drained so
                    // the assistant message still gets persisted.
                    let _ = tx.send(fragment).await;
                }
            }
            if !stream {
                let _ = tx.send(response.clone()).await;
            }

            let response = response.trim();
            if !response.is_empty() {
                if let Err(e) = orchestrator
                    .add_message(id, Role::Assistant, response, None)
                    .await
                {
                    tracing::error!(
                        conversation = %id,
                        error = %e,
                        "failed to persist assistant message"
                    );
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Context window for prompt building: the target model's declared
    /// window capped by the configured maximum.
    async fn effective_context_length(&self, target: Option<&str>) -> u32 {
        let name = match target {
            Some(name) => Some(name.to_string()),
            None => self.models.current_model().await,
        };
        name.and_then(|n| {
            self.models
                .registry()
                .get(&n)
                .ok()
                .map(|p| p.context_length)
        })
        .unwrap_or(self.max_context_length)
        .min(self.max_context_length)
    }
}

/// Derive a conversation title from the first user message: the first six
/// whitespace-collapsed words, truncated to 50 characters with an ellipsis.
fn derive_title(content: &str) -> String {
    let title = content
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    if title.chars().count() > 50 {
        let truncated: String = title.chars().take(47).collect();
        format!("{truncated}...")
    } else {
        title
    }
}
