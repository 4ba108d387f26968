//! services/api/src/adapters/optimizer_llm.rs
//!
//! This module contains the adapter for the chore-scheduling LLM.
//! It implements the `ScheduleOptimizerService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use dormduty_core::{
    domain::{Schedule, Task},
    ports::{PortError, PortResult, ScheduleOptimizerService},
};
use serde_json::json;

const SYSTEM_PROMPT: &str = "You plan weekly chores for a shared dorm room. \
You receive each roommate's weekly time slots (busy slots are unavailable) and their \
preferences, plus the list of open chores. Assign every chore to exactly one roommate \
inside one of that roommate's free slots, spreading the work fairly. \
Respond with a JSON object of the form {\"assignments\": [{\"taskId\": \"<uuid>\", \
\"userId\": \"<uuid>\", \"day\": \"Mon\", \"start\": \"HH:MM:SS\", \"end\": \"HH:MM:SS\"}]} \
and nothing else.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ScheduleOptimizerService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiScheduleAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiScheduleAdapter {
    /// Creates a new `OpenAiScheduleAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Renders the roommates and chores as the user message.
fn build_prompt(schedules: &[Schedule], tasks: &[Task]) -> String {
    let roommates: Vec<_> = schedules
        .iter()
        .map(|s| {
            json!({
                "userId": s.user_id,
                "name": s.user_name,
                "preferences": s.preferences,
                "slots": s.slots,
            })
        })
        .collect();
    let chores: Vec<_> = tasks
        .iter()
        .map(|t| {
            json!({
                "taskId": t.id,
                "title": t.title,
                "priority": t.priority,
                "dueDate": t.due_date,
            })
        })
        .collect();
    format!(
        "ROOMMATES: {}\n\nCHORES: {}",
        serde_json::Value::from(roommates),
        serde_json::Value::from(chores)
    )
}

//=========================================================================================
// `ScheduleOptimizerService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ScheduleOptimizerService for OpenAiScheduleAdapter {
    async fn suggest_assignments(&self, schedules: &[Schedule], tasks: &[Task]) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(schedules, tasks))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Schedule LLM response contained no text content.".to_string())
            })
    }
}
