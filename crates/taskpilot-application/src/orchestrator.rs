//! The chat workflow: confirmation gating, dispatch, reconciliation.
//!
//! `ChatOrchestrator` owns the transcript for the active conversation
//! and runs every turn through the same sequence: screen the input for
//! destructive intent, append the user message optimistically, call
//! the assistant endpoint, then reconcile the reply (or a classified
//! failure) back into local state. The user's message is always
//! visible before the assistant's reply or error arrives.

use std::sync::Arc;
use taskpilot_core::chat::{
    ChatMode, PendingDelete, detect_destructive_intent, validate_chat_message,
};
use taskpilot_core::conversation::{ConversationSummary, Message, MessageRole};
use taskpilot_core::error::{ApiError, Result};
use taskpilot_core::gateway::ChatGateway;
use taskpilot_infrastructure::ChatStateStore;
use uuid::Uuid;

/// A failed chat turn, kept for the dismissible banner and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFailure {
    /// The classified gateway error.
    pub error: ApiError,
    /// The user-facing message appended to the transcript.
    pub message: String,
}

impl ChatFailure {
    /// Unauthorized failures get no banner or retry; the session is
    /// already gone and the route guard takes over.
    pub fn offers_retry(&self) -> bool {
        !self.error.is_unauthorized()
    }
}

/// Outcome of feeding one line of user input into the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A destructive command was intercepted; confirmation is pending.
    ConfirmationRequested,
    /// The turn ran to completion (reply or error entry appended).
    Completed,
}

/// Drives the chat-with-the-assistant workflow for one view.
pub struct ChatOrchestrator {
    gateway: Arc<dyn ChatGateway>,
    prefs: ChatStateStore,
    conversation_id: Option<i64>,
    messages: Vec<Message>,
    conversations: Vec<ConversationSummary>,
    pending_delete: Option<PendingDelete>,
    last_failure: Option<ChatFailure>,
    in_flight: bool,
}

impl ChatOrchestrator {
    /// Creates an orchestrator restoring the persisted active
    /// conversation id; the transcript itself is loaded by
    /// [`ChatOrchestrator::initialize`].
    pub fn new(gateway: Arc<dyn ChatGateway>, prefs: ChatStateStore) -> Self {
        let conversation_id = prefs.active_conversation();
        Self {
            gateway,
            prefs,
            conversation_id,
            messages: Vec::new(),
            conversations: Vec::new(),
            pending_delete: None,
            last_failure: None,
            in_flight: false,
        }
    }

    /// Loads the restored conversation's transcript and the
    /// conversation list. Failures are logged and leave the
    /// corresponding state empty rather than blocking startup.
    pub async fn initialize(&mut self) {
        if let Some(conversation_id) = self.conversation_id {
            match self.gateway.conversation_messages(conversation_id).await {
                Ok(messages) => self.messages = messages,
                Err(e) => tracing::warn!("failed to restore conversation {conversation_id}: {e}"),
            }
        }
        self.refresh_conversations().await;
    }

    // ===== Accessors =====

    /// The transcript of the active conversation, chronological.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Cached conversation summaries, most-recently-updated first.
    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    /// The active conversation id, absent for a fresh conversation.
    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    /// The current workflow mode, derived from pending state.
    pub fn mode(&self) -> ChatMode {
        if self.in_flight {
            ChatMode::AwaitingAssistant
        } else if let Some(pending) = &self.pending_delete {
            ChatMode::AwaitingDeleteConfirmation {
                pending: pending.clone(),
            }
        } else {
            ChatMode::Idle
        }
    }

    /// The delete awaiting confirmation, if any.
    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    /// The most recent turn failure, if it has not been dismissed.
    pub fn last_failure(&self) -> Option<&ChatFailure> {
        self.last_failure.as_ref()
    }

    /// Dismisses the failure banner.
    pub fn dismiss_failure(&mut self) {
        self.last_failure = None;
    }

    /// The model turns are sent with.
    pub fn selected_model(&self) -> String {
        self.prefs.selected_model()
    }

    /// Persists a new model selection.
    pub fn select_model(&mut self, model: &str) {
        if let Err(e) = self.prefs.set_selected_model(model) {
            tracing::warn!("failed to persist model selection: {e}");
        }
    }

    // ===== Turn handling =====

    /// Feeds one line of user input into the workflow.
    ///
    /// Destructive commands with an extractable task id park in the
    /// confirmation gate instead of being sent; a newly detected
    /// intent replaces any pending one. Everything else is dispatched
    /// as a normal turn.
    pub async fn handle_input(&mut self, content: &str) -> Result<TurnOutcome> {
        validate_chat_message(content)?;

        if let Some(task_id) = detect_destructive_intent(content) {
            self.pending_delete = Some(PendingDelete::new(Uuid::new_v4().to_string(), task_id));
            return Ok(TurnOutcome::ConfirmationRequested);
        }

        self.dispatch(content.to_string(), Message::user(content))
            .await;
        Ok(TurnOutcome::Completed)
    }

    /// Confirms the pending delete: records the confirmation in the
    /// transcript and forwards the delete instruction as a normal
    /// turn. A no-op when nothing is pending.
    pub async fn confirm_pending_delete(&mut self) -> Result<TurnOutcome> {
        let Some(pending) = self.pending_delete.take() else {
            return Ok(TurnOutcome::Completed);
        };
        let visible = Message::user(format!("Yes, delete {}", pending.task_label));
        let outgoing = format!("Delete {}", pending.task_label);
        self.dispatch(outgoing, visible).await;
        Ok(TurnOutcome::Completed)
    }

    /// Cancels the pending delete: records the cancellation in the
    /// transcript and sends nothing to the backend.
    pub fn cancel_pending_delete(&mut self) {
        if self.pending_delete.take().is_some() {
            self.messages
                .push(Message::user("No, cancel that delete request"));
        }
    }

    /// Re-submits the most recent user-authored message through the
    /// normal-turn path. Confirmation gating is not replayed. Returns
    /// false when there is nothing to retry.
    pub async fn retry(&mut self) -> bool {
        let Some(content) = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
        else {
            return false;
        };
        let visible = Message::user(content.clone());
        self.dispatch(content, visible).await;
        true
    }

    /// Runs one turn: optimistic append, dispatch, reconciliation.
    async fn dispatch(&mut self, outgoing: String, visible: Message) {
        // The user message is visible before the call resolves
        self.messages.push(visible);
        self.last_failure = None;
        self.in_flight = true;

        let result = self
            .gateway
            .send_message(&outgoing, self.conversation_id, &self.prefs.selected_model())
            .await;

        match result {
            Ok(response) => {
                if self.conversation_id != Some(response.conversation_id) {
                    self.adopt_conversation(response.conversation_id);
                }
                self.messages.push(Message::assistant(response.response));
                self.refresh_conversations().await;
            }
            Err(error) => {
                let message = user_message_for(&error);
                self.messages.push(Message::assistant(message.clone()));
                self.last_failure = Some(ChatFailure { error, message });
            }
        }

        self.in_flight = false;
    }

    fn adopt_conversation(&mut self, conversation_id: i64) {
        self.conversation_id = Some(conversation_id);
        if let Err(e) = self.prefs.set_active_conversation(conversation_id) {
            tracing::warn!("failed to persist active conversation: {e}");
        }
    }

    // ===== Conversation management =====

    /// Reloads the conversation list. Failures keep the previous list.
    pub async fn refresh_conversations(&mut self) {
        match self.gateway.list_conversations().await {
            Ok(conversations) => self.conversations = conversations,
            Err(e) => tracing::warn!("failed to load conversations: {e}"),
        }
    }

    /// Switches to another conversation, replacing the transcript
    /// wholesale and persisting the new active id.
    pub async fn select_conversation(&mut self, conversation_id: i64) -> Result<()> {
        let messages = self.gateway.conversation_messages(conversation_id).await?;
        self.conversation_id = Some(conversation_id);
        self.messages = messages;
        self.pending_delete = None;
        self.last_failure = None;
        if let Err(e) = self.prefs.set_active_conversation(conversation_id) {
            tracing::warn!("failed to persist active conversation: {e}");
        }
        Ok(())
    }

    /// Starts a fresh conversation: clears the transcript and forgets
    /// the persisted active id.
    pub fn new_conversation(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
        self.pending_delete = None;
        self.last_failure = None;
        if let Err(e) = self.prefs.clear_active_conversation() {
            tracing::warn!("failed to clear active conversation: {e}");
        }
    }

    /// Deletes a conversation server-side. Deleting the active one
    /// resets to a fresh conversation; the list is reloaded either
    /// way. The caller is responsible for confirming with the user.
    pub async fn delete_conversation(&mut self, conversation_id: i64) -> Result<()> {
        self.gateway.delete_conversation(conversation_id).await?;
        if self.conversation_id == Some(conversation_id) {
            self.new_conversation();
        }
        self.refresh_conversations().await;
        Ok(())
    }
}

/// Maps a classified failure to the message shown in the transcript.
///
/// Validation details echo the user's own input and are safe to show;
/// server errors and unknowns stay generic.
pub fn user_message_for(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => "Your session has expired. Please log in again.".into(),
        ApiError::Forbidden { .. } => {
            "You do not have permission to perform this action.".into()
        }
        ApiError::Validation { message } => message.clone(),
        ApiError::Server => "Server error. Please try again later.".into(),
        ApiError::Unknown { message }
            if message.contains("Too Many Requests") || message.contains("Rate limit") =>
        {
            "Rate limit exceeded. Please wait a moment before trying again.".into()
        }
        _ => "Sorry, I encountered an error processing your request. Please try again.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use taskpilot_core::gateway::{ChatResponse, ToolCall};
    use taskpilot_infrastructure::TaskpilotPaths;
    use tempfile::TempDir;

    /// Scripted gateway that records every outgoing turn.
    #[derive(Default)]
    struct MockGateway {
        sent: Mutex<Vec<(String, Option<i64>, String)>>,
        responses: Mutex<Vec<Result<ChatResponse>>>,
        conversations: Mutex<Vec<ConversationSummary>>,
        list_calls: Mutex<usize>,
        transcripts: Mutex<Vec<Message>>,
        deleted: Mutex<Vec<i64>>,
    }

    impl MockGateway {
        fn with_response(response: Result<ChatResponse>) -> Self {
            let mock = Self::default();
            mock.responses.lock().unwrap().push(response);
            mock
        }

        fn push_response(&self, response: Result<ChatResponse>) {
            self.responses.lock().unwrap().push(response);
        }

        fn sent(&self) -> Vec<(String, Option<i64>, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn list_calls(&self) -> usize {
            *self.list_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatGateway for MockGateway {
        async fn send_message(
            &self,
            message: &str,
            conversation_id: Option<i64>,
            model: &str,
        ) -> Result<ChatResponse> {
            self.sent.lock().unwrap().push((
                message.to_string(),
                conversation_id,
                model.to_string(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ApiError::Server))
        }

        async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
            *self.list_calls.lock().unwrap() += 1;
            Ok(self.conversations.lock().unwrap().clone())
        }

        async fn conversation_messages(&self, _conversation_id: i64) -> Result<Vec<Message>> {
            Ok(self.transcripts.lock().unwrap().clone())
        }

        async fn delete_conversation(&self, conversation_id: i64) -> Result<()> {
            self.deleted.lock().unwrap().push(conversation_id);
            Ok(())
        }
    }

    fn reply(conversation_id: i64, text: &str) -> ChatResponse {
        ChatResponse {
            conversation_id,
            response: text.to_string(),
            tool_calls: vec![],
        }
    }

    fn orchestrator_with(
        gateway: Arc<MockGateway>,
        dir: &TempDir,
    ) -> ChatOrchestrator {
        let prefs = ChatStateStore::new(&TaskpilotPaths::with_root(dir.path()));
        ChatOrchestrator::new(gateway, prefs)
    }

    fn user_messages(orchestrator: &ChatOrchestrator) -> Vec<&str> {
        orchestrator
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_destructive_input_parks_in_the_gate() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        let outcome = orchestrator
            .handle_input("please delete task 42")
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::ConfirmationRequested);
        assert_eq!(orchestrator.pending_delete().unwrap().task_id, 42);
        // Nothing sent, nothing appended
        assert!(gateway.sent().is_empty());
        assert!(orchestrator.messages().is_empty());
    }

    #[tokio::test]
    async fn test_destructive_input_without_id_is_a_normal_turn() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(reply(1, "which task?"))));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        let outcome = orchestrator.handle_input("delete it").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert!(orchestrator.pending_delete().is_none());
        assert_eq!(gateway.sent().len(), 1);
        assert_eq!(gateway.sent()[0].0, "delete it");
    }

    #[tokio::test]
    async fn test_trailing_intent_phrasing_is_gated() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway, &dir);

        orchestrator
            .handle_input("task 7 please remove")
            .await
            .unwrap();
        assert_eq!(orchestrator.pending_delete().unwrap().task_id, 7);
    }

    #[tokio::test]
    async fn test_mode_tracks_the_confirmation_gate() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway, &dir);

        assert_eq!(orchestrator.mode(), ChatMode::Idle);
        orchestrator.handle_input("delete task 42").await.unwrap();
        assert_eq!(orchestrator.mode().pending_delete().unwrap().task_id, 42);
        orchestrator.cancel_pending_delete();
        assert_eq!(orchestrator.mode(), ChatMode::Idle);
    }

    #[tokio::test]
    async fn test_new_intent_replaces_pending_one() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway, &dir);

        orchestrator.handle_input("delete task 42").await.unwrap();
        orchestrator.handle_input("no wait, remove task 7").await.unwrap();

        assert_eq!(orchestrator.pending_delete().unwrap().task_id, 7);
    }

    #[tokio::test]
    async fn test_confirm_path_sends_exactly_one_instruction() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(reply(5, "Deleted task 42"))));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.handle_input("delete task 42").await.unwrap();
        orchestrator.confirm_pending_delete().await.unwrap();

        assert!(orchestrator.pending_delete().is_none());
        assert_eq!(user_messages(&orchestrator), vec!["Yes, delete Task 42"]);
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Delete Task 42");
    }

    #[tokio::test]
    async fn test_cancel_path_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.handle_input("delete task 42").await.unwrap();
        orchestrator.cancel_pending_delete();

        assert!(orchestrator.pending_delete().is_none());
        assert_eq!(
            user_messages(&orchestrator),
            vec!["No, cancel that delete request"]
        );
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_adopts_and_persists_new_conversation_id() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(reply(17, "hello"))));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        assert!(orchestrator.conversation_id().is_none());
        orchestrator.handle_input("hi there").await.unwrap();
        assert_eq!(orchestrator.conversation_id(), Some(17));

        // Subsequent turns carry the adopted id
        gateway.push_response(Ok(reply(17, "again")));
        orchestrator.handle_input("another message").await.unwrap();
        assert_eq!(gateway.sent()[1].1, Some(17));

        // A simulated reload restores it from durable storage
        let restored = orchestrator_with(gateway, &dir);
        assert_eq!(restored.conversation_id(), Some(17));
    }

    #[tokio::test]
    async fn test_successful_turn_reconciles_state() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(ChatResponse {
            conversation_id: 3,
            response: "Added task: buy milk".into(),
            tool_calls: vec![ToolCall {
                tool: "add_task".into(),
                status: "success".into(),
                task_id: Some(9),
            }],
        })));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator
            .handle_input("Add task: buy milk")
            .await
            .unwrap();

        let messages = orchestrator.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Add task: buy milk");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Added task: buy milk");
        assert_eq!(orchestrator.conversation_id(), Some(3));
        // The list reload is triggered exactly once
        assert_eq!(gateway.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_turn_appends_error_and_offers_retry() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Err(ApiError::Server)));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.handle_input("hello").await.unwrap();

        let messages = orchestrator.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Server error. Please try again later.");

        let failure = orchestrator.last_failure().unwrap();
        assert!(failure.offers_retry());

        // Retry re-issues the same user content exactly once
        gateway.push_response(Ok(reply(1, "better now")));
        assert!(orchestrator.retry().await);
        let sent = gateway.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, "hello");
        assert!(orchestrator.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_failure_offers_no_retry() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Err(ApiError::Unauthorized)));
        let mut orchestrator = orchestrator_with(gateway, &dir);

        orchestrator.handle_input("hello").await.unwrap();

        let failure = orchestrator.last_failure().unwrap();
        assert!(!failure.offers_retry());
        assert_eq!(
            failure.message,
            "Your session has expired. Please log in again."
        );
    }

    #[tokio::test]
    async fn test_retry_with_empty_transcript_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        assert!(!orchestrator.retry().await);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_turns_are_sent_with_the_selected_model() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(reply(1, "ok"))));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.select_model("gemini-2.0-flash");
        orchestrator.handle_input("hi").await.unwrap();
        assert_eq!(gateway.sent()[0].2, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn test_deleting_active_conversation_resets_to_new() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::with_response(Ok(reply(4, "ok"))));
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.handle_input("hi").await.unwrap();
        assert_eq!(orchestrator.conversation_id(), Some(4));

        orchestrator.delete_conversation(4).await.unwrap();
        assert!(orchestrator.conversation_id().is_none());
        assert!(orchestrator.messages().is_empty());
        assert_eq!(*gateway.deleted.lock().unwrap(), vec![4]);

        // Deleting a non-active conversation leaves the transcript alone
        gateway.push_response(Ok(reply(6, "ok")));
        orchestrator.handle_input("hi again").await.unwrap();
        orchestrator.delete_conversation(99).await.unwrap();
        assert_eq!(orchestrator.conversation_id(), Some(6));
        assert!(!orchestrator.messages().is_empty());
    }

    #[tokio::test]
    async fn test_select_conversation_replaces_transcript_wholesale() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        gateway.transcripts.lock().unwrap().extend([
            Message::user("old question"),
            Message::assistant("old answer"),
        ]);
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        orchestrator.handle_input("delete task 1").await.unwrap();
        orchestrator.select_conversation(8).await.unwrap();

        assert_eq!(orchestrator.conversation_id(), Some(8));
        assert_eq!(orchestrator.messages().len(), 2);
        // Switching clears transient gate state
        assert!(orchestrator.pending_delete().is_none());

        // The new active id survives a reload
        let restored = orchestrator_with(gateway, &dir);
        assert_eq!(restored.conversation_id(), Some(8));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_locally() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut orchestrator = orchestrator_with(gateway.clone(), &dir);

        let err = orchestrator.handle_input("   ").await.unwrap_err();
        assert!(err.is_validation());
        assert!(gateway.sent().is_empty());
    }

    #[test]
    fn test_error_message_mapping() {
        assert_eq!(
            user_message_for(&ApiError::forbidden("Access denied")),
            "You do not have permission to perform this action."
        );
        assert_eq!(
            user_message_for(&ApiError::validation("message too long")),
            "message too long"
        );
        assert_eq!(
            user_message_for(&ApiError::unknown("Too Many Requests")),
            "Rate limit exceeded. Please wait a moment before trying again."
        );
        assert_eq!(
            user_message_for(&ApiError::not_found("Conversation 9 not found")),
            "Sorry, I encountered an error processing your request. Please try again."
        );
    }
}
