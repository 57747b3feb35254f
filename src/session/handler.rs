//! Conversation handler implementation.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::render;
use super::responder::{DeliveryError, Responder};
use super::store::SessionStore;
use super::throttle::EditThrottle;
use super::types::{ChatEvent, Rejection, Server, SessionMode, UserId};
use crate::config::ServiceSettings;
use crate::credentials::CredentialSource;
use crate::pipeline::BatchPipeline;
use crate::remote::TokenClient;
use crate::sink::ResultSink;

/// File name prefix of stored uploads.
const UPLOAD_PREFIX: &str = "credentials-";

/// Drives each user's conversation from `/start` to the token file.
pub struct ConversationHandler<C> {
    /// Service settings (output directory, bot profile, edit pacing).
    settings: ServiceSettings,

    /// Batch pipeline over the token client.
    pipeline: BatchPipeline<C>,

    /// Per-user sessions.
    sessions: RwLock<SessionStore>,
}

impl<C: TokenClient> ConversationHandler<C> {
    /// Creates a new conversation handler.
    #[must_use]
    pub fn new(settings: ServiceSettings, client: C) -> Self {
        Self {
            pipeline: BatchPipeline::new(client),
            sessions: RwLock::new(SessionStore::new(settings.session_idle_timeout())),
            settings,
        }
    }

    /// Returns the user's current mode.
    pub async fn mode(&self, user: UserId) -> SessionMode {
        self.sessions.read().await.mode(user)
    }

    /// Handles one event from a user.
    ///
    /// Rejections are answered through `out` and leave the session in a
    /// reusable state; only transport failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the responder fails to deliver a message.
    pub async fn handle(
        &self,
        user: UserId,
        event: ChatEvent,
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        debug!("Handling {} event from user {}", event.name(), user);

        let expired = self.sessions.write().await.expire_idle();
        if expired > 0 {
            info!("Dropped {} idle sessions", expired);
        }

        if self.mode(user).await == SessionMode::Processing {
            return reject(out, Rejection::Busy).await;
        }

        match event {
            ChatEvent::Start => self.handle_start(user, out).await,
            ChatEvent::CheckChannel => self.handle_check_channel(user, out).await,
            ChatEvent::SelectServer(server) => self.handle_select_server(user, server, out).await,
            ChatEvent::Document { file_name, bytes } => {
                self.handle_document(user, &file_name, &bytes, out).await
            }
            ChatEvent::Text(text) => self.handle_text(user, &text, out).await,
        }
    }

    async fn handle_start(&self, user: UserId, out: &dyn Responder) -> Result<(), DeliveryError> {
        self.sessions.write().await.clear(user);

        out.send_text(&render::welcome(&self.settings)).await?;
        let (text, rows) = render::channel_gate(&self.settings);
        out.send_keyboard(&text, &rows).await?;
        Ok(())
    }

    async fn handle_check_channel(
        &self,
        user: UserId,
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions.entry(user);
            session.reset();
            session.mode = SessionMode::AwaitingServerChoice;
        }

        let (text, rows) = render::server_choice();
        out.send_keyboard(&text, &rows).await?;
        Ok(())
    }

    async fn handle_select_server(
        &self,
        user: UserId,
        server: Server,
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions.entry(user);
            session.reset();
            session.server = Some(server);
            session.mode = SessionMode::AwaitingFile;
        }

        info!("User {} selected the {} server", user, server);
        out.send_text(&render::upload_prompt(server)).await?;
        Ok(())
    }

    async fn handle_document(
        &self,
        user: UserId,
        file_name: &str,
        bytes: &[u8],
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        if self.mode(user).await != SessionMode::AwaitingFile {
            return reject(out, Rejection::NoServerSelected).await;
        }

        if !has_json_extension(file_name) {
            return reject(out, Rejection::InvalidFileType).await;
        }

        let valid_accounts = CredentialSource::count_valid(bytes);
        if valid_accounts == 0 {
            self.sessions.write().await.entry(user).reset();
            return reject(out, Rejection::NoValidRecords).await;
        }

        let upload = match store_upload(&self.settings.upload_dir, bytes) {
            Ok(upload) => upload,
            Err(e) => {
                warn!("Could not store upload for user {}: {}", user, e);
                return reject(out, Rejection::UploadFailed).await;
            }
        };

        self.sessions
            .write()
            .await
            .entry(user)
            .attach_upload(upload, valid_accounts);

        info!("User {} uploaded {} with {} valid accounts", user, file_name, valid_accounts);
        out.send_text(&render::count_prompt(valid_accounts)).await?;
        Ok(())
    }

    async fn handle_text(
        &self,
        user: UserId,
        text: &str,
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        let (upload, bound, server) = {
            let mut sessions = self.sessions.write().await;
            if sessions.mode(user) != SessionMode::AwaitingCount {
                drop(sessions);
                return reject(out, Rejection::NoUpload).await;
            }

            let session = sessions.entry(user);
            let bound = match parse_bound(text, session.valid_accounts) {
                Ok(bound) => bound,
                Err(rejection) => {
                    drop(sessions);
                    return reject(out, rejection).await;
                }
            };

            let server = session.server.unwrap_or(Server::Ind);
            match session.take_upload() {
                Some(upload) => {
                    session.mode = SessionMode::Processing;
                    (upload, bound, server)
                }
                None => {
                    sessions.clear(user);
                    drop(sessions);
                    return reject(out, Rejection::UploadMissing).await;
                }
            }
        };

        let result = self.run_batch(user, &upload, bound, server, out).await;

        // Clearing the session and dropping the upload removes the temp file
        // on every exit path, including delivery errors.
        self.sessions.write().await.clear(user);
        drop(upload);

        result
    }

    async fn run_batch(
        &self,
        user: UserId,
        upload: &NamedTempFile,
        bound: usize,
        server: Server,
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        let raw = match tokio::fs::read(upload.path()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Upload for user {} disappeared: {}", user, e);
                return reject(out, Rejection::UploadMissing).await;
            }
        };

        info!("User {} requested {} tokens from the {} server", user, bound, server);

        let processing_msg = out.send_text(render::PROCESSING).await?;
        let mut last_line = render::progress_bar(0);
        let progress_msg = out.send_text(&last_line).await?;

        let throttle = EditThrottle::new(self.settings.progress_interval());
        let mut run = self.pipeline.run_raw(&raw, bound);

        while let Some(snapshot) = run.next_snapshot().await {
            let line = render::snapshot_line(&snapshot);
            if line == last_line {
                continue;
            }

            throttle.wait_and_acquire().await;
            if let Err(e) = out.edit_text(progress_msg, &line).await {
                warn!("Progress update failed: {}", e);
            }
            last_line = line;
        }

        let summary = run.finish().await;

        out.edit_text(processing_msg, render::COMPLETE).await?;
        out.edit_text(progress_msg, &render::final_results(&summary)).await?;

        if summary.state.tokens().is_empty() {
            return Ok(());
        }

        let sink = ResultSink::in_dir(
            &self.settings.output_dir,
            &format!("{}_{}", server.code(), user),
        );
        self.deliver(&sink, summary.state.tokens(), out).await
    }

    async fn deliver(
        &self,
        sink: &ResultSink,
        tokens: &[String],
        out: &dyn Responder,
    ) -> Result<(), DeliveryError> {
        let path = match sink.save(tokens) {
            Ok(path) => path,
            Err(e) => {
                warn!("{}", e);
                out.send_text(&format!("❌ {e}")).await?;
                return Ok(());
            }
        };

        let sent = out.send_document(&path, render::DOCUMENT_CAPTION).await;

        if let Err(e) = std::fs::remove_file(&path) {
            warn!("Failed to remove artifact {}: {}", path.display(), e);
        }

        sent
    }
}

impl<C> std::fmt::Debug for ConversationHandler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationHandler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

async fn reject(out: &dyn Responder, rejection: Rejection) -> Result<(), DeliveryError> {
    debug!("Rejected: {:?}", rejection);
    out.send_text(&rejection.to_string()).await?;
    Ok(())
}

/// Accepts `name.json` in any letter case.
fn has_json_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Parses the requested token count, which must lie in `1..=max`.
fn parse_bound(text: &str, max: usize) -> Result<usize, Rejection> {
    let requested: i64 = text.trim().parse().map_err(|_| Rejection::NotANumber)?;

    usize::try_from(requested)
        .ok()
        .filter(|&bound| bound > 0 && bound <= max)
        .ok_or(Rejection::InvalidBound { max })
}

fn store_upload(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut upload = tempfile::Builder::new()
        .prefix(UPLOAD_PREFIX)
        .suffix(".json")
        .tempfile_in(dir)?;
    upload.write_all(bytes)?;
    upload.flush()?;
    Ok(upload)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::remote::{FetchFailure, FetchOutcome};
    use crate::session::responder::MessageId;
    use crate::session::types::Button;

    const SAMPLE: &[u8] =
        br#"[{"uid":"a","password":"1"},{"uid":"b","password":""},{"uid":"c","password":"2"}]"#;
    const USER: UserId = UserId(42);

    struct StubClient;

    #[async_trait]
    impl TokenClient for StubClient {
        async fn fetch(&self, identifier: &str, _secret: &str) -> FetchOutcome {
            if identifier == "a" {
                FetchOutcome::success("token-for-a")
            } else {
                FetchOutcome::failure(FetchFailure::HttpStatus(500))
            }
        }
    }

    struct FailingClient;

    #[async_trait]
    impl TokenClient for FailingClient {
        async fn fetch(&self, _identifier: &str, _secret: &str) -> FetchOutcome {
            FetchOutcome::failure(FetchFailure::Timeout)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text(String),
        Keyboard(String, Vec<Vec<Button>>),
        Edit(MessageId, String),
        Document {
            path: PathBuf,
            content: String,
            caption: String,
        },
    }

    #[derive(Default)]
    struct RecordingResponder {
        sent: Mutex<Vec<Sent>>,
        next_id: AtomicI32,
        fail_progress_edits: AtomicBool,
        fail_documents: AtomicBool,
    }

    impl RecordingResponder {
        fn failing_progress_edits() -> Self {
            let out = Self::default();
            out.fail_progress_edits.store(true, Ordering::SeqCst);
            out
        }

        fn failing_documents() -> Self {
            let out = Self::default();
            out.fail_documents.store(true, Ordering::SeqCst);
            out
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn last_text(&self) -> Option<String> {
            self.sent().into_iter().rev().find_map(|sent| match sent {
                Sent::Text(text) => Some(text),
                _ => None,
            })
        }

        fn push(&self, sent: Sent) -> MessageId {
            self.sent.lock().unwrap().push(sent);
            MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[async_trait]
    impl Responder for RecordingResponder {
        async fn send_text(&self, text: &str) -> Result<MessageId, DeliveryError> {
            Ok(self.push(Sent::Text(text.to_owned())))
        }

        async fn send_keyboard(
            &self,
            text: &str,
            rows: &[Vec<Button>],
        ) -> Result<MessageId, DeliveryError> {
            Ok(self.push(Sent::Keyboard(text.to_owned(), rows.to_vec())))
        }

        async fn edit_text(&self, id: MessageId, text: &str) -> Result<(), DeliveryError> {
            if self.fail_progress_edits.load(Ordering::SeqCst) && text.starts_with("📊 Progress") {
                return Err(DeliveryError::Edit {
                    id,
                    message: "message is not modified".to_owned(),
                });
            }
            self.push(Sent::Edit(id, text.to_owned()));
            Ok(())
        }

        async fn send_document(&self, path: &Path, caption: &str) -> Result<(), DeliveryError> {
            if self.fail_documents.load(Ordering::SeqCst) {
                return Err(DeliveryError::Document {
                    path: path.display().to_string(),
                    message: "upload rejected".to_owned(),
                });
            }
            let content = std::fs::read_to_string(path).map_err(|e| DeliveryError::Document {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            self.push(Sent::Document {
                path: path.to_path_buf(),
                content,
                caption: caption.to_owned(),
            });
            Ok(())
        }
    }

    /// Settings writing uploads and artifacts into `dir`.
    fn settings(dir: &Path) -> ServiceSettings {
        ServiceSettings {
            output_dir: dir.to_path_buf(),
            upload_dir: dir.to_path_buf(),
            progress_interval_ms: 0,
            ..ServiceSettings::default()
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    async fn handler_awaiting_file<C: TokenClient>(
        client: C,
        settings: ServiceSettings,
        out: &RecordingResponder,
    ) -> ConversationHandler<C> {
        let handler = ConversationHandler::new(settings, client);
        handler.handle(USER, ChatEvent::Start, out).await.unwrap();
        handler.handle(USER, ChatEvent::CheckChannel, out).await.unwrap();
        handler
            .handle(USER, ChatEvent::SelectServer(Server::Ind), out)
            .await
            .unwrap();
        handler
    }

    fn document(name: &str, bytes: &[u8]) -> ChatEvent {
        ChatEvent::Document {
            file_name: name.to_owned(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_start_and_server_selection() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = ConversationHandler::new(settings(dir.path()), StubClient);

        handler.handle(USER, ChatEvent::Start, &out).await.unwrap();
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);

        handler.handle(USER, ChatEvent::CheckChannel, &out).await.unwrap();
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingServerChoice);

        handler
            .handle(USER, ChatEvent::SelectServer(Server::Ind), &out)
            .await
            .unwrap();
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingFile);

        let sent = out.sent();
        assert!(matches!(&sent[1], Sent::Keyboard(_, rows) if rows[0].len() == 2));
        assert!(matches!(&sent[2], Sent::Keyboard(_, rows) if rows[0][0].label().contains("IND")));
        assert!(out.last_text().unwrap().contains("IND Server"));
    }

    #[tokio::test]
    async fn test_full_batch_delivers_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;

        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingCount);
        assert!(out.last_text().unwrap().contains("Found 2 valid accounts"));

        handler
            .handle(USER, ChatEvent::Text(" 2 ".to_owned()), &out)
            .await
            .unwrap();

        let sent = out.sent();
        assert!(sent.contains(&Sent::Text(render::PROCESSING.to_owned())));
        assert!(sent.iter().any(|s| matches!(s, Sent::Edit(_, text) if text.ends_with("50%"))));
        assert!(sent.iter().any(|s| matches!(s, Sent::Edit(_, text) if text == render::COMPLETE)));
        assert!(sent.iter().any(|s| matches!(
            s,
            Sent::Edit(_, text) if text.contains("Success: 1") && text.contains("Failed: 1")
        )));

        let Some(Sent::Document { path, content, caption }) = sent.last().cloned() else {
            panic!("expected a document, got {:?}", sent.last());
        };
        assert_eq!(caption, render::DOCUMENT_CAPTION);
        assert!(content.contains("\"token\": \"token-for-a\""));
        assert!(!path.exists(), "artifact must be removed after delivery");
        assert!(files_in(dir.path()).is_empty(), "upload must be removed after the batch");

        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_no_document_when_nothing_collected() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(FailingClient, settings(dir.path()), &out).await;

        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();
        handler.handle(USER, ChatEvent::Text("2".to_owned()), &out).await.unwrap();

        let sent = out.sent();
        assert!(!sent.iter().any(|s| matches!(s, Sent::Document { .. })));
        assert!(sent.iter().any(|s| matches!(
            s,
            Sent::Edit(_, text) if text.contains("Success: 0") && text.contains("Failed: 2")
        )));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_non_json_upload_rejected_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;

        handler.handle(USER, document("accounts.txt", SAMPLE), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::InvalidFileType.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingFile);
        assert!(!out.sent().iter().any(|s| matches!(s, Sent::Text(t) if t.contains("Found"))));
    }

    #[tokio::test]
    async fn test_upload_without_server_selection() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = ConversationHandler::new(settings(dir.path()), StubClient);

        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::NoServerSelected.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_upload_without_valid_records_resets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;

        handler
            .handle(USER, document("accounts.json", br#"[{"uid":"a"}]"#), &out)
            .await
            .unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::NoValidRecords.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_out_of_range_count_keeps_mode() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;
        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        for input in ["0", "3", "-1"] {
            handler
                .handle(USER, ChatEvent::Text(input.to_owned()), &out)
                .await
                .unwrap();
            assert_eq!(
                out.last_text().unwrap(),
                Rejection::InvalidBound { max: 2 }.to_string()
            );
            assert_eq!(handler.mode(USER).await, SessionMode::AwaitingCount);
        }

        handler
            .handle(USER, ChatEvent::Text("lots".to_owned()), &out)
            .await
            .unwrap();
        assert_eq!(out.last_text().unwrap(), Rejection::NotANumber.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingCount);
    }

    #[tokio::test]
    async fn test_text_without_upload() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = ConversationHandler::new(settings(dir.path()), StubClient);

        handler.handle(USER, ChatEvent::Text("5".to_owned()), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::NoUpload.to_string());
    }

    #[tokio::test]
    async fn test_artifact_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServiceSettings {
            output_dir: dir.path().join("does-not-exist"),
            ..settings(dir.path())
        };
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings, &out).await;

        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();
        handler.handle(USER, ChatEvent::Text("2".to_owned()), &out).await.unwrap();

        assert!(out.last_text().unwrap().starts_with("❌ Error saving tokens"));
        assert!(!out.sent().iter().any(|s| matches!(s, Sent::Document { .. })));
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_deleted_before_count() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;
        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        let uploads = files_in(dir.path());
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].file_name().unwrap().to_string_lossy().starts_with(UPLOAD_PREFIX));
        std::fs::remove_file(&uploads[0]).unwrap();

        handler.handle(USER, ChatEvent::Text("2".to_owned()), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::UploadMissing.to_string());
        assert!(!out.sent().contains(&Sent::Text(render::PROCESSING.to_owned())));
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_count_without_stored_upload() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = ConversationHandler::new(settings(dir.path()), StubClient);
        {
            let mut sessions = handler.sessions.write().await;
            let session = sessions.entry(USER);
            session.mode = SessionMode::AwaitingCount;
            session.valid_accounts = 2;
        }

        handler.handle(USER, ChatEvent::Text("1".to_owned()), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::UploadMissing.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_failed_document_delivery_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::failing_documents();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;
        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        let result = handler.handle(USER, ChatEvent::Text("2".to_owned()), &out).await;

        assert!(matches!(result, Err(DeliveryError::Document { .. })));
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
        assert!(files_in(dir.path()).is_empty(), "artifact and upload must be removed");
    }

    #[tokio::test]
    async fn test_batch_continues_after_failed_progress_edit() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::failing_progress_edits();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;
        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        handler.handle(USER, ChatEvent::Text("2".to_owned()), &out).await.unwrap();

        let sent = out.sent();
        assert!(!sent.iter().any(|s| matches!(
            s,
            Sent::Edit(_, text) if text.starts_with("📊 Progress")
        )));
        assert!(sent.iter().any(|s| matches!(s, Sent::Edit(_, text) if text == render::COMPLETE)));
        assert!(matches!(sent.last(), Some(Sent::Document { .. })));
        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_upload_that_cannot_be_stored() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServiceSettings {
            upload_dir: dir.path().join("does-not-exist"),
            ..settings(dir.path())
        };
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings, &out).await;

        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::UploadFailed.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingFile);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_session_expires() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServiceSettings {
            session_idle_secs: 1,
            ..settings(dir.path())
        };
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings, &out).await;
        handler.handle(USER, document("accounts.json", SAMPLE), &out).await.unwrap();
        assert_eq!(files_in(dir.path()).len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        // Any event sweeps idle sessions, including other users' events.
        handler.handle(UserId(7), ChatEvent::Start, &out).await.unwrap();

        assert_eq!(handler.mode(USER).await, SessionMode::Idle);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_busy_while_processing() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = ConversationHandler::new(settings(dir.path()), StubClient);
        handler.sessions.write().await.entry(USER).mode = SessionMode::Processing;

        handler.handle(USER, ChatEvent::Start, &out).await.unwrap();

        assert_eq!(out.last_text().unwrap(), Rejection::Busy.to_string());
        assert_eq!(handler.mode(USER).await, SessionMode::Processing);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let out = RecordingResponder::default();
        let handler = handler_awaiting_file(StubClient, settings(dir.path()), &out).await;

        assert_eq!(handler.mode(USER).await, SessionMode::AwaitingFile);
        assert_eq!(handler.mode(UserId(7)).await, SessionMode::Idle);
    }

    #[test]
    fn test_has_json_extension() {
        assert!(has_json_extension("accounts.json"));
        assert!(has_json_extension("ACCOUNTS.JSON"));
        assert!(!has_json_extension("accounts.json.txt"));
        assert!(!has_json_extension("accounts"));
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("3", 5), Ok(3));
        assert_eq!(parse_bound(" 5\n", 5), Ok(5));
        assert_eq!(parse_bound("0", 5), Err(Rejection::InvalidBound { max: 5 }));
        assert_eq!(parse_bound("6", 5), Err(Rejection::InvalidBound { max: 5 }));
        assert_eq!(parse_bound("-2", 5), Err(Rejection::InvalidBound { max: 5 }));
        assert_eq!(parse_bound("two", 5), Err(Rejection::NotANumber));
    }
}
