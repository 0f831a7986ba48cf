//! # Edit Session Management
//!
//! One client's editing session against the asset registry.
//!
//! The session owns the [`Editor`], the last-synced baseline used for
//! three-way comparison, the active [`DraftConflict`] and the live data
//! streams writing into the document's state.
//!
//! ## Saving
//!
//! A save is two steps so the request can run while the editor stays
//! usable:
//!
//! ```rust,ignore
//! let ticket = session.begin_save()?;        // guard + snapshot
//! let result = ticket.send(registry).await;  // network
//! let outcome = session.complete_save(ticket, result)?;
//! ```
//!
//! Only one ticket is outstanding at a time. A session reset (close,
//! reload, rollback) bumps the generation; a result for an older
//! generation is discarded.

use crate::conflict::DraftConflict;
use crate::editor::{Editor, EditorConfig};
use crate::errors::EditorError;
use crate::executor::{
    resolve_template, should_run, ActionExecutor, ActionOutcome, ActionRequest, ExecutionContext,
    ExecutorError,
};
use crate::persistence::{AssetContext, AssetRegistry, PersistenceError, StoredDocument};
use screenkit_model::{ActionSpec, ScreenDocument};
use screenkit_stream::{
    AckSender, PendingUpdate, ReconnectPolicy, StateUpdate, StreamConnector, StreamManager,
    SubscriptionConfig, SubscriptionSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Pending stream updates, at most one per subscription
const STREAM_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Existing asset updated
    Saved(StoredDocument),
    /// First save created the asset
    Created(StoredDocument),
    /// Nothing to save
    Unchanged,
    /// Registry refused a stale write
    Conflict(Box<DraftConflict>),
    /// The session was reset while the request was in flight
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteUpdate {
    Ignored,
    Adopted,
    Conflict(Box<DraftConflict>),
}

/// An outstanding save request
#[derive(Debug, Clone)]
pub struct SaveTicket {
    generation: u64,
    asset: AssetContext,
    snapshot: ScreenDocument,
}

impl SaveTicket {
    pub fn snapshot(&self) -> &ScreenDocument {
        &self.snapshot
    }

    /// Perform the registry call, forwarding the concurrency token
    pub async fn send(&self, registry: &dyn AssetRegistry) -> Result<StoredDocument, PersistenceError> {
        match &self.asset.asset_id {
            Some(asset_id) => {
                registry
                    .put_document(asset_id, &self.snapshot, self.asset.updated_at)
                    .await
            }
            None => registry.create_document(&self.snapshot).await,
        }
    }
}

pub struct EditSession {
    registry: Arc<dyn AssetRegistry>,
    editor: Editor,
    asset: AssetContext,

    /// Last document known to match the server
    baseline: Option<ScreenDocument>,
    conflict: Option<DraftConflict>,
    published_version: Option<u32>,

    saving: bool,
    generation: u64,

    streams: StreamManager,
    /// Each entry holds its subscription's single-flight slot until applied
    updates: mpsc::Receiver<PendingUpdate>,
    executor: Option<Arc<dyn ActionExecutor>>,
}

impl EditSession {
    pub fn new(
        registry: Arc<dyn AssetRegistry>,
        connector: Arc<dyn StreamConnector>,
        config: EditorConfig,
    ) -> Self {
        Self::with_policy(registry, connector, config, ReconnectPolicy::default())
    }

    pub fn with_policy(
        registry: Arc<dyn AssetRegistry>,
        connector: Arc<dyn StreamConnector>,
        config: EditorConfig,
        policy: ReconnectPolicy,
    ) -> Self {
        let (sink, updates) = AckSender::channel(STREAM_BUFFER);
        Self {
            registry,
            editor: Editor::new(config),
            asset: AssetContext::unsaved(),
            baseline: None,
            conflict: None,
            published_version: None,
            saving: false,
            generation: 0,
            streams: StreamManager::new(connector, Arc::new(sink)).with_policy(policy),
            updates,
            executor: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    // ---- Accessors ----

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn asset(&self) -> &AssetContext {
        &self.asset
    }

    pub fn conflict(&self) -> Option<&DraftConflict> {
        self.conflict.as_ref()
    }

    pub fn baseline(&self) -> Option<&ScreenDocument> {
        self.baseline.as_ref()
    }

    pub fn published_version(&self) -> Option<u32> {
        self.published_version
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn streams(&self) -> &StreamManager {
        &self.streams
    }

    // ---- Loading ----

    /// Load a stored asset
    pub async fn open(&mut self, asset_id: &str) -> Result<(), EditorError> {
        let stored = self.registry.get_document(asset_id).await?;
        self.load_stored(stored);
        Ok(())
    }

    /// Start editing a document that has never been saved
    pub fn load_document(&mut self, document: ScreenDocument) {
        self.reset();
        self.asset = AssetContext::unsaved();
        self.baseline = None;
        self.published_version = None;
        self.editor.load(document);
    }

    fn load_stored(&mut self, stored: StoredDocument) {
        self.reset();
        self.asset.adopt(&stored);
        self.published_version = stored.published_version;
        self.baseline = Some(stored.snapshot.clone());
        self.editor.load(stored.snapshot);
    }

    /// Forget in-flight work: pending saves resolve as discarded
    fn reset(&mut self) {
        self.generation += 1;
        self.saving = false;
        self.conflict = None;
    }

    // ---- Saving ----

    pub fn begin_save(&mut self) -> Result<SaveTicket, EditorError> {
        if self.saving {
            return Err(EditorError::SaveInProgress);
        }
        let snapshot = self.editor.document().cloned().ok_or(EditorError::NoDocument)?;

        self.saving = true;
        Ok(SaveTicket {
            generation: self.generation,
            asset: self.asset.clone(),
            snapshot,
        })
    }

    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<StoredDocument, PersistenceError>,
    ) -> Result<SaveOutcome, EditorError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding save result for a reset session"
            );
            return Ok(SaveOutcome::Discarded);
        }
        self.saving = false;

        match result {
            Ok(stored) => {
                let created = ticket.asset.asset_id.is_none();
                self.asset.adopt(&stored);
                self.published_version = stored.published_version;
                self.baseline = Some(ticket.snapshot.clone());
                self.conflict = None;

                // edits made while the request was in flight stay pending
                if self.editor.document() == Some(&ticket.snapshot) {
                    self.editor.mark_saved();
                }

                tracing::info!(
                    asset = %stored.asset_id,
                    version = stored.version,
                    created,
                    "saved document"
                );
                Ok(if created {
                    SaveOutcome::Created(stored)
                } else {
                    SaveOutcome::Saved(stored)
                })
            }
            Err(PersistenceError::VersionConflict { current }) => {
                let local = self.editor.document().unwrap_or(&ticket.snapshot);
                let conflict = DraftConflict::detect(
                    self.baseline.as_ref(),
                    local,
                    &current.snapshot,
                    ticket.asset.updated_at,
                    Some(current.updated_at),
                );
                self.conflict = Some(conflict.clone());
                Ok(SaveOutcome::Conflict(Box::new(conflict)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "save failed");
                Err(err.into())
            }
        }
    }

    pub async fn save(&mut self) -> Result<SaveOutcome, EditorError> {
        if self.asset.asset_id.is_some() && !self.editor.is_modified() && self.editor.has_document() {
            return Ok(SaveOutcome::Unchanged);
        }
        let ticket = self.begin_save()?;
        let registry = self.registry.clone();
        let result = ticket.send(registry.as_ref()).await;
        self.complete_save(ticket, result)
    }

    // ---- Conflict resolution ----

    /// Stage the auto-merge candidate as the working document.
    ///
    /// The server copy becomes the new baseline and its token is adopted so
    /// the next save can succeed. The conflict stays until that save does.
    pub fn apply_merge_candidate(&mut self) -> Result<(), EditorError> {
        let conflict = self.conflict.as_ref().ok_or(EditorError::NoMergeCandidate)?;
        let candidate = conflict
            .auto_merged_snapshot
            .clone()
            .ok_or(EditorError::NoMergeCandidate)?;

        self.asset.updated_at = conflict.server_updated_at;
        self.baseline = Some(conflict.server_snapshot.clone());
        self.editor.stage_document(candidate);
        tracing::info!("staged auto-merge candidate");
        Ok(())
    }

    /// Drop local edits and reload the server copy
    pub async fn discard_and_reload(&mut self) -> Result<(), EditorError> {
        let asset_id = self.asset.asset_id.clone().ok_or(EditorError::NotSaved)?;
        let stored = self.registry.get_document(&asset_id).await?;
        self.load_stored(stored);
        tracing::info!(asset = %asset_id, "discarded local edits");
        Ok(())
    }

    /// Overwrite the server copy with the local document
    pub async fn force_save(&mut self) -> Result<SaveOutcome, EditorError> {
        if let Some(asset_id) = self.asset.asset_id.clone() {
            let current = self.registry.get_document(&asset_id).await?;
            self.asset.updated_at = Some(current.updated_at);
            self.baseline = Some(current.snapshot);
        }
        tracing::warn!("forcing save over the server copy");

        let ticket = self.begin_save()?;
        let registry = self.registry.clone();
        let result = ticket.send(registry.as_ref()).await;
        self.complete_save(ticket, result)
    }

    pub fn acknowledge_conflict(&mut self) {
        self.conflict = None;
    }

    /// React to a push notification about the stored copy
    pub fn on_remote_update(&mut self, stored: StoredDocument) -> RemoteUpdate {
        if self.asset.asset_id.as_deref() != Some(stored.asset_id.as_str()) {
            return RemoteUpdate::Ignored;
        }
        if let Some(known) = self.asset.updated_at {
            if stored.updated_at <= known {
                return RemoteUpdate::Ignored;
            }
        }

        if !self.editor.is_modified() {
            tracing::debug!(asset = %stored.asset_id, version = stored.version, "adopted remote copy");
            self.load_stored(stored);
            return RemoteUpdate::Adopted;
        }

        let Some(local) = self.editor.document() else {
            return RemoteUpdate::Ignored;
        };
        let conflict = DraftConflict::detect(
            self.baseline.as_ref(),
            local,
            &stored.snapshot,
            self.asset.updated_at,
            Some(stored.updated_at),
        );
        self.conflict = Some(conflict.clone());
        RemoteUpdate::Conflict(Box::new(conflict))
    }

    // ---- Publishing ----

    /// Publish the current document, saving pending edits first
    pub async fn publish(&mut self) -> Result<StoredDocument, EditorError> {
        if !self.editor.has_document() {
            return Err(EditorError::NoDocument);
        }
        if !self.editor.can_publish() {
            return Err(EditorError::PublishBlocked {
                errors: self.editor.findings().error_count(),
            });
        }
        if self.conflict.is_some() {
            return Err(EditorError::ConflictPending);
        }

        if self.asset.asset_id.is_none() || self.editor.is_modified() {
            match self.save().await? {
                SaveOutcome::Conflict(_) | SaveOutcome::Discarded => {
                    return Err(EditorError::ConflictPending)
                }
                _ => {}
            }
        }

        let asset_id = self.asset.asset_id.clone().ok_or(EditorError::NotSaved)?;
        let stored = self.registry.publish(&asset_id).await?;
        self.published_version = stored.published_version;
        tracing::info!(asset = %asset_id, version = ?stored.published_version, "published");
        Ok(stored)
    }

    pub async fn unpublish(&mut self) -> Result<StoredDocument, EditorError> {
        let asset_id = self.asset.asset_id.clone().ok_or(EditorError::NotSaved)?;
        let stored = self.registry.unpublish(&asset_id).await?;
        self.published_version = stored.published_version;
        tracing::info!(asset = %asset_id, "unpublished");
        Ok(stored)
    }

    /// Restore a stored version. Local edits are dropped.
    pub async fn rollback(&mut self, version: u32) -> Result<StoredDocument, EditorError> {
        let asset_id = self.asset.asset_id.clone().ok_or(EditorError::NotSaved)?;
        let stored = self.registry.rollback(&asset_id, version).await?;
        tracing::info!(asset = %asset_id, version, restored_as = stored.version, "rolled back");
        self.load_stored(stored.clone());
        Ok(stored)
    }

    /// Tear down every stream and unload the document
    pub fn close(&mut self) {
        self.streams.dispose();
        while let Ok(stale) = self.updates.try_recv() {
            stale.acknowledge();
        }
        self.reset();
        self.editor.unload();
        self.asset = AssetContext::unsaved();
        self.baseline = None;
        self.published_version = None;
        tracing::debug!(generation = self.generation, "closed session");
    }

    // ---- Live data ----

    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<(), EditorError> {
        self.streams.subscribe(config)?;
        Ok(())
    }

    pub fn unsubscribe(&self, id: &str) -> bool {
        self.streams.unsubscribe(id)
    }

    pub fn stream_snapshots(&self) -> Vec<SubscriptionSnapshot> {
        self.streams.snapshots()
    }

    /// Write one stream update into state (no history, not modified)
    pub fn apply_stream_update(&mut self, update: &StateUpdate) -> Result<(), EditorError> {
        self.editor
            .apply_state_update(&update.target_path, update.value.clone())?;
        if let Some(patch) = &update.state_patch {
            self.editor.merge_state_patch(patch)?;
        }
        Ok(())
    }

    /// Apply every update already received, returning how many were applied.
    ///
    /// Until an update is drained its subscription drops further messages.
    pub fn drain_stream_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(pending) = self.updates.try_recv() {
            if self.apply_pending(pending) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next update and apply it
    pub async fn next_stream_update(&mut self) -> Option<StateUpdate> {
        let pending = self.updates.recv().await?;
        let update = pending.update().clone();
        self.apply_pending(pending);
        Some(update)
    }

    /// Apply, then release the subscription for its next message
    fn apply_pending(&mut self, pending: PendingUpdate) -> bool {
        let result = self.apply_stream_update(pending.update());
        let update = pending.acknowledge();
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(subscription = %update.subscription_id, error = %err, "stream update not applied");
                false
            }
        }
    }

    // ---- Actions ----

    /// Run a screen action by id
    pub async fn execute_action(
        &mut self,
        action_id: &str,
        ctx: &ExecutionContext,
    ) -> Result<ActionOutcome, EditorError> {
        let document = self.editor.document().ok_or(EditorError::NoDocument)?;
        let specs: Vec<ActionSpec> = document.actions.iter().map(|a| a.spec.clone()).collect();
        let index = document
            .actions
            .iter()
            .position(|a| a.id == action_id)
            .ok_or_else(|| ExecutorError::UnknownAction(action_id.to_string()))?;
        self.run_from_list(&specs, index, ctx).await
    }

    /// Run an action attached to a component
    pub async fn execute_component_action(
        &mut self,
        component_id: &str,
        action_id: &str,
        ctx: &ExecutionContext,
    ) -> Result<ActionOutcome, EditorError> {
        let document = self.editor.document().ok_or(EditorError::NoDocument)?;
        let component = document
            .find_component(component_id)
            .ok_or_else(|| ExecutorError::UnknownAction(format!("{}.{}", component_id, action_id)))?;
        let specs: Vec<ActionSpec> = component.actions.iter().map(|a| a.spec.clone()).collect();
        let index = component
            .actions
            .iter()
            .position(|a| a.id == action_id)
            .ok_or_else(|| ExecutorError::UnknownAction(format!("{}.{}", component_id, action_id)))?;
        self.run_from_list(&specs, index, ctx).await
    }

    /// Run `specs[index]`; on failure run its error handlers from the same list
    async fn run_from_list(
        &mut self,
        specs: &[ActionSpec],
        index: usize,
        ctx: &ExecutionContext,
    ) -> Result<ActionOutcome, EditorError> {
        let executor = self.executor.clone().ok_or(EditorError::NoExecutor)?;
        let spec = &specs[index];

        match self.invoke(executor.as_ref(), spec, ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                for handler in spec
                    .on_error_action_indexes
                    .iter()
                    .filter(|i| **i != index)
                    .filter_map(|i| specs.get(*i))
                {
                    if let Err(handler_err) = self.invoke(executor.as_ref(), handler, ctx).await {
                        tracing::warn!(
                            handler = %handler.handler,
                            error = %handler_err,
                            "error handler failed"
                        );
                    }
                }
                Err(err.into())
            }
        }
    }

    /// One action with its guard and retries
    async fn invoke(
        &mut self,
        executor: &dyn ActionExecutor,
        spec: &ActionSpec,
        ctx: &ExecutionContext,
    ) -> Result<ActionOutcome, ExecutorError> {
        let document = self
            .editor
            .document()
            .ok_or_else(|| ExecutorError::UnknownAction(spec.handler.clone()))?;

        if !should_run(spec.run_if.as_deref(), &document.state, ctx) {
            tracing::debug!(handler = %spec.handler, "action skipped by runIf");
            return Ok(ActionOutcome::Skipped);
        }

        let request = ActionRequest {
            handler: spec.handler.clone(),
            payload: resolve_template(&spec.payload_template, &document.state, ctx),
            context: ctx.context.clone(),
            trace_id: ctx.trace_id.clone(),
        };

        let mut attempt = 0;
        loop {
            match executor.execute(request.clone()).await {
                Ok(response) => {
                    if let Some(patch) = &response.state_patch {
                        if let Err(err) = self.editor.merge_state_patch(patch) {
                            tracing::debug!(error = %err, "state patch not applied");
                        }
                    }
                    return Ok(ActionOutcome::Completed(response));
                }
                Err(err) if attempt < spec.retry_count => {
                    attempt += 1;
                    tracing::debug!(
                        handler = %spec.handler,
                        attempt,
                        error = %err,
                        "retrying action"
                    );
                    tokio::time::sleep(Duration::from_millis(spec.retry_delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.streams.dispose();
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("asset", &self.asset)
            .field("modified", &self.editor.is_modified())
            .field("conflict", &self.conflict.is_some())
            .field("saving", &self.saving)
            .field("generation", &self.generation)
            .field("streams", &self.streams.len())
            .finish()
    }
}
