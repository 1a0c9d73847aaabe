//! Session service: one annotation session for one site.
//!
//! DESIGN
//! ======
//! A `Session` ties the drawing surface, the interaction controller, the
//! feature store, the remote mirror, and the sync worker together. Map and
//! button events are applied one at a time through `handle`; `run` drains
//! an event channel in order, so an event that arrives while a submit is
//! posting waits until the submit resolves.
//!
//! Submission moves `Idle -> Confirming -> Posting -> Done`. A failed post
//! drops back to `Idle` with local data intact so the user can retry.
//! `Done` is terminal: local state is cleared and later edits are discarded.
//!
//! ERROR HANDLING
//! ==============
//! Storage errors propagate as `SessionError`. Remote failures never do:
//! user-triggered actions alert, automatic sync only logs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feature::{FeatureCollection, PolygonId};
use crate::geometry::{Geometry, Ring};
use crate::interaction::{InteractionMode, Interactions};
use crate::prompt::Prompt;
use crate::services::remote::RemoteStore;
use crate::services::store::{FeatureStore, StoreError};
use crate::services::sync::SyncHandle;
use crate::site::SiteId;
use crate::surface::{Backing, Surface};

pub const MSG_EMPTY_SUBMIT: &str = "You cannot submit an empty drawing.";
pub const MSG_EMPTY_SAVE: &str = "You cannot save an empty drawing.";
pub const MSG_ALREADY_SUBMITTED: &str = "You cannot submit a drawing more than once.";
pub const MSG_SUBMITTED: &str = "Thank you. Your drawing has now been submitted.";
pub const MSG_NO_DRAFT: &str = "No saved drawing was found for this site.";
const MSG_CONFIRM_SUBMIT: &str = "Are you sure you want to submit?";
const MSG_CONFIRM_DELETE: &str = "Are you sure you want to delete?";
const MSG_CONFIRM_CLEAR: &str = "Are you sure you want to delete your drawing(s)?";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One edited feature as reported by the modify interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedFeature {
    pub id: PolygonId,
    pub ring: Ring,
}

/// Input to a session: map interaction events and button presses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MapEvent {
    ModeChanged { mode: InteractionMode },
    DrawEnd { ring: Ring },
    ModifyEnd { features: Vec<ModifiedFeature> },
    Select { id: PolygonId },
    Submit,
    Clear,
    SaveDraft,
    LoadDraft,
}

/// Button-driven actions that talk to the remote synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    Clear,
    SaveDraft,
    LoadDraft,
}

/// What an event did. Returned for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ModeChanged(InteractionMode),
    /// The event was not applicable (inactive interaction, unknown id,
    /// degenerate geometry, or a finished session).
    Ignored,
    Drawn(PolygonId),
    Modified { updated: usize, dropped: usize },
    Deleted(PolygonId),
    DeleteDeclined,
    /// The user declined the confirm dialog.
    Declined(Action),
    /// The action was invalid and the user was alerted; nothing was sent.
    Rejected(Action),
    /// The remote call failed; the user was alerted and local data kept.
    Failed(Action),
    Completed(Action),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Confirming,
    Posting,
    Done,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct Session {
    store: FeatureStore,
    surface: Surface,
    interactions: Interactions,
    remote: Arc<dyn RemoteStore>,
    prompt: Arc<dyn Prompt>,
    sync: SyncHandle,
    submit: SubmitState,
}

impl Session {
    /// Initialize a session: consolidate pending storage into committed,
    /// hydrate from the remote when nothing is stored locally, render the
    /// committed collection, and activate drawing.
    ///
    /// # Errors
    ///
    /// Returns a store error if local storage cannot be read or written.
    pub async fn start(
        store: FeatureStore,
        remote: Arc<dyn RemoteStore>,
        prompt: Arc<dyn Prompt>,
        sync: SyncHandle,
    ) -> Result<Self, SessionError> {
        store.consolidate()?;

        if store.committed()?.is_none() {
            match remote.fetch(store.site()).await {
                Ok(Some(collection)) => {
                    info!(site_id = %store.site(), count = collection.len(), "hydrated from remote");
                    store.replace_all(collection)?;
                }
                Ok(None) => debug!(site_id = %store.site(), "no remote copy to hydrate from"),
                Err(e) => warn!(site_id = %store.site(), error = %e, "remote hydrate failed; starting empty"),
            }
        }

        let mut surface = Surface::new();
        if let Some(mut committed) = store.committed()? {
            let stored = committed.clone();
            committed.normalize();
            if committed != stored {
                // EDGE: ids assigned to id-less stored features must be persisted,
                // or later edits of those polygons match nothing in storage.
                info!(site_id = %store.site(), "stored features normalized");
                store.replace_all(committed.clone())?;
            }
            surface.load_saved(committed);
        }
        if surface.is_empty() {
            debug!(site_id = %store.site(), "nothing stored; starting with an empty surface");
        }

        let mut interactions = Interactions::new();
        interactions.set_active(InteractionMode::Draw);

        info!(site_id = %store.site(), rendered = surface.len(), "session started");
        Ok(Self { store, surface, interactions, remote, prompt, sync, submit: SubmitState::Idle })
    }

    #[must_use]
    pub fn site(&self) -> &SiteId {
        self.store.site()
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    #[must_use]
    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    #[must_use]
    pub fn submit_state(&self) -> SubmitState {
        self.submit
    }

    /// Apply events in arrival order until the channel closes, then flush
    /// any armed sync.
    ///
    /// # Errors
    ///
    /// Stops at the first storage error.
    pub async fn run(&mut self, mut events: mpsc::Receiver<MapEvent>) -> Result<(), SessionError> {
        while let Some(event) = events.recv().await {
            let outcome = self.handle(event).await?;
            debug!(site_id = %self.site(), ?outcome, "event applied");
        }
        let status = self.sync.flush().await;
        info!(site_id = %self.site(), ?status, "event stream closed");
        Ok(())
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns a store error if local storage cannot be read or written.
    pub async fn handle(&mut self, event: MapEvent) -> Result<Outcome, SessionError> {
        // Submit still runs after Done so a second attempt gets its alert.
        if self.submit == SubmitState::Done && !matches!(event, MapEvent::ModeChanged { .. } | MapEvent::Submit) {
            warn!(site_id = %self.site(), ?event, "site already submitted; event discarded");
            return Ok(Outcome::Ignored);
        }

        match event {
            MapEvent::ModeChanged { mode } => {
                self.interactions.set_active(mode);
                Ok(Outcome::ModeChanged(mode))
            }
            MapEvent::DrawEnd { ring } => self.draw_end(ring),
            MapEvent::ModifyEnd { features } => self.modify_end(features),
            MapEvent::Select { id } => self.select_for_delete(&id),
            MapEvent::Submit => self.submit().await,
            MapEvent::Clear => self.clear().await,
            MapEvent::SaveDraft => self.save_draft().await,
            MapEvent::LoadDraft => self.load_draft().await,
        }
    }

    // =========================================================================
    // INTERACTIONS
    // =========================================================================

    fn draw_end(&mut self, ring: Ring) -> Result<Outcome, SessionError> {
        if !self.interactions.accepts(InteractionMode::Draw) {
            debug!(active = ?self.interactions.active(), "draw event while draw inactive");
            return Ok(Outcome::Ignored);
        }
        let geometry = Geometry::polygon(ring);
        if geometry.is_degenerate() {
            warn!(site_id = %self.site(), "degenerate polygon ignored");
            return Ok(Outcome::Ignored);
        }

        let mut feature = self.surface.draw(geometry);
        let slot = self.store.record_layer(self.surface.unsaved().clone())?;
        self.sync.schedule();

        let id = feature.ensure_id().clone();
        info!(
            site_id = %self.site(),
            polygon_id = %id,
            area = feature.area_label().unwrap_or_default(),
            ?slot,
            "polygon drawn"
        );
        Ok(Outcome::Drawn(id))
    }

    fn modify_end(&mut self, features: Vec<ModifiedFeature>) -> Result<Outcome, SessionError> {
        if !self.interactions.accepts(InteractionMode::Modify) {
            debug!(active = ?self.interactions.active(), "modify event while modify inactive");
            return Ok(Outcome::Ignored);
        }

        let mut updated = 0;
        let mut dropped = 0;
        let mut unsaved_touched = false;

        for modified in features {
            match self.surface.update_geometry(&modified.id, Geometry::polygon(modified.ring)) {
                Some((Backing::Unsaved, _)) => {
                    unsaved_touched = true;
                    updated += 1;
                }
                Some((Backing::Saved, feature)) => {
                    if self.store.replace_feature(&feature)? {
                        updated += 1;
                    } else {
                        // EDGE: rendered but not stored; matches by polygon-id only.
                        debug!(polygon_id = %modified.id, "no stored feature matches; update dropped");
                        dropped += 1;
                    }
                }
                None => {
                    debug!(polygon_id = %modified.id, "modified feature not on surface; update dropped");
                    dropped += 1;
                }
            }
        }

        if unsaved_touched {
            self.store.record_layer(self.surface.unsaved().clone())?;
        }
        if updated > 0 {
            self.sync.schedule();
        }
        Ok(Outcome::Modified { updated, dropped })
    }

    fn select_for_delete(&mut self, id: &PolygonId) -> Result<Outcome, SessionError> {
        if !self.interactions.accepts(InteractionMode::Delete) {
            debug!(active = ?self.interactions.active(), "select event while delete inactive");
            return Ok(Outcome::Ignored);
        }
        let Some(selected) = self.surface.get(id) else {
            debug!(polygon_id = %id, "selected feature not on surface");
            return Ok(Outcome::Ignored);
        };
        debug!(polygon_id = %id, area = selected.area_label().unwrap_or_default(), "delete requested");

        if !self.prompt.confirm(MSG_CONFIRM_DELETE) {
            self.interactions.set_active(InteractionMode::Draw);
            return Ok(Outcome::DeleteDeclined);
        }

        if let Some((backing, _)) = self.surface.remove(id) {
            let stored = self.store.remove_feature(id)?;
            info!(site_id = %self.site(), polygon_id = %id, ?backing, stored, "polygon deleted");
        }
        self.sync.schedule();
        Ok(Outcome::Deleted(id.clone()))
    }

    // =========================================================================
    // BUTTONS
    // =========================================================================

    async fn submit(&mut self) -> Result<Outcome, SessionError> {
        if self.submit == SubmitState::Done {
            self.prompt.alert(MSG_ALREADY_SUBMITTED);
            return Ok(Outcome::Rejected(Action::Submit));
        }
        let Some(collection) = self.non_empty_view()? else {
            self.prompt.alert(MSG_EMPTY_SUBMIT);
            return Ok(Outcome::Rejected(Action::Submit));
        };

        self.submit = SubmitState::Confirming;
        if !self.prompt.confirm(MSG_CONFIRM_SUBMIT) {
            self.submit = SubmitState::Idle;
            return Ok(Outcome::Declined(Action::Submit));
        }

        self.sync.cancel().await;
        self.submit = SubmitState::Posting;
        match self.remote.push(self.store.site(), &collection).await {
            Ok(()) => {
                self.store.clear()?;
                self.surface.clear();
                self.interactions.deactivate_all();
                self.submit = SubmitState::Done;
                info!(site_id = %self.site(), count = collection.len(), "polygons submitted");
                self.prompt.alert(MSG_SUBMITTED);
                Ok(Outcome::Completed(Action::Submit))
            }
            Err(e) => {
                warn!(site_id = %self.site(), error = %e, "submit failed; local data kept");
                self.submit = SubmitState::Idle;
                self.prompt
                    .alert("Submitting failed. Your polygons are still saved locally; please try again.");
                self.sync.schedule();
                Ok(Outcome::Failed(Action::Submit))
            }
        }
    }

    async fn clear(&mut self) -> Result<Outcome, SessionError> {
        if !self.prompt.confirm(MSG_CONFIRM_CLEAR) {
            return Ok(Outcome::Declined(Action::Clear));
        }

        let was_armed = self.sync.cancel().await;
        match self.remote.push(self.store.site(), &FeatureCollection::new()).await {
            Ok(()) => {
                self.store.clear()?;
                self.surface.clear();
                info!(site_id = %self.site(), "polygons cleared");
                Ok(Outcome::Completed(Action::Clear))
            }
            Err(e) => {
                warn!(site_id = %self.site(), error = %e, "clear failed; local data kept");
                self.prompt
                    .alert("Clearing failed. Your polygons are still saved locally; please try again.");
                self.rearm(was_armed);
                Ok(Outcome::Failed(Action::Clear))
            }
        }
    }

    async fn save_draft(&mut self) -> Result<Outcome, SessionError> {
        let Some(collection) = self.non_empty_view()? else {
            self.prompt.alert(MSG_EMPTY_SAVE);
            return Ok(Outcome::Rejected(Action::SaveDraft));
        };

        match self.remote.push(self.store.site(), &collection).await {
            Ok(()) => {
                info!(site_id = %self.site(), count = collection.len(), "draft saved");
                Ok(Outcome::Completed(Action::SaveDraft))
            }
            Err(e) => {
                warn!(site_id = %self.site(), error = %e, "draft save failed");
                self.prompt
                    .alert("Saving the draft failed. Your polygons are still saved locally.");
                Ok(Outcome::Failed(Action::SaveDraft))
            }
        }
    }

    async fn load_draft(&mut self) -> Result<Outcome, SessionError> {
        // Settle any auto-sync first so the fetch sees the latest remote copy.
        let was_armed = self.sync.cancel().await;
        match self.remote.fetch(self.store.site()).await {
            Ok(Some(collection)) => {
                self.store.replace_all(collection)?;
                let committed = self.store.committed()?.unwrap_or_default();
                info!(site_id = %self.site(), count = committed.len(), "draft loaded");
                self.surface.load_saved(committed);
                Ok(Outcome::Completed(Action::LoadDraft))
            }
            Ok(None) => {
                self.prompt.alert(MSG_NO_DRAFT);
                self.rearm(was_armed);
                Ok(Outcome::Rejected(Action::LoadDraft))
            }
            Err(e) => {
                warn!(site_id = %self.site(), error = %e, "draft load failed");
                self.prompt
                    .alert("Loading the draft failed. Your local polygons were left unchanged.");
                self.rearm(was_armed);
                Ok(Outcome::Failed(Action::LoadDraft))
            }
        }
    }

    /// Restore an auto-sync dropped by an action that left local data as is.
    fn rearm(&self, was_armed: bool) {
        if was_armed {
            self.sync.schedule();
        }
    }

    fn non_empty_view(&self) -> Result<Option<FeatureCollection>, SessionError> {
        Ok(self.store.merged_view()?.filter(|c| !c.is_empty()))
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
