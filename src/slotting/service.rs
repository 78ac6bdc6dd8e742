//! Event operations: load fresh, apply, write conditionally, project, notify.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::engine::{self, SlotOutcome};
use super::policy;
use crate::auth::Requester;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{CreateEventRequest, Event, Occupant, RolePath, Roster, UpdateEventRequest};
use crate::notify::{self, RoleChange, RoleNotifier};
use crate::projection::EventView;

/// A successful roster mutation.
pub struct Mutation {
    pub event: EventView,
    /// Detached notification task, if any changes were sent.
    pub notification: Option<JoinHandle<()>>,
}

/// Coordinates the event store, the slot engine and role notifications.
pub struct SlotService {
    repo: Arc<Repository>,
    notifier: Arc<dyn RoleNotifier>,
    max_attempts: u32,
    notify_timeout: Duration,
}

impl SlotService {
    pub fn new(
        repo: Arc<Repository>,
        notifier: Arc<dyn RoleNotifier>,
        max_attempts: u32,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            notifier,
            max_attempts: max_attempts.max(1),
            notify_timeout,
        }
    }

    pub async fn list_events(&self) -> Result<Vec<EventView>, AppError> {
        let events = self.repo.list_events().await?;
        Ok(events.iter().map(EventView::from).collect())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<EventView, AppError> {
        Ok(EventView::from(&self.load(event_id).await?))
    }

    pub async fn create_event(
        &self,
        requester: &Requester,
        request: &CreateEventRequest,
    ) -> Result<EventView, AppError> {
        request.validate().map_err(AppError::Validation)?;

        let now = Utc::now();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            banner_url: request.banner_url.clone(),
            reference_url: request.reference_url.clone(),
            date_time: request.date_time,
            slot_unlock_time: request.slot_unlock_time,
            creator_id: requester.user_id.clone(),
            creator_name: requester.display_name.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
            roster: request.build_roster(),
        };

        self.repo.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, creator_id = %event.creator_id, "Event created");
        Ok(EventView::from(&event))
    }

    /// Edit event details. Only the creator may edit; the roster is untouched.
    pub async fn update_event(
        &self,
        requester: &Requester,
        event_id: &str,
        request: &UpdateEventRequest,
    ) -> Result<EventView, AppError> {
        let mut event = self.load(event_id).await?;
        if requester.user_id != event.creator_id {
            return Err(AppError::Forbidden(
                "Only the event creator can edit this event".to_string(),
            ));
        }

        let loaded_version = event.version;
        if let Some(expected) = request.expected_version {
            if expected != loaded_version {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, loaded_version
                    ),
                    current_version: loaded_version,
                });
            }
        }

        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Title is required".to_string()));
            }
            event.title = title.trim().to_string();
        }
        if let Some(description) = &request.description {
            event.description = description.clone();
        }
        if let Some(banner_url) = &request.banner_url {
            event.banner_url = banner_url.clone();
        }
        if let Some(reference_url) = &request.reference_url {
            event.reference_url = reference_url.clone();
        }
        if let Some(unlock) = request.slot_unlock_time {
            event.slot_unlock_time = unlock;
        }
        event.date_time = request.date_time.unwrap_or(event.date_time);
        event.updated_at = Utc::now();

        match self.repo.save_details(&event, loaded_version).await? {
            Some(version) => {
                event.version = version;
                Ok(EventView::from(&event))
            }
            None => Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: self.current_version(event_id).await?,
            }),
        }
    }

    pub async fn slot(
        &self,
        requester: &Requester,
        event_id: &str,
        path: &RolePath,
    ) -> Result<Mutation, AppError> {
        let occupant = Occupant {
            user_id: requester.user_id.clone(),
            display_name: requester.display_name.clone(),
        };

        let (event, changes) = self
            .mutate_roster(event_id, |event, roster| {
                engine::authorize_slot(event, path, requester, Utc::now())?;
                match engine::slot(roster, path, &occupant)? {
                    SlotOutcome::AlreadySlotted => Ok(None),
                    SlotOutcome::Slotted { vacated } => {
                        Ok(Some(slot_changes(roster, path, vacated.as_ref(), &occupant.user_id)))
                    }
                }
            })
            .await?;

        tracing::info!(event_id, user_id = %requester.user_id, role = %path, "User slotted");
        Ok(self.finish(&event, changes))
    }

    pub async fn unslot(
        &self,
        requester: &Requester,
        event_id: &str,
        path: &RolePath,
    ) -> Result<Mutation, AppError> {
        let (event, changes) = self
            .mutate_roster(event_id, |_, roster| {
                engine::unslot(roster, path, &requester.user_id)?;
                Ok(Some(revocation(roster, path, &requester.user_id)))
            })
            .await?;

        tracing::info!(event_id, user_id = %requester.user_id, role = %path, "User unslotted");
        Ok(self.finish(&event, changes))
    }

    /// Remove whoever holds the role. Requires admin privilege.
    pub async fn kick(
        &self,
        requester: &Requester,
        event_id: &str,
        path: &RolePath,
    ) -> Result<Mutation, AppError> {
        if !requester.is_admin {
            return Err(AppError::Forbidden("Admin privilege required".to_string()));
        }

        let mut kicked = None;
        let (event, changes) = self
            .mutate_roster(event_id, |_, roster| {
                let removed = engine::kick(roster, path)?;
                let changes = revocation(roster, path, &removed.user_id);
                kicked = Some(removed);
                Ok(Some(changes))
            })
            .await?;

        if let Some(removed) = kicked {
            tracing::info!(
                event_id,
                admin_id = %requester.user_id,
                user_id = %removed.user_id,
                role = %path,
                "User kicked from role"
            );
        }
        Ok(self.finish(&event, changes))
    }

    pub async fn delete_event(&self, requester: &Requester, event_id: &str) -> Result<(), AppError> {
        let event = self.load(event_id).await?;
        engine::authorize_delete(&event, requester)?;
        self.repo.delete_event(event_id).await?;
        tracing::info!(event_id, user_id = %requester.user_id, "Event deleted");
        Ok(())
    }

    pub async fn notifier_healthy(&self) -> bool {
        self.notifier.health_check().await
    }

    async fn load(&self, event_id: &str) -> Result<Event, AppError> {
        self.repo
            .get_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))
    }

    async fn current_version(&self, event_id: &str) -> Result<i64, AppError> {
        Ok(self
            .repo
            .get_event(event_id)
            .await?
            .map(|e| e.version)
            .unwrap_or(0))
    }

    /// Read-modify-write of the roster with optimistic concurrency.
    ///
    /// `apply` runs against a freshly loaded event each attempt and returns
    /// `None` when nothing changed (no write happens). A version mismatch on
    /// write reloads and re-applies, up to `max_attempts` times.
    async fn mutate_roster<F>(
        &self,
        event_id: &str,
        mut apply: F,
    ) -> Result<(Event, Vec<RoleChange>), AppError>
    where
        F: FnMut(&Event, &mut Roster) -> Result<Option<Vec<RoleChange>>, AppError>,
    {
        for attempt in 1..=self.max_attempts {
            let mut event = self.load(event_id).await?;
            let mut roster = event.roster.clone();

            let Some(changes) = apply(&event, &mut roster)? else {
                return Ok((event, Vec::new()));
            };

            if let Some((version, updated_at)) =
                self.repo.save_roster(event_id, &roster, event.version).await?
            {
                event.roster = roster;
                event.version = version;
                event.updated_at = updated_at;
                return Ok((event, changes));
            }

            tracing::debug!(event_id, attempt, "Roster version moved, retrying");
            tokio::task::yield_now().await;
        }

        tracing::warn!(event_id, attempts = self.max_attempts, "Giving up on contended roster");
        Err(AppError::Conflict {
            message: "Event is being modified concurrently, please retry".to_string(),
            current_version: self.current_version(event_id).await?,
        })
    }

    fn finish(&self, event: &Event, changes: Vec<RoleChange>) -> Mutation {
        let notification = (!changes.is_empty()).then(|| {
            notify::dispatch(self.notifier.clone(), changes, self.notify_timeout)
        });
        Mutation {
            event: EventView::from(event),
            notification,
        }
    }
}

/// Grant for the new role, preceded by a revoke of the vacated role's
/// reference when it differs.
fn slot_changes(
    roster: &Roster,
    path: &RolePath,
    vacated: Option<&RolePath>,
    user_id: &str,
) -> Vec<RoleChange> {
    let granted = policy::notification_role_ref(roster, path);
    let mut changes = Vec::new();

    if let Some(previous) = vacated.and_then(|p| policy::notification_role_ref(roster, p)) {
        if granted.as_ref() != Some(&previous) {
            changes.push(RoleChange::Revoke {
                user_id: user_id.to_string(),
                role_ref: previous,
            });
        }
    }
    if let Some(role_ref) = granted {
        changes.push(RoleChange::Grant {
            user_id: user_id.to_string(),
            role_ref,
        });
    }
    changes
}

fn revocation(roster: &Roster, path: &RolePath, user_id: &str) -> Vec<RoleChange> {
    policy::notification_role_ref(roster, path)
        .map(|role_ref| RoleChange::Revoke {
            user_id: user_id.to_string(),
            role_ref,
        })
        .into_iter()
        .collect()
}
