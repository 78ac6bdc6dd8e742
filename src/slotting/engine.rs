//! Slot assignment state machine.
//!
//! A role is either empty or occupied by exactly one user, and a user holds at
//! most one role per event. Every function here mutates the roster only on
//! success; a rejected operation leaves it untouched.

use chrono::{DateTime, Utc};

use super::policy;
use crate::auth::Requester;
use crate::errors::AppError;
use crate::models::{Event, Occupant, RolePath, Roster};

/// Result of a successful slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// The requester already held the role; nothing changed.
    AlreadySlotted,
    /// The requester now holds the role. `vacated` is the role they left.
    Slotted { vacated: Option<RolePath> },
}

fn role_not_found(path: &RolePath) -> AppError {
    AppError::NotFound(format!("Role {} not found", path))
}

/// Check unlock time and access restrictions for a slot request.
///
/// Admins and the event creator may slot before the unlock time; only admins
/// bypass access restrictions.
pub fn authorize_slot(
    event: &Event,
    path: &RolePath,
    requester: &Requester,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let resolved = policy::resolve(&event.roster, path).ok_or_else(|| role_not_found(path))?;

    let privileged = requester.is_admin || requester.user_id == event.creator_id;
    if let Some(unlock) = event.slot_unlock_time {
        if now < unlock && !privileged {
            return Err(AppError::Forbidden(format!(
                "Slotting opens at {}",
                unlock.to_rfc3339()
            )));
        }
    }

    if !requester.is_admin {
        if let Some(tag) = policy::unmet_restriction(&resolved, &requester.communities) {
            return Err(AppError::Forbidden(format!(
                "Role is restricted to community {}",
                tag
            )));
        }
    }

    Ok(())
}

/// Put `occupant` into the role at `path`, vacating any other role they hold.
pub fn slot(roster: &mut Roster, path: &RolePath, occupant: &Occupant) -> Result<SlotOutcome, AppError> {
    let target = policy::find_role(roster, path).ok_or_else(|| role_not_found(path))?;

    match target.occupant() {
        Some(current) if current.user_id == occupant.user_id => {
            return Ok(SlotOutcome::AlreadySlotted)
        }
        Some(current) => {
            return Err(AppError::RoleTaken {
                occupant: current.display_name,
            })
        }
        None => {}
    }

    let vacated = policy::find_occupant_role(roster, &occupant.user_id);
    if let Some(previous) = &vacated {
        if let Some(role) = policy::find_role_mut(roster, previous) {
            role.vacate();
        }
    }

    policy::find_role_mut(roster, path)
        .ok_or_else(|| role_not_found(path))?
        .occupy(occupant);

    Ok(SlotOutcome::Slotted { vacated })
}

/// Remove `user_id` from the role at `path`. Only the occupant may unslot.
pub fn unslot(roster: &mut Roster, path: &RolePath, user_id: &str) -> Result<(), AppError> {
    let role = policy::find_role_mut(roster, path).ok_or_else(|| role_not_found(path))?;
    if role.slotted_user_id.as_deref() != Some(user_id) {
        return Err(AppError::NotSlotted(
            "You are not slotted in this role".to_string(),
        ));
    }
    role.vacate();
    Ok(())
}

/// Clear the role at `path` regardless of who holds it, returning the removed occupant.
pub fn kick(roster: &mut Roster, path: &RolePath) -> Result<Occupant, AppError> {
    let role = policy::find_role_mut(roster, path).ok_or_else(|| role_not_found(path))?;
    let occupant = role
        .occupant()
        .ok_or_else(|| AppError::NotSlotted("Role is already empty".to_string()))?;
    role.vacate();
    Ok(occupant)
}

/// Only the creator may delete an event.
pub fn authorize_delete(event: &Event, requester: &Requester) -> Result<(), AppError> {
    if requester.user_id != event.creator_id {
        return Err(AppError::Forbidden(
            "Only the event creator can delete this event".to_string(),
        ));
    }
    Ok(())
}
