//! Event and role tree models.
//!
//! The roster (sides, groups and roles) is persisted as a single JSON document
//! on the event row; these types are both the domain model and that document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A scheduled event with its role-signup tree.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub reference_url: Option<String>,
    pub date_time: DateTime<Utc>,
    pub slot_unlock_time: Option<DateTime<Utc>>,
    pub creator_id: String,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every persisted mutation
    pub version: i64,
    pub roster: Roster,
}

/// The serialized role tree.
///
/// `groups` holds groups of side-less events; both lists may be populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub sides: Vec<Side>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Side {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// External role granted to everyone slotted on this side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_role_ref: Option<String>,
    /// External role granted to leadership slots on this side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_role_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// The atomic slot. Occupancy fields are the only part mutated by slotting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slotted_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slotted_user_display_name: Option<String>,
}

impl Role {
    pub fn occupant(&self) -> Option<Occupant> {
        self.slotted_user_id.as_ref().map(|user_id| Occupant {
            user_id: user_id.clone(),
            display_name: self
                .slotted_user_display_name
                .clone()
                .unwrap_or_else(|| user_id.clone()),
        })
    }

    pub fn occupy(&mut self, occupant: &Occupant) {
        self.slotted_user_id = Some(occupant.user_id.clone());
        self.slotted_user_display_name = Some(occupant.display_name.clone());
    }

    pub fn vacate(&mut self) {
        self.slotted_user_id = None;
        self.slotted_user_display_name = None;
    }
}

/// A user holding (or about to hold) a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub user_id: String,
    pub display_name: String,
}

/// Address of a role inside a roster. `side_id` is `None` for side-less groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePath {
    #[serde(default)]
    pub side_id: Option<String>,
    pub group_id: String,
    pub role_id: String,
}

impl std::fmt::Display for RolePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.side_id {
            Some(side) => write!(f, "{}/{}/{}", side, self.group_id, self.role_id),
            None => write!(f, "{}/{}", self.group_id, self.role_id),
        }
    }
}

/// Request body for creating a new event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub reference_url: Option<String>,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub slot_unlock_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sides: Vec<CreateSide>,
    #[serde(default)]
    pub groups: Vec<CreateGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSide {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub member_role_ref: Option<String>,
    #[serde(default)]
    pub leader_role_ref: Option<String>,
    #[serde(default)]
    pub restriction: Option<String>,
    #[serde(default)]
    pub groups: Vec<CreateGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroup {
    pub name: String,
    #[serde(default)]
    pub restriction: Option<String>,
    #[serde(default)]
    pub roles: Vec<CreateRole>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub restriction: Option<String>,
}

impl CreateEventRequest {
    /// Check required fields, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        for side in &self.sides {
            if side.name.trim().is_empty() {
                return Err("Side name is required".to_string());
            }
            let refs = [&side.member_role_ref, &side.leader_role_ref];
            if let Some(bad) = refs.into_iter().flatten().find(|r| !is_snowflake(r)) {
                return Err(format!(
                    "Role reference {:?} on side {} must be a numeric id",
                    bad, side.name
                ));
            }
        }
        let groups = self
            .sides
            .iter()
            .flat_map(|s| s.groups.iter())
            .chain(self.groups.iter());
        for group in groups {
            if group.name.trim().is_empty() {
                return Err("Group name is required".to_string());
            }
            if group.roles.iter().any(|r| r.name.trim().is_empty()) {
                return Err(format!("Role name is required in group {}", group.name));
            }
        }
        Ok(())
    }

    /// Build the initial, empty roster with freshly generated ids.
    pub fn build_roster(&self) -> Roster {
        Roster {
            sides: self.sides.iter().map(CreateSide::build).collect(),
            groups: self.groups.iter().map(CreateGroup::build).collect(),
        }
    }
}

impl CreateSide {
    fn build(&self) -> Side {
        Side {
            id: new_id(),
            name: self.name.trim().to_string(),
            color: self.color.clone(),
            member_role_ref: self.member_role_ref.clone(),
            leader_role_ref: self.leader_role_ref.clone(),
            restriction: self.restriction.clone(),
            groups: self.groups.iter().map(CreateGroup::build).collect(),
        }
    }
}

impl CreateGroup {
    fn build(&self) -> Group {
        Group {
            id: new_id(),
            name: self.name.trim().to_string(),
            restriction: self.restriction.clone(),
            roles: self
                .roles
                .iter()
                .map(|r| Role {
                    id: new_id(),
                    name: r.name.trim().to_string(),
                    restriction: r.restriction.clone(),
                    slotted_user_id: None,
                    slotted_user_display_name: None,
                })
                .collect(),
        }
    }
}

/// Whether `value` is a platform snowflake id (ASCII digits only).
pub fn is_snowflake(value: &str) -> bool {
    !value.is_empty() && value.len() <= 20 && value.bytes().all(|b| b.is_ascii_digit())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Request body for editing event details. Only the creator may edit.
///
/// Clearable fields are tri-state: absent keeps the stored value, `null`
/// clears it, and a value replaces it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub banner_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub reference_url: Option<Option<String>>,
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub slot_unlock_time: Option<Option<DateTime<Utc>>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Marks a field that appeared in the body, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request body for slot, unslot and kick.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub event_id: String,
    #[serde(flatten)]
    pub path: RolePath,
}
