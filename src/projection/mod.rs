//! Read projection: the event shape returned to clients after every read or mutation.
//!
//! Occupancy fields are always present, `null` for an empty role, so clients
//! can tell an empty role from an omitted field.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Event, Group, Role, Side};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
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
    pub version: i64,
    pub slot_count: SlotCount,
    pub sides: Vec<SideView>,
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotCount {
    pub total: usize,
    pub filled: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideView {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub member_role_ref: Option<String>,
    pub leader_role_ref: Option<String>,
    pub restriction: Option<String>,
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub restriction: Option<String>,
    pub roles: Vec<RoleView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: String,
    pub name: String,
    pub restriction: Option<String>,
    pub slotted_user_id: Option<String>,
    pub slotted_user_display_name: Option<String>,
}

impl From<&Role> for RoleView {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.clone(),
            name: role.name.clone(),
            restriction: role.restriction.clone(),
            slotted_user_id: role.slotted_user_id.clone(),
            // Never show a name without an occupant
            slotted_user_display_name: role
                .slotted_user_id
                .as_ref()
                .and(role.slotted_user_display_name.clone()),
        }
    }
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            restriction: group.restriction.clone(),
            roles: group.roles.iter().map(RoleView::from).collect(),
        }
    }
}

impl From<&Side> for SideView {
    fn from(side: &Side) -> Self {
        Self {
            id: side.id.clone(),
            name: side.name.clone(),
            color: side.color.clone(),
            member_role_ref: side.member_role_ref.clone(),
            leader_role_ref: side.leader_role_ref.clone(),
            restriction: side.restriction.clone(),
            groups: side.groups.iter().map(GroupView::from).collect(),
        }
    }
}

impl From<&Event> for EventView {
    fn from(event: &Event) -> Self {
        let sides: Vec<SideView> = event.roster.sides.iter().map(SideView::from).collect();
        let groups: Vec<GroupView> = event.roster.groups.iter().map(GroupView::from).collect();

        let mut slot_count = SlotCount::default();
        let all_groups = sides.iter().flat_map(|s| s.groups.iter()).chain(groups.iter());
        for role in all_groups.flat_map(|g| g.roles.iter()) {
            slot_count.total += 1;
            if role.slotted_user_id.is_some() {
                slot_count.filled += 1;
            }
        }

        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            banner_url: event.banner_url.clone(),
            reference_url: event.reference_url.clone(),
            date_time: event.date_time,
            slot_unlock_time: event.slot_unlock_time,
            creator_id: event.creator_id.clone(),
            creator_name: event.creator_name.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
            version: event.version,
            slot_count,
            sides,
            groups,
        }
    }
}
