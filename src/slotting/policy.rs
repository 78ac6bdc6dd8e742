//! Lookups and rules over a roster.
//!
//! Everything here is pure: no I/O, no clock. Rosters are a few dozen roles,
//! so lookups are linear scans.

use crate::models::{Group, Role, RolePath, Roster, Side};

/// Role-name prefixes that mark a leadership slot.
pub const LEADERSHIP_KEYWORDS: [&str; 13] = [
    "leader",
    "commander",
    "captain",
    "lieutenant",
    "sergeant",
    "corporal",
    "chief",
    "officer",
    "lead",
    "head",
    "co",
    "deputy",
    "senior",
];

/// Keywords too short to match as a prefix ("Corpsman", "Combat Medic").
const WHOLE_WORD_KEYWORDS: [&str; 1] = ["co"];

/// Everything on the way from the roster root to a role.
pub struct ResolvedRole<'a> {
    pub side: Option<&'a Side>,
    pub group: &'a Group,
    pub role: &'a Role,
}

fn find_group<'a>(roster: &'a Roster, path: &RolePath) -> Option<(Option<&'a Side>, &'a Group)> {
    match &path.side_id {
        Some(side_id) => {
            let side = roster.sides.iter().find(|s| &s.id == side_id)?;
            let group = side.groups.iter().find(|g| g.id == path.group_id)?;
            Some((Some(side), group))
        }
        None => roster
            .groups
            .iter()
            .find(|g| g.id == path.group_id)
            .map(|g| (None, g)),
    }
}

/// Resolve a path to its side, group and role.
pub fn resolve<'a>(roster: &'a Roster, path: &RolePath) -> Option<ResolvedRole<'a>> {
    let (side, group) = find_group(roster, path)?;
    let role = group.roles.iter().find(|r| r.id == path.role_id)?;
    Some(ResolvedRole { side, group, role })
}

pub fn find_role<'a>(roster: &'a Roster, path: &RolePath) -> Option<&'a Role> {
    resolve(roster, path).map(|resolved| resolved.role)
}

pub fn find_role_mut<'a>(roster: &'a mut Roster, path: &RolePath) -> Option<&'a mut Role> {
    let groups = match &path.side_id {
        Some(side_id) => &mut roster.sides.iter_mut().find(|s| &s.id == side_id)?.groups,
        None => &mut roster.groups,
    };
    groups
        .iter_mut()
        .find(|g| g.id == path.group_id)?
        .roles
        .iter_mut()
        .find(|r| r.id == path.role_id)
}

/// Every role in the roster together with its path, sides first.
pub fn all_roles(roster: &Roster) -> impl Iterator<Item = (RolePath, &Role)> + '_ {
    let sided = roster.sides.iter().flat_map(|side| {
        side.groups.iter().flat_map(move |group| {
            group.roles.iter().map(move |role| {
                (
                    RolePath {
                        side_id: Some(side.id.clone()),
                        group_id: group.id.clone(),
                        role_id: role.id.clone(),
                    },
                    role,
                )
            })
        })
    });
    let sideless = roster.groups.iter().flat_map(|group| {
        group.roles.iter().map(move |role| {
            (
                RolePath {
                    side_id: None,
                    group_id: group.id.clone(),
                    role_id: role.id.clone(),
                },
                role,
            )
        })
    });
    sided.chain(sideless)
}

/// The role currently held by `user_id`, if any.
pub fn find_occupant_role(roster: &Roster, user_id: &str) -> Option<RolePath> {
    all_roles(roster)
        .find(|(_, role)| role.slotted_user_id.as_deref() == Some(user_id))
        .map(|(path, _)| path)
}

/// The leadership keyword a role name matches, if any.
///
/// Names are split into alphanumeric words; a word matches when it starts
/// with a keyword, case-insensitively. Short keywords such as "co" must be
/// the whole word ("Co-Pilot").
pub fn leadership_keyword(role_name: &str) -> Option<&'static str> {
    let lowered = role_name.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .find_map(|word| {
            LEADERSHIP_KEYWORDS
                .iter()
                .copied()
                .find(|keyword| {
                    if WHOLE_WORD_KEYWORDS.contains(keyword) {
                        word == *keyword
                    } else {
                        word.starts_with(keyword)
                    }
                })
        })
}

/// External role reference to grant or revoke for a slot change on `path`.
///
/// Leadership roles use the side's leader reference and fall back to the
/// member reference when the side has none. Side-less groups have no reference.
pub fn notification_role_ref(roster: &Roster, path: &RolePath) -> Option<String> {
    let resolved = resolve(roster, path)?;
    let side = resolved.side?;
    if leadership_keyword(&resolved.role.name).is_some() {
        side.leader_role_ref
            .clone()
            .or_else(|| side.member_role_ref.clone())
    } else {
        side.member_role_ref.clone()
    }
}

/// Exact, case-sensitive match of a restriction tag against community ids.
pub fn restriction_satisfied(tag: Option<&str>, communities: &[String]) -> bool {
    match tag {
        None => true,
        Some(tag) => communities.iter().any(|c| c == tag),
    }
}

/// The first restriction tag along the path that the communities do not satisfy.
pub fn unmet_restriction<'a>(resolved: &ResolvedRole<'a>, communities: &[String]) -> Option<&'a str> {
    let tags = [
        resolved.side.and_then(|s| s.restriction.as_deref()),
        resolved.group.restriction.as_deref(),
        resolved.role.restriction.as_deref(),
    ];
    tags.into_iter()
        .flatten()
        .find(|tag| !restriction_satisfied(Some(*tag), communities))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Group, Role, RolePath, Roster, Side};

    pub fn role(id: &str, name: &str) -> Role {
        Role {
            id: id.to_string(),
            name: name.to_string(),
            restriction: None,
            slotted_user_id: None,
            slotted_user_display_name: None,
        }
    }

    /// BLUFOR / Alpha with Rifleman (R1) and Squad Leader (R2), plus a
    /// side-less Zeus group with one role.
    pub fn roster() -> Roster {
        Roster {
            sides: vec![Side {
                id: "BLUFOR".to_string(),
                name: "BLUFOR".to_string(),
                color: Some("#004d99".to_string()),
                member_role_ref: Some("member-ref".to_string()),
                leader_role_ref: Some("leader-ref".to_string()),
                restriction: None,
                groups: vec![Group {
                    id: "Alpha".to_string(),
                    name: "Alpha".to_string(),
                    restriction: None,
                    roles: vec![role("R1", "Rifleman"), role("R2", "Squad Leader")],
                }],
            }],
            groups: vec![Group {
                id: "Zeus".to_string(),
                name: "Zeus".to_string(),
                restriction: None,
                roles: vec![role("Z1", "Game Master")],
            }],
        }
    }

    pub fn alpha(role_id: &str) -> RolePath {
        RolePath {
            side_id: Some("BLUFOR".to_string()),
            group_id: "Alpha".to_string(),
            role_id: role_id.to_string(),
        }
    }

    pub fn zeus() -> RolePath {
        RolePath {
            side_id: None,
            group_id: "Zeus".to_string(),
            role_id: "Z1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{alpha, roster, zeus};
    use super::*;

    #[test]
    fn test_find_role_with_and_without_side() {
        let roster = roster();
        assert_eq!(find_role(&roster, &alpha("R2")).unwrap().name, "Squad Leader");
        assert_eq!(find_role(&roster, &zeus()).unwrap().name, "Game Master");

        // Side-less lookup does not see side groups and vice versa
        let mut wrong = alpha("R1");
        wrong.side_id = None;
        assert!(find_role(&roster, &wrong).is_none());
        assert!(find_role(&roster, &alpha("missing")).is_none());
    }

    #[test]
    fn test_find_occupant_role_scans_sides_and_groups() {
        let mut roster = roster();
        assert!(find_occupant_role(&roster, "u1").is_none());

        roster.groups[0].roles[0].slotted_user_id = Some("u1".to_string());
        assert_eq!(find_occupant_role(&roster, "u1"), Some(zeus()));

        roster.groups[0].roles[0].slotted_user_id = None;
        find_role_mut(&mut roster, &alpha("R2")).unwrap().slotted_user_id =
            Some("u1".to_string());
        assert_eq!(find_occupant_role(&roster, "u1"), Some(alpha("R2")));
    }

    #[test]
    fn test_leadership_keyword_matching() {
        assert!(leadership_keyword("Squad Leader").is_some());
        assert_eq!(leadership_keyword("Platoon COMMANDER"), Some("commander"));
        assert_eq!(leadership_keyword("Co-Pilot"), Some("co"));
        assert_eq!(leadership_keyword("Fireteam Lead"), Some("lead"));
        assert_eq!(leadership_keyword("Rifleman"), None);
        assert_eq!(leadership_keyword("Recon Marksman"), None);
        assert_eq!(leadership_keyword("Combat Medic"), None);
        assert_eq!(leadership_keyword("Corpsman"), None);
        assert_eq!(leadership_keyword("Comms Operator"), None);
        assert_eq!(leadership_keyword("CO"), Some("co"));
        assert_eq!(leadership_keyword("Corporal"), Some("corporal"));
        assert_eq!(leadership_keyword(""), None);
    }

    #[test]
    fn test_notification_ref_prefers_leader_for_leadership_roles() {
        let mut roster = roster();
        assert_eq!(
            notification_role_ref(&roster, &alpha("R2")).as_deref(),
            Some("leader-ref")
        );
        assert_eq!(
            notification_role_ref(&roster, &alpha("R1")).as_deref(),
            Some("member-ref")
        );
        assert_eq!(notification_role_ref(&roster, &zeus()), None);

        roster.sides[0].leader_role_ref = None;
        assert_eq!(
            notification_role_ref(&roster, &alpha("R2")).as_deref(),
            Some("member-ref")
        );
    }

    #[test]
    fn test_unmet_restriction_checks_every_level() {
        let mut roster = roster();
        roster.sides[0].groups[0].restriction = Some("community-a".to_string());
        let resolved = resolve(&roster, &alpha("R1")).unwrap();

        assert_eq!(unmet_restriction(&resolved, &[]), Some("community-a"));
        assert_eq!(
            unmet_restriction(&resolved, &["Community-A".to_string()]),
            Some("community-a")
        );
        assert_eq!(
            unmet_restriction(&resolved, &["community-a".to_string()]),
            None
        );
        assert!(restriction_satisfied(None, &[]));
    }
}
