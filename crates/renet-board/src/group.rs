//! Role assignment for laser-driver groups.

use crate::board::Footprint;
use log::warn;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The part a footprint plays in a laser-driver group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Laser,
    Resistor10k,
    Resistor220,
    Mosfet,
}

impl Role {
    /// Processing order for pads.
    pub const ALL: [Role; 4] = [
        Role::Laser,
        Role::Resistor10k,
        Role::Resistor220,
        Role::Mosfet,
    ];

    /// Lowercase name used in messages and JSON.
    pub fn name(self) -> &'static str {
        match self {
            Role::Laser => "laser",
            Role::Resistor10k => "resistor10k",
            Role::Resistor220 => "resistor220",
            Role::Mosfet => "mosfet",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a board group cannot be renumbered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("Group '{group}' missing expected members: [{}]", join_roles(.missing))]
    MissingMembers { group: String, missing: Vec<Role> },

    #[error("Group '{group}': MOSFET reference '{reference}' carries no net number")]
    EmptyNetNumber { group: String, reference: String },

    #[error("No group named '{group}' on the board")]
    UnknownGroup { group: String },
}

fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
}

/// A footprint bound to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    #[serde(skip)]
    pub footprint: usize,
    pub reference: String,
}

impl Member {
    fn from_footprint(fp: &Footprint) -> Self {
        Self {
            footprint: fp.index,
            reference: fp.reference().to_string(),
        }
    }
}

/// A board group with all four roles filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaserDriverGroup {
    pub name: String,
    pub laser: Member,
    pub resistor10k: Member,
    pub resistor220: Member,
    pub mosfet: Member,
}

impl LaserDriverGroup {
    /// Assign roles by reference prefix: `LD` laser, `Q` mosfet, first `R`
    /// resistor10k, second `R` resistor220. Footprints without a reference
    /// are ignored; a repeated role keeps the last footprint seen.
    pub fn classify<'a>(
        name: &str,
        members: impl IntoIterator<Item = &'a Footprint>,
    ) -> Result<Self, GroupError> {
        let mut laser = None;
        let mut resistor10k = None;
        let mut resistor220 = None;
        let mut mosfet = None;

        for fp in members {
            let reference = fp.reference();
            if reference.is_empty() {
                continue;
            }
            let (role, slot) = if reference.starts_with("LD") {
                (Role::Laser, &mut laser)
            } else if reference.starts_with('Q') {
                (Role::Mosfet, &mut mosfet)
            } else if reference.starts_with('R') {
                if resistor10k.is_none() {
                    (Role::Resistor10k, &mut resistor10k)
                } else {
                    (Role::Resistor220, &mut resistor220)
                }
            } else {
                continue;
            };

            if let Some(previous) = slot.replace(Member::from_footprint(fp)) {
                warn!(
                    "Group '{name}': {reference} replaces {} as {role}",
                    previous.reference
                );
            }
        }

        match (laser, resistor10k, resistor220, mosfet) {
            (Some(laser), Some(resistor10k), Some(resistor220), Some(mosfet)) => Ok(Self {
                name: name.to_string(),
                laser,
                resistor10k,
                resistor220,
                mosfet,
            }),
            (laser, resistor10k, resistor220, mosfet) => {
                let filled = [
                    (Role::Laser, laser.is_some()),
                    (Role::Resistor10k, resistor10k.is_some()),
                    (Role::Resistor220, resistor220.is_some()),
                    (Role::Mosfet, mosfet.is_some()),
                ];
                let mut missing: Vec<Role> = filled
                    .into_iter()
                    .filter(|(_, present)| !present)
                    .map(|(role, _)| role)
                    .collect();
                missing.sort_by_key(|role| role.name());
                Err(GroupError::MissingMembers {
                    group: name.to_string(),
                    missing,
                })
            }
        }
    }

    /// The footprint filling `role`.
    pub fn member(&self, role: Role) -> &Member {
        match role {
            Role::Laser => &self.laser,
            Role::Resistor10k => &self.resistor10k,
            Role::Resistor220 => &self.resistor220,
            Role::Mosfet => &self.mosfet,
        }
    }

    /// Members in pad-processing order.
    pub fn members(&self) -> impl Iterator<Item = (Role, &Member)> {
        Role::ALL.into_iter().map(|role| (role, self.member(role)))
    }

    /// The MOSFET reference with every `Q` removed: `Q37` gives `37`.
    pub fn net_number(&self) -> Result<String, GroupError> {
        let number = self.mosfet.reference.replace('Q', "");
        if number.is_empty() {
            return Err(GroupError::EmptyNetNumber {
                group: self.name.clone(),
                reference: self.mosfet.reference.clone(),
            });
        }
        Ok(number)
    }
}
