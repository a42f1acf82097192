//! Pad-by-pad net renumbering for laser-driver groups.
//!
//! Every group is classified before the first pad is touched, so a board
//! with an incomplete group is left exactly as it was loaded (unless the
//! caller opts into skipping such groups).

use crate::board::{GroupMember, KicadBoard};
use crate::group::{GroupError, LaserDriverGroup, Role};
use crate::renumber::renumber_net_name;
use log::{debug, info, warn};
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Only process groups with these names; empty means every group.
    pub groups: Vec<String>,
    /// Report incomplete groups instead of failing on them.
    pub skip_incomplete: bool,
}

/// Outcome for one pad that has a net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadChange {
    pub footprint: String,
    pub pad: String,
    pub net: String,
    /// New net name, or `None` if the pad already matched.
    pub renamed_to: Option<String>,
}

/// Pads visited for one renumbered group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub mosfet: String,
    pub net_number: String,
    pub pads: Vec<PadChange>,
}

/// A group left untouched because it could not be classified.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedGroup {
    pub name: String,
    pub reason: String,
}

/// Everything [`reconcile_board`] changed or skipped.
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub groups: Vec<GroupReport>,
    pub skipped: Vec<SkippedGroup>,
    pub created_nets: Vec<String>,
    pub rebound_pads: usize,
}

impl ReconcileReport {
    /// Pads that were moved to a new net, across all groups.
    pub fn renamed_pads(&self) -> impl Iterator<Item = &PadChange> {
        self.groups
            .iter()
            .flat_map(|g| g.pads.iter())
            .filter(|p| p.renamed_to.is_some())
    }
}

/// Renumber the nets on every pad of one footprint.
///
/// Pads without a net (or with the empty "unconnected" net) are skipped.
/// Pads whose name has no digits, or already carries `number`, are reported
/// unchanged without any net lookup.
pub fn reconcile_footprint(board: &mut KicadBoard, footprint: usize, number: &str) -> Vec<PadChange> {
    let Some(fp) = board.footprint(footprint) else {
        return Vec::new();
    };
    let reference = fp.reference().to_string();
    let pads: Vec<_> = fp
        .pad_refs()
        .zip(fp.pads.iter().map(|p| p.number.clone()))
        .collect();

    let mut changes = Vec::new();
    for (pad_ref, pad_number) in pads {
        let Some(net) = board.pad_net_name(pad_ref).filter(|n| !n.is_empty()) else {
            continue;
        };
        let net = net.to_string();
        let shown = if pad_number.is_empty() { "?" } else { &pad_number };

        let renamed_to = match renumber_net_name(&net, number) {
            Cow::Owned(updated) if updated != net => {
                let target = board.ensure_net(&updated);
                // pad_ref came from this footprint, so it always resolves
                if let Err(e) = board.set_pad_net(pad_ref, &target) {
                    warn!("{reference}: {e}");
                    continue;
                }
                info!("      Pad: {shown} -> {net} => {updated}");
                Some(updated)
            }
            _ => {
                info!("      Pad: {shown} -> {net}");
                None
            }
        };

        changes.push(PadChange {
            footprint: reference.clone(),
            pad: pad_number,
            net,
            renamed_to,
        });
    }
    changes
}

fn describe_members(members: &[GroupMember<'_>]) {
    for member in members {
        match member {
            GroupMember::Footprint(fp) => debug!("   Footprint {}", fp.reference()),
            GroupMember::Item { kind, .. } => debug!("   {kind}"),
            GroupMember::Missing(uuid) => debug!("   <unresolved {uuid}>"),
        }
    }
}

/// Classify the selected groups. Returns the complete groups paired with
/// their net number, plus the skipped ones when `skip_incomplete` is set.
pub fn classify_groups(
    board: &KicadBoard,
    options: &ReconcileOptions,
) -> Result<(Vec<(LaserDriverGroup, String)>, Vec<SkippedGroup>), GroupError> {
    for wanted in &options.groups {
        if !board.groups().iter().any(|g| &g.name == wanted) {
            return Err(GroupError::UnknownGroup {
                group: wanted.clone(),
            });
        }
    }

    let mut complete = Vec::new();
    let mut skipped = Vec::new();

    for group in board.groups() {
        if !options.groups.is_empty() && !options.groups.contains(&group.name) {
            continue;
        }

        let members = board.group_members(group);
        info!("Group: '{}'  ({} items)", group.name, members.len());
        describe_members(&members);

        let footprints = members.iter().filter_map(|m| match m {
            GroupMember::Footprint(fp) => Some(*fp),
            _ => None,
        });

        let classified = LaserDriverGroup::classify(&group.name, footprints)
            .and_then(|g| g.net_number().map(|number| (g, number)));

        match classified {
            Ok(entry) => complete.push(entry),
            Err(e) if options.skip_incomplete => {
                warn!("Skipping: {e}");
                skipped.push(SkippedGroup {
                    name: group.name.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok((complete, skipped))
}

/// Renumber the nets of every laser-driver group on the board.
pub fn reconcile_board(
    board: &mut KicadBoard,
    options: &ReconcileOptions,
) -> Result<ReconcileReport, GroupError> {
    let (groups, skipped) = classify_groups(board, options)?;
    let mut report = ReconcileReport {
        skipped,
        ..Default::default()
    };

    for (group, number) in groups {
        info!("mosfet reference {}", group.mosfet.reference);

        let mut pads = Vec::new();
        for role in Role::ALL {
            let member = group.member(role);
            debug!("  {role}: {}", member.reference);
            pads.extend(reconcile_footprint(board, member.footprint, &number));
        }

        report.groups.push(GroupReport {
            name: group.name.clone(),
            mosfet: group.mosfet.reference.clone(),
            net_number: number,
            pads,
        });
    }

    report.created_nets = board
        .created_nets()
        .iter()
        .map(|net| net.name.clone())
        .collect();
    report.rebound_pads = board.rebound_pads();

    info!(
        "Renumbered {} groups: {} pads rebound, {} nets created",
        report.groups.len(),
        report.rebound_pads,
        report.created_nets.len()
    );

    Ok(report)
}
