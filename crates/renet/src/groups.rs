use crate::output::{print_json, OutputFormat};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use renet_board::{GroupMember, KicadBoard, LaserDriverGroup};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// KiCad board file (.kicad_pcb)
    #[arg(value_name = "BOARD", value_hint = clap::ValueHint::FilePath)]
    pub board: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct GroupListing {
    name: String,
    members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<LaserDriverGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    net_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn describe(member: &GroupMember<'_>) -> String {
    match member {
        GroupMember::Footprint(fp) => format!("Footprint {}", fp.reference()),
        GroupMember::Item { kind, .. } => kind.to_string(),
        GroupMember::Missing(uuid) => format!("<missing {uuid}>"),
    }
}

fn list_groups(board: &KicadBoard) -> Vec<GroupListing> {
    board
        .groups()
        .iter()
        .map(|group| {
            let members = board.group_members(group);
            let footprints = members.iter().filter_map(|m| match m {
                GroupMember::Footprint(fp) => Some(*fp),
                _ => None,
            });
            let classified = LaserDriverGroup::classify(&group.name, footprints)
                .and_then(|g| g.net_number().map(|n| (g, n)));

            let (roles, net_number, error) = match classified {
                Ok((roles, number)) => (Some(roles), Some(number), None),
                Err(e) => (None, None, Some(e.to_string())),
            };
            GroupListing {
                name: group.name.clone(),
                members: members.iter().map(describe).collect(),
                roles,
                net_number,
                error,
            }
        })
        .collect()
}

pub fn execute(args: GroupsArgs) -> Result<()> {
    let board = KicadBoard::read(&args.board)?;
    let listings = list_groups(&board);

    match args.format {
        OutputFormat::Json => print_json(&listings)?,
        OutputFormat::Human => print_table(&listings),
    }
    Ok(())
}

fn print_table(listings: &[GroupListing]) {
    if listings.is_empty() {
        println!("No groups found");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        ["Group", "Members", "Laser", "10k", "220", "MOSFET", "Net #"]
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for listing in listings {
        let mut row = vec![
            Cell::new(&listing.name),
            Cell::new(listing.members.join("\n")),
        ];
        match (&listing.roles, &listing.net_number) {
            (Some(roles), Some(number)) => {
                row.extend(
                    roles
                        .members()
                        .map(|(_, member)| Cell::new(&member.reference)),
                );
                row.push(Cell::new(number.green().to_string()));
            }
            _ => row.push(Cell::new(
                listing.error.as_deref().unwrap_or_default().red().to_string(),
            )),
        }
        table.add_row(row);
    }

    println!("{table}");
}
