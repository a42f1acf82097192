use crate::output::{print_json, unified_diff, write_atomically, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use log::debug;
use renet_board::{reconcile_board, KicadBoard, ReconcileOptions, ReconcileReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// KiCad board file (.kicad_pcb)
    #[arg(value_name = "BOARD", value_hint = clap::ValueHint::FilePath)]
    pub board: PathBuf,

    /// Write the updated board here instead of overwriting BOARD
    #[arg(short, long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Show the changes as a unified diff without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only renumber the named group. May be given more than once.
    #[arg(short, long = "group", value_name = "NAME")]
    pub groups: Vec<String>,

    /// Skip groups that lack one of the four roles instead of failing
    #[arg(long)]
    pub skip_incomplete: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct ApplyOutput<'a> {
    board: &'a Path,
    written: Option<&'a Path>,
    #[serde(flatten)]
    report: &'a ReconcileReport,
}

pub fn execute(args: ApplyArgs) -> Result<()> {
    let mut board = KicadBoard::read(&args.board)?;

    let options = ReconcileOptions {
        groups: args.groups.clone(),
        skip_incomplete: args.skip_incomplete,
    };
    let report = reconcile_board(&mut board, &options)
        .with_context(|| format!("No changes written to {}", args.board.display()))?;

    let target = args.output.as_deref().unwrap_or(&args.board);
    let rendered = board.render();

    // An unchanged board is only copied when an explicit output was asked for
    let written = if args.dry_run || (!board.is_modified() && args.output.is_none()) {
        None
    } else {
        write_atomically(target, &rendered)?;
        debug!("Wrote {} bytes to {}", rendered.len(), target.display());
        Some(target)
    };

    match args.format {
        OutputFormat::Json => print_json(&ApplyOutput {
            board: &args.board,
            written,
            report: &report,
        })?,
        OutputFormat::Human => {
            print_report(&report);
            if args.dry_run {
                if board.is_modified() {
                    println!();
                    print!("{}", unified_diff(&args.board, board.source(), &rendered));
                }
            } else if let Some(path) = written {
                println!("{} {}", "Wrote".green().bold(), path.display());
            } else {
                println!("{}", "Board already up to date".dimmed());
            }
        }
    }

    Ok(())
}

fn print_report(report: &ReconcileReport) {
    for group in &report.groups {
        println!(
            "{} {} {}",
            group.name.bold(),
            format!("({})", group.mosfet).dimmed(),
            format!("net number {}", group.net_number).cyan()
        );
        for pad in &group.pads {
            let pad_name = if pad.pad.is_empty() { "?" } else { pad.pad.as_str() };
            match &pad.renamed_to {
                Some(new) => println!(
                    "  {} pad {pad_name}: {} -> {}",
                    pad.footprint,
                    pad.net,
                    new.green()
                ),
                None => println!(
                    "{}",
                    format!("  {} pad {pad_name}: {}", pad.footprint, pad.net).dimmed()
                ),
            }
        }
    }

    for skipped in &report.skipped {
        println!("{} {}", "Skipped".yellow().bold(), skipped.reason);
    }

    let renamed = report.renamed_pads().count();
    println!(
        "{} groups, {} pads renamed, {} nets created",
        report.groups.len(),
        renamed,
        report.created_nets.len()
    );
}
