//! Renumber the nets of laser-driver groups on a KiCad board.
//!
//! A laser-driver group is a board group holding one laser diode (`LD*`),
//! two resistors (`R*`) and one MOSFET (`Q*`). Every net touching the group's
//! pads is renamed so its digits match the MOSFET's number: with `Q37` in the
//! group, `LD_1` becomes `LD_37` and `Net-(R5-Pad2)` becomes `Net-(R37-Pad37)`.

pub mod board;
pub mod group;
pub mod reconcile;
pub mod renumber;

pub use board::{BoardGroup, Footprint, GroupMember, KicadBoard, NetHandle, Pad, PadRef};
pub use group::{GroupError, LaserDriverGroup, Member, Role};
pub use reconcile::{
    reconcile_board, reconcile_footprint, GroupReport, PadChange, ReconcileOptions,
    ReconcileReport, SkippedGroup,
};
pub use renumber::renumber_net_name;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or editing a board.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse board: {0}")]
    Parse(#[from] renet_sexpr::ParseError),

    #[error("Not a KiCad board: expected a (kicad_pcb ...) root, found '{found}'")]
    NotABoard { found: String },

    #[error("No such pad: {0}")]
    UnknownPad(PadRef),
}
