//! Editable view of a `.kicad_pcb` file.
//!
//! The board is indexed once from the parsed tree. Edits (new nets, pad
//! rebinds) are kept aside and only turned into text patches on
//! [`KicadBoard::render`], so the untouched parts of the file come back
//! byte-for-byte.

use crate::BoardError;
use log::{debug, trace};
use renet_sexpr::{quote_string, PatchSet, Sexpr, SexprKind, Span};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// A net as seen by callers: the name plus its code on boards that keep a
/// net table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetHandle {
    pub code: Option<i64>,
    pub name: String,
}

impl NetHandle {
    fn to_sexpr(&self) -> String {
        match self.code {
            Some(code) => format!("(net {code} {})", quote_string(&self.name)),
            None => format!("(net {})", quote_string(&self.name)),
        }
    }
}

/// The `(net ..)` list inside a pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadNet {
    pub code: Option<i64>,
    pub name: String,
    span: Span,
}

/// A footprint pad and its net binding as loaded.
#[derive(Debug, Clone)]
pub struct Pad {
    pub number: String,
    pub net: Option<PadNet>,
    span: Span,
}

/// A `(footprint ..)` (or legacy `(module ..)`) on the board.
#[derive(Debug, Clone)]
pub struct Footprint {
    /// Position among the board's footprints; stable for the board's lifetime.
    pub index: usize,
    pub fpid: Option<String>,
    pub uuid: Option<String>,
    pub reference: Option<String>,
    pub pads: Vec<Pad>,
}

impl Footprint {
    /// Reference designator, or `""` if the footprint has none.
    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or("")
    }

    /// Handles for every pad of this footprint, in file order.
    pub fn pad_refs(&self) -> impl Iterator<Item = PadRef> + '_ {
        (0..self.pads.len()).map(|pad| PadRef {
            footprint: self.index,
            pad,
        })
    }
}

/// A board-level `(group "NAME" ... (members ...))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardGroup {
    pub name: String,
    pub uuid: Option<String>,
    pub members: Vec<String>,
}

/// What a group member uuid resolves to.
#[derive(Debug, Clone, Copy)]
pub enum GroupMember<'a> {
    Footprint(&'a Footprint),
    /// Any other board item carrying a uuid: tracks, vias, zones, groups...
    Item { uuid: &'a str, kind: &'a str },
    Missing(&'a str),
}

/// Handle for one pad: footprint index plus pad index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PadRef {
    pub footprint: usize,
    pub pad: usize,
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "footprint #{} pad #{}", self.footprint, self.pad)
    }
}

#[derive(Debug, Default)]
struct NetTable {
    nets: Vec<NetHandle>,
    by_name: HashMap<String, usize>,
    /// Whether the board declares nets at top level (`(net N "NAME")`).
    declared: bool,
    next_code: i64,
    /// Byte offset right after the last declaration.
    insert_at: usize,
    /// Text placed before each inserted declaration.
    separator: String,
}

impl NetTable {
    fn declare(&mut self, node: &Sexpr, source: &str) {
        let Some(code) = node.get(1).and_then(Sexpr::as_int) else {
            trace!("Ignoring net declaration without a code at byte {}", node.span.start);
            return;
        };
        let name = node
            .get(2)
            .and_then(|name| atom_text(name, source))
            .unwrap_or_default();

        self.declared = true;
        self.next_code = self.next_code.max(code + 1);
        self.insert_at = node.span.end;
        self.separator = separator_before(source, node.span.start);
        self.add(NetHandle {
            code: Some(code),
            name,
        });
    }

    fn observe(&mut self, name: &str, code: Option<i64>) {
        if !self.by_name.contains_key(name) {
            self.add(NetHandle {
                code,
                name: name.to_string(),
            });
        }
    }

    fn register(&mut self, name: &str) -> NetHandle {
        let code = self.declared.then(|| {
            let code = self.next_code;
            self.next_code += 1;
            code
        });
        let net = NetHandle {
            code,
            name: name.to_string(),
        };
        self.add(net.clone());
        net
    }

    fn add(&mut self, net: NetHandle) {
        // First declaration wins, matching KiCad's name lookup.
        self.by_name
            .entry(net.name.clone())
            .or_insert(self.nets.len());
        self.nets.push(net);
    }

    fn get(&self, name: &str) -> Option<&NetHandle> {
        self.by_name.get(name).map(|&i| &self.nets[i])
    }
}

/// Whitespace that introduces the node starting at `start`, so inserted
/// siblings line up with it.
fn separator_before(source: &str, start: usize) -> String {
    let Some(newline) = source[..start].rfind('\n') else {
        return " ".to_string();
    };
    let indent = &source[newline + 1..start];
    let line_ending = if source[..newline].ends_with('\r') {
        "\r\n"
    } else {
        "\n"
    };
    if indent.chars().all(char::is_whitespace) {
        format!("{line_ending}{indent}")
    } else {
        " ".to_string()
    }
}

/// A loaded board plus the edits pending on it.
#[derive(Debug)]
pub struct KicadBoard {
    source: String,
    nets: NetTable,
    footprints: Vec<Footprint>,
    footprint_by_uuid: HashMap<String, usize>,
    item_kinds: HashMap<String, String>,
    groups: Vec<BoardGroup>,
    created: Vec<NetHandle>,
    rebinds: BTreeMap<PadRef, NetHandle>,
}

impl KicadBoard {
    /// Parse and index the text of a `.kicad_pcb` file.
    pub fn parse(source: impl Into<String>) -> Result<Self, BoardError> {
        let source = source.into();
        let root = renet_sexpr::parse(&source)?;
        if root.tag() != Some("kicad_pcb") {
            return Err(BoardError::NotABoard {
                found: root
                    .tag()
                    .or_else(|| root.as_atom())
                    .unwrap_or("<list>")
                    .to_string(),
            });
        }

        let mut nets = NetTable::default();
        let mut footprints: Vec<Footprint> = Vec::new();
        let mut groups = Vec::new();
        let mut item_kinds = HashMap::new();

        for item in root.as_list().unwrap_or_default().iter().skip(1) {
            let Some(tag) = item.tag() else { continue };
            match tag {
                "net" => nets.declare(item, &source),
                // `module` is the pre-v6 spelling
                "footprint" | "module" => {
                    footprints.push(parse_footprint(footprints.len(), item, &source))
                }
                "group" => groups.push(parse_group(item, &source)),
                _ => {}
            }
            if let Some(uuid) = item_uuid(item, &source) {
                item_kinds.insert(uuid, tag.to_string());
            }
        }

        if !nets.declared {
            for net in footprints
                .iter()
                .flat_map(|fp| fp.pads.iter())
                .filter_map(|pad| pad.net.as_ref())
            {
                nets.observe(&net.name, net.code);
            }
        }

        let mut footprint_by_uuid = HashMap::new();
        for fp in &footprints {
            if let Some(uuid) = &fp.uuid {
                footprint_by_uuid.insert(uuid.clone(), fp.index);
            }
        }

        debug!(
            "Indexed board: {} nets ({}), {} footprints, {} groups",
            nets.nets.len(),
            if nets.declared { "net table" } else { "pad-only" },
            footprints.len(),
            groups.len()
        );

        Ok(Self {
            source,
            nets,
            footprints,
            footprint_by_uuid,
            item_kinds,
            groups,
            created: Vec::new(),
            rebinds: BTreeMap::new(),
        })
    }

    /// Read and index the board at `path`.
    pub fn read(path: &Path) -> Result<Self, BoardError> {
        let source = std::fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source)
    }

    /// The text the board was loaded from, without pending edits.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Board groups in file order.
    pub fn groups(&self) -> &[BoardGroup] {
        &self.groups
    }

    /// All footprints in file order.
    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    /// Footprint by its position in file order.
    pub fn footprint(&self, index: usize) -> Option<&Footprint> {
        self.footprints.get(index)
    }

    /// Footprint carrying `uuid` (or legacy `tstamp`).
    pub fn footprint_by_uuid(&self, uuid: &str) -> Option<&Footprint> {
        self.footprint_by_uuid
            .get(uuid)
            .map(|&i| &self.footprints[i])
    }

    /// Resolve each member uuid of `group`, keeping member order.
    pub fn group_members<'a>(&'a self, group: &'a BoardGroup) -> Vec<GroupMember<'a>> {
        group
            .members
            .iter()
            .map(|uuid| {
                if let Some(fp) = self.footprint_by_uuid(uuid) {
                    GroupMember::Footprint(fp)
                } else if let Some(kind) = self.item_kinds.get(uuid) {
                    GroupMember::Item { uuid, kind }
                } else {
                    GroupMember::Missing(uuid)
                }
            })
            .collect()
    }

    /// Whether the board declares a top-level net table.
    pub fn has_net_table(&self) -> bool {
        self.nets.declared
    }

    /// Known nets, declared ones first, then those created since loading.
    pub fn nets(&self) -> impl Iterator<Item = &NetHandle> {
        self.nets.nets.iter()
    }

    /// Look up a net without creating it.
    pub fn net_by_name(&self, name: &str) -> Option<NetHandle> {
        self.nets.get(name).cloned()
    }

    /// Return the net called `name`, registering it first if the board does
    /// not have one yet. Repeated calls return the same net.
    pub fn ensure_net(&mut self, name: &str) -> NetHandle {
        if let Some(net) = self.nets.get(name) {
            return net.clone();
        }
        let net = self.nets.register(name);
        debug!("Created net {:?} (code {:?})", net.name, net.code);
        self.created.push(net.clone());
        net
    }

    /// Nets registered by [`Self::ensure_net`] since the board was loaded.
    pub fn created_nets(&self) -> &[NetHandle] {
        &self.created
    }

    /// Net name the pad is currently bound to, including pending rebinds.
    pub fn pad_net_name(&self, pad: PadRef) -> Option<&str> {
        if let Some(net) = self.rebinds.get(&pad) {
            return Some(&net.name);
        }
        self.pad(pad)?.net.as_ref().map(|net| net.name.as_str())
    }

    /// The pad as loaded, ignoring pending rebinds.
    pub fn pad(&self, pad: PadRef) -> Option<&Pad> {
        self.footprints.get(pad.footprint)?.pads.get(pad.pad)
    }

    /// Bind `pad` to `net`. A later call for the same pad replaces this one.
    pub fn set_pad_net(&mut self, pad: PadRef, net: &NetHandle) -> Result<(), BoardError> {
        if self.pad(pad).is_none() {
            return Err(BoardError::UnknownPad(pad));
        }
        self.rebinds.insert(pad, net.clone());
        Ok(())
    }

    /// Number of pads with a pending rebind.
    pub fn rebound_pads(&self) -> usize {
        self.rebinds.len()
    }

    /// True if rendering would change the source text.
    pub fn is_modified(&self) -> bool {
        !self.created.is_empty() || !self.rebinds.is_empty()
    }

    /// Text edits that turn the loaded source into the current board state.
    pub fn patches(&self) -> PatchSet {
        let mut patches = PatchSet::new();

        for net in self.created.iter().filter(|net| net.code.is_some()) {
            patches.insert(
                self.nets.insert_at,
                format!("{}{}", self.nets.separator, net.to_sexpr()),
            );
        }

        for (&pad_ref, net) in &self.rebinds {
            let Some(pad) = self.pad(pad_ref) else {
                continue;
            };
            match &pad.net {
                Some(existing) => patches.replace_raw(existing.span, net.to_sexpr()),
                // Before the pad's closing paren.
                None => patches.insert(pad.span.end - 1, format!(" {}", net.to_sexpr())),
            }
        }

        patches
    }

    /// The board text with every pending edit applied.
    pub fn render(&self) -> String {
        self.patches().apply(&self.source)
    }
}

/// Text of an identifier-like atom. Pre-v6 files leave pad numbers, net
/// names and timestamps unquoted, so some of them parse as numbers; those
/// are read back from the source so `1.50` stays `1.50`.
fn atom_text(node: &Sexpr, source: &str) -> Option<String> {
    match &node.kind {
        SexprKind::Int(_) | SexprKind::F64(_) => source
            .get(node.span.start..node.span.end)
            .map(str::to_string),
        _ => node.as_atom().map(str::to_string),
    }
}

fn item_uuid(item: &Sexpr, source: &str) -> Option<String> {
    ["uuid", "tstamp", "id"]
        .into_iter()
        .find_map(|tag| atom_text(item.find_list(tag)?.get(1)?, source))
}

fn parse_footprint(index: usize, node: &Sexpr, source: &str) -> Footprint {
    let reference = node
        .find_all_lists("property")
        .find(|p| p.get(1).and_then(Sexpr::as_atom) == Some("Reference"))
        .or_else(|| {
            node.find_all_lists("fp_text")
                .find(|t| t.get(1).and_then(Sexpr::as_sym) == Some("reference"))
        })
        .and_then(|list| atom_text(list.get(2)?, source));

    let pads = node
        .find_all_lists("pad")
        .map(|pad| parse_pad(pad, source))
        .collect();

    Footprint {
        index,
        fpid: node.get(1).and_then(Sexpr::as_atom).map(str::to_string),
        uuid: item_uuid(node, source),
        reference,
        pads,
    }
}

fn parse_pad(node: &Sexpr, source: &str) -> Pad {
    let net = node.find_list("net").map(|list| {
        let code = list.get(1).and_then(Sexpr::as_int);
        // `(net 3 "NAME")` with a net table, `(net "NAME")` without
        let name_index = if code.is_some() { 2 } else { 1 };
        PadNet {
            code,
            name: list
                .get(name_index)
                .and_then(|name| atom_text(name, source))
                .unwrap_or_default(),
            span: list.span,
        }
    });

    Pad {
        number: node
            .get(1)
            .and_then(|number| atom_text(number, source))
            .unwrap_or_default(),
        net,
        span: node.span,
    }
}

fn parse_group(node: &Sexpr, source: &str) -> BoardGroup {
    BoardGroup {
        name: node
            .get(1)
            .and_then(|name| atom_text(name, source))
            .unwrap_or_default(),
        uuid: item_uuid(node, source),
        members: node
            .find_list("members")
            .and_then(Sexpr::as_list)
            .unwrap_or_default()
            .iter()
            .skip(1)
            .filter_map(|member| atom_text(member, source))
            .collect(),
    }
}
