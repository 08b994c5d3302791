//! The implicit user-data attachment rules.
//!
//! The wire format does not say which entity a UserData chunk belongs to;
//! ownership is inferred from chunk adjacency. This module is that inference
//! alone, decoupled from byte parsing and from the model, so the rules can
//! be tested by feeding it a chunk sequence directly.

/// Identifies a cel across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CelHandle {
    pub frame: usize,
    pub cel: usize,
}

/// The entity the next user-data chunk attaches to, when no sub-cursor is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachTarget {
    None,
    Layer(usize),
    Cel(CelHandle),
    Slice(usize),
    Tileset(usize),
}

/// Where a user-data chunk ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UserDataSlot {
    Layer(usize),
    Cel(CelHandle),
    Slice(usize),
    Tag(usize),
    /// The tileset's own user data.
    Tileset(usize),
    /// User data of one tile of a tileset.
    TilesetTile { tileset: usize, tile: usize },
    /// Sprite-level user data (frame 0, nothing else pending).
    Sprite,
    /// No target; the chunk is kept in the frame's chunk list but attaches
    /// to nothing.
    Discard,
}

#[derive(Debug, Clone, Copy)]
struct PendingTags {
    first_tag: usize,
    count: usize,
    next: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TilesetPhase {
    /// The next user-data chunk is the tileset's own.
    TilesetUserData,
    /// Subsequent chunks belong to tiles, in index order.
    TileUserData,
}

#[derive(Debug, Clone, Copy)]
struct PendingTileset {
    tileset: usize,
    phase: TilesetPhase,
    tile_index: usize,
}

/// A single instance is threaded through the whole frame/chunk walk.
#[derive(Debug)]
pub(crate) struct AttachmentState {
    target: AttachTarget,
    pending_tags: Option<PendingTags>,
    pending_tileset: Option<PendingTileset>,
    last_cel: Option<CelHandle>,
}

impl AttachmentState {
    pub(crate) fn new() -> AttachmentState {
        AttachmentState {
            target: AttachTarget::None,
            pending_tags: None,
            pending_tileset: None,
            last_cel: None,
        }
    }

    pub(crate) fn on_layer(&mut self, layer: usize) {
        self.target = AttachTarget::Layer(layer);
        self.pending_tags = None;
        self.pending_tileset = None;
    }

    pub(crate) fn on_cel(&mut self, cel: CelHandle) {
        self.target = AttachTarget::Cel(cel);
        self.pending_tags = None;
        self.pending_tileset = None;
        self.last_cel = Some(cel);
    }

    /// Cel-extra chunks attach to the most recent cel and do not move any
    /// cursor.
    pub(crate) fn on_cel_extra(&self) -> Option<CelHandle> {
        self.last_cel
    }

    pub(crate) fn on_slice(&mut self, slice: usize) {
        self.target = AttachTarget::Slice(slice);
        self.pending_tags = None;
        self.pending_tileset = None;
    }

    pub(crate) fn on_tileset(&mut self, tileset: usize) {
        self.target = AttachTarget::Tileset(tileset);
        self.pending_tags = None;
        self.pending_tileset = Some(PendingTileset {
            tileset,
            phase: TilesetPhase::TilesetUserData,
            tile_index: 0,
        });
    }

    pub(crate) fn on_tags(&mut self, first_tag: usize, count: usize) {
        self.target = AttachTarget::None;
        self.pending_tileset = None;
        self.pending_tags = Some(PendingTags {
            first_tag,
            count,
            next: 0,
        });
    }

    /// Palette, old-palette, color-profile and external-files chunks clear
    /// everything.
    pub(crate) fn on_neutral(&mut self) {
        self.target = AttachTarget::None;
        self.pending_tags = None;
        self.pending_tileset = None;
    }

    /// Resolve the slot for an arriving user-data chunk and advance the
    /// active sub-cursor.
    pub(crate) fn on_user_data(&mut self, frame: usize) -> UserDataSlot {
        if let Some(ref mut tags) = self.pending_tags {
            if tags.next < tags.count {
                let slot = UserDataSlot::Tag(tags.first_tag + tags.next);
                tags.next += 1;
                return slot;
            }
        }
        if let Some(ref mut pending) = self.pending_tileset {
            return match pending.phase {
                TilesetPhase::TilesetUserData => {
                    pending.phase = TilesetPhase::TileUserData;
                    pending.tile_index = 0;
                    UserDataSlot::Tileset(pending.tileset)
                }
                TilesetPhase::TileUserData => {
                    let slot = UserDataSlot::TilesetTile {
                        tileset: pending.tileset,
                        tile: pending.tile_index,
                    };
                    pending.tile_index += 1;
                    slot
                }
            };
        }
        match self.target {
            AttachTarget::Layer(layer) => UserDataSlot::Layer(layer),
            AttachTarget::Cel(cel) => UserDataSlot::Cel(cel),
            AttachTarget::Slice(slice) => UserDataSlot::Slice(slice),
            AttachTarget::Tileset(tileset) => UserDataSlot::Tileset(tileset),
            AttachTarget::None if frame == 0 => UserDataSlot::Sprite,
            AttachTarget::None => UserDataSlot::Discard,
        }
    }
}
