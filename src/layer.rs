use bitflags::bitflags;

use crate::reader::AseReader;
use crate::user_data::UserData;
use crate::writer::AseWriter;
use crate::{AseError, Result};

bitflags! {
    /// Layer flag word. Unknown bits are kept so they survive a round trip.
    pub struct LayerFlags: u16 {
        const VISIBLE = 0x0001;
        const EDITABLE = 0x0002;
        const LOCK_MOVEMENT = 0x0004;
        const BACKGROUND = 0x0008;
        const PREFER_LINKED_CELS = 0x0010;
        const DISPLAY_COLLAPSED = 0x0020;
        const REFERENCE = 0x0040;
    }
}

/// The kind of a layer. A tilemap layer carries the index of the tileset
/// its cels draw from; no other kind may.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// An ordinary image layer.
    Normal,
    /// A grouping layer; its children follow with a higher child level.
    Group,
    /// A tilemap layer referencing `tileset_index`.
    Tilemap {
        /// Index into the file's tilesets.
        tileset_index: u32,
    },
}

/// One layer, in the flat back-to-front order of the layer chunks.
///
/// The flat vector plus `child_level` is the canonical hierarchy
/// representation; see [`LayerHierarchy`] for the materialized tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub flags: LayerFlags,
    pub layer_type: LayerType,
    /// Depth in the layer hierarchy. Children of a group carry the group's
    /// level plus one.
    pub child_level: u16,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    pub name: String,
    pub user_data: Option<UserData>,
}

impl Layer {
    pub fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    pub fn is_editable(&self) -> bool {
        self.flags.contains(LayerFlags::EDITABLE)
    }

    pub fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }

    pub fn is_reference(&self) -> bool {
        self.flags.contains(LayerFlags::REFERENCE)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.layer_type, LayerType::Group)
    }
}

/// Cel blend modes, by wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

impl BlendMode {
    fn from_code(code: u16) -> Result<BlendMode> {
        match code {
            0 => Ok(BlendMode::Normal),
            1 => Ok(BlendMode::Multiply),
            2 => Ok(BlendMode::Screen),
            3 => Ok(BlendMode::Overlay),
            4 => Ok(BlendMode::Darken),
            5 => Ok(BlendMode::Lighten),
            6 => Ok(BlendMode::ColorDodge),
            7 => Ok(BlendMode::ColorBurn),
            8 => Ok(BlendMode::HardLight),
            9 => Ok(BlendMode::SoftLight),
            10 => Ok(BlendMode::Difference),
            11 => Ok(BlendMode::Exclusion),
            12 => Ok(BlendMode::Hue),
            13 => Ok(BlendMode::Saturation),
            14 => Ok(BlendMode::Color),
            15 => Ok(BlendMode::Luminosity),
            16 => Ok(BlendMode::Addition),
            17 => Ok(BlendMode::Subtract),
            18 => Ok(BlendMode::Divide),
            other => Err(AseError::InvalidBlendMode(other)),
        }
    }

    fn code(self) -> u16 {
        match self {
            BlendMode::Normal => 0,
            BlendMode::Multiply => 1,
            BlendMode::Screen => 2,
            BlendMode::Overlay => 3,
            BlendMode::Darken => 4,
            BlendMode::Lighten => 5,
            BlendMode::ColorDodge => 6,
            BlendMode::ColorBurn => 7,
            BlendMode::HardLight => 8,
            BlendMode::SoftLight => 9,
            BlendMode::Difference => 10,
            BlendMode::Exclusion => 11,
            BlendMode::Hue => 12,
            BlendMode::Saturation => 13,
            BlendMode::Color => 14,
            BlendMode::Luminosity => 15,
            BlendMode::Addition => 16,
            BlendMode::Subtract => 17,
            BlendMode::Divide => 18,
        }
    }
}

pub(crate) fn parse_layer_chunk(reader: &mut AseReader<'_>) -> Result<Layer> {
    let flags = LayerFlags {
        bits: reader.word()?,
    };
    let type_code = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = BlendMode::from_code(reader.word()?)?;
    let opacity = reader.byte()?;
    reader.skip(3)?;
    let name = reader.string()?;
    let layer_type = match type_code {
        0 => LayerType::Normal,
        1 => LayerType::Group,
        2 => LayerType::Tilemap {
            tileset_index: reader.dword()?,
        },
        other => return Err(AseError::InvalidLayerType(other)),
    };
    Ok(Layer {
        flags,
        layer_type,
        child_level,
        blend_mode,
        opacity,
        name,
        user_data: None,
    })
}

pub(crate) fn encode_layer_chunk(layer: &Layer) -> Result<Vec<u8>> {
    let mut w = AseWriter::new();
    w.word(layer.flags.bits());
    let type_code = match layer.layer_type {
        LayerType::Normal => 0,
        LayerType::Group => 1,
        LayerType::Tilemap { .. } => 2,
    };
    w.word(type_code);
    w.word(layer.child_level);
    w.word(0); // default width, ignored
    w.word(0); // default height, ignored
    w.word(layer.blend_mode.code());
    w.byte(layer.opacity);
    w.zeros(3);
    w.string(&layer.name)?;
    if let LayerType::Tilemap { tileset_index } = layer.layer_type {
        w.dword(tileset_index);
    }
    Ok(w.into_bytes())
}

/// The layer tree, materialized on demand from the flat vector.
#[derive(Debug)]
pub struct LayerHierarchy {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl LayerHierarchy {
    /// Build the tree with a stack over the depth-first pre-order chunk
    /// sequence: pop while the stack top is at or below the new layer's
    /// level, then attach to the remaining top (or as a root).
    pub fn build(layers: &[Layer]) -> LayerHierarchy {
        let mut parent = vec![None; layers.len()];
        let mut children = vec![Vec::new(); layers.len()];
        let mut roots = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        for (index, layer) in layers.iter().enumerate() {
            while stack
                .last()
                .map(|&top| layers[top].child_level >= layer.child_level)
                .unwrap_or(false)
            {
                stack.pop();
            }
            match stack.last() {
                None => roots.push(index),
                Some(&top) => {
                    parent[index] = Some(top);
                    children[top].push(index);
                }
            }
            if layer.is_group() {
                stack.push(index);
            }
        }
        LayerHierarchy {
            parent,
            children,
            roots,
        }
    }

    pub fn parent(&self, layer: usize) -> Option<usize> {
        self.parent[layer]
    }

    pub fn children(&self, layer: usize) -> &[usize] {
        &self.children[layer]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// A layer is effectively visible when it and all its ancestors are.
    pub fn is_effectively_visible(&self, layers: &[Layer], layer: usize) -> bool {
        let mut current = Some(layer);
        while let Some(index) = current {
            if !layers[index].is_visible() {
                return false;
            }
            current = self.parent[index];
        }
        true
    }
}
