use crate::cel::CelContent;
use crate::file::{AsepriteFile, PixelFormat};
use crate::layer::LayerType;

/// How bad a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Machine-readable code of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    NonPositiveDimensions,
    BadColorDepth,
    FrameCountMismatch,
    CelLayerOutOfRange,
    LinkedCelOutOfRange,
    LinkedCelNotEarlier,
    MissingPalette,
    TagRangeInvalid,
    SliceKeyOutOfRange,
    SliceKeyEmpty,
    DuplicateTilesetId,
    ChildLevelSkip,
    TilemapLayerWithoutTileset,
}

/// Which part of the file an issue points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    File,
    Frame(usize),
    Layer(usize),
    Cel { frame: usize, cel: usize },
    Tag(usize),
    Slice(usize),
    Tileset(usize),
}

/// One finding of [`validate`].
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub location: Location,
}

impl ValidationIssue {
    fn new(severity: Severity, code: IssueCode, location: Location, message: String) -> Self {
        ValidationIssue {
            severity,
            code,
            message,
            location,
        }
    }
}

/// Structural checks over a decoded file. Never fails; issues are returned
/// for the caller to weigh.
pub fn validate(file: &AsepriteFile) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let frame_count = file.frames.len();

    if file.header.width == 0 || file.header.height == 0 {
        issues.push(ValidationIssue::new(
            Severity::Error,
            IssueCode::NonPositiveDimensions,
            Location::File,
            format!(
                "sprite dimensions must be positive, got {}x{}",
                file.header.width, file.header.height
            ),
        ));
    }

    if !matches!(file.header.color_depth, 8 | 16 | 32) {
        issues.push(ValidationIssue::new(
            Severity::Error,
            IssueCode::BadColorDepth,
            Location::File,
            format!("color depth {} is not 8, 16 or 32", file.header.color_depth),
        ));
    }

    if file.header.frame_count as usize != frame_count {
        issues.push(ValidationIssue::new(
            Severity::Warning,
            IssueCode::FrameCountMismatch,
            Location::File,
            format!(
                "header declares {} frames, file holds {}",
                file.header.frame_count, frame_count
            ),
        ));
    }

    if matches!(
        file.header.pixel_format(),
        Ok(PixelFormat::Indexed { .. })
    ) && file.palette.is_none()
    {
        issues.push(ValidationIssue::new(
            Severity::Error,
            IssueCode::MissingPalette,
            Location::File,
            "indexed sprite has no palette".to_owned(),
        ));
    }

    check_cels(file, &mut issues);
    check_layers(file, &mut issues);
    check_tags(file, frame_count, &mut issues);
    check_slices(file, frame_count, &mut issues);
    check_tilesets(file, &mut issues);

    issues
}

fn check_cels(file: &AsepriteFile, issues: &mut Vec<ValidationIssue>) {
    for (frame_index, frame) in file.frames.iter().enumerate() {
        for (cel_index, cel) in frame.cels.iter().enumerate() {
            let location = Location::Cel {
                frame: frame_index,
                cel: cel_index,
            };
            if cel.layer_index as usize >= file.layers.len() {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    IssueCode::CelLayerOutOfRange,
                    location,
                    format!(
                        "cel references layer {} of {}",
                        cel.layer_index,
                        file.layers.len()
                    ),
                ));
            }
            if let CelContent::Linked(target) = cel.content {
                if target as usize >= file.frames.len() {
                    issues.push(ValidationIssue::new(
                        Severity::Error,
                        IssueCode::LinkedCelOutOfRange,
                        location,
                        format!("linked cel targets frame {} of {}", target, file.frames.len()),
                    ));
                } else if target as usize >= frame_index {
                    issues.push(ValidationIssue::new(
                        Severity::Warning,
                        IssueCode::LinkedCelNotEarlier,
                        location,
                        format!(
                            "linked cel in frame {} targets frame {}, not an earlier one",
                            frame_index, target
                        ),
                    ));
                }
            }
        }
    }
}

fn check_layers(file: &AsepriteFile, issues: &mut Vec<ValidationIssue>) {
    let mut previous_level: Option<u16> = None;
    for (index, layer) in file.layers.iter().enumerate() {
        let allowed = previous_level.map(|l| l + 1).unwrap_or(0);
        if layer.child_level > allowed {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                IssueCode::ChildLevelSkip,
                Location::Layer(index),
                format!(
                    "child level jumps to {} (at most {} is reachable here)",
                    layer.child_level, allowed
                ),
            ));
        }
        previous_level = Some(layer.child_level);

        if let LayerType::Tilemap { tileset_index } = layer.layer_type {
            if tileset_index as usize >= file.tilesets.len() {
                issues.push(ValidationIssue::new(
                    Severity::Error,
                    IssueCode::TilemapLayerWithoutTileset,
                    Location::Layer(index),
                    format!(
                        "tilemap layer references tileset {} of {}",
                        tileset_index,
                        file.tilesets.len()
                    ),
                ));
            }
        }
    }
}

fn check_tags(file: &AsepriteFile, frame_count: usize, issues: &mut Vec<ValidationIssue>) {
    for (index, tag) in file.tags.iter().enumerate() {
        let in_range =
            (tag.from_frame as usize) < frame_count && (tag.to_frame as usize) < frame_count;
        if !in_range || tag.from_frame > tag.to_frame {
            issues.push(ValidationIssue::new(
                Severity::Error,
                IssueCode::TagRangeInvalid,
                Location::Tag(index),
                format!(
                    "tag \"{}\" spans frames {}..={} of {}",
                    tag.name, tag.from_frame, tag.to_frame, frame_count
                ),
            ));
        }
    }
}

fn check_slices(file: &AsepriteFile, frame_count: usize, issues: &mut Vec<ValidationIssue>) {
    for (index, slice) in file.slices.iter().enumerate() {
        for key in &slice.keys {
            if key.from_frame as usize >= frame_count {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    IssueCode::SliceKeyOutOfRange,
                    Location::Slice(index),
                    format!(
                        "slice \"{}\" has a key at frame {} of {}",
                        slice.name, key.from_frame, frame_count
                    ),
                ));
            }
            if key.size.0 == 0 || key.size.1 == 0 {
                issues.push(ValidationIssue::new(
                    Severity::Warning,
                    IssueCode::SliceKeyEmpty,
                    Location::Slice(index),
                    format!(
                        "slice \"{}\" has a key of size {}x{}",
                        slice.name, key.size.0, key.size.1
                    ),
                ));
            }
        }
    }
}

fn check_tilesets(file: &AsepriteFile, issues: &mut Vec<ValidationIssue>) {
    for (index, tileset) in file.tilesets.iter().enumerate() {
        if file.tilesets[..index].iter().any(|t| t.id == tileset.id) {
            issues.push(ValidationIssue::new(
                Severity::Error,
                IssueCode::DuplicateTilesetId,
                Location::Tileset(index),
                format!("tileset id {} appears more than once", tileset.id),
            ));
        }
    }
}
