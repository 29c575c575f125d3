// Image orientation applied before resampling.
//
// The command line selects an orientation with a small integer, 0 through
// 5. Rotations are clockwise.

use image::{GrayImage, imageops};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Original,
    Rotate90,
    Rotate180,
    Rotate270,
    /// Upside down: last image row becomes the first beat.
    FlipVertical,
    /// Left-right mirror: high pitches swap with low ones.
    MirrorHorizontal,
}

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::Original,
        Orientation::Rotate90,
        Orientation::Rotate180,
        Orientation::Rotate270,
        Orientation::FlipVertical,
        Orientation::MirrorHorizontal,
    ];

    /// Map the numeric selector (0-5) to an orientation.
    pub fn from_selector(selector: u32) -> Option<Orientation> {
        Self::ALL.get(selector as usize).copied()
    }

    pub fn apply(self, image: &GrayImage) -> GrayImage {
        match self {
            Orientation::Original => image.clone(),
            Orientation::Rotate90 => imageops::rotate90(image),
            Orientation::Rotate180 => imageops::rotate180(image),
            Orientation::Rotate270 => imageops::rotate270(image),
            Orientation::FlipVertical => imageops::flip_vertical(image),
            Orientation::MirrorHorizontal => imageops::flip_horizontal(image),
        }
    }
}
