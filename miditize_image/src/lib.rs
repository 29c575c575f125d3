// miditize_image — turns image files into intensity grids.
//
// Everything the encoder should not care about lives here: decoding,
// grayscale conversion, rotation and flips, resampling to exactly
// `PITCH_COUNT` columns, and the optional edge-detection pass.
//
// Module overview:
// - `orientation.rs`: the six orientation choices and their numeric selector.
// - `source.rs`:      `load_grid` / `grid_from_luma`, the preprocessing pipeline,
//                     plus `SourceError` for decode failures.

pub mod orientation;
pub mod source;

pub use orientation::Orientation;
pub use source::{EdgeThresholds, GridSourceOptions, SourceError, grid_from_luma, load_grid};
