//! CLI Command Implementations
//!
//! - [`train`]: Full training pipeline
//! - [`preview`]: Input table preview
//! - [`synthesize`]: Synthetic input generation

mod preview;
mod synthesize;
mod train;

pub use preview::PreviewCommand;
pub use synthesize::SynthesizeCommand;
pub use train::TrainCommand;
