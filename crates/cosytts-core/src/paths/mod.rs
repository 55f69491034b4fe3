//! Model directory resolution and weight file layout.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - Resolution never fails because a directory is missing; missing files
//!   are reported later by [`ModelLayout::verify`]

mod error;
mod layout;
mod models;

#[cfg(test)]
mod test_utils;

pub use error::PathError;
pub use layout::ModelLayout;
pub use models::{
    CANDIDATE_MODEL_DIRS, DEFAULT_MODEL_DIR, MODEL_DIR_ENV, ModelDirResolution, ModelDirSource,
    resolve_model_dir, resolve_model_dir_in,
};
