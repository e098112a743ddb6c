//! Configuration loading and validation for the sound catalog and settings.

mod loader;
mod types;
mod validator;

pub use loader::{load_settings, CatalogLoader};
pub use types::*;
pub use validator::CatalogValidator;
