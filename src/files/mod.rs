//! Sandboxed filesystem access for the API layer: path containment, model
//! root resolution, listing/search, and preview-image lookup.
pub mod paths;
pub mod preview;
pub mod search;
