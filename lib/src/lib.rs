pub mod asset;

pub mod basicvr;

pub mod camera;

pub mod config;

pub mod error;

pub mod frameloop;

pub mod input;

pub mod output;

pub mod render;

pub mod scene;

pub mod util;

#[cfg(test)]
mod tests;

// Re-exported, so the binaries link the same OpenXR loader.
pub use openxr;

pub const APP_NAME: &str = env!("CARGO_PKG_DESCRIPTION");
pub const APP_VERSION_MAJOR: &str = env!("CARGO_PKG_VERSION_MAJOR");
pub const APP_VERSION_MINOR: &str = env!("CARGO_PKG_VERSION_MINOR");
pub const APP_VERSION_PATCH: &str = env!("CARGO_PKG_VERSION_PATCH");
