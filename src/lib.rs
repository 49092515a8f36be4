//! dricons - WoW diminishing returns icon swapper
//!
//! Finds a WoW installation, remembers per-version icon choices, and decodes
//! the bundled TGA icons for preview and for writing into the game folder.

pub mod app;
pub mod assets;
pub mod catalog;
pub mod game_finder;
pub mod install;
pub mod paths;
pub mod selection;
pub mod settings;
pub mod tga;
