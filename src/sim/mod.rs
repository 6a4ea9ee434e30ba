pub mod code;
pub mod dirty;
pub mod display;
pub mod editor;
pub mod enemies;
pub mod event;
pub mod extract;
pub mod levels;
pub mod placement;
pub mod platform;
pub mod save;
pub mod tilemap;
