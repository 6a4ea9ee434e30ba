pub mod entity;
pub mod geometry;
pub mod pattern;
pub mod tile;
