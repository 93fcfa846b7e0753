#![deny(clippy::all, clippy::pedantic)]

pub mod content;
pub mod resources;
pub mod session;
