pub mod resources;
pub mod slug;
