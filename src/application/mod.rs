pub mod content;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod pagination;
pub mod params;
pub mod records;
pub mod scope;
pub mod screen;
pub mod session;
pub mod transport;
