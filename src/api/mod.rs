pub mod format;
pub mod params;
