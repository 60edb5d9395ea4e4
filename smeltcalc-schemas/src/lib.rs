pub mod file_formats;
pub mod material;
pub mod unit;
