pub mod chord;
pub mod conversions;
