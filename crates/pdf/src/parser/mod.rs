pub mod backend;
pub mod glyphs;
