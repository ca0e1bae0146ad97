//! Pure helpers shared by the pipeline and the tool server

pub mod json;
pub mod time;
