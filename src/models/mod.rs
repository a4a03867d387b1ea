pub mod content;
pub mod document;
pub mod search;
