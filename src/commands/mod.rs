pub mod document_commands;
pub mod preview_commands;
