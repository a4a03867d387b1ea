pub mod content_search;
pub mod format_reader;
pub mod import_service;
pub mod locator_service;
pub mod metadata_service;
pub mod ole;
pub mod pdf_service;
pub mod spreadsheet_service;
pub mod text_service;
pub mod word_service;
