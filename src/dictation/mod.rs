pub mod corrections;
pub mod format;
pub mod tokenize;

pub use corrections::TextCorrector;
pub use format::{format, format_two, Convention, FORMATTERS};
pub use tokenize::tokenize;
