pub mod text;
pub mod url_validation;

pub use text::{DEFAULT_MAX_SEGMENT_CHARS, prepare_for_synthesis, sanitize_text, segment_text};
pub use url_validation::{UrlValidationError, validate_base_url};
