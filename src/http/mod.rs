//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! wiki's business logic: response builders and form body decoding.

pub mod form;
pub mod response;

// Re-export commonly used types
pub use form::{parse_form, FormParseError};
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_500_response, build_favicon_response, build_health_response, build_html_response,
    build_options_response, build_plain_response, build_redirect_response,
};
