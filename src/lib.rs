pub mod assertion;
pub mod error;
pub mod expression;
pub mod history;
pub mod http;
pub mod logger;
pub mod request;
pub mod suite;
pub mod variable;

// Re-export commonly used types
pub use error::{Result, RusuiteError};
