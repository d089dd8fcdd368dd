pub mod builder;
pub mod types;

pub use builder::{RequestBuilder, ResolvedCall};
pub use types::{BodyKind, BodySpec, HeaderEntry, HeaderSpec, RequestDefinition};
