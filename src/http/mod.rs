pub mod client;
pub mod response;
pub mod types;

pub use client::Client;
pub use response::ResponseCapture;
pub use types::Method;
