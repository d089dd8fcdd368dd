pub mod loader;
pub mod substitutor;
pub mod types;

pub use loader::EnvironmentLoader;
pub use substitutor::VariableSubstitutor;
pub use types::{Environment, VarValue};
