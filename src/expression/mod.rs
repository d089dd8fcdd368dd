pub mod args;
pub mod functions;
pub mod registry;
pub mod resolver;

pub use registry::{BuiltinFn, FunctionRegistry};
pub use resolver::ExpressionResolver;
