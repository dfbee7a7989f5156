//! Ready-made tool executors

mod builtin;

pub use builtin::BuiltinToolExecutor;
