//! The PEX side of the compiler: values, instructions, the in-memory module,
//! and the streaming function builder.

pub mod builder;
pub mod file;
pub mod instruction;
pub mod value;
