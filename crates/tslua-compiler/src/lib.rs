//! tslua compiler: lowers a TypeScript-subset syntax tree to Lua 5.3
//! bytecode and serializes it as a binary chunk.

pub mod chunk;
pub mod compiler;
pub mod disasm;
pub mod error;
pub mod opcode;
pub mod options;
pub mod proto;

pub use compiler::{compile, compile_program, compile_with_options};
pub use error::CompileError;
pub use options::CompileOptions;
pub use proto::Proto;
