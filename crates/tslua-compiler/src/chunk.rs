//! Lua 5.3 binary chunk serialization.
//!
//! The layout is what `luac 5.3` writes, so the output loads with
//! `lua_load` / `load` on a stock 64-bit interpreter.

use tracing::debug;

use crate::error::CompileError;
use crate::options::CompileOptions;
use crate::proto::{Constant, Proto, MAX_SHORT_LEN};

// Lua 5.3 binary header constants
pub const LUA_SIGNATURE: &[u8; 4] = b"\x1bLua";
const LUAC_VERSION: u8 = 0x53; // Lua 5.3
const LUAC_FORMAT: u8 = 0;
const LUAC_DATA: &[u8; 6] = b"\x19\x93\r\n\x1a\n";
const INT_SIZE: u8 = 4;
const SIZE_T_SIZE: u8 = 8;
const INSTRUCTION_SIZE: u8 = 4;
const LUA_INTEGER_SIZE: u8 = 8;
const LUA_NUMBER_SIZE: u8 = 8;
const LUAC_INT: i64 = 0x5678;
const LUAC_NUM: f64 = 370.5;

/// Length of the fixed preamble in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 6 + 5 + 8 + 8;

// Lua constant type tags
const LUA_TNIL: u8 = 0;
const LUA_TBOOLEAN: u8 = 1;
const LUA_TNUMBER: u8 = 3;
const LUA_TSTRING: u8 = 4;
const LUA_TNUMFLT: u8 = LUA_TNUMBER; // 3
const LUA_TNUMINT: u8 = LUA_TNUMBER | (1 << 4); // 19
const LUA_TSHRSTR: u8 = LUA_TSTRING; // 4
const LUA_TLNGSTR: u8 = LUA_TSTRING | (1 << 4); // 20

/// Serialize a Proto and all its children into Lua 5.3 binary format.
pub fn dump(proto: &Proto, options: &CompileOptions) -> Result<Vec<u8>, CompileError> {
    let mut writer = ChunkWriter::new();
    writer.write_header();
    // Number of upvalues for the main chunk
    writer.write_byte(proto.upvalues.len() as u8);
    writer.write_function(proto, options.strip, None)?;
    let bytes = writer.finish();
    debug!(bytes = bytes.len(), "chunk written");
    Ok(bytes)
}

/// Sequential writer for the primitive types of a chunk.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    out: Vec<u8>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    pub fn write_byte(&mut self, b: u8) {
        self.out.push(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    /// C `int`: 4 bytes little-endian.
    pub fn write_int(&mut self, n: i32) {
        self.out.extend_from_slice(&n.to_le_bytes());
    }

    /// C `size_t`: 8 bytes little-endian.
    pub fn write_size_t(&mut self, n: u64) {
        self.out.extend_from_slice(&n.to_le_bytes());
    }

    pub fn write_integer(&mut self, n: i64) {
        self.out.extend_from_slice(&n.to_le_bytes());
    }

    pub fn write_number(&mut self, n: f64) {
        self.out.extend_from_slice(&n.to_le_bytes());
    }

    /// Absent strings are a single zero byte. Otherwise the size is
    /// `len + 1`, in one byte when it fits below 0xFF, else 0xFF followed
    /// by a `size_t`.
    pub fn write_string(&mut self, s: Option<&[u8]>) {
        match s {
            None => self.write_byte(0),
            Some(bytes) => {
                let size = bytes.len() + 1;
                if size < 0xFF {
                    self.write_byte(size as u8);
                } else {
                    self.write_byte(0xFF);
                    self.write_size_t(size as u64);
                }
                self.write_bytes(bytes);
            }
        }
    }

    fn write_count(&mut self, n: usize) {
        self.write_int(n as i32);
    }

    pub fn write_header(&mut self) {
        self.write_bytes(LUA_SIGNATURE);
        self.write_byte(LUAC_VERSION);
        self.write_byte(LUAC_FORMAT);
        self.write_bytes(LUAC_DATA);
        self.write_byte(INT_SIZE);
        self.write_byte(SIZE_T_SIZE);
        self.write_byte(INSTRUCTION_SIZE);
        self.write_byte(LUA_INTEGER_SIZE);
        self.write_byte(LUA_NUMBER_SIZE);
        self.write_integer(LUAC_INT);
        self.write_number(LUAC_NUM);
    }

    fn write_function(
        &mut self,
        proto: &Proto,
        strip: bool,
        parent_source: Option<&str>,
    ) -> Result<(), CompileError> {
        // Source name
        let source = proto.source.as_deref();
        if strip || (parent_source.is_some() && source == parent_source) {
            self.write_string(None);
        } else {
            self.write_string(source.map(str::as_bytes));
        }

        self.write_int(proto.line_defined);
        self.write_int(proto.last_line_defined);
        self.write_byte(proto.num_params);
        self.write_byte(proto.is_vararg as u8);
        self.write_byte(proto.max_stack_size.max(2));

        // Code
        self.write_count(proto.code.len());
        for inst in &proto.code {
            let word = inst.encode()?;
            self.write_bytes(&word.to_le_bytes());
        }

        // Constants
        self.write_count(proto.constants.len());
        for k in proto.constants.iter() {
            match k {
                Constant::Nil => self.write_byte(LUA_TNIL),
                Constant::Boolean(b) => {
                    self.write_byte(LUA_TBOOLEAN);
                    self.write_byte(*b as u8);
                }
                Constant::Integer(i) => {
                    self.write_byte(LUA_TNUMINT);
                    self.write_integer(*i);
                }
                Constant::Float(f) => {
                    self.write_byte(LUA_TNUMFLT);
                    self.write_number(*f);
                }
                Constant::Str(s) => {
                    if s.len() <= MAX_SHORT_LEN {
                        self.write_byte(LUA_TSHRSTR);
                    } else {
                        self.write_byte(LUA_TLNGSTR);
                    }
                    self.write_string(Some(s.as_bytes()));
                }
            }
        }

        // Upvalues
        self.write_count(proto.upvalues.len());
        for uv in &proto.upvalues {
            self.write_byte(uv.in_stack as u8);
            self.write_byte(uv.index);
        }

        // Protos (child functions)
        self.write_count(proto.protos.len());
        for child in &proto.protos {
            self.write_function(child, strip, source)?;
        }

        // Debug info: line info, local vars, upvalue names
        if !strip && !proto.debug.is_empty() {
            return Err(CompileError::unimplemented("writing debug information"));
        }
        self.write_count(0);
        self.write_count(0);
        self.write_count(0);
        Ok(())
    }
}
