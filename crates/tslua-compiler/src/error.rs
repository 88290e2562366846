use thiserror::Error;

use crate::opcode::OpCode;

/// Why a compilation run was aborted. Every variant is fatal; no bytes of
/// a failed run are valid output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The node kind or operator is outside the compiled subset.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// A name that is not a local, capture, alias, or known global.
    #[error("unresolved identifier '{0}'")]
    UnresolvedIdentifier(String),

    /// An instruction was built with operands that do not fit its opcode.
    #[error("malformed encoding for {opcode}: {reason}")]
    MalformedEncoding { opcode: &'static str, reason: String },

    /// A recognized construct whose lowering does not exist yet.
    #[error("unimplemented: {0}")]
    UnimplementedFeature(String),
}

impl CompileError {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct(what.into())
    }

    pub(crate) fn unimplemented(what: impl Into<String>) -> Self {
        CompileError::UnimplementedFeature(what.into())
    }

    pub(crate) fn malformed(op: OpCode, reason: impl Into<String>) -> Self {
        CompileError::MalformedEncoding {
            opcode: op.name(),
            reason: reason.into(),
        }
    }
}
