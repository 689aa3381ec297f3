use thiserror::Error;

use crate::module::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers every failure mode of a shader compile: bytecode decoding, branch graph
/// construction, IR translation, the pass pipeline, and backend emission. Each variant provides
/// specific context about the failure so the host can report it meaningfully.
///
/// # Error Categories
///
/// ## Structural errors (fatal, pre-emission)
/// - [`Error::Malformed`] - Corrupted bytecode (truncated operand, bad branch target)
/// - [`Error::OutOfBounds`] - Attempted to read beyond the bytecode buffer
/// - [`Error::InvalidOpcode`] - An opcode with no entry in the instruction table
/// - [`Error::CyclicStruct`] - A plain-data aggregate that contains itself
/// - [`Error::ReferenceType`] - A reference type reached the compiler
/// - [`Error::RolelessField`] - A shader-type field with no Uniform/Input/Output role
///
/// ## Unsupported-construct errors (fatal)
/// - [`Error::UnsupportedConstruct`] - A call with no intrinsic mapping and no compilable body
///
/// ## Backend-emission errors (fatal to one backend only)
/// - [`Error::UnmappedNode`] - An IR node the requested backend cannot emit
///
/// All errors propagate synchronously; there is no partial or degraded shader output. A
/// miscompiled-but-accepted GPU kernel is far more costly to diagnose than a hard failure,
/// so nothing is ever silently dropped.
#[derive(Error, Debug)]
pub enum Error {
    /// The bytecode is damaged and could not be decoded.
    ///
    /// This error indicates corrupted or truncated input. It includes the source
    /// location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading the bytecode buffer.
    ///
    /// An operand that cannot be fully read before the buffer ends is a fatal
    /// corruption invariant violation, not a recoverable condition.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// An opcode with no entry in the instruction table.
    ///
    /// The associated value is the full opcode, including the 0xFE escape byte
    /// in the high byte for two-byte encodings.
    #[error("Unrecognized opcode: 0x{0:04X}")]
    InvalidOpcode(u16),

    /// A branch target that does not land on an instruction boundary.
    #[error("Branch target 0x{0:X} does not land on an instruction boundary")]
    InvalidBranchTarget(u32),

    /// A plain-data aggregate that directly or transitively contains itself.
    ///
    /// Self-containment can never be laid out in GPU memory and is rejected
    /// regardless of discovery order.
    #[error("Struct '{0}' directly or transitively contains itself")]
    CyclicStruct(String),

    /// A reference type appeared in a parameter, return type, field, or local slot.
    ///
    /// The source subset deliberately excludes heap allocation and reference
    /// types; the compiler rejects them rather than supporting them.
    #[error("Reference type is not compilable: {0}")]
    ReferenceType(String),

    /// A shader-type field carries none of the Uniform/Input/Output roles.
    ///
    /// Shader types carry no other persistent instance state.
    #[error("Shader field '{0}' has no Uniform/Input/Output role")]
    RolelessField(String),

    /// The shader's own declaring type appeared as ordinary data.
    ///
    /// The shader type is a compile-time organizational construct only; it has
    /// no layout and cannot flow through parameters, returns, or locals.
    #[error("The shader type may not be used as ordinary data ({0})")]
    ShaderTypeAsData(String),

    /// A call with no intrinsic mapping and no compilable body.
    ///
    /// The associated [`Token`] identifies the offending method.
    #[error("Method {0} has no intrinsic mapping and no compilable body")]
    UnsupportedConstruct(Token),

    /// A referenced method, field, or type token that is not registered in the module.
    #[error("Unresolved token {0}")]
    UnresolvedToken(Token),

    /// An IR node the requested backend does not recognize.
    ///
    /// Fatal to that backend only; emission is per-backend and otherwise
    /// independent, so other backends may still succeed.
    #[error("{backend} backend cannot emit node: {node}")]
    UnmappedNode {
        /// Name of the backend that failed
        backend: &'static str,
        /// Short description of the unmappable node
        node: String,
    },

    /// Recursion limit reached.
    ///
    /// Dependency resolution enforces a maximum depth to turn unbounded or
    /// indirect recursion into a hard error instead of a stack overflow.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically when a
    /// cache lock is poisoned by a panicking compile on another thread.
    #[error("Failed to lock target")]
    LockError,

    /// Branch graph construction or traversal error.
    #[error("{0}")]
    GraphError(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
