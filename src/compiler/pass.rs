//! The compiler pass trait.

use crate::{compiler::context::ShaderCompilation, Result};

/// One rewrite pass over a compilation's expression trees.
///
/// Passes don't declare their own ordering or triggers. The pipeline runs them
/// in a fixed sequence:
///
/// 1. **Dependency resolution**: closure over called methods and used structs
///    (iterated to a fixed point)
/// 2. **Variable access replacement**: shader field accesses become interface
///    variables
/// 3. **Call substitution**: token calls become compiled helper calls
/// 4. **Intrinsic substitution**: mapped calls become intrinsic operations
/// 5. **Constructor lowering**: constructor invocations become per-field
///    assignments
/// 6. **Validation**: no unresolved construct may survive to emission
/// 7. **Variable inlining**: single-assignment intrinsic-typed locals fold
///    into their use sites
///
/// Running the full pipeline a second time must leave the compilation
/// unchanged.
pub trait CompilerPass {
    /// Unique name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Runs the pass over the whole compilation.
    ///
    /// Returns `true` if any tree changed, `false` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the pass meets a construct it must reject; the
    /// compile fails as a whole, nothing is emitted.
    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool>;
}
