//! The fixed pass pipeline.

use crate::{
    compiler::{
        context::ShaderCompilation,
        pass::CompilerPass,
        passes::{
            CallSubstitutions, ConstructorPass, DependencyResolver,
            IntrinsicTypeVariableInlines, ShaderIntrinsicSubstitutions, Validation,
            VariableAccessReplacements,
        },
    },
    Result,
};

/// Runs the passes over a compilation in their fixed order.
///
/// The order is part of the compiler's contract: dependency resolution must see
/// raw token calls, call substitution must run before constructor lowering (a
/// lowered constructor body contains no calls to resolve), and validation must
/// see the fully substituted trees. Running the pipeline twice on the same
/// compilation is a no-op the second time.
pub struct PassPipeline {
    passes: Vec<Box<dyn CompilerPass>>,
}

impl PassPipeline {
    /// The standard seven-pass pipeline.
    #[must_use]
    pub fn standard() -> Self {
        PassPipeline {
            passes: vec![
                Box::new(DependencyResolver),
                Box::new(VariableAccessReplacements),
                Box::new(CallSubstitutions),
                Box::new(ShaderIntrinsicSubstitutions),
                Box::new(ConstructorPass),
                Box::new(Validation),
                Box::new(IntrinsicTypeVariableInlines),
            ],
        }
    }

    /// The pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass once, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first pass error; the compilation is then in an
    /// unspecified intermediate state and must be discarded.
    pub fn run(&self, compilation: &mut ShaderCompilation) -> Result<()> {
        for pass in &self.passes {
            pass.run(compilation)?;
        }
        Ok(())
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
