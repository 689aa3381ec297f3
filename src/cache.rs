//! The compile cache.
//!
//! A shader is compiled once per distinct (module, stage, backend) key and the
//! immutable [`GeneratedShader`] shared from then on. Concurrent first use
//! serializes per key: one thread compiles, the rest wait on that key's lock
//! and read the published result. A failed compile publishes nothing, so the
//! next request retries instead of serving a cached error.

use std::sync::{Arc, Mutex, OnceLock};

use dashmap::DashMap;

use crate::{
    codegen::{Backend, GeneratedShader},
    ir::ShaderKind,
    module::ShaderModule,
    Result,
};

/// One cache slot: the per-key compile lock and the published result.
#[derive(Default)]
struct Slot {
    lock: Mutex<()>,
    result: OnceLock<Arc<GeneratedShader>>,
}

/// A concurrent at-most-once compile cache.
///
/// # Examples
///
/// ```rust,no_run
/// use cilshader::{ShaderCache, Backend, ShaderKind};
/// # fn module() -> std::sync::Arc<cilshader::ShaderModule> { unimplemented!() }
///
/// let cache = ShaderCache::new();
/// let shader = cache.get_or_compile(&module(), ShaderKind::Fragment, Backend::Hlsl)?;
/// println!("{}", shader.source);
/// # Ok::<(), cilshader::Error>(())
/// ```
pub struct ShaderCache {
    slots: DashMap<(String, ShaderKind, Backend), Arc<Slot>>,
}

impl ShaderCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        ShaderCache {
            slots: DashMap::new(),
        }
    }

    /// Returns the cached shader for the key, compiling it first if this is
    /// the key's first use. At most one compile runs per key; concurrent
    /// callers block until the winning compile publishes or fails.
    ///
    /// # Errors
    ///
    /// Propagates any compile error. Failures are never cached; a later call
    /// with the same key compiles again. [`crate::Error::LockError`] if a
    /// previous compile of this key panicked while holding the slot lock.
    pub fn get_or_compile(
        &self,
        module: &Arc<ShaderModule>,
        kind: ShaderKind,
        backend: Backend,
    ) -> Result<Arc<GeneratedShader>> {
        let key = (module.name().to_string(), kind, backend);
        let slot = Arc::clone(&self.slots.entry(key).or_default());

        if let Some(hit) = slot.result.get() {
            return Ok(Arc::clone(hit));
        }

        let _guard = slot.lock.lock().map_err(|_| crate::Error::LockError)?;
        // The lock holder before us may have published while we waited.
        if let Some(hit) = slot.result.get() {
            return Ok(Arc::clone(hit));
        }

        let shader = Arc::new(crate::compile(module, kind, backend)?);
        let _ = slot.result.set(Arc::clone(&shader));
        Ok(shader)
    }

    /// Number of keys with a published compile result.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.result.get().is_some())
            .count()
    }

    /// Whether no compile result has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Constant, Expression, ShaderType},
        module::{MethodBody, MethodSignature, Token},
    };

    const SHADER: Token = Token(0x0200_0001);
    const MAIN: Token = Token(0x0600_0001);

    fn simple_module() -> Arc<ShaderModule> {
        ShaderModule::builder("cached", SHADER)
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Void,
                    parameters: vec![],
                },
                vec![ShaderType::Float32],
                MethodBody::Tree(
                    Expression::Block(vec![
                        Expression::Assign {
                            target: Expression::LocalVariable {
                                slot: 0,
                                ty: ShaderType::Float32,
                            }
                            .into_ref(),
                            value: Expression::Constant(Constant::Float32(1.0)).into_ref(),
                        }
                        .into_ref(),
                        Expression::Return(None).into_ref(),
                    ])
                    .into_ref(),
                ),
            )
            .entry_point(ShaderKind::Compute, MAIN)
            .finish()
            .unwrap()
    }

    #[test]
    fn repeated_requests_share_one_result() {
        let cache = ShaderCache::new();
        let module = simple_module();

        let first = cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Glsl)
            .unwrap();
        let second = cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Glsl)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn backends_cache_independently() {
        let cache = ShaderCache::new();
        let module = simple_module();

        let glsl = cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Glsl)
            .unwrap();
        let hlsl = cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Hlsl)
            .unwrap();

        assert_eq!(glsl.backend, Backend::Glsl);
        assert_eq!(hlsl.backend, Backend::Hlsl);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_first_use_compiles_once() {
        let cache = Arc::new(ShaderCache::new());
        let module = simple_module();

        let results: Vec<_> = std::thread::scope(|scope| {
            (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let module = Arc::clone(&module);
                    scope.spawn(move || {
                        cache
                            .get_or_compile(&module, ShaderKind::Compute, Backend::Msl)
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        // Every thread observed the same published artifact.
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_compiles_are_not_cached() {
        let module = ShaderModule::builder("broken", SHADER)
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Void,
                    parameters: vec![],
                },
                vec![],
                MethodBody::Tree(
                    Expression::Block(vec![Expression::Call {
                        token: Token(0x0600_00AA),
                        receiver: None,
                        arguments: vec![],
                    }
                    .into_ref()])
                    .into_ref(),
                ),
            )
            .entry_point(ShaderKind::Compute, MAIN)
            .finish()
            .unwrap();

        let cache = ShaderCache::new();
        assert!(cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Hlsl)
            .is_err());
        assert!(cache.is_empty());
        // The retry compiles again rather than serving a cached error.
        assert!(cache
            .get_or_compile(&module, ShaderKind::Compute, Backend::Hlsl)
            .is_err());
    }
}
