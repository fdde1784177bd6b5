//! Per-type overrides consulted by the engine before structural comparison.
//!
//! A registry is shared behind an `Arc` and guarded by a mutex so parallel
//! tests can use it; hook closures are cloned out of the lock before they
//! run.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{BoxError, HookError};
use crate::types::{Kind, Type};
use crate::value::Value;

/// Custom equality for one type.
#[derive(Clone)]
pub enum CmpHook {
    /// `false` is reported as a plain mismatch.
    Bool(Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>),
    /// The error text becomes the mismatch message.
    Fallible(Arc<dyn Fn(&Value, &Value) -> Result<(), BoxError> + Send + Sync>),
}

/// Transformation applied to got values of one type before comparison.
#[derive(Clone)]
pub enum SmuggleHook {
    Plain(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
    Fallible(Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>),
}

/// Why a cmp hook rejected a pair.
#[derive(Debug)]
pub enum HookFailure {
    /// A bool hook returned `false`.
    Boolean,
    Error(BoxError),
}

#[derive(Clone, Default)]
struct TypeHooks {
    cmp: Option<CmpHook>,
    smuggle: Option<SmuggleHook>,
    use_equal: bool,
    ignore_unexported: bool,
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: Mutex<HashMap<Type, TypeHooks>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.lock().keys().map(|t| t.to_string()).collect();
        f.debug_struct("HookRegistry").field("types", &types).finish()
    }
}

impl Clone for HookRegistry {
    fn clone(&self) -> Self {
        self.copy()
    }
}

fn concrete(ty: &Type) -> Result<(), HookError> {
    if ty.kind() == Kind::Interface {
        return Err(HookError::InterfaceType(ty.to_string()));
    }
    Ok(())
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Type, TypeHooks>> {
        // A panicking hook never runs under the lock, the map stays consistent.
        self.hooks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// An independent snapshot; later registrations on either side do not
    /// leak into the other.
    pub fn copy(&self) -> HookRegistry {
        HookRegistry {
            hooks: Mutex::new(self.lock().clone()),
        }
    }

    /// Copies `parent`, or returns an empty registry when there is none.
    pub fn copy_of(parent: Option<&HookRegistry>) -> HookRegistry {
        parent.map(HookRegistry::copy).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // ──────────────────────────────────────────────
    // Registration
    // ──────────────────────────────────────────────

    /// Registers a cmp hook for `ty`, replacing any previous one.
    pub fn try_add_cmp_hook(&self, ty: &Type, hook: CmpHook) -> Result<(), HookError> {
        concrete(ty)?;
        debug!(type_name = %ty, "registering cmp hook");
        self.lock().entry(ty.clone()).or_default().cmp = Some(hook);
        Ok(())
    }

    /// Registers a smuggle hook for got values of type `ty`.
    pub fn try_add_smuggle_hook(&self, ty: &Type, hook: SmuggleHook) -> Result<(), HookError> {
        concrete(ty)?;
        debug!(type_name = %ty, "registering smuggle hook");
        self.lock().entry(ty.clone()).or_default().smuggle = Some(hook);
        Ok(())
    }

    /// Compares values of these types with their own `Equal` method.
    pub fn try_add_use_equal(&self, types: &[Type]) -> Result<(), HookError> {
        for ty in types {
            concrete(ty)?;
            if ty.equal_method().is_none() {
                return Err(HookError::NoEqualMethod(ty.to_string()));
            }
        }
        let mut hooks = self.lock();
        for ty in types {
            debug!(type_name = %ty, "using Equal method");
            hooks.entry(ty.clone()).or_default().use_equal = true;
        }
        Ok(())
    }

    /// Skips unexported fields of these struct types.
    pub fn try_add_ignore_unexported(&self, types: &[Type]) -> Result<(), HookError> {
        for ty in types {
            if ty.kind() != Kind::Struct {
                return Err(HookError::NotStruct(ty.to_string()));
            }
        }
        let mut hooks = self.lock();
        for ty in types {
            debug!(type_name = %ty, "ignoring unexported fields");
            hooks.entry(ty.clone()).or_default().ignore_unexported = true;
        }
        Ok(())
    }

    /// # Panics
    /// On an interface type.
    pub fn add_cmp_hook<F>(&self, ty: &Type, hook: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        if let Err(e) = self.try_add_cmp_hook(ty, CmpHook::Bool(Arc::new(hook))) {
            panic!("add_cmp_hook: {}", e);
        }
    }

    /// # Panics
    /// On an interface type.
    pub fn add_fallible_cmp_hook<F>(&self, ty: &Type, hook: F)
    where
        F: Fn(&Value, &Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        if let Err(e) = self.try_add_cmp_hook(ty, CmpHook::Fallible(Arc::new(hook))) {
            panic!("add_fallible_cmp_hook: {}", e);
        }
    }

    /// # Panics
    /// On an interface type.
    pub fn add_smuggle_hook<F>(&self, ty: &Type, hook: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        if let Err(e) = self.try_add_smuggle_hook(ty, SmuggleHook::Plain(Arc::new(hook))) {
            panic!("add_smuggle_hook: {}", e);
        }
    }

    /// # Panics
    /// On an interface type.
    pub fn add_fallible_smuggle_hook<F>(&self, ty: &Type, hook: F)
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        if let Err(e) = self.try_add_smuggle_hook(ty, SmuggleHook::Fallible(Arc::new(hook))) {
            panic!("add_fallible_smuggle_hook: {}", e);
        }
    }

    /// # Panics
    /// When a type has no `Equal` method.
    pub fn add_use_equal(&self, types: &[Type]) {
        if let Err(e) = self.try_add_use_equal(types) {
            panic!("add_use_equal: {}", e);
        }
    }

    /// # Panics
    /// When a type is not a struct.
    pub fn add_ignore_unexported(&self, types: &[Type]) {
        if let Err(e) = self.try_add_ignore_unexported(types) {
            panic!("add_ignore_unexported: {}", e);
        }
    }

    // ──────────────────────────────────────────────
    // Lookup
    // ──────────────────────────────────────────────

    fn get(&self, ty: &Type) -> Option<TypeHooks> {
        let hooks = self.lock();
        if hooks.is_empty() {
            return None;
        }
        hooks.get(ty).cloned()
    }

    /// Whether a cmp or smuggle hook is registered for `ty`.
    pub fn handles(&self, ty: &Type) -> bool {
        self.get(ty)
            .is_some_and(|h| h.cmp.is_some() || h.smuggle.is_some())
    }

    /// Runs the cmp hook of got's type, when expected has the same type.
    /// `None` means no hook applies.
    pub fn cmp(&self, got: &Value, expected: &Value) -> Option<Result<(), HookFailure>> {
        let got_ty = got.ty()?;
        if expected.ty() != Some(got_ty) {
            return None;
        }
        let hook = self.get(got_ty)?.cmp?;
        Some(match hook {
            CmpHook::Bool(f) => {
                if f(got, expected) {
                    Ok(())
                } else {
                    Err(HookFailure::Boolean)
                }
            }
            CmpHook::Fallible(f) => f(got, expected).map_err(HookFailure::Error),
        })
    }

    /// Runs the smuggle hook of got's type. `Ok(None)` means no hook applies.
    pub fn smuggle(&self, got: &Value) -> Result<Option<Value>, BoxError> {
        let Some(ty) = got.ty() else {
            return Ok(None);
        };
        let Some(hook) = self.get(ty).and_then(|h| h.smuggle) else {
            return Ok(None);
        };
        match hook {
            SmuggleHook::Plain(f) => Ok(Some(f(got))),
            SmuggleHook::Fallible(f) => f(got).map(Some),
        }
    }

    pub fn use_equal(&self, ty: &Type) -> bool {
        self.get(ty).is_some_and(|h| h.use_equal)
    }

    pub fn ignore_unexported(&self, ty: &Type) -> bool {
        self.get(ty).is_some_and(|h| h.ignore_unexported)
    }
}
