//! Per-call traversal state.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::warn;

use super::{Error, Path};
use crate::anchors::AnchorRegistry;
use crate::hooks::HookRegistry;
use crate::operator::Operator;
use crate::value::Value;
use crate::visited::Visited;

#[derive(Debug, Default)]
struct Accumulator {
    errors: Vec<Box<Error>>,
    /// Set once the cap is reached; nothing is accumulated afterwards.
    closed: bool,
}

/// State threaded through the engine. Every `add_*` returns a new context,
/// so sibling branches never see each other's path.
///
/// Clones share the visited set and the error accumulator of the top-level
/// call they belong to.
#[derive(Debug, Clone)]
pub struct Context {
    pub path: Path,
    pub depth: usize,
    /// `0` or `1` stops at the first error, negative accumulates without limit.
    pub max_errors: i32,
    pub be_lax: bool,
    pub use_equal: bool,
    pub ignore_unexported: bool,
    /// Only pass/fail matters, diagnostics are not built.
    pub boolean_error: bool,
    /// Set while walking below an unexported struct field.
    pub in_unexported: bool,
    pub cur_operator: Option<Arc<dyn Operator>>,
    pub hooks: Arc<HookRegistry>,
    pub anchors: Arc<AnchorRegistry>,
    visited: Rc<RefCell<Visited>>,
    errors: Option<Rc<RefCell<Accumulator>>>,
}

impl Default for Context {
    fn default() -> Self {
        Context::new(
            Path::new("DATA"),
            10,
            Arc::new(HookRegistry::new()),
            Arc::new(AnchorRegistry::new()),
        )
    }
}

impl Context {
    pub fn new(
        path: Path,
        max_errors: i32,
        hooks: Arc<HookRegistry>,
        anchors: Arc<AnchorRegistry>,
    ) -> Context {
        let errors = if max_errors == 0 || max_errors == 1 {
            None
        } else {
            Some(Rc::new(RefCell::new(Accumulator::default())))
        };
        Context {
            path,
            depth: 0,
            max_errors,
            be_lax: false,
            use_equal: false,
            ignore_unexported: false,
            boolean_error: false,
            in_unexported: false,
            cur_operator: None,
            hooks,
            anchors,
            visited: Rc::new(RefCell::new(Visited::new())),
            errors,
        }
    }

    /// A fresh pass/fail-only context sharing this one's registries and flags.
    pub fn boolean(&self) -> Context {
        Context {
            path: Path::default(),
            depth: 0,
            max_errors: 0,
            boolean_error: true,
            in_unexported: false,
            cur_operator: None,
            visited: Rc::new(RefCell::new(Visited::new())),
            errors: None,
            ..self.clone()
        }
    }

    fn descend(&self, path: Path) -> Context {
        Context {
            path,
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    pub fn add_field(&self, field: &str) -> Context {
        self.descend(self.path.add_field(field))
    }

    pub fn add_array_index(&self, index: usize) -> Context {
        self.descend(self.path.add_array_index(index))
    }

    pub fn add_map_key(&self, key: &Value) -> Context {
        self.descend(self.path.add_map_key(key))
    }

    pub fn add_ptr(&self, num: usize) -> Context {
        self.descend(self.path.add_ptr(num))
    }

    pub fn add_function_call(&self, func: &str) -> Context {
        self.descend(self.path.add_function_call(func))
    }

    pub fn add_custom_level(&self, label: &str) -> Context {
        self.descend(self.path.add_custom_level(label))
    }

    pub fn reset_path(&self, root: &str) -> Context {
        self.descend(Path::new(root))
    }

    /// Errors collected below `op` get its location.
    pub fn with_operator(&self, op: Arc<dyn Operator>) -> Context {
        Context {
            cur_operator: Some(op),
            ..self.clone()
        }
    }

    pub(crate) fn in_unexported(&self, yes: bool) -> Context {
        Context {
            in_unexported: yes,
            ..self.clone()
        }
    }

    /// A context stopping at its first error without touching the
    /// caller's accumulator, for operators that wrap sub-results.
    pub fn reset_errors(&self) -> Context {
        Context {
            max_errors: 0,
            errors: None,
            ..self.clone()
        }
    }

    /// See [`Visited::record`].
    pub fn record_visit(&self, a: &Value, b: &Value) -> bool {
        self.visited.borrow_mut().record(a, b)
    }

    /// Whether this context accumulates errors instead of stopping at the
    /// first one.
    pub fn accumulates(&self) -> bool {
        self.errors.is_some()
    }

    /// Stamps `err` with the current path and operator location when unset,
    /// then either accumulates it (`Ok`, traversal goes on) or hands it back
    /// (`Err`, traversal stops). Reaching the cap returns the merged chain,
    /// terminated by a "too many errors" sentinel.
    ///
    /// In boolean mode the boolean sentinel is always returned.
    pub fn collect_error(&self, err: impl Into<Box<Error>>) -> Result<(), Box<Error>> {
        if self.boolean_error {
            return Err(Error::boolean());
        }
        let mut err = err.into();
        if err.is_boolean() {
            return Err(err);
        }
        if err.path.is_none() {
            err.path = Some(self.path.clone());
        }
        if err.location.is_none() {
            err.location = self
                .cur_operator
                .as_ref()
                .and_then(|op| op.location().cloned());
        }

        let Some(acc) = &self.errors else {
            return Err(err);
        };
        let mut acc = acc.borrow_mut();
        if acc.closed {
            return Err(err);
        }
        acc.errors.push(err);
        if self.max_errors < 0 || (acc.errors.len() as i64) < i64::from(self.max_errors) {
            return Ok(());
        }

        warn!(max_errors = self.max_errors, "error cap reached, stopping comparison");
        acc.errors.push(Error::too_many());
        acc.closed = true;
        match merge(std::mem::take(&mut acc.errors)) {
            Some(merged) => Err(merged),
            None => Err(Error::too_many()),
        }
    }

    /// Links the accumulated errors through `next` and returns the head.
    pub fn merge_errors(&self) -> Option<Box<Error>> {
        let acc = self.errors.as_ref()?;
        let errors = std::mem::take(&mut acc.borrow_mut().errors);
        merge(errors)
    }
}

fn merge(errors: Vec<Box<Error>>) -> Option<Box<Error>> {
    let mut iter = errors.into_iter();
    let mut head = iter.next()?;
    for err in iter {
        head.push_next(err);
    }
    Some(head)
}
