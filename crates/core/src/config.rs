//! Comparison settings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anchors::AnchorRegistry;
use crate::ctxerr::{Context, Path, MAX_ERRORS_ENV};
use crate::hooks::HookRegistry;

/// Settings of a top-level comparison. Registries are shared: clones of a
/// config see the same hooks and anchors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the compared value at the root of every path.
    pub root_name: String,
    /// `0` or `1` stops at the first error, negative reports them all.
    pub max_errors: i32,
    pub use_equal: bool,
    pub be_lax: bool,
    pub ignore_unexported: bool,
    #[serde(skip)]
    pub hooks: Arc<HookRegistry>,
    #[serde(skip)]
    pub anchors: Arc<AnchorRegistry>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_name: "DATA".to_string(),
            max_errors: 10,
            use_equal: false,
            be_lax: false,
            ignore_unexported: false,
            hooks: Arc::new(HookRegistry::new()),
            anchors: Arc::new(AnchorRegistry::new()),
        }
    }
}

impl Config {
    /// Defaults, with `max_errors` taken from `TDEEP_MAX_ERRORS` when set.
    pub fn from_env() -> Self {
        Config::default().with_env_max_errors(std::env::var(MAX_ERRORS_ENV).ok().as_deref())
    }

    /// Applies a raw `TDEEP_MAX_ERRORS` value; unparsable values are ignored.
    pub fn with_env_max_errors(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            match raw.trim().parse::<i32>() {
                Ok(n) => self.max_errors = n,
                Err(_) => warn!(value = raw, "ignoring invalid {}", MAX_ERRORS_ENV),
            }
        }
        self
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_max_errors(mut self, max_errors: i32) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn lax(mut self, be_lax: bool) -> Self {
        self.be_lax = be_lax;
        self
    }

    pub fn use_equal(mut self, use_equal: bool) -> Self {
        self.use_equal = use_equal;
        self
    }

    pub fn ignore_unexported(mut self, ignore: bool) -> Self {
        self.ignore_unexported = ignore;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_anchors(mut self, anchors: Arc<AnchorRegistry>) -> Self {
        self.anchors = anchors;
        self
    }

    /// Root context of a comparison using these settings.
    pub fn new_context(&self) -> Context {
        let mut ctx = Context::new(
            Path::new(self.root_name.as_str()),
            self.max_errors,
            self.hooks.clone(),
            self.anchors.clone(),
        );
        ctx.be_lax = self.be_lax;
        ctx.use_equal = self.use_equal;
        ctx.ignore_unexported = self.ignore_unexported;
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.root_name, "DATA");
        assert_eq!(c.max_errors, 10);
        assert!(!c.be_lax);
    }

    #[test]
    fn env_override() {
        assert_eq!(Config::default().with_env_max_errors(Some("-1")).max_errors, -1);
        assert_eq!(Config::default().with_env_max_errors(Some(" 3 ")).max_errors, 3);
        assert_eq!(Config::default().with_env_max_errors(Some("lots")).max_errors, 10);
        assert_eq!(Config::default().with_env_max_errors(None).max_errors, 10);
    }

    #[test]
    fn deserializes_partial() {
        let c: Config = serde_json::from_value(serde_json::json!({
            "max_errors": 2,
            "be_lax": true,
        }))
        .expect("valid config");
        assert_eq!(c.max_errors, 2);
        assert!(c.be_lax);
        assert_eq!(c.root_name, "DATA");
    }

    #[test]
    fn context_carries_flags() {
        let ctx = Config::default()
            .with_root_name("ROOT")
            .lax(true)
            .with_max_errors(1)
            .new_context();
        assert_eq!(ctx.path.to_string(), "ROOT");
        assert!(ctx.be_lax);
        assert!(!ctx.accumulates());
    }
}
