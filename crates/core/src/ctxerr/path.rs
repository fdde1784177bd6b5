//! Breadcrumb of the traversal position inside compared values.

use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Struct,
    Array,
    Map,
    Func,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub kind: LevelKind,
    pub content: String,
    /// Dereferences applied after this level.
    pub pointers: usize,
}

/// A list of levels, rendered as an expression such as `(*DATA.field)[3]["key"]`.
///
/// Every `add_*` method returns a new path, the receiver is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    levels: Vec<Level>,
}

impl Path {
    /// A path starting at `root`, usually `"DATA"`.
    pub fn new(root: impl Into<String>) -> Path {
        Path {
            levels: vec![Level {
                kind: LevelKind::Custom,
                content: root.into(),
                pointers: 0,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    fn push(&self, kind: LevelKind, content: String) -> Path {
        if self.is_empty() {
            return Path::default();
        }
        let mut levels = self.levels.clone();
        levels.push(Level {
            kind,
            content,
            pointers: 0,
        });
        Path { levels }
    }

    pub fn add_field(&self, field: &str) -> Path {
        self.push(LevelKind::Struct, field.to_string())
    }

    pub fn add_array_index(&self, index: usize) -> Path {
        self.push(LevelKind::Array, index.to_string())
    }

    pub fn add_map_key(&self, key: &Value) -> Path {
        self.push(LevelKind::Map, key.to_string())
    }

    /// Wraps the path in a call, rendered `fn(path)`.
    pub fn add_function_call(&self, func: &str) -> Path {
        self.push(LevelKind::Func, func.to_string())
    }

    /// Appends a free-form label, rendered as is.
    pub fn add_custom_level(&self, label: &str) -> Path {
        self.push(LevelKind::Custom, label.to_string())
    }

    /// Adds `num` dereferences to the last level.
    pub fn add_ptr(&self, num: usize) -> Path {
        let mut path = self.clone();
        if let Some(last) = path.levels.last_mut() {
            last.pointers += num;
        }
        path
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, level) in self.levels.iter().enumerate() {
            match level.kind {
                LevelKind::Struct => {
                    out.push('.');
                    out.push_str(&level.content);
                }
                LevelKind::Array | LevelKind::Map => {
                    out.push('[');
                    out.push_str(&level.content);
                    out.push(']');
                }
                LevelKind::Func => out = format!("{}({})", level.content, out),
                LevelKind::Custom => out.push_str(&level.content),
            }

            if level.pointers == 0 {
                continue;
            }
            let next = self.levels.get(i + 1).map(|l| l.kind);
            // Field access dereferences one pointer implicitly.
            let stars = if next == Some(LevelKind::Struct) {
                level.pointers - 1
            } else {
                level.pointers
            };
            if stars == 0 {
                continue;
            }
            let stars = "*".repeat(stars);
            out = match next {
                None | Some(LevelKind::Func) => format!("{}{}", stars, out),
                Some(_) => format!("({}{})", stars, out),
            };
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_stays_empty() {
        let p = Path::default().add_field("A").add_ptr(1);
        assert!(p.is_empty());
        assert_eq!(p.to_string(), "");
    }

    #[test]
    fn renders_levels() {
        let root = Path::new("DATA");
        assert_eq!(root.to_string(), "DATA");
        assert_eq!(root.add_field("A").to_string(), "DATA.A");
        assert_eq!(root.add_array_index(3).to_string(), "DATA[3]");
        assert_eq!(root.add_map_key(&"key".into()).to_string(), "DATA[\"key\"]");
        assert_eq!(root.add_function_call("len").to_string(), "len(DATA)");
        assert_eq!(root.add_custom_level("<All#1/2>").to_string(), "DATA<All#1/2>");
    }

    #[test]
    fn pointer_levels() {
        let root = Path::new("DATA");
        assert_eq!(root.add_ptr(1).to_string(), "*DATA");
        assert_eq!(root.add_ptr(1).add_field("A").to_string(), "DATA.A");
        assert_eq!(root.add_ptr(2).add_field("A").to_string(), "(*DATA).A");
        assert_eq!(root.add_ptr(1).add_array_index(0).to_string(), "(*DATA)[0]");
        assert_eq!(root.add_ptr(1).add_function_call("len").to_string(), "len(*DATA)");
        assert_eq!(
            root.add_ptr(2)
                .add_field("field1")
                .add_ptr(3)
                .add_array_index(42)
                .to_string(),
            "(***(*DATA).field1)[42]"
        );
    }

    #[test]
    fn add_does_not_touch_receiver() {
        let root = Path::new("DATA");
        let a = root.add_field("A");
        let b = root.add_field("B");
        assert_eq!(root.to_string(), "DATA");
        assert_eq!(a.to_string(), "DATA.A");
        assert_eq!(b.to_string(), "DATA.B");
    }
}
