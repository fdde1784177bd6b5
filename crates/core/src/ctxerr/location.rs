use std::fmt;

/// Where an operator was built, reported under its failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: String,
    pub func: String,
    pub line: u32,
    /// Extra detail appended to `func`, e.g. `[2]` for an operator inside another.
    pub inside: String,
    /// Set when the location points at a top-level comparison call, which
    /// is never reported.
    pub behind_cmp: bool,
}

impl Location {
    /// Captures the caller's file and line.
    #[track_caller]
    pub fn capture(func: impl Into<String>) -> Location {
        let caller = std::panic::Location::caller();
        Location {
            file: caller.file().to_string(),
            func: func.into(),
            line: caller.line(),
            inside: String::new(),
            behind_cmp: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.file.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} at {}:{}", self.func, self.inside, self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_points_here() {
        let loc = Location::capture("NotZero");
        assert!(loc.is_initialized());
        assert!(loc.file.ends_with("location.rs"));
        assert_eq!(
            loc.to_string(),
            format!("NotZero at {}:{}", loc.file, loc.line)
        );
    }
}
