use std::collections::BTreeSet;

/// Key of the fallback entry in a [`super::MountTable`], and the token that
/// selects every operation in `per_op_statistics`.
pub const WILDCARD: &str = "all";

/// Default `min_age` in seconds.
pub const DEFAULT_MIN_AGE: u64 = 3600;

/// Which rows of the per-op table are emitted for a mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PerOpFilter {
    #[default]
    None,
    All,
    Subset(BTreeSet<String>),
}

impl PerOpFilter {
    /// Parses the `per_op_statistics` setting.
    ///
    /// `None` and lists that contain no names map to [`PerOpFilter::None`],
    /// the literal `all` to [`PerOpFilter::All`]. Names may be separated by
    /// commas, semicolons or whitespace.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return PerOpFilter::None;
        };
        if raw.trim() == WILDCARD {
            return PerOpFilter::All;
        }

        let names: BTreeSet<String> = raw
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
        if names.is_empty() {
            PerOpFilter::None
        } else {
            PerOpFilter::Subset(names)
        }
    }

    /// Returns `true` if at least one operation can pass the filter.
    pub fn is_active(&self) -> bool {
        match self {
            PerOpFilter::None => false,
            PerOpFilter::All => true,
            PerOpFilter::Subset(names) => !names.is_empty(),
        }
    }

    /// Case-sensitive membership test.
    pub fn includes(&self, op: &str) -> bool {
        match self {
            PerOpFilter::None => false,
            PerOpFilter::All => true,
            PerOpFilter::Subset(names) => names.contains(op),
        }
    }
}

/// Filtering policy for one mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPolicy {
    /// Records younger than this many seconds are dropped; `0` disables the check.
    pub min_age: u64,
    pub show: bool,
    pub per_op: PerOpFilter,
}

impl Default for MountPolicy {
    fn default() -> Self {
        Self {
            min_age: DEFAULT_MIN_AGE,
            show: true,
            per_op: PerOpFilter::None,
        }
    }
}

impl MountPolicy {
    /// Returns `true` if a mount of the given age passes `show` and `min_age`.
    pub fn admits(&self, age: u64) -> bool {
        if !self.show {
            return false;
        }
        self.min_age == 0 || age >= self.min_age
    }
}
