//! Optional backend features and the ordered ladder used to degrade them.
//!
//! ```rust
//! use pbackend::{FeatureSet, UnsupportedFeatures};
//!
//! let requested = FeatureSet { tools: true, think: Some(true) };
//! let rejected = UnsupportedFeatures { tools: true, think: false };
//!
//! let ladder = requested.fallback_ladder(rejected);
//! assert_eq!(ladder[0], FeatureSet { tools: false, think: Some(true) });
//! assert_eq!(ladder[1], FeatureSet::none());
//! ```

/// Features a request asks for beyond plain chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureSet {
    pub tools: bool,
    pub think: Option<bool>,
}

/// Features a backend rejected for a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnsupportedFeatures {
    pub tools: bool,
    pub think: bool,
}

impl UnsupportedFeatures {
    pub fn is_empty(&self) -> bool {
        !self.tools && !self.think
    }
}

impl FeatureSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn without_tools(self) -> Self {
        Self {
            tools: false,
            ..self
        }
    }

    pub fn without_think(self) -> Self {
        Self { think: None, ..self }
    }

    pub fn is_plain(&self) -> bool {
        !self.tools && self.think.is_none()
    }

    fn drops_all(&self, rejected: UnsupportedFeatures) -> bool {
        !(rejected.tools && self.tools) && !(rejected.think && self.think.is_some())
    }

    /// Feature subsets to retry with after `rejected` came back, most
    /// capable first.
    ///
    /// The ladder is fixed: tools removed, then thinking removed, then both.
    /// Entries that still carry a rejected feature or that equal `self` are
    /// skipped, so an empty ladder means there is nothing left to degrade.
    pub fn fallback_ladder(self, rejected: UnsupportedFeatures) -> Vec<FeatureSet> {
        if rejected.is_empty() {
            return Vec::new();
        }

        let candidates = [
            self.without_tools(),
            self.without_think(),
            self.without_tools().without_think(),
        ];

        let mut ladder: Vec<FeatureSet> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate == self || !candidate.drops_all(rejected) || ladder.contains(&candidate) {
                continue;
            }
            ladder.push(candidate);
        }

        ladder
    }
}
