use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Effective bandwidth tier reported by the host, slowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkClass {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

impl FromStr for NetworkClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(NetworkClass::Slow2g),
            "2g" => Ok(NetworkClass::TwoG),
            "3g" => Ok(NetworkClass::ThreeG),
            "4g" => Ok(NetworkClass::FourG),
            other => Err(format!("unknown network class: {}", other)),
        }
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkClass::Slow2g => "slow-2g",
            NetworkClass::TwoG => "2g",
            NetworkClass::ThreeG => "3g",
            NetworkClass::FourG => "4g",
        };
        f.write_str(name)
    }
}

/// Maximum number of page requests in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimit(NonZeroUsize);

impl ConcurrencyLimit {
    /// One request at a time.
    pub const SERIAL: Self = Self(NonZeroUsize::MIN);

    /// Used on the fastest network tier only.
    pub const FAST: Self = Self(NonZeroUsize::MIN.saturating_add(1));

    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }

    /// Unauthenticated bulk pagination stays serial unless the host says the
    /// link is fast. Unknown counts as slow.
    pub fn for_network(class: Option<NetworkClass>) -> Self {
        match class {
            Some(NetworkClass::FourG) => Self::FAST,
            _ => Self::SERIAL,
        }
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self::SERIAL
    }
}

/// Decides the concurrency limit each time a multi-page fetch starts.
pub type ConcurrencyStrategy = Arc<dyn Fn() -> ConcurrencyLimit + Send + Sync>;

/// Always the same limit.
pub fn fixed(limit: ConcurrencyLimit) -> ConcurrencyStrategy {
    Arc::new(move || limit)
}

/// Limit derived from a network class known up front.
pub fn from_network(class: Option<NetworkClass>) -> ConcurrencyStrategy {
    fixed(ConcurrencyLimit::for_network(class))
}

/// Limit derived from a host signal read at the start of every fetch.
pub fn from_probe<F>(probe: F) -> ConcurrencyStrategy
where
    F: Fn() -> Option<NetworkClass> + Send + Sync + 'static,
{
    Arc::new(move || ConcurrencyLimit::for_network(probe()))
}
