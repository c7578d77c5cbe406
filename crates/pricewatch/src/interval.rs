//! Check interval parsing.
//!
//! Accepted forms (input is trimmed and lower-cased first):
//!
//! - `120` - plain seconds
//! - `2m`, `2min` - whole minutes
//! - `random:60-300` - uniform seconds in the inclusive range
//! - `random:300` - uniform seconds in `[60, 300]`
//!
//! Anything else resolves to [`FALLBACK_INTERVAL_SECS`]. Resolution never fails.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

/// Interval used when a specification cannot be parsed.
pub const FALLBACK_INTERVAL_SECS: u64 = 60;

/// Lower bound for `random:<max>` specifications.
pub const RANDOM_FLOOR_SECS: u64 = 60;

/// A parsed interval specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSpec {
    /// Always the same number of seconds
    Fixed(u64),
    /// Uniformly random seconds, both ends inclusive
    Random { min: u64, max: u64 },
}

impl IntervalSpec {
    /// Parse a specification, returning `None` for anything malformed
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim().to_lowercase();

        if let Some(range) = s.strip_prefix("random:") {
            let (min, max) = match range.split_once('-') {
                Some((min, max)) => (parse_secs(min)?, parse_secs(max)?),
                None => (RANDOM_FLOOR_SECS, parse_secs(range)?),
            };
            return (min <= max).then_some(IntervalSpec::Random { min, max });
        }

        if let Some(minutes) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
            return parse_secs(minutes)?.checked_mul(60).map(IntervalSpec::Fixed);
        }

        parse_secs(&s).map(IntervalSpec::Fixed)
    }

    /// Draw a concrete number of seconds
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            IntervalSpec::Fixed(secs) => secs,
            IntervalSpec::Random { min, max } => rng.gen_range(min..=max),
        }
    }
}

fn parse_secs(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}

/// Resolves interval specifications to sleep durations
///
/// The random source is injected so tests can use a seeded generator.
pub struct IntervalResolver {
    rng: Box<dyn RngCore + Send + Sync>,
}

impl IntervalResolver {
    /// Create a resolver backed by an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a resolver with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a resolver around any random source
    pub fn with_rng<R: RngCore + Send + Sync + 'static>(rng: R) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// Resolve a specification to seconds
    pub fn resolve(&mut self, spec: &str) -> u64 {
        match IntervalSpec::parse(spec) {
            Some(parsed) => parsed.sample(&mut self.rng),
            None => {
                debug!(spec, fallback = FALLBACK_INTERVAL_SECS, "Unparseable interval, using fallback");
                FALLBACK_INTERVAL_SECS
            }
        }
    }
}

impl Default for IntervalResolver {
    fn default() -> Self {
        Self::new()
    }
}
