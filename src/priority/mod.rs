//! Beta-distributed item priorities.
//!
//! Every configured item carries a Beta(a, b) distribution. Its priority for
//! a given scheduling pass is a single draw from that distribution, so an item
//! with a low mean but a wide spread still surfaces now and then.
//!
//! Two sampling policies exist:
//! - [`SampleMode::Stochastic`]: a fresh draw from the thread RNG.
//! - [`SampleMode::DeterministicForDay`]: the RNG is seeded from the date, so
//!   repeated draws on the same day agree and the queue does not reshuffle
//!   mid-session.

mod seed;

use std::fmt;

use chrono::NaiveDate;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Beta;

use crate::error::{IbqError, Result};
use crate::properties::{self, KEY_A, KEY_B, KEY_SAMPLE, Properties};

pub use seed::day_seed;

/// How a priority sample is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Fresh pseudo-random draw, not reproducible.
    Stochastic,
    /// Draw from an RNG seeded by the given calendar day.
    DeterministicForDay(NaiveDate),
}

/// Beta(a, b) priority distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityDistribution {
    a: f64,
    b: f64,
}

/// Priority parameters and cached sample parsed from stored properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredPriority {
    pub beta: Option<PriorityDistribution>,
    pub sample: Option<f64>,
}

impl PriorityDistribution {
    /// Build a distribution. Both shapes must be finite and `> 0`.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if !(a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0) {
            return Err(IbqError::InvalidParameter { a, b });
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    /// `a / (a + b)`
    pub fn mean(&self) -> f64 {
        self.a / (self.a + self.b)
    }

    /// `ab / ((a+b)^2 (a+b+1))`
    pub fn variance(&self) -> f64 {
        let sum = self.a + self.b;
        self.a * self.b / (sum * sum * (sum + 1.0))
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> PrioritySummary {
        PrioritySummary {
            mean: self.mean(),
            std: self.std(),
        }
    }

    /// Draw one priority sample in `[0, 1]`.
    pub fn sample(&self, mode: SampleMode) -> f64 {
        match mode {
            SampleMode::Stochastic => self.sample_with(&mut rand::thread_rng()),
            SampleMode::DeterministicForDay(date) => {
                let mut rng = StdRng::from_seed(day_seed(date));
                self.sample_with(&mut rng)
            }
        }
    }

    /// Draw with a caller-supplied RNG.
    ///
    /// Extremely small shapes can make the gamma ratio degenerate (`0/0`);
    /// such draws collapse to the mean.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let x = match Beta::new(self.a, self.b) {
            Ok(dist) => dist.sample(rng),
            Err(_) => return self.mean(),
        };
        if is_valid_sample(x) { x } else { self.mean() }
    }

    /// Parse `ib-a` / `ib-b` from stored properties.
    ///
    /// Missing, malformed, or out-of-domain parameters yield `None`: the item
    /// simply has no configured priority.
    pub fn from_stored_properties(props: &Properties) -> Option<Self> {
        let a = properties::number(props, KEY_A)?;
        let b = properties::number(props, KEY_B)?;
        Self::new(a, b).ok()
    }
}

impl StoredPriority {
    /// Parse both the distribution and the cached sample.
    pub fn from_properties(props: &Properties) -> Self {
        Self {
            beta: PriorityDistribution::from_stored_properties(props),
            sample: properties::number(props, KEY_SAMPLE).filter(|s| is_valid_sample(*s)),
        }
    }
}

/// `true` iff `x` is finite and within `[0, 1]`.
pub fn is_valid_sample(x: f64) -> bool {
    x.is_finite() && (0.0..=1.0).contains(&x)
}

/// Mean and standard deviation of a priority distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrioritySummary {
    pub mean: f64,
    pub std: f64,
}

impl fmt::Display for PrioritySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} (± {:.1})", self.mean * 100.0, self.std * 100.0)
    }
}

/// Render a sample as a percentage with two decimals, `None` if invalid.
pub fn format_sample(x: f64) -> Option<String> {
    is_valid_sample(x).then(|| format!("{:.2}", x * 100.0))
}
