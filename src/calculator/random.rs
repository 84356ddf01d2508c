//! Random integer sampling over an inclusive range.
//!
//! Three distributions are supported. Every sample is clamped into
//! `[min, max]`, so callers can rely on the bounds whatever the shape.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::HandlerError;

/// Probability distribution of the generated number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    /// Every value equally likely.
    #[default]
    Uniform,
    /// Bell curve centred on the middle of the range.
    Normal,
    /// Decaying from `min` towards `max`.
    Exponential,
}

impl Distribution {
    /// Names accepted by [`FromStr`], in documentation order.
    pub const NAMES: [&'static str; 3] = ["uniform", "normal", "exponential"];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Normal => "normal",
            Self::Exponential => "exponential",
        }
    }

    /// A sentence describing how values in `[min, max]` are distributed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn explain(self, min: i64, max: i64) -> String {
        let centre = (min + max) / 2;
        match self {
            Self::Uniform => format!(
                "Using uniform distribution, each number between {min} and {max} has an equal probability of being selected."
            ),
            Self::Normal => {
                let (mean, std_dev) = normal_parameters(min, max);
                format!(
                    "Using normal (Gaussian) distribution with mean {mean:.2} and standard deviation {std_dev:.2}. Values near the center ({}-{}) are more likely.",
                    centre - 5,
                    centre + 5
                )
            }
            Self::Exponential => format!(
                "Using exponential distribution. Lower values in the range ({min}-{centre}) are more likely than higher values."
            ),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = HandlerError;

    /// The empty string selects the default (uniform). Anything else that is
    /// not a known name is an error; there is no silent fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "uniform" => Ok(Self::Uniform),
            "normal" => Ok(Self::Normal),
            "exponential" => Ok(Self::Exponential),
            other => Err(HandlerError::new(format!(
                "Invalid distribution: {other}. Valid distributions are: {}",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn normal_parameters(min: i64, max: i64) -> (f64, f64) {
    let mean = (max + min) as f64 / 2.0;
    // About 99.7% of samples fall within three deviations of the mean.
    let std_dev = (max - min) as f64 / 6.0;
    (mean, std_dev)
}

/// Draws one integer from `[min, max]`.
///
/// Requires `min < max`; the validator enforces this before any handler runs.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn sample<R: Rng + ?Sized>(rng: &mut R, distribution: Distribution, min: i64, max: i64) -> i64 {
    debug_assert!(min < max, "sample requires min < max");

    match distribution {
        Distribution::Uniform => rng.gen_range(min..=max),
        Distribution::Normal => {
            let (mean, std_dev) = normal_parameters(min, max);
            let value = standard_normal(rng).mul_add(std_dev, mean);
            (value as i64).clamp(min, max)
        }
        Distribution::Exponential => {
            let rate = 1.0 / (max - min) as f64;
            let value = standard_exponential(rng) / rate;
            (value as i64).saturating_add(min).clamp(min, max)
        }
    }
}

/// Box–Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) is (0, 1], keeping ln away from zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Inverse transform of the unit-rate exponential.
fn standard_exponential<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    -(1.0 - rng.gen::<f64>()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parse_names() {
        assert_eq!("".parse::<Distribution>().unwrap(), Distribution::Uniform);
        assert_eq!(
            "uniform".parse::<Distribution>().unwrap(),
            Distribution::Uniform
        );
        assert_eq!("normal".parse::<Distribution>().unwrap(), Distribution::Normal);
        assert_eq!(
            "exponential".parse::<Distribution>().unwrap(),
            Distribution::Exponential
        );
    }

    #[test]
    fn unknown_name_is_an_error_not_uniform() {
        let err = "poisson".parse::<Distribution>().unwrap_err();
        assert!(err.message.contains("Invalid distribution: poisson"));
        assert!(err.message.contains("uniform, normal, exponential"));
    }

    #[test]
    fn samples_stay_in_bounds_for_every_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        for distribution in [
            Distribution::Uniform,
            Distribution::Normal,
            Distribution::Exponential,
        ] {
            for (min, max) in [(1, 100), (-50, -40), (0, 1), (-1_000_000_000, 1_000_000_000)] {
                for _ in 0..500 {
                    let n = sample(&mut rng, distribution, min, max);
                    assert!(
                        (min..=max).contains(&n),
                        "{distribution} produced {n} outside [{min}, {max}]"
                    );
                }
            }
        }
    }

    #[test]
    fn narrowest_range_reaches_both_ends() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<i64> = (0..200)
            .map(|_| sample(&mut rng, Distribution::Uniform, 4, 5))
            .collect();
        assert!(draws.contains(&4));
        assert!(draws.contains(&5));
    }

    #[test]
    fn exponential_favours_low_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<i64> = (0..2000)
            .map(|_| sample(&mut rng, Distribution::Exponential, 0, 100))
            .collect();
        let bottom = draws.iter().filter(|n| (0..10).contains(*n)).count();
        let upper = draws.iter().filter(|n| (80..90).contains(*n)).count();
        assert!(bottom > upper, "{bottom} low draws vs {upper} high draws");
    }

    #[test]
    fn explanations_mention_parameters() {
        assert!(Distribution::Uniform
            .explain(1, 100)
            .contains("between 1 and 100"));
        assert!(Distribution::Normal
            .explain(0, 60)
            .contains("mean 30.00 and standard deviation 10.00"));
        assert!(Distribution::Exponential.explain(0, 10).contains("(0-5)"));
    }
}
