//! Scramble Generation
//!
//! - `moves`: face-turn notation and sequences
//! - `generator`: constrained random-move generator
//! - `official`: external random-state scrambler with fallback
//! - `pool`: static fallback scrambles
//!
//! Every call is independent: generators hold no mutable state and each
//! request draws from its own RNG, so the service is safe to share.

pub mod moves;
pub mod generator;
pub mod official;
pub mod pool;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::rng::{entropy_seed, DeterministicRng};

pub use moves::{Axis, Face, Modifier, Move, ParseMoveError, ScrambleSequence};
pub use generator::{violations, ConstrainedGenerator, ConstraintViolation, ViolationKind, DEFAULT_SCRAMBLE_LENGTH};
pub use official::{
    OfficialGenerator, ProcessScrambler, RandomStateScrambler, ScrambleError, ScrambleSource,
    DEFAULT_OFFICIAL_MOVE_COUNT, DEFAULT_PUZZLE_SIZE,
};

/// Which generator to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrambleStrategy {
    /// Constrained random moves, no external dependency.
    Constrained,
    /// External random-state scrambler with fallback pool.
    #[default]
    Official,
}

impl fmt::Display for ScrambleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrambleStrategy::Constrained => f.write_str("constrained"),
            ScrambleStrategy::Official => f.write_str("official"),
        }
    }
}

impl FromStr for ScrambleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constrained" | "random" => Ok(ScrambleStrategy::Constrained),
            "official" | "wca" => Ok(ScrambleStrategy::Official),
            other => Err(format!("unknown scramble strategy: {other}")),
        }
    }
}

/// Scramble settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrambleConfig {
    /// Strategy for daily scrambles.
    pub strategy: ScrambleStrategy,
    /// Moves per constrained scramble.
    pub constrained_length: usize,
    /// Target moves per official scramble.
    pub official_move_count: usize,
    /// Puzzle layers for official scrambles.
    pub puzzle_size: u8,
    /// External scrambler command line; `None` means always use the pool.
    pub scrambler_command: Option<String>,
    /// External scrambler timeout.
    pub scrambler_timeout: Duration,
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            strategy: ScrambleStrategy::Official,
            constrained_length: DEFAULT_SCRAMBLE_LENGTH,
            official_move_count: DEFAULT_OFFICIAL_MOVE_COUNT,
            puzzle_size: DEFAULT_PUZZLE_SIZE,
            scrambler_command: None,
            scrambler_timeout: Duration::from_secs(5),
        }
    }
}

/// A freshly generated scramble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScramble {
    /// The moves.
    pub sequence: ScrambleSequence,
    /// Generator that produced it.
    pub source: ScrambleSource,
    /// Seed of the RNG used for local generation or fallback selection.
    pub seed: u64,
}

/// Strategy dispatch over both generators.
#[derive(Debug, Clone)]
pub struct ScrambleService<S> {
    constrained: ConstrainedGenerator,
    official: OfficialGenerator<S>,
    default_strategy: ScrambleStrategy,
}

impl<S: RandomStateScrambler> ScrambleService<S> {
    /// Build from settings and an official scrambler.
    pub fn new(config: &ScrambleConfig, scrambler: S) -> Self {
        Self {
            constrained: ConstrainedGenerator::new(config.constrained_length),
            official: OfficialGenerator::new(scrambler).with_target(config.puzzle_size, config.official_move_count),
            default_strategy: config.strategy,
        }
    }

    /// Strategy configured for daily scrambles.
    pub fn default_strategy(&self) -> ScrambleStrategy {
        self.default_strategy
    }

    /// Generate with a fresh entropy seed.
    pub async fn generate(&self, strategy: ScrambleStrategy) -> GeneratedScramble {
        self.generate_seeded(strategy, entropy_seed()).await
    }

    /// Generate with a fixed seed.
    pub async fn generate_seeded(&self, strategy: ScrambleStrategy, seed: u64) -> GeneratedScramble {
        let mut rng = DeterministicRng::new(seed);
        let (sequence, source) = match strategy {
            ScrambleStrategy::Constrained => (self.constrained.generate(&mut rng), ScrambleSource::Constrained),
            ScrambleStrategy::Official => self.official.generate(&mut rng).await,
        };
        GeneratedScramble { sequence, source, seed }
    }
}

impl ScrambleService<Option<ProcessScrambler>> {
    /// Build from settings, running `scrambler_command` for official
    /// scrambles when present.
    pub fn from_config(config: &ScrambleConfig) -> Self {
        let scrambler = config
            .scrambler_command
            .as_deref()
            .and_then(ProcessScrambler::from_command_line)
            .map(|p| ProcessScrambler {
                timeout: config.scrambler_timeout,
                ..p
            });
        Self::new(config, scrambler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::pool::fallback_pool;

    #[tokio::test]
    async fn test_constrained_strategy() {
        let service = ScrambleService::from_config(&ScrambleConfig::default());
        let generated = service.generate_seeded(ScrambleStrategy::Constrained, 11).await;

        assert_eq!(generated.source, ScrambleSource::Constrained);
        assert_eq!(generated.sequence.len(), DEFAULT_SCRAMBLE_LENGTH);
        assert!(violations(&generated.sequence).is_empty());

        let again = service.generate_seeded(ScrambleStrategy::Constrained, 11).await;
        assert_eq!(again, generated);
    }

    #[tokio::test]
    async fn test_official_without_scrambler_uses_pool() {
        let service = ScrambleService::from_config(&ScrambleConfig::default());
        let generated = service.generate(ScrambleStrategy::Official).await;

        assert_eq!(generated.source, ScrambleSource::Fallback);
        assert!(fallback_pool().contains(&generated.sequence));
    }

    #[tokio::test]
    async fn test_concurrent_generation() {
        let service = std::sync::Arc::new(ScrambleService::from_config(&ScrambleConfig::default()));
        let mut tasks = Vec::new();
        for seed in 0..16u64 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service.generate_seeded(ScrambleStrategy::Constrained, seed).await
            }));
        }
        for task in tasks {
            let generated = task.await.unwrap();
            assert!(violations(&generated.sequence).is_empty());
        }
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("official".parse::<ScrambleStrategy>().unwrap(), ScrambleStrategy::Official);
        assert_eq!("Constrained".parse::<ScrambleStrategy>().unwrap(), ScrambleStrategy::Constrained);
        assert!("tnoodle".parse::<ScrambleStrategy>().is_err());
    }
}
