//! Official (Random-State) Scrambles
//!
//! Official scrambles come from an external WCA-style random-state scrambler.
//! That dependency may be missing, slow or broken; [`OfficialGenerator`]
//! absorbs every failure by drawing from the static fallback pool, so callers
//! always receive a scramble.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::rng::DeterministicRng;
use crate::scramble::generator::ConstrainedGenerator;
use crate::scramble::moves::{ParseMoveError, ScrambleSequence};
use crate::scramble::pool::fallback_scramble;

/// Default move count for official 3x3 scrambles.
pub const DEFAULT_OFFICIAL_MOVE_COUNT: usize = 20;

/// Default puzzle size (3x3x3).
pub const DEFAULT_PUZZLE_SIZE: u8 = 3;

/// External scrambler failures.
#[derive(Debug, Error)]
pub enum ScrambleError {
    /// No scrambler configured.
    #[error("no official scrambler configured")]
    Unavailable,

    /// Scrambler process could not be started.
    #[error("failed to run scrambler: {0}")]
    Spawn(#[from] std::io::Error),

    /// Scrambler exited unsuccessfully.
    #[error("scrambler exited with {status}: {stderr}")]
    Failed {
        /// Exit status description.
        status: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Scrambler did not answer in time.
    #[error("scrambler timed out after {0:?}")]
    Timeout(Duration),

    /// Scrambler printed nothing.
    #[error("scrambler produced no scramble")]
    EmptyOutput,

    /// Scrambler printed something that is not move notation.
    #[error("invalid scramble {text:?}: {source}")]
    Parse {
        /// Offending output line.
        text: String,
        /// Parse failure.
        #[source]
        source: ParseMoveError,
    },
}

/// Random-state scrambler for a given puzzle size.
pub trait RandomStateScrambler: Send + Sync {
    /// Produce a scramble of roughly `move_count` moves for an
    /// `puzzle_size`-layer cube.
    fn scramble(
        &self,
        puzzle_size: u8,
        move_count: usize,
    ) -> impl Future<Output = Result<ScrambleSequence, ScrambleError>> + Send;
}

/// A missing scrambler always fails, which routes every request to the
/// fallback pool.
impl<S: RandomStateScrambler> RandomStateScrambler for Option<S> {
    async fn scramble(&self, puzzle_size: u8, move_count: usize) -> Result<ScrambleSequence, ScrambleError> {
        match self {
            Some(inner) => inner.scramble(puzzle_size, move_count).await,
            None => Err(ScrambleError::Unavailable),
        }
    }
}

// =============================================================================
// PROCESS SCRAMBLER
// =============================================================================

/// Runs an external scrambler program.
///
/// Invoked as `program [args...] <puzzle_size> <move_count>`; the first
/// non-empty line of stdout is the scramble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessScrambler {
    /// Executable to run.
    pub program: PathBuf,
    /// Leading arguments.
    pub args: Vec<String>,
    /// Maximum time to wait for output.
    pub timeout: Duration,
}

impl ProcessScrambler {
    /// Scrambler running `program` with a five second timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Parse a whitespace-separated command line (`"tnoodle scramble"`).
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            args: parts.map(str::to_string).collect(),
            ..Self::new(program)
        })
    }
}

impl RandomStateScrambler for ProcessScrambler {
    async fn scramble(&self, puzzle_size: u8, move_count: usize) -> Result<ScrambleSequence, ScrambleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(puzzle_size.to_string())
            .arg(move_count.to_string())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ScrambleError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(ScrambleError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(ScrambleError::EmptyOutput)?;

        let sequence: ScrambleSequence = line.parse().map_err(|source| ScrambleError::Parse {
            text: line.to_string(),
            source,
        })?;
        if sequence.is_empty() {
            return Err(ScrambleError::EmptyOutput);
        }
        Ok(sequence)
    }
}

// =============================================================================
// OFFICIAL GENERATOR
// =============================================================================

/// Where a scramble came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrambleSource {
    /// Constrained random-move generator.
    Constrained,
    /// External random-state scrambler.
    Official,
    /// Static fallback pool.
    Fallback,
}

/// Official scrambles with fallback.
#[derive(Debug, Clone)]
pub struct OfficialGenerator<S> {
    scrambler: S,
    /// Layers of the target puzzle.
    pub puzzle_size: u8,
    /// Requested move count.
    pub move_count: usize,
}

impl<S: RandomStateScrambler> OfficialGenerator<S> {
    /// Generator for a 3x3 at the default move count.
    pub fn new(scrambler: S) -> Self {
        Self {
            scrambler,
            puzzle_size: DEFAULT_PUZZLE_SIZE,
            move_count: DEFAULT_OFFICIAL_MOVE_COUNT,
        }
    }

    /// Override puzzle size and move count.
    pub fn with_target(mut self, puzzle_size: u8, move_count: usize) -> Self {
        self.puzzle_size = puzzle_size;
        self.move_count = move_count;
        self
    }

    /// Generate an official scramble, falling back to the static pool on any
    /// scrambler failure. Never fails.
    pub async fn generate(&self, rng: &mut DeterministicRng) -> (ScrambleSequence, ScrambleSource) {
        match self.scrambler.scramble(self.puzzle_size, self.move_count).await {
            Ok(sequence) => {
                debug!(moves = sequence.len(), "official scramble generated");
                (sequence, ScrambleSource::Official)
            }
            Err(err) => {
                warn!(error = %err, "official scrambler failed, using fallback pool");
                match fallback_scramble(rng) {
                    Some(sequence) => (sequence, ScrambleSource::Fallback),
                    None => (
                        ConstrainedGenerator::new(self.move_count).generate(rng),
                        ScrambleSource::Constrained,
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::pool::fallback_pool;

    struct FixedScrambler(&'static str);

    impl RandomStateScrambler for FixedScrambler {
        async fn scramble(&self, _puzzle_size: u8, _move_count: usize) -> Result<ScrambleSequence, ScrambleError> {
            self.0.parse().map_err(|source| ScrambleError::Parse {
                text: self.0.to_string(),
                source,
            })
        }
    }

    #[tokio::test]
    async fn test_official_success_passes_through() {
        let generator = OfficialGenerator::new(FixedScrambler("R U R' U'"));
        let (sequence, source) = generator.generate(&mut DeterministicRng::new(1)).await;

        assert_eq!(source, ScrambleSource::Official);
        assert_eq!(sequence.to_string(), "R U R' U'");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_pool() {
        let generator = OfficialGenerator::new(FixedScrambler("not a scramble"));
        let (sequence, source) = generator.generate(&mut DeterministicRng::new(1)).await;

        assert_eq!(source, ScrambleSource::Fallback);
        assert!(fallback_pool().contains(&sequence));
    }

    #[tokio::test]
    async fn test_missing_scrambler_falls_back() {
        let generator = OfficialGenerator::new(None::<ProcessScrambler>);
        let (sequence, source) = generator.generate(&mut DeterministicRng::new(9)).await;

        assert_eq!(source, ScrambleSource::Fallback);
        assert_eq!(sequence.len(), 20);
    }

    #[tokio::test]
    async fn test_process_scrambler_spawn_failure() {
        let scrambler = ProcessScrambler::new("/nonexistent/speedcube-scrambler");
        let result = scrambler.scramble(3, 20).await;
        assert!(matches!(result, Err(ScrambleError::Spawn(_))));

        let generator = OfficialGenerator::new(scrambler);
        let (_, source) = generator.generate(&mut DeterministicRng::new(2)).await;
        assert_eq!(source, ScrambleSource::Fallback);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_scrambler_reads_first_line() {
        let scrambler = ProcessScrambler {
            args: vec!["-c".into(), "printf \"\\nR2 F' U D\\nignored\\n\"".into()],
            ..ProcessScrambler::new("sh")
        };
        let sequence = scrambler.scramble(3, 20).await.unwrap();
        assert_eq!(sequence.to_string(), "R2 F' U D");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_scrambler_rejects_garbage() {
        // echo prints the trailing size and count too, which are not moves
        let scrambler = ProcessScrambler::from_command_line("echo R2 F U").unwrap();
        let result = scrambler.scramble(3, 20).await;
        assert!(matches!(result, Err(ScrambleError::Parse { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_scrambler_nonzero_exit() {
        let scrambler = ProcessScrambler::new("false");
        let result = scrambler.scramble(3, 20).await;
        assert!(matches!(result, Err(ScrambleError::Failed { .. })));
    }

    #[test]
    fn test_from_command_line() {
        let scrambler = ProcessScrambler::from_command_line("tnoodle scramble --puzzle").unwrap();
        assert_eq!(scrambler.program, PathBuf::from("tnoodle"));
        assert_eq!(scrambler.args, vec!["scramble", "--puzzle"]);
        assert!(ProcessScrambler::from_command_line("   ").is_none());
    }
}
