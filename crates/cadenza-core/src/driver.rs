//! The generation driver: iterates a corpus, filters and truncates pieces,
//! repeats generation per piece, and dispatches results to the renderer.
//!
//! Every piece yields an explicit [`PieceOutcome`]; skips carry their reason
//! instead of silently continuing. A shape failure aborts only the sample
//! that raised it. A configuration mismatch between the driver's window and
//! the generator's aborts the whole run, since the pretrained model and the
//! requested geometry disagree.

use std::path::PathBuf;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::dataset::DatasetProvider;
use crate::error::ShapeError;
use crate::model::{GenerationMode, ModelError, SequenceGenerator};
use crate::render::ScoreRenderer;
use crate::tensor::{segment_into_measures, TickTensor};
use crate::window::WindowSpec;

/// Which pieces of the corpus a run processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Process only the piece with this identifier; all others are skipped
    /// as filtered.
    SinglePiece {
        /// Identifier the run is restricted to.
        id: String,
    },
    /// Process every piece that passes the length filter.
    AllQualifying,
}

/// Configuration for one driver run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Piece selection policy.
    pub mode: RunMode,
    /// Independent samples to generate per qualifying piece.
    pub samples_per_piece: usize,
    /// Window geometry shared with the generator.
    pub window: WindowSpec,
    /// Base seed; per-(piece, sample) streams are derived from it.
    pub base_seed: u64,
    /// Suffix appended to output names after the sample index.
    pub name_suffix: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::AllQualifying,
            samples_per_piece: 15,
            window: WindowSpec::default(),
            base_seed: 0,
            name_suffix: "latent_rnn".to_string(),
        }
    }
}

/// What happened to one piece during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PieceOutcome {
    /// The piece qualified and samples were generated.
    Generated {
        /// Paths rendered, one per successful sample.
        rendered: Vec<PathBuf>,
        /// Samples that failed with a per-sample error, with messages.
        failed_samples: Vec<String>,
    },
    /// Skipped: did not match the run's piece filter.
    SkippedFiltered,
    /// Skipped: shorter than the required window.
    SkippedTooShort {
        /// Ticks the piece actually spans.
        have: usize,
        /// Ticks the window requires.
        need: usize,
    },
    /// Skipped: the dataset could not load the piece.
    SkippedUnreadable {
        /// Why loading failed.
        reason: String,
    },
}

impl PieceOutcome {
    /// True for any of the skip variants.
    pub fn is_skip(&self) -> bool {
        !matches!(self, PieceOutcome::Generated { .. })
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunReport {
    /// Per-piece outcomes, in corpus order.
    pub outcomes: Vec<(String, PieceOutcome)>,
}

impl RunReport {
    /// Total files rendered across all pieces.
    pub fn rendered_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                PieceOutcome::Generated { rendered, .. } => rendered.len(),
                _ => 0,
            })
            .sum()
    }

    /// Number of pieces that passed filtering and the length check.
    pub fn qualifying_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_skip())
            .count()
    }
}

/// Drives generation over a corpus.
pub struct GenerationDriver<'a, G, D, R>
where
    G: SequenceGenerator,
    D: DatasetProvider,
    R: ScoreRenderer,
{
    generator: &'a G,
    dataset: &'a D,
    renderer: &'a R,
    config: RunConfig,
}

impl<'a, G, D, R> GenerationDriver<'a, G, D, R>
where
    G: SequenceGenerator,
    D: DatasetProvider,
    R: ScoreRenderer,
{
    /// Creates a driver over the given collaborators.
    ///
    /// # Errors
    ///
    /// [`ModelError::ConfigMismatch`] if the generator was configured with a
    /// different window geometry than the run requests.
    pub fn new(
        generator: &'a G,
        dataset: &'a D,
        renderer: &'a R,
        config: RunConfig,
    ) -> Result<Self, ModelError> {
        let model_window = generator.window();
        if model_window != config.window {
            return Err(ModelError::ConfigMismatch(format!(
                "driver window {:?} disagrees with generator window {:?}",
                config.window, model_window
            )));
        }
        Ok(Self {
            generator,
            dataset,
            renderer,
            config,
        })
    }

    /// Runs generation over the corpus and reports per-piece outcomes.
    ///
    /// # Errors
    ///
    /// Only fatal model errors propagate; shape failures are recorded in the
    /// piece's outcome and abort just that sample.
    pub fn run(&self) -> Result<RunReport, ModelError> {
        let mut report = RunReport::default();

        for id in self.dataset.piece_ids() {
            let outcome = self.process_piece(&id)?;
            report.outcomes.push((id, outcome));
        }

        Ok(report)
    }

    fn process_piece(&self, id: &str) -> Result<PieceOutcome, ModelError> {
        if let RunMode::SinglePiece { id: wanted } = &self.config.mode {
            if wanted != id {
                return Ok(PieceOutcome::SkippedFiltered);
            }
        }

        let tensor = match self.dataset.load_tensor(id) {
            Ok(tensor) => tensor,
            Err(err) => {
                return Ok(PieceOutcome::SkippedUnreadable {
                    reason: err.to_string(),
                })
            }
        };

        let need = self.config.window.required_ticks();
        if tensor.len() < need {
            return Ok(PieceOutcome::SkippedTooShort {
                have: tensor.len(),
                need,
            });
        }
        let tensor = tensor.truncated(need);

        let mut rendered = Vec::with_capacity(self.config.samples_per_piece);
        let mut failed_samples = Vec::new();

        for sample_index in 0..self.config.samples_per_piece {
            match self.generate_sample(&tensor, id, sample_index) {
                Ok(path) => rendered.push(path),
                Err(SampleFailure::Fatal(err)) => return Err(err),
                Err(SampleFailure::Aborted(reason)) => {
                    failed_samples.push(format!("sample {sample_index}: {reason}"))
                }
            }
        }

        Ok(PieceOutcome::Generated {
            rendered,
            failed_samples,
        })
    }

    /// One independent sample: segment, split, generate free-running,
    /// reassemble, render.
    fn generate_sample(
        &self,
        tensor: &TickTensor,
        id: &str,
        sample_index: usize,
    ) -> Result<PathBuf, SampleFailure> {
        let window = &self.config.window;
        let measures =
            segment_into_measures(tensor, window.ticks_per_measure).map_err(ModelError::from)?;
        let split = window.split_context(measures).map_err(ModelError::from)?;

        let seed = derive_sample_seed(self.config.base_seed, id, sample_index as u64);
        let mut rng = Pcg32::seed_from_u64(seed);

        let output = self.generator.generate(
            &split.past,
            &split.future,
            GenerationMode::FreeRunning,
            window.num_target,
            &mut rng,
        )?;

        if output.target.len() != window.num_target {
            return Err(ModelError::from(ShapeError::MeasureCountMismatch {
                expected: window.num_target,
                actual: output.target.len(),
            })
            .into());
        }
        for block in &output.target {
            if block.width() != window.ticks_per_measure {
                return Err(ModelError::from(ShapeError::BlockWidthMismatch {
                    expected: window.ticks_per_measure,
                    actual: block.width(),
                })
                .into());
            }
        }

        let full = split.assemble_with(&output.target);
        let name = format!("{id}_{sample_index}_{}", self.config.name_suffix);
        self.renderer
            .render(&full, &name)
            .map_err(|err| SampleFailure::Aborted(format!("render failed: {err}")))
    }
}

/// Why a single sample did not produce a file.
enum SampleFailure {
    /// Must abort the whole run.
    Fatal(ModelError),
    /// Aborts only this sample; recorded in the piece outcome.
    Aborted(String),
}

impl From<ModelError> for SampleFailure {
    fn from(err: ModelError) -> Self {
        if err.is_fatal() {
            SampleFailure::Fatal(err)
        } else {
            SampleFailure::Aborted(err.to_string())
        }
    }
}

/// Derives an independent seed for one (piece, sample) pair.
///
/// Mixes the base seed, piece identifier, and sample index through a hash so
/// streams never overlap between samples or pieces.
pub fn derive_sample_seed(base_seed: u64, piece_id: &str, sample_index: u64) -> u64 {
    let mut input = Vec::with_capacity(16 + piece_id.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(piece_id.as_bytes());
    input.extend_from_slice(&sample_index.to_le_bytes());

    let hash = blake3::hash(&input);
    let bytes: [u8; 8] = hash.as_bytes()[0..8].try_into().unwrap();
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetError;
    use crate::model::GenerationOutput;
    use crate::render::RenderError;
    use crate::tensor::MeasureBlock;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    struct FakeDataset {
        pieces: Vec<(String, Vec<u16>)>,
    }

    impl DatasetProvider for FakeDataset {
        fn piece_ids(&self) -> Vec<String> {
            self.pieces.iter().map(|(id, _)| id.clone()).collect()
        }

        fn load_tensor(&self, id: &str) -> Result<TickTensor, DatasetError> {
            self.pieces
                .iter()
                .find(|(pid, _)| pid == id)
                .map(|(_, codes)| TickTensor::new(codes.clone()))
                .ok_or_else(|| DatasetError::UnknownPiece(id.to_string()))
        }
    }

    /// Emits constant measures; records call count and the tick length of
    /// the context it saw.
    struct FakeGenerator {
        window: WindowSpec,
        calls: Cell<usize>,
        context_ticks: Cell<usize>,
    }

    impl FakeGenerator {
        fn new(window: WindowSpec) -> Self {
            Self {
                window,
                calls: Cell::new(0),
                context_ticks: Cell::new(0),
            }
        }
    }

    impl SequenceGenerator for FakeGenerator {
        fn window(&self) -> WindowSpec {
            self.window
        }

        fn generate(
            &self,
            past: &[MeasureBlock],
            future: &[MeasureBlock],
            _mode: GenerationMode,
            num_target: usize,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<GenerationOutput, ModelError> {
            self.calls.set(self.calls.get() + 1);
            let ticks: usize = past.iter().chain(future).map(MeasureBlock::width).sum();
            self.context_ticks.set(ticks);
            Ok(GenerationOutput {
                target: (0..num_target)
                    .map(|_| MeasureBlock::new(vec![60; self.window.ticks_per_measure]))
                    .collect(),
                attention: vec![vec![0.0; past.len() + future.len()]; num_target],
            })
        }
    }

    struct FakeRenderer {
        names: RefCell<Vec<String>>,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                names: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScoreRenderer for FakeRenderer {
        fn render(&self, tensor: &TickTensor, name: &str) -> Result<PathBuf, RenderError> {
            assert_eq!(tensor.len() % 24, 0);
            self.names.borrow_mut().push(name.to_string());
            Ok(PathBuf::from(format!("{name}.mid")))
        }
    }

    fn config(mode: RunMode, samples: usize) -> RunConfig {
        RunConfig {
            mode,
            samples_per_piece: samples,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_output_count_is_samples_times_pieces() {
        let dataset = FakeDataset {
            pieces: vec![
                ("tune_a".to_string(), vec![129; 384]),
                ("tune_b".to_string(), vec![129; 400]),
            ],
        };
        let generator = FakeGenerator::new(WindowSpec::default());
        let renderer = FakeRenderer::new();

        let driver = GenerationDriver::new(
            &generator,
            &dataset,
            &renderer,
            config(RunMode::AllQualifying, 3),
        )
        .unwrap();
        let report = driver.run().unwrap();

        assert_eq!(report.qualifying_count(), 2);
        assert_eq!(report.rendered_count(), 6);
        assert_eq!(generator.calls.get(), 6);

        let names = renderer.names.borrow();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"tune_a_0_latent_rnn".to_string()));
        assert!(names.contains(&"tune_b_2_latent_rnn".to_string()));
        // All names unique
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 6);
    }

    #[test]
    fn test_too_short_piece_never_reaches_generator() {
        let dataset = FakeDataset {
            pieces: vec![("short".to_string(), vec![129; 360])],
        };
        let generator = FakeGenerator::new(WindowSpec::default());
        let renderer = FakeRenderer::new();

        let driver = GenerationDriver::new(
            &generator,
            &dataset,
            &renderer,
            config(RunMode::AllQualifying, 15),
        )
        .unwrap();
        let report = driver.run().unwrap();

        assert_eq!(generator.calls.get(), 0);
        assert_eq!(report.rendered_count(), 0);
        assert_eq!(
            report.outcomes[0].1,
            PieceOutcome::SkippedTooShort {
                have: 360,
                need: 384
            }
        );
    }

    #[test]
    fn test_longer_piece_is_prefix_truncated() {
        let dataset = FakeDataset {
            pieces: vec![("long".to_string(), vec![129; 500])],
        };
        let generator = FakeGenerator::new(WindowSpec::default());
        let renderer = FakeRenderer::new();

        let driver = GenerationDriver::new(
            &generator,
            &dataset,
            &renderer,
            config(RunMode::AllQualifying, 1),
        )
        .unwrap();
        driver.run().unwrap();

        // 12 context measures of 24 ticks each
        assert_eq!(generator.context_ticks.get(), 288);
    }

    #[test]
    fn test_single_piece_mode_filters_others() {
        let dataset = FakeDataset {
            pieces: vec![
                ("tune_16154".to_string(), vec![129; 384]),
                ("tune_other".to_string(), vec![129; 384]),
            ],
        };
        let generator = FakeGenerator::new(WindowSpec::default());
        let renderer = FakeRenderer::new();

        let driver = GenerationDriver::new(
            &generator,
            &dataset,
            &renderer,
            config(
                RunMode::SinglePiece {
                    id: "tune_16154".to_string(),
                },
                15,
            ),
        )
        .unwrap();
        let report = driver.run().unwrap();

        assert_eq!(report.rendered_count(), 15);
        assert_eq!(report.outcomes[1].1, PieceOutcome::SkippedFiltered);
    }

    #[test]
    fn test_unreadable_piece_is_skipped_with_reason() {
        struct FailingDataset;
        impl DatasetProvider for FailingDataset {
            fn piece_ids(&self) -> Vec<String> {
                vec!["broken".to_string()]
            }
            fn load_tensor(&self, id: &str) -> Result<TickTensor, DatasetError> {
                Err(DatasetError::Malformed {
                    id: id.to_string(),
                    reason: "not a score".to_string(),
                })
            }
        }

        let generator = FakeGenerator::new(WindowSpec::default());
        let renderer = FakeRenderer::new();
        let driver = GenerationDriver::new(
            &generator,
            &FailingDataset,
            &renderer,
            config(RunMode::AllQualifying, 1),
        )
        .unwrap();
        let report = driver.run().unwrap();

        match &report.outcomes[0].1 {
            PieceOutcome::SkippedUnreadable { reason } => assert!(reason.contains("not a score")),
            other => panic!("expected unreadable skip, got {other:?}"),
        }
    }

    #[test]
    fn test_window_disagreement_is_fatal_at_construction() {
        let dataset = FakeDataset { pieces: vec![] };
        let generator = FakeGenerator::new(WindowSpec::new(24, 5, 6, 5));
        let renderer = FakeRenderer::new();

        let err = GenerationDriver::new(
            &generator,
            &dataset,
            &renderer,
            config(RunMode::AllQualifying, 1),
        )
        .err()
        .expect("window mismatch must be rejected");
        assert_eq!(err.code(), "MODEL_002");
    }

    #[test]
    fn test_bad_generator_output_aborts_sample_not_run() {
        /// Emits one measure too few.
        struct ShortGenerator;
        impl SequenceGenerator for ShortGenerator {
            fn window(&self) -> WindowSpec {
                WindowSpec::default()
            }
            fn generate(
                &self,
                _past: &[MeasureBlock],
                _future: &[MeasureBlock],
                _mode: GenerationMode,
                num_target: usize,
                _rng: &mut dyn rand::RngCore,
            ) -> Result<GenerationOutput, ModelError> {
                Ok(GenerationOutput {
                    target: (0..num_target - 1)
                        .map(|_| MeasureBlock::new(vec![60; 24]))
                        .collect(),
                    attention: vec![],
                })
            }
        }

        let dataset = FakeDataset {
            pieces: vec![("tune".to_string(), vec![129; 384])],
        };
        let renderer = FakeRenderer::new();
        let driver = GenerationDriver::new(
            &ShortGenerator,
            &dataset,
            &renderer,
            config(RunMode::AllQualifying, 2),
        )
        .unwrap();
        let report = driver.run().unwrap();

        match &report.outcomes[0].1 {
            PieceOutcome::Generated {
                rendered,
                failed_samples,
            } => {
                assert!(rendered.is_empty());
                assert_eq!(failed_samples.len(), 2);
            }
            other => panic!("expected generated outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_derive_sample_seed_deterministic_and_distinct() {
        let seed1 = derive_sample_seed(0, "tune_16154", 0);
        let seed2 = derive_sample_seed(0, "tune_16154", 0);
        assert_eq!(seed1, seed2);

        assert_ne!(seed1, derive_sample_seed(0, "tune_16154", 1));
        assert_ne!(seed1, derive_sample_seed(0, "tune_16155", 0));
        assert_ne!(seed1, derive_sample_seed(1, "tune_16154", 0));
    }
}

