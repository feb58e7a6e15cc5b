//! The context-conditioned sampler.
//!
//! A deterministic, seeded implementation of the `SequenceGenerator`
//! contract. The sampler blends a pretrained event-transition prior with the
//! transitions observed in the past and future context, then samples the
//! target region tick by tick. In free-running mode each generated measure
//! is encoded and fed forward as context for the next step; in
//! teacher-forced mode the ground-truth measure is fed forward instead.

use std::path::Path;

use rand::{Rng, RngCore};

use cadenza_core::{
    GenerationMode, GenerationOutput, MeasureBlock, MeasureCodec, ModelError, SequenceGenerator,
    ShapeError, WindowSpec, HOLD, REST, VOCAB_SIZE,
};

use crate::params::SamplerParams;

/// Measure-level sequence generator backed by a pretrained transition prior.
///
/// Constructible only via [`LatentSampler::load`] or
/// [`LatentSampler::from_params`].
#[derive(Debug)]
pub struct LatentSampler<C: MeasureCodec> {
    window: WindowSpec,
    codec: C,
    prior: Vec<Vec<f32>>,
    context_weight: f32,
}

impl<C: MeasureCodec> LatentSampler<C> {
    /// Loads and validates sampler parameters from a JSON file.
    pub fn load(path: &Path, window: WindowSpec, codec: C) -> Result<Self, ModelError> {
        let params = SamplerParams::load(path)?;
        Self::from_params(params, window, codec)
    }

    /// Validates already-deserialized parameters.
    pub fn from_params(
        params: SamplerParams,
        window: WindowSpec,
        codec: C,
    ) -> Result<Self, ModelError> {
        if params.transition_prior.len() != VOCAB_SIZE {
            return Err(ModelError::ConfigMismatch(format!(
                "transition prior has {} rows, vocabulary needs {}",
                params.transition_prior.len(),
                VOCAB_SIZE
            )));
        }
        if let Some(row) = params
            .transition_prior
            .iter()
            .find(|row| row.len() != VOCAB_SIZE)
        {
            return Err(ModelError::ConfigMismatch(format!(
                "transition prior row of width {}, vocabulary needs {}",
                row.len(),
                VOCAB_SIZE
            )));
        }
        if !params.context_weight.is_finite() || params.context_weight < 0.0 {
            return Err(ModelError::ConfigMismatch(format!(
                "context weight {} is not a finite non-negative value",
                params.context_weight
            )));
        }

        Ok(Self {
            window,
            codec,
            prior: params.transition_prior,
            context_weight: params.context_weight,
        })
    }

    fn check_context(
        &self,
        past: &[MeasureBlock],
        future: &[MeasureBlock],
    ) -> Result<(), ModelError> {
        if past.len() != self.window.num_past || future.len() != self.window.num_future {
            return Err(ModelError::ConfigMismatch(format!(
                "context of {} past / {} future measures, configured for {} / {}",
                past.len(),
                future.len(),
                self.window.num_past,
                self.window.num_future
            )));
        }
        for block in past.iter().chain(future) {
            if block.width() != self.window.ticks_per_measure {
                return Err(ShapeError::BlockWidthMismatch {
                    expected: self.window.ticks_per_measure,
                    actual: block.width(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Samples one measure tick by tick from the blended transition table.
    fn sample_measure(
        &self,
        table: &TransitionTable,
        prev: &mut u16,
        rng: &mut dyn RngCore,
    ) -> MeasureBlock {
        let mut codes = Vec::with_capacity(self.window.ticks_per_measure);
        for _ in 0..self.window.ticks_per_measure {
            let next = table.sample_next(*prev, rng);
            codes.push(next);
            *prev = next;
        }
        MeasureBlock::new(codes)
    }

    /// One attention row: softmax over negative distances between the fed
    /// measure's latent and each context latent (past first, then future).
    fn attention_row(&self, fed: &[f32], context_latents: &[Vec<f32>]) -> Vec<f32> {
        let scores: Vec<f32> = context_latents
            .iter()
            .map(|latent| -squared_distance(fed, latent))
            .collect();
        let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        if total > 0.0 {
            exps.iter().map(|e| e / total).collect()
        } else {
            vec![1.0 / context_latents.len().max(1) as f32; context_latents.len()]
        }
    }
}

impl<C: MeasureCodec> SequenceGenerator for LatentSampler<C> {
    fn window(&self) -> WindowSpec {
        self.window
    }

    fn generate(
        &self,
        past: &[MeasureBlock],
        future: &[MeasureBlock],
        mode: GenerationMode,
        num_target: usize,
        rng: &mut dyn RngCore,
    ) -> Result<GenerationOutput, ModelError> {
        self.check_context(past, future)?;

        if let GenerationMode::TeacherForced { ground_truth } = &mode {
            if ground_truth.len() != num_target {
                return Err(ModelError::ConfigMismatch(format!(
                    "teacher forcing with {} ground-truth measures for {} targets",
                    ground_truth.len(),
                    num_target
                )));
            }
            for block in ground_truth {
                if block.width() != self.window.ticks_per_measure {
                    return Err(ShapeError::BlockWidthMismatch {
                        expected: self.window.ticks_per_measure,
                        actual: block.width(),
                    }
                    .into());
                }
            }
        }

        let mut table = TransitionTable::new(&self.prior, self.context_weight);
        for block in past.iter().chain(future) {
            table.observe(block.codes());
        }

        let context_latents: Vec<Vec<f32>> = past
            .iter()
            .chain(future)
            .map(|block| self.codec.encode(block).map(|latent| latent.0))
            .collect::<Result<_, _>>()?;

        // Recurrence state: the last event before the target region.
        let mut prev = past
            .last()
            .and_then(|block| block.codes().last().copied())
            .unwrap_or(REST);

        let mut target = Vec::with_capacity(num_target);
        let mut attention = Vec::with_capacity(num_target);

        for step in 0..num_target {
            let generated = self.sample_measure(&table, &mut prev, rng);

            // The measure fed forward: the model's own output when free
            // running, the ground truth when teacher forced.
            let fed = match &mode {
                GenerationMode::FreeRunning => generated.clone(),
                GenerationMode::TeacherForced { ground_truth } => ground_truth[step].clone(),
            };

            let fed_latent = self.codec.encode(&fed)?;
            attention.push(self.attention_row(&fed_latent.0, &context_latents));

            table.observe(fed.codes());
            prev = fed.codes().last().copied().unwrap_or(REST);

            target.push(generated);
        }

        Ok(GenerationOutput { target, attention })
    }
}

/// Prior counts blended with weighted context observations.
struct TransitionTable {
    rows: Vec<Vec<f32>>,
    context_weight: f32,
}

impl TransitionTable {
    fn new(prior: &[Vec<f32>], context_weight: f32) -> Self {
        Self {
            rows: prior.to_vec(),
            context_weight,
        }
    }

    /// Adds the bigrams of one measure to the table.
    fn observe(&mut self, codes: &[u16]) {
        for pair in codes.windows(2) {
            let (from, to) = (pair[0] as usize, pair[1] as usize);
            if from < VOCAB_SIZE && to < VOCAB_SIZE {
                self.rows[from][to] += self.context_weight;
            }
        }
    }

    /// Samples the next event code given the previous one.
    ///
    /// A hold directly after a rest is musically meaningless, so its mass is
    /// excluded when the previous event is a rest.
    fn sample_next(&self, prev: u16, rng: &mut dyn RngCore) -> u16 {
        let row = &self.rows[(prev as usize).min(VOCAB_SIZE - 1)];
        let forbid_hold = prev == REST;

        let total: f32 = row
            .iter()
            .enumerate()
            .filter(|(code, _)| !(forbid_hold && *code == HOLD as usize))
            .map(|(_, w)| w.max(0.0))
            .sum();
        if total <= 0.0 {
            return REST;
        }

        let mut roll = rng.gen_range(0.0..total);
        for (code, weight) in row.iter().enumerate() {
            if forbid_hold && code == HOLD as usize {
                continue;
            }
            let weight = weight.max(0.0);
            if roll < weight {
                return code as u16;
            }
            roll -= weight;
        }
        REST
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EmbeddingCodec;
    use crate::config::ModelConfig;
    use crate::params::CodecParams;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn test_sampler(window: WindowSpec) -> LatentSampler<EmbeddingCodec> {
        let config = ModelConfig {
            latent_space_dim: 16,
            ..ModelConfig::default()
        };
        let codec = EmbeddingCodec::from_params(
            CodecParams::synthetic(16, window.ticks_per_measure),
            &config,
        )
        .unwrap();
        LatentSampler::from_params(SamplerParams::default_prior(), window, codec).unwrap()
    }

    fn context(window: &WindowSpec) -> (Vec<MeasureBlock>, Vec<MeasureBlock>) {
        let note_measure = |pitch: u16| {
            let mut codes = vec![HOLD; window.ticks_per_measure];
            codes[0] = pitch;
            MeasureBlock::new(codes)
        };
        let past: Vec<_> = (0..window.num_past)
            .map(|i| note_measure(60 + i as u16))
            .collect();
        let future: Vec<_> = (0..window.num_future)
            .map(|i| note_measure(67 - i as u16))
            .collect();
        (past, future)
    }

    #[test]
    fn test_output_shape() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);
        let mut rng = Pcg32::seed_from_u64(7);

        let out = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng)
            .unwrap();
        assert_eq!(out.target.len(), 4);
        assert!(out.target.iter().all(|m| m.width() == 24));
        assert_eq!(out.attention.len(), 4);
        assert!(out.attention.iter().all(|row| row.len() == 12));
    }

    #[test]
    fn test_same_seed_same_output() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng_a = Pcg32::seed_from_u64(42);
        let mut rng_b = Pcg32::seed_from_u64(42);
        let a = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng_a)
            .unwrap();
        let b = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng_b)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng_a = Pcg32::seed_from_u64(42);
        let mut rng_b = Pcg32::seed_from_u64(43);
        let a = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng_a)
            .unwrap();
        let b = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng_b)
            .unwrap();
        assert_ne!(a.target, b.target);
    }

    #[test]
    fn test_wrong_context_length_is_config_mismatch() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng = Pcg32::seed_from_u64(0);
        let err = sampler
            .generate(
                &past[..5],
                &future,
                GenerationMode::FreeRunning,
                4,
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_wrong_block_width_is_shape_error() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (mut past, future) = context(&window);
        past[0] = MeasureBlock::new(vec![60; 23]);

        let mut rng = Pcg32::seed_from_u64(0);
        let err = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng)
            .unwrap_err();
        assert_eq!(err.code(), "SHAPE_003");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_teacher_forcing_requires_matching_ground_truth() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng = Pcg32::seed_from_u64(0);
        let err = sampler
            .generate(
                &past,
                &future,
                GenerationMode::TeacherForced {
                    ground_truth: vec![MeasureBlock::new(vec![60; 24]); 3],
                },
                4,
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
    }

    #[test]
    fn test_teacher_forcing_changes_recurrence() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);
        let ground_truth: Vec<MeasureBlock> = (0..4)
            .map(|i| {
                let mut codes = vec![HOLD; 24];
                codes[0] = 40 + i as u16;
                MeasureBlock::new(codes)
            })
            .collect();

        let mut rng_a = Pcg32::seed_from_u64(9);
        let mut rng_b = Pcg32::seed_from_u64(9);
        let free = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng_a)
            .unwrap();
        let forced = sampler
            .generate(
                &past,
                &future,
                GenerationMode::TeacherForced { ground_truth },
                4,
                &mut rng_b,
            )
            .unwrap();

        // The first measure is sampled from identical state in both modes,
        // later measures see different fed-forward context.
        assert_eq!(free.target[0], forced.target[0]);
        assert_ne!(free.target[1..], forced.target[1..]);
    }

    #[test]
    fn test_no_hold_after_rest() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng = Pcg32::seed_from_u64(1234);
        let out = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng)
            .unwrap();

        let mut prev = past.last().unwrap().codes()[23];
        for measure in &out.target {
            for &code in measure.codes() {
                if prev == REST {
                    assert_ne!(code, HOLD, "hold sampled directly after rest");
                }
                prev = code;
            }
        }
    }

    #[test]
    fn test_attention_rows_are_distributions() {
        let window = WindowSpec::default();
        let sampler = test_sampler(window);
        let (past, future) = context(&window);

        let mut rng = Pcg32::seed_from_u64(5);
        let out = sampler
            .generate(&past, &future, GenerationMode::FreeRunning, 4, &mut rng)
            .unwrap();
        for row in &out.attention {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-4);
            assert!(row.iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn test_malformed_prior_rejected() {
        let window = WindowSpec::default();
        let config = ModelConfig {
            latent_space_dim: 16,
            ..ModelConfig::default()
        };
        let codec =
            EmbeddingCodec::from_params(CodecParams::synthetic(16, 24), &config).unwrap();

        let mut params = SamplerParams::default_prior();
        params.transition_prior.pop();
        let err = LatentSampler::from_params(params, window, codec).unwrap_err();
        assert_eq!(err.code(), "MODEL_002");
    }
}
