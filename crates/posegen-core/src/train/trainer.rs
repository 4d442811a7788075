//! Supervised fine-tuning loop.

use super::data::{collate, encode_pair, pad_id, EncodedExample, TrainingPair, IGNORE_INDEX};
use super::TrainingConfig;
use crate::error::{PosegenError, Result};
use crate::model::{Tokenizer, TrainableLm};
use candle_core::{backprop::GradStore, Device, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

/// Pick CUDA device 0 when available, otherwise the CPU.
pub fn select_device() -> Result<Device> {
    let device = Device::cuda_if_available(0)?;
    if device.is_cuda() {
        tracing::info!("using CUDA device 0");
    } else {
        tracing::warn!("GPU not available, using CPU");
    }
    Ok(device)
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Epochs completed.
    pub epochs: usize,
    /// Optimizer steps taken.
    pub steps: usize,
    /// Examples trained on.
    pub examples: usize,
    /// Examples dropped because truncation removed every target token.
    pub skipped: usize,
    /// Loss of every step.
    pub loss_history: Vec<f32>,
}

impl TrainingReport {
    /// Loss of the last step.
    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} epochs, {} steps over {} examples ({} skipped)",
            self.epochs, self.steps, self.examples, self.skipped
        )?;
        if let Some(loss) = self.final_loss() {
            write!(f, ", final loss {loss:.4}")?;
        }
        Ok(())
    }
}

/// Fine-tunes a [`TrainableLm`] on description → pose pairs.
pub struct Trainer<'a, M: TrainableLm> {
    model: &'a M,
    tokenizer: &'a Tokenizer,
    config: TrainingConfig,
}

impl<'a, M: TrainableLm> Trainer<'a, M> {
    /// Create a trainer; the config is validated here.
    pub fn new(model: &'a M, tokenizer: &'a Tokenizer, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            tokenizer,
            config,
        })
    }

    /// Training settings.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Encode pairs, dropping those left without target tokens.
    pub fn encode(&self, pairs: &[TrainingPair]) -> Result<(Vec<EncodedExample>, usize)> {
        let mut examples = Vec::with_capacity(pairs.len());
        let mut skipped = 0;
        for pair in pairs {
            let encoded =
                encode_pair(pair, self.tokenizer, &self.config.separator, self.config.max_length)?;
            if encoded.has_targets() {
                examples.push(encoded);
            } else {
                tracing::warn!(input = %pair.input, "prompt fills max_length, skipping example");
                skipped += 1;
            }
        }
        Ok((examples, skipped))
    }

    /// Encode and train.
    pub fn train(&self, pairs: &[TrainingPair]) -> Result<TrainingReport> {
        let (examples, skipped) = self.encode(pairs)?;
        let mut report = self.train_encoded(&examples)?;
        report.skipped = skipped;
        Ok(report)
    }

    /// Train on already encoded examples.
    pub fn train_encoded(&self, examples: &[EncodedExample]) -> Result<TrainingReport> {
        if examples.is_empty() {
            return Err(PosegenError::Training("no training examples".into()));
        }
        let config = &self.config;
        let pad = pad_id(self.tokenizer)?;
        let device = self.model.device().clone();

        let mut optimizer = AdamW::new(
            self.model.var_map().all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                weight_decay: config.weight_decay,
                ..Default::default()
            },
        )?;

        let steps_per_epoch = examples.len().div_ceil(config.batch_size);
        let total_steps = steps_per_epoch * config.epochs;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut loss_history = Vec::with_capacity(total_steps);

        tracing::info!(
            examples = examples.len(),
            epochs = config.epochs,
            total_steps,
            "starting training"
        );

        let mut step = 0;
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            for chunk in order.chunks(config.batch_size) {
                let batch: Vec<&EncodedExample> = chunk.iter().map(|&i| &examples[i]).collect();
                let (ids, labels, len) = collate(&batch, pad);
                let input = Tensor::from_vec(ids, (batch.len(), len), &device)?;

                let logits = self.model.forward(&input)?;
                let loss = masked_cross_entropy(&logits, &labels, &device)?;
                let loss_value = loss.to_scalar::<f32>()?;
                if !loss_value.is_finite() {
                    return Err(PosegenError::Training(format!(
                        "loss became {loss_value} at step {step}"
                    )));
                }

                let lr = config.learning_rate_at(step, total_steps);
                optimizer.set_learning_rate(lr);
                let mut grads = loss.backward()?;
                let grad_norm = clip_grad_norm(self.model, &mut grads, config.max_grad_norm)?;
                optimizer.step(&grads)?;

                loss_history.push(loss_value);
                step += 1;
                if step % config.logging_steps == 0 {
                    tracing::info!(
                        epoch = epoch + 1,
                        step,
                        loss = loss_value,
                        grad_norm,
                        learning_rate = lr,
                        "train step"
                    );
                }
            }
        }

        Ok(TrainingReport {
            epochs: config.epochs,
            steps: step,
            examples: examples.len(),
            skipped: 0,
            loss_history,
        })
    }
}

impl<M: TrainableLm> fmt::Debug for Trainer<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trainer")
            .field("tokenizer", self.tokenizer)
            .field("config", &self.config)
            .finish()
    }
}

/// Mean next-token cross entropy over positions whose label is not
/// [`IGNORE_INDEX`]. `logits` is `[batch, len, vocab]`, `labels` is the
/// flattened `[batch, len]`.
pub fn masked_cross_entropy(logits: &Tensor, labels: &[i64], device: &Device) -> Result<Tensor> {
    let (batch, len, vocab) = logits.dims3()?;
    if len < 2 {
        return Err(PosegenError::Training("sequences need at least two tokens".into()));
    }
    let steps = len - 1;

    // Position t predicts label t + 1.
    let mut targets = Vec::with_capacity(batch * steps);
    let mut mask = Vec::with_capacity(batch * steps);
    for row in 0..batch {
        for &label in &labels[row * len + 1..(row + 1) * len] {
            if label == IGNORE_INDEX {
                targets.push(0u32);
                mask.push(0f32);
            } else {
                targets.push(label as u32);
                mask.push(1f32);
            }
        }
    }
    let counted: f32 = mask.iter().sum();
    if counted == 0.0 {
        return Err(PosegenError::Training("batch has no target tokens".into()));
    }

    let logits = logits.narrow(1, 0, steps)?.reshape((batch * steps, vocab))?;
    let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
    let targets = Tensor::from_vec(targets, (batch * steps, 1), device)?;
    let picked = log_probs.gather(&targets, 1)?.squeeze(1)?;
    let mask = Tensor::from_vec(mask, batch * steps, device)?;
    let total = (picked * mask)?.sum_all()?;
    Ok(total.affine(-1.0 / counted as f64, 0.0)?)
}

/// Scale gradients so their global norm is at most `max_norm`; returns the
/// norm before clipping. `max_norm == 0` only measures.
fn clip_grad_norm<M: TrainableLm>(model: &M, grads: &mut GradStore, max_norm: f64) -> Result<f64> {
    let vars = model.var_map().all_vars();
    let mut squared = 0f64;
    for var in &vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            squared += f64::from(grad.sqr()?.sum_all()?.to_scalar::<f32>()?);
        }
    }
    let norm = squared.sqrt();

    if max_norm > 0.0 && norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        for var in &vars {
            if let Some(grad) = grads.get(var.as_tensor()) {
                let clipped = grad.affine(scale, 0.0)?;
                grads.insert(var.as_tensor(), clipped);
            }
        }
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{word_level, CausalLm, ReferenceLm, ReferenceLmConfig};

    const WORDS: &[&str] = &["[UNK]", "<eos>", "Description", ":", "wave", "bow", "{", "}", "JSON"];

    fn pairs() -> Vec<TrainingPair> {
        vec![
            TrainingPair {
                input: "Description: wave".into(),
                target: "{ wave }".into(),
            },
            TrainingPair {
                input: "Description: bow".into(),
                target: "{ bow }".into(),
            },
        ]
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 20,
            batch_size: 2,
            learning_rate: 5e-2,
            max_length: 32,
            hidden_size: 16,
            logging_steps: 10,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn loss_decreases() {
        let tokenizer = word_level(WORDS);
        let model = ReferenceLm::new(
            ReferenceLmConfig {
                vocab_size: tokenizer.vocab_size(),
                hidden_size: 16,
            },
            &Device::Cpu,
        )
        .unwrap();
        let trainer = Trainer::new(&model, &tokenizer, config()).unwrap();
        let report = trainer.train(&pairs()).unwrap();

        assert_eq!(report.steps, 20);
        assert_eq!(report.examples, 2);
        let first = report.loss_history[0];
        let last = report.final_loss().unwrap();
        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn encoding_is_deterministic() {
        let tokenizer = word_level(WORDS);
        let model = ReferenceLm::new(ReferenceLmConfig::for_vocab(tokenizer.vocab_size()), &Device::Cpu)
            .unwrap();
        let trainer = Trainer::new(&model, &tokenizer, config()).unwrap();
        let (a, _) = trainer.encode(&pairs()).unwrap();
        let (b, _) = trainer.encode(&pairs()).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(EncodedExample::has_targets));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let tokenizer = word_level(WORDS);
        let model = ReferenceLm::new(ReferenceLmConfig::for_vocab(tokenizer.vocab_size()), &Device::Cpu)
            .unwrap();
        let trainer = Trainer::new(&model, &tokenizer, config()).unwrap();
        assert!(matches!(trainer.train(&[]), Err(PosegenError::Training(_))));
    }

    #[test]
    fn overlong_prompts_are_skipped() {
        let tokenizer = word_level(WORDS);
        let model = ReferenceLm::new(ReferenceLmConfig::for_vocab(tokenizer.vocab_size()), &Device::Cpu)
            .unwrap();
        let config = TrainingConfig {
            max_length: 3,
            ..config()
        };
        let trainer = Trainer::new(&model, &tokenizer, config).unwrap();
        let (examples, skipped) = trainer.encode(&pairs()).unwrap();
        assert!(examples.is_empty());
        assert_eq!(skipped, 2);
        assert_eq!(model.vocab_size(), WORDS.len());
    }

    #[test]
    fn cross_entropy_ignores_masked_positions() {
        let device = Device::Cpu;
        // Uniform logits: every counted position costs ln(vocab).
        let logits = Tensor::zeros((1, 3, 4), candle_core::DType::F32, &device).unwrap();
        let labels = vec![IGNORE_INDEX, IGNORE_INDEX, 2];
        let loss = masked_cross_entropy(&logits, &labels, &device)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((loss - 4f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn clipping_bounds_gradient_norm() {
        let tokenizer = word_level(WORDS);
        let model = ReferenceLm::new(ReferenceLmConfig::for_vocab(tokenizer.vocab_size()), &Device::Cpu)
            .unwrap();
        let input = Tensor::new(&[[2u32, 3, 4, 6]], &Device::Cpu).unwrap();
        let logits = model.forward(&input).unwrap();
        let labels = vec![IGNORE_INDEX, 3, 4, 6];
        let loss = masked_cross_entropy(&logits, &labels, &Device::Cpu).unwrap();
        let mut grads = loss.backward().unwrap();

        let before = clip_grad_norm(&model, &mut grads, 1e-3).unwrap();
        assert!(before > 1e-3);
        let after = clip_grad_norm(&model, &mut grads, 0.0).unwrap();
        assert!(after <= 1e-3 + 1e-6, "norm after clipping {after}");
    }
}
