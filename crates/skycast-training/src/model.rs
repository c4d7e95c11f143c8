//! The fixed temperature regression network.

use skycast_layers::{ActivationType, Regularizer, Sequential, SequentialConfig};

use crate::error::TrainingResult;

/// Widths of the three hidden dense layers.
pub const HIDDEN_UNITS: [usize; 3] = [128, 64, 32];

/// L2 coefficient on every hidden kernel.
pub const L2_PENALTY: f32 = 0.001;

/// Weight of the batch statistics in the running-average update.
pub const BATCH_NORM_MOMENTUM: f32 = 0.01;

/// Batch-norm variance epsilon.
pub const BATCH_NORM_EPSILON: f32 = 1e-3;

/// Dropout after the first and second normalized blocks.
pub const DROPOUT_RATES: [f32; 2] = [0.3, 0.2];

/// Layer stack for `input_dim` features:
/// dense(128) → batch norm → dropout(0.3) → dense(64) → batch norm →
/// dropout(0.2) → dense(32) → dense(1).
pub fn network_config(input_dim: usize) -> SequentialConfig {
    let l2 = Regularizer::L2(L2_PENALTY);
    SequentialConfig::new(input_dim)
        .add_dense(HIDDEN_UNITS[0], ActivationType::ReLU, l2)
        .add_batch_norm(BATCH_NORM_MOMENTUM, BATCH_NORM_EPSILON)
        .add_dropout(DROPOUT_RATES[0])
        .add_dense(HIDDEN_UNITS[1], ActivationType::ReLU, l2)
        .add_batch_norm(BATCH_NORM_MOMENTUM, BATCH_NORM_EPSILON)
        .add_dropout(DROPOUT_RATES[1])
        .add_dense(HIDDEN_UNITS[2], ActivationType::ReLU, l2)
        .add_dense(1, ActivationType::None, Regularizer::None)
}

/// Builds a freshly initialized network.
///
/// # Errors
///
/// Fails if `input_dim` is zero.
pub fn build_model(input_dim: usize, seed: u64) -> TrainingResult<Sequential> {
    Ok(network_config(input_dim).build(seed)?)
}
