use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;
use burn::tensor::backend::AutodiffBackend;

use crate::ai::state_encoding::{encode_action_mask, encode_states_batch};
use crate::error::CheckpointError;
use crate::game::Observation;

use super::dqn_network::{DqnNetwork, DqnNetworkConfig};
use super::{QLearner, QNetwork};

/// CPU training backend used by the binaries and tests.
pub type DefaultBackend = Autodiff<NdArray<f32>>;

/// Inference-only Q-network, the frozen target of a [`BurnLearner`].
#[derive(Debug, Clone)]
pub struct BurnQNetwork<B: Backend> {
    model: DqnNetwork<B>,
    device: B::Device,
}

impl<B: Backend> QNetwork for BurnQNetwork<B> {
    fn action_count(&self) -> usize {
        let n = self.model.board_size();
        n * n
    }

    fn predict(&self, states: &[Observation]) -> Vec<f32> {
        forward_to_vec(&self.model, states, &self.device)
    }
}

/// Policy Q-network with its Adam optimizer.
pub struct BurnLearner<B: AutodiffBackend> {
    model: DqnNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, DqnNetwork<B>, B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> BurnLearner<B> {
    pub fn new(config: &DqnNetworkConfig, learning_rate: f64, device: B::Device) -> Self {
        BurnLearner {
            model: config.init(&device),
            optimizer: AdamConfig::new().init(),
            learning_rate,
            device,
        }
    }
}

impl<B: AutodiffBackend> QNetwork for BurnLearner<B> {
    fn action_count(&self) -> usize {
        let n = self.model.board_size();
        n * n
    }

    fn predict(&self, states: &[Observation]) -> Vec<f32> {
        // Inference on the inner backend avoids recording an autodiff graph.
        forward_to_vec(&self.model.valid(), states, &self.device)
    }
}

impl<B: AutodiffBackend> QLearner for BurnLearner<B> {
    type Target = BurnQNetwork<B::InnerBackend>;

    fn snapshot(&self) -> Self::Target {
        BurnQNetwork {
            model: self.model.valid(),
            device: self.device.clone(),
        }
    }

    fn fit(&mut self, states: &[Observation], actions: &[usize], targets: &[f32]) -> f32 {
        let batch_size = states.len();
        let action_count = self.action_count();

        // Q(s, a) = sum(q_all * mask, dim=1) -> [B, 1]
        let q_all = self
            .model
            .forward(encode_states_batch::<B>(states, &self.device));
        let action_mask = encode_action_mask::<B>(actions, action_count, &self.device);
        let q_taken = (q_all * action_mask).sum_dim(1);

        let targets = Tensor::<B, 1>::from_data(TensorData::from(targets), &self.device)
            .reshape([batch_size, 1]);

        // MSE loss
        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();

        let loss_val: f32 = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        loss_val
    }

    fn save(&self, dir: &Path, name: &str) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.model
            .clone()
            .valid()
            .save_file(dir.join(name), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))
    }

    fn load(&mut self, dir: &Path, name: &str) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.model = self
            .model
            .clone()
            .load_file(dir.join(name), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        Ok(())
    }
}

fn forward_to_vec<B: Backend>(
    model: &DqnNetwork<B>,
    states: &[Observation],
    device: &B::Device,
) -> Vec<f32> {
    if states.is_empty() {
        return Vec::new();
    }
    model
        .forward(encode_states_batch::<B>(states, device))
        .into_data()
        .to_vec()
        .expect("f32 tensor data extraction")
}
