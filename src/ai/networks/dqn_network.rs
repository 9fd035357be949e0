use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::game::Observation;

/// DQN network architecture for an N×N Gomoku board.
///
/// ```text
/// Input:  [batch, 2, N, N]
/// Conv1:  2 -> 32 channels, 3x3 kernel, padding 1   =>  [batch, 32, N, N]
/// ReLU
/// Conv2:  32 -> 64 channels, 3x3 kernel, padding 1  =>  [batch, 64, N, N]
/// ReLU
/// Flatten: 64*N*N
/// FC1:    64*N*N -> hidden, ReLU
/// FC2:    hidden -> N*N  (Q-values, one per cell)
/// ```
#[derive(Module, Debug)]
pub struct DqnNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    relu: Relu,
    board_size: usize,
}

#[derive(Config, Debug)]
pub struct DqnNetworkConfig {
    pub board_size: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
}

impl DqnNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DqnNetwork<B> {
        let n = self.board_size;
        DqnNetwork {
            conv1: Conv2dConfig::new([Observation::PLANES, 32], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            fc1: LinearConfig::new(64 * n * n, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, n * n).init(device),
            relu: Relu::new(),
            board_size: n,
        }
    }
}

impl<B: Backend> DqnNetwork<B> {
    /// Forward pass: input [batch, 2, N, N] -> output [batch, N*N] Q-values.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let batch_size = input.dims()[0];
        let n = self.board_size;

        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let x = x.reshape([batch_size, 64 * n * n]);
        let x = self.relu.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }
}
