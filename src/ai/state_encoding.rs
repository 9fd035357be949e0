use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::Observation;

/// Encode observations as a batched tensor of shape [batch, 2, N, N].
///
/// All observations must share one board size.
pub fn encode_states_batch<B: Backend>(states: &[Observation], device: &B::Device) -> Tensor<B, 4> {
    let batch_size = states.len();
    let n = states.first().map_or(0, Observation::board_size);
    let mut flat = Vec::with_capacity(batch_size * Observation::PLANES * n * n);
    for state in states {
        flat.extend_from_slice(state.as_slice());
    }
    Tensor::<B, 1>::from_data(TensorData::from(flat.as_slice()), device)
        .reshape([batch_size, Observation::PLANES, n, n])
}

/// One-hot rows `[batch, action_count]` selecting each taken action.
pub fn encode_action_mask<B: Backend>(
    actions: &[usize],
    action_count: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut mask = vec![0.0f32; actions.len() * action_count];
    for (i, &a) in actions.iter().enumerate() {
        mask[i * action_count + a] = 1.0;
    }
    Tensor::<B, 1>::from_data(TensorData::from(mask.as_slice()), device)
        .reshape([actions.len(), action_count])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::game::{Board, Cell, Coord};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_encode_batch_shape() {
        let board = Board::new(9);
        let obs = Observation::from_board(&board);
        let device = Default::default();
        let batch = encode_states_batch::<TestBackend>(&[obs.clone(), obs], &device);
        assert_eq!(batch.shape().dims, [2, 2, 9, 9]);
    }

    #[test]
    fn test_encode_keeps_plane_layout() {
        let mut board = Board::new(5);
        board.place(Coord::new(1, 2), Cell::PlayerTwo).unwrap();
        let obs = Observation::from_board(&board);
        let device = Default::default();
        let data: Vec<f32> = encode_states_batch::<TestBackend>(&[obs], &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(data[25 + 7], 1.0);
        assert_eq!(data.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_action_mask_is_one_hot() {
        let device = Default::default();
        let data: Vec<f32> = encode_action_mask::<TestBackend>(&[2, 0], 3, &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(data, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
