//! LSTM core and the state it carries between steps.

use super::init::{LayerKind, LayerRecord};
use super::store::ParamStore;
use crate::{MettaError, Result};
use candle_core::Tensor;
use candle_nn::rnn::{LSTMConfig, LSTMState, LSTM, RNN};

/// Hidden state of the core for a batch of N instances.
///
/// Opaque outside the policy; cloning it records a point a run can be
/// resumed from.
#[derive(Clone, Debug)]
pub struct RecurrentState(LSTMState);

impl RecurrentState {
    /// Number of instances this state covers
    pub fn batch_size(&self) -> usize {
        self.0.h().dims().first().copied().unwrap_or(0)
    }

    pub(crate) fn lstm(&self) -> &LSTMState {
        &self.0
    }
}

/// Single-layer LSTM advanced one step per call.
pub struct RecurrentCore {
    lstm: LSTM,
    hidden_size: usize,
}

impl RecurrentCore {
    pub fn new(
        store: &ParamStore,
        input_size: usize,
        hidden_size: usize,
        registry: &mut Vec<LayerRecord>,
    ) -> Result<Self> {
        if hidden_size == 0 {
            return Err(MettaError::InvalidConfig("rnn_size must be positive".into()));
        }
        let lstm = candle_nn::rnn::lstm(
            input_size,
            hidden_size,
            LSTMConfig::default(),
            store.builder("core"),
        )?;
        registry.push(LayerRecord::new("core", LayerKind::Recurrent));
        Ok(Self { lstm, hidden_size })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// All-zero state for `batch_size` instances
    pub fn initial_state(&self, batch_size: usize) -> Result<RecurrentState> {
        Ok(RecurrentState(self.lstm.zero_state(batch_size)?))
    }

    /// Advance one step. `input` is `[N, input_size]`; a missing state starts
    /// from zeros. Returns the core output `[N, hidden_size]` and the new state.
    ///
    /// The returned state is detached: carrying it into the next step does
    /// not keep earlier steps' op graphs alive.
    pub fn step(
        &self,
        input: &Tensor,
        state: Option<&RecurrentState>,
    ) -> Result<(Tensor, RecurrentState)> {
        let batch = input.dim(0)?;
        let next = match state {
            Some(state) => {
                if state.batch_size() != batch {
                    return Err(MettaError::ShapeMismatch {
                        expected: vec![batch, self.hidden_size],
                        actual: state.lstm().h().dims().to_vec(),
                    });
                }
                self.lstm.step(input, state.lstm())?
            }
            None => self.lstm.step(input, &self.lstm.zero_state(batch)?)?,
        };
        let output = next.h().clone();
        let detached = LSTMState::new(next.h().detach(), next.c().detach());
        Ok((output, RecurrentState(detached)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_step_threads_state() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let core = RecurrentCore::new(&store, 6, 4, &mut registry).unwrap();
        assert_eq!(registry[0].kind, LayerKind::Recurrent);

        let x = Tensor::ones((3, 6), DType::F32, &Device::Cpu).unwrap();
        let (out1, s1) = core.step(&x, None).unwrap();
        assert_eq!(out1.dims(), &[3, 4]);
        assert_eq!(s1.batch_size(), 3);

        let (out2, _) = core.step(&x, Some(&s1)).unwrap();
        let diff = (out2 - out1).unwrap().abs().unwrap().sum_all().unwrap();
        assert!(diff.to_scalar::<f32>().unwrap() > 0.0, "state must influence output");
    }

    #[test]
    fn test_state_does_not_retain_op_graph() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let core = RecurrentCore::new(&store, 3, 4, &mut registry).unwrap();
        let x = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();

        let (output, mut state) = core.step(&x, None).unwrap();
        assert!(output.track_op(), "output still flows back to the weights");
        for _ in 0..50 {
            state = core.step(&x, Some(&state)).unwrap().1;
            assert!(!state.lstm().h().track_op());
            assert!(!state.lstm().c().track_op());
        }
    }

    #[test]
    fn test_batch_mismatch_fails() {
        let store = ParamStore::new(Device::Cpu);
        let mut registry = Vec::new();
        let core = RecurrentCore::new(&store, 2, 4, &mut registry).unwrap();
        let state = core.initial_state(5).unwrap();
        let x = Tensor::ones((3, 2), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            core.step(&x, Some(&state)),
            Err(MettaError::ShapeMismatch { .. })
        ));
    }
}
