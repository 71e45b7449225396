//! Observation encoder.
//!
//! Observations are `[N, C, H, W]` with the grid feature channels first and
//! the global feature channels after them. Grid channels go through a conv
//! stack; global channels are averaged over the grid. Both are concatenated
//! and projected to `output_size`.

use super::init::{LayerKind, LayerRecord};
use super::store::ParamStore;
use crate::config::EncoderConfig;
use crate::{MettaError, Result};
use candle_core::{Module, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Linear};

pub struct ObservationEncoder {
    convs: Vec<Conv2d>,
    projection: Linear,
    num_grid: usize,
    num_global: usize,
    obs_shape: [usize; 3],
    output_size: usize,
}

impl ObservationEncoder {
    pub fn new(
        store: &ParamStore,
        obs_shape: &[usize],
        grid_features: &[String],
        global_features: &[String],
        config: &EncoderConfig,
        registry: &mut Vec<LayerRecord>,
    ) -> Result<Self> {
        let num_grid = grid_features.len();
        let num_global = global_features.len();

        let &[channels, height, width] = obs_shape else {
            return Err(MettaError::InvalidConfig(format!(
                "observations must be [channels, height, width], got {obs_shape:?}"
            )));
        };
        if channels != num_grid + num_global {
            return Err(MettaError::ShapeMismatch {
                expected: vec![num_grid + num_global, height, width],
                actual: obs_shape.to_vec(),
            });
        }
        if channels == 0 || config.output_size == 0 {
            return Err(MettaError::InvalidConfig(
                "encoder needs at least one feature channel and a positive output size".into(),
            ));
        }

        let mut convs = Vec::new();
        let mut flat_grid = 0;
        if num_grid > 0 {
            let (kernel, stride) = (config.kernel_size, config.stride.max(1));
            let (mut c, mut h, mut w) = (num_grid, height, width);
            for (i, &out_channels) in config.conv_channels.iter().enumerate() {
                if kernel == 0 || h < kernel || w < kernel {
                    return Err(MettaError::InvalidConfig(format!(
                        "conv layer {i}: kernel {kernel} does not fit a {h}x{w} grid"
                    )));
                }
                let conv_config = Conv2dConfig {
                    stride,
                    ..Default::default()
                };
                let name = format!("encoder.conv{i}");
                convs.push(candle_nn::conv2d(
                    c,
                    out_channels,
                    kernel,
                    conv_config,
                    store.builder(&name),
                )?);
                registry.push(LayerRecord::new(name, LayerKind::Conv2d));
                c = out_channels;
                h = (h - kernel) / stride + 1;
                w = (w - kernel) / stride + 1;
            }
            flat_grid = c * h * w;
        }

        let projection = candle_nn::linear(
            flat_grid + num_global,
            config.output_size,
            store.builder("encoder.fc"),
        )?;
        registry.push(LayerRecord::new("encoder.fc", LayerKind::Linear));

        Ok(Self {
            convs,
            projection,
            num_grid,
            num_global,
            obs_shape: [channels, height, width],
            output_size: config.output_size,
        })
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// `[N, C, H, W] -> [N, output_size]`
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        let dims = obs.dims();
        if dims.len() != 4 || dims[1..] != self.obs_shape {
            let mut expected = vec![dims.first().copied().unwrap_or(0)];
            expected.extend_from_slice(&self.obs_shape);
            return Err(MettaError::ShapeMismatch {
                expected,
                actual: dims.to_vec(),
            });
        }

        let mut parts = Vec::with_capacity(2);
        if self.num_grid > 0 {
            let mut x = obs.narrow(1, 0, self.num_grid)?.contiguous()?;
            for conv in &self.convs {
                x = conv.forward(&x)?.relu()?;
            }
            parts.push(x.flatten_from(1)?);
        }
        if self.num_global > 0 {
            let globals = obs
                .narrow(1, self.num_grid, self.num_global)?
                .mean(3)?
                .mean(2)?;
            parts.push(globals);
        }

        let features = Tensor::cat(&parts, 1)?;
        Ok(self.projection.forward(&features)?.relu()?)
    }
}
