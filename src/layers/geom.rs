/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 几何层：取端点坐标、欧氏距离、距离的高斯展开
 */

use super::gather::GatherEmbeddingSelection;
use crate::errors::GnnError;
use crate::ragged::Ragged;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// `add_eps`时加到平方和上的小量
const DISTANCE_EPS: f32 = 1e-7;

/// 取索引元组各端点的坐标。默认取边的两个端点`(i, j)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePosition {
    pub selection_index: Vec<usize>,
}

impl Default for NodePosition {
    fn default() -> Self {
        Self {
            selection_index: vec![0, 1],
        }
    }
}

impl NodePosition {
    pub fn forward(
        &self,
        coordinates: &Ragged<f32>,
        index: &Ragged<usize>,
    ) -> Result<Vec<Ragged<f32>>, GnnError> {
        GatherEmbeddingSelection::new(self.selection_index.clone())?.forward(coordinates, index)
    }
}

/// 两组坐标逐行的欧氏距离：`[M, D] × [M, D] -> [M, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDistanceEuclidean {
    /// 开方前加上一个小量，使零距离处梯度有限
    pub add_eps: bool,
}

impl NodeDistanceEuclidean {
    pub fn forward(&self, a: &Ragged<f32>, b: &Ragged<f32>) -> Result<Ragged<f32>, GnnError> {
        a.ensure_same_partition(b, "NodeDistanceEuclidean：两组坐标")?;
        if a.feature_dim() != b.feature_dim() {
            return Err(GnnError::ShapeMismatch {
                context: "NodeDistanceEuclidean：坐标维度".to_string(),
                expected: vec![a.feature_dim()],
                got: vec![b.feature_dim()],
            });
        }
        let eps = if self.add_eps { DISTANCE_EPS } else { 0.0 };
        let mut distances = Array2::<f32>::zeros((a.total_len(), 1));
        Zip::from(distances.rows_mut())
            .and(a.values().rows())
            .and(b.values().rows())
            .for_each(|mut out, p, q| {
                let squared: f32 = p.iter().zip(q).map(|(x, y)| (x - y) * (x - y)).sum();
                out[0] = (squared + eps).sqrt();
            });
        a.with_values(distances)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussBasisConfig {
    pub bins: usize,
    pub distance: f32,
    pub offset: f32,
    pub sigma: f32,
}

impl Default for GaussBasisConfig {
    fn default() -> Self {
        Self {
            bins: 20,
            distance: 4.0,
            offset: 0.0,
            sigma: 0.4,
        }
    }
}

/// 距离的高斯展开：第k个分量为`exp(-(d - offset - k·distance/bins)² / (2σ²))`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "GaussBasisConfig", into = "GaussBasisConfig")]
pub struct GaussBasisLayer {
    config: GaussBasisConfig,
}

impl GaussBasisLayer {
    pub fn new(config: GaussBasisConfig) -> Result<Self, GnnError> {
        if config.bins == 0 {
            return Err(GnnError::InvalidConfig(
                "GaussBasisLayer 的`bins`须大于0".to_string(),
            ));
        }
        if config.sigma.is_nan() || config.sigma <= 0.0 {
            return Err(GnnError::InvalidConfig(format!(
                "GaussBasisLayer 的`sigma`须为正数，实际为{}",
                config.sigma
            )));
        }
        Ok(Self { config })
    }

    pub const fn config(&self) -> &GaussBasisConfig {
        &self.config
    }

    /// * `distances` - `[M, 1]`，输出`[M, bins]`
    pub fn forward(&self, distances: &Ragged<f32>) -> Result<Ragged<f32>, GnnError> {
        if distances.feature_dim() != 1 {
            return Err(GnnError::ShapeMismatch {
                context: "GaussBasisLayer：距离的宽度".to_string(),
                expected: vec![1],
                got: vec![distances.feature_dim()],
            });
        }
        let GaussBasisConfig {
            bins,
            distance,
            offset,
            sigma,
        } = self.config;
        let step = distance / bins as f32;
        let denominator = 2.0 * sigma * sigma;
        distances.map_values(|d| {
            Array2::from_shape_fn((d.nrows(), bins), |(row, k)| {
                let x = d[[row, 0]] - offset - k as f32 * step;
                (-(x * x) / denominator).exp()
            })
        })
    }
}

impl TryFrom<GaussBasisConfig> for GaussBasisLayer {
    type Error = GnnError;

    fn try_from(config: GaussBasisConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<GaussBasisLayer> for GaussBasisConfig {
    fn from(layer: GaussBasisLayer) -> Self {
        layer.config
    }
}
