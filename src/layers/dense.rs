/*
 * @Author       : 老董
 * @Date         : 2026-02-13
 * @Description  : Dense（全连接）变换与激活函数
 *
 * 只做前向：`output = act(x @ W + b)`，权重形状`[in_features, out_features]`。
 * 可直接作用于不规则张量的扁平数据（逐行变换，不改变行划分）。
 */

use crate::errors::GnnError;
use crate::ragged::Ragged;
use ndarray::{Array1, Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};

// ==================== Activation ====================

/// 逐元素激活函数
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softplus,
    /// `softplus(x) - ln2`，SchNet 使用，`x = 0`时输出为0
    ShiftedSoftplus,
    LeakyRelu { alpha: f32 },
}

fn softplus(x: f32) -> f32 {
    // 数值稳定写法：max(x, 0) + ln(1 + e^{-|x|})
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

impl Activation {
    pub fn apply(&self, x: f32) -> f32 {
        match *self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Softplus => softplus(x),
            Self::ShiftedSoftplus => softplus(x) - std::f32::consts::LN_2,
            Self::LeakyRelu { alpha } => {
                if x >= 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
        }
    }

    pub fn apply_inplace(&self, values: &mut Array2<f32>) {
        if *self != Self::Linear {
            values.mapv_inplace(|x| self.apply(x));
        }
    }
}

// ==================== Init ====================

/// 参数初始化策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Init {
    /// 常数初始化
    Constant { value: f32 },
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// 正态分布
    Normal { mean: f32, std: f32 },
    /// Kaiming/He 初始化（适用于 `ReLU`）
    Kaiming,
    /// Xavier/Glorot 初始化（适用于 Sigmoid/Tanh）
    Xavier,
}

impl Init {
    /// 生成初始化后的矩阵（使用线程 RNG）
    pub fn generate(&self, shape: (usize, usize)) -> Result<Array2<f32>, GnnError> {
        self.generate_with_rng(shape, &mut rand::thread_rng())
    }

    /// 生成初始化后的矩阵（使用指定的 RNG）。正态分布的`std`须非负
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<f32>, GnnError> {
        let (fan_in, fan_out) = shape;
        Ok(match *self {
            Self::Constant { value } => Array2::from_elem(shape, value),
            Self::Zeros => Array2::zeros(shape),
            Self::Ones => Array2::ones(shape),
            Self::Normal { mean, std } => {
                let dist = Normal::new(mean, std).map_err(|e| {
                    GnnError::InvalidConfig(format!(
                        "Init::Normal 参数无效（mean={mean}, std={std}）：{e}"
                    ))
                })?;
                Array2::from_shape_simple_fn(shape, || dist.sample(&mut *rng))
            }
            Self::Kaiming => scaled_normal(kaiming_std(fan_in), shape, rng),
            Self::Xavier => {
                let std = (2.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                scaled_normal(std, shape, rng)
            }
        })
    }
}

fn kaiming_std(fan_in: usize) -> f32 {
    (2.0 / fan_in.max(1) as f32).sqrt()
}

/// 均值为0、标准差为`std`的正态采样
fn scaled_normal<R: Rng + ?Sized>(std: f32, shape: (usize, usize), rng: &mut R) -> Array2<f32> {
    Array2::from_shape_simple_fn(shape, || {
        let z: f32 = StandardNormal.sample(&mut *rng);
        std * z
    })
}

// ==================== Dense ====================

/// Dense（全连接）层
///
/// # 输入/输出形状
/// - 输入：[rows, in_features]
/// - 输出：[rows, out_features]
///
/// # 使用示例
/// ```ignore
/// let fc = Dense::new_seeded(16, 32, Activation::Relu, true, 42);
/// let h = fc.forward_ragged(batch.nodes())?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DenseConfig", into = "DenseConfig")]
pub struct Dense {
    /// 权重 [in_features, out_features]
    kernel: Array2<f32>,
    /// 偏置 [out_features]（可选）
    bias: Option<Array1<f32>>,
    activation: Activation,
}

/// Dense 的序列化形式，反序列化时经`Dense::from_weights`校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    pub kernel: Array2<f32>,
    #[serde(default)]
    pub bias: Option<Array1<f32>>,
    #[serde(default)]
    pub activation: Activation,
}

impl Dense {
    /// 权重用 Kaiming 初始化，偏置为零
    pub fn new(in_features: usize, out_features: usize, activation: Activation, use_bias: bool) -> Self {
        let shape = (in_features, out_features);
        let kernel = scaled_normal(kaiming_std(in_features), shape, &mut rand::thread_rng());
        Self::assemble(kernel, use_bias, activation)
    }

    /// 带种子，确保可重复性
    pub fn new_seeded(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        use_bias: bool,
        seed: u64,
    ) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let kernel = scaled_normal(kaiming_std(in_features), (in_features, out_features), &mut rng);
        Self::assemble(kernel, use_bias, activation)
    }

    fn assemble(kernel: Array2<f32>, use_bias: bool, activation: Activation) -> Self {
        let bias = use_bias.then(|| Array1::zeros(kernel.ncols()));
        Self {
            kernel,
            bias,
            activation,
        }
    }

    /// 由给定权重构造（如加载已训练的参数）
    pub fn from_weights(
        kernel: Array2<f32>,
        bias: Option<Array1<f32>>,
        activation: Activation,
    ) -> Result<Self, GnnError> {
        if let Some(b) = &bias {
            if b.len() != kernel.ncols() {
                return Err(GnnError::ShapeMismatch {
                    context: "Dense：偏置长度须等于输出维度".to_string(),
                    expected: vec![kernel.ncols()],
                    got: vec![b.len()],
                });
            }
        }
        Ok(Self {
            kernel,
            bias,
            activation,
        })
    }

    pub fn in_features(&self) -> usize {
        self.kernel.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.kernel.ncols()
    }

    pub const fn kernel(&self) -> &Array2<f32> {
        &self.kernel
    }

    pub const fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }

    pub const fn activation(&self) -> Activation {
        self.activation
    }

    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, GnnError> {
        if x.ncols() != self.in_features() {
            return Err(GnnError::ShapeMismatch {
                context: "Dense：输入特征维度".to_string(),
                expected: vec![self.in_features()],
                got: vec![x.ncols()],
            });
        }
        let mut out = x.dot(&self.kernel);
        if let Some(bias) = &self.bias {
            out += bias;
        }
        self.activation.apply_inplace(&mut out);
        Ok(out)
    }

    /// 作用于不规则张量，沿用其行划分
    pub fn forward_ragged(&self, x: &Ragged<f32>) -> Result<Ragged<f32>, GnnError> {
        x.with_values(self.forward(x.values().view())?)
    }
}

impl TryFrom<DenseConfig> for Dense {
    type Error = GnnError;

    fn try_from(config: DenseConfig) -> Result<Self, Self::Error> {
        Self::from_weights(config.kernel, config.bias, config.activation)
    }
}

impl From<Dense> for DenseConfig {
    fn from(layer: Dense) -> Self {
        Self {
            kernel: layer.kernel,
            bias: layer.bias,
            activation: layer.activation,
        }
    }
}

// ==================== Mlp ====================

/// 若干 Dense 层的堆叠。最后一层的激活函数可单独指定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MlpConfig", into = "MlpConfig")]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// * `units` - 各层的输出维度
    /// * `seed` - 给定时第`l`层使用种子`seed + l`
    pub fn new(
        in_features: usize,
        units: &[usize],
        activation: Activation,
        last_activation: Activation,
        seed: Option<u64>,
    ) -> Result<Self, GnnError> {
        if units.is_empty() {
            return Err(GnnError::InvalidConfig(
                "Mlp 至少需要一层，`units`不能为空".to_string(),
            ));
        }
        let mut layers = Vec::with_capacity(units.len());
        let mut fan_in = in_features;
        for (l, &out) in units.iter().enumerate() {
            let act = if l + 1 == units.len() {
                last_activation
            } else {
                activation
            };
            let layer = match seed {
                Some(seed) => Dense::new_seeded(fan_in, out, act, true, seed + l as u64),
                None => Dense::new(fan_in, out, act, true),
            };
            layers.push(layer);
            fan_in = out;
        }
        Ok(Self { layers })
    }

    /// 由现成的 Dense 层组装，相邻层维度须衔接
    pub fn from_layers(layers: Vec<Dense>) -> Result<Self, GnnError> {
        for pair in layers.windows(2) {
            if pair[0].out_features() != pair[1].in_features() {
                return Err(GnnError::ShapeMismatch {
                    context: "Mlp：相邻层的维度".to_string(),
                    expected: vec![pair[0].out_features()],
                    got: vec![pair[1].in_features()],
                });
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn out_features(&self) -> usize {
        self.layers.last().map_or(0, Dense::out_features)
    }

    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>, GnnError> {
        let mut h = x.to_owned();
        for layer in &self.layers {
            h = layer.forward(h.view())?;
        }
        Ok(h)
    }

    pub fn forward_ragged(&self, x: &Ragged<f32>) -> Result<Ragged<f32>, GnnError> {
        x.with_values(self.forward(x.values().view())?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpConfig {
    pub layers: Vec<Dense>,
}

impl TryFrom<MlpConfig> for Mlp {
    type Error = GnnError;

    fn try_from(config: MlpConfig) -> Result<Self, Self::Error> {
        Self::from_layers(config.layers)
    }
}

impl From<Mlp> for MlpConfig {
    fn from(mlp: Mlp) -> Self {
        Self { layers: mlp.layers }
    }
}
