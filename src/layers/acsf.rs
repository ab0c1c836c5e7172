/*
 * @Author       : 老董
 * @Date         : 2026-02-16
 * @Description  : 原子中心对称函数（ACSF，Behler 2011）：径向 G2 与角向 G4
 *
 * 两者都是"先逐边（逐角）计算，再按(中心原子, 关系)聚合"：
 * - G2 的关系是邻居原子j的元素；
 * - G4 的关系是邻居对(j, k)的元素对。
 * 聚合后展开为`[N, 关系数 * 参数组数]`。
 */

use super::gather::GatherEmbeddingSelection;
use super::geom::{NodeDistanceEuclidean, NodePosition};
use super::pooling::{RelationalPoolingConfig, RelationalPoolingLocalEdges, UnmappedPolicy};
use crate::errors::GnnError;
use crate::ops::Reduction;
use crate::ragged::Ragged;
use crate::relation::{ElementMapping, ElementPairMapping, UNMAPPED};
use ndarray::{Array2, Array3, Array4, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// 余弦截断函数`f_c(r) = 0.5 (cos(π · clip(r, -R_c, R_c) / R_c) + 1)`
fn cutoff(r: f32, rc: f32) -> f32 {
    let clipped = r.clamp(-rc, rc);
    0.5 * ((clipped * std::f32::consts::PI / rc).cos() + 1.0)
}

// ==================== 参数表 ====================

/// 对称函数的参数表，最后一维是一组参数（G2 为`[η, R_s, R_c]`，G4 为`[η, ζ, λ, R_c]`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcsfParams {
    /// `[关系数, m, P]`：所有中心元素共用
    Shared(Array3<f32>),
    /// `[元素数, 关系数, m, P]`：按中心原子的元素区分
    PerCentre(Array4<f32>),
}

impl AcsfParams {
    pub fn num_relations(&self) -> usize {
        match self {
            Self::Shared(p) => p.shape()[0],
            Self::PerCentre(p) => p.shape()[1],
        }
    }

    /// 每个关系下的参数组数m
    pub fn num_sets(&self) -> usize {
        match self {
            Self::Shared(p) => p.shape()[1],
            Self::PerCentre(p) => p.shape()[2],
        }
    }

    pub fn param_width(&self) -> usize {
        match self {
            Self::Shared(p) => p.shape()[2],
            Self::PerCentre(p) => p.shape()[3],
        }
    }

    pub const fn is_per_centre(&self) -> bool {
        matches!(self, Self::PerCentre(_))
    }

    /// 取(中心元素, 关系)对应的`[m, P]`参数
    fn get(&self, centre: usize, relation: usize) -> ArrayView2<'_, f32> {
        match self {
            Self::Shared(p) => p.index_axis(Axis(0), relation),
            Self::PerCentre(p) => p.index_axis(Axis(0), centre).index_axis_move(Axis(0), relation),
        }
    }

    fn validate(
        &self,
        layer: &str,
        param_width: usize,
        num_relations: usize,
        num_elements: usize,
    ) -> Result<(), GnnError> {
        if self.param_width() != param_width {
            return Err(GnnError::InvalidConfig(format!(
                "{layer}：每组参数须有{param_width}个值，实际为{}",
                self.param_width()
            )));
        }
        if self.num_relations() != num_relations {
            return Err(GnnError::InvalidConfig(format!(
                "{layer}：参数表的关系数{}与映射的关系数{num_relations}不一致",
                self.num_relations()
            )));
        }
        if let Self::PerCentre(p) = self {
            if p.shape()[0] != num_elements {
                return Err(GnnError::InvalidConfig(format!(
                    "{layer}：参数表的中心元素数{}与元素映射的长度{num_elements}不一致",
                    p.shape()[0]
                )));
            }
        }
        Ok(())
    }

    /// 查找某一行（边或角）的参数；中心原子在按中心区分的参数表中未映射时返回`None`
    fn lookup(&self, centre: usize, relation: usize) -> Option<ArrayView2<'_, f32>> {
        if relation == UNMAPPED || (self.is_per_centre() && centre == UNMAPPED) {
            None
        } else {
            Some(self.get(centre, relation))
        }
    }
}

/// 把同一组参数广播到`rows`个关系上
fn broadcast_sets(sets: &[Vec<f32>], rows: usize) -> Array3<f32> {
    let width = sets.first().map_or(0, Vec::len);
    Array3::from_shape_fn((rows, sets.len(), width), |(_, s, p)| sets[s][p])
}

fn column(ragged: &Ragged<usize>) -> Vec<usize> {
    ragged.values().column(0).to_vec()
}

fn relational_pooling(
    num_relations: usize,
    unmapped: UnmappedPolicy,
) -> Result<RelationalPoolingLocalEdges, GnnError> {
    RelationalPoolingLocalEdges::from_config(RelationalPoolingConfig {
        num_relations,
        reduction: Reduction::Sum,
        pooling_index: 0,
        unmapped,
    })
}

// ==================== G2 ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcsfG2Config {
    /// `[N, m, 3]`或`[N, N, m, 3]`
    pub eta_rs_rc: AcsfParams,
    /// 各元素的原子序数，顺序即参数表中的元素顺序
    pub element_mapping: Vec<usize>,
    #[serde(default)]
    pub add_eps: bool,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

/// 径向对称函数：`G2_i = Σ_{j≠i} exp(-η (r_ij - R_s)²) · f_c(r_ij)`，按邻居j的元素分别求和。
///
/// # 使用示例
/// ```ignore
/// let g2 = AcsfG2::new(AcsfG2::make_param_table(&[0.5, 1.0], &[0.0], 8.0, &[1, 6]))?;
/// let rep = g2.forward(batch.node_numbers()?, batch.node_coordinates()?, batch.edge_indices())?;
/// // rep: [N, 2 * 2]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AcsfG2Config", into = "AcsfG2Config")]
pub struct AcsfG2 {
    config: AcsfG2Config,
    mapping: ElementMapping,
    pooling: RelationalPoolingLocalEdges,
}

impl AcsfG2 {
    pub fn new(config: AcsfG2Config) -> Result<Self, GnnError> {
        let mapping = ElementMapping::new(config.element_mapping.clone())?;
        config
            .eta_rs_rc
            .validate("AcsfG2", 3, mapping.len(), mapping.len())?;
        let pooling = relational_pooling(mapping.len(), config.unmapped)?;
        Ok(Self {
            config,
            mapping,
            pooling,
        })
    }

    /// 由η、R_s列表和单个截断半径生成所有元素共用的参数表`[N, |rs|·|eta|, 3]`。
    /// 参数组按R_s在外、η在内排列；元素按原子序数升序
    pub fn make_param_table(eta: &[f32], rs: &[f32], rc: f32, elements: &[usize]) -> AcsfG2Config {
        let sets: Vec<Vec<f32>> = rs
            .iter()
            .flat_map(|&r| eta.iter().map(move |&e| vec![e, r, rc]))
            .collect();
        let mut elements = elements.to_vec();
        elements.sort_unstable();
        AcsfG2Config {
            eta_rs_rc: AcsfParams::Shared(broadcast_sets(&sets, elements.len())),
            element_mapping: elements,
            add_eps: false,
            unmapped: UnmappedPolicy::Skip,
        }
    }

    pub const fn config(&self) -> &AcsfG2Config {
        &self.config
    }

    /// 输出宽度：元素数 × 参数组数
    pub fn units(&self) -> usize {
        self.mapping.len() * self.config.eta_rs_rc.num_sets()
    }

    /// * `numbers` - 原子序数`[N, 1]`
    /// * `coordinates` - 坐标`[N, 3]`
    /// * `index` - 局部边索引`[M, 2]`，第0列为中心原子
    pub fn forward(
        &self,
        numbers: &Ragged<usize>,
        coordinates: &Ragged<f32>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        numbers.ensure_same_partition(coordinates, "AcsfG2：原子序数与坐标")?;
        let positions = NodePosition {
            selection_index: vec![0, 1],
        }
        .forward(coordinates, index)?;
        let rij = NodeDistanceEuclidean {
            add_eps: self.config.add_eps,
        }
        .forward(&positions[0], &positions[1])?;
        let z = GatherEmbeddingSelection::new(vec![0, 1])?.forward(numbers, index)?;
        let zi = column(&self.mapping.map_ragged(&z[0])?);
        let zj = column(&self.mapping.map_ragged(&z[1])?);

        let params = &self.config.eta_rs_rc;
        let mut rep = Array2::<f32>::zeros((index.total_len(), params.num_sets()));
        let mut relations = Array2::<usize>::from_elem((index.total_len(), 1), UNMAPPED);
        for (row, mut out) in rep.rows_mut().into_iter().enumerate() {
            let Some(sets) = params.lookup(zi[row], zj[row]) else {
                continue;
            };
            relations[[row, 0]] = zj[row];
            let r = rij.values()[[row, 0]];
            for (value, set) in out.iter_mut().zip(sets.rows()) {
                let (eta, rs, rc) = (set[0], set[1], set[2]);
                *value = (-eta * (r - rs) * (r - rs)).exp() * cutoff(r, rc);
            }
        }

        self.pooling.forward(
            numbers,
            &index.with_values(rep)?,
            &index.with_values(relations)?,
            index,
        )
    }
}

impl TryFrom<AcsfG2Config> for AcsfG2 {
    type Error = GnnError;

    fn try_from(config: AcsfG2Config) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<AcsfG2> for AcsfG2Config {
    fn from(layer: AcsfG2) -> Self {
        layer.config
    }
}

// ==================== G4 ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcsfG4Config {
    /// `[M, m, 4]`或`[N, M, m, 4]`，M 为元素对个数
    pub eta_zeta_lambda_rc: AcsfParams,
    pub element_mapping: Vec<usize>,
    /// 缺省时由`element_mapping`生成
    #[serde(default)]
    pub element_pair_mapping: Option<Vec<(usize, usize)>>,
    #[serde(default)]
    pub keep_pair_order: bool,
    /// 给定时角度项再除以该值
    #[serde(default)]
    pub multiplicity: Option<f32>,
    #[serde(default)]
    pub add_eps: bool,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

/// 角向对称函数：
/// `G4_i = Σ_{j,k} 2^{1-ζ} (1 + λ cos θ_ijk)^ζ · e^{-η r_ij²} e^{-η r_ik²} e^{-η r_jk²} · f_ij f_ik f_jk`，
/// 按邻居对(j, k)的元素对分别求和
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AcsfG4Config", into = "AcsfG4Config")]
pub struct AcsfG4 {
    config: AcsfG4Config,
    mapping: ElementMapping,
    pair_mapping: ElementPairMapping,
    pooling: RelationalPoolingLocalEdges,
}

impl AcsfG4 {
    pub fn new(config: AcsfG4Config) -> Result<Self, GnnError> {
        let mapping = ElementMapping::new(config.element_mapping.clone())?;
        let pair_mapping = match &config.element_pair_mapping {
            Some(pairs) => ElementPairMapping::new(pairs.clone(), config.keep_pair_order)?,
            None => ElementPairMapping::from_elements(&mapping, config.keep_pair_order)?,
        };
        config
            .eta_zeta_lambda_rc
            .validate("AcsfG4", 4, pair_mapping.len(), mapping.len())?;
        if let Some(m) = config.multiplicity {
            if m == 0.0 || !m.is_finite() {
                return Err(GnnError::InvalidConfig(format!(
                    "AcsfG4：`multiplicity`须为非零有限值，实际为{m}"
                )));
            }
        }
        let pooling = relational_pooling(pair_mapping.len(), config.unmapped)?;
        Ok(Self {
            config,
            mapping,
            pair_mapping,
            pooling,
        })
    }

    /// 生成所有元素共用的参数表`[N(N+1)/2, |eta|·|zeta|·|lambda|, 4]`。
    /// 参数组按η、ζ、λ由外到内排列；元素按原子序数升序，元素对不区分顺序
    pub fn make_param_table(
        eta: &[f32],
        zeta: &[f32],
        lambda: &[f32],
        rc: f32,
        elements: &[usize],
    ) -> AcsfG4Config {
        let mut sets = Vec::with_capacity(eta.len() * zeta.len() * lambda.len());
        for &e in eta {
            for &z in zeta {
                for &l in lambda {
                    sets.push(vec![e, z, l, rc]);
                }
            }
        }
        let mut elements = elements.to_vec();
        elements.sort_unstable();
        let num_pairs = elements.len() * (elements.len() + 1) / 2;
        AcsfG4Config {
            eta_zeta_lambda_rc: AcsfParams::Shared(broadcast_sets(&sets, num_pairs)),
            element_mapping: elements,
            element_pair_mapping: None,
            keep_pair_order: false,
            multiplicity: None,
            add_eps: false,
            unmapped: UnmappedPolicy::Skip,
        }
    }

    pub const fn config(&self) -> &AcsfG4Config {
        &self.config
    }

    pub const fn pair_mapping(&self) -> &ElementPairMapping {
        &self.pair_mapping
    }

    /// 输出宽度：元素对数 × 参数组数
    pub fn units(&self) -> usize {
        self.pair_mapping.len() * self.config.eta_zeta_lambda_rc.num_sets()
    }

    /// * `numbers` - 原子序数`[N, 1]`
    /// * `coordinates` - 坐标`[N, 3]`
    /// * `index` - 局部角索引`[A, 3]`，每行`(i, j, k)`，i 为顶点
    pub fn forward(
        &self,
        numbers: &Ragged<usize>,
        coordinates: &Ragged<f32>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        numbers.ensure_same_partition(coordinates, "AcsfG4：原子序数与坐标")?;
        let x = NodePosition {
            selection_index: vec![0, 1, 2],
        }
        .forward(coordinates, index)?;
        let distance = NodeDistanceEuclidean {
            add_eps: self.config.add_eps,
        };
        let rij = distance.forward(&x[0], &x[1])?;
        let rik = distance.forward(&x[0], &x[2])?;
        let rjk = distance.forward(&x[1], &x[2])?;
        let z = GatherEmbeddingSelection::new(vec![0, 1, 2])?.forward(numbers, index)?;
        let zi = column(&self.mapping.map_ragged(&z[0])?);
        let (zj, zk) = (column(&z[1]), column(&z[2]));

        let params = &self.config.eta_zeta_lambda_rc;
        let multiplicity = self.config.multiplicity.unwrap_or(1.0);
        let mut rep = Array2::<f32>::zeros((index.total_len(), params.num_sets()));
        let mut relations = Array2::<usize>::from_elem((index.total_len(), 1), UNMAPPED);
        for (row, mut out) in rep.rows_mut().into_iter().enumerate() {
            let relation = self.pair_mapping.map(zj[row], zk[row]);
            let Some(sets) = params.lookup(zi[row], relation) else {
                continue;
            };
            relations[[row, 0]] = relation;

            let (xi, xj, xk) = (x[0].values().row(row), x[1].values().row(row), x[2].values().row(row));
            let dot: f32 = (0..xi.len())
                .map(|d| (xi[d] - xj[d]) * (xi[d] - xk[d]))
                .sum();
            let (r_ij, r_ik, r_jk) = (
                rij.values()[[row, 0]],
                rik.values()[[row, 0]],
                rjk.values()[[row, 0]],
            );
            let cos_theta = dot / r_ij / r_ik;
            for (value, set) in out.iter_mut().zip(sets.rows()) {
                let (eta, zeta, lambda, rc) = (set[0], set[1], set[2], set[3]);
                let angular =
                    2.0_f32.powf(1.0 - zeta) * (1.0 + lambda * cos_theta).powf(zeta) / multiplicity;
                let radial = (-eta * (r_ij * r_ij + r_ik * r_ik + r_jk * r_jk)).exp();
                let cut = cutoff(r_ij, rc) * cutoff(r_ik, rc) * cutoff(r_jk, rc);
                *value = angular * radial * cut;
            }
        }

        self.pooling.forward(
            numbers,
            &index.with_values(rep)?,
            &index.with_values(relations)?,
            index,
        )
    }
}

impl TryFrom<AcsfG4Config> for AcsfG4 {
    type Error = GnnError;

    fn try_from(config: AcsfG4Config) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<AcsfG4> for AcsfG4Config {
    fn from(layer: AcsfG4) -> Self {
        layer.config
    }
}

// ==================== 归一化 ====================

/// 常数归一化：`(x - mean) / std`。`mean`/`std`长度为1时对所有特征广播，否则须等于特征维度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NormalizationConfig", into = "NormalizationConfig")]
pub struct AcsfConstNormalization {
    mean: Vec<f32>,
    std: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    #[serde(default = "default_mean")]
    pub mean: Vec<f32>,
    #[serde(default = "default_std")]
    pub std: Vec<f32>,
}

fn default_mean() -> Vec<f32> {
    vec![0.0]
}

fn default_std() -> Vec<f32> {
    vec![1.0]
}

impl Default for AcsfConstNormalization {
    fn default() -> Self {
        Self {
            mean: default_mean(),
            std: default_std(),
        }
    }
}

impl AcsfConstNormalization {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, GnnError> {
        if mean.is_empty() || std.is_empty() {
            return Err(GnnError::InvalidConfig(
                "AcsfConstNormalization：`mean`与`std`不能为空".to_string(),
            ));
        }
        if std.iter().any(|&s| s == 0.0) {
            return Err(GnnError::InvalidConfig(
                "AcsfConstNormalization：`std`不能含0".to_string(),
            ));
        }
        Ok(Self { mean, std })
    }

    fn broadcast(values: &[f32], width: usize, what: &str) -> Result<Vec<f32>, GnnError> {
        match values.len() {
            1 => Ok(vec![values[0]; width]),
            n if n == width => Ok(values.to_vec()),
            n => Err(GnnError::ShapeMismatch {
                context: format!("AcsfConstNormalization：`{what}`的长度"),
                expected: vec![width],
                got: vec![n],
            }),
        }
    }

    pub fn forward(&self, x: &Ragged<f32>) -> Result<Ragged<f32>, GnnError> {
        let width = x.feature_dim();
        let mean = Self::broadcast(&self.mean, width, "mean")?;
        let std = Self::broadcast(&self.std, width, "std")?;
        x.map_values(|v| {
            Array2::from_shape_fn(v.raw_dim(), |(row, col)| (v[[row, col]] - mean[col]) / std[col])
        })
    }
}

impl TryFrom<NormalizationConfig> for AcsfConstNormalization {
    type Error = GnnError;

    fn try_from(config: NormalizationConfig) -> Result<Self, Self::Error> {
        Self::new(config.mean, config.std)
    }
}

impl From<AcsfConstNormalization> for NormalizationConfig {
    fn from(layer: AcsfConstNormalization) -> Self {
        Self {
            mean: layer.mean,
            std: layer.std,
        }
    }
}
