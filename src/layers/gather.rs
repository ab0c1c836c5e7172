/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : Gather 系列层 - 按边（或角）索引从扁平的节点表中取出端点特征
 *
 * 约定：边由索引元组`(i, j)`表示，位置0（i）为接收端/目标节点，位置1（j）为发送端/源节点。
 * 所有 gather 的输出都沿用索引表（边表）的行划分，后续聚合可直接复用。
 * 这里只用“选择哪些位置”与“拼接还是拆分”两个参数描述所有变体，不再分出继承层级。
 */

use super::check_selection;
use crate::errors::GnnError;
use crate::graph::global_indices;
use crate::ragged::Ragged;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// 按全局行号从扁平表中取行
fn take_rows<A: Clone>(table: &Array2<A>, rows: &[usize]) -> Array2<A> {
    table.select(Axis(0), rows)
}

/// 对索引元组的每个选中位置，取出对应端点的特征（每个结果形状为`[M, F]`）
fn gather_positions<A: Clone>(
    embeddings: &Ragged<A>,
    index: &Ragged<usize>,
    selection: &[usize],
) -> Result<Vec<Array2<A>>, GnnError> {
    check_selection(selection, index.feature_dim())?;
    let global = global_indices(index.values().view(), embeddings, index)?;
    tracing::trace!(
        edges = global.nrows(),
        ?selection,
        "按索引 gather 端点特征"
    );
    Ok(selection
        .iter()
        .map(|&position| {
            let rows = global.column(position).to_vec();
            take_rows(embeddings.values(), &rows)
        })
        .collect())
}

// ==================== GatherEmbedding ====================

/// `GatherEmbedding`的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherEmbeddingConfig {
    /// 沿特征维拼接各位置的特征（默认开启）
    pub concat: bool,
    /// 把各位置的特征拆成多个张量返回
    pub split: bool,
    /// 参与拼接的位置及其顺序，缺省为`0..k`；仅在`concat`开启时可指定
    pub concat_indices: Option<Vec<usize>>,
    /// 参与拆分的位置及其顺序，缺省为`0..k`；仅在`split`开启时可指定
    pub split_indices: Option<Vec<usize>>,
}

impl Default for GatherEmbeddingConfig {
    fn default() -> Self {
        Self {
            concat: true,
            split: false,
            concat_indices: None,
            split_indices: None,
        }
    }
}

/// `GatherEmbedding`的输出
#[derive(Debug, Clone, PartialEq)]
pub enum Gathered<A> {
    /// `[M, len(indices) * F]`，特征顺序严格按请求的位置顺序
    Concat(Ragged<A>),
    /// 每个位置一个`[M, F]`
    Split(Vec<Ragged<A>>),
    /// 既不拼接也不拆分：`[M, k * F]`，每行按位置`0..k`依次排列（即`[k, F]`的行优先展开）
    Stacked { values: Ragged<A>, arity: usize },
}

impl<A> Gathered<A> {
    pub fn into_concat(self) -> Option<Ragged<A>> {
        match self {
            Self::Concat(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_split(self) -> Option<Vec<Ragged<A>>> {
        match self {
            Self::Split(r) => Some(r),
            _ => None,
        }
    }
}

/// 从索引表收集节点（或边）特征，可选择拼接或拆分。
///
/// # 示例
/// ```ignore
/// let nodes = Ragged::from_samples(&[array![[0.0], [1.0]], array![[2.0], [3.0], [4.0]]])?;
/// let edge_idx = Ragged::from_samples(&[array![[0, 1], [1, 0]], array![[0, 2], [1, 2]]])?;
/// let out = GatherEmbedding::default().forward(&nodes, &edge_idx)?;
/// // 第二个图的第一条边 -> [2.0, 4.0]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "GatherEmbeddingConfig", into = "GatherEmbeddingConfig")]
pub struct GatherEmbedding {
    config: GatherEmbeddingConfig,
}

/// 同一个层的别名
pub type GatherNodes = GatherEmbedding;

impl GatherEmbedding {
    /// 同时要求拼接与拆分属于配置冲突，在构造时即报错
    pub fn new(config: GatherEmbeddingConfig) -> Result<Self, GnnError> {
        if config.concat && config.split {
            return Err(GnnError::AmbiguousConfig(
                "GatherEmbedding 不能同时拼接和拆分，`concat`与`split`至多开启一个".to_string(),
            ));
        }
        for indices in [&config.concat_indices, &config.split_indices]
            .into_iter()
            .flatten()
        {
            if indices.is_empty() {
                return Err(GnnError::InvalidConfig(
                    "GatherEmbedding 的位置列表不能为空".to_string(),
                ));
            }
        }
        // 不拼接也不拆分时总是按`0..k`排列，指定的位置列表不会生效
        if (!config.concat && config.concat_indices.is_some())
            || (!config.split && config.split_indices.is_some())
        {
            return Err(GnnError::InvalidConfig(
                "GatherEmbedding：`concat_indices`/`split_indices`须与对应的`concat`/`split`同时开启"
                    .to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn concat(indices: Option<Vec<usize>>) -> Self {
        Self {
            config: GatherEmbeddingConfig {
                concat: true,
                split: false,
                concat_indices: indices.filter(|v| !v.is_empty()),
                split_indices: None,
            },
        }
    }

    pub fn split(indices: Option<Vec<usize>>) -> Self {
        Self {
            config: GatherEmbeddingConfig {
                concat: false,
                split: true,
                concat_indices: None,
                split_indices: indices.filter(|v| !v.is_empty()),
            },
        }
    }

    pub const fn config(&self) -> &GatherEmbeddingConfig {
        &self.config
    }

    /// 未显式指定位置时用`0..k`；若索引表没有给出元组长度（宽度为0），无法推断，只能报错
    fn resolve(explicit: Option<&[usize]>, arity: usize, hint: &str) -> Result<Vec<usize>, GnnError> {
        match explicit {
            Some(indices) => Ok(indices.to_vec()),
            None if arity == 0 => Err(GnnError::CannotInferIndices {
                what: "索引元组的长度".to_string(),
                hint: hint.to_string(),
            }),
            None => Ok((0..arity).collect()),
        }
    }

    pub fn forward<A: Clone>(
        &self,
        embeddings: &Ragged<A>,
        index: &Ragged<usize>,
    ) -> Result<Gathered<A>, GnnError> {
        let arity = index.feature_dim();
        if self.config.split {
            let selection =
                Self::resolve(self.config.split_indices.as_deref(), arity, "split_indices")?;
            let parts = gather_positions(embeddings, index, &selection)?;
            return Ok(Gathered::Split(
                parts
                    .into_iter()
                    .map(|p| index.with_values(p))
                    .collect::<Result<_, _>>()?,
            ));
        }
        let selection =
            Self::resolve(self.config.concat_indices.as_deref(), arity, "concat_indices")?;
        let parts = gather_positions(embeddings, index, &selection)?;
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        let values = ndarray::concatenate(Axis(1), &views).map_err(|_| GnnError::ShapeMismatch {
            context: "GatherEmbedding：拼接各位置的特征".to_string(),
            expected: vec![index.total_len()],
            got: parts.iter().map(|p| p.nrows()).collect(),
        })?;
        let values = index.with_values(values)?;
        if self.config.concat {
            Ok(Gathered::Concat(values))
        } else {
            Ok(Gathered::Stacked { values, arity })
        }
    }
}

impl TryFrom<GatherEmbeddingConfig> for GatherEmbedding {
    type Error = GnnError;

    fn try_from(config: GatherEmbeddingConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<GatherEmbedding> for GatherEmbeddingConfig {
    fn from(layer: GatherEmbedding) -> Self {
        layer.config
    }
}

// ==================== GatherEmbeddingSelection ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub selection_index: Vec<usize>,
}

/// 对给定的每个位置分别 gather，总是返回列表（即使只选一个位置）。
/// 元组长度不限于2，如对称函数层使用三元组`(i, j, k)`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionConfig", into = "SelectionConfig")]
pub struct GatherEmbeddingSelection {
    selection_index: Vec<usize>,
}

/// 同一个层的别名
pub type GatherNodesSelection = GatherEmbeddingSelection;

impl GatherEmbeddingSelection {
    pub fn new(selection_index: Vec<usize>) -> Result<Self, GnnError> {
        if selection_index.is_empty() {
            return Err(GnnError::InvalidConfig(
                "GatherEmbeddingSelection 的`selection_index`不能为空".to_string(),
            ));
        }
        Ok(Self { selection_index })
    }

    pub fn selection_index(&self) -> &[usize] {
        &self.selection_index
    }

    pub fn forward<A: Clone>(
        &self,
        embeddings: &Ragged<A>,
        index: &Ragged<usize>,
    ) -> Result<Vec<Ragged<A>>, GnnError> {
        gather_positions(embeddings, index, &self.selection_index)?
            .into_iter()
            .map(|p| index.with_values(p))
            .collect()
    }
}

impl TryFrom<SelectionConfig> for GatherEmbeddingSelection {
    type Error = GnnError;

    fn try_from(config: SelectionConfig) -> Result<Self, Self::Error> {
        Self::new(config.selection_index)
    }
}

impl From<GatherEmbeddingSelection> for SelectionConfig {
    fn from(layer: GatherEmbeddingSelection) -> Self {
        Self {
            selection_index: layer.selection_index,
        }
    }
}

// ==================== 接收端 / 发送端 ====================

/// 取边的接收端（默认位置0）特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherNodesIngoing {
    pub selection_index: usize,
}

impl Default for GatherNodesIngoing {
    fn default() -> Self {
        Self { selection_index: 0 }
    }
}

impl GatherNodesIngoing {
    pub fn forward<A: Clone>(
        &self,
        nodes: &Ragged<A>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<A>, GnnError> {
        gather_single(nodes, index, self.selection_index)
    }
}

/// 取边的发送端（默认位置1）特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherNodesOutgoing {
    pub selection_index: usize,
}

impl Default for GatherNodesOutgoing {
    fn default() -> Self {
        Self { selection_index: 1 }
    }
}

impl GatherNodesOutgoing {
    pub fn forward<A: Clone>(
        &self,
        nodes: &Ragged<A>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<A>, GnnError> {
        gather_single(nodes, index, self.selection_index)
    }
}

fn gather_single<A: Clone>(
    nodes: &Ragged<A>,
    index: &Ragged<usize>,
    position: usize,
) -> Result<Ragged<A>, GnnError> {
    let mut parts = gather_positions(nodes, index, &[position])?;
    index.with_values(parts.remove(0))
}

// ==================== GatherState ====================

/// 把每个图的全局状态（如环境特征）重复到该图的每个节点（或每条边）上，
/// 常用于`h_i ⊕ s`这类拼接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatherState {}

impl GatherState {
    /// * `state` - 图级特征`[B, F]`
    /// * `target` - 提供行划分的不规则张量（节点或边）
    pub fn forward<A: Clone, B>(
        &self,
        state: &Array2<A>,
        target: &Ragged<B>,
    ) -> Result<Ragged<A>, GnnError> {
        if state.nrows() != target.nrows() {
            return Err(GnnError::ShapeMismatch {
                context: "GatherState：图级状态的行数须等于图个数".to_string(),
                expected: vec![target.nrows()],
                got: vec![state.nrows()],
            });
        }
        let repeated = take_rows(state, &target.value_rowids());
        Ragged::from_row_splits(repeated, target.row_splits().to_vec())
    }
}

// ==================== GatherEdgesPairs ====================

/// 按配对索引取每条边的反向边特征。
/// 配对索引为负（没有反向边）时，该边的输出为零向量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GatherEdgesPairs {}

impl GatherEdgesPairs {
    /// * `edges` - 边特征`[M, F]`
    /// * `pair_index` - 每条边的反向边在本图内的行号`[M, 1]`，-1 表示不存在
    pub fn forward(
        &self,
        edges: &Ragged<f32>,
        pair_index: &Ragged<i64>,
    ) -> Result<Ragged<f32>, GnnError> {
        edges.ensure_same_partition(pair_index, "GatherEdgesPairs：边特征与配对索引")?;
        if pair_index.feature_dim() != 1 {
            return Err(GnnError::ShapeMismatch {
                context: "GatherEdgesPairs：配对索引的宽度".to_string(),
                expected: vec![1],
                got: vec![pair_index.feature_dim()],
            });
        }
        let splits = edges.row_splits();
        let mut out = Array2::<f32>::zeros(edges.values().raw_dim());
        for graph in 0..edges.nrows() {
            let (start, end) = (splits[graph], splits[graph + 1]);
            for row in start..end {
                let pair = pair_index.values()[[row, 0]];
                if pair < 0 {
                    continue;
                }
                let local = pair as usize;
                if local >= end - start {
                    return Err(GnnError::IndexOutOfBounds {
                        graph,
                        row: row - start,
                        position: 0,
                        index: local,
                        lower: 0,
                        upper: end - start,
                    });
                }
                out.row_mut(row).assign(&edges.values().row(start + local));
            }
        }
        edges.with_values(out)
    }
}
