/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 聚合（pooling）层：边 -> 接收节点、节点 -> 图，以及按关系分组的边聚合
 *
 * 聚合结果总是沿用节点（或图）的行划分；没有入边的节点、没有节点的图，结果为0。
 */

use super::endpoint_rows;
use crate::errors::{ComparisonOperator, GnnError};
use crate::ops::{Reduction, segment_reduce, segment_softmax};
use crate::ragged::Ragged;
use crate::relation::UNMAPPED;
use ndarray::{Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

fn node_output<B>(nodes: &Ragged<B>, values: Array2<f32>) -> Result<Ragged<f32>, GnnError> {
    Ragged::from_row_splits(values, nodes.row_splits().to_vec())
}

fn ensure_column(tensor: &Ragged<f32>, context: &str) -> Result<(), GnnError> {
    if tensor.feature_dim() == 1 {
        Ok(())
    } else {
        Err(GnnError::ShapeMismatch {
            context: context.to_string(),
            expected: vec![1],
            got: vec![tensor.feature_dim()],
        })
    }
}

// ==================== PoolingLocalEdges ====================

/// 把边（消息）聚合到接收节点上：`h_i = reduce_{j ∈ N(i)} m_ij`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingLocalEdges {
    pub reduction: Reduction,
    /// 聚合到索引元组的哪个位置（默认0，即接收端）
    pub pooling_index: usize,
}

/// 同一个层的别名
pub type PoolingLocalMessages = PoolingLocalEdges;

impl Default for PoolingLocalEdges {
    fn default() -> Self {
        Self {
            reduction: Reduction::Sum,
            pooling_index: 0,
        }
    }
}

impl PoolingLocalEdges {
    pub fn new(reduction: Reduction) -> Self {
        Self {
            reduction,
            ..Self::default()
        }
    }

    /// * `nodes` - 只用其行划分，决定输出形状`[N, F]`
    /// * `edges` - 边特征`[M, F]`，行划分须与`index`一致
    /// * `index` - 局部边索引`[M, k]`
    pub fn forward<B>(
        &self,
        nodes: &Ragged<B>,
        edges: &Ragged<f32>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        edges.ensure_same_partition(index, "PoolingLocalEdges：边特征与边索引")?;
        let receivers = endpoint_rows(nodes, index, self.pooling_index)?;
        tracing::trace!(
            edges = receivers.len(),
            nodes = nodes.total_len(),
            reduction = %self.reduction,
            "聚合边到节点"
        );
        let pooled = segment_reduce(
            edges.values().view(),
            &receivers,
            nodes.total_len(),
            self.reduction,
        )?;
        node_output(nodes, pooled)
    }
}

// ==================== PoolingWeightedLocalEdges ====================

/// 带权重的边聚合：先按边权缩放，再聚合；可选再除以每个节点的权重和
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingWeightedLocalEdges {
    pub reduction: Reduction,
    pub pooling_index: usize,
    pub normalize_by_weights: bool,
}

impl PoolingWeightedLocalEdges {
    /// * `weights` - 每条边一个权重`[M, 1]`
    pub fn forward<B>(
        &self,
        nodes: &Ragged<B>,
        edges: &Ragged<f32>,
        index: &Ragged<usize>,
        weights: &Ragged<f32>,
    ) -> Result<Ragged<f32>, GnnError> {
        edges.ensure_same_partition(index, "PoolingWeightedLocalEdges：边特征与边索引")?;
        edges.ensure_same_partition(weights, "PoolingWeightedLocalEdges：边特征与边权")?;
        ensure_column(weights, "PoolingWeightedLocalEdges：边权的宽度")?;
        let receivers = endpoint_rows(nodes, index, self.pooling_index)?;

        let weighted = scale_rows(edges.values(), weights.values());
        let mut pooled = segment_reduce(
            weighted.view(),
            &receivers,
            nodes.total_len(),
            self.reduction,
        )?;
        if self.normalize_by_weights {
            let totals = segment_reduce(
                weights.values().view(),
                &receivers,
                nodes.total_len(),
                Reduction::Sum,
            )?;
            for (mut row, &total) in pooled.rows_mut().into_iter().zip(totals.column(0)) {
                // 权重和为0的节点保持原值
                if total != 0.0 {
                    row /= total;
                }
            }
        }
        node_output(nodes, pooled)
    }
}

// ==================== 注意力聚合 ====================

/// 在每个接收节点的入边上做softmax（逐列独立），没有入边的节点不受影响
pub fn softmax_local_edges<B>(
    nodes: &Ragged<B>,
    logits: &Ragged<f32>,
    index: &Ragged<usize>,
    pooling_index: usize,
) -> Result<Ragged<f32>, GnnError> {
    logits.ensure_same_partition(index, "softmax_local_edges：注意力系数与边索引")?;
    let receivers = endpoint_rows(nodes, index, pooling_index)?;
    let mut out = Array2::<f32>::zeros(logits.values().raw_dim());
    for (column, mut target) in logits
        .values()
        .axis_iter(Axis(1))
        .zip(out.axis_iter_mut(Axis(1)))
    {
        target.assign(&segment_softmax(column, &receivers, nodes.total_len())?);
    }
    logits.with_values(out)
}

/// 注意力聚合：`h_i = Σ_j softmax_j(a_ij) · m_ij`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingLocalEdgesAttention {
    pub pooling_index: usize,
}

impl PoolingLocalEdgesAttention {
    /// * `attention` - 未归一化的注意力系数`[M, 1]`
    pub fn forward<B>(
        &self,
        nodes: &Ragged<B>,
        edges: &Ragged<f32>,
        attention: &Ragged<f32>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        edges.ensure_same_partition(index, "PoolingLocalEdgesAttention：边特征与边索引")?;
        ensure_column(attention, "PoolingLocalEdgesAttention：注意力系数的宽度")?;
        let alpha = softmax_local_edges(nodes, attention, index, self.pooling_index)?;
        let weighted = scale_rows(edges.values(), alpha.values());
        let receivers = endpoint_rows(nodes, index, self.pooling_index)?;
        let pooled = segment_reduce(
            weighted.view(),
            &receivers,
            nodes.total_len(),
            Reduction::Sum,
        )?;
        node_output(nodes, pooled)
    }
}

// ==================== PoolingNodes ====================

/// 节点 -> 图：只依赖节点的行划分，输出`[B, F]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingNodes {
    pub reduction: Reduction,
}

impl PoolingNodes {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    pub fn forward(&self, nodes: &Ragged<f32>) -> Result<Array2<f32>, GnnError> {
        segment_reduce(
            nodes.values().view(),
            &nodes.value_rowids(),
            nodes.nrows(),
            self.reduction,
        )
    }
}

// ==================== RelationalPoolingLocalEdges ====================

/// 关系编号为保留值`UNMAPPED`时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// 跳过该边，它不计入任何关系
    #[default]
    Skip,
    /// 直接报错
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalPoolingConfig {
    pub num_relations: usize,
    #[serde(default)]
    pub reduction: Reduction,
    #[serde(default)]
    pub pooling_index: usize,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

/// 按(接收节点, 关系)分组聚合边：输出`[N, num_relations * F]`，
/// 每行依次是关系0、关系1、……的聚合结果（关系优先展开）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationalPoolingConfig", into = "RelationalPoolingConfig")]
pub struct RelationalPoolingLocalEdges {
    config: RelationalPoolingConfig,
}

impl RelationalPoolingLocalEdges {
    pub fn new(num_relations: usize, reduction: Reduction) -> Result<Self, GnnError> {
        Self::from_config(RelationalPoolingConfig {
            num_relations,
            reduction,
            pooling_index: 0,
            unmapped: UnmappedPolicy::Skip,
        })
    }

    pub fn from_config(config: RelationalPoolingConfig) -> Result<Self, GnnError> {
        if config.num_relations == 0 {
            return Err(GnnError::InvalidConfig(
                "RelationalPoolingLocalEdges 的`num_relations`须大于0".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn with_unmapped(mut self, unmapped: UnmappedPolicy) -> Self {
        self.config.unmapped = unmapped;
        self
    }

    pub const fn num_relations(&self) -> usize {
        self.config.num_relations
    }

    pub const fn config(&self) -> &RelationalPoolingConfig {
        &self.config
    }

    /// * `relations` - 每条边的关系编号`[M, 1]`
    pub fn forward<B>(
        &self,
        nodes: &Ragged<B>,
        edges: &Ragged<f32>,
        relations: &Ragged<usize>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        edges.ensure_same_partition(index, "RelationalPoolingLocalEdges：边特征与边索引")?;
        edges.ensure_same_partition(relations, "RelationalPoolingLocalEdges：边特征与关系编号")?;
        if relations.feature_dim() != 1 {
            return Err(GnnError::ShapeMismatch {
                context: "RelationalPoolingLocalEdges：关系编号的宽度".to_string(),
                expected: vec![1],
                got: vec![relations.feature_dim()],
            });
        }
        let receivers = endpoint_rows(nodes, index, self.config.pooling_index)?;
        let num_relations = self.config.num_relations;

        let mut kept_rows = Vec::with_capacity(receivers.len());
        let mut segments = Vec::with_capacity(receivers.len());
        for (row, (&receiver, &relation)) in receivers
            .iter()
            .zip(relations.values().column(0))
            .enumerate()
        {
            if relation == UNMAPPED {
                match self.config.unmapped {
                    UnmappedPolicy::Skip => continue,
                    UnmappedPolicy::Error => {
                        return Err(GnnError::UnmappedCategory {
                            row,
                            context: "RelationalPoolingLocalEdges：边的关系编号未映射".to_string(),
                        });
                    }
                }
            }
            if relation >= num_relations {
                return Err(GnnError::RelationOutOfRange {
                    row,
                    relation,
                    operator: ComparisonOperator::LessThan,
                    num_relations,
                });
            }
            kept_rows.push(row);
            segments.push(receiver * num_relations + relation);
        }
        tracing::trace!(
            edges = receivers.len(),
            kept = kept_rows.len(),
            num_relations,
            "按关系聚合边到节点"
        );

        let kept = edges.values().select(Axis(0), &kept_rows);
        let width = edges.feature_dim();
        let pooled = segment_reduce(
            kept.view(),
            &segments,
            nodes.total_len() * num_relations,
            self.config.reduction,
        )?;
        let flattened = pooled
            .into_shape((nodes.total_len(), num_relations * width))
            .map_err(|_| GnnError::ShapeMismatch {
                context: "RelationalPoolingLocalEdges：展开关系维".to_string(),
                expected: vec![nodes.total_len(), num_relations * width],
                got: vec![nodes.total_len() * num_relations, width],
            })?;
        node_output(nodes, flattened)
    }
}

impl TryFrom<RelationalPoolingConfig> for RelationalPoolingLocalEdges {
    type Error = GnnError;

    fn try_from(config: RelationalPoolingConfig) -> Result<Self, Self::Error> {
        Self::from_config(config)
    }
}

impl From<RelationalPoolingLocalEdges> for RelationalPoolingConfig {
    fn from(layer: RelationalPoolingLocalEdges) -> Self {
        layer.config
    }
}

/// 逐元素乘，并把列向量广播到每一列（`[M, F] ⊙ [M, 1]`）
pub(crate) fn scale_rows(values: &Array2<f32>, column: &Array2<f32>) -> Array2<f32> {
    let mut out = values.clone();
    Zip::from(out.rows_mut())
        .and(column.rows())
        .for_each(|mut row, w| row *= w[0]);
    out
}
