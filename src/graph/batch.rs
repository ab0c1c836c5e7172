/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 图样本（GraphSample）与图批次（GraphBatch）
 *
 * 数据集只需给出每个图内部的局部边索引；全局索引在每次前向时由分区行索引即时计算，不缓存。
 */

use crate::errors::GnnError;
use crate::ragged::{Indexing, Ragged, partition_row_indexing};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// 单个图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSample {
    /// 节点特征`[n, F]`
    pub node_attributes: Array2<f32>,
    /// 局部边索引`[m, 2]`（也可以是`[m, k]`的任意元组）
    pub edge_indices: Array2<usize>,
    /// 节点坐标`[n, 3]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_coordinates: Option<Array2<f32>>,
    /// 边特征`[m, E]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_attributes: Option<Array2<f32>>,
    /// 原子序数等节点类别`[n]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_numbers: Option<Vec<usize>>,
    /// 图级标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_label: Option<Vec<f32>>,
}

impl GraphSample {
    pub const fn new(node_attributes: Array2<f32>, edge_indices: Array2<usize>) -> Self {
        Self {
            node_attributes,
            edge_indices,
            node_coordinates: None,
            edge_attributes: None,
            node_numbers: None,
            graph_label: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Array2<f32>) -> Self {
        self.node_coordinates = Some(coordinates);
        self
    }

    pub fn with_edge_attributes(mut self, edge_attributes: Array2<f32>) -> Self {
        self.edge_attributes = Some(edge_attributes);
        self
    }

    pub fn with_node_numbers(mut self, node_numbers: Vec<usize>) -> Self {
        self.node_numbers = Some(node_numbers);
        self
    }

    pub fn with_label(mut self, label: Vec<f32>) -> Self {
        self.graph_label = Some(label);
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.node_attributes.nrows()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_indices.nrows()
    }
}

/// 一个批次的图，所有表格都以不规则张量存放
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBatch {
    nodes: Ragged<f32>,
    edge_indices: Ragged<usize>,
    node_coordinates: Option<Ragged<f32>>,
    edge_attributes: Option<Ragged<f32>>,
    node_numbers: Option<Ragged<usize>>,
    graph_labels: Option<Array2<f32>>,
}

impl GraphBatch {
    /// 由节点表和（局部）边索引表构造批次，并校验：图个数一致、每个局部索引都小于所属图的节点数
    pub fn new(nodes: Ragged<f32>, edge_indices: Ragged<usize>) -> Result<Self, GnnError> {
        partition_row_indexing(
            edge_indices.values().view(),
            &nodes.partition(),
            &edge_indices.partition(),
            Indexing::Sample,
            Indexing::Sample,
        )?;
        Ok(Self {
            nodes,
            edge_indices,
            node_coordinates: None,
            edge_attributes: None,
            node_numbers: None,
            graph_labels: None,
        })
    }

    /// 将若干图样本拼成一个批次。
    /// 可选字段（坐标、边特征等）要么所有样本都有，要么都没有。
    pub fn from_samples(samples: &[GraphSample]) -> Result<Self, GnnError> {
        let nodes = Ragged::from_samples(&collect(samples, |s| s.node_attributes.clone()))?;
        let edge_indices = Ragged::from_samples(&collect(samples, |s| s.edge_indices.clone()))?;
        let mut batch = Self::new(nodes, edge_indices)?;

        if let Some(coordinates) = collect_optional(samples, "node_coordinates", |s| {
            s.node_coordinates.clone()
        })? {
            batch = batch.with_coordinates(Ragged::from_samples(&coordinates)?)?;
        }
        if let Some(edge_attributes) = collect_optional(samples, "edge_attributes", |s| {
            s.edge_attributes.clone()
        })? {
            batch = batch.with_edge_attributes(Ragged::from_samples(&edge_attributes)?)?;
        }
        if let Some(numbers) = collect_optional(samples, "node_numbers", |s| {
            s.node_numbers
                .as_ref()
                .map(|z| Array2::from_shape_fn((z.len(), 1), |(i, _)| z[i]))
        })? {
            batch = batch.with_node_numbers(Ragged::from_samples(&numbers)?)?;
        }
        if let Some(labels) = collect_optional(samples, "graph_label", |s| {
            s.graph_label
                .as_ref()
                .map(|y| Array2::from_shape_fn((1, y.len()), |(_, j)| y[j]))
        })? {
            let labels = Ragged::from_samples(&labels)?;
            batch = batch.with_labels(labels.into_values())?;
        }

        tracing::debug!(
            graphs = batch.num_graphs(),
            nodes = batch.nodes.total_len(),
            edges = batch.edge_indices.total_len(),
            "构建图批次"
        );
        Ok(batch)
    }

    pub fn with_coordinates(mut self, coordinates: Ragged<f32>) -> Result<Self, GnnError> {
        self.nodes
            .ensure_same_partition(&coordinates, "GraphBatch：节点坐标")?;
        self.node_coordinates = Some(coordinates);
        Ok(self)
    }

    pub fn with_edge_attributes(mut self, edge_attributes: Ragged<f32>) -> Result<Self, GnnError> {
        self.edge_indices
            .ensure_same_partition(&edge_attributes, "GraphBatch：边特征")?;
        self.edge_attributes = Some(edge_attributes);
        Ok(self)
    }

    pub fn with_node_numbers(mut self, node_numbers: Ragged<usize>) -> Result<Self, GnnError> {
        self.nodes
            .ensure_same_partition(&node_numbers, "GraphBatch：节点类别")?;
        self.node_numbers = Some(node_numbers);
        Ok(self)
    }

    pub fn with_labels(mut self, labels: Array2<f32>) -> Result<Self, GnnError> {
        if labels.nrows() != self.num_graphs() {
            return Err(GnnError::ShapeMismatch {
                context: "GraphBatch：图标签的行数须等于图个数".to_string(),
                expected: vec![self.num_graphs()],
                got: vec![labels.nrows()],
            });
        }
        self.graph_labels = Some(labels);
        Ok(self)
    }

    pub fn num_graphs(&self) -> usize {
        self.nodes.nrows()
    }

    pub const fn nodes(&self) -> &Ragged<f32> {
        &self.nodes
    }

    pub const fn edge_indices(&self) -> &Ragged<usize> {
        &self.edge_indices
    }

    pub const fn node_coordinates(&self) -> Option<&Ragged<f32>> {
        self.node_coordinates.as_ref()
    }

    pub const fn edge_attributes(&self) -> Option<&Ragged<f32>> {
        self.edge_attributes.as_ref()
    }

    pub const fn node_numbers(&self) -> Option<&Ragged<usize>> {
        self.node_numbers.as_ref()
    }

    pub const fn graph_labels(&self) -> Option<&Array2<f32>> {
        self.graph_labels.as_ref()
    }

    /// 平移到整批节点表上的全局边索引
    pub fn global_edge_indices(&self) -> Result<Array2<usize>, GnnError> {
        global_indices(self.edge_indices.values().view(), &self.nodes, &self.edge_indices)
    }
}

/// 局部索引 -> 全局索引的便捷封装
pub(crate) fn global_indices<A, B>(
    index: ArrayView2<'_, usize>,
    target: &Ragged<A>,
    index_owner: &Ragged<B>,
) -> Result<Array2<usize>, GnnError> {
    partition_row_indexing(
        index,
        &target.partition(),
        &index_owner.partition(),
        Indexing::Sample,
        Indexing::Batch,
    )
}

fn collect<T, F>(samples: &[GraphSample], f: F) -> Vec<T>
where
    F: Fn(&GraphSample) -> T,
{
    samples.iter().map(f).collect()
}

fn collect_optional<T, F>(
    samples: &[GraphSample],
    field: &str,
    f: F,
) -> Result<Option<Vec<T>>, GnnError>
where
    F: Fn(&GraphSample) -> Option<T>,
{
    let collected: Vec<T> = samples.iter().filter_map(f).collect();
    match collected.len() {
        0 => Ok(None),
        n if n == samples.len() => Ok(Some(collected)),
        n => Err(GnnError::InvalidConfig(format!(
            "字段`{field}`只在{n}/{}个样本中存在，须全有或全无",
            samples.len()
        ))),
    }
}
