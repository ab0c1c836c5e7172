//! 图神经网络层
//!
//! 所有层都是无状态（或只含权重）的纯函数式结构：同样的权重与批次，得到同样的输出。
//! 层之间通过不规则张量（[`Ragged`](crate::ragged::Ragged)）衔接，一个层的输出可直接作为下一层的输入。
//!
//! # 主要组件
//!
//! - [`gather`]: 按边（角）索引取端点特征
//! - [`pooling`]: 边 -> 节点、节点 -> 图的聚合，含按关系分组的聚合
//! - [`geom`]: 坐标、距离与高斯展开
//! - [`dense`]: 全连接变换与激活函数
//! - [`conv`]: 消息传递模板（gather -> 消息 -> 聚合 -> 更新）
//! - [`acsf`]: 原子中心对称函数（G2/G4）
//! - [`registry`]: 按类名序列化/反序列化层配置

pub mod acsf;
pub mod conv;
pub mod dense;
pub mod gather;
pub mod geom;
pub mod pooling;
pub mod registry;

pub use acsf::{
    AcsfConstNormalization, AcsfG2, AcsfG2Config, AcsfG4, AcsfG4Config, AcsfParams,
    NormalizationConfig,
};
pub use conv::{
    ContinuousFilter, DenseMessage, EdgeInputs, MessageFunction, MessagePassing, NodeUpdate,
    SendingNodes, WeightedSendingNodes, gin_conv,
};
pub use dense::{Activation, Dense, DenseConfig, Init, Mlp, MlpConfig};
pub use gather::{
    GatherEdgesPairs, GatherEmbedding, GatherEmbeddingConfig, GatherEmbeddingSelection,
    GatherNodes, GatherNodesIngoing, GatherNodesOutgoing, GatherNodesSelection, GatherState,
    Gathered, SelectionConfig,
};
pub use geom::{GaussBasisConfig, GaussBasisLayer, NodeDistanceEuclidean, NodePosition};
pub use pooling::{
    PoolingLocalEdges, PoolingLocalEdgesAttention, PoolingLocalMessages, PoolingNodes,
    PoolingWeightedLocalEdges, RelationalPoolingConfig, RelationalPoolingLocalEdges, UnmappedPolicy,
    softmax_local_edges,
};
pub use registry::{
    AnyLayer, LAYER_REGISTRY, LayerEntry, LayerMeta, deserialize_layer, find_layer, serialize_layer,
};

use crate::errors::GnnError;
use crate::graph::global_indices;
use crate::ragged::Ragged;

#[cfg(test)]
mod tests;

/// 校验选择索引都落在元组长度内
pub(crate) fn check_selection(selection: &[usize], arity: usize) -> Result<(), GnnError> {
    match selection.iter().find(|&&i| i >= arity) {
        Some(&index) => Err(GnnError::SelectionOutOfRange { index, arity }),
        None => Ok(()),
    }
}

/// 索引元组第`position`个位置对应的全局节点行号（每条边一个）
pub(crate) fn endpoint_rows<B>(
    nodes: &Ragged<B>,
    index: &Ragged<usize>,
    position: usize,
) -> Result<Vec<usize>, GnnError> {
    check_selection(&[position], index.feature_dim())?;
    let global = global_indices(index.values().view(), nodes, index)?;
    Ok(global.column(position).to_vec())
}
