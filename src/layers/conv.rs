/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 消息传递模板：gather 端点 -> 计算消息 -> 聚合到接收节点 -> 节点更新
 *
 * 具体的卷积（GIN、SchNet 的 cfconv 等）只需提供消息函数与更新方式。
 * 结构不一致（边特征与边索引来自不同批次、消息行数不对）一律在计算前报错。
 */

use super::dense::Dense;
use super::gather::{GatherNodesIngoing, GatherNodesOutgoing};
use super::pooling::{PoolingLocalEdges, scale_rows};
use crate::errors::GnnError;
use crate::ops::Reduction;
use crate::ragged::Ragged;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// 消息函数的输入，三者的行都与边一一对应
#[derive(Debug, Clone, Copy)]
pub struct EdgeInputs<'a> {
    /// 接收端特征`h_i`
    pub receiving: &'a Ragged<f32>,
    /// 发送端特征`h_j`
    pub sending: &'a Ragged<f32>,
    /// 边特征`e_ij`（可选）
    pub edges: Option<&'a Ragged<f32>>,
}

/// 消息函数：每条边产出一行消息，结果形状`[M, F']`
pub trait MessageFunction {
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError>;
}

impl<F> MessageFunction for F
where
    F: Fn(&EdgeInputs<'_>) -> Result<Array2<f32>, GnnError>,
{
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError> {
        self(inputs)
    }
}

/// 聚合之后的节点更新方式
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum NodeUpdate {
    /// `h_i' = agg_i`
    #[default]
    Replace,
    /// `h_i' = self_weight · h_i + agg_i`，要求两者宽度一致
    Residual { self_weight: f32 },
    /// `h_i' = h_i ‖ agg_i`
    Concat,
}

/// 消息传递层
///
/// # 使用示例
/// ```ignore
/// let conv = MessagePassing::new(|inputs: &EdgeInputs<'_>| Ok(inputs.sending.values().clone()))
///     .with_reduction(Reduction::Mean);
/// let h = conv.forward(batch.nodes(), None, batch.edge_indices())?;
/// ```
#[derive(Debug, Clone)]
pub struct MessagePassing<M> {
    message: M,
    reduction: Reduction,
    update: NodeUpdate,
    receiving_index: usize,
    sending_index: usize,
}

impl<M: MessageFunction> MessagePassing<M> {
    pub fn new(message: M) -> Self {
        Self {
            message,
            reduction: Reduction::Sum,
            update: NodeUpdate::Replace,
            receiving_index: 0,
            sending_index: 1,
        }
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_update(mut self, update: NodeUpdate) -> Self {
        self.update = update;
        self
    }

    /// 修改索引元组中接收端/发送端所在的位置（默认0/1）
    pub fn with_indices(mut self, receiving_index: usize, sending_index: usize) -> Self {
        self.receiving_index = receiving_index;
        self.sending_index = sending_index;
        self
    }

    pub const fn message_function(&self) -> &M {
        &self.message
    }

    pub const fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub const fn update(&self) -> NodeUpdate {
        self.update
    }

    /// * `nodes` - 节点特征`[N, F]`
    /// * `edges` - 边特征`[M, E]`（可选），行划分须与`index`一致
    /// * `index` - 局部边索引`[M, k]`
    pub fn forward(
        &self,
        nodes: &Ragged<f32>,
        edges: Option<&Ragged<f32>>,
        index: &Ragged<usize>,
    ) -> Result<Ragged<f32>, GnnError> {
        if let Some(edges) = edges {
            edges.ensure_same_partition(index, "MessagePassing：边特征与边索引")?;
        }
        let receiving = GatherNodesIngoing {
            selection_index: self.receiving_index,
        }
        .forward(nodes, index)?;
        let sending = GatherNodesOutgoing {
            selection_index: self.sending_index,
        }
        .forward(nodes, index)?;

        let messages = self.message.message(&EdgeInputs {
            receiving: &receiving,
            sending: &sending,
            edges,
        })?;
        if messages.nrows() != index.total_len() {
            return Err(GnnError::ShapeMismatch {
                context: "MessagePassing：消息的行数须等于边数".to_string(),
                expected: vec![index.total_len()],
                got: vec![messages.nrows()],
            });
        }
        let messages = index.with_values(messages)?;
        tracing::trace!(
            graphs = nodes.nrows(),
            edges = messages.total_len(),
            width = messages.feature_dim(),
            "消息传递"
        );

        let aggregated = PoolingLocalEdges {
            reduction: self.reduction,
            pooling_index: self.receiving_index,
        }
        .forward(nodes, &messages, index)?;

        match self.update {
            NodeUpdate::Replace => Ok(aggregated),
            NodeUpdate::Residual { self_weight } => {
                if nodes.feature_dim() != aggregated.feature_dim() {
                    return Err(GnnError::ShapeMismatch {
                        context: "MessagePassing：残差更新要求节点特征与聚合结果宽度一致".to_string(),
                        expected: vec![nodes.feature_dim()],
                        got: vec![aggregated.feature_dim()],
                    });
                }
                let updated = nodes.values() * self_weight + aggregated.values();
                nodes.with_values(updated)
            }
            NodeUpdate::Concat => Ragged::concat_features(&[nodes, &aggregated]),
        }
    }
}

// ==================== 常用消息函数 ====================

/// 直接以发送端特征为消息（GIN 的邻居求和）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendingNodes;

impl MessageFunction for SendingNodes {
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError> {
        Ok(inputs.sending.values().clone())
    }
}

/// 对`[h_i ‖ h_j ‖ e_ij]`施加一个 Dense 层（无边特征时为`[h_i ‖ h_j]`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMessage {
    pub dense: Dense,
}

impl MessageFunction for DenseMessage {
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError> {
        let mut parts = vec![inputs.receiving, inputs.sending];
        parts.extend(inputs.edges);
        let stacked = Ragged::concat_features(&parts)?;
        self.dense.forward(stacked.values().view())
    }
}

/// 连续滤波卷积（SchNet cfconv）：`m_ij = h_j ⊙ W(e_ij)`，
/// 其中`e_ij`通常是距离的高斯展开
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousFilter {
    pub filter: Dense,
}

impl MessageFunction for ContinuousFilter {
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError> {
        let Some(edges) = inputs.edges else {
            return Err(GnnError::InvalidConfig(
                "ContinuousFilter 需要边特征（如距离的高斯展开）".to_string(),
            ));
        };
        let weights = self.filter.forward(edges.values().view())?;
        let sending = inputs.sending.values();
        if weights.raw_dim() != sending.raw_dim() {
            return Err(GnnError::ShapeMismatch {
                context: "ContinuousFilter：滤波器输出须与发送端特征同形".to_string(),
                expected: sending.shape().to_vec(),
                got: weights.shape().to_vec(),
            });
        }
        Ok(sending * &weights)
    }
}

/// 带标量权重的消息：`m_ij = w_ij · h_j`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightedSendingNodes;

impl MessageFunction for WeightedSendingNodes {
    fn message(&self, inputs: &EdgeInputs<'_>) -> Result<Array2<f32>, GnnError> {
        let Some(weights) = inputs.edges else {
            return Err(GnnError::InvalidConfig(
                "WeightedSendingNodes 需要每条边一个权重".to_string(),
            ));
        };
        if weights.feature_dim() != 1 {
            return Err(GnnError::ShapeMismatch {
                context: "WeightedSendingNodes：边权的宽度".to_string(),
                expected: vec![1],
                got: vec![weights.feature_dim()],
            });
        }
        Ok(scale_rows(inputs.sending.values(), weights.values()))
    }
}

/// GIN 卷积：`h_i' = (1 + ε) · h_i + Σ_{j ∈ N(i)} h_j`（之后通常再接一个 Mlp）
pub fn gin_conv(epsilon: f32) -> MessagePassing<SendingNodes> {
    MessagePassing::new(SendingNodes).with_update(NodeUpdate::Residual {
        self_weight: 1.0 + epsilon,
    })
}

