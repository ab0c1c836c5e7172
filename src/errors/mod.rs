/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 全库统一的错误类型。所有结构性错误都在调用时同步返回，不做重试、也不返回部分结果
 */

use thiserror::Error;
mod kinds;
pub use self::kinds::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GnnError {
    // 行划分本身不合法（如首元素不为0、非单调、末元素与数据行数不符）
    #[error("{partition}无效：{reason}")]
    InvalidPartition {
        partition: PartitionKind,
        reason: String,
    },
    // 两种划分所隐含的图（样本）个数不一致
    #[error("批结构不一致：{left}隐含{left_rows}个图，而{right}隐含{right_rows}个图")]
    PartitionMismatch {
        left: PartitionKind,
        left_rows: usize,
        right: PartitionKind,
        right_rows: usize,
    },
    // 局部索引越界
    #[error(
        "索引越界：第{graph}个图的第{row}个索引元组（位置{position}）的值为{index}，但该图的有效范围为[{lower}, {upper})"
    )]
    IndexOutOfBounds {
        graph: usize,
        row: usize,
        position: usize,
        index: usize,
        lower: usize,
        upper: usize,
    },
    // 两个不规则张量的行划分不同（通常意味着来自不同批次）
    #[error("{context}：两个不规则张量的行划分不一致，左为{left:?}，右为{right:?}")]
    RaggedStructureMismatch {
        context: String,
        left: Vec<usize>,
        right: Vec<usize>,
    },
    #[error("形状不一致（{context}）：期望{expected:?}，实际{got:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("配置冲突：{0}")]
    AmbiguousConfig(String),
    #[error("无法推断{what}，请手动指定`{hint}`")]
    CannotInferIndices { what: String, hint: String },
    #[error("选择索引{index}超出索引元组的长度{arity}")]
    SelectionOutOfRange { index: usize, arity: usize },
    #[error("遇到未映射的类别（第{row}行）：{context}")]
    UnmappedCategory { row: usize, context: String },
    #[error("第{row}行的关系编号{relation}须{operator}{num_relations}")]
    RelationOutOfRange {
        row: usize,
        relation: usize,
        operator: ComparisonOperator,
        num_relations: usize,
    },
    #[error("索引值{value}（第{row}行）无法转换为非负索引")]
    NegativeIndex { row: usize, value: String },
    #[error("无效配置：{0}")]
    InvalidConfig(String),
    #[error("未注册的层：{0}")]
    UnknownLayer(String),
}

impl From<serde_json::Error> for GnnError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
