/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 行划分（row partition）与分区行索引（partition row indexing）
 *
 * 同一批次中每个图的节点/边数量不同，这里负责：
 * - 行分割点、行长度、行编号三种表示之间的互相转换；
 * - 把每个图内的局部索引平移成整批扁平表上的全局索引（及其逆过程）。
 */

use crate::errors::{GnnError, PartitionKind};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// 一个批次的行划分，三种等价表示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPartition {
    /// 累计偏移，长度为`批大小+1`
    RowSplits(Vec<usize>),
    /// 每个样本的行数，长度为`批大小`
    RowLengths(Vec<usize>),
    /// 每一行所属的样本编号（须非递减），`nrows`为批大小
    ValueRowIds { ids: Vec<usize>, nrows: usize },
}

/// 索引的参照系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indexing {
    /// 每个图内部从0开始的局部索引
    Sample,
    /// 整批扁平表上的全局索引
    Batch,
}

impl RowPartition {
    pub const fn kind(&self) -> PartitionKind {
        match self {
            Self::RowSplits(_) => PartitionKind::RowSplits,
            Self::RowLengths(_) => PartitionKind::RowLengths,
            Self::ValueRowIds { .. } => PartitionKind::ValueRowIds,
        }
    }

    /// 划分所隐含的样本（图）个数
    pub fn nrows(&self) -> usize {
        match self {
            Self::RowSplits(splits) => splits.len().saturating_sub(1),
            Self::RowLengths(lengths) => lengths.len(),
            Self::ValueRowIds { nrows, .. } => *nrows,
        }
    }

    /// 转换为行分割点，同时校验划分本身的合法性
    pub fn to_row_splits(&self) -> Result<Vec<usize>, GnnError> {
        match self {
            Self::RowSplits(splits) => {
                validate_row_splits(splits, None)?;
                Ok(splits.clone())
            }
            Self::RowLengths(lengths) => Ok(row_splits_from_lengths(lengths)),
            Self::ValueRowIds { ids, nrows } => row_splits_from_value_rowids(ids, *nrows),
        }
    }

    pub fn to_row_lengths(&self) -> Result<Vec<usize>, GnnError> {
        match self {
            Self::RowLengths(lengths) => Ok(lengths.clone()),
            _ => Ok(row_lengths_from_splits(&self.to_row_splits()?)),
        }
    }

    pub fn to_value_rowids(&self) -> Result<Vec<usize>, GnnError> {
        match self {
            Self::ValueRowIds { ids, nrows } => {
                // 借助转换完成校验
                row_splits_from_value_rowids(ids, *nrows)?;
                Ok(ids.clone())
            }
            _ => Ok(value_rowids_from_splits(&self.to_row_splits()?)),
        }
    }

    /// 校验划分覆盖的总行数是否为`total`
    pub fn validate(&self, total: usize) -> Result<(), GnnError> {
        let splits = self.to_row_splits()?;
        let covered = splits.last().copied().unwrap_or(0);
        if covered != total {
            return Err(GnnError::InvalidPartition {
                partition: self.kind(),
                reason: format!("划分覆盖了{covered}行，但数据共有{total}行"),
            });
        }
        Ok(())
    }
}

/// 校验行分割点：非空、首元素为0、非递减，若给出`total`则末元素须等于它
pub fn validate_row_splits(splits: &[usize], total: Option<usize>) -> Result<(), GnnError> {
    let invalid = |reason: String| GnnError::InvalidPartition {
        partition: PartitionKind::RowSplits,
        reason,
    };
    let Some(&first) = splits.first() else {
        return Err(invalid("行分割点至少需要1个元素".to_string()));
    };
    if first != 0 {
        return Err(invalid(format!("首元素须为0，实际为{first}")));
    }
    if let Some(pos) = splits.windows(2).position(|w| w[1] < w[0]) {
        return Err(invalid(format!(
            "须非递减，但第{}个元素{}小于前一个元素{}",
            pos + 1,
            splits[pos + 1],
            splits[pos]
        )));
    }
    if let Some(total) = total {
        let last = splits[splits.len() - 1];
        if last != total {
            return Err(invalid(format!("末元素须等于总行数{total}，实际为{last}")));
        }
    }
    Ok(())
}

pub fn row_splits_from_lengths(lengths: &[usize]) -> Vec<usize> {
    let mut splits = Vec::with_capacity(lengths.len() + 1);
    splits.push(0);
    let mut acc = 0;
    for &len in lengths {
        acc += len;
        splits.push(acc);
    }
    splits
}

/// 注：调用方需保证`splits`已通过校验
pub fn row_lengths_from_splits(splits: &[usize]) -> Vec<usize> {
    splits.windows(2).map(|w| w[1] - w[0]).collect()
}

/// 注：调用方需保证`splits`已通过校验
pub fn value_rowids_from_splits(splits: &[usize]) -> Vec<usize> {
    let mut ids = Vec::with_capacity(splits.last().copied().unwrap_or(0));
    for (row, w) in splits.windows(2).enumerate() {
        ids.extend(std::iter::repeat(row).take(w[1] - w[0]));
    }
    ids
}

fn row_splits_from_value_rowids(ids: &[usize], nrows: usize) -> Result<Vec<usize>, GnnError> {
    let invalid = |reason: String| GnnError::InvalidPartition {
        partition: PartitionKind::ValueRowIds,
        reason,
    };
    let mut lengths = vec![0; nrows];
    let mut prev = 0;
    for (i, &id) in ids.iter().enumerate() {
        if id >= nrows {
            return Err(invalid(format!("第{i}个行编号{id}超出批大小{nrows}")));
        }
        if id < prev {
            return Err(invalid(format!("须非递减，但第{i}个行编号{id}小于{prev}")));
        }
        prev = id;
        lengths[id] += 1;
    }
    Ok(row_splits_from_lengths(&lengths))
}

/// 在局部（图内）索引与全局（整批）索引之间转换。
/// * `index` - 扁平的索引表，形状为`[M, k]`，每行是一个k元索引元组（边为2元，角为3元）
/// * `target_partition` - 被索引对象（通常是节点）的行划分
/// * `index_partition` - 索引表本身（通常是边）的行划分
///
/// `Sample -> Batch`：每个索引加上所属图的节点偏移；`Batch -> Sample`：减去偏移。
/// 两种划分隐含的图个数不同时报`PartitionMismatch`；任一索引落在所属图范围之外时报`IndexOutOfBounds`，
/// 不做截断或回绕。
pub fn partition_row_indexing(
    index: ArrayView2<'_, usize>,
    target_partition: &RowPartition,
    index_partition: &RowPartition,
    from_indexing: Indexing,
    to_indexing: Indexing,
) -> Result<Array2<usize>, GnnError> {
    let target_splits = target_partition.to_row_splits()?;
    let index_splits = index_partition.to_row_splits()?;
    if target_partition.nrows() != index_partition.nrows() {
        return Err(GnnError::PartitionMismatch {
            left: target_partition.kind(),
            left_rows: target_partition.nrows(),
            right: index_partition.kind(),
            right_rows: index_partition.nrows(),
        });
    }
    index_partition.validate(index.nrows())?;

    tracing::trace!(
        graphs = target_partition.nrows(),
        rows = index.nrows(),
        arity = index.ncols(),
        ?from_indexing,
        ?to_indexing,
        "partition_row_indexing"
    );

    let mut out = index.to_owned();
    for graph in 0..index_partition.nrows() {
        let offset = target_splits[graph];
        let end = target_splits[graph + 1];
        // 输入索引的合法范围
        let (lower, upper) = match from_indexing {
            Indexing::Sample => (0, end - offset),
            Indexing::Batch => (offset, end),
        };
        for row in index_splits[graph]..index_splits[graph + 1] {
            for position in 0..index.ncols() {
                let value = index[[row, position]];
                if value < lower || value >= upper {
                    return Err(GnnError::IndexOutOfBounds {
                        graph,
                        row: row - index_splits[graph],
                        position,
                        index: value,
                        lower,
                        upper,
                    });
                }
                out[[row, position]] = match (from_indexing, to_indexing) {
                    (Indexing::Sample, Indexing::Batch) => value + offset,
                    (Indexing::Batch, Indexing::Sample) => value - offset,
                    _ => value,
                };
            }
        }
    }
    Ok(out)
}
