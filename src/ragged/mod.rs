/*
 * @Author       : 老董
 * @Date         : 2026-02-03
 * @Description  : 不规则（ragged）张量：扁平数据 + 行分割点
 *
 * 批次内每个样本（图）的行数（节点数、边数）可以不同，这里统一表示为：
 * - `values`：所有样本按顺序拼接后的二维数组`[总行数, 特征维度]`；
 * - `row_splits`：长度为`批大小+1`的累计偏移，第i个样本占据`values[row_splits[i]..row_splits[i+1]]`。
 * 构造函数负责校验不变量，之后的只读操作无需再次校验。
 */

mod partition;

pub use partition::{
    Indexing, RowPartition, partition_row_indexing, row_lengths_from_splits,
    row_splits_from_lengths, validate_row_splits, value_rowids_from_splits,
};

use crate::errors::GnnError;
use ndarray::{Array2, ArrayView2, Axis, s};
use num_traits::PrimInt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;


/// 不规则张量。`A`既可以是特征（`f32`），也可以是索引（`usize`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RaggedRepr<A>",
    bound(deserialize = "A: Deserialize<'de>")
)]
pub struct Ragged<A> {
    values: Array2<A>,
    row_splits: Vec<usize>,
}

/// 反序列化的中间形式，转换为`Ragged`前校验行分割点
#[derive(Deserialize)]
struct RaggedRepr<A> {
    values: Array2<A>,
    row_splits: Vec<usize>,
}

impl<A> TryFrom<RaggedRepr<A>> for Ragged<A> {
    type Error = GnnError;

    fn try_from(repr: RaggedRepr<A>) -> Result<Self, Self::Error> {
        validate_row_splits(&repr.row_splits, Some(repr.values.nrows()))?;
        Ok(Self {
            values: repr.values,
            row_splits: repr.row_splits,
        })
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓构造↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl<A: Clone> Ragged<A> {
    pub fn from_row_splits(values: Array2<A>, row_splits: Vec<usize>) -> Result<Self, GnnError> {
        validate_row_splits(&row_splits, Some(values.nrows()))?;
        Ok(Self { values, row_splits })
    }

    pub fn from_row_lengths(values: Array2<A>, row_lengths: &[usize]) -> Result<Self, GnnError> {
        Self::from_partition(values, &RowPartition::RowLengths(row_lengths.to_vec()))
    }

    pub fn from_value_rowids(
        values: Array2<A>,
        value_rowids: &[usize],
        nrows: usize,
    ) -> Result<Self, GnnError> {
        Self::from_partition(
            values,
            &RowPartition::ValueRowIds {
                ids: value_rowids.to_vec(),
                nrows,
            },
        )
    }

    pub fn from_partition(values: Array2<A>, partition: &RowPartition) -> Result<Self, GnnError> {
        partition.validate(values.nrows())?;
        let row_splits = partition.to_row_splits()?;
        Ok(Self { values, row_splits })
    }

    /// 将各样本的矩阵`[n_i, F]`按顺序拼接。
    /// 允许`n_i == 0`（无节点的图）；各样本的特征维度`F`必须一致。
    /// 空批次得到形状为`[0, 0]`、行分割点为`[0]`的张量。
    pub fn from_samples(samples: &[Array2<A>]) -> Result<Self, GnnError> {
        let width = samples.first().map_or(0, |s| s.ncols());
        let mut row_lengths = Vec::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            if sample.ncols() != width {
                return Err(GnnError::ShapeMismatch {
                    context: format!("from_samples：第{i}个样本的特征维度"),
                    expected: vec![width],
                    got: vec![sample.ncols()],
                });
            }
            row_lengths.push(sample.nrows());
        }
        let total: usize = row_lengths.iter().sum();
        let mut data = Vec::with_capacity(total * width);
        for sample in samples {
            data.extend(sample.iter().cloned());
        }
        let values =
            Array2::from_shape_vec((total, width), data).map_err(|_| GnnError::ShapeMismatch {
                context: "from_samples：拼接结果".to_string(),
                expected: vec![total, width],
                got: vec![total * width],
            })?;
        Ok(Self {
            values,
            row_splits: row_splits_from_lengths(&row_lengths),
        })
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑构造↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓属性↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl<A> Ragged<A> {
    pub const fn values(&self) -> &Array2<A> {
        &self.values
    }

    pub fn into_values(self) -> Array2<A> {
        self.values
    }

    pub fn row_splits(&self) -> &[usize] {
        &self.row_splits
    }

    pub fn row_lengths(&self) -> Vec<usize> {
        row_lengths_from_splits(&self.row_splits)
    }

    /// 每一行所属的样本编号
    pub fn value_rowids(&self) -> Vec<usize> {
        value_rowids_from_splits(&self.row_splits)
    }

    pub fn partition(&self) -> RowPartition {
        RowPartition::RowSplits(self.row_splits.clone())
    }

    /// 批大小（样本个数）
    pub fn nrows(&self) -> usize {
        self.row_splits.len() - 1
    }

    /// 所有样本的总行数
    pub fn total_len(&self) -> usize {
        self.values.nrows()
    }

    pub fn feature_dim(&self) -> usize {
        self.values.ncols()
    }

    /// 第`i`个样本在扁平数据中的行范围
    pub fn row_range(&self, i: usize) -> Option<Range<usize>> {
        (i < self.nrows()).then(|| self.row_splits[i]..self.row_splits[i + 1])
    }

    pub fn sample(&self, i: usize) -> Option<ArrayView2<'_, A>> {
        self.row_range(i)
            .map(|range| self.values.slice(s![range, ..]))
    }

    pub fn same_partition<B>(&self, other: &Ragged<B>) -> bool {
        self.row_splits == other.row_splits
    }

    /// 行划分不一致时立即报错，而不是按错误的形状继续计算
    pub fn ensure_same_partition<B>(&self, other: &Ragged<B>, context: &str) -> Result<(), GnnError> {
        if self.same_partition(other) {
            Ok(())
        } else {
            Err(GnnError::RaggedStructureMismatch {
                context: context.to_string(),
                left: self.row_splits.clone(),
                right: other.row_splits.clone(),
            })
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑属性↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl<A: Clone> Ragged<A> {
    /// 还原为各样本的矩阵，与`from_samples`互逆
    pub fn to_samples(&self) -> Vec<Array2<A>> {
        (0..self.nrows())
            .filter_map(|i| self.sample(i).map(|v| v.to_owned()))
            .collect()
    }

    /// 沿用本张量的行划分，替换扁平数据（行数必须一致）
    pub fn with_values<B>(&self, values: Array2<B>) -> Result<Ragged<B>, GnnError> {
        if values.nrows() != self.total_len() {
            return Err(GnnError::ShapeMismatch {
                context: "with_values：扁平数据的行数".to_string(),
                expected: vec![self.total_len()],
                got: vec![values.nrows()],
            });
        }
        Ok(Ragged {
            values,
            row_splits: self.row_splits.clone(),
        })
    }

    /// 对扁平数据逐行施加变换（相当于对每个样本分别施加）。变换不得改变行数
    pub fn map_values<B, F>(&self, f: F) -> Result<Ragged<B>, GnnError>
    where
        F: FnOnce(ArrayView2<'_, A>) -> Array2<B>,
    {
        self.with_values(f(self.values.view()))
    }

    /// 沿特征维拼接多个行划分相同的不规则张量
    pub fn concat_features(parts: &[&Self]) -> Result<Self, GnnError> {
        let Some(first) = parts.first() else {
            return Err(GnnError::InvalidConfig(
                "concat_features：待拼接的列表为空".to_string(),
            ));
        };
        for part in &parts[1..] {
            first.ensure_same_partition(*part, "concat_features")?;
        }
        let views: Vec<_> = parts.iter().map(|p| p.values.view()).collect();
        let values = ndarray::concatenate(Axis(1), &views).map_err(|_| GnnError::ShapeMismatch {
            context: "concat_features".to_string(),
            expected: vec![first.total_len()],
            got: parts.iter().map(|p| p.total_len()).collect(),
        })?;
        first.with_values(values)
    }
}

impl<I: PrimInt + Display> Ragged<I> {
    /// 将数据加载器给出的整型索引（如`i64`）转换为`usize`索引，负数直接报错
    pub fn to_indices(&self) -> Result<Ragged<usize>, GnnError> {
        let mut data = Vec::with_capacity(self.values.len());
        for (row, lane) in self.values.rows().into_iter().enumerate() {
            for value in lane.iter() {
                let index = value.to_usize().ok_or_else(|| GnnError::NegativeIndex {
                    row,
                    value: value.to_string(),
                })?;
                data.push(index);
            }
        }
        let values = Array2::from_shape_vec(self.values.raw_dim(), data).map_err(|_| {
            GnnError::ShapeMismatch {
                context: "to_indices".to_string(),
                expected: self.values.shape().to_vec(),
                got: vec![self.values.len()],
            }
        })?;
        self.with_values(values)
    }
}
