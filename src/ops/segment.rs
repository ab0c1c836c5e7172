use crate::errors::GnnError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// 归约方式
///
/// 空分段（如没有入边的节点、没有节点的图）的结果对三种方式都定义为0：
/// `Max`也不使用负无穷，以免后续层出现非有限值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
    Max,
}

impl Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Max => "max",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Reduction {
    type Err = GnnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 兼容`segment_sum`、`reduce_mean`这类写法
        let name = s
            .trim()
            .trim_start_matches("segment_")
            .trim_start_matches("reduce_");
        match name.to_lowercase().as_str() {
            "sum" | "add" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            _ => Err(GnnError::InvalidConfig(format!(
                "不支持的归约方式`{s}`，可选：sum、mean、max"
            ))),
        }
    }
}

/// 无序分段归约：把`values`的第r行归约到第`segment_ids[r]`段。
/// * `values` - 形状`[R, F]`
/// * `segment_ids` - 长度为R，每个值须小于`num_segments`
///
/// 返回形状`[num_segments, F]`。按行顺序依次累加，结果与是否并行无关。
pub fn segment_reduce(
    values: ArrayView2<'_, f32>,
    segment_ids: &[usize],
    num_segments: usize,
    reduction: Reduction,
) -> Result<Array2<f32>, GnnError> {
    if segment_ids.len() != values.nrows() {
        return Err(GnnError::ShapeMismatch {
            context: "segment_reduce：分段编号的个数须与数据行数一致".to_string(),
            expected: vec![values.nrows()],
            got: vec![segment_ids.len()],
        });
    }
    let width = values.ncols();
    let mut out = Array2::<f32>::zeros((num_segments, width));
    let mut counts = vec![0usize; num_segments];

    for (row, &segment) in values.rows().into_iter().zip(segment_ids) {
        if segment >= num_segments {
            return Err(GnnError::ShapeMismatch {
                context: format!("segment_reduce：分段编号{segment}超出分段数"),
                expected: vec![num_segments],
                got: vec![segment + 1],
            });
        }
        let mut acc = out.row_mut(segment);
        match reduction {
            Reduction::Sum | Reduction::Mean => acc += &row,
            Reduction::Max => {
                if counts[segment] == 0 {
                    acc.assign(&row);
                } else {
                    Zip::from(&mut acc).and(&row).for_each(|a, &v| {
                        if v > *a {
                            *a = v;
                        }
                    });
                }
            }
        }
        counts[segment] += 1;
    }

    if reduction == Reduction::Mean {
        for (mut acc, &count) in out.rows_mut().into_iter().zip(&counts) {
            if count > 0 {
                acc /= count as f32;
            }
        }
    }
    Ok(out)
}

/// 分段softmax：在同一分段内对`logits`做softmax（减去段内最大值以保证数值稳定）
pub fn segment_softmax(
    logits: ArrayView1<'_, f32>,
    segment_ids: &[usize],
    num_segments: usize,
) -> Result<Array1<f32>, GnnError> {
    let column = logits.insert_axis(ndarray::Axis(1));
    let maxima = segment_reduce(column, segment_ids, num_segments, Reduction::Max)?;
    let exp: Array1<f32> = logits
        .iter()
        .zip(segment_ids)
        .map(|(&x, &s)| (x - maxima[[s, 0]]).exp())
        .collect();
    let sums = segment_reduce(
        exp.view().insert_axis(ndarray::Axis(1)),
        segment_ids,
        num_segments,
        Reduction::Sum,
    )?;
    Ok(exp
        .iter()
        .zip(segment_ids)
        .map(|(&e, &s)| e / sums[[s, 0]])
        .collect())
}
