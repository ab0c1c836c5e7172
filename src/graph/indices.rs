/*
 * @Author       : 老董
 * @Date         : 2026-02-06
 * @Description  : 由单个图的局部边索引派生其它索引表（角索引、反向边索引）
 */

use crate::errors::GnnError;
use ndarray::Array2;
use std::collections::HashMap;

/// 由边索引`[m, 2]`（约定第0列为接收端i、第1列为发送端j）生成角索引`[a, 3]`。
/// 每个三元组`(i, j, k)`表示以i为顶点、j与k均为i的邻居且`j != k`的一个角。
/// 三元组按i升序、再按边出现顺序排列，结果可直接作为对称函数层的输入。
/// 自环不构成角；任一端点不在`[0, num_nodes)`内时报错。
pub fn angle_indices(
    edge_indices: &Array2<usize>,
    num_nodes: usize,
) -> Result<Array2<usize>, GnnError> {
    if edge_indices.ncols() < 2 {
        return Err(GnnError::ShapeMismatch {
            context: "angle_indices：边索引的列数".to_string(),
            expected: vec![2],
            got: vec![edge_indices.ncols()],
        });
    }
    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    for (row, edge) in edge_indices.rows().into_iter().enumerate() {
        for position in 0..2 {
            if edge[position] >= num_nodes {
                return Err(GnnError::IndexOutOfBounds {
                    graph: 0,
                    row,
                    position,
                    index: edge[position],
                    lower: 0,
                    upper: num_nodes,
                });
            }
        }
        let (i, j) = (edge[0], edge[1]);
        if i != j {
            neighbours[i].push(j);
        }
    }
    let mut data = Vec::new();
    for (i, nb) in neighbours.iter().enumerate() {
        for &j in nb {
            for &k in nb {
                if j != k {
                    data.extend_from_slice(&[i, j, k]);
                }
            }
        }
    }
    let rows = data.len() / 3;
    Array2::from_shape_vec((rows, 3), data).map_err(|_| GnnError::ShapeMismatch {
        context: "angle_indices：角索引".to_string(),
        expected: vec![rows, 3],
        got: vec![rows * 3],
    })
}

/// 对每条边`(i, j)`查找其反向边`(j, i)`的行号；不存在时为`-1`。
/// 结果形状为`[m, 1]`，可直接作为`GatherEdgesPairs`的配对索引
pub fn reverse_edge_pairs(edge_indices: &Array2<usize>) -> Array2<i64> {
    let mut lookup = HashMap::with_capacity(edge_indices.nrows());
    for (row, edge) in edge_indices.rows().into_iter().enumerate() {
        lookup.entry((edge[0], edge[1])).or_insert(row);
    }
    Array2::from_shape_fn((edge_indices.nrows(), 1), |(row, _)| {
        let (i, j) = (edge_indices[[row, 0]], edge_indices[[row, 1]]);
        lookup.get(&(j, i)).map_or(-1, |&r| r as i64)
    })
}
