//! 聚合层的单元测试

use crate::errors::{ComparisonOperator, GnnError};
use crate::layers::{
    PoolingLocalEdges, PoolingLocalEdgesAttention, PoolingNodes, PoolingWeightedLocalEdges,
    RelationalPoolingLocalEdges, UnmappedPolicy, softmax_local_edges,
};
use crate::ops::Reduction;
use crate::ragged::Ragged;
use crate::relation::UNMAPPED;
use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};

/// 一个图3个节点，节点0收到三条边（来自1、2、1），节点1、2没有入边
fn star() -> Result<(Ragged<f32>, Ragged<usize>), GnnError> {
    let nodes = Ragged::from_row_lengths(Array2::<f32>::zeros((3, 1)), &[3])?;
    let index = Ragged::from_row_lengths(array![[0, 1], [0, 2], [0, 1]], &[3])?;
    Ok((nodes, index))
}

#[test]
fn test_pooling_local_edges() -> Result<(), GnnError> {
    let (nodes, index) = star()?;
    let edges = index.with_values(array![[1.0_f32], [2.0], [3.0]])?;

    let sum = PoolingLocalEdges::new(Reduction::Sum).forward(&nodes, &edges, &index)?;
    assert_eq!(sum.values(), &array![[6.0], [0.0], [0.0]]);
    assert!(sum.same_partition(&nodes));

    let mean = PoolingLocalEdges::new(Reduction::Mean).forward(&nodes, &edges, &index)?;
    assert_eq!(mean.values(), &array![[2.0], [0.0], [0.0]]);

    let max = PoolingLocalEdges::new(Reduction::Max).forward(&nodes, &edges, &index)?;
    assert_eq!(max.values(), &array![[3.0], [0.0], [0.0]]);
    Ok(())
}

#[test]
fn test_pooling_to_sending_nodes() -> Result<(), GnnError> {
    let (nodes, index) = star()?;
    let edges = index.with_values(array![[1.0_f32], [2.0], [3.0]])?;
    let layer = PoolingLocalEdges {
        reduction: Reduction::Sum,
        pooling_index: 1,
    };
    let out = layer.forward(&nodes, &edges, &index)?;
    assert_eq!(out.values(), &array![[0.0], [4.0], [2.0]]);
    Ok(())
}

#[test]
fn test_pooling_zero_node_and_zero_edge_graphs() -> Result<(), GnnError> {
    // 第0个图没有节点，第1个图有节点但没有边
    let nodes = Ragged::from_row_lengths(Array2::<f32>::zeros((4, 2)), &[0, 2, 2])?;
    let index = Ragged::from_row_lengths(array![[1, 0]], &[0, 0, 1])?;
    let edges = index.with_values(array![[1.0_f32, 2.0]])?;
    let out = PoolingLocalEdges::default().forward(&nodes, &edges, &index)?;
    assert_eq!(out.row_lengths(), vec![0, 2, 2]);
    assert_eq!(out.values(), &array![[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [1.0, 2.0]]);

    let graphs = PoolingNodes::new(Reduction::Mean).forward(&out)?;
    assert_eq!(graphs, array![[0.0, 0.0], [0.0, 0.0], [0.5, 1.0]]);
    Ok(())
}

#[test]
fn test_pooling_rejects_mismatched_edges() -> Result<(), GnnError> {
    let (nodes, index) = star()?;
    let edges = Ragged::from_row_lengths(array![[1.0_f32], [2.0], [3.0]], &[3, 0])?;
    assert!(matches!(
        PoolingLocalEdges::default().forward(&nodes, &edges, &index),
        Err(GnnError::RaggedStructureMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_weighted_pooling() -> Result<(), GnnError> {
    let (nodes, index) = star()?;
    let edges = index.with_values(array![[1.0_f32], [2.0], [3.0]])?;
    let weights = index.with_values(array![[1.0_f32], [0.5], [2.0]])?;

    let plain = PoolingWeightedLocalEdges::default().forward(&nodes, &edges, &index, &weights)?;
    assert_eq!(plain.values()[[0, 0]], 8.0);

    let normalized = PoolingWeightedLocalEdges {
        normalize_by_weights: true,
        ..PoolingWeightedLocalEdges::default()
    }
    .forward(&nodes, &edges, &index, &weights)?;
    assert_abs_diff_eq!(normalized.values()[[0, 0]], 8.0 / 3.5, epsilon = 1e-6);
    assert_eq!(normalized.values()[[1, 0]], 0.0);
    Ok(())
}

#[test]
fn test_attention_pooling() -> Result<(), GnnError> {
    let (nodes, index) = star()?;
    let edges = index.with_values(array![[1.0_f32], [2.0], [3.0]])?;
    let logits = index.with_values(array![[0.0_f32], [0.0], [0.0]])?;

    let alpha = softmax_local_edges(&nodes, &logits, &index, 0)?;
    for &a in alpha.values() {
        assert_abs_diff_eq!(a, 1.0 / 3.0, epsilon = 1e-6);
    }

    let out = PoolingLocalEdgesAttention::default().forward(&nodes, &edges, &logits, &index)?;
    assert_abs_diff_eq!(out.values()[[0, 0]], 2.0, epsilon = 1e-6);
    assert_eq!(out.values()[[2, 0]], 0.0);
    Ok(())
}

#[test]
fn test_relational_pooling_keeps_relations_apart() -> Result<(), GnnError> {
    let nodes = Ragged::from_row_lengths(Array2::<f32>::zeros((3, 1)), &[3])?;
    let index = Ragged::from_row_lengths(array![[0, 1], [0, 2]], &[2])?;
    let edges = index.with_values(array![[5.0_f32], [7.0]])?;
    let relations = index.with_values(array![[0_usize], [1]])?;

    let layer = RelationalPoolingLocalEdges::new(2, Reduction::Sum)?;
    let out = layer.forward(&nodes, &edges, &relations, &index)?;
    assert_eq!(out.values().row(0).to_vec(), vec![5.0, 7.0]);
    assert_eq!(out.values().row(1).to_vec(), vec![0.0, 0.0]);
    Ok(())
}

#[test]
fn test_relational_pooling_relation_major_layout() -> Result<(), GnnError> {
    let nodes = Ragged::from_row_lengths(Array2::<f32>::zeros((2, 1)), &[2])?;
    let index = Ragged::from_row_lengths(array![[1, 0], [1, 0], [0, 1]], &[3])?;
    let edges = index.with_values(array![[1.0_f32, 10.0], [2.0, 20.0], [3.0, 30.0]])?;
    let relations = index.with_values(array![[2_usize], [0], [2]])?;

    let out = RelationalPoolingLocalEdges::new(3, Reduction::Sum)?
        .forward(&nodes, &edges, &relations, &index)?;
    assert_eq!(out.feature_dim(), 6);
    assert_eq!(out.values().row(0).to_vec(), vec![0.0, 0.0, 0.0, 0.0, 3.0, 30.0]);
    assert_eq!(out.values().row(1).to_vec(), vec![2.0, 20.0, 0.0, 0.0, 1.0, 10.0]);
    Ok(())
}

#[test]
fn test_relational_pooling_sentinel() -> Result<(), GnnError> {
    let nodes = Ragged::from_row_lengths(Array2::<f32>::zeros((2, 1)), &[2])?;
    let index = Ragged::from_row_lengths(array![[0, 1], [0, 1]], &[2])?;
    let edges = index.with_values(array![[5.0_f32], [7.0]])?;
    let relations = index.with_values(array![[1_usize], [UNMAPPED]])?;

    // 默认跳过，不会回绕到任何合法的关系槽位
    let skip = RelationalPoolingLocalEdges::new(2, Reduction::Sum)?;
    let out = skip.forward(&nodes, &edges, &relations, &index)?;
    assert_eq!(out.values().row(0).to_vec(), vec![0.0, 5.0]);

    let strict = skip.with_unmapped(UnmappedPolicy::Error);
    assert!(matches!(
        strict.forward(&nodes, &edges, &relations, &index),
        Err(GnnError::UnmappedCategory { row: 1, .. })
    ));

    let out_of_range = index.with_values(array![[1_usize], [2]])?;
    assert_eq!(
        skip.forward(&nodes, &edges, &out_of_range, &index),
        Err(GnnError::RelationOutOfRange {
            row: 1,
            relation: 2,
            operator: ComparisonOperator::LessThan,
            num_relations: 2,
        })
    );
    Ok(())
}

#[test]
fn test_relational_pooling_requires_relations() {
    assert!(matches!(
        RelationalPoolingLocalEdges::new(0, Reduction::Sum),
        Err(GnnError::InvalidConfig(_))
    ));
}
