//! Gather 系列层的单元测试

use crate::errors::GnnError;
use crate::layers::{
    GatherEdgesPairs, GatherEmbedding, GatherEmbeddingConfig, GatherEmbeddingSelection,
    GatherNodesIngoing, GatherNodesOutgoing, GatherState, Gathered,
};
use crate::ragged::Ragged;
use ndarray::{Array2, array};

/// 两个图：2个节点、3个节点；节点特征即全局行号
fn nodes() -> Result<Ragged<f32>, GnnError> {
    Ragged::from_row_lengths(array![[0.0], [1.0], [2.0], [3.0], [4.0]], &[2, 3])
}

fn edges() -> Result<Ragged<usize>, GnnError> {
    Ragged::from_row_lengths(array![[0, 1], [1, 0], [0, 2], [1, 2]], &[2, 2])
}

#[test]
fn test_gather_concat_follows_requested_order() -> Result<(), GnnError> {
    let layer = GatherEmbedding::concat(Some(vec![1, 0]));
    let out = layer.forward(&nodes()?, &edges()?)?.into_concat();
    let out = out.ok_or_else(|| GnnError::InvalidConfig("期望拼接结果".to_string()))?;
    // 先发送端再接收端，不排序
    assert_eq!(out.values(), &array![[1.0, 0.0], [0.0, 1.0], [4.0, 2.0], [4.0, 3.0]]);
    assert_eq!(out.row_splits(), &[0, 2, 4]);
    Ok(())
}

#[test]
fn test_gather_default_concat() -> Result<(), GnnError> {
    let out = GatherEmbedding::default().forward(&nodes()?, &edges()?)?;
    assert_eq!(
        out,
        Gathered::Concat(Ragged::from_row_lengths(
            array![[0.0, 1.0], [1.0, 0.0], [2.0, 4.0], [3.0, 4.0]],
            &[2, 2]
        )?)
    );
    Ok(())
}

#[test]
fn test_gather_split() -> Result<(), GnnError> {
    let out = GatherEmbedding::split(None)
        .forward(&nodes()?, &edges()?)?
        .into_split()
        .unwrap_or_default();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].values().column(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(out[1].values().column(0).to_vec(), vec![1.0, 0.0, 4.0, 4.0]);
    Ok(())
}

#[test]
fn test_gather_stacked() -> Result<(), GnnError> {
    let layer = GatherEmbedding::new(GatherEmbeddingConfig {
        concat: false,
        ..GatherEmbeddingConfig::default()
    })?;
    match layer.forward(&nodes()?, &edges()?)? {
        Gathered::Stacked { values, arity } => {
            assert_eq!(arity, 2);
            assert_eq!(values.values().row(2).to_vec(), vec![2.0, 4.0]);
        }
        other => panic!("期望 Stacked，实际为{other:?}"),
    }
    Ok(())
}

#[test]
fn test_ambiguous_config_rejected_at_construction() {
    let config = GatherEmbeddingConfig {
        concat: true,
        split: true,
        ..GatherEmbeddingConfig::default()
    };
    assert!(matches!(
        GatherEmbedding::new(config),
        Err(GnnError::AmbiguousConfig(_))
    ));
}

#[test]
fn test_indices_without_matching_mode_rejected() {
    let stacked_with_order = GatherEmbeddingConfig {
        concat: false,
        concat_indices: Some(vec![1, 0]),
        ..GatherEmbeddingConfig::default()
    };
    assert!(matches!(
        GatherEmbedding::new(stacked_with_order),
        Err(GnnError::InvalidConfig(_))
    ));

    let concat_with_split_order = GatherEmbeddingConfig {
        split_indices: Some(vec![0]),
        ..GatherEmbeddingConfig::default()
    };
    assert!(matches!(
        GatherEmbedding::new(concat_with_split_order),
        Err(GnnError::InvalidConfig(_))
    ));
}

#[test]
fn test_cannot_infer_indices() -> Result<(), GnnError> {
    let index = Ragged::from_row_lengths(Array2::<usize>::zeros((0, 0)), &[0, 0])?;
    let result = GatherEmbedding::default().forward(&nodes()?, &index);
    assert!(matches!(result, Err(GnnError::CannotInferIndices { .. })));
    Ok(())
}

#[test]
fn test_selection_triples() -> Result<(), GnnError> {
    let angles = Ragged::from_row_lengths(array![[0, 1, 1], [2, 0, 1]], &[1, 1])?;
    let out = GatherEmbeddingSelection::new(vec![2, 0])?.forward(&nodes()?, &angles)?;
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].values().column(0).to_vec(), vec![1.0, 3.0]);
    assert_eq!(out[1].values().column(0).to_vec(), vec![0.0, 4.0]);

    let err = GatherEmbeddingSelection::new(vec![3])?.forward(&nodes()?, &angles);
    assert_eq!(err, Err(GnnError::SelectionOutOfRange { index: 3, arity: 3 }));
    Ok(())
}

#[test]
fn test_gather_generic_element_type() -> Result<(), GnnError> {
    let numbers = Ragged::from_row_lengths(array![[1_usize], [6], [6], [8], [1]], &[2, 3])?;
    let out = GatherNodesOutgoing::default().forward(&numbers, &edges()?)?;
    assert_eq!(out.values().column(0).to_vec(), vec![6, 1, 1, 1]);
    let out = GatherNodesIngoing::default().forward(&numbers, &edges()?)?;
    assert_eq!(out.values().column(0).to_vec(), vec![1, 6, 6, 8]);
    Ok(())
}

#[test]
fn test_gather_zero_node_graph() -> Result<(), GnnError> {
    let nodes = Ragged::from_row_lengths(array![[0.0], [1.0], [2.0]], &[2, 0, 1])?;
    let index = Ragged::from_row_lengths(array![[0, 1], [0, 0]], &[1, 0, 1])?;
    let out = GatherNodesOutgoing::default().forward(&nodes, &index)?;
    assert_eq!(out.values().column(0).to_vec(), vec![1.0, 2.0]);
    assert_eq!(out.row_lengths(), vec![1, 0, 1]);
    Ok(())
}

#[test]
fn test_gather_state() -> Result<(), GnnError> {
    let state = array![[10.0, 11.0], [20.0, 21.0]];
    let out = GatherState {}.forward(&state, &nodes()?)?;
    assert_eq!(out.values().column(0).to_vec(), vec![10.0, 10.0, 20.0, 20.0, 20.0]);

    let wrong = GatherState {}.forward(&array![[1.0]], &nodes()?);
    assert!(matches!(wrong, Err(GnnError::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn test_gather_edge_pairs() -> Result<(), GnnError> {
    let edge_features = Ragged::from_row_lengths(array![[1.0], [2.0], [3.0], [4.0]], &[2, 2])?;
    let pairs = Ragged::from_row_lengths(array![[1_i64], [0], [-1], [0]], &[2, 2])?;
    let out = GatherEdgesPairs {}.forward(&edge_features, &pairs)?;
    // 第二个图的配对索引是局部的：0 指向第3行
    assert_eq!(out.values().column(0).to_vec(), vec![2.0, 1.0, 0.0, 3.0]);

    let bad = Ragged::from_row_lengths(array![[1_i64], [0], [2], [0]], &[2, 2])?;
    assert!(matches!(
        GatherEdgesPairs {}.forward(&edge_features, &bad),
        Err(GnnError::IndexOutOfBounds { graph: 1, .. })
    ));
    Ok(())
}
