//! GraphBatch 的单元测试

use crate::errors::GnnError;
use crate::graph::{GraphBatch, GraphSample};
use crate::ragged::Ragged;
use ndarray::{Array2, array};

fn samples() -> Vec<GraphSample> {
    vec![
        GraphSample::new(array![[1.0], [2.0]], array![[0, 1], [1, 0]])
            .with_node_numbers(vec![1, 6])
            .with_label(vec![0.5]),
        GraphSample::new(array![[3.0], [4.0], [5.0]], array![[1, 0], [2, 1]])
            .with_node_numbers(vec![6, 6, 8])
            .with_label(vec![1.5]),
    ]
}

#[test]
fn test_from_samples() -> Result<(), GnnError> {
    let batch = GraphBatch::from_samples(&samples())?;
    assert_eq!(batch.num_graphs(), 2);
    assert_eq!(batch.nodes().row_splits(), &[0, 2, 5]);
    assert_eq!(batch.edge_indices().row_splits(), &[0, 2, 4]);
    assert_eq!(batch.global_edge_indices()?, array![[0, 1], [1, 0], [3, 2], [4, 3]]);
    assert_eq!(
        batch.node_numbers().map(|z| z.values().column(0).to_vec()),
        Some(vec![1, 6, 6, 6, 8])
    );
    assert_eq!(batch.graph_labels(), Some(&array![[0.5], [1.5]]));
    assert!(batch.node_coordinates().is_none());
    Ok(())
}

#[test]
fn test_zero_node_graph() -> Result<(), GnnError> {
    let mut data = samples();
    data.insert(
        1,
        GraphSample::new(Array2::zeros((0, 1)), Array2::zeros((0, 2)))
            .with_node_numbers(vec![])
            .with_label(vec![0.0]),
    );
    let batch = GraphBatch::from_samples(&data)?;
    assert_eq!(batch.num_graphs(), 3);
    assert_eq!(batch.nodes().row_lengths(), vec![2, 0, 3]);
    assert_eq!(batch.global_edge_indices()?.row(2).to_vec(), vec![3, 2]);
    Ok(())
}

#[test]
fn test_optional_fields_all_or_none() {
    let mut data = samples();
    data[0] = data[0].clone().with_coordinates(array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    assert!(matches!(
        GraphBatch::from_samples(&data),
        Err(GnnError::InvalidConfig(_))
    ));
}

#[test]
fn test_local_index_out_of_bounds() {
    let data = vec![GraphSample::new(array![[1.0], [2.0]], array![[0, 2]])];
    assert!(matches!(
        GraphBatch::from_samples(&data),
        Err(GnnError::IndexOutOfBounds { index: 2, upper: 2, .. })
    ));
}

#[test]
fn test_attach_mismatched_table() -> Result<(), GnnError> {
    let batch = GraphBatch::from_samples(&samples())?;
    let edge_attributes = Ragged::from_row_lengths(Array2::<f32>::zeros((4, 1)), &[1, 3])?;
    assert!(matches!(
        batch.clone().with_edge_attributes(edge_attributes),
        Err(GnnError::RaggedStructureMismatch { .. })
    ));
    assert!(matches!(
        batch.with_labels(Array2::zeros((3, 1))),
        Err(GnnError::ShapeMismatch { .. })
    ));
    Ok(())
}
