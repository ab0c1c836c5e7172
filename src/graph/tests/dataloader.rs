//! GraphDataLoader 单元测试

use crate::errors::GnnError;
use crate::graph::{GraphBatch, GraphDataLoader, GraphDataset, GraphSample};
use ndarray::{Array2, array};

/// 第i个图有i+1个节点，节点特征都是i
fn dataset(n: usize) -> GraphDataset {
    (0..n)
        .map(|i| {
            let nodes = Array2::from_elem((i + 1, 1), i as f32);
            GraphSample::new(nodes, array![[0, i]])
        })
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn test_dataloader_basic() -> Result<(), GnnError> {
    let loader = GraphDataLoader::new(dataset(10), 3)?;
    assert_eq!(loader.num_batches(), 4); // 10 / 3 = 3.33, 向上取整 = 4
    assert_eq!(loader.len(), 10);

    let batches = loader.iter().collect::<Result<Vec<GraphBatch>, _>>()?;
    assert_eq!(batches.len(), 4);
    assert_eq!(batches[0].num_graphs(), 3);
    assert_eq!(batches[0].nodes().row_lengths(), vec![1, 2, 3]);
    // 最后一个批次只有1个图
    assert_eq!(batches[3].num_graphs(), 1);
    Ok(())
}

#[test]
fn test_dataloader_drop_last() -> Result<(), GnnError> {
    let loader = GraphDataLoader::new(dataset(10), 3)?.drop_last(true);
    assert_eq!(loader.num_batches(), 3);
    assert_eq!(loader.iter().count(), 3);
    Ok(())
}

#[test]
fn test_dataloader_shuffle_with_seed() -> Result<(), GnnError> {
    // 使用相同种子，两次迭代应该产生相同的结果
    let loader1 = GraphDataLoader::new(dataset(8), 3)?.shuffle(true).seed(42);
    let loader2 = GraphDataLoader::new(dataset(8), 3)?.shuffle(true).seed(42);
    let batches1 = loader1.iter().collect::<Result<Vec<_>, _>>()?;
    let batches2 = loader2.iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(batches1, batches2);

    // 打乱后每个图仍然完整出现一次
    let mut seen: Vec<usize> = batches1
        .iter()
        .flat_map(|b| b.nodes().to_samples())
        .map(|s| s[[0, 0]] as usize)
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_dataloader_reports_invalid_sample() -> Result<(), GnnError> {
    let mut data = dataset(2);
    // 局部索引越界
    data.push(GraphSample::new(array![[0.0]], array![[0, 1]]));
    let loader = GraphDataLoader::new(data, 3)?;
    let first = loader.iter().next();
    assert!(matches!(first, Some(Err(GnnError::IndexOutOfBounds { .. }))));
    Ok(())
}

#[test]
fn test_zero_batch_size() {
    assert!(matches!(
        GraphDataLoader::new(dataset(1), 0),
        Err(GnnError::InvalidConfig(_))
    ));
}

/// 每个批次的各图节点数
fn batch_sizes(loader: &GraphDataLoader) -> Result<Vec<Vec<usize>>, GnnError> {
    loader
        .iter()
        .map(|batch| batch.map(|b| b.nodes().row_lengths()))
        .collect()
}

#[test]
fn test_bucket_by_size_groups_similar_graphs() -> Result<(), GnnError> {
    let loader = GraphDataLoader::new(dataset(9), 3)?
        .shuffle(true)
        .seed(7)
        .bucket_by_size(3);
    let mut sizes = batch_sizes(&loader)?;
    assert_eq!(loader.iter().len(), 3);
    // 窗口覆盖整个数据集：批次内按节点数升序，且大小相近的图落在同一批次
    sizes.sort();
    assert_eq!(sizes, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
    Ok(())
}

#[test]
fn test_max_nodes_per_batch() -> Result<(), GnnError> {
    let loader = GraphDataLoader::new(dataset(5), 4)?.max_nodes_per_batch(6);
    assert_eq!(batch_sizes(&loader)?, vec![vec![1, 2, 3], vec![4], vec![5]]);
    assert_eq!(loader.num_batches(), 3);

    // 超出预算的单个图独占一个批次
    let loader = GraphDataLoader::new(dataset(5), 4)?.max_nodes_per_batch(3);
    assert_eq!(
        batch_sizes(&loader)?,
        vec![vec![1, 2], vec![3], vec![4], vec![5]]
    );

    let loader = GraphDataLoader::new(dataset(5), 2)?
        .max_nodes_per_batch(100)
        .drop_last(true);
    assert_eq!(batch_sizes(&loader)?, vec![vec![1, 2], vec![3, 4]]);
    Ok(())
}

#[test]
fn test_batch_plan_covers_dataset_once() -> Result<(), GnnError> {
    let loader = GraphDataLoader::new(dataset(11), 4)?
        .shuffle(true)
        .bucket_by_size(2)
        .max_nodes_per_batch(12);
    let mut seen: Vec<usize> = loader.batch_plan().into_iter().flatten().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..11).collect::<Vec<_>>());
    Ok(())
}
