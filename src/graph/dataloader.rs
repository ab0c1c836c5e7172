/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : GraphDataLoader - PyTorch 风格的图批量加载器
 *
 * 提供统一的数据迭代 API，支持：
 * - 自动分批 (batch_size)，每批拼成一个不规则的 GraphBatch
 * - 随机打乱 (shuffle)
 * - 丢弃不完整批次 (drop_last)
 * - 按图的大小分桶 (bucket_by_size)、限制批次的节点总数 (max_nodes_per_batch)
 */

use super::{GraphBatch, GraphSample};
use crate::errors::GnnError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// GraphDataset - 持有若干变长图的数据集
#[derive(Debug, Clone, Default)]
pub struct GraphDataset {
    samples: Vec<GraphSample>,
}

impl GraphDataset {
    pub const fn new(samples: Vec<GraphSample>) -> Self {
        Self { samples }
    }

    /// 获取样本数量
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 检查数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[GraphSample] {
        &self.samples
    }

    pub fn push(&mut self, sample: GraphSample) {
        self.samples.push(sample);
    }
}

impl From<Vec<GraphSample>> for GraphDataset {
    fn from(samples: Vec<GraphSample>) -> Self {
        Self::new(samples)
    }
}

/// GraphDataLoader - 图批量加载器
///
/// 每个批次最多`batch_size`个图。图的大小差异较大时可以：
/// - `bucket_by_size(w)`：在每`w * batch_size`个相邻的图内按节点数排序后再切分，
///   使同一批次内的图大小相近（开启 shuffle 时批次的先后顺序也会被打乱）；
/// - `max_nodes_per_batch(n)`：批次的节点总数超过`n`时提前结束该批次。
///   单个图的节点数超过`n`时独占一个批次。
///
/// # 示例
/// ```ignore
/// let loader = GraphDataLoader::new(dataset, 32)?
///     .shuffle(true)
///     .bucket_by_size(4)
///     .max_nodes_per_batch(2048);
///
/// for batch in loader.iter() {
///     let batch = batch?;
///     let pooled = PoolingNodes::default().forward(batch.nodes())?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GraphDataLoader {
    dataset: GraphDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
    bucket_window: Option<usize>,
    max_nodes: Option<usize>,
}

impl GraphDataLoader {
    pub fn new(dataset: GraphDataset, batch_size: usize) -> Result<Self, GnnError> {
        if batch_size == 0 {
            return Err(GnnError::InvalidConfig(
                "GraphDataLoader：batch_size 必须大于 0".to_string(),
            ));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            seed: None,
            bucket_window: None,
            max_nodes: None,
        })
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// 丢弃末尾不足`batch_size`个图的批次
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// `window`为参与排序的批次数，0按1处理
    pub fn bucket_by_size(mut self, window: usize) -> Self {
        self.bucket_window = Some(window.max(1));
        self
    }

    pub fn max_nodes_per_batch(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn dataset(&self) -> &GraphDataset {
        &self.dataset
    }

    /// 批次数量。设置了节点预算且未设种子的 shuffle 下，每次调用的结果可能不同
    pub fn num_batches(&self) -> usize {
        self.batch_plan().len()
    }

    /// 按当前设置划分批次，返回每个批次内各图在数据集中的下标
    pub fn batch_plan(&self) -> Vec<Vec<usize>> {
        let samples = self.dataset.samples();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut order: Vec<usize> = (0..samples.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rng);
        }
        if let Some(window) = self.bucket_window {
            for chunk in order.chunks_mut(window * self.batch_size) {
                chunk.sort_by_key(|&idx| samples[idx].num_nodes());
            }
        }

        let mut batches = Vec::with_capacity(order.len().div_ceil(self.batch_size));
        let mut current: Vec<usize> = Vec::with_capacity(self.batch_size);
        let mut nodes = 0;
        for idx in order {
            let n = samples[idx].num_nodes();
            let over_budget = self
                .max_nodes
                .is_some_and(|max| !current.is_empty() && nodes + n > max);
            if current.len() == self.batch_size || over_budget {
                batches.push(std::mem::take(&mut current));
                nodes = 0;
            }
            current.push(idx);
            nodes += n;
        }
        if !current.is_empty() && !(self.drop_last && current.len() < self.batch_size) {
            batches.push(current);
        }

        if self.shuffle && self.bucket_window.is_some() {
            batches.shuffle(&mut rng);
        }
        tracing::trace!(
            graphs = samples.len(),
            batches = batches.len(),
            "GraphDataLoader 划分批次"
        );
        batches
    }

    /// 每次迭代产出一个批次，批次结构不合法时产出`Err`
    pub fn iter(&self) -> GraphDataLoaderIterator<'_> {
        GraphDataLoaderIterator {
            dataset: &self.dataset,
            batches: self.batch_plan().into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

pub struct GraphDataLoaderIterator<'a> {
    dataset: &'a GraphDataset,
    batches: std::vec::IntoIter<Vec<usize>>,
}

impl Iterator for GraphDataLoaderIterator<'_> {
    type Item = Result<GraphBatch, GnnError>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.batches.next()?;
        let samples: Vec<GraphSample> = indices
            .iter()
            .map(|&idx| self.dataset.samples[idx].clone())
            .collect();
        Some(GraphBatch::from_samples(&samples))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.batches.size_hint()
    }
}

impl ExactSizeIterator for GraphDataLoaderIterator<'_> {}
