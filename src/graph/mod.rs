//! 图样本与图批次模块
//!
//! 提供把若干个变长图拼成一个不规则（ragged）批次、以及构造边/角索引的功能。
//!
//! # 主要组件
//!
//! - [`GraphSample`]: 单个图（节点特征、坐标、局部边索引等）
//! - [`GraphBatch`]: 一个批次的不规则表示，构造时完成结构校验
//! - [`GraphDataLoader`]: `PyTorch` 风格的图批量加载器
//! - [`angle_indices`] / [`reverse_edge_pairs`]: 由边索引派生的角索引与反向边索引
//!
//! # 使用示例
//!
//! ```ignore
//! use only_gnn::graph::{GraphDataLoader, GraphDataset};
//!
//! let loader = GraphDataLoader::new(GraphDataset::new(samples), 32)?
//!     .shuffle(true)
//!     .seed(42);
//!
//! for batch in loader.iter() {
//!     let batch = batch?;
//!     let h = conv.forward(batch.nodes(), None, batch.edge_indices())?;
//! }
//! ```

mod batch;
mod dataloader;
mod indices;

pub use batch::{GraphBatch, GraphSample};
pub(crate) use batch::global_indices;
pub use dataloader::{GraphDataLoader, GraphDataLoaderIterator, GraphDataset};
pub use indices::{angle_indices, reverse_edge_pairs};

#[cfg(test)]
mod tests;
