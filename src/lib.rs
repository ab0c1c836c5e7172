//! # Only GNN
//!
//! `only_gnn`项目用纯rust实现图神经网络的批处理与消息传递核心：
//! 把若干个节点数、边数各不相同的图拼成一个不规则（ragged）批次，
//! 在其上完成按索引取值（gather）、分段聚合（pooling）与消息传递，
//! 并提供原子中心对称函数（ACSF）等化学图常用的层。
//!
//! 约定：
//! - 数据集只给出每个图内部的局部索引，全局索引在每次前向时即时计算；
//! - 边`(i, j)`的位置0为接收端，位置1为发送端；
//! - 所有结构性错误都以[`errors::GnnError`]同步返回，不做部分计算。
//!

pub mod errors;
pub mod graph;
pub mod layers;
pub mod ops;
pub mod ragged;
pub mod relation;
