/*
 * @Author       : 老董
 * @Date         : 2026-02-17
 * @Description  : 层注册表：按类名序列化/反序列化层配置
 *
 * 序列化格式：`{"class_name": "GatherEmbedding", "config": {...}}`。
 * 注册表是一个静态表，顺序固定，反序列化时按类名线性查找。
 * 带校验的层先反序列化为其配置，再经构造函数校验，因此配置冲突等错误会原样返回。
 */

use super::acsf::{
    AcsfConstNormalization, AcsfG2, AcsfG2Config, AcsfG4, AcsfG4Config, NormalizationConfig,
};
use super::dense::{Dense, DenseConfig};
use super::gather::{
    GatherEdgesPairs, GatherEmbedding, GatherEmbeddingConfig, GatherEmbeddingSelection,
    GatherNodesIngoing, GatherNodesOutgoing, GatherState, SelectionConfig,
};
use super::geom::{GaussBasisConfig, GaussBasisLayer, NodeDistanceEuclidean, NodePosition};
use super::pooling::{
    PoolingLocalEdges, PoolingLocalEdgesAttention, PoolingNodes, PoolingWeightedLocalEdges,
    RelationalPoolingConfig, RelationalPoolingLocalEdges,
};
use crate::errors::GnnError;
use enum_dispatch::enum_dispatch;
use serde_json::{Value, json};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓层（Layer）特性↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[enum_dispatch]
#[derive(Debug, Clone, PartialEq)]
pub enum AnyLayer {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓gather↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    GatherEmbedding,
    GatherEmbeddingSelection,
    GatherNodesIngoing,
    GatherNodesOutgoing,
    GatherState,
    GatherEdgesPairs,
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓pooling↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    PoolingLocalEdges,
    PoolingWeightedLocalEdges,
    PoolingLocalEdgesAttention,
    PoolingNodes,
    RelationalPoolingLocalEdges,
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓geom / dense↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    NodePosition,
    NodeDistanceEuclidean,
    GaussBasisLayer,
    Dense,
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓acsf↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    AcsfG2,
    AcsfG4,
    AcsfConstNormalization,
}

#[enum_dispatch(AnyLayer)]
pub trait LayerMeta {
    /// 注册表中的类名
    fn class_name(&self) -> &'static str;
    /// 可由`deserialize_layer`还原的配置
    fn get_config(&self) -> Result<Value, GnnError>;
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑层（Layer）特性↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 注册表中的一项
pub struct LayerEntry {
    pub name: &'static str,
    pub build: fn(Value) -> Result<AnyLayer, GnnError>,
}

impl std::fmt::Debug for LayerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerEntry").field("name", &self.name).finish()
    }
}

macro_rules! layer_registry {
    (
        validated { $($validated:ident => $config:ty),* $(,)? }
        plain { $($plain:ident),* $(,)? }
    ) => {
        $(
            impl LayerMeta for $validated {
                fn class_name(&self) -> &'static str {
                    stringify!($validated)
                }

                fn get_config(&self) -> Result<Value, GnnError> {
                    Ok(serde_json::to_value(self)?)
                }
            }
        )*
        $(
            impl LayerMeta for $plain {
                fn class_name(&self) -> &'static str {
                    stringify!($plain)
                }

                fn get_config(&self) -> Result<Value, GnnError> {
                    Ok(serde_json::to_value(self)?)
                }
            }
        )*

        /// 所有可序列化的层，按声明顺序排列
        pub static LAYER_REGISTRY: &[LayerEntry] = &[
            $(
                LayerEntry {
                    name: stringify!($validated),
                    build: |value| {
                        let config: $config = serde_json::from_value(value)?;
                        Ok(AnyLayer::from($validated::try_from(config)?))
                    },
                },
            )*
            $(
                LayerEntry {
                    name: stringify!($plain),
                    build: |value| Ok(AnyLayer::from(serde_json::from_value::<$plain>(value)?)),
                },
            )*
        ];
    };
}

layer_registry! {
    validated {
        GatherEmbedding => GatherEmbeddingConfig,
        GatherEmbeddingSelection => SelectionConfig,
        RelationalPoolingLocalEdges => RelationalPoolingConfig,
        GaussBasisLayer => GaussBasisConfig,
        AcsfG2 => AcsfG2Config,
        AcsfG4 => AcsfG4Config,
        AcsfConstNormalization => NormalizationConfig,
        Dense => DenseConfig,
    }
    plain {
        GatherNodesIngoing,
        GatherNodesOutgoing,
        GatherState,
        GatherEdgesPairs,
        PoolingLocalEdges,
        PoolingWeightedLocalEdges,
        PoolingLocalEdgesAttention,
        PoolingNodes,
        NodePosition,
        NodeDistanceEuclidean,
    }
}

/// 按类名查找注册项
pub fn find_layer(class_name: &str) -> Option<&'static LayerEntry> {
    LAYER_REGISTRY.iter().find(|entry| entry.name == class_name)
}

/// 序列化为`{"class_name": ..., "config": ...}`
pub fn serialize_layer(layer: &AnyLayer) -> Result<Value, GnnError> {
    Ok(json!({
        "class_name": layer.class_name(),
        "config": layer.get_config()?,
    }))
}

/// 由`serialize_layer`的输出（或手写的同格式JSON）还原层。
/// 未注册的类名返回`UnknownLayer`；缺少`config`时按空配置（全部取默认值）处理
pub fn deserialize_layer(value: &Value) -> Result<AnyLayer, GnnError> {
    let class_name = value
        .get("class_name")
        .and_then(Value::as_str)
        .ok_or_else(|| GnnError::InvalidConfig("层描述缺少字符串字段`class_name`".to_string()))?;
    let entry =
        find_layer(class_name).ok_or_else(|| GnnError::UnknownLayer(class_name.to_string()))?;
    tracing::debug!(class_name, "按类名还原层");
    let config = value.get("config").cloned().unwrap_or_else(|| json!({}));
    (entry.build)(config)
}
