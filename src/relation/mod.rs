/*
 * @Author       : 老董
 * @Date         : 2026-02-08
 * @Description  : 关系/类型映射：原子序数（或原子序数对）-> 紧凑的关系编号
 *
 * 由定义元素集合的层在构造时建立，之后只读，可在多个批次、多个线程间无锁共享。
 * 未映射的类别一律映射为保留值`UNMAPPED`，它不是任何合法编号，下游须跳过或报错，绝不能回绕。
 */

use crate::errors::GnnError;
use crate::ragged::Ragged;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// 未映射类别的保留编号
pub const UNMAPPED: usize = usize::MAX;

/// 查表支持的原子序数上限（不含）
pub const MAX_ATOMIC_NUMBER: usize = 96;

/// 元素映射：原子序数 -> 元素编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ElementMapping {
    elements: Vec<usize>,
    reverse: Vec<usize>,
}

impl ElementMapping {
    /// * `elements` - 各元素的原子序数，顺序即编号，不可重复且须小于`MAX_ATOMIC_NUMBER`
    pub fn new(elements: Vec<usize>) -> Result<Self, GnnError> {
        let mut reverse = vec![UNMAPPED; MAX_ATOMIC_NUMBER];
        for (i, &z) in elements.iter().enumerate() {
            if z >= MAX_ATOMIC_NUMBER {
                return Err(GnnError::InvalidConfig(format!(
                    "元素映射：原子序数{z}须小于{MAX_ATOMIC_NUMBER}"
                )));
            }
            if reverse[z] != UNMAPPED {
                return Err(GnnError::InvalidConfig(format!(
                    "元素映射：原子序数{z}重复出现"
                )));
            }
            reverse[z] = i;
        }
        Ok(Self { elements, reverse })
    }

    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// 元素（关系）个数
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 未映射（含超出查表范围）时返回`UNMAPPED`
    pub fn map(&self, z: usize) -> usize {
        self.reverse.get(z).copied().unwrap_or(UNMAPPED)
    }

    pub fn map_ragged(&self, numbers: &Ragged<usize>) -> Result<Ragged<usize>, GnnError> {
        numbers.map_values(|v| v.mapv(|z| self.map(z)))
    }
}

impl TryFrom<Vec<usize>> for ElementMapping {
    type Error = GnnError;

    fn try_from(elements: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(elements)
    }
}

impl From<ElementMapping> for Vec<usize> {
    fn from(mapping: ElementMapping) -> Self {
        mapping.elements
    }
}

/// 元素对映射：(原子序数, 原子序数) -> 元素对编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PairMappingConfig", into = "PairMappingConfig")]
pub struct ElementPairMapping {
    pairs: Vec<(usize, usize)>,
    keep_pair_order: bool,
    reverse: Vec<usize>,
}

/// `ElementPairMapping`的可序列化形式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairMappingConfig {
    pub pairs: Vec<(usize, usize)>,
    pub keep_pair_order: bool,
}

impl ElementPairMapping {
    /// * `keep_pair_order` - 为false时`(a, b)`与`(b, a)`共用同一编号
    pub fn new(pairs: Vec<(usize, usize)>, keep_pair_order: bool) -> Result<Self, GnnError> {
        let mut reverse = vec![UNMAPPED; MAX_ATOMIC_NUMBER * MAX_ATOMIC_NUMBER];
        for (i, &(a, b)) in pairs.iter().enumerate() {
            if a >= MAX_ATOMIC_NUMBER || b >= MAX_ATOMIC_NUMBER {
                return Err(GnnError::InvalidConfig(format!(
                    "元素对映射：({a}, {b})中的原子序数须小于{MAX_ATOMIC_NUMBER}"
                )));
            }
            let slots = if keep_pair_order {
                vec![a * MAX_ATOMIC_NUMBER + b]
            } else {
                vec![a * MAX_ATOMIC_NUMBER + b, b * MAX_ATOMIC_NUMBER + a]
            };
            if reverse[slots[0]] != UNMAPPED {
                return Err(GnnError::InvalidConfig(format!(
                    "元素对映射：({a}, {b})重复出现"
                )));
            }
            for slot in slots {
                reverse[slot] = i;
            }
        }
        Ok(Self {
            pairs,
            keep_pair_order,
            reverse,
        })
    }

    /// 由元素列表生成所有元素对。
    /// 顺序：外层遍历第二个元素、内层遍历第一个元素，即`(e[b], e[a])`按a、b的字典序；
    /// 不保留顺序时，每对先排序再去重（保留首次出现的位置），共`N(N+1)/2`对。
    pub fn from_elements(mapping: &ElementMapping, keep_pair_order: bool) -> Result<Self, GnnError> {
        let elements = mapping.elements();
        let mut pairs = Vec::with_capacity(elements.len() * elements.len());
        for &outer in elements {
            for &inner in elements {
                let pair = if keep_pair_order || inner <= outer {
                    (inner, outer)
                } else {
                    (outer, inner)
                };
                if keep_pair_order || !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
        Self::new(pairs, keep_pair_order)
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub const fn keep_pair_order(&self) -> bool {
        self.keep_pair_order
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 未映射时返回`UNMAPPED`
    pub fn map(&self, a: usize, b: usize) -> usize {
        if a >= MAX_ATOMIC_NUMBER || b >= MAX_ATOMIC_NUMBER {
            return UNMAPPED;
        }
        self.reverse[a * MAX_ATOMIC_NUMBER + b]
    }
}

impl TryFrom<PairMappingConfig> for ElementPairMapping {
    type Error = GnnError;

    fn try_from(config: PairMappingConfig) -> Result<Self, Self::Error> {
        Self::new(config.pairs, config.keep_pair_order)
    }
}

impl From<ElementPairMapping> for PairMappingConfig {
    fn from(mapping: ElementPairMapping) -> Self {
        Self {
            pairs: mapping.pairs,
            keep_pair_order: mapping.keep_pair_order,
        }
    }
}
