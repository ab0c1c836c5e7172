//! 元素映射与元素对映射的单元测试

use crate::errors::GnnError;
use crate::ragged::Ragged;
use crate::relation::{ElementMapping, ElementPairMapping, UNMAPPED};
use ndarray::array;

#[test]
fn test_element_mapping() -> Result<(), GnnError> {
    let mapping = ElementMapping::new(vec![1, 6, 8])?;
    assert_eq!(mapping.len(), 3);
    assert_eq!(mapping.map(1), 0);
    assert_eq!(mapping.map(8), 2);
    // 未映射与超出查表范围都得到保留值
    assert_eq!(mapping.map(7), UNMAPPED);
    assert_eq!(mapping.map(200), UNMAPPED);

    let numbers = Ragged::from_row_lengths(array![[6_usize], [1], [9]], &[2, 1])?;
    let mapped = mapping.map_ragged(&numbers)?;
    assert_eq!(mapped.values(), &array![[1], [0], [UNMAPPED]]);
    Ok(())
}

#[test]
fn test_element_mapping_rejects_bad_elements() {
    assert!(matches!(
        ElementMapping::new(vec![1, 6, 1]),
        Err(GnnError::InvalidConfig(_))
    ));
    assert!(matches!(
        ElementMapping::new(vec![96]),
        Err(GnnError::InvalidConfig(_))
    ));
}

#[test]
fn test_pairs_from_elements_unordered() -> Result<(), GnnError> {
    let mapping = ElementMapping::new(vec![1, 6])?;
    let pairs = ElementPairMapping::from_elements(&mapping, false)?;
    assert_eq!(pairs.pairs(), &[(1, 1), (1, 6), (6, 6)]);
    assert_eq!(pairs.map(6, 1), 1);
    assert_eq!(pairs.map(1, 6), 1);
    assert_eq!(pairs.map(6, 6), 2);
    assert_eq!(pairs.map(8, 6), UNMAPPED);
    Ok(())
}

#[test]
fn test_pairs_from_elements_ordered() -> Result<(), GnnError> {
    let mapping = ElementMapping::new(vec![1, 6])?;
    let pairs = ElementPairMapping::from_elements(&mapping, true)?;
    // 外层遍历第二个元素，内层遍历第一个元素
    assert_eq!(pairs.pairs(), &[(1, 1), (6, 1), (1, 6), (6, 6)]);
    assert_eq!(pairs.map(6, 1), 1);
    assert_eq!(pairs.map(1, 6), 2);
    Ok(())
}

#[test]
fn test_pair_mapping_duplicates() {
    assert!(ElementPairMapping::new(vec![(1, 6), (6, 1)], false).is_err());
    assert!(ElementPairMapping::new(vec![(1, 6), (6, 1)], true).is_ok());
}

#[test]
fn test_mapping_serde() -> Result<(), GnnError> {
    let mapping = ElementMapping::new(vec![1, 6])?;
    let json = serde_json::to_string(&mapping)?;
    assert_eq!(json, "[1,6]");
    let restored: ElementMapping = serde_json::from_str(&json)?;
    assert_eq!(restored, mapping);
    assert!(serde_json::from_str::<ElementMapping>("[1,1]").is_err());
    Ok(())
}

#[test]
fn test_mappings_are_shareable() -> Result<(), GnnError> {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let mapping = ElementMapping::new(vec![1, 6])?;
    let pairs = ElementPairMapping::from_elements(&mapping, false)?;
    assert_send_sync(&mapping);
    assert_send_sync(&pairs);

    let shared = std::sync::Arc::new(pairs);
    let worker = {
        let shared = std::sync::Arc::clone(&shared);
        std::thread::spawn(move || shared.map(6, 1))
    };
    assert_eq!(worker.join().ok(), Some(shared.map(1, 6)));
    Ok(())
}
