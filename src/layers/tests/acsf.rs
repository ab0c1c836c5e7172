//! 原子中心对称函数的单元测试

use crate::errors::GnnError;
use crate::layers::{AcsfConstNormalization, AcsfG2, AcsfG4, AcsfParams, UnmappedPolicy};
use crate::ragged::Ragged;
use approx::assert_abs_diff_eq;
use ndarray::{Array3, array};
use std::f32::consts::PI;

fn cut(r: f32, rc: f32) -> f32 {
    0.5 * ((PI * r / rc).cos() + 1.0)
}

/// H 位于原点、C 位于(1, 0, 0)，两条有向边
fn hydrogen_carbon() -> Result<(Ragged<usize>, Ragged<f32>, Ragged<usize>), GnnError> {
    let numbers = Ragged::from_row_lengths(array![[1_usize], [6]], &[2])?;
    let coordinates = Ragged::from_row_lengths(array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[2])?;
    let index = Ragged::from_row_lengths(array![[0, 1], [1, 0]], &[2])?;
    Ok((numbers, coordinates, index))
}

#[test]
fn test_g2_hand_computed() -> Result<(), GnnError> {
    let (numbers, coordinates, index) = hydrogen_carbon()?;
    let g2 = AcsfG2::new(AcsfG2::make_param_table(&[1.0], &[0.0], 8.0, &[1, 6]))?;
    assert_eq!(g2.units(), 2);

    let rep = g2.forward(&numbers, &coordinates, &index)?;
    let expected = (-1.0_f32).exp() * cut(1.0, 8.0);
    assert_abs_diff_eq!(expected, 0.35388, epsilon = 1e-4);
    // H 的邻居是 C（关系1），C 的邻居是 H（关系0）
    assert_abs_diff_eq!(rep.values()[[0, 0]], 0.0);
    assert_abs_diff_eq!(rep.values()[[0, 1]], expected, epsilon = 1e-6);
    assert_abs_diff_eq!(rep.values()[[1, 0]], expected, epsilon = 1e-6);
    assert_abs_diff_eq!(rep.values()[[1, 1]], 0.0);
    Ok(())
}

#[test]
fn test_g2_unmapped_neighbour() -> Result<(), GnnError> {
    // 第三个原子是不在映射中的 O
    let numbers = Ragged::from_row_lengths(array![[1_usize], [6], [8]], &[3])?;
    let coordinates = Ragged::from_row_lengths(
        array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[3],
    )?;
    let index = Ragged::from_row_lengths(array![[0, 1], [0, 2]], &[2])?;

    let mut config = AcsfG2::make_param_table(&[1.0], &[0.0], 8.0, &[1, 6]);
    let rep = AcsfG2::new(config.clone())?.forward(&numbers, &coordinates, &index)?;
    assert_abs_diff_eq!(rep.values()[[0, 0]], 0.0);
    assert_abs_diff_eq!(rep.values()[[0, 1]], (-1.0_f32).exp() * cut(1.0, 8.0), epsilon = 1e-6);

    config.unmapped = UnmappedPolicy::Error;
    let strict = AcsfG2::new(config)?.forward(&numbers, &coordinates, &index);
    assert!(matches!(strict, Err(GnnError::UnmappedCategory { row: 1, .. })));
    Ok(())
}

#[test]
fn test_g2_param_table_layout() -> Result<(), GnnError> {
    let config = AcsfG2::make_param_table(&[0.5, 1.0], &[0.0, 1.0], 6.0, &[6, 1]);
    assert_eq!(config.element_mapping, vec![1, 6]);
    match &config.eta_rs_rc {
        AcsfParams::Shared(p) => {
            assert_eq!(p.shape(), &[2, 4, 3]);
            // R_s 在外、η 在内
            assert_eq!(p.slice(ndarray::s![0, 1, ..]).to_vec(), vec![1.0, 0.0, 6.0]);
            assert_eq!(p.slice(ndarray::s![1, 2, ..]).to_vec(), vec![0.5, 1.0, 6.0]);
        }
        other => panic!("期望共享参数表，实际为{other:?}"),
    }
    assert_eq!(AcsfG2::new(config)?.units(), 8);
    Ok(())
}

#[test]
fn test_g2_rejects_wrong_param_width() {
    let mut config = AcsfG2::make_param_table(&[1.0], &[0.0], 8.0, &[1, 6]);
    config.eta_rs_rc = AcsfParams::Shared(Array3::zeros((2, 1, 4)));
    assert!(matches!(AcsfG2::new(config), Err(GnnError::InvalidConfig(_))));
}

#[test]
fn test_g4_right_angle() -> Result<(), GnnError> {
    let numbers = Ragged::from_row_lengths(array![[1_usize], [1], [1]], &[3])?;
    let coordinates = Ragged::from_row_lengths(
        array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        &[3],
    )?;
    let angles = Ragged::from_row_lengths(array![[0, 1, 2], [0, 2, 1]], &[2])?;

    let g4 = AcsfG4::new(AcsfG4::make_param_table(&[0.0], &[1.0], &[1.0], 8.0, &[1]))?;
    assert_eq!(g4.units(), 1);
    let rep = g4.forward(&numbers, &coordinates, &angles)?;
    // 直角：cos θ = 0，角度项为1；η = 0 时径向项为1
    let expected = 2.0 * cut(1.0, 8.0) * cut(1.0, 8.0) * cut(2.0_f32.sqrt(), 8.0);
    assert_abs_diff_eq!(rep.values()[[0, 0]], expected, epsilon = 1e-5);
    let column = rep.values().column(0).to_vec();
    assert_eq!(&column[1..], &[0.0, 0.0]);
    Ok(())
}

#[test]
fn test_g4_param_table_and_validation() -> Result<(), GnnError> {
    let config = AcsfG4::make_param_table(&[1.0], &[1.0, 2.0], &[-1.0, 1.0], 6.0, &[8, 1, 6]);
    match &config.eta_zeta_lambda_rc {
        AcsfParams::Shared(p) => assert_eq!(p.shape(), &[6, 4, 4]),
        other => panic!("期望共享参数表，实际为{other:?}"),
    }
    let g4 = AcsfG4::new(config.clone())?;
    assert_eq!(g4.pair_mapping().len(), 6);
    assert_eq!(g4.units(), 24);

    let zero = crate::layers::AcsfG4Config {
        multiplicity: Some(0.0),
        ..config
    };
    assert!(matches!(AcsfG4::new(zero), Err(GnnError::InvalidConfig(_))));
    Ok(())
}

#[test]
fn test_const_normalization() -> Result<(), GnnError> {
    let x = Ragged::from_row_lengths(array![[3.0, 5.0], [1.0, 1.0]], &[1, 1])?;
    let out = AcsfConstNormalization::new(vec![1.0], vec![2.0])?.forward(&x)?;
    assert_eq!(out.values(), &array![[1.0, 2.0], [0.0, 0.0]]);

    let per_feature = AcsfConstNormalization::new(vec![0.0, 1.0], vec![1.0, 4.0])?.forward(&x)?;
    assert_eq!(per_feature.values(), &array![[3.0, 1.0], [1.0, 0.0]]);

    let wrong = AcsfConstNormalization::new(vec![0.0, 0.0, 0.0], vec![1.0])?.forward(&x);
    assert!(matches!(wrong, Err(GnnError::ShapeMismatch { .. })));
    assert!(AcsfConstNormalization::new(vec![0.0], vec![0.0]).is_err());
    assert_eq!(AcsfConstNormalization::default().forward(&x)?, x);
    Ok(())
}
