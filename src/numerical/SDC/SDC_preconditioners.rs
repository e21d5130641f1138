/// Preconditioner matrices QΔ approximating Q with a triangular structure, so that a sweep can
/// solve node by node. All matrices share the (M+1)x(M+1) layout of `Collocation::Qmat`.
use crate::numerical::SDC::SDC_collocation::Collocation;
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use log::debug;
use nalgebra::DMatrix;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum QDeltaType {
    /// implicit Euler between consecutive nodes
    #[strum(serialize = "IE")]
    ImplicitEuler,
    /// explicit Euler between consecutive nodes, strictly lower triangular
    #[strum(serialize = "EE")]
    ExplicitEuler,
    /// upper factor of the LU decomposition of Q^T, transposed (the "LU trick")
    #[strum(serialize = "LU")]
    LU,
    /// zero matrix, i.e. Picard iteration
    #[strum(serialize = "PIC")]
    Picard,
    /// diagonal with the node offsets, implicit Euler from the left end to each node
    #[strum(serialize = "IEpar")]
    ImplicitEulerParallel,
    /// diagonal of Q
    #[strum(serialize = "Qpar")]
    QDiagonal,
}

impl QDeltaType {
    /// strictly lower triangular variants, usable as explicit preconditioner
    pub fn is_explicit(&self) -> bool {
        matches!(self, QDeltaType::ExplicitEuler | QDeltaType::Picard)
    }
}

pub fn build_qdelta(coll: &Collocation, qd_type: QDeltaType) -> SDCResult<DMatrix<f64>> {
    let M = coll.num_nodes;
    let mut QD = DMatrix::zeros(M + 1, M + 1);
    match qd_type {
        QDeltaType::ImplicitEuler => {
            for m in 1..=M {
                for j in 1..=m {
                    QD[(m, j)] = coll.delta_m[j - 1];
                }
            }
        }
        QDeltaType::ExplicitEuler => {
            // weight of node j is the distance to the next node, column 0 holds the step
            // from the left end and is never read by the sweepers
            for m in 1..=M {
                QD[(m, 0)] = coll.delta_m[0];
                for j in 1..m {
                    QD[(m, j)] = coll.delta_m[j];
                }
            }
        }
        QDeltaType::LU => {
            let U = lu_upper_factor(&coll.Qmat.view((1, 1), (M, M)).transpose())?;
            QD.view_mut((1, 1), (M, M)).copy_from(&U.transpose());
        }
        QDeltaType::Picard => {}
        QDeltaType::ImplicitEulerParallel => {
            for m in 1..=M {
                QD[(m, m)] = coll.nodes[m - 1];
            }
        }
        QDeltaType::QDiagonal => {
            for m in 1..=M {
                QD[(m, m)] = coll.Qmat[(m, m)];
            }
        }
    }
    debug!("QDelta of type {}: {}", qd_type, QD);
    Ok(QD)
}

/// U of the Doolittle decomposition A = L U without pivoting
fn lu_upper_factor(A: &DMatrix<f64>) -> SDCResult<DMatrix<f64>> {
    let n = A.nrows();
    let mut U = A.clone();
    for k in 0..n {
        let pivot = U[(k, k)];
        if pivot.abs() < f64::EPSILON {
            return Err(SDCError::Quadrature(format!(
                "zero pivot at row {} in the LU decomposition of Q^T",
                k
            )));
        }
        for i in (k + 1)..n {
            let l_ik = U[(i, k)] / pivot;
            // eliminated entries are set, not computed, so U is exactly upper triangular
            U[(i, k)] = 0.0;
            for j in (k + 1)..n {
                U[(i, j)] -= l_ik * U[(k, j)];
            }
        }
    }
    Ok(U)
}

/// true if every entry strictly above the diagonal (strict = false) or on and above the
/// diagonal (strict = true) vanishes; row/column 0 are ignored
pub fn is_lower_triangular(QD: &DMatrix<f64>, strict: bool) -> bool {
    let n = QD.nrows();
    (1..n).all(|m| {
        let first = if strict { m } else { m + 1 };
        (first..n).all(|j| QD[(m, j)] == 0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::SDC::SDC_collocation::QuadType;
    use approx::assert_relative_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn radau3() -> Collocation {
        Collocation::new(3, QuadType::RadauRight).unwrap()
    }

    #[test]
    fn test_implicit_euler() {
        let coll = radau3();
        let QI = build_qdelta(&coll, QDeltaType::ImplicitEuler).unwrap();
        let c = &coll.nodes;
        assert_relative_eq!(QI[(1, 1)], c[0], epsilon = 1e-15);
        assert_relative_eq!(QI[(2, 1)], c[0], epsilon = 1e-15);
        assert_relative_eq!(QI[(2, 2)], c[1] - c[0], epsilon = 1e-15);
        assert_relative_eq!(QI[(3, 3)], c[2] - c[1], epsilon = 1e-15);
        // row sums reach the node
        for m in 1..=3 {
            let row_sum: f64 = (1..=3).map(|j| QI[(m, j)]).sum();
            assert_relative_eq!(row_sum, c[m - 1], epsilon = 1e-15);
        }
        assert!(is_lower_triangular(&QI, false));
        assert!(!is_lower_triangular(&QI, true));
    }

    #[test]
    fn test_explicit_euler_is_strictly_lower() {
        let coll = radau3();
        let QE = build_qdelta(&coll, QDeltaType::ExplicitEuler).unwrap();
        assert!(is_lower_triangular(&QE, true));
        assert_relative_eq!(QE[(2, 1)], coll.delta_m[1], epsilon = 1e-15);
        assert_relative_eq!(QE[(3, 2)], coll.delta_m[2], epsilon = 1e-15);
        assert_eq!(QE[(1, 1)], 0.0);
    }

    #[test]
    fn test_lu_trick_values() {
        let coll = radau3();
        let QI = build_qdelta(&coll, QDeltaType::LU).unwrap();
        let expected = [
            (1, 1, 0.19681547722366044),
            (2, 1, 0.3944243147390873),
            (2, 2, 0.423408435702613),
            (3, 1, 0.37640306270046725),
            (3, 2, 0.6378201512799474),
            (3, 3, 0.2),
        ];
        for (m, j, value) in expected {
            assert_relative_eq!(QI[(m, j)], value, epsilon = 1e-12);
        }
        assert!(is_lower_triangular(&QI, false));
    }

    #[test]
    fn test_lu_trick_factorizes_q() {
        // Q = U^T L^T with L unit lower triangular, hence QI^{-1} Q is unit upper triangular
        let coll = Collocation::new(4, QuadType::RadauRight).unwrap();
        let QI = build_qdelta(&coll, QDeltaType::LU).unwrap();
        let qi = QI.view((1, 1), (4, 4)).into_owned();
        let q = coll.Qmat.view((1, 1), (4, 4)).into_owned();
        let lt = qi.try_inverse().unwrap() * q;
        for i in 0..4 {
            assert_relative_eq!(lt[(i, i)], 1.0, epsilon = 1e-12);
            for j in 0..i {
                assert_relative_eq!(lt[(i, j)], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_lu_trick_is_exactly_lower_triangular() {
        for quad_type in QuadType::iter() {
            for M in 1..=12 {
                let coll = Collocation::new(M, quad_type).unwrap();
                let QI = build_qdelta(&coll, QDeltaType::LU).unwrap();
                assert!(is_lower_triangular(&QI, false), "{} with {} nodes", quad_type, M);
            }
        }
    }

    #[test]
    fn test_diagonal_variants() {
        let coll = radau3();
        let QI = build_qdelta(&coll, QDeltaType::ImplicitEulerParallel).unwrap();
        let QD = build_qdelta(&coll, QDeltaType::QDiagonal).unwrap();
        let PIC = build_qdelta(&coll, QDeltaType::Picard).unwrap();
        for m in 1..=3 {
            assert_eq!(QI[(m, m)], coll.nodes[m - 1]);
            assert_eq!(QD[(m, m)], coll.Qmat[(m, m)]);
        }
        assert_eq!(PIC.norm(), 0.0);
    }

    #[test]
    fn test_all_variants_have_collocation_shape() {
        let coll = radau3();
        for qd_type in QDeltaType::iter() {
            let QD = build_qdelta(&coll, qd_type).unwrap();
            assert_eq!(QD.shape(), (4, 4));
            assert!(is_lower_triangular(&QD, qd_type.is_explicit()));
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(QDeltaType::from_str("LU").unwrap(), QDeltaType::LU);
        assert_eq!(QDeltaType::from_str("IE").unwrap(), QDeltaType::ImplicitEuler);
        assert_eq!(QDeltaType::ExplicitEuler.to_string(), "EE");
        assert!(QDeltaType::from_str("MIN").is_err());
    }
}
