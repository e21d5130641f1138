/// Collocation nodes on the unit interval and the quadrature matrix Q that integrates the
/// interpolating polynomial from the left end of the step up to every node.
///
/// Q is stored as an (M+1)x(M+1) matrix so that row/column m addresses node m in the
/// sweepers' 1-based node numbering; row and column 0 are zero. For 3 Radau-right nodes the
/// lower-right block coincides with the Runge-Kutta matrix of the 3-stage Radau IIA method.
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use gauss_quad::GaussLegendre;
use log::info;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;
use strum_macros::{Display, EnumIter, EnumString};

const NEWTON_TOL: f64 = 1e-14;
const NEWTON_MAX_ITER: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum QuadType {
    /// Gauss-Radau nodes including the right end of the step
    #[strum(serialize = "RADAU-RIGHT")]
    RadauRight,
    /// Gauss-Legendre nodes, no end point is a node
    #[strum(serialize = "GAUSS")]
    GaussLegendre,
    /// equally spaced nodes k/M, k = 1..M
    #[strum(serialize = "EQUID-RIGHT")]
    EquidistantRight,
}

#[derive(Debug, Clone)]
pub struct Collocation {
    pub num_nodes: usize,
    pub quad_type: Option<QuadType>,
    /// node offsets in (0, 1]
    pub nodes: DVector<f64>,
    /// quadrature weights over [0, 1]
    pub weights: DVector<f64>,
    /// spacing between consecutive nodes, delta_m[0] measured from the left end
    pub delta_m: DVector<f64>,
    pub Qmat: DMatrix<f64>,
    pub left_is_node: bool,
    pub right_is_node: bool,
}

impl Collocation {
    pub fn new(num_nodes: usize, quad_type: QuadType) -> SDCResult<Collocation> {
        if num_nodes == 0 {
            return Err(SDCError::Quadrature(
                "at least one collocation node is required".to_string(),
            ));
        }
        let nodes = match quad_type {
            QuadType::RadauRight => radau_right_nodes(num_nodes)?,
            QuadType::GaussLegendre => gauss_legendre_nodes(num_nodes)?,
            QuadType::EquidistantRight => (1..=num_nodes)
                .map(|k| k as f64 / num_nodes as f64)
                .collect(),
        };
        let mut coll = Self::from_nodes(nodes)?;
        coll.quad_type = Some(quad_type);
        info!(
            "collocation: {} nodes of type {}, nodes = {:?}",
            num_nodes,
            quad_type,
            coll.nodes.as_slice()
        );
        Ok(coll)
    }

    /// Builds the quadrature for arbitrary strictly increasing nodes in (0, 1].
    pub fn from_nodes(nodes: Vec<f64>) -> SDCResult<Collocation> {
        let num_nodes = nodes.len();
        if num_nodes == 0 {
            return Err(SDCError::Quadrature(
                "at least one collocation node is required".to_string(),
            ));
        }
        if nodes.iter().any(|&tau| !(tau > 0.0 && tau <= 1.0)) {
            return Err(SDCError::Quadrature(format!(
                "nodes must lie in (0, 1], got {:?}",
                nodes
            )));
        }
        if nodes.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SDCError::Quadrature(format!(
                "nodes must be strictly increasing, got {:?}",
                nodes
            )));
        }

        // Gauss-Legendre with M points is exact for the degree M-1 Lagrange basis
        let quad = GaussLegendre::new(num_nodes.max(2))
            .map_err(|e| SDCError::Quadrature(format!("Gauss-Legendre rule: {:?}", e)))?;

        let mut Qmat = DMatrix::zeros(num_nodes + 1, num_nodes + 1);
        let mut weights = DVector::zeros(num_nodes);
        for j in 0..num_nodes {
            let basis = |s: f64| lagrange_basis(&nodes, j, s);
            for m in 0..num_nodes {
                Qmat[(m + 1, j + 1)] = quad.integrate(0.0, nodes[m], basis);
            }
            weights[j] = quad.integrate(0.0, 1.0, basis);
        }

        let mut delta_m = DVector::zeros(num_nodes);
        delta_m[0] = nodes[0];
        for m in 1..num_nodes {
            delta_m[m] = nodes[m] - nodes[m - 1];
        }
        let right_is_node = (nodes[num_nodes - 1] - 1.0).abs() < 1e-14;

        Ok(Collocation {
            num_nodes,
            quad_type: None,
            nodes: DVector::from_vec(nodes),
            weights,
            delta_m,
            Qmat,
            left_is_node: false,
            right_is_node,
        })
    }
}

// l_j(s) = prod_{i != j} (s - tau_i) / (tau_j - tau_i)
fn lagrange_basis(nodes: &[f64], j: usize, s: f64) -> f64 {
    nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != j)
        .fold(1.0, |acc, (_, &tau_i)| {
            acc * (s - tau_i) / (nodes[j] - tau_i)
        })
}

// Legendre polynomials P_0..P_n and their derivatives at x
fn legendre(n: usize, x: f64) -> (Vec<f64>, Vec<f64>) {
    let mut p = vec![1.0, x];
    let mut dp = vec![0.0, 1.0];
    for k in 1..n {
        let kf = k as f64;
        p.push(((2.0 * kf + 1.0) * x * p[k] - kf * p[k - 1]) / (kf + 1.0));
        dp.push(dp[k - 1] + (2.0 * kf + 1.0) * p[k]);
    }
    p.truncate(n + 1);
    dp.truncate(n + 1);
    (p, dp)
}

fn newton_root<F>(fun: F, x0: f64) -> SDCResult<f64>
where
    F: Fn(f64) -> (f64, f64),
{
    let mut x = x0;
    for _ in 0..NEWTON_MAX_ITER {
        let (value, derivative) = fun(x);
        if derivative == 0.0 {
            break;
        }
        let dx = value / derivative;
        x -= dx;
        if dx.abs() < NEWTON_TOL {
            return Ok(x);
        }
    }
    Err(SDCError::Quadrature(format!(
        "node computation did not converge from initial guess {}",
        x0
    )))
}

/// roots of P_M - P_{M-1} on [-1, 1], mapped to (0, 1]
fn radau_right_nodes(num_nodes: usize) -> SDCResult<Vec<f64>> {
    let M = num_nodes;
    let mut xs = vec![1.0];
    for k in 1..M {
        let guess = (2.0 * PI * k as f64 / (2.0 * M as f64 - 1.0)).cos();
        let root = newton_root(
            |x| {
                let (p, dp) = legendre(M, x);
                (p[M] - p[M - 1], dp[M] - dp[M - 1])
            },
            guess,
        )?;
        xs.push(root);
    }
    Ok(to_unit_interval(xs))
}

/// roots of P_M, mapped to (0, 1)
fn gauss_legendre_nodes(num_nodes: usize) -> SDCResult<Vec<f64>> {
    let M = num_nodes;
    let mut xs = Vec::with_capacity(M);
    for i in 1..=M {
        let guess = (PI * (i as f64 - 0.25) / (M as f64 + 0.5)).cos();
        let root = newton_root(
            |x| {
                let (p, dp) = legendre(M, x);
                (p[M], dp[M])
            },
            guess,
        )?;
        xs.push(root);
    }
    Ok(to_unit_interval(xs))
}

fn to_unit_interval(xs: Vec<f64>) -> Vec<f64> {
    let mut nodes: Vec<f64> = xs.into_iter().map(|x| 0.5 * (x + 1.0)).collect();
    nodes.sort_by(|a, b| a.total_cmp(b));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    // 3-stage Radau IIA Butcher tableau
    fn radau_iia_3() -> (Vec<f64>, DMatrix<f64>, Vec<f64>) {
        let s6 = 6_f64.sqrt();
        let c = vec![(4.0 - s6) / 10.0, (4.0 + s6) / 10.0, 1.0];
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[
                (88.0 - 7.0 * s6) / 360.0,
                (296.0 - 169.0 * s6) / 1800.0,
                (-2.0 + 3.0 * s6) / 225.0,
                (296.0 + 169.0 * s6) / 1800.0,
                (88.0 + 7.0 * s6) / 360.0,
                (-2.0 - 3.0 * s6) / 225.0,
                (16.0 - s6) / 36.0,
                (16.0 + s6) / 36.0,
                1.0 / 9.0,
            ],
        );
        let b = vec![(16.0 - s6) / 36.0, (16.0 + s6) / 36.0, 1.0 / 9.0];
        (c, a, b)
    }

    #[test]
    fn test_radau_right_matches_radau_iia() {
        let coll = Collocation::new(3, QuadType::RadauRight).unwrap();
        let (c, a, b) = radau_iia_3();
        for m in 0..3 {
            assert_relative_eq!(coll.nodes[m], c[m], epsilon = 1e-14);
            assert_relative_eq!(coll.weights[m], b[m], epsilon = 1e-14);
            for j in 0..3 {
                assert_relative_eq!(coll.Qmat[(m + 1, j + 1)], a[(m, j)], epsilon = 1e-14);
            }
        }
        assert!(coll.right_is_node);
        assert!(!coll.left_is_node);
        // row and column 0 are not used
        for k in 0..4 {
            assert_eq!(coll.Qmat[(0, k)], 0.0);
            assert_eq!(coll.Qmat[(k, 0)], 0.0);
        }
    }

    #[test]
    fn test_radau_two_nodes() {
        let coll = Collocation::new(2, QuadType::RadauRight).unwrap();
        assert_relative_eq!(coll.nodes[0], 1.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(coll.nodes[1], 1.0, epsilon = 1e-14);
        assert_relative_eq!(coll.Qmat[(1, 1)], 5.0 / 12.0, epsilon = 1e-14);
        assert_relative_eq!(coll.Qmat[(1, 2)], -1.0 / 12.0, epsilon = 1e-14);
        assert_relative_eq!(coll.Qmat[(2, 1)], 3.0 / 4.0, epsilon = 1e-14);
        assert_relative_eq!(coll.Qmat[(2, 2)], 1.0 / 4.0, epsilon = 1e-14);
    }

    #[test]
    fn test_single_radau_node_is_backward_euler() {
        let coll = Collocation::new(1, QuadType::RadauRight).unwrap();
        assert_relative_eq!(coll.nodes[0], 1.0, epsilon = 1e-15);
        assert_relative_eq!(coll.Qmat[(1, 1)], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_legendre_nodes() {
        let coll = Collocation::new(3, QuadType::GaussLegendre).unwrap();
        let r = (0.6_f64).sqrt();
        assert_relative_eq!(coll.nodes[0], 0.5 * (1.0 - r), epsilon = 1e-14);
        assert_relative_eq!(coll.nodes[1], 0.5, epsilon = 1e-14);
        assert_relative_eq!(coll.nodes[2], 0.5 * (1.0 + r), epsilon = 1e-14);
        assert_relative_eq!(coll.weights[0], 5.0 / 18.0, epsilon = 1e-14);
        assert_relative_eq!(coll.weights[1], 8.0 / 18.0, epsilon = 1e-14);
        assert!(!coll.right_is_node);
    }

    #[test]
    fn test_rows_of_q_integrate_polynomials() {
        // row m of Q integrates polynomials of degree < M exactly up to tau_m
        for quad_type in QuadType::iter() {
            let coll = Collocation::new(4, quad_type).unwrap();
            for m in 1..=4 {
                let tau_m = coll.nodes[m - 1];
                let approx: f64 = (1..=4)
                    .map(|j| coll.Qmat[(m, j)] * coll.nodes[j - 1].powi(3))
                    .sum();
                assert_relative_eq!(approx, tau_m.powi(4) / 4.0, epsilon = 1e-13);
                let row_sum: f64 = (1..=4).map(|j| coll.Qmat[(m, j)]).sum();
                assert_relative_eq!(row_sum, tau_m, epsilon = 1e-13);
            }
            assert_relative_eq!(coll.weights.sum(), 1.0, epsilon = 1e-13);
            assert_relative_eq!(coll.delta_m.sum(), coll.nodes[3], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_invalid_nodes() {
        assert!(Collocation::new(0, QuadType::RadauRight).is_err());
        assert!(Collocation::from_nodes(vec![0.5, 0.2]).is_err());
        assert!(Collocation::from_nodes(vec![0.0, 1.0]).is_err());
        assert!(Collocation::from_nodes(vec![0.5, 1.5]).is_err());
    }

    #[test]
    fn test_quad_type_names() {
        assert_eq!(QuadType::from_str("RADAU-RIGHT").unwrap(), QuadType::RadauRight);
        assert_eq!(QuadType::from_str("GAUSS").unwrap(), QuadType::GaussLegendre);
        assert_eq!(QuadType::EquidistantRight.to_string(), "EQUID-RIGHT");
        assert!(QuadType::from_str("LOBATTO").is_err());
    }
}
