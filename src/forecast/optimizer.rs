//! Derivative-free minimization (Nelder-Mead simplex)
//!
//! Used to minimize the conditional sum of squares of an ARIMA model over its
//! unconstrained parameters. Deterministic: the same start point always yields
//! the same result.

/// Settings for a simplex search
#[derive(Debug, Clone)]
pub struct NelderMead {
    /// Stop when the spread of objective values falls below
    /// `f_tolerance * (1 + |f_best|)` and the simplex is smaller than `x_tolerance`
    pub f_tolerance: f64,
    pub x_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            f_tolerance: 1e-10,
            x_tolerance: 1e-7,
            max_iterations: 5_000,
        }
    }
}

/// Outcome of a minimization
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimize `f` starting from `x0`, with initial simplex offsets `steps`
    ///
    /// Non-finite objective values are treated as +infinity so the simplex
    /// moves away from them.
    pub fn minimize<F>(&self, f: F, x0: &[f64], steps: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let n = x0.len();
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() { v } else { f64::INFINITY }
        };

        if n == 0 {
            return Minimum { x: Vec::new(), value: eval(x0), iterations: 0, converged: true };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(x0.to_vec());
        for i in 0..n {
            let mut vertex = x0.to_vec();
            vertex[i] += steps.get(i).copied().unwrap_or(0.1);
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            order_simplex(&mut simplex, &mut values);

            if self.has_converged(&simplex, &values) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = centroid_excluding_worst(&simplex);
            let worst = &simplex[n];

            let reflected = affine(&centroid, worst, REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = affine(&centroid, worst, EXPAND);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            // Outside contraction if the reflection improved on the worst point
            let coef = if f_reflected < values[n] { CONTRACT } else { -CONTRACT };
            let contracted = affine(&centroid, worst, coef);
            let f_contracted = eval(&contracted);

            if f_contracted < values[n].min(f_reflected) {
                simplex[n] = contracted;
                values[n] = f_contracted;
                continue;
            }

            // Shrink everything toward the best vertex
            let best = simplex[0].clone();
            for i in 1..=n {
                for (xj, bj) in simplex[i].iter_mut().zip(&best) {
                    *xj = bj + SHRINK * (*xj - bj);
                }
                values[i] = eval(&simplex[i]);
            }
        }

        order_simplex(&mut simplex, &mut values);
        Minimum {
            x: simplex.swap_remove(0),
            value: values[0],
            iterations,
            converged,
        }
    }

    fn has_converged(&self, simplex: &[Vec<f64>], values: &[f64]) -> bool {
        let best = values[0];
        let f_spread = values.iter().map(|v| (v - best).abs()).fold(0.0, f64::max);
        if f_spread > self.f_tolerance * (1.0 + best.abs()) {
            return false;
        }
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        x_spread <= self.x_tolerance
    }
}

/// Sort vertices by objective value, best first (stable for ties)
fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn centroid_excluding_worst(simplex: &[Vec<f64>]) -> Vec<f64> {
    let n = simplex.len() - 1;
    let mut c = vec![0.0; simplex[0].len()];
    for vertex in &simplex[..n] {
        for (cj, vj) in c.iter_mut().zip(vertex) {
            *cj += vj / n as f64;
        }
    }
    c
}

/// `centroid + coef * (centroid - worst)`
fn affine(centroid: &[f64], worst: &[f64], coef: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst)
        .map(|(c, w)| c + coef * (c - w))
        .collect()
}
