//! Bounded Nelder–Mead simplex minimizer used for parameter estimation.

use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Initial simplex step, relative to the coordinate (absolute when the coordinate is ~0).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Minimize `objective` starting from `initial`, clamping every vertex into `bounds`.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: &[(f64, f64)],
    config: &NelderMeadConfig,
) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let clamp = |v: Vec<f64>| -> Vec<f64> {
        v.into_iter()
            .enumerate()
            .map(|(i, x)| match bounds.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect()
    };

    let start = clamp(initial.to_vec());
    if n == 0 {
        let value = objective(&start);
        return Minimum {
            point: start,
            value,
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        vertex[i] += if start[i].abs() > 1e-10 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        simplex.push(clamp(vertex));
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let by_value = |values: &[f64], a: &usize, b: &usize| {
        values[*a].partial_cmp(&values[*b]).unwrap_or(Ordering::Equal)
    };

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|a, b| by_value(&values, a, b));
        let (best, second_worst, worst) = (order[0], order[n - 1], order[n]);

        if (values[worst] - values[best]).abs() < config.tolerance {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| {
                simplex
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != worst)
                    .map(|(_, v)| v[j])
                    .sum::<f64>()
                    / n as f64
            })
            .collect();

        let towards = |from: &[f64], to: &[f64], t: f64| -> Vec<f64> {
            clamp(from.iter().zip(to).map(|(a, b)| a + t * (b - a)).collect())
        };

        // Reflection
        let reflected = towards(&centroid, &simplex[worst], -ALPHA);
        let reflected_value = objective(&reflected);

        if reflected_value < values[best] {
            // Expansion
            let expanded = towards(&centroid, &reflected, GAMMA);
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        // Contraction (outside if the reflection improved on the worst vertex).
        let (target, target_value) = if reflected_value < values[worst] {
            (reflected, reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = towards(&centroid, &target, RHO);
        let contracted_value = objective(&contracted);
        if contracted_value < target_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        // Shrink towards the best vertex.
        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i != best {
                simplex[i] = towards(&anchor, &simplex[i], SIGMA);
                values[i] = objective(&simplex[i]);
            }
        }
    }

    let best = (0..=n)
        .min_by(|a, b| by_value(&values, a, b))
        .unwrap_or(0);

    Minimum {
        point: simplex.swap_remove(best),
        value: values[best],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let min = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            &[],
            &NelderMeadConfig::default(),
        );

        assert!(min.converged);
        assert!((min.point[0] - 2.0).abs() < 1e-3);
        assert!((min.point[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn respects_bounds() {
        let min = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[0.0],
            &[(-0.99, 0.99)],
            &NelderMeadConfig::default(),
        );

        assert!(min.point[0] <= 0.99);
        assert!((min.point[0] - 0.99).abs() < 1e-3);
    }
}
