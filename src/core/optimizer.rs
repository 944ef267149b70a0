//! Derivative-free minimisation with the Nelder–Mead simplex method.
//!
//! Points are clamped to a symmetric box so an objective that flattens out
//! towards infinity cannot drag the simplex away; a plateau then collapses
//! through shrink steps and the search terminates.

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    pub max_iterations: usize,
    pub x_tolerance: f64,
    pub f_tolerance: f64,
    pub initial_step: f64,
    pub bound: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            x_tolerance: 1e-6,
            f_tolerance: 1e-9,
            initial_step: 0.5,
            bound: 10.0,
        }
    }
}

impl NelderMead {
    /// Minimise `objective` from `start`, then restart once from the optimum.
    ///
    /// Non-finite objective values are treated as `+inf`. `iterations` counts
    /// both runs; `converged` reflects the restart.
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let first = self.run(&objective, start);
        if !first.converged {
            return first;
        }

        let second = self.run(&objective, &first.point);
        let iterations = first.iterations + second.iterations;
        if second.value <= first.value {
            Minimum {
                iterations,
                ..second
            }
        } else {
            Minimum {
                iterations,
                converged: second.converged,
                ..first
            }
        }
    }

    fn run<F>(&self, objective: &F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let value = objective(x);
            if value.is_finite() {
                value
            } else {
                f64::INFINITY
            }
        };

        let n = start.len();
        let origin = self.clamp(start.to_vec());
        if n == 0 {
            let value = eval(&origin);
            return Minimum {
                point: origin,
                value,
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((origin.clone(), eval(&origin)));
        for i in 0..n {
            let mut vertex = origin.clone();
            vertex[i] = if vertex[i] + self.initial_step <= self.bound {
                vertex[i] + self.initial_step
            } else {
                vertex[i] - self.initial_step
            };
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            if self.has_converged(&simplex) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let (worst, f_worst) = simplex[n].clone();
            let f_best = simplex[0].1;
            let f_second_worst = simplex[n - 1].1;

            let reflected = self.clamp(affine(&centroid, &worst, -REFLECTION));
            let f_reflected = eval(&reflected);

            if f_reflected < f_best {
                let expanded = self.clamp(affine(&centroid, &reflected, EXPANSION));
                let f_expanded = eval(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < f_second_worst {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let accepted = if f_reflected < f_worst {
                let outside = self.clamp(affine(&centroid, &reflected, CONTRACTION));
                let f_outside = eval(&outside);
                (f_outside <= f_reflected).then_some((outside, f_outside))
            } else {
                let inside = self.clamp(affine(&centroid, &worst, CONTRACTION));
                let f_inside = eval(&inside);
                (f_inside < f_worst).then_some((inside, f_inside))
            };

            match accepted {
                Some(vertex) => simplex[n] = vertex,
                None => {
                    let best = simplex[0].0.clone();
                    for vertex in simplex.iter_mut().skip(1) {
                        let shrunk = affine(&best, &vertex.0, SHRINK);
                        let value = eval(&shrunk);
                        *vertex = (shrunk, value);
                    }
                }
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        if !converged {
            converged = self.has_converged(&simplex);
        }
        let (point, value) = simplex.swap_remove(0);

        Minimum {
            point,
            value,
            iterations,
            converged,
        }
    }

    fn has_converged(&self, simplex: &[(Vec<f64>, f64)]) -> bool {
        let (best, f_best) = &simplex[0];
        if !f_best.is_finite() {
            return false;
        }

        simplex[1..].iter().all(|(x, f)| {
            (f - f_best).abs() <= self.f_tolerance
                && x.iter()
                    .zip(best)
                    .all(|(a, b)| (a - b).abs() <= self.x_tolerance)
        })
    }

    fn clamp(&self, mut x: Vec<f64>) -> Vec<f64> {
        for v in x.iter_mut() {
            *v = v.clamp(-self.bound, self.bound);
        }
        x
    }
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let dim = vertices[0].0.len();
    (0..dim)
        .map(|j| vertices.iter().map(|(x, _)| x[j]).sum::<f64>() / n)
        .collect()
}

/// `base + t * (towards - base)`
fn affine(base: &[f64], towards: &[f64], t: f64) -> Vec<f64> {
    base.iter()
        .zip(towards)
        .map(|(b, x)| b + t * (x - b))
        .collect()
}
