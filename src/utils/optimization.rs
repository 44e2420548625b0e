//! Derivative-free minimisation used to estimate ARMA coefficients.

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance before `max_iter`.
    pub converged: bool,
}

/// Nelder-Mead simplex settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Offset used to build the initial simplex around the starting point.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
        }
    }
}

/// Box constraints, one `(min, max)` pair per dimension.
pub type Bounds = [(f64, f64)];

struct Simplex<'a, F> {
    objective: F,
    bounds: Option<&'a Bounds>,
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
}

impl<'a, F> Simplex<'a, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn new(objective: F, initial: &[f64], bounds: Option<&'a Bounds>, step: f64) -> Self {
        let mut vertices = vec![clamp(initial.to_vec(), bounds)];
        for i in 0..initial.len() {
            let mut vertex = initial.to_vec();
            vertex[i] += if initial[i].abs() > 1e-10 {
                step * initial[i].abs()
            } else {
                step
            };
            vertices.push(clamp(vertex, bounds));
        }

        let mut simplex = Self {
            objective,
            bounds,
            values: Vec::new(),
            vertices,
        };
        let values: Vec<f64> = simplex.vertices.iter().map(|v| simplex.eval(v)).collect();
        simplex.values = values;
        simplex
    }

    /// Non-finite objective values rank last so the simplex moves away from them.
    fn eval(&self, point: &[f64]) -> f64 {
        let value = (self.objective)(point);
        if value.is_finite() {
            value
        } else {
            f64::MAX
        }
    }

    fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.vertices.len()).collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        self.vertices = order.iter().map(|&i| self.vertices[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i]).collect();
    }

    fn centroid(&self) -> Vec<f64> {
        let worst = self.vertices.len() - 1;
        let dims = self.vertices[0].len();
        let mut centroid = vec![0.0; dims];
        for vertex in &self.vertices[..worst] {
            for (c, x) in centroid.iter_mut().zip(vertex) {
                *c += x;
            }
        }
        centroid.iter_mut().for_each(|c| *c /= worst as f64);
        centroid
    }

    /// Point on the line through `centroid` and `towards`: `centroid + coef * (towards - centroid)`.
    fn along(&self, centroid: &[f64], towards: &[f64], coef: f64) -> (Vec<f64>, f64) {
        let point: Vec<f64> = centroid
            .iter()
            .zip(towards)
            .map(|(c, t)| c + coef * (t - c))
            .collect();
        let point = clamp(point, self.bounds);
        let value = self.eval(&point);
        (point, value)
    }

    fn replace_worst(&mut self, point: Vec<f64>, value: f64) {
        let worst = self.vertices.len() - 1;
        self.vertices[worst] = point;
        self.values[worst] = value;
    }

    fn shrink(&mut self, sigma: f64) {
        let best = self.vertices[0].clone();
        for i in 1..self.vertices.len() {
            let shrunk: Vec<f64> = best
                .iter()
                .zip(&self.vertices[i])
                .map(|(b, x)| b + sigma * (x - b))
                .collect();
            self.vertices[i] = clamp(shrunk, self.bounds);
            self.values[i] = self.eval(&self.vertices[i]);
        }
    }

    fn spread(&self) -> f64 {
        self.values[self.values.len() - 1] - self.values[0]
    }
}

fn clamp(mut point: Vec<f64>, bounds: Option<&Bounds>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

/// Minimise `objective` starting from `initial`.
///
/// # Example
/// ```
/// use vantedjo_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let min = nelder_mead(
///     |x| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2),
///     &[0.0, 0.0],
///     Some(&[(-0.99, 0.99), (-0.99, 0.99)]),
///     NelderMeadConfig::default(),
/// );
/// assert!((min.point[0] - 0.3).abs() < 1e-3);
/// assert!((min.point[1] + 0.2).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&Bounds>,
    config: NelderMeadConfig,
) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    if initial.is_empty() {
        let value = objective(initial);
        return Minimum {
            point: vec![],
            value,
            iterations: 0,
            converged: value.is_finite(),
        };
    }

    let mut simplex = Simplex::new(objective, initial, bounds, config.initial_step);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort();

        if simplex.spread() < config.tolerance {
            converged = true;
            break;
        }

        let n = simplex.vertices.len() - 1;
        let best = simplex.values[0];
        let second_worst = simplex.values[n - 1];
        let worst = simplex.values[n];
        let centroid = simplex.centroid();
        let worst_point = simplex.vertices[n].clone();

        let (reflected, reflected_value) = simplex.along(&centroid, &worst_point, -config.alpha);

        if reflected_value < best {
            let (expanded, expanded_value) =
                simplex.along(&centroid, &reflected, config.gamma);
            if expanded_value < reflected_value {
                simplex.replace_worst(expanded, expanded_value);
            } else {
                simplex.replace_worst(reflected, reflected_value);
            }
            continue;
        }

        if reflected_value < second_worst {
            simplex.replace_worst(reflected, reflected_value);
            continue;
        }

        // Contract towards whichever of the reflected/worst points is better.
        let (target, target_value) = if reflected_value < worst {
            (reflected, reflected_value)
        } else {
            (worst_point, worst)
        };
        let (contracted, contracted_value) = simplex.along(&centroid, &target, config.rho);
        if contracted_value < target_value {
            simplex.replace_worst(contracted, contracted_value);
            continue;
        }

        simplex.shrink(config.sigma);
    }

    simplex.sort();
    Minimum {
        point: simplex.vertices.swap_remove(0),
        value: simplex.values[0],
        iterations,
        converged,
    }
}
