//! Cubic-spline interpolation of tabulated 1-D data.
//!
//! The spline uses not-a-knot end conditions: the third derivative is
//! continuous across the second and penultimate knots. With three knots it
//! degenerates to the interpolating parabola and with two to a straight line.
//! Evaluation outside `[x_0, x_{n-1}]` is refused with a range error instead
//! of extrapolating.

use crate::error::{FieldError, Result};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(FieldError::invalid(format!(
                "spline abscissa and ordinate lengths differ ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(FieldError::invalid(
                "spline needs at least two knots".to_string(),
            ));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(FieldError::invalid(
                "spline knots must be strictly increasing".to_string(),
            ));
        }

        let m = second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn eval(&self, xq: f64) -> Result<f64> {
        let (lo, hi) = self.domain();
        if !(xq >= lo && xq <= hi) {
            return Err(FieldError::Range {
                value: xq,
                min: lo,
                max: hi,
            });
        }

        // First knot strictly greater than xq.
        let upper = self.x.partition_point(|&k| k <= xq);
        if self.x[upper - 1] == xq {
            return Ok(self.y[upper - 1]);
        }
        let j = upper - 1;
        let h = self.x[j + 1] - self.x[j];
        let a = self.x[j + 1] - xq;
        let b = xq - self.x[j];

        Ok(self.m[j] * a.powi(3) / (6.0 * h)
            + self.m[j + 1] * b.powi(3) / (6.0 * h)
            + (self.y[j] / h - self.m[j] * h / 6.0) * a
            + (self.y[j + 1] / h - self.m[j + 1] * h / 6.0) * b)
    }

    pub fn eval_many(&self, xs: &[f64]) -> Result<Vec<f64>> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    match n {
        2 => return vec![0.0; 2],
        3 => {
            let d0 = (y[1] - y[0]) / (x[1] - x[0]);
            let d1 = (y[2] - y[1]) / (x[2] - x[1]);
            let curvature = 2.0 * (d1 - d0) / (x[2] - x[0]);
            return vec![curvature; 3];
        }
        _ => {}
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let d: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

    // Tridiagonal system for the interior curvatures m_1..m_{n-2}, with the
    // not-a-knot conditions eliminating m_0 and m_{n-1}.
    let size = n - 2;
    let mut sub = vec![0.0; size];
    let mut diag = vec![0.0; size];
    let mut sup = vec![0.0; size];
    let mut rhs = vec![0.0; size];
    for row in 0..size {
        let i = row + 1;
        sub[row] = h[i - 1];
        diag[row] = 2.0 * (h[i - 1] + h[i]);
        sup[row] = h[i];
        rhs[row] = 6.0 * (d[i] - d[i - 1]);
    }

    // m_0 = ((h0 + h1) m_1 - h0 m_2) / h1
    diag[0] += h[0] * (h[0] + h[1]) / h[1];
    sup[0] -= h[0] * h[0] / h[1];
    // m_{n-1} = ((h_{n-2} + h_{n-3}) m_{n-2} - h_{n-2} m_{n-3}) / h_{n-3}
    let (hl, hp) = (h[n - 2], h[n - 3]);
    diag[size - 1] += hl * (hl + hp) / hp;
    sub[size - 1] -= hl * hl / hp;

    let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs);

    let mut m = vec![0.0; n];
    m[1..n - 1].copy_from_slice(&interior);
    m[0] = ((h[0] + h[1]) * m[1] - h[0] * m[2]) / h[1];
    m[n - 1] = ((hl + hp) * m[n - 2] - hl * m[n - 3]) / hp;
    m
}

/// Thomas algorithm. `sub[0]` and `sup[len-1]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut r = vec![0.0; n];

    c[0] = sup[0] / diag[0];
    r[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - sub[i] * c[i - 1];
        c[i] = if i + 1 < n { sup[i] / denom } else { 0.0 };
        r[i] = (rhs[i] - sub[i] * r[i - 1]) / denom;
    }

    let mut out = vec![0.0; n];
    out[n - 1] = r[n - 1];
    for i in (0..n - 1).rev() {
        out[i] = r[i] - c[i] * out[i + 1];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reproduces_cubic_polynomial_exactly() {
        // Not-a-knot splines are exact for cubics, even on uneven knots.
        let f = |x: f64| 0.5 * x.powi(3) - 2.0 * x * x + x - 3.0;
        let x = [0.0, 0.3, 1.1, 1.5, 2.6, 3.0, 4.2];
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for q in [0.1, 0.77, 1.3, 2.0, 2.99, 4.0] {
            assert_abs_diff_eq!(spline.eval(q).unwrap(), f(q), epsilon = 1e-10);
        }
    }

    #[test]
    fn four_knots_give_the_interpolating_cubic() {
        let f = |x: f64| x.powi(3) - x;
        let x = [-1.0, 0.0, 0.5, 2.0];
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_abs_diff_eq!(spline.eval(1.2).unwrap(), f(1.2), epsilon = 1e-10);
    }

    #[test]
    fn small_knot_counts() {
        let line = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert_abs_diff_eq!(line.eval(0.5).unwrap(), 2.0, epsilon = 1e-12);

        let parabola = CubicSpline::new(&[0.0, 1.0, 3.0], &[0.0, 1.0, 9.0]).unwrap();
        assert_abs_diff_eq!(parabola.eval(2.0).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn nodes_are_returned_verbatim() {
        let x = [0.0, 0.1, 0.25, 0.7, 1.0];
        let y = [3.1, -0.2, 7.7, 1.0e-3, 2.5];
        let spline = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert_eq!(spline.eval(*xi).unwrap(), *yi);
        }
    }

    #[test]
    fn refuses_to_extrapolate() {
        let spline = CubicSpline::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 0.0, 1.0]).unwrap();
        assert!(matches!(spline.eval(-0.01), Err(FieldError::Range { .. })));
        assert!(matches!(spline.eval(3.5), Err(FieldError::Range { .. })));
        assert!(spline.eval(f64::NAN).is_err());
    }

    #[test]
    fn rejects_bad_knots() {
        assert!(CubicSpline::new(&[0.0], &[1.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 0.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::new(&[0.0, 1.0], &[1.0]).is_err());
    }
}
