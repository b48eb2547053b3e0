//! Polynomial roots from the eigenvalues of the companion matrix.
//!
//! The companion matrix is already upper Hessenberg; it is balanced and then
//! reduced with Francis double-shift QR. Internals use 1-based indices so the
//! deflation bookkeeping reads like the textbook recurrence.

/// Roots as (re, im) pairs plus whether every root deflated in budget.
#[derive(Clone, Debug, PartialEq)]
pub struct Roots {
    pub values: Vec<(f64, f64)>,
    pub converged: bool,
}

const MAX_SHIFTS_PER_ROOT: usize = 60;
const BALANCE_PASSES: usize = 100;

/// Roots of a monic polynomial given highest-degree coefficient first.
pub fn polynomial_roots(coeffs: &[f64]) -> Roots {
    let degree = coeffs.len().saturating_sub(1);
    match degree {
        0 => {
            return Roots {
                values: Vec::new(),
                converged: true,
            };
        }
        1 => {
            return Roots {
                values: vec![(-coeffs[1] / coeffs[0], 0.0)],
                converged: true,
            };
        }
        _ => {}
    }

    let lead = coeffs[0];
    let n = degree;
    let mut a = vec![vec![0.0; n + 1]; n + 1];
    for j in 1..=n {
        a[1][j] = -coeffs[j] / lead;
    }
    for i in 2..=n {
        a[i][i - 1] = 1.0;
    }

    balance(&mut a, n);
    hessenberg_qr(&mut a, n)
}

fn balance(a: &mut [Vec<f64>], n: usize) {
    const RADIX: f64 = 2.0;
    let sqrdx = RADIX * RADIX;
    for _ in 0..BALANCE_PASSES {
        let mut done = true;
        for i in 1..=n {
            let mut r = 0.0;
            let mut c = 0.0;
            for j in 1..=n {
                if j != i {
                    c += a[j][i].abs();
                    r += a[i][j].abs();
                }
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }
            let mut g = r / RADIX;
            let mut f = 1.0;
            let s = c + r;
            while c < g {
                f *= RADIX;
                c *= sqrdx;
            }
            g = r * RADIX;
            while c > g {
                f /= RADIX;
                c /= sqrdx;
            }
            if (c + r) / f < 0.95 * s {
                done = false;
                let g = 1.0 / f;
                for j in 1..=n {
                    a[i][j] *= g;
                }
                for row in a.iter_mut().take(n + 1).skip(1) {
                    row[i] *= f;
                }
            }
        }
        if done {
            break;
        }
    }
}

fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 { a.abs() } else { -a.abs() }
}

fn hessenberg_qr(a: &mut [Vec<f64>], n: usize) -> Roots {
    let mut wr = vec![0.0; n + 1];
    let mut wi = vec![0.0; n + 1];
    let mut converged = true;

    let mut anorm = 0.0;
    for i in 1..=n {
        for j in i.saturating_sub(1).max(1)..=n {
            anorm += a[i][j].abs();
        }
    }

    let mut nn = n;
    let mut t = 0.0;
    'outer: while nn >= 1 {
        let mut its = 0;
        loop {
            let mut l = nn;
            while l >= 2 {
                let mut s = a[l - 1][l - 1].abs() + a[l][l].abs();
                if s == 0.0 {
                    s = anorm;
                }
                if a[l][l - 1].abs() + s == s {
                    a[l][l - 1] = 0.0;
                    break;
                }
                l -= 1;
            }

            let mut x = a[nn][nn];
            if l == nn {
                // one root found
                wr[nn] = x + t;
                wi[nn] = 0.0;
                nn -= 1;
            } else {
                let mut y = a[nn - 1][nn - 1];
                let mut w = a[nn][nn - 1] * a[nn - 1][nn];
                if l == nn - 1 {
                    // two roots found
                    let p = 0.5 * (y - x);
                    let q = p * p + w;
                    let z = q.abs().sqrt();
                    x += t;
                    if q >= 0.0 {
                        let z = p + sign(z, p);
                        wr[nn - 1] = x + z;
                        wr[nn] = x + z;
                        if z != 0.0 {
                            wr[nn] = x - w / z;
                        }
                        wi[nn - 1] = 0.0;
                        wi[nn] = 0.0;
                    } else {
                        wr[nn - 1] = x + p;
                        wr[nn] = x + p;
                        wi[nn - 1] = -z;
                        wi[nn] = z;
                    }
                    nn = nn.saturating_sub(2);
                } else {
                    if its == MAX_SHIFTS_PER_ROOT {
                        // Budget exhausted: report the remaining diagonal.
                        converged = false;
                        for i in 1..=nn {
                            wr[i] = a[i][i] + t;
                            wi[i] = 0.0;
                        }
                        break 'outer;
                    }
                    if its == 10 || its == 20 {
                        // exceptional shift
                        t += x;
                        for i in 1..=nn {
                            a[i][i] -= x;
                        }
                        let s = a[nn][nn - 1].abs() + a[nn - 1][nn - 2].abs();
                        x = 0.75 * s;
                        y = x;
                        w = -0.4375 * s * s;
                    }
                    its += 1;
                    francis_step(a, l, nn, x, y, w);
                }
            }
            if nn < 2 || l + 1 >= nn {
                break;
            }
        }
    }

    let values = (1..=n).map(|i| (wr[i], wi[i])).collect();
    Roots { values, converged }
}

/// One implicit double-shift sweep on rows l..=nn.
fn francis_step(a: &mut [Vec<f64>], l: usize, nn: usize, x: f64, y: f64, w: f64) {
    let mut p: f64;
    let mut q: f64;
    let mut r: f64;
    let mut m = nn - 2;
    loop {
        let z = a[m][m];
        let rr = x - z;
        let s = y - z;
        p = (rr * s - w) / a[m + 1][m] + a[m][m + 1];
        q = a[m + 1][m + 1] - z - rr - s;
        r = a[m + 2][m + 1];
        let s = p.abs() + q.abs() + r.abs();
        p /= s;
        q /= s;
        r /= s;
        if m == l {
            break;
        }
        let u = a[m][m - 1].abs() * (q.abs() + r.abs());
        let v = p.abs() * (a[m - 1][m - 1].abs() + z.abs() + a[m + 1][m + 1].abs());
        if u + v == v {
            break;
        }
        m -= 1;
    }

    for i in (m + 2)..=nn {
        a[i][i - 2] = 0.0;
        if i != m + 2 {
            a[i][i - 3] = 0.0;
        }
    }

    let mut x;
    for k in m..nn {
        if k != m {
            p = a[k][k - 1];
            q = a[k + 1][k - 1];
            r = 0.0;
            if k != nn - 1 {
                r = a[k + 2][k - 1];
            }
            x = p.abs() + q.abs() + r.abs();
            if x != 0.0 {
                p /= x;
                q /= x;
                r /= x;
            }
        } else {
            x = 0.0;
        }
        let s = sign((p * p + q * q + r * r).sqrt(), p);
        if s == 0.0 {
            continue;
        }
        if k == m {
            if l != m {
                a[k][k - 1] = -a[k][k - 1];
            }
        } else {
            a[k][k - 1] = -s * x;
        }
        p += s;
        let xx = p / s;
        let yy = q / s;
        let zz = r / s;
        q /= p;
        r /= p;
        for j in k..=nn {
            let mut pp = a[k][j] + q * a[k + 1][j];
            if k != nn - 1 {
                pp += r * a[k + 2][j];
                a[k + 2][j] -= pp * zz;
            }
            a[k + 1][j] -= pp * yy;
            a[k][j] -= pp * xx;
        }
        let mmin = if nn < k + 3 { nn } else { k + 3 };
        for i in l..=mmin {
            let mut pp = xx * a[i][k] + yy * a[i][k + 1];
            if k != nn - 1 {
                pp += zz * a[i][k + 2];
                a[i][k + 2] -= pp * r;
            }
            a[i][k + 1] -= pp * q;
            a[i][k] -= pp;
        }
    }
}
