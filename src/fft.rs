//! The FFT engine: bit-reversal permutation, iterative in-place radix-2
//! Cooley-Tukey, and the real-interleaved pre/post-processing that recovers
//! the DFT of a length-`N` real sequence from one complex FFT of length
//! `N/2`.
//!
//! Two adjacent real samples are packed into one complex sample before the
//! transform (`Z[n] = x[2n] + i*x[2n+1]`), halving the working length. This
//! is the classic "real FFT via one half-length complex FFT" trick; see
//! `real_fft_inplace`/`inverse_real_fft_inplace` for the recombination step.

use num_complex::Complex;
use num_traits::Float;

use crate::numeric::reverse_bits;

/// In-place iterative radix-2 Cooley-Tukey FFT. `data.len()` must be a power
/// of two (lengths 0 and 1 are no-ops).
pub fn fft_inplace<T: Float>(data: &mut [Complex<T>]) {
    let n = data.len();
    if n <= 1 {
        return;
    }
    assert!(n.is_power_of_two(), "FFT length {n} is not a power of two");

    bit_reverse_permute(data);

    let stages = n.trailing_zeros();
    for stage in 0..stages {
        let stride = 1usize << (stage + 1);
        let half_stride = 1usize << stage;
        for base in (0..n).step_by(stride) {
            for k in 0..half_stride {
                let angle = -std::f64::consts::PI * 2.0 * (k as f64) / (stride as f64);
                let w = twiddle::<T>(angle);
                let e = data[base + k];
                let o = w * data[base + k + half_stride];
                data[base + k] = e + o;
                data[base + k + half_stride] = e - o;
            }
        }
    }
}

fn bit_reverse_permute<T: Copy>(data: &mut [Complex<T>]) {
    let n = data.len();
    let bits = n.trailing_zeros();
    for i in 0..n {
        let r = reverse_bits(i, bits);
        if r > i {
            data.swap(i, r);
        }
    }
}

fn twiddle<T: Float>(angle: f64) -> Complex<T> {
    Complex::new(
        T::from(angle.cos()).expect("angle cosine fits target float"),
        T::from(angle.sin()).expect("angle sine fits target float"),
    )
}

/// Computes the DFT of a length-`n` real sequence, packed two-samples-per-
/// complex-element, in place. `data.len()` must be a power of two.
pub fn real_fft_inplace<T: Float>(data: &mut [Complex<T>]) {
    fft_inplace(data);
    real_post_process_forward(data);
}

/// Inverts [`real_fft_inplace`]: given the packed real-DFT output, recovers
/// the original packed real-pair time-domain sequence in place.
pub fn inverse_real_fft_inplace<T: Float>(data: &mut [Complex<T>]) {
    let l = data.len();
    if l == 0 {
        return;
    }
    real_post_process_inverse(data);
    for v in data.iter_mut() {
        *v = v.conj();
    }
    fft_inplace(data);
    let scale = T::from(l as f64).expect("length fits target float");
    for v in data.iter_mut() {
        *v = v.conj() / scale;
    }
}

/// Forward recombination. For `k = 0`, DC and the Nyquist bin of the
/// original real sequence are packed into the real and imaginary parts of
/// `x[0]` respectively (the only two purely-real bins of a real signal's
/// DFT). For `1 <= k < l/2`, combines `x[k]` and `x[l-k]` using the twiddle
/// `W_k = exp(-i*pi*k/l)`. When `l` is even, the self-paired center bin
/// `x[l/2]` collapses to its own conjugate.
fn real_post_process_forward<T: Float>(x: &mut [Complex<T>]) {
    let l = x.len();
    if l == 0 {
        return;
    }
    let half_t = T::from(0.5).unwrap();
    let z0 = x[0];
    x[0] = Complex::new(z0.re + z0.im, z0.re - z0.im);

    let half = l / 2;
    for k in 1..half {
        let a = x[k];
        let b = x[l - k];
        let w = twiddle::<T>(-std::f64::consts::PI * (k as f64) / (l as f64));
        let one = Complex::new(T::one(), T::zero());
        let i_unit = Complex::new(T::zero(), T::one());
        let p = (one - i_unit * w) * half_t;
        let q = (one + i_unit * w) * half_t;
        // w_{l-k} = -1/w_k, substituted directly into the mirrored combination.
        let w_lk = -w.inv();
        let r = (one - i_unit * w_lk) * half_t;
        let s = (one + i_unit * w_lk) * half_t;
        x[k] = a * p + b.conj() * q;
        x[l - k] = b * r + a.conj() * s;
    }
    if l % 2 == 0 && half > 0 {
        x[half] = x[half].conj();
    }
}

/// Inverse of [`real_post_process_forward`]. Each per-`k` combination is a
/// 2x2 linear map in `(Z[k], conj(Z[l-k]))`; its coefficient matrix turns
/// out to be symmetric (`conj(r) = p`, `conj(s) = q`), so the inverse is
/// solved in closed form rather than re-derived per call.
fn real_post_process_inverse<T: Float>(x: &mut [Complex<T>]) {
    let l = x.len();
    if l == 0 {
        return;
    }
    let half_t = T::from(0.5).unwrap();
    let x0 = x[0];
    let a0 = (x0.re + x0.im) * half_t;
    let b0 = (x0.re - x0.im) * half_t;
    x[0] = Complex::new(a0, b0);

    let half = l / 2;
    for k in 1..half {
        let xk = x[k];
        let xlk = x[l - k];
        let w = twiddle::<T>(-std::f64::consts::PI * (k as f64) / (l as f64));
        let one = Complex::new(T::one(), T::zero());
        let i_unit = Complex::new(T::zero(), T::one());
        let p = (one - i_unit * w) * half_t;
        let q = (one + i_unit * w) * half_t;
        // det(M) = p^2 - q^2 = -i*w for this family of coefficients, so
        // 1/det = i * conj(w) since |w| = 1.
        let inv_det = i_unit * w.conj();
        let u = inv_det * (xk * p - q * xlk.conj());
        let v = inv_det * (p * xlk.conj() - q * xk);
        x[k] = u;
        x[l - k] = v.conj();
    }
    if l % 2 == 0 && half > 0 {
        x[half] = x[half].conj();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex_fft_matches_naive_dft(n: usize) {
        let mut data: Vec<Complex<f64>> = (0..n)
            .map(|i| Complex::new((i as f64 + 1.0).sin(), (i as f64 * 0.5).cos()))
            .collect();
        let original = data.clone();
        fft_inplace(&mut data);

        for (k, got) in data.iter().enumerate() {
            let mut expected = Complex::new(0.0, 0.0);
            for (j, x) in original.iter().enumerate() {
                let angle = -2.0 * std::f64::consts::PI * (k as f64) * (j as f64) / (n as f64);
                expected += x * Complex::new(angle.cos(), angle.sin());
            }
            assert!((got - expected).norm() < 1e-8, "bin {k}: {got} vs {expected}");
        }
    }

    #[test]
    fn fft_matches_naive_dft_several_sizes() {
        for &n in &[2usize, 4, 8, 16, 32] {
            complex_fft_matches_naive_dft(n);
        }
    }

    #[test]
    fn fft_trivial_lengths_are_noops() {
        let mut empty: Vec<Complex<f64>> = vec![];
        fft_inplace(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![Complex::new(3.0, 4.0)];
        fft_inplace(&mut one);
        assert_eq!(one[0], Complex::new(3.0, 4.0));
    }

    fn round_trip_tolerance(n: usize, tol: f64) {
        let mut data: Vec<Complex<f64>> = (0..n)
            .map(|i| Complex::new(((i * 7 + 3) % 11) as f64 / 11.0, 0.0))
            .collect();
        let original = data.clone();

        real_fft_inplace(&mut data);
        inverse_real_fft_inplace(&mut data);

        for (got, want) in data.iter().zip(original.iter()) {
            assert!(
                (got - want).norm() < tol,
                "round trip mismatch: {got} vs {want}"
            );
        }
    }

    #[test]
    fn real_fft_round_trips_double_precision() {
        for &n in &[2usize, 4, 8, 16, 64, 256] {
            round_trip_tolerance(n, 1e-10);
        }
    }

    #[test]
    fn real_fft_round_trips_single_precision() {
        let n = 64;
        let mut data: Vec<Complex<f32>> = (0..n)
            .map(|i| Complex::new(((i * 7 + 3) % 11) as f32 / 11.0, 0.0))
            .collect();
        let original = data.clone();

        real_fft_inplace(&mut data);
        inverse_real_fft_inplace(&mut data);

        for (got, want) in data.iter().zip(original.iter()) {
            assert!((got - want).norm() < 1e-4, "{got} vs {want}");
        }
    }

    #[test]
    fn forward_dc_nyquist_packing_matches_sum_and_difference() {
        // A constant signal has all its energy at DC: real part of bin 0
        // should be n * mean, imaginary part (the folded Nyquist bin) ~ 0
        // for an even-length constant sequence.
        let n = 16;
        let mut data: Vec<Complex<f64>> = (0..n).map(|_| Complex::new(1.0, 0.0)).collect();
        real_fft_inplace(&mut data);
        assert!((data[0].re - n as f64).abs() < 1e-9);
        assert!(data[0].im.abs() < 1e-9);
    }
}
