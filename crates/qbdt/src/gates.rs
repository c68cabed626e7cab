//! Named gates and the two-qubit exchange family.

use num_complex::Complex64;

use crate::error::QbdtResult;
use crate::gate::Mtrx2;
use crate::register::Qbdt;

const ONE: Complex64 = Complex64::new(1.0, 0.0);

impl Qbdt {
    /// Hadamard.
    pub fn h(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::h(), q)
    }

    /// Pauli-X.
    pub fn x(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::x(), q)
    }

    /// Pauli-Y.
    pub fn y(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::y(), q)
    }

    /// Pauli-Z.
    pub fn z(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::z(), q)
    }

    /// S.
    pub fn s(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::s(), q)
    }

    /// S-dagger.
    pub fn sdg(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::sdg(), q)
    }

    /// T.
    pub fn t(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::t(), q)
    }

    /// T-dagger.
    pub fn tdg(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::tdg(), q)
    }

    /// sqrt(X).
    pub fn sx(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::sx(), q)
    }

    /// sqrt(X)-dagger.
    pub fn sxdg(&mut self, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::sxdg(), q)
    }

    /// X rotation.
    pub fn rx(&mut self, theta: f64, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::rx(theta), q)
    }

    /// Y rotation.
    pub fn ry(&mut self, theta: f64, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::ry(theta), q)
    }

    /// Z rotation.
    pub fn rz(&mut self, theta: f64, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::rz(theta), q)
    }

    /// General single-qubit rotation U(theta, phi, lambda).
    pub fn u(&mut self, theta: f64, phi: f64, lambda: f64, q: usize) -> QbdtResult<()> {
        self.mtrx(&Mtrx2::u(theta, phi, lambda), q)
    }

    /// Controlled NOT.
    pub fn cnot(&mut self, control: usize, target: usize) -> QbdtResult<()> {
        self.mc_invert(&[control], ONE, ONE, target)
    }

    /// NOT on `target` when `control` reads 0.
    pub fn anti_cnot(&mut self, control: usize, target: usize) -> QbdtResult<()> {
        self.mac_mtrx(&[control], &Mtrx2::x(), target)
    }

    /// Controlled Y.
    pub fn cy(&mut self, control: usize, target: usize) -> QbdtResult<()> {
        self.mc_mtrx(&[control], &Mtrx2::y(), target)
    }

    /// Controlled Z.
    pub fn cz(&mut self, control: usize, target: usize) -> QbdtResult<()> {
        self.mc_phase(&[control], ONE, -ONE, target)
    }

    /// Toffoli.
    pub fn ccnot(&mut self, c1: usize, c2: usize, target: usize) -> QbdtResult<()> {
        self.mc_invert(&[c1, c2], ONE, ONE, target)
    }

    // =========================================================================
    // Exchange family
    // =========================================================================

    /// Exchange two qubits.
    pub fn swap(&mut self, q1: usize, q2: usize) -> QbdtResult<()> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        if q1 == q2 {
            return Ok(());
        }
        self.cnot(q1, q2)?;
        self.cnot(q2, q1)?;
        self.cnot(q1, q2)
    }

    /// Swap, with phase `i` on the exchanged `|01>`/`|10>` amplitudes.
    pub fn iswap(&mut self, q1: usize, q2: usize) -> QbdtResult<()> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        if q1 == q2 {
            return Ok(());
        }
        self.swap(q1, q2)?;
        self.cz(q1, q2)?;
        self.s(q1)?;
        self.s(q2)
    }

    /// Inverse of [`Qbdt::iswap`].
    pub fn iiswap(&mut self, q1: usize, q2: usize) -> QbdtResult<()> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        if q1 == q2 {
            return Ok(());
        }
        self.swap(q1, q2)?;
        self.cz(q1, q2)?;
        self.sdg(q1)?;
        self.sdg(q2)
    }

    /// Square root of swap.
    pub fn sqrt_swap(&mut self, q1: usize, q2: usize) -> QbdtResult<()> {
        self.exchange_root(&[], q1, q2, &Mtrx2::sx())
    }

    /// Inverse square root of swap.
    pub fn isqrt_swap(&mut self, q1: usize, q2: usize) -> QbdtResult<()> {
        self.exchange_root(&[], q1, q2, &Mtrx2::sxdg())
    }

    /// [`Qbdt::sqrt_swap`] where every control reads 1.
    pub fn csqrt_swap(&mut self, controls: &[usize], q1: usize, q2: usize) -> QbdtResult<()> {
        self.exchange_root(controls, q1, q2, &Mtrx2::sx())
    }

    /// [`Qbdt::isqrt_swap`] where every control reads 1.
    pub fn cisqrt_swap(&mut self, controls: &[usize], q1: usize, q2: usize) -> QbdtResult<()> {
        self.exchange_root(controls, q1, q2, &Mtrx2::sxdg())
    }

    /// Conjugating a controlled `root` by CNOT(q2 -> q1) makes it act on
    /// the `{|01>, |10>}` block only. Extra `controls` only gate the root.
    fn exchange_root(
        &mut self,
        controls: &[usize],
        q1: usize,
        q2: usize,
        root: &Mtrx2,
    ) -> QbdtResult<()> {
        self.check_gate(controls, true, q1)?;
        self.check_gate(controls, true, q2)?;
        if q1 == q2 {
            return Ok(());
        }
        let mut inner = controls.to_vec();
        inner.push(q1);
        self.cnot(q2, q1)?;
        self.mc_mtrx(&inner, root, q2)?;
        self.cnot(q2, q1)
    }

    /// Swap `q1` and `q2` where every control reads 1.
    pub fn cswap(&mut self, controls: &[usize], q1: usize, q2: usize) -> QbdtResult<()> {
        if controls.is_empty() {
            return self.swap(q1, q2);
        }
        self.check_gate(controls, true, q1)?;
        self.check_gate(controls, true, q2)?;
        if q1 == q2 {
            return Ok(());
        }
        let mut inner = controls.to_vec();
        inner.push(q1);
        self.cnot(q2, q1)?;
        self.mc_invert(&inner, ONE, ONE, q2)?;
        self.cnot(q2, q1)
    }

    /// Fermionic simulation gate: `cos(theta)`/`-i sin(theta)` mixing of
    /// `|01>` and `|10>`, and phase `e^{-i phi}` on `|11>`.
    pub fn fsim(&mut self, theta: f64, phi: f64, q1: usize, q2: usize) -> QbdtResult<()> {
        self.check_qubit(q1)?;
        self.check_qubit(q2)?;
        if q1 == q2 {
            return Ok(());
        }
        if theta != 0.0 {
            self.cnot(q1, q2)?;
            self.mc_mtrx(&[q2], &Mtrx2::rx(2.0 * theta), q1)?;
            self.cnot(q1, q2)?;
        }
        if phi != 0.0 {
            self.mc_phase(&[q1], ONE, Complex64::from_polar(1.0, -phi), q2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::QbdtConfig;
    use crate::register::Qbdt;
    use num_complex::Complex64;

    fn reg(qubits: usize, perm: u128) -> Qbdt {
        Qbdt::with_config(qubits, perm, QbdtConfig::default().with_seed(3)).unwrap()
    }

    fn approx(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_swap_moves_bit() {
        let mut r = reg(3, 0b001);
        r.swap(0, 2).unwrap();
        assert!(approx(r.get_amplitude(0b100).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_iswap_phases() {
        let mut r = reg(2, 0b01);
        r.iswap(0, 1).unwrap();
        assert!(approx(r.get_amplitude(0b10).unwrap(), Complex64::new(0.0, 1.0)));

        let mut r = reg(2, 0b11);
        r.iswap(0, 1).unwrap();
        assert!(approx(r.get_amplitude(0b11).unwrap(), Complex64::new(1.0, 0.0)));

        r.iiswap(0, 1).unwrap();
        assert!(approx(r.get_amplitude(0b11).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_sqrt_swap_twice_is_swap() {
        let mut r = reg(2, 0b01);
        r.sqrt_swap(0, 1).unwrap();
        let half = r.get_amplitude(0b01).unwrap();
        assert!(approx(half, Complex64::new(0.5, 0.5)));
        r.sqrt_swap(0, 1).unwrap();
        assert!(approx(r.get_amplitude(0b10).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_isqrt_swap_undoes_sqrt_swap() {
        let mut r = reg(2, 0b10);
        r.sqrt_swap(0, 1).unwrap();
        r.isqrt_swap(0, 1).unwrap();
        assert!(approx(r.get_amplitude(0b10).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_cswap_respects_control() {
        let mut r = reg(3, 0b010);
        r.cswap(&[0], 1, 2).unwrap();
        assert!(approx(r.get_amplitude(0b010).unwrap(), Complex64::new(1.0, 0.0)));

        let mut r = reg(3, 0b011);
        r.cswap(&[0], 1, 2).unwrap();
        assert!(approx(r.get_amplitude(0b101).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_controlled_sqrt_swap() {
        // Control clear: nothing happens.
        let mut r = reg(3, 0b010);
        r.csqrt_swap(&[0], 1, 2).unwrap();
        r.csqrt_swap(&[0], 1, 2).unwrap();
        assert!(approx(r.get_amplitude(0b010).unwrap(), Complex64::new(1.0, 0.0)));

        // Control set: two roots make a swap.
        let mut r = reg(3, 0b011);
        r.csqrt_swap(&[0], 1, 2).unwrap();
        r.csqrt_swap(&[0], 1, 2).unwrap();
        assert!(approx(r.get_amplitude(0b101).unwrap(), Complex64::new(1.0, 0.0)));

        let mut r = reg(3, 0b011);
        r.csqrt_swap(&[0], 1, 2).unwrap();
        r.cisqrt_swap(&[0], 1, 2).unwrap();
        assert!(approx(r.get_amplitude(0b011).unwrap(), Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_fsim() {
        let theta = 0.4;
        let phi = 0.9;
        let mut r = reg(2, 0b01);
        r.fsim(theta, phi, 0, 1).unwrap();
        assert!(approx(
            r.get_amplitude(0b01).unwrap(),
            Complex64::new(theta.cos(), 0.0)
        ));
        assert!(approx(
            r.get_amplitude(0b10).unwrap(),
            Complex64::new(0.0, -theta.sin())
        ));

        let mut r = reg(2, 0b11);
        r.fsim(theta, phi, 0, 1).unwrap();
        assert!(approx(
            r.get_amplitude(0b11).unwrap(),
            Complex64::from_polar(1.0, -phi)
        ));
    }
}
