//! The externally visible quantum register.

use std::sync::Arc;

use num_complex::Complex64;
use qbdt_dense::{DenseEngineFactory, StateVectorFactory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPool;
use tracing::{debug, instrument};

use crate::config::QbdtConfig;
use crate::error::{QbdtError, QbdtResult};
use crate::gate::Mtrx2;
use crate::node::ONE;
use crate::perm::{BitCapInt, MAX_QUBITS, check_perm, pow2};
use crate::shard::{self, ShardBuffer};
use crate::traversal::collect_traversal;
use crate::tree::{BdtTree, Control};

/// A quantum register stored as a compressed binary decision tree.
///
/// Single-qubit gates are buffered per qubit and only reach the tree when
/// a dependent operation needs them. Operations without a tree algorithm
/// run on a dense engine built by the register's [`DenseEngineFactory`].
///
/// Clones share the worker pool and dense factory but nothing else.
#[derive(Debug, Clone)]
pub struct Qbdt {
    pub(crate) tree: BdtTree,
    pub(crate) shards: ShardBuffer,
    pub(crate) config: QbdtConfig,
    pub(crate) rng: StdRng,
    pub(crate) pool: Arc<ThreadPool>,
    pub(crate) dense: Arc<dyn DenseEngineFactory>,
}

impl Qbdt {
    /// Create a register of `qubit_count` qubits in basis state `perm`,
    /// with configuration from the environment.
    pub fn new(qubit_count: usize, perm: BitCapInt) -> QbdtResult<Self> {
        Self::with_config(qubit_count, perm, QbdtConfig::from_env())
    }

    /// Create a register with an explicit configuration and its own
    /// worker pool of `config.worker_threads` threads.
    pub fn with_config(qubit_count: usize, perm: BitCapInt, config: QbdtConfig) -> QbdtResult<Self> {
        config.validate()?;
        let pool = Self::build_pool(&config)?;
        Self::with_pool(qubit_count, perm, config, pool)
    }

    /// Build a worker pool sized by `config`, for sharing between
    /// registers through [`Qbdt::with_pool`].
    pub fn build_pool(config: &QbdtConfig) -> QbdtResult<Arc<ThreadPool>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("qbdt-worker-{i}"))
            .build()?;
        Ok(Arc::new(pool))
    }

    /// Create a register that runs its traversals on an existing pool.
    /// `config.worker_threads` is ignored.
    pub fn with_pool(
        qubit_count: usize,
        perm: BitCapInt,
        config: QbdtConfig,
        pool: Arc<ThreadPool>,
    ) -> QbdtResult<Self> {
        config.validate()?;
        if qubit_count > MAX_QUBITS {
            return Err(QbdtError::TooManyQubits {
                requested: qubit_count,
                max: MAX_QUBITS,
            });
        }
        check_perm(perm, qubit_count)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let dense = Arc::new(StateVectorFactory::with_max_qubits(config.max_dense_qubits));
        debug!(qubit_count, threads = pool.current_num_threads(), "register created");

        Ok(Self {
            tree: BdtTree::basis(qubit_count, perm, ONE, config.separability_threshold),
            shards: ShardBuffer::new(qubit_count),
            config,
            rng,
            pool,
            dense,
        })
    }

    /// The worker pool, for handing to [`Qbdt::with_pool`].
    pub fn pool(&self) -> Arc<ThreadPool> {
        Arc::clone(&self.pool)
    }

    /// Replace the dense fallback engine factory.
    pub fn with_dense_factory(mut self, factory: Arc<dyn DenseEngineFactory>) -> Self {
        self.dense = factory;
        self
    }

    /// An empty sibling register sharing this one's pool, factory and
    /// configuration.
    pub(crate) fn sibling(&mut self, qubit_count: usize) -> Self {
        let seed = self.rng.r#gen();
        Self {
            tree: BdtTree::basis(qubit_count, 0, ONE, self.eps()),
            shards: ShardBuffer::new(qubit_count),
            config: self.config.clone(),
            rng: StdRng::seed_from_u64(seed),
            pool: Arc::clone(&self.pool),
            dense: Arc::clone(&self.dense),
        }
    }

    /// Number of qubits.
    pub fn qubit_count(&self) -> usize {
        self.tree.qubit_count()
    }

    /// Active configuration.
    pub fn config(&self) -> &QbdtConfig {
        &self.config
    }

    /// The dense fallback factory.
    pub fn dense_factory(&self) -> &Arc<dyn DenseEngineFactory> {
        &self.dense
    }

    /// Separability threshold.
    pub(crate) fn eps(&self) -> f64 {
        self.config.separability_threshold
    }

    // =========================================================================
    // Validation
    // =========================================================================

    pub(crate) fn check_qubit(&self, qubit: usize) -> QbdtResult<()> {
        if qubit >= self.qubit_count() {
            return Err(QbdtError::QubitOutOfRange {
                qubit,
                qubit_count: self.qubit_count(),
            });
        }
        Ok(())
    }

    pub(crate) fn check_range(&self, start: usize, length: usize) -> QbdtResult<()> {
        if start.checked_add(length).is_none_or(|end| end > self.qubit_count()) {
            return Err(QbdtError::RangeOutOfBounds {
                start,
                length,
                qubit_count: self.qubit_count(),
            });
        }
        Ok(())
    }

    /// Validate a gate's qubits and return its controls sorted.
    pub(crate) fn check_gate(
        &self,
        controls: &[usize],
        value: bool,
        target: usize,
    ) -> QbdtResult<Vec<Control>> {
        self.check_qubit(target)?;
        let mut sorted = Vec::with_capacity(controls.len());
        for &c in controls {
            self.check_qubit(c)?;
            if c == target {
                return Err(QbdtError::DuplicateQubit(c));
            }
            sorted.push((c, value));
        }
        sorted.sort_unstable();
        if let Some(w) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(QbdtError::DuplicateQubit(w[0].0));
        }
        Ok(sorted)
    }

    pub(crate) fn check_dense_width(&self) -> QbdtResult<()> {
        if self.qubit_count() > self.config.max_dense_qubits {
            return Err(QbdtError::TooManyQubits {
                requested: self.qubit_count(),
                max: self.config.max_dense_qubits,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Shard management
    // =========================================================================

    /// Apply the pending shard on `qubit`, if any.
    pub(crate) fn flush_qubit(&mut self, qubit: usize) {
        if let Some(pending) = self.shards.take(qubit) {
            let tree = std::mem::take(&mut self.tree);
            self.tree = shard::flush(tree, qubit, &pending);
        }
    }

    /// Apply the pending shard on `qubit` unless it is diagonal.
    pub(crate) fn flush_if_non_phase(&mut self, qubit: usize) {
        let eps = self.eps();
        if self.shards.get(qubit).is_some_and(|s| !s.is_phase(eps)) {
            self.flush_qubit(qubit);
        }
    }

    /// Apply every pending shard.
    pub(crate) fn flush_all(&mut self) {
        if !self.shards.any_pending() {
            return;
        }
        for q in 0..self.qubit_count() {
            self.flush_qubit(q);
        }
        self.after_mutation();
    }

    /// Compact the tree according to the configured policy.
    pub(crate) fn after_mutation(&mut self) {
        if self.config.auto_prune {
            self.tree.prune();
        } else {
            self.tree.prune_if_bloated();
        }
    }

    // =========================================================================
    // Gate dispatch
    // =========================================================================

    /// Apply an arbitrary single-qubit gate. The gate is buffered and
    /// composed with any gate already pending on `target`.
    pub fn mtrx(&mut self, m: &Mtrx2, target: usize) -> QbdtResult<()> {
        self.check_qubit(target)?;
        let eps = self.eps();
        self.shards.buffer(target, m, eps);
        Ok(())
    }

    /// Apply `m` to `target` where every control reads 1.
    pub fn mc_mtrx(&mut self, controls: &[usize], m: &Mtrx2, target: usize) -> QbdtResult<()> {
        self.controlled(controls, true, m, target)
    }

    /// Apply `m` to `target` where every control reads 0.
    pub fn mac_mtrx(&mut self, controls: &[usize], m: &Mtrx2, target: usize) -> QbdtResult<()> {
        self.controlled(controls, false, m, target)
    }

    /// Controlled `diag(top_left, bottom_right)`.
    pub fn mc_phase(
        &mut self,
        controls: &[usize],
        top_left: Complex64,
        bottom_right: Complex64,
        target: usize,
    ) -> QbdtResult<()> {
        self.controlled(controls, true, &Mtrx2::phase(top_left, bottom_right), target)
    }

    /// Controlled `[[0, top_right], [bottom_left, 0]]`.
    pub fn mc_invert(
        &mut self,
        controls: &[usize],
        top_right: Complex64,
        bottom_left: Complex64,
        target: usize,
    ) -> QbdtResult<()> {
        self.controlled(controls, true, &Mtrx2::invert(top_right, bottom_left), target)
    }

    fn controlled(
        &mut self,
        controls: &[usize],
        value: bool,
        m: &Mtrx2,
        target: usize,
    ) -> QbdtResult<()> {
        if controls.is_empty() {
            return self.mtrx(m, target);
        }
        let sorted = self.check_gate(controls, value, target)?;
        let eps = self.eps();

        // Diagonal shards commute with use as a control, and with a
        // diagonal gate on the same target.
        for &(c, _) in &sorted {
            self.flush_if_non_phase(c);
        }
        if m.is_phase(eps) {
            self.flush_if_non_phase(target);
        } else {
            self.flush_qubit(target);
        }

        self.tree.apply(m, &sorted, target);
        self.after_mutation();
        Ok(())
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// Reset to basis state `perm` with amplitude `phase`.
    pub fn set_permutation(&mut self, perm: BitCapInt, phase: Complex64) -> QbdtResult<()> {
        check_perm(perm, self.qubit_count())?;
        self.shards.dump();
        self.tree = BdtTree::basis(self.qubit_count(), perm, phase, self.eps());
        Ok(())
    }

    /// Amplitude of one basis state.
    pub fn get_amplitude(&mut self, perm: BitCapInt) -> QbdtResult<Complex64> {
        check_perm(perm, self.qubit_count())?;
        self.flush_all();
        Ok(self.tree.amplitude(perm))
    }

    /// Flush pending gates, then deliver every `(index, amplitude)` pair to
    /// `sink` on the register's worker pool. Each index arrives exactly
    /// once, in no particular order.
    #[instrument(skip(self, sink), fields(qubits = self.qubit_count()))]
    pub fn get_traversal<F>(&mut self, sink: F) -> QbdtResult<()>
    where
        F: Fn(usize, Complex64) + Sync + Send,
    {
        self.check_dense_width()?;
        self.flush_all();
        let tree = &self.tree;
        self.pool.install(|| tree.get_traversal(sink));
        Ok(())
    }

    /// Every amplitude, indexed by basis state.
    pub fn get_quantum_state(&mut self) -> QbdtResult<Vec<Complex64>> {
        self.collect_amplitudes(|amp| amp)
    }

    /// Every basis-state probability.
    pub fn get_probs(&mut self) -> QbdtResult<Vec<f64>> {
        self.collect_amplitudes(|amp| amp.norm_sqr())
    }

    fn collect_amplitudes<T, M>(&mut self, map: M) -> QbdtResult<Vec<T>>
    where
        T: Default + Send + Sync,
        M: Fn(Complex64) -> T + Sync + Send,
    {
        self.check_dense_width()?;
        let size = 1usize << self.qubit_count();
        let mut walked = Ok(());
        let values = collect_traversal(size, |sink| {
            walked = self.get_traversal(|i, amp| sink(i, map(amp)));
        });
        walked.map(|()| values)
    }

    /// Overwrite the whole state. The amplitudes are taken as given,
    /// without normalization.
    #[instrument(skip(self, state), fields(qubits = self.qubit_count()))]
    pub fn set_quantum_state(&mut self, state: &[Complex64]) -> QbdtResult<()> {
        self.check_dense_width()?;
        let expected = 1usize << self.qubit_count();
        if state.len() != expected {
            return Err(QbdtError::StateLengthMismatch {
                expected,
                got: state.len(),
            });
        }
        if state.iter().all(|a| a.norm_sqr() <= self.eps()) {
            return Err(QbdtError::ZeroNorm);
        }
        self.shards.dump();
        let (qubit_count, eps) = (self.qubit_count(), self.eps());
        self.tree = self
            .pool
            .install(|| BdtTree::set_traversal(qubit_count, eps, |i| state[i]));
        Ok(())
    }

    /// Rescale the state to unit norm.
    pub fn normalize_state(&mut self) -> QbdtResult<()> {
        if self.tree.norm_sqr() <= self.eps() {
            return Err(QbdtError::ZeroNorm);
        }
        self.tree.normalize(self.config.normalize_threshold);
        Ok(())
    }

    /// Total probability.
    pub fn norm_sqr(&self) -> f64 {
        self.tree.norm_sqr()
    }

    /// Number of distinct tree nodes, after applying pending gates.
    pub fn count_branches(&mut self) -> usize {
        self.flush_all();
        self.tree.count_branches()
    }

    /// Force a full compaction of the tree.
    pub fn prune(&mut self) {
        self.tree.prune();
    }

    /// `1 - |<self|other>|^2`; 1 when the widths differ.
    pub fn sum_sqr_diff(&mut self, other: &mut Qbdt) -> QbdtResult<f64> {
        if self.qubit_count() != other.qubit_count() {
            return Ok(1.0);
        }
        let a = self.get_quantum_state()?;
        let b = other.get_quantum_state()?;
        let inner: Complex64 = a.iter().zip(&b).map(|(x, y)| x.conj() * y).sum();
        Ok((1.0 - inner.norm_sqr()).max(0.0))
    }

    /// `2^n`.
    pub fn max_power(&self) -> BitCapInt {
        pow2(self.qubit_count())
    }
}
