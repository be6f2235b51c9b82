//! Lazy frame graph and parallel reducers.
//!
//! A [`Frame`] is a source [`ColumnSet`] plus a persistent chain of steps.
//! Each `define_*`/`filter` call returns a new frame whose chain shares every
//! earlier step with its parent, so deriving many views from one sample is
//! cheap and never copies event data.
//!
//! Reducers walk the chain once per entry. Entries are split into chunks of
//! [`DEFAULT_CHUNK_SIZE`], processed with rayon, and partial results are
//! combined in chunk order, so floating-point sums do not depend on the
//! number of worker threads.

use std::sync::Arc;

use rayon::prelude::*;

use crate::column::{Column, ColumnKind, ColumnSet};
use crate::error::{FrameError, Result};
use crate::expr::CompiledExpr;

/// Default number of entries evaluated per parallel task.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Storage type of a defined scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// `f64` values.
    F64,
    /// `i64` values.
    I64,
    /// Boolean values.
    Bool,
}

#[derive(Debug, Clone, Copy)]
enum Cell {
    F64(f64),
    I64(i64),
    Bool(bool),
}

impl Cell {
    #[inline]
    fn as_f64(self) -> f64 {
        match self {
            Cell::F64(v) => v,
            Cell::I64(v) => v as f64,
            Cell::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    #[inline]
    fn as_i64(self) -> i64 {
        match self {
            Cell::F64(v) => v as i64,
            Cell::I64(v) => v,
            Cell::Bool(v) => i64::from(v),
        }
    }

    #[inline]
    fn as_flag(self) -> bool {
        match self {
            Cell::F64(v) => v != 0.0,
            Cell::I64(v) => v != 0,
            Cell::Bool(v) => v,
        }
    }
}

/// Where a column's value for the current entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Loc {
    Source(usize),
    Slot(usize),
}

type RowFn<T> = Arc<dyn Fn(&Row<'_>) -> T + Send + Sync>;

enum Kernel {
    F64(RowFn<f64>),
    I64(RowFn<i64>),
    Bool(RowFn<bool>),
}

enum Step {
    Define { slot: usize, inputs: Vec<Loc>, kernel: Kernel },
    Filter { inputs: Vec<Loc>, predicate: RowFn<bool> },
}

struct Node {
    parent: Option<Arc<Node>>,
    step: Step,
}

#[derive(Debug, Clone)]
struct SchemaEntry {
    name: String,
    loc: Loc,
    kind: ColumnKind,
}

/// Read access to one entry, restricted to the columns a step declared.
///
/// Accessors are positional: `row.f64(0)` reads the first declared input.
/// Scalar accessors coerce between numeric types; reading a jagged column
/// through a scalar accessor yields `NaN`/0/false and reading a scalar column
/// through [`Row::jagged`] yields an empty slice. Use [`Frame::require`] to
/// reject such mismatches before evaluation.
pub struct Row<'a> {
    source: &'a ColumnSet,
    slots: &'a [Cell],
    inputs: &'a [Loc],
    entry: usize,
}

impl Row<'_> {
    /// Entry number within the source column set.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Number of declared inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether no inputs were declared.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    #[inline]
    fn source_column(&self, idx: usize) -> &Column {
        self.source.column_at(idx)
    }

    /// Input `i` as `f64`.
    #[inline]
    pub fn f64(&self, i: usize) -> f64 {
        match self.inputs[i] {
            Loc::Source(c) => self.source_column(c).f64_at(self.entry),
            Loc::Slot(s) => self.slots[s].as_f64(),
        }
    }

    /// Input `i` as `i64`.
    #[inline]
    pub fn i64(&self, i: usize) -> i64 {
        match self.inputs[i] {
            Loc::Source(c) => self.source_column(c).i64_at(self.entry),
            Loc::Slot(s) => self.slots[s].as_i64(),
        }
    }

    /// Input `i` as a flag.
    #[inline]
    pub fn flag(&self, i: usize) -> bool {
        match self.inputs[i] {
            Loc::Source(c) => self.source_column(c).flag_at(self.entry),
            Loc::Slot(s) => self.slots[s].as_flag(),
        }
    }

    /// Input `i` as a per-entry list.
    #[inline]
    pub fn jagged(&self, i: usize) -> &[f64] {
        match self.inputs[i] {
            Loc::Source(c) => self.source.column_at(c).jagged_at(self.entry),
            Loc::Slot(_) => &[],
        }
    }
}

/// Immutable, cheaply cloneable handle to a lazy computation over events.
#[derive(Clone)]
pub struct Frame {
    source: Arc<ColumnSet>,
    tail: Option<Arc<Node>>,
    schema: Arc<Vec<SchemaEntry>>,
    n_slots: usize,
    chunk_size: usize,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("entries", &self.source.len())
            .field("columns", &self.column_names())
            .field("steps", &self.n_steps())
            .finish()
    }
}

impl Frame {
    /// Frame over a column set, with no steps.
    pub fn new(columns: ColumnSet) -> Self {
        let schema = columns
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| SchemaEntry {
                name: name.clone(),
                loc: Loc::Source(i),
                kind: columns.column_at(i).kind(),
            })
            .collect();
        Self {
            source: Arc::new(columns),
            tail: None,
            schema: Arc::new(schema),
            n_slots: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the number of entries per parallel task.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Entries in the underlying source, before any filter.
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Source columns followed by defined columns, in definition order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|e| e.name.as_str()).collect()
    }

    /// Whether a column of this name is visible.
    pub fn has_column(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Shape of a visible column.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.lookup(name).map(|e| e.kind)
    }

    /// Number of define/filter steps in the chain.
    pub fn n_steps(&self) -> usize {
        let mut n = 0;
        let mut cur = self.tail.as_deref();
        while let Some(node) = cur {
            n += 1;
            cur = node.parent.as_deref();
        }
        n
    }

    /// Check that every listed column exists with the given shape.
    pub fn require(&self, columns: &[(&str, ColumnKind)]) -> Result<()> {
        for &(name, expected) in columns {
            let entry = self.lookup(name).ok_or_else(|| FrameError::MissingColumn(name.into()))?;
            if entry.kind != expected {
                return Err(FrameError::KindMismatch {
                    name: name.into(),
                    expected,
                    found: entry.kind,
                });
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&SchemaEntry> {
        self.schema.iter().find(|e| e.name == name)
    }

    fn resolve(&self, inputs: &[&str]) -> Result<Vec<Loc>> {
        inputs
            .iter()
            .map(|name| {
                self.lookup(name)
                    .map(|e| e.loc)
                    .ok_or_else(|| FrameError::MissingColumn((*name).into()))
            })
            .collect()
    }

    fn resolve_scalar(&self, name: &str) -> Result<Loc> {
        self.require(&[(name, ColumnKind::Scalar)])?;
        Ok(self.resolve(&[name])?[0])
    }

    fn push(&self, step: Step) -> Self {
        Self {
            source: Arc::clone(&self.source),
            tail: Some(Arc::new(Node { parent: self.tail.clone(), step })),
            schema: Arc::clone(&self.schema),
            n_slots: self.n_slots,
            chunk_size: self.chunk_size,
        }
    }

    fn define(&self, name: &str, inputs: &[&str], kernel: Kernel) -> Result<Self> {
        if self.has_column(name) {
            return Err(FrameError::DuplicateColumn(name.into()));
        }
        let inputs = self.resolve(inputs)?;
        let slot = self.n_slots;
        let mut out = self.push(Step::Define { slot, inputs, kernel });
        let mut schema = (*self.schema).clone();
        schema.push(SchemaEntry { name: name.into(), loc: Loc::Slot(slot), kind: ColumnKind::Scalar });
        out.schema = Arc::new(schema);
        out.n_slots += 1;
        Ok(out)
    }

    /// Define an `f64` column from the declared inputs.
    pub fn define_f64<F>(&self, name: &str, inputs: &[&str], f: F) -> Result<Self>
    where
        F: Fn(&Row<'_>) -> f64 + Send + Sync + 'static,
    {
        self.define(name, inputs, Kernel::F64(Arc::new(f)))
    }

    /// Define an `i64` column from the declared inputs.
    pub fn define_i64<F>(&self, name: &str, inputs: &[&str], f: F) -> Result<Self>
    where
        F: Fn(&Row<'_>) -> i64 + Send + Sync + 'static,
    {
        self.define(name, inputs, Kernel::I64(Arc::new(f)))
    }

    /// Define a boolean column from the declared inputs.
    pub fn define_bool<F>(&self, name: &str, inputs: &[&str], f: F) -> Result<Self>
    where
        F: Fn(&Row<'_>) -> bool + Send + Sync + 'static,
    {
        self.define(name, inputs, Kernel::Bool(Arc::new(f)))
    }

    /// Define an `f64` column from a string expression over scalar columns.
    pub fn define_expr(&self, name: &str, expression: &str) -> Result<Self> {
        let expr = self.compile_scalar_expr(expression)?;
        let inputs: Vec<&str> = expr.required_columns.iter().map(String::as_str).collect();
        let expr = Arc::new(expr.clone());
        self.define_f64(name, &inputs, move |r| expr.eval_with(&|i| r.f64(i)))
    }

    /// Keep entries for which the predicate holds.
    ///
    /// `label` is informational and shows up in debug logs.
    pub fn filter<F>(&self, label: &str, inputs: &[&str], predicate: F) -> Result<Self>
    where
        F: Fn(&Row<'_>) -> bool + Send + Sync + 'static,
    {
        let inputs = self.resolve(inputs)?;
        log::trace!("filter '{label}' on {} inputs", inputs.len());
        Ok(self.push(Step::Filter { inputs, predicate: Arc::new(predicate) }))
    }

    /// Keep entries for which the expression evaluates to a value > 0.
    pub fn filter_expr(&self, expression: &str) -> Result<Self> {
        let expr = self.compile_scalar_expr(expression)?;
        let inputs: Vec<&str> = expr.required_columns.iter().map(String::as_str).collect();
        let label = expr.text().to_string();
        let expr = Arc::new(expr.clone());
        self.filter(&label, &inputs, move |r| expr.eval_with(&|i| r.f64(i)) > 0.0)
    }

    fn compile_scalar_expr(&self, expression: &str) -> Result<CompiledExpr> {
        let expr = CompiledExpr::compile(expression)?;
        for name in &expr.required_columns {
            self.require(&[(name.as_str(), ColumnKind::Scalar)])?;
        }
        Ok(expr)
    }

    // ── Evaluation ─────────────────────────────────────────────

    fn steps(&self) -> Vec<&Step> {
        let mut steps = Vec::new();
        let mut cur = self.tail.as_deref();
        while let Some(node) = cur {
            steps.push(&node.step);
            cur = node.parent.as_deref();
        }
        steps.reverse();
        steps
    }

    /// Run `visit` on every entry that survives all filters, one accumulator
    /// per chunk. Accumulators come back in chunk order.
    fn scan<A, I, V>(&self, leaf: &[Loc], init: I, visit: V) -> Vec<A>
    where
        A: Send,
        I: Fn() -> A + Sync,
        V: Fn(&mut A, &Row<'_>) + Sync,
    {
        let n = self.source.len();
        if n == 0 {
            return Vec::new();
        }
        let steps = self.steps();
        let source = self.source.as_ref();
        let n_slots = self.n_slots;
        let chunk = self.chunk_size;
        let n_chunks = n.div_ceil(chunk);

        (0..n_chunks)
            .into_par_iter()
            .map(|c| {
                let mut acc = init();
                let mut slots = vec![Cell::Bool(false); n_slots];
                let end = ((c + 1) * chunk).min(n);
                'entries: for entry in c * chunk..end {
                    for step in &steps {
                        match step {
                            Step::Define { slot, inputs, kernel } => {
                                let row = Row { source, slots: &slots, inputs, entry };
                                let cell = match kernel {
                                    Kernel::F64(f) => Cell::F64(f(&row)),
                                    Kernel::I64(f) => Cell::I64(f(&row)),
                                    Kernel::Bool(f) => Cell::Bool(f(&row)),
                                };
                                slots[*slot] = cell;
                            }
                            Step::Filter { inputs, predicate } => {
                                let row = Row { source, slots: &slots, inputs, entry };
                                if !predicate(&row) {
                                    continue 'entries;
                                }
                            }
                        }
                    }
                    visit(&mut acc, &Row { source, slots: &slots, inputs: leaf, entry });
                }
                acc
            })
            .collect()
    }

    /// Number of entries passing all filters.
    pub fn count(&self) -> u64 {
        self.scan(&[], || 0u64, |n, _| *n += 1).into_iter().sum()
    }

    /// Sum of a scalar column over entries passing all filters.
    pub fn sum(&self, column: &str) -> Result<f64> {
        let loc = self.resolve_scalar(column)?;
        let partials = self.scan(&[loc], || 0.0f64, |s, r| *s += r.f64(0));
        Ok(partials.into_iter().fold(0.0, |a, b| a + b))
    }

    /// Values of a scalar column as `f64`, in entry order.
    pub fn take_f64(&self, column: &str) -> Result<Vec<f64>> {
        self.take(column, |r| r.f64(0))
    }

    /// Values of a scalar column as `i64`, in entry order.
    pub fn take_i64(&self, column: &str) -> Result<Vec<i64>> {
        self.take(column, |r| r.i64(0))
    }

    /// Values of a scalar column as flags, in entry order.
    pub fn take_bool(&self, column: &str) -> Result<Vec<bool>> {
        self.take(column, |r| r.flag(0))
    }

    fn take<T: Send>(&self, column: &str, get: impl Fn(&Row<'_>) -> T + Sync) -> Result<Vec<T>> {
        let loc = self.resolve_scalar(column)?;
        let parts = self.scan(&[loc], Vec::new, |v, r| v.push(get(r)));
        Ok(parts.into_iter().flatten().collect())
    }

    /// Call `f` for every surviving entry with the declared inputs.
    ///
    /// `f` runs concurrently on the rayon pool. Any state it shares across
    /// entries must be synchronised by the caller.
    pub fn for_each<F>(&self, inputs: &[&str], f: F) -> Result<()>
    where
        F: Fn(&Row<'_>) + Sync,
    {
        let locs = self.resolve(inputs)?;
        self.scan(&locs, || (), |_, r| f(r));
        Ok(())
    }
}
