//! Hash consing for expression nodes.
//!
//! Structurally identical expressions share one allocation. The table is a
//! global lock-free map (papaya) holding `Weak<Expr>`, so interning works
//! across threads and a node is freed once the last strong handle drops.
//! Dead entries are replaced on the next insert of the same key or swept by
//! [`gc_dead_refs`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use papaya::HashMap;
use smallvec::SmallVec;
use tessel_dtype::DType;

use super::core::{Expr, Op};
use crate::types::BinaryOp;

static EXPR_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_expr_id() -> u64 {
    EXPR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

static VAR_TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh identity token for a newly declared variable.
pub(crate) fn next_var_token() -> u64 {
    VAR_TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Interning key. Children are referenced by stable id, so hashing never recurses.
#[derive(Eq, PartialEq, Hash, Clone)]
struct ExprInternKey {
    dtype: DType,
    src_ids: SmallVec<[u64; 4]>,
    op_data: OpData,
}

/// Non-recursive payload of each operation.
#[derive(Eq, PartialEq, Hash, Clone)]
enum OpData {
    Const(i64),
    // The token alone identifies a variable; name and domain travel with it.
    Var(u64),
    Binary(BinaryOp),
    Cast,
    Call(String),
}

impl ExprInternKey {
    fn new(op: &Op, dtype: DType) -> Self {
        let src_ids = op.children().into_iter().map(|child| child.id).collect();
        let op_data = match op {
            Op::Const(v) => OpData::Const(*v),
            Op::Var(var) => OpData::Var(var.token),
            Op::Binary(bop, _, _) => OpData::Binary(*bop),
            Op::Cast(_) => OpData::Cast,
            Op::Call { name, .. } => OpData::Call(name.clone()),
        };
        Self { dtype, src_ids, op_data }
    }
}

static EXPRS: OnceLock<HashMap<ExprInternKey, Weak<Expr>>> = OnceLock::new();

fn exprs() -> &'static HashMap<ExprInternKey, Weak<Expr>> {
    EXPRS.get_or_init(HashMap::new)
}

/// Remove dead weak references from the interning table.
pub fn gc_dead_refs() {
    let map = exprs();
    let guard = map.guard();

    let to_remove: Vec<ExprInternKey> =
        map.iter(&guard).filter(|(_, weak)| weak.upgrade().is_none()).map(|(k, _)| k.clone()).collect();

    for key in to_remove {
        map.remove(&key, &guard);
    }
}

/// Number of live interned nodes.
pub fn live_expr_count() -> usize {
    let map = exprs();
    let guard = map.guard();
    map.iter(&guard).filter(|(_, weak)| weak.strong_count() > 0).count()
}

impl Expr {
    /// Create an expression node with hash consing.
    ///
    /// Returns the existing node when an identical one is still alive in any
    /// thread, otherwise allocates and registers a new one.
    pub(crate) fn new(op: Op, dtype: DType) -> Arc<Self> {
        use papaya::{Compute, Operation};

        let key = ExprInternKey::new(&op, dtype.clone());
        let guard = exprs().guard();

        if let Some(weak) = exprs().get(&key, &guard)
            && let Some(arc) = weak.upgrade()
        {
            return arc;
        }

        let new_arc = Arc::new(Self { id: next_expr_id(), op, dtype, vmin_vmax_cache: OnceLock::new() });
        let new_weak = Arc::downgrade(&new_arc);

        // Another thread may have won the race since the lookup above.
        let result = exprs().compute(
            key,
            |entry| match entry {
                Some((_, existing)) => match existing.upgrade() {
                    Some(existing) => Operation::Abort(existing),
                    None => Operation::Insert(new_weak.clone()),
                },
                None => Operation::Insert(new_weak.clone()),
            },
            &guard,
        );

        match result {
            Compute::Aborted(existing) => existing,
            _ => new_arc,
        }
    }
}
