//! Core [`Expr`] node and its structural queries.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;
use tessel_dtype::DType;

use crate::types::{BinaryOp, Var};

/// Expression operations.
#[derive(Debug, Clone)]
pub enum Op {
    /// Integer literal. The node dtype gives its width.
    Const(i64),

    /// Free symbolic variable.
    Var(Var),

    Binary(BinaryOp, Arc<Expr>, Arc<Expr>),

    /// Conversion of the operand to the node dtype.
    Cast(Arc<Expr>),

    /// Opaque call to an external function. Never simplified through.
    Call { name: String, args: SmallVec<[Arc<Expr>; 4]> },
}

impl Op {
    pub fn children(&self) -> SmallVec<[&Arc<Expr>; 4]> {
        match self {
            Self::Const(_) | Self::Var(_) => SmallVec::new(),
            Self::Binary(_, lhs, rhs) => smallvec::smallvec![lhs, rhs],
            Self::Cast(src) => smallvec::smallvec![src],
            Self::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Rank used as the primary key of the structural order.
    const fn rank(&self) -> u8 {
        match self {
            Self::Const(_) => 0,
            Self::Var(_) => 1,
            Self::Call { .. } => 2,
            Self::Cast(_) => 3,
            Self::Binary(..) => 4,
        }
    }
}

/// Wrapper for `Arc<Expr>` hashing and comparing by node id.
#[derive(Clone)]
pub struct ExprKey(pub Arc<Expr>);

impl std::fmt::Debug for ExprKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExprKey(id={})", self.0.id)
    }
}

impl PartialEq for ExprKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ExprKey {}

impl Hash for ExprKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

/// Immutable integer expression node.
///
/// Nodes are hash-consed: building the same operation over the same children
/// twice yields the same `Arc`, so identity comparison through [`Expr::same_as`]
/// implies structural equality. The converse holds for every node built through
/// the public constructors.
#[derive(derive_more::Debug)]
pub struct Expr {
    /// Process-unique node id, never reused.
    pub id: u64,
    pub(crate) op: Op,
    pub(crate) dtype: DType,
    #[debug(skip)]
    pub(crate) vmin_vmax_cache: OnceLock<(i64, i64)>,
}

impl Expr {
    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn dtype(&self) -> DType {
        self.dtype.clone()
    }

    pub fn as_const(&self) -> Option<i64> {
        match self.op {
            Op::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match &self.op {
            Op::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self.op, Op::Const(_))
    }

    /// Identity comparison: both handles refer to the same node.
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    /// Deep comparison of operation, dtype and children.
    pub fn structurally_equal(&self, other: &Self) -> bool {
        self.structural_cmp(other) == Ordering::Equal
    }

    /// Total structural order over expressions.
    ///
    /// Constants sort before variables, then calls, casts and binary nodes.
    /// Variables compare by name and then by identity token, so distinct
    /// variables sharing a name still get a stable order.
    pub fn structural_cmp(&self, other: &Self) -> Ordering {
        if self.same_as(other) {
            return Ordering::Equal;
        }

        let by_op = match (&self.op, &other.op) {
            (Op::Const(a), Op::Const(b)) => a.cmp(b),
            (Op::Var(a), Op::Var(b)) => a.name.cmp(&b.name).then(a.token.cmp(&b.token)),
            (Op::Call { name: na, args: aa }, Op::Call { name: nb, args: ab }) => na.cmp(nb).then_with(|| {
                aa.iter()
                    .zip(ab.iter())
                    .map(|(a, b)| a.structural_cmp(b))
                    .find(|ord| ord.is_ne())
                    .unwrap_or_else(|| aa.len().cmp(&ab.len()))
            }),
            (Op::Cast(a), Op::Cast(b)) => a.structural_cmp(b),
            (Op::Binary(oa, la, ra), Op::Binary(ob, lb, rb)) => {
                oa.cmp(ob).then_with(|| la.structural_cmp(lb)).then_with(|| ra.structural_cmp(rb))
            }
            (a, b) => a.rank().cmp(&b.rank()),
        };

        by_op.then_with(|| self.dtype.cmp(&other.dtype))
    }

    /// Distinct nodes reachable from this one, each visited once.
    fn unique_nodes(&self) -> Vec<&Expr> {
        let mut visited = HashSet::new();
        let mut stack = vec![self];
        let mut nodes = Vec::new();
        while let Some(node) = stack.pop() {
            if visited.insert(node.id) {
                nodes.push(node);
                stack.extend(node.op.children().into_iter().map(|child| child.as_ref()));
            }
        }
        nodes
    }

    /// Number of distinct nodes in the expression DAG.
    pub fn node_count(&self) -> usize {
        self.unique_nodes().len()
    }

    /// Check whether `var` occurs anywhere in this expression.
    pub fn contains_var(&self, var: &Var) -> bool {
        self.unique_nodes().iter().any(|node| matches!(&node.op, Op::Var(v) if v.token == var.token))
    }
}
