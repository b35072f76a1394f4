//! The `libspy` contract (`spec.md` §6.2): the fixed table of FQNs that the
//! redshift pass is allowed to emit calls to, and that an external C backend
//! is expected to link against.
//!
//! Most entries are backed by a real native function registered in
//! `builtins::Primitives` — a test below walks `Vm::new()`'s own native
//! function table and checks each one actually lands in the FQN registry. A
//! few entries name operations spy-core never calls through an FQN at all,
//! listed in [`EMIT_ONLY_CONTRACT_SYMBOLS`]:
//!
//! - `gc_alloc`, `raw_alloc` — struct/pointer allocation happens directly as
//!   `Rc::new(RefCell::new(..))` in `value::Pointer::new_checked`. There is
//!   no interpreter-side call site that needs a Rust body for these; they
//!   exist in the contract purely for the C emitter's benefit.
//! - `operator::raise` — `StmtKind::Raise` is handled directly in
//!   `frame::exec_stmt`/`redshift::redshift_stmt`, which build a `SpyError`
//!   (or `ResidualStmt::Raise`) without going through any FQN. The emitter is
//!   expected to lower a residual `Raise` to a call against this symbol.
//!
//! Keeping this list separate from `builtins.rs` gives one place that names
//! the whole contract, Rust-backed or not, instead of leaving the emit-only
//! entries undocumented anywhere in the crate.

/// Contract entries with no Rust-side native function, because spy-core
/// never issues a call through their FQN (see module docs above).
pub const EMIT_ONLY_CONTRACT_SYMBOLS: &[&str] = &["operator::gc_alloc", "operator::raw_alloc", "operator::raise"];

#[cfg(test)]
mod tests {
    use crate::module::Vm;

    /// Every `libspy` entry spy-core itself calls through must be present in
    /// a freshly constructed `Vm`'s FQN registry (`spec.md` §6.2) — this is
    /// the set a C emitter can assume is always available without the
    /// program defining it.
    #[test]
    fn every_rust_backed_contract_symbol_is_registered_on_a_fresh_vm() {
        let vm = Vm::new();
        let mut missing = Vec::new();
        for native in vm.primitives.native_functions() {
            if !vm.fqns.contains(&native.fqn) {
                missing.push(native.fqn.to_canonical());
            }
        }
        assert!(missing.is_empty(), "native functions missing from FQN registry: {missing:?}");
    }

    #[test]
    fn print_is_registered_for_every_primitive_kind() {
        let vm = Vm::new();
        assert_eq!(vm.primitives.print_fns.len(), 5);
        for f in vm.primitives.print_fns.values() {
            assert!(vm.fqns.contains(&f.fqn), "{} missing from FQN registry", f.fqn.to_canonical());
        }
    }

    #[test]
    fn str_getitem_is_registered() {
        let vm = Vm::new();
        let getitem = vm
            .primitives
            .native_functions()
            .into_iter()
            .find(|f| f.fqn.module() == ["str".to_string()].as_slice() && f.fqn.symbol() == "getitem")
            .expect("str::getitem is registered by Primitives::new");
        assert!(vm.fqns.contains(&getitem.fqn));
    }
}
