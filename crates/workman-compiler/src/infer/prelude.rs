//! Prelude schemes: native primitives and the default operator schemes.

use crate::types::{Scheme, Type, TypeCtx};

use super::env::TypeEnv;

/// Register the native primitives and default operator schemes.
///
/// `infix`/`prefix` declarations later rebind `__op_*`/`__prefix_*`
/// names to user functions; the defaults here back the pre-seeded parser
/// operator table.
pub fn register(ctx: &mut TypeCtx, env: &mut TypeEnv) {
    let int_binop = || Type::fun_from(vec![Type::Int, Type::Int], Type::Int);
    let int_cmp = || Type::fun_from(vec![Type::Int, Type::Int], Type::Bool);
    let bool_binop = || Type::fun_from(vec![Type::Bool, Type::Bool], Type::Bool);

    for name in ["nativeAdd", "nativeSub", "nativeMul", "nativeDiv"] {
        env.insert(name, Scheme::mono(int_binop()), None);
    }
    env.insert(
        "nativeCmpInt",
        Scheme::mono(Type::fun_from(
            vec![Type::Int, Type::Int],
            Type::ctor("Ordering", vec![]),
        )),
        None,
    );

    let t = ctx.fresh_var_id();
    env.insert(
        "nativePrint",
        Scheme::new(vec![t], Type::fun(Type::Var(t), Type::Unit)),
        None,
    );
    // `print` is the surface spelling of nativePrint.
    let t = ctx.fresh_var_id();
    env.insert(
        "print",
        Scheme::new(vec![t], Type::fun(Type::Var(t), Type::Unit)),
        None,
    );

    for op in ["+", "-", "*", "/"] {
        env.insert(format!("__op_{op}"), Scheme::mono(int_binop()), None);
    }
    for op in ["<", ">", "<=", ">="] {
        env.insert(format!("__op_{op}"), Scheme::mono(int_cmp()), None);
    }
    for op in ["==", "!="] {
        let t = ctx.fresh_var_id();
        env.insert(
            format!("__op_{op}"),
            Scheme::new(
                vec![t],
                Type::fun_from(vec![Type::Var(t), Type::Var(t)], Type::Bool),
            ),
            None,
        );
    }
    for op in ["&&", "||"] {
        env.insert(format!("__op_{op}"), Scheme::mono(bool_binop()), None);
    }
    env.insert(
        "__prefix_!",
        Scheme::mono(Type::fun(Type::Bool, Type::Bool)),
        None,
    );
}
