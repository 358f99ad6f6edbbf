use workman_core::{NodeId, Span};

use crate::core::*;

fn pat(kind: CorePatKind) -> CorePat {
    CorePat {
        id: NodeId::from_raw(0),
        span: Span::new(0, 0),
        kind,
    }
}

#[test]
fn wildcards_and_vars_are_irrefutable() {
    assert!(pat(CorePatKind::Wildcard).is_irrefutable());
    assert!(pat(CorePatKind::Var("x".into())).is_irrefutable());
    assert!(!pat(CorePatKind::Lit(CoreLit::Int(0))).is_irrefutable());
}

#[test]
fn tuple_irrefutability_is_elementwise() {
    let all_vars = pat(CorePatKind::Tuple(vec![
        pat(CorePatKind::Var("a".into())),
        pat(CorePatKind::Wildcard),
    ]));
    assert!(all_vars.is_irrefutable());

    let with_lit = pat(CorePatKind::Tuple(vec![
        pat(CorePatKind::Var("a".into())),
        pat(CorePatKind::Lit(CoreLit::Bool(true))),
    ]));
    assert!(!with_lit.is_irrefutable());
}

#[test]
fn constructor_patterns_are_refutable() {
    let p = pat(CorePatKind::Ctor {
        type_name: "Option".into(),
        ctor: "Some".into(),
        args: vec![pat(CorePatKind::Var("x".into()))],
    });
    assert!(!p.is_irrefutable());
}

#[test]
fn program_serde_round_trip() {
    let program = CoreProgram {
        types: vec![CoreTypeDef {
            name: "Option".into(),
            constructors: vec![
                CoreCtorDef {
                    name: "None".into(),
                    arity: 0,
                },
                CoreCtorDef {
                    name: "Some".into(),
                    arity: 1,
                },
            ],
        }],
        bindings: vec![CoreBinding {
            name: "id".into(),
            exported: true,
            recursive: false,
            rec_group: None,
            expr: CoreExpr {
                id: NodeId::from_raw(3),
                span: Span::new(9, 21),
                kind: CoreExprKind::Lam {
                    params: vec!["x".into()],
                    body: Box::new(CoreExpr {
                        id: NodeId::from_raw(2),
                        span: Span::new(18, 19),
                        kind: CoreExprKind::Var("x".into()),
                    }),
                },
            },
        }],
        exports: vec!["id".into()],
    };

    let json = serde_json::to_string(&program).unwrap();
    let back: CoreProgram = serde_json::from_str(&json).unwrap();
    assert_eq!(back.types[0].constructors[1].name, "Some");
    assert_eq!(back.bindings[0].expr.id, NodeId::from_raw(3));
    assert_eq!(back.bindings[0].expr.span, Span::new(9, 21));
}
