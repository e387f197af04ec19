//! Property-based tests for SSA conversion and the optimizer.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashSet;

use progcheck::optimization::optimize;
use progcheck::ssa::{convert_to_ssa, format_ssa, Instruction, SsaProgram};
use progcheck::parse_program;

// ============================================================================
// Generators
// ============================================================================

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(NAMES.to_vec()).prop_map(str::to_string),
        (0i64..100).prop_map(|n| n.to_string()),
    ]
}

/// Fully parenthesized, so the flat grammar reads it as written.
fn expression() -> impl Strategy<Value = String> {
    leaf().prop_recursive(3, 16, 2, |inner| {
        (
            inner.clone(),
            prop::sample::select(vec!["+", "-", "*", "<", "==", ">="]),
            inner,
        )
            .prop_map(|(left, op, right)| format!("({} {} {})", left, op, right))
    })
}

fn simple_statement() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => (prop::sample::select(NAMES.to_vec()), expression())
            .prop_map(|(target, value)| format!("{} := {};", target, value)),
        1 => expression().prop_map(|cond| format!("assert({});", cond)),
    ]
}

fn statement() -> impl Strategy<Value = String> {
    simple_statement().prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            (expression(), vec(inner.clone(), 0..3), vec(inner.clone(), 0..3)).prop_map(
                |(cond, then_branch, else_branch)| format!(
                    "if ({}) {{\n{}\n}} else {{\n{}\n}}",
                    cond,
                    then_branch.join("\n"),
                    else_branch.join("\n")
                )
            ),
            (expression(), vec(inner, 0..3))
                .prop_map(|(cond, body)| format!("while ({}) {{\n{}\n}}", cond, body.join("\n"))),
        ]
    })
}

fn convert(source: &str) -> SsaProgram {
    let program = parse_program(source).unwrap();
    convert_to_ssa(&program).unwrap()
}

fn used_names(instructions: &[Instruction]) -> HashSet<String> {
    let mut used = HashSet::new();
    for inst in instructions {
        inst.for_each_use(&mut |name| {
            used.insert(name.to_string());
        });
    }
    used
}

// ============================================================================
// SSA properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_every_name_is_defined_once(stmts in vec(statement(), 1..6)) {
        let ssa = convert(&stmts.join("\n"));
        let mut seen = HashSet::new();
        for inst in &ssa.instructions {
            if let Some(name) = inst.defined_name() {
                prop_assert!(seen.insert(name.clone()), "{} defined twice", name);
            }
        }
    }

    #[test]
    fn prop_straight_line_has_one_instruction_per_statement(stmts in vec(simple_statement(), 1..10)) {
        let ssa = convert(&stmts.join("\n"));
        prop_assert_eq!(ssa.instructions.len(), stmts.len());
        prop_assert!(ssa
            .instructions
            .iter()
            .all(|inst| !matches!(inst, Instruction::Phi { .. })),
            "straight-line SSA must contain no phi instructions");
    }

    #[test]
    fn prop_formatting_is_a_function_of_the_instructions(stmts in vec(statement(), 1..5)) {
        let source = stmts.join("\n");
        prop_assert_eq!(format_ssa(&convert(&source).instructions), format_ssa(&convert(&source).instructions));
    }
}

// ============================================================================
// Optimizer properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_optimize_is_idempotent(stmts in vec(statement(), 1..6)) {
        let ssa = convert(&stmts.join("\n"));
        let once = optimize(&ssa.instructions);
        let twice = optimize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_no_unused_define_survives(stmts in vec(statement(), 1..6)) {
        let ssa = convert(&stmts.join("\n"));
        let optimized = optimize(&ssa.instructions);
        let used = used_names(&optimized);
        for inst in &optimized {
            if let Instruction::Define { target, .. } = inst {
                prop_assert!(used.contains(&target.to_string()), "{} has no use", target);
            }
        }
    }

    #[test]
    fn prop_optimize_never_adds_instructions(stmts in vec(statement(), 1..6)) {
        let ssa = convert(&stmts.join("\n"));
        prop_assert!(optimize(&ssa.instructions).len() <= ssa.instructions.len());
    }
}
