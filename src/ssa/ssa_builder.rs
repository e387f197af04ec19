use std::collections::BTreeMap;

use crate::ast::*;
use crate::ssa::*;

/// Base name → current version, valid at one program point.
pub type VersionEnv = BTreeMap<String, u32>;

/// Hands out versions for one conversion run. Shared by every branch, so two
/// sibling arms never receive the same versioned name.
#[derive(Debug, Default)]
struct VersionAllocator {
    next: BTreeMap<String, u32>,
}

impl VersionAllocator {
    fn fresh(&mut self, base: &str) -> u32 {
        let slot = self.next.entry(base.to_string()).or_insert(0);
        let version = *slot;
        *slot += 1;
        version
    }

    /// Reserves version 0 of `base` for the program's input value.
    fn claim_input(&mut self, base: &str) -> Results<()> {
        if self.next.contains_key(base) {
            return Err(SpannedError::internal(format!(
                "read of `{}` resolves to {}_0, which is already defined",
                base, base
            )));
        }
        self.next.insert(base.to_string(), 1);
        Ok(())
    }
}

/// Converts a [`Program`] into SSA instructions.
#[derive(Debug, Default)]
pub struct SsaBuilder {
    allocator: VersionAllocator,
    instructions: Vec<Instruction>,
}

pub fn convert_to_ssa(program: &Program) -> Results<SsaProgram> {
    SsaBuilder::build_from_program(program)
}

impl SsaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_from_program(program: &Program) -> Results<SsaProgram> {
        let mut builder = Self::new();
        let env = builder.convert_block(&program.statements, VersionEnv::new())?;
        check_single_assignment(&builder.instructions)?;

        let final_versions = env
            .into_iter()
            .map(|(base, version)| {
                let name = VersionedName::new(base.clone(), version);
                (base, name)
            })
            .collect();

        Ok(SsaProgram {
            instructions: builder.instructions,
            final_versions,
        })
    }

    fn convert_block(&mut self, statements: &[Statement], mut env: VersionEnv) -> Results<VersionEnv> {
        for stmt in statements {
            env = self.convert_statement(stmt, env)?;
        }
        Ok(env)
    }

    fn convert_statement(&mut self, stmt: &Statement, mut env: VersionEnv) -> Results<VersionEnv> {
        match &stmt.node {
            StatementKind::Assignment(assign) => self.convert_assignment(assign, env),
            StatementKind::Assert { condition } => {
                let condition = self.lower(condition, &mut env)?;
                self.instructions.push(Instruction::Assert { condition });
                Ok(env)
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.register_inputs(stmt, &mut env)?;
                self.convert_if(condition, then_branch, else_branch, env)
            }
            StatementKind::While { condition, body } => {
                self.register_inputs(stmt, &mut env)?;
                self.convert_while(condition, body, env)
            }
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let (init, while_stmt) = desugar_for(init, condition, update, body, stmt.span);
                let env = self.convert_statement(&init, env)?;
                self.convert_statement(&while_stmt, env)
            }
        }
    }

    fn convert_assignment(&mut self, assign: &Assignment, mut env: VersionEnv) -> Results<VersionEnv> {
        let value = self.lower(&assign.value, &mut env)?;
        let version = self.allocator.fresh(&assign.target);
        self.instructions.push(Instruction::Define {
            target: VersionedName::new(assign.target.clone(), version),
            value,
        });
        env.insert(assign.target.clone(), version);
        Ok(env)
    }

    fn convert_if(
        &mut self,
        condition: &Expression,
        then_branch: &[Statement],
        else_branch: &[Statement],
        mut env: VersionEnv,
    ) -> Results<VersionEnv> {
        let guard = self.lower(condition, &mut env)?;
        let then_env = self.convert_block(then_branch, env.clone())?;
        let else_env = self.convert_block(else_branch, env)?;

        let mut merged = then_env.clone();
        for (base, &else_version) in &else_env {
            match then_env.get(base) {
                Some(&then_version) if then_version != else_version => {
                    let result = self.allocator.fresh(base);
                    self.instructions.push(Instruction::Phi {
                        result: VersionedName::new(base.clone(), result),
                        operands: vec![
                            VersionedName::new(base.clone(), then_version),
                            VersionedName::new(base.clone(), else_version),
                        ],
                        guard: Some(guard.clone()),
                    });
                    merged.insert(base.clone(), result);
                }
                Some(_) => {}
                None => {
                    merged.insert(base.clone(), else_version);
                }
            }
        }

        Ok(merged)
    }

    /// One body pass. Loop-carried names get a fresh entry version before the
    /// body, an unguarded entry phi after it, and an exit phi guarded by the
    /// negated condition.
    fn convert_while(&mut self, condition: &Expression, body: &[Statement], mut env: VersionEnv) -> Results<VersionEnv> {
        let guard = self.lower(condition, &mut env)?;
        let pre = env;

        let carried: Vec<String> = assigned_names(body)
            .into_iter()
            .filter(|base| pre.contains_key(base))
            .collect();

        let mut entry = pre.clone();
        for base in &carried {
            let version = self.allocator.fresh(base);
            entry.insert(base.clone(), version);
        }

        let post = self.convert_block(body, entry.clone())?;

        for base in &carried {
            let entry_version = version_of(&entry, base)?;
            let post_version = version_of(&post, base)?;
            if post_version != entry_version {
                self.instructions.push(Instruction::Phi {
                    result: VersionedName::new(base.clone(), entry_version),
                    operands: vec![
                        VersionedName::new(base.clone(), version_of(&pre, base)?),
                        VersionedName::new(base.clone(), post_version),
                    ],
                    guard: None,
                });
            }
        }

        let exit_guard = Expr::not(guard);
        let mut after = post.clone();
        for (base, &pre_version) in &pre {
            let post_version = version_of(&post, base)?;
            if post_version != pre_version {
                let exit = self.allocator.fresh(base);
                self.instructions.push(Instruction::Phi {
                    result: VersionedName::new(base.clone(), exit),
                    operands: vec![
                        VersionedName::new(base.clone(), pre_version),
                        VersionedName::new(base.clone(), post_version),
                    ],
                    guard: Some(exit_guard.clone()),
                });
                after.insert(base.clone(), exit);
            }
        }

        Ok(after)
    }

    /// Gives every name read inside `stmt` and not yet known its input
    /// version, so all arms and iterations agree on it.
    fn register_inputs(&mut self, stmt: &Statement, env: &mut VersionEnv) -> Results<()> {
        for base in read_names(stmt) {
            if !env.contains_key(&base) {
                self.allocator.claim_input(&base)?;
                env.insert(base, 0);
            }
        }
        Ok(())
    }

    fn lower(&mut self, expr: &Expression, env: &mut VersionEnv) -> Results<SsaExpr> {
        let allocator = &mut self.allocator;
        expr.try_map_names(&mut |base: &String| -> Results<VersionedName> {
            let version = match env.get(base) {
                Some(&version) => version,
                None => {
                    allocator.claim_input(base)?;
                    env.insert(base.clone(), 0);
                    0
                }
            };
            Ok(VersionedName::new(base.clone(), version))
        })
    }
}

fn version_of(env: &VersionEnv, base: &str) -> Results<u32> {
    env.get(base)
        .copied()
        .ok_or_else(|| SpannedError::internal(format!("no version recorded for `{}`", base)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_program;
    use pretty_assertions::assert_eq;

    fn ssa(source: &str) -> SsaProgram {
        let program = parse_program(source).expect("source should parse");
        convert_to_ssa(&program).expect("conversion should succeed")
    }

    fn ssa_text(source: &str) -> String {
        format_ssa(&ssa(source).instructions)
    }

    fn phi_count(program: &SsaProgram) -> usize {
        program
            .instructions
            .iter()
            .filter(|inst| matches!(inst, Instruction::Phi { .. }))
            .count()
    }

    #[test]
    fn straight_line_program_versions_in_order() {
        assert_eq!(
            ssa_text("x := 3;\ny := x + 1;\nassert(y > 0);"),
            "x_0 = 3\ny_0 = (x_0 + 1)\nassert((y_0 > 0))"
        );
    }

    #[test]
    fn reassignment_and_inputs() {
        let program = ssa("x := n;\nx := x * 2;");
        assert_eq!(format_ssa(&program.instructions), "x_0 = n_0\nx_1 = (x_0 * 2)");
        assert_eq!(program.final_versions["x"], VersionedName::new("x", 1));
        assert_eq!(program.final_versions["n"], VersionedName::new("n", 0));
    }

    #[test]
    fn if_else_joins_with_one_guarded_phi() {
        let program = ssa("x := 3;\nif (x < 5) {\n  y := x + 1;\n} else {\n  y := x - 1;\n}");
        assert_eq!(phi_count(&program), 1);
        assert_eq!(
            format_ssa(&program.instructions),
            "x_0 = 3\ny_0 = (x_0 + 1)\ny_1 = (x_0 - 1)\ny_2 = φ(y_0, y_1) [(x_0 < 5)]"
        );
        assert_eq!(program.final_versions["y"], VersionedName::new("y", 2));
    }

    #[test]
    fn name_defined_in_one_arm_flows_on_without_phi() {
        let program = ssa("if (c > 0) {\n  y := 1;\n}\nz := y;");
        assert_eq!(phi_count(&program), 0);
        assert_eq!(format_ssa(&program.instructions), "y_0 = 1\nz_0 = y_0");
    }

    #[test]
    fn inputs_read_in_one_arm_are_registered_before_the_branch() {
        let program = ssa("if (c > 0) {\n  y := 1;\n} else {\n  z := y;\n}");
        assert_eq!(
            format_ssa(&program.instructions),
            "y_1 = 1\nz_0 = y_0\ny_2 = φ(y_1, y_0) [(c_0 > 0)]"
        );
    }

    #[test]
    fn loop_without_carried_names_has_no_phis() {
        let program = ssa("while (i < 3) {\n  t := 1;\n}");
        assert_eq!(phi_count(&program), 0);
        assert_eq!(format_ssa(&program.instructions), "t_0 = 1");
    }

    #[test]
    fn counting_loop_gets_entry_and_exit_phis() {
        assert_eq!(
            ssa_text("i := 0;\nwhile (i < 3) {\n  i := i + 1;\n}\nassert(i == 3);"),
            "i_0 = 0\n\
             i_2 = (i_1 + 1)\n\
             i_1 = φ(i_0, i_2)\n\
             i_3 = φ(i_0, i_2) [!(i_0 < 3)]\n\
             assert((i_3 == 3))"
        );
    }

    #[test]
    fn for_loop_converts_through_its_while_form() {
        let program = ssa("s := 0;\nfor (i := 0; i < 2; i := i + 1) {\n  s := s + i;\n}");
        assert_eq!(
            format_ssa(&program.instructions),
            "s_0 = 0\n\
             i_0 = 0\n\
             s_2 = (s_1 + i_1)\n\
             i_2 = (i_1 + 1)\n\
             i_1 = φ(i_0, i_2)\n\
             s_1 = φ(s_0, s_2)\n\
             i_3 = φ(i_0, i_2) [!(i_0 < 2)]\n\
             s_3 = φ(s_0, s_2) [!(i_0 < 2)]"
        );
        assert_eq!(program.final_versions["s"], VersionedName::new("s", 3));
    }

    #[test]
    fn nested_branches_keep_single_assignment() {
        let program = ssa(
            "x := 0;\nwhile (x < 10) {\n  if (x % 2 == 0) {\n    x := x + 3;\n  } else {\n    x := x + 1;\n  }\n}",
        );
        assert!(check_single_assignment(&program.instructions).is_ok());
    }

    #[test]
    fn input_version_cannot_be_claimed_after_a_definition() {
        let mut allocator = VersionAllocator::default();
        assert_eq!(allocator.fresh("x"), 0);
        let err = allocator.claim_input("x").unwrap_err();
        assert!(!err.is_syntax_error());
    }
}
