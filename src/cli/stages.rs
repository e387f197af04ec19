// src/cli/stages.rs
use super::{FileOutput, OutputFormat, PipelineStage, StageSummary};
use crate::{
    ast::{Program, SpannedError},
    cfg::{Cfg, CfgBuilder},
    frontend::parse_program,
    optimization::{OptimizationResults, SsaOptimizer},
    pretty::{
        count_statements, print_cfg, print_instructions, print_program_to_writer, print_ssa, ssa_summary,
        CfgFormat, CfgPrintOptions, PrintMode as AstPrintMode, PrintOptions as AstPrintOptions, SsaPrintOptions,
    },
    ssa::{convert_to_ssa, Instruction, SsaProgram},
    verification::{encode_equivalence, encode_verification, AutoVerifier, SmtScript, VerificationReport},
};
use std::io::Write;

/// What the solving stages are asked to decide.
#[derive(Debug, Clone)]
pub enum Query {
    /// Assertions of a single program
    Assertions(Vec<Instruction>),
    /// Output agreement of two programs
    Equivalence(Vec<Instruction>, Vec<Instruction>),
}

// Parse Stage
pub struct ParseStage;

impl PipelineStage for ParseStage {
    type Input = String; // source code
    type Output = Program;
    type Error = SpannedError;

    fn execute(&mut self, source_code: String) -> Result<Self::Output, Self::Error> {
        parse_program(&source_code)
    }

    fn name(&self) -> &'static str {
        "Parsing"
    }

    fn stage_number(&self) -> usize {
        1
    }
}

impl FileOutput for ParseStage {
    type Data = Program;

    fn write_output(
        &self,
        data: &Self::Data,
        mut writer: &mut dyn Write,
        cli: &super::Cli,
    ) -> Result<(), String> {
        let opts = AstPrintOptions {
            mode: if cli.quiet {
                AstPrintMode::Summary
            } else {
                AstPrintMode::Verbose
            },
            show_spans: cli.show_spans,
        };

        print_program_to_writer(data, &opts, &mut writer).map_err(|e| format!("Failed to print AST: {}", e))
    }
}

impl StageSummary for ParseStage {
    type Data = Program;

    fn get_summary(&self, data: &Self::Data) -> String {
        let counts = count_statements(&data.statements);
        format!(
            "{} statements ({} assignments, {} branches, {} loops, {} assertions)",
            data.statements.len(),
            counts.assignments,
            counts.branches,
            counts.loops,
            counts.assertions
        )
    }
}

// SSA Stage
pub struct SsaStage;

impl PipelineStage for SsaStage {
    type Input = Program;
    type Output = (Program, SsaProgram);
    type Error = SpannedError;

    fn execute(&mut self, program: Program) -> Result<Self::Output, Self::Error> {
        let ssa = convert_to_ssa(&program)?;
        Ok((program, ssa))
    }

    fn name(&self) -> &'static str {
        "SSA Conversion"
    }

    fn stage_number(&self) -> usize {
        2
    }
}

impl FileOutput for SsaStage {
    type Data = SsaProgram;

    fn write_output(
        &self,
        data: &Self::Data,
        mut writer: &mut dyn Write,
        cli: &super::Cli,
    ) -> Result<(), String> {
        let opts = SsaPrintOptions {
            numbered: cli.verbose,
            show_final_versions: cli.verbose,
        };

        print_ssa(data, &opts, &mut writer).map_err(|e| format!("Failed to print SSA: {}", e))
    }
}

impl StageSummary for SsaStage {
    type Data = SsaProgram;

    fn get_summary(&self, data: &Self::Data) -> String {
        ssa_summary(&data.instructions)
    }
}

// Optimization Stage
pub struct OptimizeStage {
    pub skip_optimization: bool,
}

#[derive(Debug)]
pub struct OptimizedSsa {
    pub instructions: Vec<Instruction>,
    pub results: OptimizationResults,
    /// Instruction count before optimizing
    pub before: usize,
}

impl PipelineStage for OptimizeStage {
    type Input = Vec<Instruction>;
    type Output = OptimizedSsa;
    type Error = String;

    fn execute(&mut self, mut instructions: Vec<Instruction>) -> Result<Self::Output, Self::Error> {
        let before = instructions.len();
        if self.skip_optimization {
            return Ok(OptimizedSsa {
                instructions,
                results: OptimizationResults::new(),
                before,
            });
        }

        let optimizer = SsaOptimizer::default_passes();
        let results = optimizer.optimize_instructions(&mut instructions);

        Ok(OptimizedSsa {
            instructions,
            results,
            before,
        })
    }

    fn name(&self) -> &'static str {
        "Optimization"
    }

    fn stage_number(&self) -> usize {
        3
    }
}

impl FileOutput for OptimizeStage {
    type Data = OptimizedSsa;

    fn write_output(
        &self,
        data: &Self::Data,
        mut writer: &mut dyn Write,
        cli: &super::Cli,
    ) -> Result<(), String> {
        let opts = SsaPrintOptions {
            numbered: cli.verbose,
            show_final_versions: false,
        };

        print_instructions(&data.instructions, &opts, &mut writer)
            .map_err(|e| format!("Failed to print optimized SSA: {}", e))
    }
}

impl StageSummary for OptimizeStage {
    type Data = OptimizedSsa;

    fn get_summary(&self, data: &Self::Data) -> String {
        let mut summary = format!(
            "{} -> {} instructions in {} iteration{}",
            data.before,
            data.instructions.len(),
            data.results.iterations,
            if data.results.iterations == 1 { "" } else { "s" }
        );
        if !data.results.pass_applications.is_empty() {
            let applied: Vec<String> = data
                .results
                .pass_applications
                .iter()
                .map(|(pass, count)| format!("{} x{}", pass, count))
                .collect();
            summary.push_str(&format!(" ({})", applied.join(", ")));
        }
        summary
    }
}

// CFG Stage
pub struct CfgStage;

impl PipelineStage for CfgStage {
    type Input = Program;
    type Output = Cfg;
    type Error = String;

    fn execute(&mut self, program: Program) -> Result<Self::Output, Self::Error> {
        Ok(CfgBuilder::build_from_program(&program))
    }

    fn name(&self) -> &'static str {
        "Control Flow Graph"
    }

    fn stage_number(&self) -> usize {
        4
    }
}

impl FileOutput for CfgStage {
    type Data = Cfg;

    fn write_output(
        &self,
        data: &Self::Data,
        mut writer: &mut dyn Write,
        cli: &super::Cli,
    ) -> Result<(), String> {
        let cfg_opts = CfgPrintOptions {
            format: match cli.format {
                OutputFormat::Text => CfgFormat::Text,
                OutputFormat::Dot => CfgFormat::Dot,
                OutputFormat::Json => CfgFormat::Json,
                OutputFormat::Summary => CfgFormat::Summary,
            },
            verbose: cli.verbose,
        };

        print_cfg(data, &cfg_opts, &mut writer).map_err(|e| format!("Failed to print CFG: {}", e))
    }
}

impl StageSummary for CfgStage {
    type Data = Cfg;

    fn get_summary(&self, data: &Self::Data) -> String {
        format!("{} nodes, {} edges", data.node_count(), data.edges.len())
    }
}

// Encoding Stage
pub struct EncodeStage {
    pub unroll_depth: u32,
}

impl PipelineStage for EncodeStage {
    type Input = Query;
    type Output = (Query, SmtScript);
    type Error = String;

    fn execute(&mut self, query: Query) -> Result<Self::Output, Self::Error> {
        let script = match &query {
            Query::Assertions(instructions) => encode_verification(instructions, self.unroll_depth),
            Query::Equivalence(first, second) => encode_equivalence(first, second, self.unroll_depth),
        };
        Ok((query, script))
    }

    fn name(&self) -> &'static str {
        "SMT Encoding"
    }

    fn stage_number(&self) -> usize {
        5
    }
}

impl FileOutput for EncodeStage {
    type Data = SmtScript;

    fn write_output(
        &self,
        data: &Self::Data,
        writer: &mut dyn Write,
        _cli: &super::Cli,
    ) -> Result<(), String> {
        write!(writer, "{}", data).map_err(|e| format!("Failed to write SMT script: {}", e))
    }
}

impl StageSummary for EncodeStage {
    type Data = SmtScript;

    fn get_summary(&self, data: &Self::Data) -> String {
        format!(
            "logic {}, {} declarations, {} assertions",
            data.logic,
            data.declarations.len(),
            data.assertion_count()
        )
    }
}

// Solving Stage
pub struct SolveStage {
    pub verifier: AutoVerifier,
    pub unroll_depth: u32,
}

impl PipelineStage for SolveStage {
    type Input = Query;
    type Output = VerificationReport;
    type Error = String;

    fn execute(&mut self, query: Query) -> Result<Self::Output, Self::Error> {
        let report = match &query {
            Query::Assertions(instructions) => self.verifier.verify_program(instructions, self.unroll_depth),
            Query::Equivalence(first, second) => {
                self.verifier.check_equivalence(first, second, self.unroll_depth)
            }
        };
        report.map_err(|e| format!("Verification error: {}", e))
    }

    fn name(&self) -> &'static str {
        "Solving"
    }

    fn stage_number(&self) -> usize {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::{Model, Solver, SolverError, SolverResponse, Verdict};
    use pretty_assertions::assert_eq;

    struct AlwaysSat;

    impl Solver for AlwaysSat {
        fn solve(&self, _script: &str) -> Result<SolverResponse, SolverError> {
            Ok(SolverResponse::sat(Model::new()))
        }

        fn name(&self) -> String {
            "always-sat".to_string()
        }
    }

    fn ssa(source: &str) -> SsaProgram {
        let program = ParseStage.execute(source.to_string()).unwrap();
        SsaStage.execute(program).unwrap().1
    }

    #[test]
    fn stages_are_numbered_in_run_order() {
        let numbers = [
            ParseStage.stage_number(),
            SsaStage.stage_number(),
            OptimizeStage { skip_optimization: false }.stage_number(),
            CfgStage.stage_number(),
            EncodeStage { unroll_depth: 1 }.stage_number(),
        ];
        assert_eq!(numbers, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn parse_errors_keep_their_span() {
        let err = ParseStage.execute("x := 1;\nwhile x < 3 {\n}".to_string()).unwrap_err();
        assert!(err.is_syntax_error());
        assert_eq!(err.span.map(|span| span.line), Some(2));
    }

    #[test]
    fn skipped_optimization_passes_instructions_through() {
        let program = ssa("x := 3;\ny := x + 1;\nassert(y > 0);");
        let mut stage = OptimizeStage { skip_optimization: true };
        let out = stage.execute(program.instructions.clone()).unwrap();
        assert_eq!(out.instructions, program.instructions);
        assert_eq!(stage.get_summary(&out), "3 -> 3 instructions in 0 iterations");
    }

    #[test]
    fn optimization_summary_lists_applied_passes() {
        let program = ssa("x := 3;\ny := x + 1;\nassert(y > 0);");
        let mut stage = OptimizeStage { skip_optimization: false };
        let out = stage.execute(program.instructions).unwrap();
        assert_eq!(out.instructions.len(), 1);
        assert!(stage.get_summary(&out).starts_with("3 -> 1 instructions"));
        assert!(stage.get_summary(&out).contains("Dead Code Elimination x"));
    }

    #[test]
    fn encode_stage_picks_the_query_kind() {
        let program = ssa("x := 3;\ny := x + 1;");
        let mut stage = EncodeStage { unroll_depth: 1 };
        let (_, script) = stage
            .execute(Query::Equivalence(program.instructions.clone(), program.instructions))
            .unwrap();
        assert!(script.goals.contains(&"(assert (= y_0 y_0_p2))".to_string()));
        assert!(stage.get_summary(&script).starts_with("logic QF_LIA, 4 declarations"));
    }

    #[test]
    fn solve_stage_reports_through_the_verifier() {
        let program = ssa("x := 3;\nassert(x > 0);");
        let mut stage = SolveStage {
            verifier: AutoVerifier::new(Box::new(AlwaysSat)),
            unroll_depth: 1,
        };
        let report = stage.execute(Query::Assertions(program.instructions)).unwrap();
        assert_eq!(report.verdict, Verdict::Verified);
    }
}
