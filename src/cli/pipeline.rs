// src/cli/pipeline.rs
use super::{output::*, stages::*, traits::*, Cli, Logger, Mode};
use crate::ast::Program;
use crate::ssa::SsaProgram;
use crate::verification::{AutoVerifier, Solver, Verdict, Z3ProcessSolver};
use std::path::PathBuf;

/// A program file and its text.
struct SourceFile {
    label: String,
    text: String,
}

pub struct Pipeline {
    pub parse_stage: ParseStage,
    pub ssa_stage: SsaStage,
    pub optimize_stage: OptimizeStage,
    pub cfg_stage: CfgStage,
    pub encode_stage: EncodeStage,
    pub solve_stage: SolveStage,
    pub logger: Logger,
    output_dir: Option<PathBuf>,
    encode_optimized: bool,
}

impl Pipeline {
    pub fn new(cli: &Cli) -> Self {
        let solver = Z3ProcessSolver::new()
            .with_program(&cli.solver)
            .with_timeout(cli.timeout);

        Self {
            parse_stage: ParseStage,
            ssa_stage: SsaStage,
            optimize_stage: OptimizeStage {
                skip_optimization: cli.no_optimize,
            },
            cfg_stage: CfgStage,
            encode_stage: EncodeStage {
                unroll_depth: cli.unroll,
            },
            solve_stage: SolveStage {
                verifier: build_verifier(Box::new(solver), &cli.output_dir),
                unroll_depth: cli.unroll,
            },
            logger: Logger::new(cli.verbose, cli.quiet),
            output_dir: cli.output_dir.clone(),
            encode_optimized: cli.encode_optimized,
        }
    }

    /// Replaces the solver behind the solving stage.
    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solve_stage.verifier = build_verifier(solver, &self.output_dir);
        self
    }

    /// Runs every stage up to `target_mode` and prints that stage's artifact.
    /// Returns the verdict for solving modes.
    pub fn execute(
        &mut self,
        source_code: String,
        target_mode: Mode,
        cli: &Cli,
    ) -> Result<Option<Verdict>, String> {
        let total_stages = target_mode.total_stages();

        let mut sources = vec![SourceFile {
            label: cli.input.display().to_string(),
            text: source_code,
        }];
        if let Some(path) = &cli.against {
            sources.push(SourceFile {
                label: path.display().to_string(),
                text: OutputManager::read_source(path)?,
            });
        }

        // Stage 1: Parsing
        self.logger
            .stage_start(self.parse_stage.stage_number(), total_stages, self.parse_stage.name());

        let mut programs = Vec::with_capacity(sources.len());
        for source in &sources {
            match self.parse_stage.execute(source.text.clone()) {
                Ok(program) => programs.push(program),
                Err(error) => {
                    self.logger.stage_error();
                    self.logger.error(&format!("{} could not be parsed", source.label));
                    print_spanned_error(&error, &source.text);
                    self.logger.abort_pipeline();
                    return Err("Parsing failed".to_string());
                }
            }
        }

        self.logger.stage_success();
        for (source, program) in sources.iter().zip(&programs) {
            self.logger
                .detail_item(&source.label, &self.parse_stage.get_summary(program));
        }

        if target_mode == Mode::Ast {
            return self.finish(&self.parse_stage, &programs[0], cli);
        }

        // Stage 2: SSA conversion
        self.logger
            .stage_start(self.ssa_stage.stage_number(), total_stages, self.ssa_stage.name());

        let mut converted: Vec<(Program, SsaProgram)> = Vec::with_capacity(programs.len());
        for (source, program) in sources.iter().zip(programs) {
            match self.ssa_stage.execute(program) {
                Ok(pair) => converted.push(pair),
                Err(error) => {
                    self.logger.stage_error();
                    print_spanned_error(&error, &source.text);
                    self.logger.abort_pipeline();
                    return Err("SSA conversion failed".to_string());
                }
            }
        }

        self.logger.stage_success();
        for (source, (_, ssa)) in sources.iter().zip(&converted) {
            self.logger
                .detail_item(&source.label, &self.ssa_stage.get_summary(ssa));
        }

        if target_mode == Mode::Ssa {
            return self.finish(&self.ssa_stage, &converted[0].1, cli);
        }

        // Stage 3: Optimization
        self.logger.stage_start(
            self.optimize_stage.stage_number(),
            total_stages,
            self.optimize_stage.name(),
        );

        let mut optimized = Vec::with_capacity(converted.len());
        for (_, ssa) in &converted {
            optimized.push(self.optimize_stage.execute(ssa.instructions.clone())?);
        }

        if self.optimize_stage.skip_optimization {
            self.logger.stage_skipped("skipped");
        } else {
            self.logger.stage_success();
            for (source, result) in sources.iter().zip(&optimized) {
                self.logger
                    .detail_item(&source.label, &self.optimize_stage.get_summary(result));
            }
        }

        if target_mode == Mode::Optimize {
            return self.finish(&self.optimize_stage, &optimized[0], cli);
        }

        // Stage 4: Control flow graph
        self.logger
            .stage_start(self.cfg_stage.stage_number(), total_stages, self.cfg_stage.name());

        let mut cfgs = Vec::with_capacity(converted.len());
        let mut instruction_lists = Vec::with_capacity(converted.len());
        for ((program, ssa), opt) in converted.into_iter().zip(optimized) {
            cfgs.push(self.cfg_stage.execute(program)?);
            instruction_lists.push(if self.encode_optimized {
                opt.instructions
            } else {
                ssa.instructions
            });
        }

        self.logger.stage_success();
        for (source, cfg) in sources.iter().zip(&cfgs) {
            self.logger
                .detail_item(&source.label, &self.cfg_stage.get_summary(cfg));
        }

        if target_mode == Mode::Cfg {
            return self.finish(&self.cfg_stage, &cfgs[0], cli);
        }

        // Stage 5: SMT encoding
        self.logger.stage_start(
            self.encode_stage.stage_number(),
            total_stages,
            self.encode_stage.name(),
        );

        let mut lists = instruction_lists.into_iter();
        let first = lists.next().unwrap_or_default();
        let query = match lists.next() {
            Some(second) => Query::Equivalence(first, second),
            None => Query::Assertions(first),
        };
        let (query, script) = self.encode_stage.execute(query)?;

        self.logger.stage_success();
        self.logger.detail(&self.encode_stage.get_summary(&script));
        if self.encode_stage.unroll_depth > 1 {
            self.logger
                .warn("loops are encoded by their phi nodes; --unroll has no effect on the script");
        }

        if target_mode == Mode::Smt {
            return self.finish(&self.encode_stage, &script, cli);
        }

        // Stage 6: Solving
        self.logger.stage_start(
            self.solve_stage.stage_number(),
            total_stages,
            self.solve_stage.name(),
        );
        self.logger
            .detail_item("Solver", &self.solve_stage.verifier.solver_name());

        let report = self.solve_stage.execute(query).map_err(|e| {
            self.logger.stage_error();
            self.logger.abort_pipeline();
            e
        })?;

        self.logger.stage_success();
        if let Some(path) = &report.saved_to {
            self.logger.file_output(path);
        }
        self.logger.verification_result(&report);

        Ok(Some(report.verdict))
    }

    fn finish<S, T>(&self, stage: &S, data: &T, cli: &Cli) -> Result<Option<Verdict>, String>
    where
        S: FileOutput<Data = T>,
    {
        if let Some(path) = &cli.output {
            self.logger.file_output(path);
        }
        OutputManager::handle_file_output(stage, data, cli)?;
        Ok(None)
    }
}

fn build_verifier(solver: Box<dyn Solver>, output_dir: &Option<PathBuf>) -> AutoVerifier {
    match output_dir {
        Some(dir) => AutoVerifier::new(solver).with_output_dir(dir),
        None => AutoVerifier::new(solver),
    }
}
