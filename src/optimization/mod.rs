//! SSA Optimization Framework
//!
//! This module provides the optimization passes run over SSA instruction lists:
//! - Constant propagation and folding
//! - Dead code elimination
//!
//! Passes rewrite instructions in place and never re-version names.

use crate::ssa::Instruction;
use std::collections::BTreeMap;

mod constant_propagation;
mod dead_code_elimination;

pub use constant_propagation::{evaluate_binary_op, ConstantPropagationPass};
pub use dead_code_elimination::DeadCodeEliminationPass;

/// Trait for optimization passes
pub trait OptimizationPass {
    /// Apply the pass; returns whether anything changed.
    fn optimize_instructions(&self, instructions: &mut Vec<Instruction>) -> bool;

    /// Get the name of this optimization pass
    fn name(&self) -> &'static str;
}

/// Main optimizer that orchestrates multiple passes
pub struct SsaOptimizer {
    passes: Vec<Box<dyn OptimizationPass>>,
    max_iterations: usize,
}

impl Default for SsaOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SsaOptimizer {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            max_iterations: 10,
        }
    }

    /// Add an optimization pass
    pub fn add_pass(mut self, pass: Box<dyn OptimizationPass>) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Constant propagation followed by dead code elimination.
    pub fn default_passes() -> Self {
        Self::new()
            .add_pass(Box::new(ConstantPropagationPass::new()))
            .add_pass(Box::new(DeadCodeEliminationPass::new()))
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Applies every pass in order until a whole round changes nothing.
    pub fn optimize_instructions(&self, instructions: &mut Vec<Instruction>) -> OptimizationResults {
        let mut results = OptimizationResults::new();
        let mut iteration = 0;

        loop {
            if iteration >= self.max_iterations {
                break;
            }

            let mut changed_this_iteration = false;

            for pass in &self.passes {
                if pass.optimize_instructions(instructions) {
                    changed_this_iteration = true;
                    results.record_pass_application(pass.name());
                }
            }

            if !changed_this_iteration {
                break; // Fixed point reached
            }

            iteration += 1;
        }

        results.iterations = iteration;
        results
    }
}

/// Pure entry point: optimizes a copy of `instructions` with the default passes.
pub fn optimize(instructions: &[Instruction]) -> Vec<Instruction> {
    let mut optimized = instructions.to_vec();
    SsaOptimizer::default_passes().optimize_instructions(&mut optimized);
    optimized
}

/// Results of optimization
#[derive(Debug, Default)]
pub struct OptimizationResults {
    pub pass_applications: BTreeMap<String, usize>,
    pub iterations: usize,
}

impl OptimizationResults {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_pass_application(&mut self, pass_name: &str) {
        *self
            .pass_applications
            .entry(pass_name.to_string())
            .or_insert(0) += 1;
    }
}
