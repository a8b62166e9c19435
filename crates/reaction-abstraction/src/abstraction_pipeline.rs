// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! The abstraction method interface and the pipeline that drives a sequence of methods
//! over one [`Ir`].

use crate::options::ReductionOptions;
use anyhow::Context;
use log::{debug, info, warn};
use reaction_ir::Ir;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;

/// A conditionally applied model-reduction rewrite.
///
/// `apply` scans its candidates, checks each one and rewrites the IR for those that
/// match. Candidates that do not have the required shape are skipped; a failure after a
/// candidate matched aborts the method with an error. Rewrites already applied stay in
/// the IR.
pub trait AbstractionMethod {
    /// Stable name of the method. This should be suitable as a file suffix.
    fn id(&self) -> &'static str;

    /// Applies the method to every matching candidate. Returns whether the IR changed.
    fn apply(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool>;

    /// Whether the method may run at most once per compile, even when the pipeline
    /// iterates to a fixed point.
    fn run_once(&self) -> bool {
        false
    }
}

/// An ordered sequence of abstraction methods.
#[derive(Default)]
pub struct AbstractionPipeline {
    methods: Vec<Box<dyn AbstractionMethod>>,
}

impl AbstractionPipeline {
    pub fn add_method(&mut self, method: Box<dyn AbstractionMethod>) {
        self.methods.push(method)
    }

    pub fn method_ids(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Runs up to `max_rounds` passes over the method list, stopping after the first pass
    /// in which no method changed the IR. Methods flagged `run_once` are skipped after
    /// their first execution.
    fn run_rounds<H1, H2>(
        &self,
        ir: &mut Ir,
        options: &ReductionOptions,
        max_rounds: usize,
        hook_before_pipeline: H1,
        mut hook_after_each_method: H2,
    ) -> anyhow::Result<bool>
    where
        H1: FnOnce(&Ir),
        H2: FnMut(usize, &dyn AbstractionMethod, &Ir),
    {
        hook_before_pipeline(ir);
        let mut executed: BTreeSet<&'static str> = BTreeSet::new();
        let mut step_count = 0;
        let mut changed_any = false;
        for round in 1..=max_rounds {
            let mut changed = false;
            for method in &self.methods {
                if method.run_once() && executed.contains(method.id()) {
                    debug!("skipping `{}`: already executed", method.id());
                    continue;
                }
                executed.insert(method.id());
                step_count += 1;
                let method_changed = method
                    .apply(ir, options)
                    .with_context(|| format!("abstraction method `{}` failed", method.id()))?;
                if method_changed {
                    info!("round {}: `{}` changed the model", round, method.id());
                }
                changed |= method_changed;
                hook_after_each_method(step_count, method.as_ref(), ir);
            }
            changed_any |= changed;
            if !changed {
                debug!("fixed point reached after {} round(s)", round);
                return Ok(changed_any);
            }
            if round == max_rounds && max_rounds > 1 {
                warn!(
                    "no fixed point after {} rounds, stopping the pipeline",
                    max_rounds
                );
            }
        }
        Ok(changed_any)
    }

    /// Runs every method once, in order, calling `hook_before_pipeline` first and
    /// `hook_after_each_method` after each method with the 1-based step count.
    pub fn run_with_hook<H1, H2>(
        &self,
        ir: &mut Ir,
        options: &ReductionOptions,
        hook_before_pipeline: H1,
        hook_after_each_method: H2,
    ) -> anyhow::Result<bool>
    where
        H1: FnOnce(&Ir),
        H2: FnMut(usize, &dyn AbstractionMethod, &Ir),
    {
        self.run_rounds(ir, options, 1, hook_before_pipeline, hook_after_each_method)
    }

    /// Runs every method once, in order.
    pub fn run(&self, ir: &mut Ir, options: &ReductionOptions) -> anyhow::Result<bool> {
        self.run_with_hook(ir, options, |_| {}, |_, _, _| {})
    }

    /// Repeats the method list until no method changes the IR, for at most
    /// `options.pipeline_max_iterations` rounds.
    pub fn run_to_fixed_point(
        &self,
        ir: &mut Ir,
        options: &ReductionOptions,
    ) -> anyhow::Result<bool> {
        let rounds = options.pipeline_max_iterations.max(1);
        self.run_rounds(ir, options, rounds, |_| {}, |_, _, _| {})
    }

    /// Runs the pipeline once, dumping the IR before the pipeline as well as after each
    /// method to `<base>_<step>_<method>.ir`. If `dump_dot` is set, the reaction graph is
    /// dumped in dot format next to it.
    pub fn run_with_dump(
        &self,
        ir: &mut Ir,
        options: &ReductionOptions,
        dump_base_name: &str,
        dump_dot: bool,
    ) -> anyhow::Result<bool> {
        let dump_error: RefCell<Option<anyhow::Error>> = RefCell::new(None);
        let dump = |step: usize, suffix: &str, ir: &Ir| {
            let mut error = dump_error.borrow_mut();
            if error.is_some() {
                return;
            }
            if let Err(e) = Self::dump_to_file(dump_base_name, step, suffix, ir, dump_dot) {
                *error = Some(e);
            }
        };
        let changed = self.run_rounds(
            ir,
            options,
            1,
            |ir| dump(0, "initial", ir),
            |step, method, ir| dump(step, method.id(), ir),
        );
        match dump_error.into_inner() {
            Some(e) => Err(e),
            None => changed,
        }
    }

    fn dump_to_file(
        base_name: &str,
        step_count: usize,
        suffix: &str,
        ir: &Ir,
        dump_dot: bool,
    ) -> anyhow::Result<()> {
        let file_name = format!("{}_{}_{}.ir", base_name, step_count, suffix);
        debug!("dumping model to `{}`", file_name);
        fs::write(&file_name, ir.display().to_string())
            .with_context(|| format!("writing `{}`", file_name))?;
        if dump_dot {
            let dot_file = format!("{}_{}_{}.dot", base_name, step_count, suffix);
            debug!("generating dot graph in `{}`", dot_file);
            fs::write(&dot_file, ir.to_dot()).with_context(|| format!("writing `{}`", dot_file))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::{InitialQuantity, KineticLaw};
    use std::cell::Cell;

    /// Removes one species per application until none is left.
    struct RemoveFirstSpecies {
        once: bool,
        calls: Cell<usize>,
    }

    impl AbstractionMethod for RemoveFirstSpecies {
        fn id(&self) -> &'static str {
            if self.once {
                "remove-first-once"
            } else {
                "remove-first"
            }
        }

        fn apply(&self, ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
            self.calls.set(self.calls.get() + 1);
            match ir.species_ids().first() {
                Some(id) => {
                    ir.remove_species(*id)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn run_once(&self) -> bool {
            self.once
        }
    }

    struct Failing;

    impl AbstractionMethod for Failing {
        fn id(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
            anyhow::bail!("broken candidate")
        }
    }

    fn ir_with_species(n: usize) -> Ir {
        let mut ir = Ir::new();
        for i in 0..n {
            ir.add_species(&format!("S{}", i), InitialQuantity::Amount(1.0));
        }
        ir.add_reaction("r", KineticLaw::real(1.0), false, false);
        ir
    }

    fn pipeline(once: bool) -> AbstractionPipeline {
        let mut pipeline = AbstractionPipeline::default();
        pipeline.add_method(Box::new(RemoveFirstSpecies {
            once,
            calls: Cell::new(0),
        }));
        pipeline
    }

    #[test]
    fn test_single_pass() {
        let mut ir = ir_with_species(3);
        assert!(pipeline(false).run(&mut ir, &ReductionOptions::default()).unwrap());
        assert_eq!(ir.species_count(), 2);
    }

    #[test]
    fn test_fixed_point() {
        let mut ir = ir_with_species(3);
        let changed = pipeline(false)
            .run_to_fixed_point(&mut ir, &ReductionOptions::default())
            .unwrap();
        assert!(changed);
        assert_eq!(ir.species_count(), 0);
    }

    #[test]
    fn test_fixed_point_is_bounded() {
        let mut ir = ir_with_species(10);
        let options = ReductionOptions {
            pipeline_max_iterations: 4,
            ..ReductionOptions::default()
        };
        pipeline(false).run_to_fixed_point(&mut ir, &options).unwrap();
        assert_eq!(ir.species_count(), 6);
    }

    #[test]
    fn test_run_once_guard() {
        let mut ir = ir_with_species(3);
        pipeline(true)
            .run_to_fixed_point(&mut ir, &ReductionOptions::default())
            .unwrap();
        assert_eq!(ir.species_count(), 2);
    }

    #[test]
    fn test_hook_sees_every_step() {
        let mut ir = ir_with_species(3);
        let mut p = pipeline(false);
        p.add_method(Box::new(RemoveFirstSpecies {
            once: false,
            calls: Cell::new(0),
        }));
        let mut steps = Vec::new();
        let mut before = None;
        p.run_with_hook(
            &mut ir,
            &ReductionOptions::default(),
            |ir| before = Some(ir.species_count()),
            |step, method, ir| steps.push((step, method.id(), ir.species_count())),
        )
        .unwrap();
        assert_eq!(before, Some(3));
        assert_eq!(steps, vec![(1, "remove-first", 2), (2, "remove-first", 1)]);
    }

    #[test]
    fn test_error_names_the_method() {
        let mut ir = ir_with_species(1);
        let mut p = AbstractionPipeline::default();
        p.add_method(Box::new(Failing));
        let err = p.run(&mut ir, &ReductionOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "abstraction method `failing` failed");
        assert_eq!(err.root_cause().to_string(), "broken candidate");
    }
}
