// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::abstraction_pipeline::AbstractionMethod;
use crate::options::ReductionOptions;
use log::{debug, info};
use reaction_ir::{EdgeKind, Ir, Mark, ReactionId, SpeciesId};

/// Removes every species that cannot influence a kept species, together with the
/// reactions that change no relevant species. Does nothing when no species is kept.
///
/// A species is relevant if it is kept, or if it is a reactant, a modifier or appears in
/// the law of a reaction that consumes or produces a relevant species.
pub struct IrrelevantSpeciesRemover();

impl IrrelevantSpeciesRemover {
    pub fn new() -> Box<Self> {
        Box::new(Self())
    }

    fn species_mark(ir: &Ir, species: SpeciesId) -> Mark {
        ir.get_species(species).map_or(Mark::Black, |s| s.mark())
    }

    fn reaction_mark(ir: &Ir, reaction: ReactionId) -> Mark {
        ir.get_reaction(reaction).map_or(Mark::Black, |r| r.mark())
    }

    /// Species whose amount feeds into the rate of `reaction`.
    fn influencers(ir: &Ir, reaction: ReactionId) -> Vec<SpeciesId> {
        let mut result: Vec<SpeciesId> = [EdgeKind::Reactant, EdgeKind::Modifier]
            .into_iter()
            .flat_map(|kind| ir.reaction_species(reaction, kind))
            .map(|(s, _)| s)
            .collect();
        if let Some(r) = ir.get_reaction(reaction) {
            result.extend(r.law().referenced_species());
        }
        result
    }

    /// Marks relevant species and reactions black, leaving the rest white.
    pub fn mark_relevant(ir: &mut Ir) -> anyhow::Result<()> {
        ir.reset_marks();
        let mut worklist: Vec<SpeciesId> = ir
            .species()
            .filter(|s| s.is_kept())
            .map(|s| s.id())
            .collect();
        for species in &worklist {
            ir.species_node_mut(*species)?.set_mark(Mark::Gray);
        }
        while let Some(species) = worklist.pop() {
            ir.species_node_mut(species)?.set_mark(Mark::Black);
            for edge in ir.species_edge_snapshot(species) {
                if edge.kind == EdgeKind::Modifier
                    || Self::reaction_mark(ir, edge.reaction) != Mark::White
                {
                    continue;
                }
                ir.reaction_mut(edge.reaction)?.set_mark(Mark::Black);
                for influencer in Self::influencers(ir, edge.reaction) {
                    if Self::species_mark(ir, influencer) == Mark::White {
                        ir.species_node_mut(influencer)?.set_mark(Mark::Gray);
                        worklist.push(influencer);
                    }
                }
            }
        }
        Ok(())
    }
}

impl AbstractionMethod for IrrelevantSpeciesRemover {
    fn id(&self) -> &'static str {
        "irrelevant-species-remover"
    }

    fn apply(&self, ir: &mut Ir, _options: &ReductionOptions) -> anyhow::Result<bool> {
        if !ir.species().any(|s| s.is_kept()) {
            debug!("no kept species, every species is relevant");
            return Ok(false);
        }
        Self::mark_relevant(ir)?;
        let reactions: Vec<ReactionId> = ir
            .reactions()
            .filter(|r| r.mark() == Mark::White)
            .map(|r| r.id())
            .collect();
        let species: Vec<SpeciesId> = ir
            .species()
            .filter(|s| s.mark() == Mark::White)
            .map(|s| s.id())
            .collect();
        for reaction in &reactions {
            ir.remove_reaction(*reaction)?;
        }
        for s in &species {
            ir.remove_species(*s)?;
        }
        ir.reset_marks();
        if reactions.is_empty() && species.is_empty() {
            return Ok(false);
        }
        info!(
            "removed {} irrelevant species and {} reactions",
            species.len(),
            reactions.len()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_ir::{InitialQuantity, KineticLaw};

    /// `A -> B` catalysed by `E`, `B -> 0`, and an unrelated cascade `X -> Y` modified
    /// by `B`.
    fn network() -> Ir {
        let mut ir = Ir::new();
        let a = ir.add_species("A", InitialQuantity::Amount(10.0));
        let b = ir.add_species("B", InitialQuantity::Amount(0.0));
        let e = ir.add_species("E", InitialQuantity::Amount(1.0));
        let x = ir.add_species("X", InitialQuantity::Amount(5.0));
        let y = ir.add_species("Y", InitialQuantity::Amount(0.0));
        let k = ir.add_symbol("k", 1.0, true).unwrap();

        let convert = ir.add_reaction(
            "convert",
            KineticLaw::product(vec![
                KineticLaw::symbol(k),
                KineticLaw::species(e),
                KineticLaw::species(a),
            ]),
            false,
            false,
        );
        ir.add_reactant(convert, a, 1).unwrap();
        ir.add_modifier(convert, e).unwrap();
        ir.add_product(convert, b, 1).unwrap();

        let decay = ir.add_reaction(
            "decay",
            KineticLaw::mul(KineticLaw::symbol(k), KineticLaw::species(b)),
            false,
            false,
        );
        ir.add_reactant(decay, b, 1).unwrap();

        let cascade = ir.add_reaction(
            "cascade",
            KineticLaw::product(vec![
                KineticLaw::symbol(k),
                KineticLaw::species(x),
                KineticLaw::species(b),
            ]),
            false,
            false,
        );
        ir.add_reactant(cascade, x, 1).unwrap();
        ir.add_modifier(cascade, b).unwrap();
        ir.add_product(cascade, y, 1).unwrap();
        ir
    }

    fn names(ir: &Ir) -> Vec<String> {
        let mut names: Vec<String> = ir.species().map(|s| s.name().to_string()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_nothing_kept_is_a_no_op() {
        let mut ir = network();
        assert!(!IrrelevantSpeciesRemover::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert_eq!(ir.species_count(), 5);
    }

    #[test]
    fn test_removes_downstream_cascade() {
        let mut ir = network();
        let b = ir.find_species_by_name("B").unwrap();
        ir.get_species_mut(b).unwrap().set_keep(true);
        assert!(IrrelevantSpeciesRemover::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert_eq!(names(&ir), vec!["A", "B", "E"]);
        assert!(ir.find_reaction_by_name("cascade").is_none());
        assert_eq!(ir.reaction_count(), 2);
        assert!(ir.species().all(|s| s.mark() == Mark::White));
        ir.validate_for_handoff().unwrap();
    }

    #[test]
    fn test_keeping_the_end_product_keeps_everything() {
        let mut ir = network();
        let y = ir.find_species_by_name("Y").unwrap();
        ir.get_species_mut(y).unwrap().set_keep(true);
        assert!(!IrrelevantSpeciesRemover::new()
            .apply(&mut ir, &ReductionOptions::default())
            .unwrap());
        assert_eq!(ir.species_count(), 5);
    }
}
