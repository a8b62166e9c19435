// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use reaction_abstraction::options::NARY_ORDER_MAX_LEVELS;
use reaction_abstraction::{
    default_pipeline, default_pipeline_with_options, pipeline_from_ids, PropertyStore,
    ReductionOptions,
};
use reaction_ir::{EdgeKind, InitialQuantity, Ir, KineticLaw};
use std::fs;
use std::path::Path;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn law_of(ir: &Ir, reaction: &str) -> String {
    let id = ir.find_reaction_by_name(reaction).unwrap();
    ir.reaction(id).unwrap().law().display(ir).to_string()
}

fn species_names(ir: &Ir) -> Vec<String> {
    let mut names: Vec<String> = ir.species().map(|s| s.name().to_string()).collect();
    names.sort();
    names
}

/// A Michaelis-Menten enzyme `E + S <-> C -> E + P` next to a dimerization
/// `2M <-> D` whose dimer decays.
fn enzyme_and_dimer() -> Ir {
    let mut ir = Ir::new();
    let e = ir.add_species("E", InitialQuantity::Amount(1.0));
    let s = ir.add_species("S", InitialQuantity::Amount(50.0));
    let c = ir.add_species("C", InitialQuantity::Amount(0.0));
    let p = ir.add_species("P", InitialQuantity::Amount(0.0));
    let m = ir.add_species("M", InitialQuantity::Amount(10.0));
    let d = ir.add_species("D", InitialQuantity::Amount(3.0));
    let kf1 = ir.add_symbol("kf1", 1.0, true).unwrap();
    let kr1 = ir.add_symbol("kr1", 1000.0, true).unwrap();
    let kcat = ir.add_symbol("kcat", 1.0, true).unwrap();
    let kf2 = ir.add_symbol("kf2", 1.0, true).unwrap();
    let kr2 = ir.add_symbol("kr2", 2.0, true).unwrap();
    let kd = ir.add_symbol("kd", 0.1, true).unwrap();

    let bind = ir.add_reaction(
        "bind",
        KineticLaw::sub(
            KineticLaw::product(vec![
                KineticLaw::symbol(kf1),
                KineticLaw::species(e),
                KineticLaw::species(s),
            ]),
            KineticLaw::mul(KineticLaw::symbol(kr1), KineticLaw::species(c)),
        ),
        true,
        false,
    );
    ir.add_reactant(bind, e, 1).unwrap();
    ir.add_reactant(bind, s, 1).unwrap();
    ir.add_product(bind, c, 1).unwrap();
    let release = ir.add_reaction(
        "release",
        KineticLaw::mul(KineticLaw::symbol(kcat), KineticLaw::species(c)),
        false,
        false,
    );
    ir.add_reactant(release, c, 1).unwrap();
    ir.add_product(release, e, 1).unwrap();
    ir.add_product(release, p, 1).unwrap();

    let dimerize = ir.add_reaction(
        "dimerize",
        KineticLaw::sub(
            KineticLaw::mul(
                KineticLaw::symbol(kf2),
                KineticLaw::pow(KineticLaw::species(m), KineticLaw::int(2)),
            ),
            KineticLaw::mul(KineticLaw::symbol(kr2), KineticLaw::species(d)),
        ),
        true,
        false,
    );
    ir.add_reactant(dimerize, m, 2).unwrap();
    ir.add_product(dimerize, d, 1).unwrap();
    let decay = ir.add_reaction(
        "decay",
        KineticLaw::mul(KineticLaw::symbol(kd), KineticLaw::species(d)),
        false,
        false,
    );
    ir.add_reactant(decay, d, 1).unwrap();
    ir
}

/// `S -> 0` saturating at `K1 = 5` and `0 -> S` inhibited above `K2 = 20`.
fn level_network() -> Ir {
    let mut ir = Ir::new();
    let s = ir.add_species("S", InitialQuantity::Amount(0.0));
    let kd = ir.add_symbol("kd", 1.0, true).unwrap();
    let k = ir.add_symbol("k", 1.0, true).unwrap();
    let k1 = ir.add_symbol("K1", 5.0, true).unwrap();
    let k2 = ir.add_symbol("K2", 20.0, true).unwrap();
    let consume = ir.add_reaction(
        "R1",
        KineticLaw::div(
            KineticLaw::mul(KineticLaw::symbol(kd), KineticLaw::species(s)),
            KineticLaw::add(KineticLaw::symbol(k1), KineticLaw::species(s)),
        ),
        false,
        false,
    );
    ir.add_reactant(consume, s, 1).unwrap();
    let produce = ir.add_reaction(
        "R2",
        KineticLaw::div(
            KineticLaw::symbol(k),
            KineticLaw::add(KineticLaw::symbol(k2), KineticLaw::species(s)),
        ),
        false,
        false,
    );
    ir.add_product(produce, s, 1).unwrap();
    ir
}

/// A promoter `Pro` that is either repressed, `Pro + Rep <-> Cr`, or recruits an
/// abundant polymerase, `Pro + RNAP <-> Open`, with transcription from the open complex.
fn repressed_promoter() -> Ir {
    let mut ir = Ir::new();
    let pro = ir.add_species("Pro", InitialQuantity::Amount(1.0));
    let rep = ir.add_species("Rep", InitialQuantity::Amount(20.0));
    let rnap = ir.add_species("RNAP", InitialQuantity::Amount(200.0));
    let repressed = ir.add_species("Cr", InitialQuantity::Amount(0.0));
    let open = ir.add_species("Open", InitialQuantity::Amount(0.0));
    let mrna = ir.add_species("mRNA", InitialQuantity::Amount(0.0));
    let ktx = ir.add_symbol("ktx", 0.5, true).unwrap();
    for (name, partner, complex, kf, kr) in [
        ("repress", rep, repressed, "kfR", "krR"),
        ("recruit", rnap, open, "kfP", "krP"),
    ] {
        let kf = ir.add_symbol(kf, 1.0, true).unwrap();
        let kr = ir.add_symbol(kr, 100.0, true).unwrap();
        let binding = ir.add_reaction(
            name,
            KineticLaw::sub(
                KineticLaw::product(vec![
                    KineticLaw::symbol(kf),
                    KineticLaw::species(pro),
                    KineticLaw::species(partner),
                ]),
                KineticLaw::mul(KineticLaw::symbol(kr), KineticLaw::species(complex)),
            ),
            true,
            false,
        );
        ir.add_reactant(binding, pro, 1).unwrap();
        ir.add_reactant(binding, partner, 1).unwrap();
        ir.add_product(binding, complex, 1).unwrap();
    }
    let transcribe = ir.add_reaction(
        "transcribe",
        KineticLaw::mul(KineticLaw::symbol(ktx), KineticLaw::species(open)),
        false,
        false,
    );
    ir.add_modifier(transcribe, open).unwrap();
    ir.add_product(transcribe, mrna, 1).unwrap();
    ir
}

#[test]
fn operator_step_claims_promoter_before_rnap_step() {
    init_logger();
    let mut ir = repressed_promoter();
    let options = ReductionOptions::default();
    let pipeline = default_pipeline();

    let mut removed_by = None;
    assert!(pipeline
        .run_with_hook(&mut ir, &options, |_| {}, |_, method, ir| {
            if removed_by.is_none() && ir.find_species_by_name("Pro").is_none() {
                removed_by = Some(method.id());
            }
        })
        .unwrap());
    assert_eq!(removed_by, Some("operator-site-binding-remover"));

    assert_eq!(species_names(&ir), vec!["RNAP", "Rep", "mRNA"]);
    assert_eq!(ir.reaction_count(), 1);
    let transcribe = ir.find_reaction_by_name("transcribe").unwrap();
    let rep = ir.find_species_by_name("Rep").unwrap();
    let rnap = ir.find_species_by_name("RNAP").unwrap();
    let mut modifiers: Vec<_> = ir
        .reaction_species(transcribe, EdgeKind::Modifier)
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    modifiers.sort();
    let mut expected = vec![rep, rnap];
    expected.sort();
    assert_eq!(modifiers, expected);
    insta::assert_snapshot!(
        law_of(&ir, "transcribe"),
        @"ktx * (Pro_total * (kfP / krP * RNAP) / (1 + kfR / krR * Rep + kfP / krP * RNAP))"
    );
    ir.validate_for_handoff().unwrap();

    // RNAP stays: it has no site left to bind.
    assert!(!pipeline.run_to_fixed_point(&mut ir, &options).unwrap());
    assert!(ir.has_species(rnap));
}

#[test]
fn default_pipeline_reduces_enzyme_and_dimer() {
    init_logger();
    let mut ir = enzyme_and_dimer();
    let mut properties = PropertyStore::new();
    properties.set(NARY_ORDER_MAX_LEVELS, 0);
    let options = ReductionOptions::from_properties(&properties);
    let pipeline = default_pipeline_with_options(&options);

    assert!(pipeline.run_to_fixed_point(&mut ir, &options).unwrap());
    assert_eq!(species_names(&ir), vec!["E", "M", "P", "S"]);
    assert_eq!(ir.reaction_count(), 2);

    let release = ir.find_reaction_by_name("release").unwrap();
    let s = ir.find_species_by_name("S").unwrap();
    let e = ir.find_species_by_name("E").unwrap();
    assert_eq!(ir.reaction_species(release, EdgeKind::Reactant), vec![(s, 1)]);
    assert!(ir.has_edge(release, e, EdgeKind::Modifier));
    insta::assert_snapshot!(law_of(&ir, "release"), @"kcat * E * S / (kr1 / kf1 + S)");

    let m = ir.find_species_by_name("M").unwrap();
    assert_eq!(ir.initial_amount(m).unwrap(), 16.0);
    ir.validate_for_handoff().unwrap();

    // A second compile over the reduced model finds nothing left to do.
    let again = default_pipeline_with_options(&options);
    assert!(!again.run_to_fixed_point(&mut ir, &options).unwrap());
}

#[test]
fn nary_order_splits_into_two_levels_once() {
    init_logger();
    let mut ir = level_network();
    let pipeline = pipeline_from_ids(&["nary-order-unary-transformer"]).unwrap();
    assert!(pipeline
        .run_to_fixed_point(&mut ir, &ReductionOptions::default())
        .unwrap());

    assert_eq!(species_names(&ir), vec!["S__1", "S__2"]);
    let mut reactions: Vec<String> = ir.reactions().map(|r| r.name().to_string()).collect();
    reactions.sort();
    assert_eq!(reactions, vec!["R1__1", "R1__2", "R2__1", "R2__2"]);

    // Producing the second level requires the first to be set and the second unset.
    insta::assert_snapshot!(
        law_of(&ir, "R2__2"),
        @"S__1 * (1 - S__2) * (k / (K2 + 5)) / 15"
    );
    ir.validate_for_handoff().unwrap();
}

#[test]
fn pow_and_constants_are_simplified() {
    init_logger();
    let mut ir = Ir::new();
    let a = ir.add_species("a", InitialQuantity::Amount(1.0));
    let b = ir.add_species("b", InitialQuantity::Amount(1.0));
    let k = ir.add_symbol("k", 1.0, true).unwrap();
    let r = ir.add_reaction(
        "r",
        KineticLaw::product(vec![
            KineticLaw::symbol(k),
            KineticLaw::mul(KineticLaw::int(2), KineticLaw::int(3)),
            KineticLaw::pow(
                KineticLaw::mul(KineticLaw::species(a), KineticLaw::species(b)),
                KineticLaw::int(2),
            ),
        ]),
        false,
        false,
    );
    ir.add_modifier(r, a).unwrap();
    ir.add_modifier(r, b).unwrap();
    let pipeline = pipeline_from_ids(&[
        "kinetic-law-constants-simplifier",
        "pow-kinetic-law-transformer",
    ])
    .unwrap();
    assert!(pipeline.run(&mut ir, &ReductionOptions::default()).unwrap());
    insta::assert_snapshot!(law_of(&ir, "r"), @"k * 6 * (a ^ 2 * b ^ 2)");
}

#[test]
fn unknown_method_id_is_rejected() {
    let err = pipeline_from_ids(&["dimerization-reduction", "quasi-steady-state"])
        .err()
        .unwrap();
    assert!(err.to_string().contains("quasi-steady-state"));
}

#[test]
fn run_with_dump_writes_every_step() {
    init_logger();
    let dir = std::env::temp_dir().join(format!("reaction_dump_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let base = dir.join("model");
    let mut ir = enzyme_and_dimer();
    let pipeline = pipeline_from_ids(&["dimerization-reduction"]).unwrap();
    assert!(pipeline
        .run_with_dump(
            &mut ir,
            &ReductionOptions::default(),
            base.to_str().unwrap(),
            true
        )
        .unwrap());

    let exists = |name: &str| Path::new(&dir).join(name).exists();
    assert!(exists("model_0_initial.ir"));
    assert!(exists("model_0_initial.dot"));
    assert!(exists("model_1_dimerization-reduction.ir"));
    assert!(exists("model_1_dimerization-reduction.dot"));
    let initial = fs::read_to_string(dir.join("model_0_initial.ir")).unwrap();
    assert!(initial.contains("dimerize"));
    let reduced = fs::read_to_string(dir.join("model_1_dimerization-reduction.ir")).unwrap();
    assert!(!reduced.contains("dimerize"));
    fs::remove_dir_all(&dir).unwrap();
}
