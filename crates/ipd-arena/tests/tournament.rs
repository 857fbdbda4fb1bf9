use ipd_arena::{
    run_round_robin, run_tournament, ArenaError, Builtin, ContractViolation, NoiseConfig,
    PairingFault, Program, Strategy, StrategyLogic, TournamentConfig,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn program(name: &str, source: &str) -> Strategy {
    Strategy::program(name, Program::assemble(source).unwrap())
}

/// Cooperates, but faults once it has played three rounds without defecting.
/// Every validation history past round 0 contains an own defection, so this
/// passes validation and only fails inside real matches.
fn sneaky() -> Strategy {
    program(
        "sneaky",
        "MY_DEFECTS PUSH 0 EQ ROUND PUSH 2 GT AND JMP_FWD_IF 1 COOP FAULT",
    )
}

#[test]
fn test_builtin_pool_full_coverage() {
    init_tracing();
    let config = TournamentConfig::default().with_rounds(50).with_seed(42);
    let report = run_tournament(Strategy::all_builtins(), &config).unwrap();

    let n = Builtin::all().len();
    assert_eq!(report.pairings_scheduled, n * (n - 1) / 2);
    assert_eq!(report.rejected_count(), 0);
    assert_eq!(report.faulted_count(), 0);
    assert_eq!(report.result.len(), n);
    assert_eq!(report.seed, 42);

    for a in Builtin::all() {
        assert_eq!(report.result.opponents(a.name()).count(), n - 1);
        for b in Builtin::all() {
            if a == b {
                assert_eq!(report.result.get(a.name(), b.name()), None);
                continue;
            }
            let (x, y) = report.result.get(a.name(), b.name()).unwrap();
            assert_eq!(report.result.get(b.name(), a.name()), Some((y, x)));
        }
    }
}

#[test]
fn test_grudger_vs_always_defect_scores() {
    let config = TournamentConfig::default().with_rounds(20).with_seed(1);
    let pool = vec![
        Strategy::builtin(Builtin::Grudger),
        Strategy::builtin(Builtin::AlwaysDefect),
    ];
    let report = run_tournament(pool, &config).unwrap();
    assert_eq!(report.result.get("grudger", "always_defect"), Some((19.0, 28.0)));
    assert_eq!(report.result.get("always_defect", "grudger"), Some((28.0, 19.0)));
}

#[test]
fn test_match_fault_is_local() {
    init_tracing();
    let config = TournamentConfig::default().with_rounds(10).with_seed(3);
    let pool = vec![
        Strategy::builtin(Builtin::TitForTat),
        sneaky(),
        Strategy::builtin(Builtin::Grudger),
        Strategy::builtin(Builtin::AlwaysDefect),
    ];
    let report = run_tournament(pool, &config).unwrap();

    assert_eq!(report.rejected_count(), 0);
    assert_eq!(report.pairings_scheduled, 6);
    assert_eq!(report.faulted_count(), 3);
    for faulted in &report.faulted {
        assert!(faulted.a == "sneaky" || faulted.b == "sneaky");
        match &faulted.fault {
            PairingFault::Runtime(fault) => assert_eq!(fault.round, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert_eq!(report.result.len(), 3);
    assert!(report.result.get("sneaky", "grudger").is_none());
    assert!(report.result.get("grudger", "sneaky").is_none());
    assert_eq!(report.result.opponents("sneaky").count(), 0);
    assert!(report.result.get("tit_for_tat", "grudger").is_some());
    assert_eq!(report.result.opponents("always_defect").count(), 2);
}

#[test]
fn test_noisy_fault_voids_pairing_in_both_directions() {
    init_tracing();
    // faults as soon as it perceives any defection
    let watcher = program("watcher", "OPP_DEFECTS PUSH 0 GT JMP_FWD_IF 1 COOP FAULT");
    let pool = vec![
        watcher,
        Strategy::builtin(Builtin::AlwaysCooperate),
        Strategy::builtin(Builtin::TitForTat),
    ];
    let config = TournamentConfig::default()
        .with_rounds(20)
        .with_seed(13)
        .with_noise(NoiseConfig::with_level(0.2, 10));
    let outcome = run_round_robin(&pool, &config).unwrap();

    assert_eq!(outcome.pairings_scheduled, 3);
    assert!(outcome
        .faulted
        .iter()
        .any(|f| f.a == "watcher" && f.b == "always_cooperate"));
    for faulted in &outcome.faulted {
        assert!(matches!(faulted.fault, PairingFault::Runtime(_)));
        assert!(outcome.result.get(&faulted.a, &faulted.b).is_none());
        assert!(outcome.result.get(&faulted.b, &faulted.a).is_none());
    }
    assert!(outcome.result.get("always_cooperate", "tit_for_tat").is_some());
    assert!(outcome.result.get("tit_for_tat", "always_cooperate").is_some());
}

#[test]
fn test_round_robin_rejects_duplicate_names() {
    let impostor = Strategy::new(
        "always_defect",
        StrategyLogic::Builtin(Builtin::AlwaysCooperate),
    );
    let pool = vec![
        Strategy::builtin(Builtin::AlwaysDefect),
        impostor,
        Strategy::builtin(Builtin::TitForTat),
    ];
    let config = TournamentConfig::default().with_rounds(5).with_seed(2);

    match run_round_robin(&pool, &config) {
        Err(ArenaError::DuplicateName(name)) => assert_eq!(name, "always_defect"),
        other => panic!("unexpected {:?}", other.map(|o| o.pairings_scheduled)),
    }

    // validation drops the second entry, so the full run keeps the real scores
    let report = run_tournament(pool, &config).unwrap();
    assert_eq!(report.rejected_count(), 1);
    assert!(matches!(report.rejected[0].reason, ContractViolation::DuplicateName));
    assert_eq!(report.pairings_scheduled, 1);
    assert_eq!(report.result.get("always_defect", "always_defect"), None);
    assert_eq!(report.result.get("always_defect", "tit_for_tat"), Some((13.0, 4.0)));
    assert_eq!(report.result.get("tit_for_tat", "always_defect"), Some((4.0, 13.0)));
}

#[test]
fn test_mutating_program_rejected() {
    let config = TournamentConfig::default().with_rounds(10).with_seed(5);
    let pool = vec![
        Strategy::builtin(Builtin::TitForTat),
        program("rewriter", "PUSH 0 APPEND_MY COOP"),
        Strategy::builtin(Builtin::Pavlov),
    ];
    let report = run_tournament(pool, &config).unwrap();

    assert_eq!(report.rejected_count(), 1);
    assert_eq!(report.rejected[0].strategy, "rewriter");
    assert!(matches!(report.rejected[0].reason, ContractViolation::Mutated { round: 0, .. }));
    assert_eq!(report.pairings_scheduled, 1);
    assert!(report.result.get("rewriter", "pavlov").is_none());
    assert!(report.result.get("tit_for_tat", "pavlov").is_some());
}

#[test]
fn test_same_seed_same_report_regardless_of_pool_size() {
    let noisy = TournamentConfig::default()
        .with_rounds(30)
        .with_seed(7)
        .with_noise(NoiseConfig::with_level(0.1, 5));

    let single = run_tournament(Strategy::all_builtins(), &noisy.clone().with_workers(1)).unwrap();
    let four = run_tournament(Strategy::all_builtins(), &noisy.with_workers(4)).unwrap();

    assert_eq!(single.result, four.result);
    assert_eq!(single.to_json().unwrap(), four.to_json().unwrap());
}

#[test]
fn test_unseeded_run_is_replayable() {
    let config = TournamentConfig::default().with_rounds(15);
    let first = run_round_robin(&Strategy::all_builtins(), &config).unwrap();
    let replay =
        run_round_robin(&Strategy::all_builtins(), &config.with_seed(first.seed)).unwrap();
    assert_eq!(first.result, replay.result);
}

#[test]
fn test_zero_noise_tournament_matches_noiseless() {
    let base = TournamentConfig::default().with_rounds(25).with_seed(11);
    let plain = run_tournament(Strategy::all_builtins(), &base).unwrap();
    let silent = run_tournament(
        Strategy::all_builtins(),
        &base.clone().with_noise(NoiseConfig::with_level(0.0, 1)),
    )
    .unwrap();
    assert_eq!(plain.result, silent.result);
}

#[test]
fn test_degenerate_pools() {
    let config = TournamentConfig::default().with_seed(0);

    let empty = run_tournament(Vec::new(), &config).unwrap();
    assert_eq!(empty.pairings_scheduled, 0);
    assert!(empty.result.is_empty());

    let alone = run_tournament(vec![Strategy::builtin(Builtin::Gradual)], &config).unwrap();
    assert_eq!(alone.pairings_scheduled, 0);
    assert!(alone.standings().is_empty());
}

#[test]
fn test_invalid_config_fails_whole_run() {
    let config = TournamentConfig::default().with_noise(NoiseConfig::with_level(-0.5, 10));
    assert!(matches!(
        run_tournament(Strategy::all_builtins(), &config),
        Err(ArenaError::Config(_))
    ));
}

#[test]
fn test_report_json_carries_run_metadata() {
    let config = TournamentConfig::from_json(r#"{"rounds": 12, "seed": 99}"#).unwrap();
    let pool = vec![
        Strategy::builtin(Builtin::TitForTat),
        Strategy::builtin(Builtin::AlwaysCooperate),
        program("boom", "FAULT"),
    ];
    let report = run_tournament(pool, &config).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["seed"], 99);
    assert_eq!(json["rounds"], 12);
    assert_eq!(json["result"]["tit_for_tat"]["always_cooperate"][0], 60.0);
    assert_eq!(json["rejected"][0]["strategy"], "boom");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_results_are_symmetric_and_complete(
        picks in proptest::sample::subsequence(Builtin::all().to_vec(), 0..=Builtin::all().len()),
        seed in any::<u64>(),
    ) {
        let pool: Vec<_> = picks.iter().copied().map(Strategy::builtin).collect();
        let config = TournamentConfig::default().with_rounds(10).with_seed(seed);
        let report = run_tournament(pool, &config).unwrap();

        let n = picks.len();
        prop_assert_eq!(report.pairings_scheduled, n * n.saturating_sub(1) / 2);
        for a in &picks {
            for b in &picks {
                if a == b {
                    continue;
                }
                let (x, y) = report.result.get(a.name(), b.name()).unwrap();
                prop_assert_eq!(report.result.get(b.name(), a.name()), Some((y, x)));
            }
        }
    }
}
