use coinbank_core::error::BuildError;
use coinbank_core::mocks::{MemoryStore, RecordingDispatcher};
use coinbank_core::{AlertCfg, CoinCfg, Engine, TrackerCfg};
use rstest::rstest;

#[rstest]
fn missing_store_yields_typed_build_error() {
    let err = Engine::builder()
        .with_dispatcher(RecordingDispatcher::default())
        .try_build()
        .expect_err("should fail with MissingStore");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingStore) => {}
        other => panic!("expected MissingStore, got: {other:?}"),
    }
}

#[rstest]
fn missing_dispatcher_yields_typed_build_error() {
    let err = Engine::builder()
        .with_store(MemoryStore::default())
        .try_build()
        .expect_err("should fail with MissingDispatcher");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingDispatcher) => {}
        other => panic!("expected MissingDispatcher, got: {other:?}"),
    }
}

#[rstest]
#[case::negative_threshold(
    TrackerCfg::default(),
    AlertCfg { drop_threshold_g: -1.0, ..AlertCfg::default() },
    CoinCfg::default()
)]
#[case::nan_min_weight(
    TrackerCfg::default(),
    AlertCfg { min_weight_g: f64::NAN, ..AlertCfg::default() },
    CoinCfg::default()
)]
#[case::zero_coin_mass(
    TrackerCfg::default(),
    AlertCfg::default(),
    CoinCfg { mass_g: 0.0, ..CoinCfg::default() }
)]
#[case::negative_coin_value(
    TrackerCfg::default(),
    AlertCfg::default(),
    CoinCfg { value: -2.0, ..CoinCfg::default() }
)]
#[case::infinite_significance(
    TrackerCfg { significance_g: f64::INFINITY, ..TrackerCfg::default() },
    AlertCfg::default(),
    CoinCfg::default()
)]
#[case::negative_initial_weight(
    TrackerCfg { initial_weight_g: -0.5, ..TrackerCfg::default() },
    AlertCfg::default(),
    CoinCfg::default()
)]
fn invalid_settings_are_rejected(
    #[case] tracker: TrackerCfg,
    #[case] alert: AlertCfg,
    #[case] coin: CoinCfg,
) {
    let err = Engine::builder()
        .with_store(MemoryStore::default())
        .with_dispatcher(RecordingDispatcher::default())
        .with_tracker(tracker)
        .with_alert(alert)
        .with_coin(coin)
        .try_build()
        .expect_err("invalid settings must not build");
    assert!(
        matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ),
        "unexpected error: {err:?}"
    );
}
