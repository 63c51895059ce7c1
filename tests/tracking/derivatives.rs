use crate::{
    build_model, position_finite_differences, s_band_station, s_band_transponder, sez,
    spacecraft_seen_from, test_epoch, test_station,
};
use approx::assert_abs_diff_eq;
use nyx::cosmic::{CentralBody, SpacePoint, SPEED_OF_LIGHT_KM_S};
use nyx::linalg::DMatrix;
use nyx::od::prelude::*;
use rstest::*;
use std::sync::Arc;

#[fixture]
fn cosm() -> CentralBody {
    let _ = pretty_env_logger::try_init();
    CentralBody::earth()
}

fn two_way(type_name: &str, cosm: &CentralBody) -> (MeasurementModel, Vec<Arc<dyn SpacePoint>>) {
    let epoch = test_epoch();
    let station = s_band_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(210.0, 55.0, 800.0), epoch, cosm)
        .with_hardware(s_band_transponder(1e-6));
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let model = build_model(type_name, &participants);
    (model, participants)
}

#[rstest]
fn requires_solved_events(cosm: CentralBody) {
    let (mut model, participants) = two_way("USNTwoWayRange", &cosm);
    let wrt = WrtObject::Participant(participants[1].clone());

    assert!(matches!(
        model.calculate_measurement_derivatives(&wrt, &SolveFor::Position),
        Err(MeasurementError::InvalidLifecycle { .. })
    ));
    assert!(model.evaluate(test_epoch(), false, &cosm).unwrap());
    assert!(matches!(
        model.calculate_measurement_derivatives(&wrt, &SolveFor::Position),
        Err(MeasurementError::InvalidLifecycle { .. })
    ));
    assert!(model.evaluate(test_epoch(), true, &cosm).unwrap());
    assert!(model
        .calculate_measurement_derivatives(&wrt, &SolveFor::Position)
        .is_ok());
}

#[rstest]
fn dispatch(cosm: CentralBody) {
    let (mut model, participants) = two_way("USNTwoWayRange", &cosm);
    assert!(model.evaluate(test_epoch(), true, &cosm).unwrap());
    let sc = WrtObject::Participant(participants[1].clone());

    for (param, columns) in [
        (SolveFor::Position, 3),
        (SolveFor::Velocity, 3),
        (SolveFor::CartesianState, 6),
        (SolveFor::Bias, 1),
    ] {
        let partials = model.calculate_measurement_derivatives(&sc, &param).unwrap();
        assert_eq!(partials.shape(), (1, columns), "{param}");
    }

    // The model itself and its bias
    let own = WrtObject::Model(model.unique_id());
    for param in [SolveFor::Bias, SolveFor::Position] {
        let partials = model.calculate_measurement_derivatives(&own, &param).unwrap();
        assert_eq!(partials, DMatrix::from_element(1, param.cardinality(), 1.0));
    }
    let bias = model.calculate_measurement_derivatives(&sc, &SolveFor::Bias).unwrap();
    assert_eq!(bias, DMatrix::from_element(1, 1, 1.0));

    // Another model, or a parameter the range does not depend on
    let (other, _) = two_way("USNTwoWayRange", &cosm);
    assert_ne!(other.unique_id(), model.unique_id());
    let partials = model
        .calculate_measurement_derivatives(&WrtObject::Model(other.unique_id()), &SolveFor::Bias)
        .unwrap();
    assert_eq!(partials, DMatrix::zeros(1, 1));
    let cr = SolveFor::Other {
        name: "Cr".to_string(),
        size: 1,
    };
    let partials = model.calculate_measurement_derivatives(&sc, &cr).unwrap();
    assert_eq!(partials, DMatrix::zeros(1, 1));

    // The station is not estimated
    assert!(matches!(
        model.calculate_measurement_derivatives(
            &WrtObject::Participant(participants[0].clone()),
            &SolveFor::Position
        ),
        Err(MeasurementError::DerivativeNotImplemented { .. })
    ));

    // A participant of another measurement
    let stranger = spacecraft_seen_from(
        "Stranger",
        &test_station(),
        sez(0.0, 45.0, 900.0),
        test_epoch(),
        &cosm,
    );
    assert!(matches!(
        model.calculate_measurement_derivatives(
            &WrtObject::Participant(Arc::new(stranger)),
            &SolveFor::Position
        ),
        Err(MeasurementError::UnknownDerivativeObject { .. })
    ));
}

#[rstest]
fn usn_range_partials(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(210.0, 55.0, 800.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc.clone())];
    let mut model = build_model("USNTwoWayRange", &participants);
    assert!(model.evaluate(epoch, true, &cosm).unwrap());

    let wrt = WrtObject::Participant(participants[1].clone());
    let position = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::Position)
        .unwrap();
    let fd = position_finite_differences("USNTwoWayRange", &participants, &sc, 1, epoch, &cosm, 0.1);
    println!("analytical {position}finite differences {fd}");
    assert_abs_diff_eq!(position, fd, epsilon = 1e-3);
    // Close to the line of sight unit vector.
    assert_abs_diff_eq!(position.norm(), 1.0, epsilon = 1e-3);

    let state = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::CartesianState)
        .unwrap();
    assert_eq!(state.columns(0, 3), position.columns(0, 3));
    // The velocity only matters through the few milliseconds of light time.
    assert!(state.columns(3, 3).norm() < 1e-2);
}

#[rstest]
fn dsn_partials_in_range_units(cosm: CentralBody) {
    let epoch = test_epoch();
    let (mut usn, participants) = two_way("USNTwoWayRange", &cosm);
    let mut dsn = build_model("DSNTwoWayRange", &participants);
    assert!(usn.evaluate(epoch, true, &cosm).unwrap());
    assert!(dsn.evaluate(epoch, true, &cosm).unwrap());

    let wrt = WrtObject::Participant(participants[1].clone());
    let usn_partials = usn
        .calculate_measurement_derivatives(&wrt, &SolveFor::CartesianState)
        .unwrap();
    let dsn_partials = dsn
        .calculate_measurement_derivatives(&wrt, &SolveFor::CartesianState)
        .unwrap();

    let (factor, band) = frequency_factor(2067.5e6, None).unwrap();
    assert_eq!(band, 1);
    let expected = usn_partials * (2.0 * factor / SPEED_OF_LIGHT_KM_S);
    assert_abs_diff_eq!(dsn_partials, expected, epsilon = 1e-6 * expected.norm());
}

#[rstest]
fn refused_after_failed_evaluation(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = s_band_station();
    // Tuned away from the 2067.5 MHz uplink
    let sc = spacecraft_seen_from("LEO", &station, sez(210.0, 55.0, 800.0), epoch, &cosm)
        .with_hardware(Hardware::Transponder(Transponder {
            name: "Xpdr".to_string(),
            delay_s: 0.0,
            input_center_frequency_mhz: 2100.0,
            input_bandwidth_mhz: 2.0,
            turn_around_ratio: "240/221".to_string(),
        }));
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("USNTwoWayRange", &participants);
    let wrt = WrtObject::Participant(participants[1].clone());

    // Half an orbit later, the spacecraft is on the other side of the Earth.
    assert!(!model.evaluate(epoch + 50.0 * Unit::Minute, true, &cosm).unwrap());
    assert_eq!(model.state(), ModelState::EventsSolved);

    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert!(model.measurement().is_feasible);

    assert!(matches!(
        model.evaluate(epoch, true, &cosm),
        Err(MeasurementError::HardwareInfeasible { .. })
    ));
    assert_eq!(model.state(), ModelState::Initialized);
    let msr = model.measurement();
    assert!(!msr.is_feasible);
    assert_eq!(msr.value, vec![0.0]);
    assert_eq!(msr.epoch, epoch);
    assert!(matches!(
        model.calculate_measurement_derivatives(&wrt, &SolveFor::Position),
        Err(MeasurementError::InvalidLifecycle { .. })
    ));

    // The model may still be evaluated afterwards.
    assert!(model.evaluate(epoch, false, &cosm).unwrap());
}
