use crate::{build_model, position_finite_differences, sez, spacecraft_seen_from, test_epoch, test_station};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use nyx::cosmic::{CentralBody, SpacePoint, DEG_PER_RAD};
use nyx::linalg::{DMatrix, Vector3};
use nyx::od::prelude::*;
use rstest::*;
use std::sync::Arc;

#[fixture]
fn cosm() -> CentralBody {
    let _ = pretty_env_logger::try_init();
    CentralBody::earth()
}

#[rstest]
fn angles_of_a_pass(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(30.0, 45.0, 1000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("OpticalAzEl", &participants);

    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    let quick = model.measurement().clone();
    assert_eq!(quick.value.len(), 2);
    assert_abs_diff_eq!(quick.value[0], 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(quick.value[1], 45.0, epsilon = 1e-9);
    assert_eq!(quick.event_count, 1);

    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let msr = model.measurement();
    println!("{msr}");
    assert!(msr.is_feasible);
    assert_eq!(msr.event_count, 1);
    assert_eq!(model.events().len(), 1);
    // The spacecraft moves by a few tens of meters during the light time.
    assert_abs_diff_eq!(msr.value[0], 30.0, epsilon = 0.05);
    assert_abs_diff_eq!(msr.value[1], 45.0, epsilon = 0.05);
    assert!(msr.value[0] != quick.value[0]);

    let light_path = model.get_event(0).unwrap();
    assert_eq!(light_path.name(), "OpticalAzEl light path");
    assert_eq!(light_path.participant_data(1).unwrap().epoch, epoch);
    assert!(light_path.participant_data(0).unwrap().epoch < epoch);
}

#[rstest]
fn azimuth_wraps_past_south(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(181.0, 30.0, 1200.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("OpticalAzEl", &participants);

    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert_abs_diff_eq!(model.measurement().value[0], -179.0, epsilon = 1e-9);
    assert_abs_diff_eq!(model.measurement().value[1], 30.0, epsilon = 1e-9);
}

#[rstest]
fn below_the_horizon(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(270.0, -5.0, 1000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("OpticalAzEl", &participants);

    assert!(!model.evaluate(epoch, false, &cosm).unwrap());
    let msr = model.measurement();
    assert!(msr.feasibility_value < 0.0);
    assert_eq!(msr.value, vec![0.0, 0.0]);
    assert_eq!(msr.event_count, 0);

    assert!(!model.evaluate(epoch, true, &cosm).unwrap());
    assert_eq!(model.measurement().unfeasible_reason, UnfeasibleReason::Blocked);
}

#[rstest]
fn observer_must_be_on_the_ground(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(30.0, 45.0, 1000.0), epoch, &cosm);
    let other = spacecraft_seen_from("GEO", &station, sez(0.0, 80.0, 36000.0), epoch, &cosm);

    let mut model = create_measurement("OpticalAzEl", "telescope").unwrap();
    for participant in [Arc::new(other) as Arc<dyn SpacePoint>, Arc::new(sc)] {
        model
            .set_ref_object(RefObject::Participant(participant))
            .unwrap();
    }
    assert!(!model.initialize().unwrap());
    assert_eq!(model.state(), ModelState::Uninitialized);
}

#[rstest]
fn angle_partials(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(30.0, 45.0, 1000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> =
        vec![Arc::new(station), Arc::new(sc.clone())];
    let mut model = build_model("OpticalAzEl", &participants);
    assert!(model.evaluate(epoch, true, &cosm).unwrap());

    let wrt = WrtObject::Participant(participants[1].clone());
    let position = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::Position)
        .unwrap();
    assert_eq!(position.shape(), (2, 3));

    let fd = position_finite_differences("OpticalAzEl", &participants, &sc, 1, epoch, &cosm, 0.1);
    println!("analytical {position}finite differences {fd}");
    assert_abs_diff_eq!(position, fd, epsilon = 1e-4);

    let state = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::CartesianState)
        .unwrap();
    assert_eq!(state.shape(), (2, 6));
    assert_eq!(state.columns(0, 3), position.columns(0, 3));

    // Velocity partials are in radians per km/s while position partials are in degrees per km.
    let velocity = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::Velocity)
        .unwrap();
    assert_eq!(state.columns(3, 3), velocity.columns(0, 3));

    assert!(matches!(
        model.calculate_measurement_derivatives(
            &WrtObject::Participant(participants[0].clone()),
            &SolveFor::Position
        ),
        Err(MeasurementError::DerivativeNotImplemented { .. })
    ));
}

#[rstest]
fn velocity_partials_stay_in_radians(cosm: CentralBody) {
    let epoch = test_epoch();
    let station: Arc<dyn SpacePoint> = Arc::new(test_station());
    let sc = spacecraft_seen_from("LEO", &test_station(), sez(30.0, 45.0, 1000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![station.clone(), Arc::new(sc.clone())];
    let mut model = build_model("OpticalAzEl", &participants);
    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let velocity = model
        .calculate_measurement_derivatives(
            &WrtObject::Participant(participants[1].clone()),
            &SolveFor::Velocity,
        )
        .unwrap();

    // Angles, in degrees, with the reference velocity of the spacecraft moved by the provided offset
    let angles = |offset_km_s: Vector3<f64>| {
        let mut reference = sc.reference();
        reference.velocity_km_s += offset_km_s;
        let moved = KeplerianSpacecraft::try_new(&sc.name, reference, sc.gm_km3_s2()).unwrap();
        let mut model = build_model("OpticalAzEl", &[station.clone(), Arc::new(moved)]);
        assert!(model.evaluate(epoch, true, &cosm).unwrap());
        model.measurement().value.clone()
    };
    let step_km_s = 0.5;
    let fd_deg = DMatrix::from_fn(2, 3, |row, axis| {
        let plus = angles(Vector3::ith(axis, step_km_s));
        let minus = angles(Vector3::ith(axis, -step_km_s));
        (plus[row] - minus[row]) / (2.0 * step_km_s)
    });
    let fd_rad = fd_deg.map(f64::to_radians);
    println!("analytical {velocity}finite differences (rad) {fd_rad}");

    // Unlike the position partials, the velocity partials are not converted to degrees.
    assert_abs_diff_eq!(velocity, fd_rad, epsilon = 1e-3 * fd_rad.amax());
    assert_relative_eq!(fd_deg.amax() / velocity.amax(), DEG_PER_RAD, max_relative = 1e-2);
}

#[rstest]
fn rotated_at_the_receive_epoch(cosm: CentralBody) {
    let epoch = test_epoch();
    let station = test_station().with_hardware(Hardware::Receiver(Receiver {
        name: "Camera".to_string(),
        delay_s: 1.0,
        center_frequency_mhz: 0.0,
        bandwidth_mhz: 0.0,
    }));
    let sc = spacecraft_seen_from("LEO", &station, sez(30.0, 45.0, 1000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> =
        vec![Arc::new(station.clone()), Arc::new(sc)];
    let mut model = build_model("OpticalAzEl", &participants);
    assert!(model.evaluate(epoch, true, &cosm).unwrap());

    let light_path = model.get_event(0).unwrap();
    let tx = light_path.participant_data(0).unwrap();
    let rx = light_path.participant_data(1).unwrap();
    assert_eq!(rx.epoch, epoch - 1.0 * Unit::Second);

    // The Earth turns by about 4 millidegrees during the receive delay.
    let sez_km = station.topocentric_dcm(rx.epoch, &cosm).unwrap() * (tx.position_km - rx.position_km);
    let azimuth = sez_km[1].atan2(-sez_km[0]).to_degrees();
    let elevation = (sez_km[2] / sez_km.norm()).asin().to_degrees();
    let msr = model.measurement();
    assert_abs_diff_eq!(msr.value[0], azimuth, epsilon = 1e-9);
    assert_abs_diff_eq!(msr.value[1], elevation, epsilon = 1e-9);
}
