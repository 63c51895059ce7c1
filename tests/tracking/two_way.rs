use crate::{
    build_model, s_band_station, s_band_transponder, sez, spacecraft_at, spacecraft_seen_from,
    test_epoch, test_station,
};
use approx::{assert_abs_diff_eq, assert_relative_eq};
use nyx::cosmic::{CentralBody, SpacePoint, SPEED_OF_LIGHT_KM_S};
use nyx::linalg::{DMatrix, Vector3};
use nyx::od::models::{RampRecord, RampTable, RefObject};
use nyx::od::msr::UnfeasibleReason;
use nyx::od::prelude::*;
use rstest::*;
use std::sync::Arc;

#[fixture]
fn cosm() -> CentralBody {
    let _ = pretty_env_logger::try_init();
    CentralBody::earth()
}

#[fixture]
fn epoch() -> Epoch {
    test_epoch()
}

#[rstest]
fn usn_ideal_pass(cosm: CentralBody, epoch: Epoch) {
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(30.0, 80.0, 600.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("USNTwoWayRange", &participants);

    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert_eq!(model.state(), ModelState::FeasibilityChecked);
    let quick = model.measurement().clone();
    assert_abs_diff_eq!(quick.value[0], 600.0, epsilon = 1e-6);
    assert!(quick.feasibility_value > 0.0);
    assert_eq!(quick.event_count, 2);

    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let msr = model.measurement();
    println!("{msr}");
    assert!(msr.is_feasible);
    assert_eq!(msr.unfeasible_reason, UnfeasibleReason::Normal);
    assert_eq!(msr.event_count, 2);
    assert_eq!(msr.participant_ids, vec!["Kourou", "LEO"]);
    assert_eq!(msr.epoch, epoch);
    // The spacecraft moves by a few meters during the round trip.
    assert_abs_diff_eq!(msr.value[0], 600.0, epsilon = 0.1);
    assert_abs_diff_eq!(msr.feasibility_value, 80.0, epsilon = 0.1);

    let downlink = model.get_event(0).unwrap();
    let uplink = model.get_event(1).unwrap();
    assert!(model.get_event(2).is_err());

    // Ideal two-way range is the mean of both legs.
    assert_abs_diff_eq!(
        msr.value[0],
        (downlink.range_km() + uplink.range_km()) / 2.0,
        epsilon = 1e-9
    );

    for event in [downlink, uplink] {
        println!("{event}");
        assert_eq!(event.status(), EventStatus::Converged);
        assert!(event.var_timestep_s() < 0.0);
        assert_abs_diff_eq!(
            -event.var_timestep_s() * SPEED_OF_LIGHT_KM_S,
            event.range_km(),
            epsilon = 1e-5
        );
    }

    // Downlink received at the epoch, uplink received when the downlink was transmitted.
    let rx_epoch = downlink.participant_data(1).unwrap().epoch;
    let turnaround = downlink.participant_data(0).unwrap().epoch;
    assert_eq!(rx_epoch, epoch);
    assert_eq!(uplink.participant_data(1).unwrap().epoch, turnaround);
    assert!(uplink.participant_data(0).unwrap().epoch < turnaround);
}

#[rstest]
fn below_horizon(cosm: CentralBody, epoch: Epoch) {
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(120.0, -30.0, 2000.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("USNTwoWayRange", &participants);

    assert!(!model.evaluate(epoch, false, &cosm).unwrap());
    let msr = model.measurement();
    assert!(!msr.is_feasible);
    assert_eq!(msr.value, vec![0.0]);
    assert_eq!(msr.event_count, 0);
    assert!(msr.feasibility_value < 0.0);

    assert!(!model.evaluate(epoch, true, &cosm).unwrap());
    let msr = model.measurement();
    assert_eq!(msr.unfeasible_reason, UnfeasibleReason::UplinkBlocked);
    assert_eq!(format!("{}", msr.unfeasible_reason), "B1");
    assert_eq!(msr.value, vec![0.0]);
    assert_eq!(msr.event_count, 0);
}

#[rstest]
fn horizon_sign_flip(cosm: CentralBody, epoch: Epoch) {
    let station = test_station();
    for (elevation_deg, visible) in [(0.01, true), (-0.01, false)] {
        let sc = spacecraft_seen_from("LEO", &station, sez(45.0, elevation_deg, 1500.0), epoch, &cosm);
        let participants: Vec<Arc<dyn SpacePoint>> =
            vec![Arc::new(station.clone()), Arc::new(sc)];
        let mut model = build_model("USNTwoWayRange", &participants);
        assert_eq!(model.evaluate(epoch, false, &cosm).unwrap(), visible);
        assert_eq!(model.measurement().feasibility_value > 0.0, visible);
    }
}

#[rstest]
fn elevation_mask(cosm: CentralBody, epoch: Epoch) {
    let station = test_station().with_elevation_mask(10.0);
    let sc = spacecraft_seen_from("LEO", &station, sez(200.0, 5.0, 2500.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("USNTwoWayRange", &participants);

    // Above the horizon, but below the mask
    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert!(!model.evaluate(epoch, true, &cosm).unwrap());
    let msr = model.measurement();
    assert_eq!(msr.unfeasible_reason, UnfeasibleReason::UplinkBlocked);
    assert_abs_diff_eq!(msr.feasibility_value, 5.0, epsilon = 0.1);
}

#[rstest]
fn space_based_observer(cosm: CentralBody, epoch: Epoch) {
    let observer = spacecraft_at("Observer", Vector3::new(7000.0, 0.0, 0.0), epoch, &cosm);
    let near = spacecraft_at("Near", Vector3::new(6900.0, 1000.0, 0.0), epoch, &cosm);
    let far = spacecraft_at("Far", Vector3::new(-7000.0, 100.0, 0.0), epoch, &cosm);

    let observer: Arc<dyn SpacePoint> = Arc::new(observer);
    let mut visible = build_model("USNTwoWayRange", &[observer.clone(), Arc::new(near)]);
    assert!(visible.evaluate(epoch, false, &cosm).unwrap());
    assert_eq!(visible.measurement().feasibility_value, 1.0);
    assert!(visible.evaluate(epoch, true, &cosm).unwrap());

    let mut hidden = build_model("USNTwoWayRange", &[observer, Arc::new(far)]);
    assert!(!hidden.evaluate(epoch, false, &cosm).unwrap());
    assert_eq!(hidden.measurement().feasibility_value, -1.0);
}

#[rstest]
fn usn_with_hardware(cosm: CentralBody, epoch: Epoch) {
    let station = s_band_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(300.0, 60.0, 700.0), epoch, &cosm)
        .with_hardware(s_band_transponder(1e-6));
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];
    let mut model = build_model("USNTwoWayRange", &participants);

    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let downlink = model.get_event(0).unwrap();
    let uplink = model.get_event(1).unwrap();

    // The receiver delay shifts the downlink reception, the transponder delay separates both legs.
    assert_eq!(downlink.fixed_timestep(), -2.0 * Unit::Microsecond);
    assert_eq!(
        uplink.participant_data(1).unwrap().epoch,
        downlink.participant_data(0).unwrap().epoch - 1.0 * Unit::Microsecond
    );

    let expected =
        (downlink.range_km() + uplink.range_km() + 1e-6 * SPEED_OF_LIGHT_KM_S) / 2.0;
    assert_abs_diff_eq!(model.measurement().value[0], expected, epsilon = 1e-9);
    assert_eq!(model.measurement().uplink_frequency_hz, 2067.5e6);
}

#[rstest]
fn hardware_errors(cosm: CentralBody, epoch: Epoch) {
    let sc = spacecraft_seen_from("LEO", &test_station(), sez(0.0, 60.0, 700.0), epoch, &cosm)
        .with_hardware(s_band_transponder(1e-6));

    // Transmitter without receiver
    let mut tx_only = test_station();
    tx_only.hardware = s_band_station().hardware[..1].to_vec();
    let mut model = create_measurement("USNTwoWayRange", "usn").unwrap();
    model
        .set_ref_object(RefObject::Participant(Arc::new(tx_only)))
        .unwrap();
    model
        .set_ref_object(RefObject::Participant(Arc::new(sc.clone())))
        .unwrap();
    assert!(matches!(
        model.initialize(),
        Err(MeasurementError::MissingHardware { device: "receiver", .. })
    ));
    assert_eq!(model.state(), ModelState::Uninitialized);

    // Transponder tuned away from the uplink frequency
    let mut detuned = sc;
    detuned.hardware = vec![Hardware::Transponder(Transponder {
        name: "Xpdr".to_string(),
        delay_s: 0.0,
        input_center_frequency_mhz: 2100.0,
        input_bandwidth_mhz: 2.0,
        turn_around_ratio: "240/221".to_string(),
    })];
    let participants: Vec<Arc<dyn SpacePoint>> =
        vec![Arc::new(s_band_station()), Arc::new(detuned)];
    let mut model = build_model("USNTwoWayRange", &participants);
    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert!(matches!(
        model.evaluate(epoch, true, &cosm),
        Err(MeasurementError::HardwareInfeasible {
            device: "transponder",
            ..
        })
    ));
}

#[rstest]
fn lifecycle(cosm: CentralBody, epoch: Epoch) {
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(0.0, 60.0, 700.0), epoch, &cosm);
    let station: Arc<dyn SpacePoint> = Arc::new(station);
    let sc: Arc<dyn SpacePoint> = Arc::new(sc);

    let mut model = create_measurement("USNTwoWayRange", "usn").unwrap();
    assert!(matches!(
        model.evaluate(epoch, false, &cosm),
        Err(MeasurementError::InvalidLifecycle { .. })
    ));

    model
        .set_ref_object(RefObject::Participant(station.clone()))
        .unwrap();
    // Missing spacecraft
    assert_eq!(model.initialize(), Ok(false));
    // Ramp tables only apply to DSN ranges
    assert!(model
        .set_ref_object(RefObject::RampTable(RampTable::default()))
        .is_err());

    model.set_ref_object(RefObject::Participant(sc.clone())).unwrap();
    assert_eq!(model.initialize(), Ok(true));
    assert_eq!(model.state(), ModelState::Initialized);

    // The spacecraft cannot be tracked from itself, and optical observers must be on the ground.
    let mut twice = create_measurement("USNTwoWayRange", "twice").unwrap();
    for p in [sc.clone(), sc.clone()] {
        twice.set_ref_object(RefObject::Participant(p)).unwrap();
    }
    assert_eq!(twice.initialize(), Ok(false));

    let other = spacecraft_at("Other", nyx::linalg::Vector3::new(0.0, 7000.0, 0.0), epoch, &cosm);
    let mut optical = create_measurement("OpticalAzEl", "optical").unwrap();
    for p in [Arc::new(other) as Arc<dyn SpacePoint>, sc] {
        optical.set_ref_object(RefObject::Participant(p)).unwrap();
    }
    assert_eq!(optical.initialize(), Ok(false));
}

#[rstest]
fn dsn_with_hardware(cosm: CentralBody, epoch: Epoch) {
    let station = s_band_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(100.0, 50.0, 900.0), epoch, &cosm)
        .with_hardware(s_band_transponder(1e-6));
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];

    let mut model = build_model("DSNTwoWayRange", &participants);
    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert_abs_diff_eq!(model.measurement().value[0], 1800.0, epsilon = 1e-6);

    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let downlink = model.get_event(0).unwrap();
    let uplink = model.get_event(1).unwrap();
    let travel_s = (downlink.range_km() + uplink.range_km()) / SPEED_OF_LIGHT_KM_S + 4e-6;
    let expected = travel_s * 2067.5e6 / 2.0;

    let msr = model.measurement().clone();
    assert_relative_eq!(msr.value[0], expected, max_relative = 1e-12);
    assert_eq!(msr.uplink_band, 1);
    assert_eq!(msr.uplink_frequency_hz, 2067.5e6);
    assert_eq!(msr.msr_type.unit(), "RU");

    let mut modulo = create_measurement("DSNTwoWayRange", "dsn").unwrap();
    for p in &participants {
        modulo.set_ref_object(RefObject::Participant(p.clone())).unwrap();
    }
    modulo.set_range_modulo(1.0e6).unwrap();
    assert!(modulo.set_range_modulo(0.0).is_err());
    assert!(modulo.initialize().unwrap());
    assert!(modulo.evaluate(epoch, true, &cosm).unwrap());
    assert_relative_eq!(
        modulo.measurement().value[0],
        expected.rem_euclid(1.0e6),
        max_relative = 1e-6
    );
    assert_eq!(modulo.measurement().range_modulo, 1.0e6);
}

#[rstest]
fn dsn_ramp_table(cosm: CentralBody, epoch: Epoch) {
    let station = test_station();
    let sc = spacecraft_seen_from("LEO", &station, sez(10.0, 70.0, 800.0), epoch, &cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![Arc::new(station), Arc::new(sc)];

    // Neither a transmitter nor a ramp table: the uplink frequency is unknown.
    let mut model = create_measurement("DSNTwoWayRange", "dsn").unwrap();
    for p in &participants {
        model.set_ref_object(RefObject::Participant(p.clone())).unwrap();
    }
    assert!(matches!(
        model.initialize(),
        Err(MeasurementError::InvalidSetting { .. })
    ));

    let records = [-60.0, 60.0]
        .iter()
        .map(|offset_s| RampRecord {
            epoch: epoch + *offset_s * Unit::Second,
            uplink_band: 2,
            ramp_type: 1,
            ramp_frequency_hz: 7.15e9,
            ramp_rate_hz_s: 0.0,
        })
        .collect::<Vec<_>>();
    model
        .set_ref_object(RefObject::RampTable(RampTable::new(records.clone())))
        .unwrap();
    assert!(model.initialize().unwrap());
    assert!(model.evaluate(epoch, true, &cosm).unwrap());

    let travel_s = (model.get_event(0).unwrap().range_km() + model.get_event(1).unwrap().range_km())
        / SPEED_OF_LIGHT_KM_S;
    assert_relative_eq!(
        model.measurement().value[0],
        travel_s * 7.15e9 * 221.0 / 1498.0,
        max_relative = 1e-9
    );
    assert_eq!(model.measurement().uplink_band, 2);
    let wrt = WrtObject::Participant(participants[1].clone());
    let partials = model
        .calculate_measurement_derivatives(&wrt, &SolveFor::Position)
        .unwrap();
    assert!(partials.amax() > 0.0);

    // Outside of the ramp table
    assert!(!model
        .evaluate(epoch + 61.0 * Unit::Second, true, &cosm)
        .unwrap());
    assert_eq!(
        model.measurement().unfeasible_reason,
        UnfeasibleReason::RampTable
    );
    assert_eq!(format!("{}", model.measurement().unfeasible_reason), "R");
    // No uplink frequency, hence no range unit conversion from the previous pass
    assert_eq!(
        model
            .calculate_measurement_derivatives(&wrt, &SolveFor::Position)
            .unwrap(),
        DMatrix::zeros(1, 3)
    );
}

#[rstest]
fn dsn_uplink_band_checked_at_initialization(cosm: CentralBody, epoch: Epoch) {
    // C band transmitter with a matching transponder
    let mut station = test_station();
    station.hardware = s_band_station().hardware;
    if let Hardware::Transmitter(tx) = &mut station.hardware[0] {
        tx.frequency_mhz = 5000.0;
    }
    let sc = spacecraft_seen_from("LEO", &station, sez(100.0, 50.0, 900.0), epoch, &cosm)
        .with_hardware(Hardware::Transponder(Transponder {
            name: "Xpdr".to_string(),
            delay_s: 0.0,
            input_center_frequency_mhz: 5000.0,
            input_bandwidth_mhz: 2.0,
            turn_around_ratio: "240/221".to_string(),
        }));

    let mut model = create_measurement("DSNTwoWayRange", "dsn").unwrap();
    for p in [Arc::new(station) as Arc<dyn SpacePoint>, Arc::new(sc)] {
        model.set_ref_object(RefObject::Participant(p)).unwrap();
    }
    assert!(matches!(
        model.initialize(),
        Err(MeasurementError::UnknownFrequencyBand { frequency_hz }) if frequency_hz == 5.0e9
    ));
    assert_eq!(model.state(), ModelState::Uninitialized);

    // A ramp table defines the uplink instead, but only in the S and X bands.
    let record = |offset_s: f64, uplink_band: u8| RampRecord {
        epoch: epoch + offset_s * Unit::Second,
        uplink_band,
        ramp_type: 1,
        ramp_frequency_hz: 2.1e9,
        ramp_rate_hz_s: 0.0,
    };
    model
        .set_ref_object(RefObject::RampTable(RampTable::new(vec![
            record(-60.0, 1),
            record(60.0, 4),
        ])))
        .unwrap();
    assert!(matches!(
        model.initialize(),
        Err(MeasurementError::UnknownFrequencyBand { .. })
    ));
    model
        .set_ref_object(RefObject::RampTable(RampTable::new(vec![
            record(-60.0, 1),
            record(60.0, 1),
        ])))
        .unwrap();
    assert_eq!(model.initialize(), Ok(true));
}
