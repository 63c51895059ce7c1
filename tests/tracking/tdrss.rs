use crate::{build_model, position_finite_differences, sez, spacecraft_at, spacecraft_seen_from, test_epoch, test_station};
use approx::assert_abs_diff_eq;
use nyx::cosmic::{CentralBody, KeplerianSpacecraft, SpacePoint, SPEED_OF_LIGHT_KM_S};
use nyx::od::prelude::*;
use rstest::*;
use std::sync::Arc;

#[fixture]
fn cosm() -> CentralBody {
    let _ = pretty_env_logger::try_init();
    CentralBody::earth()
}

fn transponder(name: &str, delay_s: f64) -> Hardware {
    Hardware::Transponder(Transponder {
        name: name.to_string(),
        delay_s,
        input_center_frequency_mhz: 2106.4,
        input_bandwidth_mhz: 5.0,
        turn_around_ratio: "240/221".to_string(),
    })
}

/// Station, relay in view above the station, and a low orbiting target below the relay.
fn relay_setup(cosm: &CentralBody) -> (GroundStation, KeplerianSpacecraft, KeplerianSpacecraft) {
    let epoch = test_epoch();
    let station = test_station().with_hardware(Hardware::Receiver(Receiver {
        name: "Rx".to_string(),
        delay_s: 1e-6,
        center_frequency_mhz: 2287.5,
        bandwidth_mhz: 10.0,
    }));
    let relay = spacecraft_seen_from("TDRS", &station, sez(0.0, 90.0, 35_786.0), epoch, cosm)
        .with_hardware(transponder("Forward", 3e-6))
        .with_hardware(transponder("Return", 4e-6));
    let target = spacecraft_seen_from("LEO", &station, sez(90.0, 60.0, 900.0), epoch, cosm)
        .with_hardware(transponder("Xpdr", 2e-6));
    (station, relay, target)
}

#[rstest]
fn relayed_round_trip(cosm: CentralBody) {
    let epoch = test_epoch();
    let (station, relay, target) = relay_setup(&cosm);
    let participants: Vec<Arc<dyn SpacePoint>> =
        vec![Arc::new(station), Arc::new(relay), Arc::new(target)];
    let mut model = build_model("TDRSSTwoWayRange", &participants);

    assert!(model.evaluate(epoch, false, &cosm).unwrap());
    assert_abs_diff_eq!(model.measurement().value[0], 35_786.0, epsilon = 1e-6);
    assert_eq!(model.measurement().event_count, 4);

    assert!(model.evaluate(epoch, true, &cosm).unwrap());
    let events = model.events();
    let names: Vec<_> = events.iter().map(|e| e.name().to_string()).collect();
    assert_eq!(
        names,
        vec![
            "TDRSSTwoWayRange downlink",
            "TDRSSTwoWayRange backlink",
            "TDRSSTwoWayRange forwardlink",
            "TDRSSTwoWayRange uplink"
        ]
    );
    for event in events {
        assert_eq!(event.status(), EventStatus::Converged);
    }

    let rx = |i: usize| events[i].participant_data(1).unwrap().epoch;
    let tx = |i: usize| events[i].participant_data(0).unwrap().epoch;
    assert_eq!(events[0].fixed_timestep(), -1.0 * Unit::Microsecond);
    assert_eq!(rx(0), epoch - 1.0 * Unit::Microsecond);
    // Return transponder of the relay, then the target transponder, then the forward transponder of the relay.
    assert_eq!(rx(1), tx(0) - 4.0 * Unit::Microsecond);
    assert_eq!(rx(2), tx(1) - 2.0 * Unit::Microsecond);
    assert_eq!(rx(3), tx(2) - 3.0 * Unit::Microsecond);

    let total_km: f64 = events.iter().map(|e| e.range_km()).sum();
    let msr = model.measurement();
    assert!(msr.is_feasible);
    assert_eq!(msr.event_count, 4);
    assert_abs_diff_eq!(
        msr.value[0],
        (total_km + 2e-6 * SPEED_OF_LIGHT_KM_S) / 2.0,
        epsilon = 1e-8
    );
    // Roughly twice the relay altitude plus twice its distance to the target.
    assert!(msr.value[0] > 2.0 * 35_000.0);
}

#[rstest]
fn target_hidden_by_earth(cosm: CentralBody) {
    let epoch = test_epoch();
    let (station, relay, _) = relay_setup(&cosm);
    let below = -station.state(epoch, &cosm).unwrap().position_km.normalize() * 7000.0;
    let hidden = spacecraft_at("Hidden", below, epoch, &cosm);

    let participants: Vec<Arc<dyn SpacePoint>> =
        vec![Arc::new(station), Arc::new(relay), Arc::new(hidden)];
    let mut model = build_model("TDRSSTwoWayRange", &participants);
    assert!(!model.evaluate(epoch, false, &cosm).unwrap());
    assert!(model.measurement().feasibility_value > 0.0);
    assert_eq!(model.measurement().event_count, 0);

    assert!(!model.evaluate(epoch, true, &cosm).unwrap());
    assert_eq!(model.measurement().unfeasible_reason, UnfeasibleReason::Blocked);
}

#[rstest]
fn target_partials(cosm: CentralBody) {
    let epoch = test_epoch();
    let (station, relay, target) = relay_setup(&cosm);
    let participants: Vec<Arc<dyn SpacePoint>> = vec![
        Arc::new(station),
        Arc::new(relay),
        Arc::new(target.clone()),
    ];
    let mut model = build_model("TDRSSTwoWayRange", &participants);
    assert!(model.evaluate(epoch, true, &cosm).unwrap());

    let partials = model
        .calculate_measurement_derivatives(
            &WrtObject::Participant(participants[2].clone()),
            &SolveFor::Position,
        )
        .unwrap();
    assert_eq!(partials.shape(), (1, 3));

    let fd = position_finite_differences(
        "TDRSSTwoWayRange",
        &participants,
        &target,
        2,
        epoch,
        &cosm,
        0.1,
    );
    println!("analytical {partials}finite differences {fd}");
    assert_abs_diff_eq!(partials, fd, epsilon = 1e-3);

    for relay_or_station in &participants[..2] {
        assert!(matches!(
            model.calculate_measurement_derivatives(
                &WrtObject::Participant(relay_or_station.clone()),
                &SolveFor::CartesianState,
            ),
            Err(MeasurementError::DerivativeNotImplemented { .. })
        ));
    }
    // The bias of the relayed range does not depend on the geometry.
    let bias = model
        .calculate_measurement_derivatives(
            &WrtObject::Participant(participants[1].clone()),
            &SolveFor::Bias,
        )
        .unwrap();
    assert_eq!(bias.shape(), (1, 1));
    assert_eq!(bias[(0, 0)], 1.0);
}
