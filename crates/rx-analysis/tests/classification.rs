//! Classifier behaviour on synthetic simulation and data samples.

use std::collections::HashSet;
use std::sync::Arc;

use approx::assert_relative_eq;
use rx_analysis::classifier::{
    CHANNEL_RULES, Classifier, MuonCcFiducialDecaySignal, StrangeChannelSignal, TruthSummary,
    classify,
};
use rx_analysis::columns::*;
use rx_analysis::entry::EntryInfo;
use rx_analysis::testing::{McEvent, data_events, mc_events};
use rx_core::{Channel, Error, Exposure, Source};
use rx_frame::{ColumnSet, Frame};

fn mc_info() -> EntryInfo {
    EntryInfo::standalone(Source::MC, Exposure::pot(1.0e20, 4.0e20))
}

#[test]
fn classification_is_total_and_reaches_every_simulation_channel() {
    let mut reached = HashSet::new();
    for in_fiducial in [false, true] {
        for nu_pdg in [0, 12, -12, 14, -14, 16] {
            for ccnc in [0, 1, 2] {
                for n_strange in 0..3 {
                    for n_pi_charged in 0..3 {
                        for n_pi0 in 0..2 {
                            for n_gamma in 0..3 {
                                for n_proton in 0..2 {
                                    let t = TruthSummary {
                                        in_fiducial,
                                        nu_pdg,
                                        ccnc,
                                        n_strange,
                                        n_pi_charged,
                                        n_pi0,
                                        n_gamma,
                                        n_proton,
                                    };
                                    let ch = classify(&t);
                                    assert!(Channel::ALL.contains(&ch));
                                    reached.insert(ch);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    let expected: HashSet<Channel> =
        Channel::ALL.into_iter().filter(|&c| c != Channel::DataInclusive).collect();
    assert_eq!(reached, expected);
    assert_eq!(CHANNEL_RULES.len() + 1, expected.len());
}

#[test]
fn derived_columns_for_simulation() {
    let events = vec![
        McEvent::new(1, 1, 1).weight(2.0),
        McEvent::new(1, 1, 2).lambdas(1),
        McEvent::new(1, 1, 3).lambdas(2).truth_vertex(400.0, 0.0, 500.0),
        McEvent::new(1, 1, 4).lambdas(2).truth_vertex(400.0, 0.0, 500.0).neutrino(0, 0),
        McEvent::new(1, 1, 5).weight(-3.0),
        McEvent::new(1, 1, 6).weight(f64::NAN),
        McEvent::new(1, 1, 7).neutrino(14, 1),
        McEvent { int_mode: 7, ..McEvent::new(1, 1, 8) },
    ];
    let classifier = Classifier::new(Arc::new(StrangeChannelSignal));
    let f = classifier.run(&Frame::new(mc_events(&events).unwrap()), &mc_info()).unwrap();

    let w = f.take_f64(W_NOMINAL).unwrap();
    assert_relative_eq!(w[0], 0.5);
    assert_relative_eq!(w[1], 0.25);
    assert_eq!(w[4], 0.0);
    assert_eq!(w[5], 0.0);
    assert!(w.iter().all(|w| w.is_finite() && *w >= 0.0));

    let channels: Vec<Channel> =
        f.take_i64(ANALYSIS_CHANNELS).unwrap().into_iter().map(Channel::from_code).collect();
    assert_eq!(
        channels,
        vec![
            Channel::MuonCC0PiGe1P,
            Channel::SingleStrange,
            Channel::External,
            Channel::OutOfFiducial,
            Channel::MuonCC0PiGe1P,
            Channel::MuonCC0PiGe1P,
            Channel::NeutralCurrent,
            Channel::MuonCC0PiGe1P,
        ]
    );
    assert_eq!(
        f.take_bool(IS_SIGNAL).unwrap(),
        vec![false, true, false, false, false, false, false, false]
    );
    assert_eq!(f.take_i64(COUNT_STRANGE).unwrap()[2], 2);
    assert_eq!(f.take_i64(SCATTERING_MODE).unwrap()[7], -1);
    assert_eq!(f.take_i64(SCATTERING_MODE).unwrap()[0], 0);
    assert!(f.take_bool(IN_RECO_FIDUCIAL).unwrap().iter().all(|&b| b));
}

#[test]
fn recognition_needs_purity_and_completeness() {
    let events = vec![
        McEvent::new(1, 1, 1).lambdas(1),
        McEvent { purity: 0.4, ..McEvent::new(1, 1, 2).lambdas(1) },
        McEvent { completeness: 0.1, ..McEvent::new(1, 1, 3).lambdas(1) },
        McEvent::new(1, 1, 4),
    ];
    let classifier = Classifier::new(Arc::new(StrangeChannelSignal));
    let f = classifier.run(&Frame::new(mc_events(&events).unwrap()), &mc_info()).unwrap();
    assert_eq!(f.take_bool(RECOGNISED_SIGNAL).unwrap(), vec![true, false, false, false]);
}

#[test]
fn lambda_decay_signal_definition() {
    let events = vec![
        McEvent { lambda_decay_in_fid: vec![0.0, 1.0], ..McEvent::new(1, 1, 1) },
        McEvent { lambda_decay_in_fid: vec![0.0], ..McEvent::new(1, 1, 2) },
        McEvent { lambda_decay_in_fid: vec![1.0], is_nu_mu_cc: false, ..McEvent::new(1, 1, 3) },
        McEvent::new(1, 1, 4),
    ];
    let classifier = Classifier::new(Arc::new(MuonCcFiducialDecaySignal));
    let f = classifier.run(&Frame::new(mc_events(&events).unwrap()), &mc_info()).unwrap();
    assert_eq!(f.take_bool(IS_SIGNAL).unwrap(), vec![true, false, false, false]);
}

#[test]
fn data_and_ext_get_placeholders() {
    let classifier = Classifier::new(Arc::new(StrangeChannelSignal));
    let cols = data_events(&[(1, 1, 1), (1, 1, 2)]).unwrap();

    let ext = EntryInfo::standalone(Source::Ext, Exposure::triggers(300.0, 100.0));
    let f = classifier.run(&Frame::new(cols.clone()), &ext).unwrap();
    assert_eq!(f.take_f64(W_NOMINAL).unwrap(), vec![3.0, 3.0]);
    assert_eq!(f.take_i64(ANALYSIS_CHANNELS).unwrap(), vec![1, 1]);
    assert_eq!(f.take_i64(SCATTERING_MODE).unwrap(), vec![-1, -1]);
    assert!(!f.take_bool(IS_SIGNAL).unwrap().iter().any(|&b| b));
    assert!(!f.take_bool(IN_FIDUCIAL).unwrap().iter().any(|&b| b));

    let data = EntryInfo::standalone(Source::Data, Exposure::default());
    let f = classifier.run(&Frame::new(cols), &data).unwrap();
    assert_eq!(f.take_f64(W_NOMINAL).unwrap(), vec![1.0, 1.0]);
    assert_eq!(f.take_i64(ANALYSIS_CHANNELS).unwrap(), vec![0, 0]);
    assert_eq!(f.take_bool(RECOGNISED_SIGNAL).unwrap(), vec![false, false]);
}

#[test]
fn missing_column_fails_before_evaluation() {
    let cols = mc_events(&[McEvent::new(1, 1, 1)]).unwrap();
    let mut stripped = ColumnSet::new();
    for name in cols.names() {
        if name != WEIGHT_TUNE {
            stripped.push(name.clone(), cols.column(name).unwrap().clone()).unwrap();
        }
    }

    let mut info = mc_info();
    info.beamline = "numi_fhc".into();
    info.period = "run1".into();
    let classifier = Classifier::new(Arc::new(StrangeChannelSignal));
    match classifier.run(&Frame::new(stripped), &info) {
        Err(Error::Schema(msg)) => {
            assert!(msg.contains(WEIGHT_TUNE), "{msg}");
            assert!(msg.contains("numi_fhc/run1/sample#0"), "{msg}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn signal_inputs_are_checked_up_front() {
    let cols = mc_events(&[McEvent::new(1, 1, 1)]).unwrap();
    let mut stripped = ColumnSet::new();
    for name in cols.names() {
        if name != "lambda_decay_in_fid" {
            stripped.push(name.clone(), cols.column(name).unwrap().clone()).unwrap();
        }
    }
    let classifier = Classifier::new(Arc::new(MuonCcFiducialDecaySignal));
    let err = classifier.run(&Frame::new(stripped), &mc_info()).unwrap_err();
    assert!(matches!(err, Error::Schema(m) if m.contains("lambda_decay_in_fid")));
}
