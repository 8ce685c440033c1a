// Intentflow: Intent Compilation and Flow Batch Execution
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Test the intent compilers

use super::{get_test_topo, sp, S1, S2, S3, S4, S5};
use crate::example_topologies::{ExampleTopology, LineTopology};
use crate::flow::{Flow, FlowError};
use crate::id::{IdGenerators, IntentId};
use crate::intent::{
    CompilerRegistry, FailureKind, Intent, IntentCompiler, IntentError, IntentKind,
    MultiPointToSinglePointIntent, PathIntent, PathIntentCompiler, PointToPointIntent,
    PointToPointIntentCompiler, ShortestPathIntent, SinglePointToMultiPointIntent,
};
use crate::matchaction::{Action, Match, MatchActionOperations, OpticalMatch, Operator, PacketMatch};
use crate::path::BandwidthLedger;
use crate::topology::{LinkTuple, PortNumber, SwitchPort, TopologySnapshot};
use maplit::btreeset;
use std::collections::HashSet;
use std::sync::Arc;

fn out(port: u32) -> Action {
    Action::Output(port.into())
}

fn wildcard() -> Match {
    Match::Packet(PacketMatch::wildcard())
}

fn registry(ids: &IdGenerators, ledger: Arc<BandwidthLedger>) -> CompilerRegistry {
    CompilerRegistry::with_default_compilers(ids.clone(), ledger)
}

fn p2p(id: u64, ingress: SwitchPort, egress: SwitchPort, bandwidth: Option<f64>) -> Intent {
    PointToPointIntent {
        id: IntentId(id),
        matching: wildcard(),
        actions: vec![],
        ingress_port: ingress,
        egress_port: egress,
        bandwidth,
    }
    .into()
}

fn entries(phase: &MatchActionOperations) -> HashSet<(SwitchPort, Vec<Action>)> {
    phase.entries().iter().map(|e| (e.target.switch_port(), e.target.actions().to_vec())).collect()
}

fn compile_one(registry: &CompilerRegistry, intent: &Intent, topo: &TopologySnapshot) -> Flow {
    let mut installables = registry.compile(intent, topo).unwrap();
    assert_eq!(installables.len(), 1);
    let installable = installables.pop().unwrap();
    assert_eq!(installable.parent, intent.id());
    assert_eq!(installable.bandwidth, intent.bandwidth());
    installable.flow
}

#[test]
fn test_point_to_point_line() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));

    let flow = compile_one(&reg, &p2p(1, sp(1, 1), sp(3, 1), None), &topo);
    let path_flow = match &flow {
        Flow::PacketPath(f) => f,
        f => panic!("unexpected flow: {:?}", f),
    };
    assert_eq!(
        path_flow.path().links(),
        &[LinkTuple::new(sp(1, 10), sp(2, 10)), LinkTuple::new(sp(2, 11), sp(3, 10))]
    );
    assert_eq!(path_flow.egress_actions(), &[out(1)]);
    assert_eq!(path_flow.ingress_port(), PortNumber(1));

    let phases = flow.compile(Operator::Add, &ids).unwrap();
    assert_eq!(phases.len(), 2);
    let expected: HashSet<_> =
        vec![(sp(2, 10), vec![out(11)]), (sp(3, 10), vec![out(1)])].into_iter().collect();
    assert_eq!(entries(&phases[0]), expected);
    assert_eq!(entries(&phases[1]), vec![(sp(1, 1), vec![out(10)])].into_iter().collect());
}

#[test]
fn test_point_to_point_actions_before_output() {
    let topo = LineTopology::topology(2, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent: Intent = PointToPointIntent {
        id: IntentId(1),
        matching: wildcard(),
        actions: vec![Action::ModifyDstMac(0x02.into())],
        ingress_port: sp(1, 1),
        egress_port: sp(2, 3),
        bandwidth: None,
    }
    .into();
    match compile_one(&reg, &intent, &topo) {
        Flow::PacketPath(f) => {
            assert_eq!(f.egress_actions(), &[Action::ModifyDstMac(0x02.into()), out(3)])
        }
        f => panic!("unexpected flow: {:?}", f),
    }
}

#[test]
fn test_point_to_point_bandwidth() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let ledger = Arc::new(BandwidthLedger::new());
    let reg = registry(&ids, ledger.clone());

    let result = reg.compile(&p2p(1, sp(1, 1), sp(3, 1), Some(15.0)), &topo);
    match result {
        Err(e) => assert_eq!(e.failure_kind(), FailureKind::PathNotFound),
        Ok(_) => panic!("path found above the capacity"),
    }
    assert!(reg.compile(&p2p(2, sp(1, 1), sp(3, 1), Some(5.0)), &topo).is_ok());

    // another intent already reserved most of the first link
    ledger.reserve(IntentId(9), vec![LinkTuple::new(sp(1, 10), sp(2, 10))], 6.0);
    assert!(matches!(
        reg.compile(&p2p(3, sp(1, 1), sp(3, 1), Some(5.0)), &topo),
        Err(IntentError::PathNotFound(_))
    ));
    assert!(reg.compile(&p2p(4, sp(1, 1), sp(3, 1), Some(4.0)), &topo).is_ok());
    // the opposite direction is not affected
    assert!(reg.compile(&p2p(5, sp(3, 1), sp(1, 1), Some(5.0)), &topo).is_ok());
}

#[test]
fn test_point_to_point_bandwidth_detour() {
    let topo = get_test_topo(10.0);
    let ids = IdGenerators::local(100);
    let ledger = Arc::new(BandwidthLedger::new());
    let reg = registry(&ids, ledger.clone());
    ledger.reserve(IntentId(9), vec![LinkTuple::new(sp(2, 11), sp(4, 10))], 8.0);

    match compile_one(&reg, &p2p(1, sp(1, 5), sp(5, 5), Some(5.0)), &topo) {
        Flow::PacketPath(f) => assert_eq!(f.path().dpids(), vec![*S1, *S3, *S4, *S5]),
        f => panic!("unexpected flow: {:?}", f),
    }
}

#[test]
fn test_point_to_point_errors() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));

    let same_switch = reg.compile(&p2p(1, sp(1, 1), sp(1, 2), None), &topo).unwrap_err();
    assert!(matches!(same_switch, IntentError::Flow(FlowError::EmptyPath)));
    assert_eq!(same_switch.failure_kind(), FailureKind::CompileRejected);

    let missing = reg.compile(&p2p(2, sp(1, 1), sp(7, 1), None), &topo).unwrap_err();
    assert!(matches!(missing, IntentError::PathNotFound(_)));

    let optical: Intent = PointToPointIntent {
        id: IntentId(3),
        matching: Match::Optical(OpticalMatch { lambda: Some(1) }),
        actions: vec![],
        ingress_port: sp(1, 1),
        egress_port: sp(3, 1),
        bandwidth: None,
    }
    .into();
    assert!(matches!(reg.compile(&optical, &topo), Err(IntentError::UnsupportedMatch(_))));

    // unreachable in a disconnected topology
    let mut topo = LineTopology::topology(2, 10.0).unwrap();
    topo.add_switch(*S3).unwrap();
    assert!(topo.contains_switch(*S3));
    assert!(matches!(
        reg.compile(&p2p(4, sp(1, 1), sp(3, 1), None), &topo),
        Err(IntentError::PathNotFound(_))
    ));
}

#[test]
fn test_multi_point_to_single_point() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent: Intent = MultiPointToSinglePointIntent {
        id: IntentId(1),
        matching: wildcard(),
        actions: vec![],
        ingress_ports: btreeset! { sp(1, 1), sp(3, 1) },
        egress_port: sp(2, 1),
    }
    .into();

    let flow = compile_one(&reg, &intent, &topo);
    let tree_flow = match &flow {
        Flow::SingleDstTree(f) => f,
        f => panic!("unexpected flow: {:?}", f),
    };
    assert_eq!(tree_flow.tree().len(), 2);
    assert!(tree_flow.tree().contains_link(&LinkTuple::new(sp(1, 10), sp(2, 10))));
    assert!(tree_flow.tree().contains_link(&LinkTuple::new(sp(3, 10), sp(2, 11))));
    assert_eq!(tree_flow.egress_switch(), Ok(*S2));

    let phases = flow.compile(Operator::Add, &ids).unwrap();
    assert_eq!(phases.len(), 2);
    assert!(phases[0].entries().iter().all(|e| e.target.switch_port().dpid == *S2));
    let expected: HashSet<_> =
        vec![(sp(2, 10), vec![out(1)]), (sp(2, 11), vec![out(1)])].into_iter().collect();
    assert_eq!(entries(&phases[0]), expected);
    let expected: HashSet<_> =
        vec![(sp(1, 1), vec![out(10)]), (sp(3, 1), vec![out(10)])].into_iter().collect();
    assert_eq!(entries(&phases[1]), expected);
}

#[test]
fn test_multi_point_skips_unreachable() {
    let mut topo = LineTopology::topology(3, 10.0).unwrap();
    topo.add_switch(*S4).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent = |ingress_ports| -> Intent {
        MultiPointToSinglePointIntent {
            id: IntentId(1),
            matching: wildcard(),
            actions: vec![],
            ingress_ports,
            egress_port: sp(3, 1),
        }
        .into()
    };

    // S4 is disconnected, S9 does not exist, and S3 is the egress itself
    let ingress = btreeset! { sp(1, 1), sp(3, 2), sp(4, 1), sp(9, 1) };
    let flow = compile_one(&reg, &intent(ingress), &topo);
    match flow {
        Flow::SingleDstTree(f) => {
            assert_eq!(f.ingress_ports(), &btreeset! { sp(1, 1) });
            assert_eq!(f.tree().len(), 2);
        }
        f => panic!("unexpected flow: {:?}", f),
    }

    let result = reg.compile(&intent(btreeset! { sp(4, 1), sp(9, 1) }), &topo);
    assert!(matches!(result, Err(IntentError::PathNotFound(_))));
}

#[test]
fn test_single_point_to_multi_point() {
    let topo = LineTopology::topology(4, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent: Intent = SinglePointToMultiPointIntent {
        id: IntentId(1),
        matching: wildcard(),
        actions: vec![],
        ingress_port: sp(2, 1),
        egress_ports: btreeset! { sp(1, 1), sp(2, 2), sp(4, 1) },
    }
    .into();

    let flow = compile_one(&reg, &intent, &topo);
    let tree_flow = match &flow {
        Flow::SingleSrcTree(f) => f,
        f => panic!("unexpected flow: {:?}", f),
    };
    assert_eq!(tree_flow.tree().len(), 3);
    assert_eq!(tree_flow.tree().sources(), vec![*S2]);
    assert_eq!(tree_flow.egress_actions().len(), 3);

    let phases = flow.compile(Operator::Add, &ids).unwrap();
    let head = &phases[1].entries()[0].target;
    assert_eq!(head.switch_port(), sp(2, 1));
    assert_eq!(head.actions(), &[out(10), out(11), out(2)]);
    let expected: HashSet<_> = vec![
        (sp(1, 10), vec![out(1)]),
        (sp(3, 10), vec![out(11)]),
        (sp(4, 10), vec![out(1)]),
    ]
    .into_iter()
    .collect();
    assert_eq!(entries(&phases[0]), expected);
}

#[test]
fn test_single_point_nothing_reachable() {
    let mut topo = LineTopology::topology(2, 10.0).unwrap();
    topo.add_switch(*S3).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent: Intent = SinglePointToMultiPointIntent {
        id: IntentId(1),
        matching: wildcard(),
        actions: vec![],
        ingress_port: sp(1, 1),
        egress_ports: btreeset! { sp(3, 1) },
    }
    .into();
    assert!(matches!(reg.compile(&intent, &topo), Err(IntentError::PathNotFound(_))));
}

#[test]
fn test_path_intent() {
    let topo = TopologySnapshot::new();
    let compiler = PathIntentCompiler::new(IdGenerators::local(100));
    let links = vec![LinkTuple::new(sp(1, 10), sp(2, 10)), LinkTuple::new(sp(2, 11), sp(3, 10))];
    let intent = |ingress_port, links| -> Intent {
        PathIntent {
            id: IntentId(1),
            matching: wildcard(),
            actions: vec![],
            ingress_port,
            links,
            egress_port: PortNumber(4),
        }
        .into()
    };

    // the topology is not consulted
    let installables = compiler.compile(&intent(sp(1, 1), links.clone()), &topo).unwrap();
    match &installables[0].flow {
        Flow::PacketPath(f) => {
            assert_eq!(f.path().links(), links.as_slice());
            assert_eq!(f.egress_actions(), &[out(4)]);
        }
        f => panic!("unexpected flow: {:?}", f),
    }

    assert!(matches!(
        compiler.compile(&intent(sp(1, 1), vec![]), &topo),
        Err(IntentError::Flow(FlowError::EmptyPath))
    ));
    assert!(matches!(
        compiler.compile(&intent(sp(2, 1), links.clone()), &topo),
        Err(IntentError::InvalidPath(_))
    ));
    let broken = vec![links[1], links[0]];
    assert!(matches!(
        compiler.compile(&intent(sp(2, 1), broken), &topo),
        Err(IntentError::InvalidPath(_))
    ));
}

#[test]
fn test_shortest_path_intent() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let intent: Intent = ShortestPathIntent {
        id: IntentId(1),
        src_port: sp(1, 1),
        dst_port: sp(3, 2),
        src_mac: 0x01.into(),
        dst_mac: 0x03.into(),
        bandwidth: Some(1.0),
    }
    .into();

    match compile_one(&reg, &intent, &topo) {
        Flow::PacketPath(f) => {
            assert_eq!(f.matching().src_mac, Some(0x01.into()));
            assert_eq!(f.matching().dst_mac, Some(0x03.into()));
            assert_eq!(f.egress_actions(), &[out(2)]);
            assert_eq!(f.path().len(), 2);
        }
        f => panic!("unexpected flow: {:?}", f),
    }
}

#[test]
fn test_registry() {
    let topo = LineTopology::topology(3, 10.0).unwrap();
    let ids = IdGenerators::local(100);
    let intent = p2p(1, sp(1, 1), sp(3, 1), None);

    let empty = CompilerRegistry::new();
    assert!(matches!(
        empty.compile(&intent, &topo),
        Err(IntentError::NoCompiler(IntentKind::PointToPoint))
    ));

    let mut reg = CompilerRegistry::new();
    reg.register(
        IntentKind::PointToPoint,
        Arc::new(PointToPointIntentCompiler::new(ids.clone(), Arc::new(BandwidthLedger::new()))),
    );
    assert!(reg.get(IntentKind::PointToPoint).is_some());
    assert!(reg.get(IntentKind::Path).is_none());
    assert!(reg.compile(&intent, &topo).is_ok());

    // a compiler refuses intents of another kind
    let compiler = PathIntentCompiler::new(ids);
    assert!(matches!(compiler.compile(&intent, &topo), Err(IntentError::NoCompiler(_))));
}

#[test]
fn test_compile_parallel_keeps_order() {
    let topo = Arc::new(LineTopology::topology(5, 10.0).unwrap());
    let ids = IdGenerators::local(10);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));

    let intents: Vec<Intent> = (0..40)
        .map(|i| match i % 4 {
            // every fourth intent cannot be compiled
            0 => p2p(i, sp(1, 1), sp(1, 2), None),
            _ => p2p(i, sp(1, 1), sp(i % 4 + 2, 1), None),
        })
        .collect();
    let results = reg.compile_parallel(intents.clone(), topo, Some(3));

    assert_eq!(results.len(), intents.len());
    for (intent, result) in intents.iter().zip(results.iter()) {
        let i = intent.id().0;
        match result {
            Ok(installables) => {
                assert_ne!(i % 4, 0);
                assert_eq!(installables[0].parent, intent.id());
                assert_eq!(installables[0].links().len() as u64, i % 4 + 1);
            }
            Err(e) => {
                assert_eq!(i % 4, 0);
                assert!(matches!(e, IntentError::Flow(FlowError::EmptyPath)));
            }
        }
    }

    // all flow ids are unique
    let flows: HashSet<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|i| i[0].flow.id())
        .collect();
    assert_eq!(flows.len(), 30);

}

#[test]
fn test_compile_parallel_corner_cases() {
    let ids = IdGenerators::local(10);
    let reg = registry(&ids, Arc::new(BandwidthLedger::new()));
    let empty = Arc::new(TopologySnapshot::new());

    assert!(reg.compile_parallel(vec![], empty.clone(), None).is_empty());

    // more threads than intents
    let intents = vec![p2p(1, sp(1, 1), sp(3, 1), None)];
    let results = reg.compile_parallel(intents, empty, Some(8));
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(IntentError::PathNotFound(_))));
}
