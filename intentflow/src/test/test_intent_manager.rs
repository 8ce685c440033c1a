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

//! Test the intent manager on top of the flow manager and the in-memory switches

use super::{get_test_topo, sp, SlowSwitches};
use crate::config::{ControllerConfig, ExecutionMode};
use crate::flow::{FlowError, FlowState};
use crate::flowmanager::{ConflictDetectionPolicy, FlowManager, FlowManagerService};
use crate::id::{IdGenerators, IntentId};
use crate::intent::{
    CompilerRegistry, Intent, IntentError, IntentEvent, IntentEventListener, IntentManager,
    IntentState, IntentTrigger, PointToPointIntent,
};
use crate::matchaction::{InMemoryMatchActionService, Match, MatchActionService, PacketMatch};
use crate::path::BandwidthLedger;
use crate::topology::{LinkTuple, SharedTopology, SwitchPort};
use assert_approx_eq::assert_approx_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything needed to drive intents
struct Controller {
    intents: IntentManager,
    flows: FlowManager,
    switches: Arc<InMemoryMatchActionService>,
    topology: Arc<SharedTopology>,
}

fn get_controller(policy: ConflictDetectionPolicy, execution: ExecutionMode) -> Controller {
    let config =
        ControllerConfig { conflict_detection_policy: policy, execution, ..Default::default() };
    let switches = Arc::new(InMemoryMatchActionService::new());
    build_controller(&config, switches.clone(), switches)
}

fn build_controller(
    config: &ControllerConfig,
    service: Arc<dyn MatchActionService>,
    switches: Arc<InMemoryMatchActionService>,
) -> Controller {
    let ids = IdGenerators::local(100);
    let ledger = Arc::new(BandwidthLedger::new());
    let flows = FlowManager::new(service, ids.clone(), config);
    let topology = Arc::new(SharedTopology::new(get_test_topo(10.0)));
    let registry = CompilerRegistry::with_default_compilers(ids, ledger.clone());
    let intents = IntentManager::new(
        registry,
        Arc::new(flows.clone()),
        topology.clone(),
        ledger,
        config,
    );
    Controller { intents, flows, switches, topology }
}

fn inline_controller() -> Controller {
    get_controller(ConflictDetectionPolicy::Free, ExecutionMode::Inline)
}

fn p2p(id: u64, ingress: SwitchPort, egress: SwitchPort, bandwidth: Option<f64>) -> Intent {
    PointToPointIntent {
        id: IntentId(id),
        matching: Match::Packet(PacketMatch::builder().dst_mac(id).build()),
        actions: vec![],
        ingress_port: ingress,
        egress_port: egress,
        bandwidth,
    }
    .into()
}

fn link(a: SwitchPort, b: SwitchPort) -> LinkTuple {
    LinkTuple::new(a, b)
}

/// Links of the flows the intent was compiled into
fn intent_links(c: &Controller, id: u64) -> Vec<LinkTuple> {
    c.intents
        .get_installables(IntentId(id))
        .unwrap()
        .iter()
        .flat_map(|i| i.links())
        .collect()
}

/// Remove the link between S2 and S4 in both directions
fn cut_upper_link(c: &Controller) {
    c.topology.update(|t| {
        t.remove_link(sp(2, 11), sp(4, 10)).unwrap();
        t.remove_link(sp(4, 10), sp(2, 11)).unwrap();
    });
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<IntentEvent>>,
}

impl IntentEventListener for Recorder {
    fn event(&self, event: &IntentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    fn states(&self, id: u64) -> Vec<IntentState> {
        let events = self.events.lock().unwrap();
        events.iter().filter(|e| e.intent == IntentId(id)).map(|e| e.state).collect()
    }
}

#[test]
fn test_submit_and_withdraw() {
    let c = inline_controller();
    let recorder = Arc::new(Recorder::default());
    let listener = c.intents.add_listener(recorder.clone());

    let state = c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    assert_eq!(state, IntentState::Installed);
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::Installed));
    assert_eq!(
        intent_links(&c, 1),
        vec![link(sp(1, 10), sp(2, 10)), link(sp(2, 11), sp(4, 10)), link(sp(4, 12), sp(5, 10))]
    );
    assert_eq!(c.switches.num_rules(), 4);
    let flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();
    assert_eq!(c.flows.get_flow_state(flow), Some(FlowState::Installed));

    let state = c.intents.withdraw(IntentId(1)).unwrap();
    assert_eq!(state, IntentState::Withdrawn);
    assert_eq!(c.switches.num_rules(), 0);
    assert_eq!(c.flows.get_flow(flow), None);

    assert_eq!(
        recorder.states(1),
        vec![
            IntentState::Created,
            IntentState::Submitted,
            IntentState::Compiled,
            IntentState::Installed,
            IntentState::Withdrawing,
            IntentState::Withdrawn,
        ]
    );
    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events[0].previous, None);
    assert!(events[1..].windows(2).all(|w| w[1].previous == Some(w[0].state)));

    let log = c.intents.get_log(IntentId(1)).unwrap();
    let triggers: Vec<IntentTrigger> = log.iter().map(|e| e.trigger).collect();
    assert_eq!(
        triggers,
        vec![
            IntentTrigger::Submit,
            IntentTrigger::CompileSucceeded,
            IntentTrigger::InstallSucceeded,
            IntentTrigger::Withdraw,
            IntentTrigger::WithdrawSucceeded,
        ]
    );
    assert!(log.windows(2).all(|w| w[0].to == w[1].from));

    assert!(c.intents.remove_listener(listener));
    assert!(!c.intents.remove_listener(listener));
}

#[test]
fn test_same_switch_fails() {
    let c = inline_controller();
    let result = c.intents.submit(p2p(1, sp(1, 5), sp(1, 6), None));
    assert!(matches!(result, Err(IntentError::Flow(FlowError::EmptyPath))));
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::Failed));
    assert!(c.intents.get_last_error(IntentId(1)).is_some());
    assert_eq!(c.switches.num_rules(), 0);

    // a failed intent can only be withdrawn
    assert!(matches!(c.intents.reroute(IntentId(1)), Err(IntentError::InvalidTransition { .. })));
    assert_eq!(c.intents.withdraw(IntentId(1)).unwrap(), IntentState::Withdrawn);
}

#[test]
fn test_unreachable_destination_is_retried() {
    let c = inline_controller();
    let full = c.topology.replace(get_test_topo(10.0));
    c.topology.update(|t| {
        t.remove_link(sp(4, 12), sp(5, 10)).unwrap();
        t.remove_link(sp(5, 10), sp(4, 12)).unwrap();
    });

    let result = c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None));
    assert!(matches!(result, Err(IntentError::PathNotFound(_))));
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::InstNack));
    assert_eq!(c.flows.num_flows(), 0);

    // the link comes back
    c.topology.replace(full.as_ref().clone());
    assert_eq!(c.intents.reroute(IntentId(1)).unwrap(), IntentState::Installed);
    assert_eq!(c.switches.num_rules(), 4);
    let states: Vec<IntentState> =
        c.intents.get_log(IntentId(1)).unwrap().iter().map(|e| e.to).collect();
    assert_eq!(
        states,
        vec![
            IntentState::Submitted,
            IntentState::InstNack,
            IntentState::RerouteReq,
            IntentState::Compiled,
            IntentState::Installed,
        ]
    );
}

#[test]
fn test_bandwidth_is_reserved_while_installed() {
    let c = inline_controller();
    let upper = link(sp(1, 10), sp(2, 10));

    let state = c.intents.submit(p2p(1, sp(1, 5), sp(4, 5), Some(6.0))).unwrap();
    assert_eq!(state, IntentState::Installed);
    assert_approx_eq!(c.intents.ledger().reserved(&upper), 6.0);
    assert_eq!(c.intents.ledger().intents_on_link(&upper), vec![IntentId(1)]);

    // the second intent has to take the other way around
    let state = c.intents.submit(p2p(2, sp(1, 5), sp(4, 6), Some(6.0))).unwrap();
    assert_eq!(state, IntentState::Installed);
    assert_eq!(intent_links(&c, 2), vec![link(sp(1, 11), sp(3, 10)), link(sp(3, 11), sp(4, 11))]);

    // and the third one does not fit anymore
    let result = c.intents.submit(p2p(3, sp(1, 5), sp(4, 7), Some(6.0)));
    assert!(matches!(result, Err(IntentError::PathNotFound(_))));
    assert_eq!(c.intents.get_state(IntentId(3)), Some(IntentState::InstNack));
    assert!(c.intents.ledger().links_of(IntentId(3)).is_empty());

    assert_eq!(c.intents.withdraw(IntentId(1)).unwrap(), IntentState::Withdrawn);
    assert_approx_eq!(c.intents.ledger().reserved(&upper), 0.0);
    assert_eq!(c.intents.reroute(IntentId(3)).unwrap(), IntentState::Installed);
    assert_approx_eq!(c.intents.ledger().reserved(&upper), 6.0);
}

#[test]
fn test_reroute_after_link_failure() {
    let c = inline_controller();
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    c.intents.submit(p2p(2, sp(1, 5), sp(3, 5), None)).unwrap();
    let old_flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();

    cut_upper_link(&c);
    let results = c.intents.reroute_affected(&[link(sp(2, 11), sp(4, 10))]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, IntentId(1));
    assert_eq!(results[0].1.as_ref().unwrap(), &IntentState::Installed);

    assert_eq!(
        intent_links(&c, 1),
        vec![link(sp(1, 11), sp(3, 10)), link(sp(3, 11), sp(4, 11)), link(sp(4, 12), sp(5, 10))]
    );
    assert_eq!(c.flows.get_flow(old_flow), None);
    assert_eq!(c.flows.num_flows(), 2);
    // 4 rules for the first intent, 2 for the second one
    assert_eq!(c.switches.num_rules(), 6);
    let log = c.intents.get_log(IntentId(1)).unwrap();
    assert!(log.iter().any(|e| e.to == IntentState::RerouteReq));
}

#[test]
fn test_reroute_without_change() {
    let c = inline_controller();
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    let flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();
    let log_len = c.intents.get_log(IntentId(1)).unwrap().len();

    assert_eq!(c.intents.reroute(IntentId(1)).unwrap(), IntentState::Installed);
    assert_eq!(c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id(), flow);
    assert_eq!(c.intents.get_log(IntentId(1)).unwrap().len(), log_len);
}

#[test]
fn test_frozen_path_is_not_rerouted() {
    let c = inline_controller();
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    let before = intent_links(&c, 1);
    c.intents.set_path_frozen(IntentId(1), true).unwrap();

    cut_upper_link(&c);
    c.intents.reroute_affected(&[link(sp(2, 11), sp(4, 10))]);
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::Installed));
    assert_eq!(intent_links(&c, 1), before);

    c.intents.set_path_frozen(IntentId(1), false).unwrap();
    c.intents.reroute(IntentId(1)).unwrap();
    assert_ne!(intent_links(&c, 1), before);
    assert!(c.intents.set_path_frozen(IntentId(9), true).is_err());
}

#[test]
fn test_installation_failure_is_cleaned_up() {
    let c = inline_controller();
    c.switches.fail_on(sp(1, 5));

    let result = c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None));
    assert!(matches!(result, Err(IntentError::InstallationFailed { .. })));
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::InstNack));
    assert_eq!(c.switches.num_rules(), 0);
    let flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();
    assert_eq!(c.flows.get_flow_state(flow), Some(FlowState::Failed));

    // once the switch recovers, the leftover flow is removed on withdrawal
    c.switches.clear_failures();
    assert_eq!(c.intents.withdraw(IntentId(1)).unwrap(), IntentState::Withdrawn);
    assert_eq!(c.flows.get_flow(flow), None);
}

#[test]
fn test_rejected_flow() {
    let c = get_controller(ConflictDetectionPolicy::Strict, ExecutionMode::Inline);
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();

    let clash: Intent = PointToPointIntent {
        id: IntentId(2),
        matching: Match::Packet(PacketMatch::wildcard()),
        actions: vec![],
        ingress_port: sp(1, 5),
        egress_port: sp(3, 5),
        bandwidth: None,
    }
    .into();
    assert!(matches!(c.intents.submit(clash), Err(IntentError::Rejected(_))));
    assert_eq!(c.intents.get_state(IntentId(2)), Some(IntentState::InstNack));
    assert_eq!(c.flows.num_flows(), 1);
}

#[test]
fn test_duplicate_and_unknown_intents() {
    let c = inline_controller();
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    assert!(matches!(
        c.intents.submit(p2p(1, sp(1, 5), sp(3, 5), None)),
        Err(IntentError::DuplicateIntent(_))
    ));
    assert!(matches!(c.intents.withdraw(IntentId(7)), Err(IntentError::IntentNotFound(_))));
    assert!(matches!(c.intents.reroute(IntentId(7)), Err(IntentError::IntentNotFound(_))));
    assert_eq!(c.intents.get_intent(IntentId(7)), None);
    assert_eq!(c.intents.get_intents().len(), 1);
}

#[test]
fn test_submit_all() {
    let c = inline_controller();
    let results = c.intents.submit_all(vec![
        p2p(1, sp(1, 5), sp(5, 5), None),
        p2p(2, sp(5, 5), sp(1, 5), None),
        p2p(1, sp(2, 5), sp(3, 5), None),
        p2p(3, sp(2, 5), sp(2, 6), None),
    ]);
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap(), &IntentState::Installed);
    assert_eq!(results[1].as_ref().unwrap(), &IntentState::Installed);
    assert!(matches!(results[2], Err(IntentError::DuplicateIntent(_))));
    assert!(matches!(results[3], Err(IntentError::Flow(FlowError::EmptyPath))));
    assert_eq!(c.flows.num_flows(), 2);
    assert_eq!(c.intents.get_state(IntentId(3)), Some(IntentState::Failed));
}

#[test]
fn test_purge() {
    let c = inline_controller();
    c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).unwrap();
    c.intents.submit(p2p(2, sp(1, 5), sp(3, 5), None)).unwrap();
    let _ = c.intents.submit(p2p(3, sp(1, 5), sp(1, 6), None));
    c.intents.withdraw(IntentId(2)).unwrap();

    assert_eq!(c.intents.purge(), 2);
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::Installed));
    assert_eq!(c.intents.get_state(IntentId(2)), None);
    assert_eq!(c.intents.get_state(IntentId(3)), None);
    assert_eq!(c.intents.purge(), 0);
}

#[test]
fn test_background_flow_manager() {
    let c = get_controller(ConflictDetectionPolicy::Free, ExecutionMode::Background);
    let results = c.intents.submit_all((1..=6).map(|i| p2p(i, sp(1, 5), sp(5, 5), None)).collect());
    assert!(results.iter().all(|r| r.as_ref().ok() == Some(&IntentState::Installed)));
    c.flows.wait_idle();
    assert_eq!(c.flows.num_flows(), 6);
    assert_eq!(c.switches.num_rules(), 24);

    for i in 1..=6 {
        assert_eq!(c.intents.withdraw(IntentId(i)).unwrap(), IntentState::Withdrawn);
    }
    c.flows.wait_idle();
    assert_eq!(c.switches.num_rules(), 0);
}

#[test]
fn test_timed_out_flow_is_removed_afterwards() {
    let config = ControllerConfig {
        execution: ExecutionMode::Background,
        install_timeout_ms: Some(50),
        ..Default::default()
    };
    let switches = Arc::new(InMemoryMatchActionService::new());
    let delay = Duration::from_millis(200);
    let slow = Arc::new(SlowSwitches { switches: switches.clone(), delay });
    let c = build_controller(&config, slow, switches);

    let result = c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None));
    assert!(matches!(result, Err(IntentError::Timeout { timeout_ms: 50, .. })));
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::InstNack));
    let flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();

    // the flow is still being installed, so the intent is kept
    assert_eq!(c.intents.purge(), 0);

    c.flows.wait_idle();
    assert_eq!(c.flows.get_flow_state(flow), None);
    assert_eq!(c.flows.num_flows(), 0);
    assert_eq!(c.switches.num_rules(), 0);
    assert_eq!(c.flows.num_listeners(), 0);
    assert_eq!(c.intents.purge(), 1);
}

#[test]
fn test_constrained_reroute_keeps_own_links() {
    let c = inline_controller();
    let egress = link(sp(4, 12), sp(5, 10));
    let state = c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), Some(10.0))).unwrap();
    assert_eq!(state, IntentState::Installed);
    assert_approx_eq!(c.intents.ledger().reserved(&egress), 10.0);

    // the only way around shares the egress link, which the intent fills up completely
    cut_upper_link(&c);
    let results = c.intents.reroute_affected(&[link(sp(2, 11), sp(4, 10))]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.as_ref().unwrap(), &IntentState::Installed);
    assert_eq!(
        intent_links(&c, 1),
        vec![link(sp(1, 11), sp(3, 10)), link(sp(3, 11), sp(4, 11)), egress]
    );
    assert_approx_eq!(c.intents.ledger().reserved(&egress), 10.0);
    assert_approx_eq!(c.intents.ledger().reserved(&link(sp(1, 10), sp(2, 10))), 0.0);
    assert_eq!(c.intents.ledger().links_of(IntentId(1)).len(), 3);

    // other intents still see the reservation
    let result = c.intents.submit(p2p(2, sp(3, 5), sp(5, 5), Some(1.0)));
    assert!(matches!(result, Err(IntentError::PathNotFound(_))));
}

#[test]
fn test_failed_cleanup_on_withdrawal() {
    let c = inline_controller();
    c.switches.fail_on(sp(1, 5));
    assert!(c.intents.submit(p2p(1, sp(1, 5), sp(5, 5), None)).is_err());
    let flow = c.intents.get_installables(IntentId(1)).unwrap()[0].flow.id();
    assert_eq!(c.flows.get_flow_state(flow), Some(FlowState::Failed));

    // the switch still fails, so the flow cannot be removed
    assert!(matches!(c.intents.withdraw(IntentId(1)), Err(IntentError::RemovalFailed(_))));
    assert_eq!(c.intents.get_state(IntentId(1)), Some(IntentState::DelPending));
    assert!(c.intents.get_last_error(IntentId(1)).is_some());
    assert_eq!(c.intents.purge(), 0);

    c.switches.clear_failures();
    assert_eq!(c.intents.withdraw(IntentId(1)).unwrap(), IntentState::Withdrawn);
    assert_eq!(c.flows.get_flow(flow), None);
    assert_eq!(c.intents.purge(), 1);
}
