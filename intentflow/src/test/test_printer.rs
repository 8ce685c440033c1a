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

//! Test the human readable output

use super::{get_test_topo, sp};
use crate::flow::{Flow, PacketPathFlow};
use crate::id::{FlowId, IdGenerators};
use crate::intent::{IntentLog, IntentState, IntentTrigger};
use crate::matchaction::{Action, Operator, PacketMatch};
use crate::path::{Path, Tree};
use crate::printer;
use crate::topology::{LinkTuple, PortNumber};

fn line_path() -> Path {
    Path::from_links(vec![
        LinkTuple::new(sp(1, 10), sp(2, 10)),
        LinkTuple::new(sp(2, 11), sp(4, 10)),
    ])
    .unwrap()
}

#[test]
fn test_print_links_and_paths() {
    let topo = get_test_topo(10.0);
    assert_eq!(printer::switch_port(&topo, sp(3, 11)).unwrap(), "S3:11");
    assert_eq!(
        printer::link(&topo, &LinkTuple::new(sp(1, 10), sp(2, 10))).unwrap(),
        "S1:10 -> S2:10"
    );
    assert_eq!(printer::path(&topo, &line_path()).unwrap(), "S1 => S2 => S4");
    assert_eq!(printer::path(&topo, &Path::new()).unwrap(), "(empty)");
    assert!(printer::switch_port(&topo, sp(9, 1)).is_err());
}

#[test]
fn test_print_tree() {
    let topo = get_test_topo(10.0);
    let mut tree = Tree::from_path(&line_path()).unwrap();
    tree.add_link(LinkTuple::new(sp(3, 11), sp(4, 11))).unwrap();
    assert_eq!(
        printer::tree(&topo, &tree).unwrap(),
        vec!["S1:10 -> S2:10", "S2:11 -> S4:10", "S3:11 -> S4:11"]
    );
}

#[test]
fn test_print_phases() {
    let topo = get_test_topo(10.0);
    let flow: Flow = PacketPathFlow::new(
        FlowId(1),
        PacketMatch::builder().dst_mac(1).build(),
        PortNumber(5),
        line_path(),
        vec![Action::Output(5.into())],
        0,
        0,
    )
    .into();
    let phases = flow.compile(Operator::Add, &IdGenerators::local(10)).unwrap();
    let lines = printer::phases(&topo, &phases).unwrap();

    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("phase 1 (mao-"));
    assert!(lines[0].ends_with(", 2 entries):"));
    assert_eq!(
        lines[1],
        "    ADD S2:10 match: dst_mac=00:00:00:00:00:01 actions: [output:11]"
    );
    assert_eq!(lines[2], "    ADD S4:10 match: dst_mac=00:00:00:00:00:01 actions: [output:5]");
    assert!(lines[3].starts_with("phase 2 (mao-"));
    assert!(lines[3].ends_with(", 1 entries):"));
    assert_eq!(lines[4], "    ADD S1:5 match: dst_mac=00:00:00:00:00:01 actions: [output:10]");
}

#[test]
fn test_print_intent_log() {
    let mut log = IntentLog::new(4);
    log.record(IntentState::Created, IntentState::Submitted, IntentTrigger::Submit);
    log.record(IntentState::Submitted, IntentState::Compiled, IntentTrigger::CompileSucceeded);
    let lines = printer::intent_log(log.entries());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] CREATED -> SUBMITTED (submit)"));
    assert!(lines[1].ends_with("] SUBMITTED -> COMPILED (compile-succeeded)"));
}
