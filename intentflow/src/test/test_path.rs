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

//! Test the path and tree structures

use super::{sp, S1, S2, S3, S4};
use crate::path::{Path, PathError, Tree};
use crate::topology::{LinkTuple, PortNumber};
use std::convert::TryFrom;

fn l(a: u64, pa: u32, b: u64, pb: u32) -> LinkTuple {
    LinkTuple::new(sp(a, pa), sp(b, pb))
}

#[test]
fn test_path_construction() {
    let path = Path::from_links(vec![l(1, 10, 2, 10), l(2, 11, 3, 10)]).unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.src_dpid(), Some(*S1));
    assert_eq!(path.dst_dpid(), Some(*S3));
    assert_eq!(path.dpids(), vec![*S1, *S2, *S3]);
    assert_eq!(path.to_string(), "[1:10 -> 2:10, 2:11 -> 3:10]");

    let empty = Path::new();
    assert!(empty.is_empty());
    assert_eq!(empty.src_dpid(), None);
    assert!(empty.dpids().is_empty());
}

#[test]
fn test_path_errors() {
    assert_eq!(
        Path::from_links(vec![l(1, 10, 2, 10), l(3, 11, 4, 10)]),
        Err(PathError::Discontinuous { index: 1, expected: *S2, found: *S3 })
    );
    assert_eq!(Path::from_links(vec![l(1, 10, 1, 11)]), Err(PathError::SelfLoop(l(1, 10, 1, 11))));

    let mut path = Path::new();
    path.push(l(1, 10, 2, 10)).unwrap();
    assert!(path.push(l(1, 11, 3, 10)).is_err());
    assert_eq!(path.len(), 1);
}

#[test]
fn test_path_round_trip() {
    let links = vec![l(3, 10, 1, 11), l(1, 10, 2, 10), l(2, 12, 4, 10)];
    let path = Path::try_from(links.clone()).unwrap();
    let (src, dst) = (path.src_dpid(), path.dst_dpid());

    let back: Vec<LinkTuple> = path.clone().into();
    assert_eq!(back, links);
    let again = Path::try_from(back).unwrap();
    assert_eq!(again, path);
    assert_eq!((again.src_dpid(), again.dst_dpid()), (src, dst));
    assert_eq!(again.dpids(), vec![*S3, *S1, *S2, *S4]);
}

#[test]
fn test_path_serde() {
    let path = Path::from_links(vec![l(1, 10, 2, 10), l(2, 11, 3, 10)]).unwrap();
    let json = serde_json::to_string(&path).unwrap();
    let back: Path = serde_json::from_str(&json).unwrap();
    assert_eq!(back, path);

    // a discontinuous sequence of links is not a path
    let broken = serde_json::to_string(&vec![l(1, 10, 2, 10), l(3, 11, 4, 10)]).unwrap();
    assert!(serde_json::from_str::<Path>(&broken).is_err());
}

#[test]
fn test_tree_construction() {
    // S1 -> S2 <- S3, and S2 -> S4
    let mut tree = Tree::new();
    tree.add_link(l(1, 10, 2, 10)).unwrap();
    tree.add_link(l(3, 10, 2, 11)).unwrap();
    tree.add_link(l(2, 12, 4, 10)).unwrap();

    assert_eq!(tree.len(), 3);
    assert_eq!(tree.dpids(), vec![*S1, *S2, *S3, *S4]);
    assert_eq!(tree.in_ports(*S2), vec![PortNumber(10), PortNumber(11)]);
    assert_eq!(tree.out_ports(*S2), vec![PortNumber(12)]);
    assert_eq!(tree.in_link(sp(2, 11)), Some(&l(3, 10, 2, 11)));
    assert_eq!(tree.out_link(sp(2, 12)), Some(&l(2, 12, 4, 10)));
    assert_eq!(tree.sinks(), vec![*S4]);
    assert_eq!(tree.sources(), vec![*S1, *S3]);
    assert!(tree.has_switch_port(sp(3, 10)));
    assert!(!tree.has_switch_port(sp(3, 11)));
}

#[test]
fn test_tree_errors() {
    let mut tree = Tree::new();
    tree.add_link(l(1, 10, 2, 10)).unwrap();

    assert_eq!(tree.add_link(l(3, 10, 4, 10)), Err(PathError::NoAttachPoint(l(3, 10, 4, 10))));
    assert_eq!(tree.add_link(l(2, 11, 1, 11)), Err(PathError::Loop(l(2, 11, 1, 11))));
    assert_eq!(tree.add_link(l(1, 10, 3, 10)), Err(PathError::PortInUse(sp(1, 10))));
    assert_eq!(tree.add_link(l(2, 11, 2, 12)), Err(PathError::SelfLoop(l(2, 11, 2, 12))));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_tree_merge() {
    let first = Path::from_links(vec![l(1, 10, 2, 10), l(2, 11, 3, 10)]).unwrap();
    let second = Path::from_links(vec![l(4, 10, 2, 12), l(2, 11, 3, 10)]).unwrap();

    let mut tree = Tree::from_path(&first).unwrap();
    tree.merge_path(&second).unwrap();
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.sinks(), vec![*S3]);

    // links can be given in any order, as long as they end up connected
    let tree =
        Tree::try_from(vec![l(4, 10, 2, 12), l(2, 11, 3, 10), l(1, 10, 2, 10)]).unwrap();
    assert_eq!(tree.len(), 3);
    assert!(Tree::try_from(vec![l(1, 10, 2, 10), l(3, 10, 4, 10)]).is_err());
}

#[test]
fn test_tree_serde() {
    let tree = Tree::try_from(vec![l(1, 10, 2, 10), l(3, 10, 2, 11)]).unwrap();
    let json = serde_json::to_string(&tree).unwrap();
    let back: Tree = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);

    let looped = serde_json::to_string(&vec![l(1, 10, 2, 10), l(2, 11, 1, 11)]).unwrap();
    assert!(serde_json::from_str::<Tree>(&looped).is_err());
}
