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

//! Module containing the match conditions

use super::MatchActionError;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::net::Ipv4Addr;

/// MAC address
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 6]);

impl From<u64> for MacAddress {
    /// Use the lower 48 bits of the number as MAC address.
    fn from(x: u64) -> Self {
        let b = x.to_be_bytes();
        Self([b[2], b[3], b[4], b[5], b[6], b[7]])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

#[derive(Deserialize)]
struct RawIpv4Prefix {
    addr: u32,
    len: u8,
}

/// # IPv4 Prefix
/// Address and prefix length. The host bits of the address are always zero.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawIpv4Prefix")]
pub struct Ipv4Prefix {
    addr: u32,
    len: u8,
}

impl Ipv4Prefix {
    /// Create a new prefix. The host bits of `addr` are cleared. Returns an error if `len > 32`.
    pub fn new(addr: Ipv4Addr, len: u8) -> Result<Self, MatchActionError> {
        if len > 32 {
            return Err(MatchActionError::InvalidPrefixLength(len));
        }
        Ok(Self { addr: u32::from(addr) & Self::mask(len), len })
    }

    /// Prefix matching a single host
    pub fn host(addr: Ipv4Addr) -> Self {
        Self { addr: u32::from(addr), len: 32 }
    }

    /// Network address
    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Returns true if every address in `other` is also in `self`.
    pub fn contains(&self, other: &Self) -> bool {
        self.len <= other.len && other.addr & Self::mask(self.len) == self.addr
    }

    /// Returns true if the two prefixes share at least one address.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contains(other) || other.contains(self)
    }

    fn mask(len: u8) -> u32 {
        match len {
            0 => 0,
            l => u32::MAX << (32 - l as u32),
        }
    }
}

impl TryFrom<RawIpv4Prefix> for Ipv4Prefix {
    type Error = MatchActionError;

    fn try_from(raw: RawIpv4Prefix) -> Result<Self, Self::Error> {
        Self::new(Ipv4Addr::from(raw.addr), raw.len)
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.len)
    }
}

/// # Packet Match
/// Filter over packet header fields. A field set to `None` is a wildcard.
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct PacketMatch {
    /// Source MAC address
    pub src_mac: Option<MacAddress>,
    /// Destination MAC address
    pub dst_mac: Option<MacAddress>,
    /// Source IPv4 prefix
    pub src_ip: Option<Ipv4Prefix>,
    /// Destination IPv4 prefix
    pub dst_ip: Option<Ipv4Prefix>,
}

impl PacketMatch {
    /// Match every packet
    pub fn wildcard() -> Self {
        Self::default()
    }

    /// Start building a match
    pub fn builder() -> PacketMatchBuilder {
        PacketMatchBuilder::default()
    }

    /// Returns true if every field is a wildcard
    pub fn is_wildcard(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if some packet is matched by both `self` and `other`.
    pub fn overlaps(&self, other: &Self) -> bool {
        fn field<T, F: Fn(&T, &T) -> bool>(a: &Option<T>, b: &Option<T>, f: F) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => f(a, b),
                _ => true,
            }
        }
        field(&self.src_mac, &other.src_mac, |a, b| a == b)
            && field(&self.dst_mac, &other.dst_mac, |a, b| a == b)
            && field(&self.src_ip, &other.src_ip, Ipv4Prefix::overlaps)
            && field(&self.dst_ip, &other.dst_ip, Ipv4Prefix::overlaps)
    }
}

impl fmt::Display for PacketMatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_wildcard() {
            return write!(f, "*");
        }
        let mut fields = Vec::new();
        if let Some(m) = self.src_mac {
            fields.push(format!("src_mac={}", m));
        }
        if let Some(m) = self.dst_mac {
            fields.push(format!("dst_mac={}", m));
        }
        if let Some(p) = self.src_ip {
            fields.push(format!("src_ip={}", p));
        }
        if let Some(p) = self.dst_ip {
            fields.push(format!("dst_ip={}", p));
        }
        write!(f, "{}", fields.join(","))
    }
}

/// Builder for a [`PacketMatch`]
#[derive(Debug, Clone, Default)]
pub struct PacketMatchBuilder {
    inner: PacketMatch,
}

impl PacketMatchBuilder {
    /// Match on the source MAC address
    pub fn src_mac(mut self, mac: impl Into<MacAddress>) -> Self {
        self.inner.src_mac = Some(mac.into());
        self
    }

    /// Match on the destination MAC address
    pub fn dst_mac(mut self, mac: impl Into<MacAddress>) -> Self {
        self.inner.dst_mac = Some(mac.into());
        self
    }

    /// Match on the source IP prefix
    pub fn src_ip(mut self, prefix: Ipv4Prefix) -> Self {
        self.inner.src_ip = Some(prefix);
        self
    }

    /// Match on the destination IP prefix
    pub fn dst_ip(mut self, prefix: Ipv4Prefix) -> Self {
        self.inner.dst_ip = Some(prefix);
        self
    }

    /// Finish the match
    pub fn build(self) -> PacketMatch {
        self.inner
    }
}

/// Match on the wavelength of an optical signal
#[derive(
    PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize, Default,
)]
pub struct OpticalMatch {
    /// Wavelength, or `None` to match all
    pub lambda: Option<u32>,
}

/// # Match
/// All kinds of match conditions known to the match-action layer.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Match {
    /// Match on packet header fields
    Packet(PacketMatch),
    /// Match on the wavelength
    Optical(OpticalMatch),
}

impl Match {
    /// Returns true if some traffic is matched by both. Matches of different kinds never overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Packet(a), Self::Packet(b)) => a.overlaps(b),
            (Self::Optical(a), Self::Optical(b)) => match (a.lambda, b.lambda) {
                (Some(x), Some(y)) => x == y,
                _ => true,
            },
            _ => false,
        }
    }

    /// Returns the packet match, or `None` if this is a different kind.
    pub fn packet(&self) -> Option<&PacketMatch> {
        match self {
            Self::Packet(m) => Some(m),
            _ => None,
        }
    }

    /// Name of the kind of match
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Packet(_) => "packet",
            Self::Optical(_) => "optical",
        }
    }
}

impl From<PacketMatch> for Match {
    fn from(m: PacketMatch) -> Self {
        Self::Packet(m)
    }
}

impl From<OpticalMatch> for Match {
    fn from(m: OpticalMatch) -> Self {
        Self::Optical(m)
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Packet(m) => write!(f, "{}", m),
            Self::Optical(OpticalMatch { lambda: Some(l) }) => write!(f, "lambda={}", l),
            Self::Optical(OpticalMatch { lambda: None }) => write!(f, "lambda=*"),
        }
    }
}
