//! Parsers for neighbor-table and reverse-lookup tool output.
//!
//! Each platform prints `arp` differently; the parsers find the row for one
//! address and pull the hardware id out of it. Anything unexpected yields
//! `None`, never an error.

use std::net::Ipv4Addr;

use lanwatch_core::HardwareId;

use crate::probe::Platform;

/// Extract the hardware id for `address` from `arp` output.
///
/// Expected shapes:
/// - Linux `arp -n`: `192.168.1.1  ether  aa:bb:cc:dd:ee:ff  C  eth0`
/// - macOS `arp -n`: `? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`
/// - Windows `arp -a`: `  192.168.1.1   aa-bb-cc-dd-ee-ff   dynamic`
pub fn parse_neighbor_table(platform: Platform, output: &str, address: Ipv4Addr) -> Option<HardwareId> {
    let needle = address.to_string();

    output.lines().find_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let raw = match platform {
            Platform::Linux => {
                if tokens.first() != Some(&needle.as_str()) {
                    return None;
                }
                // `ip neigh` style rows put the address after "lladdr".
                match tokens.iter().position(|t| *t == "lladdr") {
                    Some(idx) => tokens.get(idx + 1)?,
                    None => tokens.get(2)?,
                }
            }
            Platform::MacOs => {
                let bracketed = format!("({needle})");
                if !tokens.contains(&bracketed.as_str()) {
                    return None;
                }
                let at = tokens.iter().position(|t| *t == "at")?;
                tokens.get(at + 1)?
            }
            Platform::Windows => {
                if tokens.first() != Some(&needle.as_str()) {
                    return None;
                }
                tokens.get(1)?
            }
        };

        HardwareId::parse(raw).filter(|id| !id.is_unknown())
    })
}

/// Extract the resolved name from `nslookup <address>` output.
///
/// Unix resolvers print `1.1.168.192.in-addr.arpa  name = router.lan.`;
/// Windows prints a `Name:    router.lan` line after the server block.
pub fn parse_reverse_lookup(output: &str, address: Ipv4Addr) -> Option<String> {
    let needle = address.to_string();

    let unix = output.lines().find_map(|line| {
        let (_, name) = line.split_once("name =")?;
        Some(name.trim())
    });
    let windows = || {
        output.lines().find_map(|line| {
            let name = line.trim_start().strip_prefix("Name:")?;
            Some(name.trim())
        })
    };

    let name = unix.or_else(windows)?.trim_end_matches('.');
    if name.is_empty() || name == needle {
        None
    } else {
        Some(name.to_string())
    }
}
