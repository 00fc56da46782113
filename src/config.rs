//! Contracts file loading
//!
//! Each line holds a contract schema name and an address, separated by
//! whitespace. The addresses seed the router's static registry.

use crate::types::{pad_hex_string, ContractKind};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// One configured (contract schema, address) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractEntry {
    pub kind: ContractKind,
    pub address: Address,
}

/// Load the contracts file.
///
/// Addresses may be given with or without 0x prefix.
/// Empty lines and lines starting with '#' are ignored.
///
/// # Example file format:
/// ```text
/// # Holograph core contracts
/// HolographRegistry        0x00000000000000000000000000000000000000f1
/// HolographFactory         0x00000000000000000000000000000000000000f2
/// HolographOperator        0x00000000000000000000000000000000000000f3
/// EditionsMetadataRenderer 0x00000000000000000000000000000000000000f4
/// ```
pub fn load_contracts(path: &Path) -> Result<Vec<ContractEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read contracts file: {:?}", path))?;
    parse_contracts(&contents)
}

/// Parse contracts file contents. See [`load_contracts`].
pub fn parse_contracts(contents: &str) -> Result<Vec<ContractEntry>> {
    let mut entries = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry = parse_entry(line)
            .with_context(|| format!("Invalid entry on line {}: {}", line_num + 1, line))?;
        entries.push(entry);
    }

    if entries.is_empty() {
        anyhow::bail!("Contracts file is empty (no valid entries found)");
    }

    Ok(entries)
}

fn parse_entry(line: &str) -> Result<ContractEntry> {
    let mut parts = line.split_whitespace();
    let (Some(name), Some(addr), None) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("Expected '<ContractName> <address>'");
    };
    Ok(ContractEntry {
        kind: name.parse()?,
        address: parse_address(addr)?,
    })
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }

    Ok(Address::from_slice(&bytes))
}
